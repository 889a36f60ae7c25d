use std::sync::Once;
use std::time::{Duration, Instant};

use chrono::{TimeZone, Utc};
use listing_core::{
    update, AppState, AuthUser, Change, Effect, FailureClass, JobKind, JobRequest, Msg,
    NoticeLevel, RequestFailure, ResultSummary, StatusBadge, Task, TaskStatus, TaskType,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(client_logging::initialize_for_tests);
}

fn user() -> AuthUser {
    AuthUser {
        id: "42".to_string(),
        email: "admin@example.com".to_string(),
        role: "admin".to_string(),
    }
}

fn signed_in() -> AppState {
    let (mut state, _) = update(AppState::new(), Msg::SessionStarted(user()));
    state.take_changes();
    state
}

fn object_job(status: TaskStatus, object_id: &str) -> Task {
    Task {
        id: "job-1".to_string(),
        name: "Refresh".to_string(),
        task_type: TaskType::ActualizeById,
        status,
        created_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        started_at: None,
        finished_at: None,
        result_summary: Some(ResultSummary {
            id: Some(object_id.to_string()),
            expected_results_count: Some(1),
            ..ResultSummary::default()
        }),
        created_by_user_id: Some("42".to_string()),
    }
}

fn push(state: AppState, task: Task) -> (AppState, Vec<Effect>) {
    update(
        state,
        Msg::TaskPushed {
            task,
            received_at: Utc::now(),
        },
    )
}

#[test]
fn session_start_opens_stream_and_loads_state() {
    init_logging();
    let (state, effects) = update(AppState::new(), Msg::SessionStarted(user()));

    assert!(state.auth().is_signed_in());
    assert_eq!(effects.len(), 3);
    assert_eq!(effects[0], Effect::OpenTaskStream);
    assert_eq!(effects[1], Effect::FetchFavoriteIds);
    assert!(matches!(
        effects[2],
        Effect::FetchTasks {
            page: 1,
            per_page: 20,
            ..
        }
    ));
}

#[test]
fn actualization_round_trip_clears_processing_once() {
    init_logging();
    let state = signed_in();

    let (state, effects) = update(
        state,
        Msg::ActualizeRequested {
            object_id: "obj-1".to_string(),
        },
    );
    assert!(state.signals().is_processing("obj-1"));
    assert_eq!(
        effects,
        vec![Effect::StartJob(JobRequest::ActualizeObject {
            object_id: "obj-1".to_string()
        })]
    );
    let version_before = state.signals().version();

    let (state, _) = push(state, object_job(TaskStatus::Running, "obj-1"));
    assert!(state.signals().is_processing("obj-1"));

    let (mut state, _) = push(state, object_job(TaskStatus::Completed, "obj-1"));
    assert!(!state.signals().is_processing("obj-1"));
    assert_eq!(state.signals().version(), version_before + 1);
    assert!(state
        .take_changes()
        .contains(&Change::ObjectUpdated("obj-1".to_string())));
    assert_eq!(state.tasks().len(), 1);
    assert_eq!(state.view().tasks[0].badge, StatusBadge::Done);
    assert_eq!(state.view().tasks[0].progress, Some(100));
}

#[test]
fn second_click_while_processing_sends_nothing() {
    let state = signed_in();
    let click = || Msg::ActualizeRequested {
        object_id: "obj-1".to_string(),
    };
    let (state, effects) = update(state, click());
    assert_eq!(effects.len(), 1);

    let (_state, effects) = update(state, click());
    assert!(effects.is_empty());
}

#[test]
fn failed_start_clears_processing_without_update() {
    let state = signed_in();
    let (state, _) = update(
        state,
        Msg::ActualizeRequested {
            object_id: "obj-1".to_string(),
        },
    );
    let (state, effects) = update(
        state,
        Msg::ActualizeRejected {
            object_id: "obj-1".to_string(),
            failure: RequestFailure::new(FailureClass::Unauthorized, "401 Unauthorized"),
        },
    );

    assert!(effects.is_empty());
    assert!(!state.signals().is_processing("obj-1"));
    assert_eq!(state.signals().version(), 0);
    let notice = state.notice().unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert!(notice.text.contains("Not allowed"));
}

#[test]
fn failed_job_event_clears_processing() {
    let state = signed_in();
    let (state, _) = update(
        state,
        Msg::ActualizeRequested {
            object_id: "obj-2".to_string(),
        },
    );
    let (state, _) = push(state, object_job(TaskStatus::Failed, "obj-2"));

    assert!(!state.signals().is_processing("obj-2"));
    assert!(!state.signals().has_update_for("obj-2"));
    assert_eq!(state.view().tasks[0].badge, StatusBadge::Failed);
    assert_eq!(state.view().tasks[0].progress, None);
}

#[test]
fn watched_object_is_refetched_after_refresh() {
    let state = signed_in();
    let (state, _) = update(
        state,
        Msg::ObjectsWatched(vec!["obj-1".to_string(), "obj-3".to_string()]),
    );

    let (state, effects) = push(state, object_job(TaskStatus::Completed, "obj-1"));
    assert_eq!(
        effects,
        vec![Effect::RefetchObject {
            object_id: "obj-1".to_string()
        }]
    );

    let (_state, effects) = push(state, object_job(TaskStatus::Completed, "obj-9"));
    assert!(effects.is_empty());
}

#[test]
fn actualize_requires_sign_in() {
    let (state, effects) = update(
        AppState::new(),
        Msg::ActualizeRequested {
            object_id: "obj-1".to_string(),
        },
    );
    assert!(effects.is_empty());
    assert!(!state.signals().is_processing("obj-1"));
    assert_eq!(state.notice().unwrap().level, NoticeLevel::Warning);
}

#[test]
fn stream_lifecycle_drives_live_flag() {
    let state = signed_in();
    assert!(!state.is_live());

    let (mut state, effects) = update(state, Msg::StreamConnected);
    assert!(state.is_live());
    assert!(state.take_changes().contains(&Change::Live(true)));
    assert!(matches!(effects.as_slice(), [Effect::FetchTasks { .. }]));

    let (state, effects) = update(state, Msg::StreamFailed("connection reset".to_string()));
    assert!(!state.is_live());
    assert!(effects.is_empty());
    assert!(state.notice().unwrap().text.contains("connection reset"));
}

#[test]
fn task_fetch_resolving_late_keeps_pushed_state() {
    let state = signed_in();
    let (state, effects) = update(state, Msg::TasksRefreshRequested);
    let ticket = match effects.as_slice() {
        [Effect::FetchTasks { ticket, .. }] => *ticket,
        other => panic!("unexpected effects {other:?}"),
    };

    let (state, _) = push(state, object_job(TaskStatus::Completed, "obj-1"));
    let (state, _) = update(
        state,
        Msg::TasksLoaded {
            ticket,
            tasks: vec![object_job(TaskStatus::Running, "obj-1")],
        },
    );

    let task = state.tasks().get("job-1").unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
}

#[test]
fn find_new_requires_categories_and_regions() {
    let state = signed_in();
    let (state, effects) = update(
        state,
        Msg::FindNewRequested {
            categories: vec!["apartment".to_string()],
            regions: vec![" ".to_string()],
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.notice().unwrap().level, NoticeLevel::Warning);

    let (state, _) = update(state, Msg::NoticeDismissed);
    assert!(state.notice().is_none());

    let (_state, effects) = update(
        state,
        Msg::FindNewRequested {
            categories: vec!["apartment".to_string(), "house".to_string()],
            regions: vec!["minsk".to_string()],
        },
    );
    assert_eq!(
        effects,
        vec![Effect::StartJob(JobRequest::FindNew {
            categories: vec!["apartment".to_string(), "house".to_string()],
            regions: vec!["minsk".to_string()],
        })]
    );
}

#[test]
fn bulk_actualization_validates_category_and_limit() {
    let state = signed_in();
    let (state, effects) = update(
        state,
        Msg::ActualizeActiveRequested {
            category: String::new(),
            limit: 100,
        },
    );
    assert!(effects.is_empty());

    let (state, effects) = update(
        state,
        Msg::ActualizeArchivedRequested {
            category: "house".to_string(),
            limit: 0,
        },
    );
    assert!(effects.is_empty());

    let (_state, effects) = update(
        state,
        Msg::ActualizeArchivedRequested {
            category: "house".to_string(),
            limit: 50,
        },
    );
    assert_eq!(
        effects,
        vec![Effect::StartJob(JobRequest::ActualizeArchived {
            category: "house".to_string(),
            limit: 50,
        })]
    );
}

#[test]
fn rejected_job_keeps_client_state() {
    let state = signed_in();
    let (state, _) = update(state, Msg::FavoritesLoaded(vec!["a".to_string()]));
    let (state, _) = update(
        state,
        Msg::JobRejected {
            kind: JobKind::ActualizeActive,
            failure: RequestFailure::new(FailureClass::Unauthorized, "403 Forbidden"),
        },
    );

    assert!(state.auth().is_signed_in());
    assert!(state.favorites().has("a"));
    assert!(state.notice().unwrap().text.starts_with("Permission denied"));
}

#[test]
fn favorite_toggle_follows_membership() {
    let state = signed_in();
    let (state, _) = update(state, Msg::FavoritesLoaded(vec!["a".to_string()]));

    let (state, effects) = update(
        state,
        Msg::FavoriteToggled {
            object_id: "a".to_string(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::RemoveFavorite {
            object_id: "a".to_string()
        }]
    );
    // Not removed until the backend confirms.
    assert!(state.favorites().has("a"));

    let (state, _) = update(
        state,
        Msg::FavoriteConfirmed {
            object_id: "a".to_string(),
            liked: false,
        },
    );
    assert!(!state.favorites().has("a"));

    let (_state, effects) = update(
        state,
        Msg::FavoriteToggled {
            object_id: "b".to_string(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::AddFavorite {
            object_id: "b".to_string()
        }]
    );
}

#[test]
fn logout_clears_favorites_and_closes_stream() {
    let state = signed_in();
    let (state, _) = update(state, Msg::FavoritesLoaded(vec!["a".to_string()]));
    let (state, _) = update(state, Msg::StreamConnected);

    let (state, effects) = update(state, Msg::LoggedOut);
    assert_eq!(effects, vec![Effect::CloseTaskStream]);
    assert!(state.favorites().is_empty());
    assert!(!state.is_live());
    assert!(!state.auth().is_signed_in());

    let (_state, effects) = update(state, Msg::LoggedOut);
    assert!(effects.is_empty());
}

#[test]
fn filter_edits_are_debounced_before_options_query() {
    let start = Instant::now();
    let state = AppState::new();

    let (state, _) = update(
        state,
        Msg::FilterChanged {
            key: "priceMax".to_string(),
            value: "1".to_string(),
            at: start,
        },
    );
    let (state, _) = update(
        state,
        Msg::FilterChanged {
            key: "priceMax".to_string(),
            value: "10".to_string(),
            at: start + Duration::from_millis(200),
        },
    );

    let (state, effects) = update(state, Msg::Tick(start + Duration::from_millis(600)));
    assert!(effects.is_empty());

    let (state, effects) = update(state, Msg::Tick(start + Duration::from_millis(700)));
    assert_eq!(
        effects,
        vec![Effect::FetchFilterOptions {
            query: "category=apartment&dealType=sale&priceCurrency=USD&priceMax=10".to_string()
        }]
    );

    let (_state, effects) = update(state, Msg::Tick(start + Duration::from_secs(5)));
    assert!(effects.is_empty());
}

#[test]
fn filter_change_resets_page_and_search_fetches_listings() {
    let (state, effects) = update(AppState::new(), Msg::PageChanged(3));
    assert_eq!(
        effects,
        vec![Effect::FetchListings {
            query: "category=apartment&dealType=sale&priceCurrency=USD&page=3&perPage=5"
                .to_string()
        }]
    );

    let (state, _) = update(
        state,
        Msg::FilterChanged {
            key: "rooms".to_string(),
            value: "1,2".to_string(),
            at: Instant::now(),
        },
    );
    assert_eq!(state.filters().page(), 1);

    let (_state, effects) = update(state, Msg::SearchRequested);
    assert_eq!(
        effects,
        vec![Effect::FetchListings {
            query: "category=apartment&dealType=sale&priceCurrency=USD&rooms=1,2&page=1&perPage=5"
                .to_string()
        }]
    );
}

#[test]
fn restoring_from_url_fetches_listings_and_options() {
    let (state, effects) = update(
        AppState::new(),
        Msg::FiltersRestored("category=house&page=2".to_string()),
    );
    assert_eq!(state.filters().page(), 2);
    assert_eq!(
        effects,
        vec![
            Effect::FetchListings {
                query: "category=house&dealType=sale&priceCurrency=USD&page=2&perPage=5"
                    .to_string()
            },
            Effect::FetchFilterOptions {
                query: "category=house&dealType=sale&priceCurrency=USD".to_string()
            },
        ]
    );
}

#[test]
fn page_field_moves_only_the_page() {
    let start = Instant::now();
    let mut state = AppState::new();
    state.take_changes();

    let (mut state, effects) = update(
        state,
        Msg::FilterChanged {
            key: "page".to_string(),
            value: "4".to_string(),
            at: start,
        },
    );
    assert_eq!(state.filters().page(), 4);
    assert_eq!(state.take_changes(), vec![Change::Filters]);
    assert_eq!(
        effects,
        vec![Effect::FetchListings {
            query: "category=apartment&dealType=sale&priceCurrency=USD&page=4&perPage=5"
                .to_string()
        }]
    );

    // Paging never asks for new filter options.
    let (state, effects) = update(state, Msg::Tick(start + Duration::from_secs(5)));
    assert!(effects.is_empty());

    let (mut state, effects) = update(
        state,
        Msg::FilterChanged {
            key: "page".to_string(),
            value: "abc".to_string(),
            at: start,
        },
    );
    assert!(effects.is_empty());
    assert!(state.take_changes().is_empty());
    assert_eq!(state.filters().page(), 4);
}
