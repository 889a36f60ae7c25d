use crate::auth::AuthState;
use crate::effect::{Effect, JobRequest};
use crate::filter::{FilterSession, PAGE_KEY};
use crate::msg::{FailureClass, JobKind, Msg, RequestFailure};
use crate::signals::SignalOutcome;
use crate::state::{AppState, Change, NoticeLevel};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::SessionStarted(user) => {
            state.auth = AuthState::SignedIn(user);
            state.record(Change::Auth);
            vec![
                Effect::OpenTaskStream,
                Effect::FetchFavoriteIds,
                fetch_tasks(&state),
            ]
        }
        Msg::LoggedOut => {
            if !state.auth.is_signed_in() {
                return (state, Vec::new());
            }
            state.auth = AuthState::SignedOut;
            state.favorites.clear();
            state.tasks.replace_all(Vec::new());
            state.set_live(false);
            state.record(Change::Auth);
            state.record(Change::Favorites);
            state.record(Change::Tasks);
            vec![Effect::CloseTaskStream]
        }
        Msg::StreamConnected => {
            state.set_live(true);
            // Events may have been missed before the subscription was acknowledged.
            vec![fetch_tasks(&state)]
        }
        Msg::StreamFailed(reason) => {
            state.set_live(false);
            state.set_notice(NoticeLevel::Warning, format!("Task stream offline: {reason}"));
            Vec::new()
        }
        Msg::TaskPushed { task, received_at } => {
            state.set_live(true);
            let outcome = state.signals.apply_task(&task, received_at);
            let id = task.id.clone();
            if state.tasks.upsert(task) {
                state.record(Change::Tasks);
            }
            state.record(Change::Task(id));

            match outcome {
                SignalOutcome::Refreshed { object_id } => {
                    state.record(Change::Processing(object_id.clone()));
                    state.record(Change::ObjectUpdated(object_id.clone()));
                    if state.watched.contains(&object_id) {
                        vec![Effect::RefetchObject { object_id }]
                    } else {
                        Vec::new()
                    }
                }
                SignalOutcome::Abandoned { object_id } => {
                    state.set_notice(
                        NoticeLevel::Error,
                        format!("Refresh of object {object_id} failed"),
                    );
                    state.record(Change::Processing(object_id));
                    Vec::new()
                }
                SignalOutcome::Ignored => Vec::new(),
            }
        }
        Msg::TasksRefreshRequested => vec![fetch_tasks(&state)],
        Msg::TasksLoaded { ticket, tasks } => {
            state.tasks.apply_snapshot(ticket, tasks);
            state.record(Change::Tasks);
            Vec::new()
        }
        Msg::TasksLoadFailed(failure) => {
            state.set_notice(
                NoticeLevel::Error,
                format!("Could not load tasks: {}", failure.message),
            );
            Vec::new()
        }
        Msg::ActualizeRequested { object_id } => {
            if !state.auth.is_signed_in() {
                state.set_notice(NoticeLevel::Warning, "Sign in to refresh listings");
                return (state, Vec::new());
            }
            if !state.signals.start_processing(&object_id) {
                return (state, Vec::new());
            }
            state.record(Change::Processing(object_id.clone()));
            vec![Effect::StartJob(JobRequest::ActualizeObject { object_id })]
        }
        Msg::ActualizeRejected { object_id, failure } => {
            if state.signals.stop_processing(&object_id) {
                state.record(Change::Processing(object_id.clone()));
            }
            let text = match failure.class {
                FailureClass::Unauthorized => {
                    format!("Not allowed to refresh object {object_id}")
                }
                FailureClass::Transport | FailureClass::Server => {
                    format!("Could not start refresh of {object_id}: {}", failure.message)
                }
            };
            state.set_notice(NoticeLevel::Error, text);
            Vec::new()
        }
        Msg::FindNewRequested {
            categories,
            regions,
        } => {
            let categories = non_empty(categories);
            let regions = non_empty(regions);
            if categories.is_empty() || regions.is_empty() {
                state.set_notice(
                    NoticeLevel::Warning,
                    "Select at least one category and one region",
                );
                return (state, Vec::new());
            }
            vec![Effect::StartJob(JobRequest::FindNew {
                categories,
                regions,
            })]
        }
        Msg::ActualizeActiveRequested { category, limit } => {
            if validate_bulk(&mut state, &category, limit) {
                vec![Effect::StartJob(JobRequest::ActualizeActive {
                    category: category.trim().to_owned(),
                    limit,
                })]
            } else {
                Vec::new()
            }
        }
        Msg::ActualizeArchivedRequested { category, limit } => {
            if validate_bulk(&mut state, &category, limit) {
                vec![Effect::StartJob(JobRequest::ActualizeArchived {
                    category: category.trim().to_owned(),
                    limit,
                })]
            } else {
                Vec::new()
            }
        }
        Msg::JobStarted(kind) => {
            if kind != JobKind::ActualizeObject {
                state.set_notice(NoticeLevel::Info, format!("Started {}", kind.describe()));
            }
            Vec::new()
        }
        Msg::JobRejected { kind, failure } => {
            state.set_notice(NoticeLevel::Error, job_failure_text(kind, &failure));
            Vec::new()
        }
        Msg::FavoritesLoaded(ids) => {
            state.favorites.load(ids);
            state.record(Change::Favorites);
            Vec::new()
        }
        Msg::FavoriteToggled { object_id } => {
            if !state.auth.is_signed_in() {
                state.set_notice(NoticeLevel::Warning, "Sign in to keep favorites");
                return (state, Vec::new());
            }
            if state.favorites.has(&object_id) {
                vec![Effect::RemoveFavorite { object_id }]
            } else {
                vec![Effect::AddFavorite { object_id }]
            }
        }
        Msg::FavoriteConfirmed { object_id, liked } => {
            let changed = if liked {
                state.favorites.add(&object_id)
            } else {
                state.favorites.remove(&object_id)
            };
            if changed {
                state.record(Change::Favorites);
            }
            Vec::new()
        }
        Msg::FavoriteRejected { object_id, failure } => {
            state.set_notice(
                NoticeLevel::Error,
                format!("Could not update favorite {object_id}: {}", failure.message),
            );
            Vec::new()
        }
        Msg::ObjectsWatched(ids) => {
            state.watched = ids.into_iter().collect();
            Vec::new()
        }
        Msg::FilterChanged { key, value, at } => {
            if !state.filters.set_field(&key, &value) {
                Vec::new()
            } else if key == PAGE_KEY {
                state.record(Change::Filters);
                vec![fetch_listings(&state)]
            } else {
                state.options_debounce.touch(at);
                state.record(Change::Filters);
                Vec::new()
            }
        }
        Msg::FiltersRestored(query) => {
            state.filters = FilterSession::from_url(&query);
            state.record(Change::Filters);
            vec![
                fetch_listings(&state),
                Effect::FetchFilterOptions {
                    query: state.filters.filters().to_query(),
                },
            ]
        }
        Msg::PageChanged(page) => {
            state.filters.set_page(page);
            state.record(Change::Filters);
            vec![fetch_listings(&state)]
        }
        Msg::SearchRequested => {
            state.filters.set_page(1);
            state.record(Change::Filters);
            vec![fetch_listings(&state)]
        }
        Msg::Tick(now) => {
            if state.options_debounce.poll(now) {
                vec![Effect::FetchFilterOptions {
                    query: state.filters.filters().to_query(),
                }]
            } else {
                Vec::new()
            }
        }
        Msg::NoticeDismissed => {
            if state.notice.take().is_some() {
                state.record(Change::Notice);
            }
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn fetch_tasks(state: &AppState) -> Effect {
    Effect::FetchTasks {
        ticket: state.tasks.begin_fetch(),
        page: 1,
        per_page: state.settings().tasks_per_page,
    }
}

fn fetch_listings(state: &AppState) -> Effect {
    Effect::FetchListings {
        query: state
            .filters
            .listing_query(state.settings().listings_per_page),
    }
}

fn non_empty(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .collect()
}

fn validate_bulk(state: &mut AppState, category: &str, limit: u32) -> bool {
    if category.trim().is_empty() {
        state.set_notice(NoticeLevel::Warning, "Select a category to actualize");
        return false;
    }
    if limit == 0 {
        state.set_notice(NoticeLevel::Warning, "Limit must be at least 1");
        return false;
    }
    true
}

fn job_failure_text(kind: JobKind, failure: &RequestFailure) -> String {
    match failure.class {
        FailureClass::Unauthorized => format!("Permission denied for {}", kind.describe()),
        FailureClass::Transport | FailureClass::Server => {
            format!("Could not start {}: {}", kind.describe(), failure.message)
        }
    }
}
