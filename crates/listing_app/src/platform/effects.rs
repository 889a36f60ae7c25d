use std::io;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use client_logging::{client_debug, client_info};
use listing_core::{Effect, JobRequest, Msg, Session};
use listing_engine::{ApiClient, EngineEvent, EngineHandle, Request};

/// Hands effects to the engine and pulls its results back.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(client: ApiClient) -> io::Result<Self> {
        Ok(Self {
            engine: EngineHandle::new(client)?,
        })
    }

    pub fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            client_info!("Effect {:?}", effect);
            self.engine.submit(effect);
        }
    }

    pub fn submit(&self, request: Request) {
        client_debug!("Request {:?}", request);
        self.engine.submit(request);
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.engine.recv_timeout(timeout)
    }
}

/// Translates an engine result into a state-machine message.
///
/// Payload-only results (listings, filter options, objects, favorite pages) have no message;
/// callers render them directly.
pub fn event_to_msg(event: EngineEvent, now: DateTime<Utc>) -> Option<Msg> {
    let msg = match event {
        EngineEvent::StreamConnected => Msg::StreamConnected,
        EngineEvent::TaskPushed(task) => Msg::TaskPushed {
            task,
            received_at: now,
        },
        EngineEvent::StreamFailed(err) => Msg::StreamFailed(err.to_string()),
        EngineEvent::TasksLoaded { ticket, result } => match result {
            Ok(page) => Msg::TasksLoaded {
                ticket,
                tasks: page.data,
            },
            Err(err) => Msg::TasksLoadFailed(err.to_failure()),
        },
        EngineEvent::FavoriteIdsLoaded(result) => Msg::FavoritesLoaded(result.ok()?),
        EngineEvent::JobStarted { job, result } => match (result, job) {
            (Ok(_), job) => Msg::JobStarted(job.kind()),
            (Err(err), JobRequest::ActualizeObject { object_id }) => Msg::ActualizeRejected {
                object_id,
                failure: err.to_failure(),
            },
            (Err(err), job) => Msg::JobRejected {
                kind: job.kind(),
                failure: err.to_failure(),
            },
        },
        EngineEvent::FavoriteChanged {
            object_id,
            liked,
            result,
        } => match result {
            Ok(()) => Msg::FavoriteConfirmed { object_id, liked },
            Err(err) => Msg::FavoriteRejected {
                object_id,
                failure: err.to_failure(),
            },
        },
        EngineEvent::FavoritesLoaded(_)
        | EngineEvent::FilterOptionsLoaded(_)
        | EngineEvent::ListingsLoaded(_)
        | EngineEvent::ObjectLoaded { .. } => return None,
    };
    Some(msg)
}

/// Owns the session and the runner, closing the loop between them.
pub struct Driver {
    session: Session,
    runner: EffectRunner,
}

impl Driver {
    pub fn new(session: Session, runner: EffectRunner) -> Self {
        Self { session, runner }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn runner(&self) -> &EffectRunner {
        &self.runner
    }

    /// Applies `msg` and runs the resulting effects. Returns how many were run.
    pub fn dispatch(&mut self, msg: Msg) -> usize {
        let effects = self.session.dispatch(msg);
        let count = effects.len();
        self.runner.run(effects);
        count
    }

    /// Waits up to `timeout` for one engine event and applies it, followed by a tick.
    pub fn step(&mut self, timeout: Duration) -> Option<EngineEvent> {
        let event = self.runner.recv_timeout(timeout);
        let effects = absorb(&mut self.session, event.as_ref(), Instant::now());
        self.runner.run(effects);
        event
    }
}

/// Applies an optional engine result and then a tick at `now`, so timers advance even
/// while events keep arriving.
fn absorb(session: &mut Session, event: Option<&EngineEvent>, now: Instant) -> Vec<Effect> {
    let mut effects = Vec::new();
    if let Some(msg) = event.and_then(|event| event_to_msg(event.clone(), Utc::now())) {
        effects.extend(session.dispatch(msg));
    }
    effects.extend(session.dispatch(Msg::Tick(now)));
    effects
}

#[cfg(test)]
mod tests {
    use super::*;
    use listing_core::{FailureClass, JobKind, StateSettings, TaskRegistry, TasksPage};
    use listing_engine::{ApiError, FailureKind};
    use pretty_assertions::assert_eq;

    fn error(kind: FailureKind) -> ApiError {
        ApiError {
            kind,
            message: "nope".to_string(),
        }
    }

    #[test]
    fn rejected_object_refresh_names_the_object() {
        let msg = event_to_msg(
            EngineEvent::JobStarted {
                job: JobRequest::ActualizeObject {
                    object_id: "obj-1".to_string(),
                },
                result: Err(error(FailureKind::Unauthorized)),
            },
            Utc::now(),
        );
        match msg {
            Some(Msg::ActualizeRejected { object_id, failure }) => {
                assert_eq!(object_id, "obj-1");
                assert_eq!(failure.class, FailureClass::Unauthorized);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn accepted_bulk_job_reports_its_kind() {
        let msg = event_to_msg(
            EngineEvent::JobStarted {
                job: JobRequest::ActualizeActive {
                    category: "house".to_string(),
                    limit: 10,
                },
                result: Ok("job-1".to_string()),
            },
            Utc::now(),
        );
        assert_eq!(msg, Some(Msg::JobStarted(JobKind::ActualizeActive)));
    }

    #[test]
    fn failed_task_fetch_becomes_a_load_failure() {
        let ticket = TaskRegistry::new().begin_fetch();
        let failed = event_to_msg(
            EngineEvent::TasksLoaded {
                ticket,
                result: Err(error(FailureKind::Timeout)),
            },
            Utc::now(),
        );
        assert!(matches!(
            failed,
            Some(Msg::TasksLoadFailed(failure)) if failure.class == FailureClass::Transport
        ));

        let loaded = event_to_msg(
            EngineEvent::TasksLoaded {
                ticket,
                result: Ok(TasksPage {
                    data: Vec::new(),
                    total: 0,
                    page: 1,
                    per_page: 20,
                }),
            },
            Utc::now(),
        );
        assert_eq!(
            loaded,
            Some(Msg::TasksLoaded {
                ticket,
                tasks: Vec::new()
            })
        );
    }

    #[test]
    fn payload_events_have_no_message() {
        assert_eq!(
            event_to_msg(EngineEvent::ListingsLoaded(Err(error(FailureKind::Network))), Utc::now()),
            None
        );
        assert_eq!(
            event_to_msg(
                EngineEvent::FavoriteIdsLoaded(Err(error(FailureKind::HttpStatus(500)))),
                Utc::now()
            ),
            None
        );
    }

    fn quick_filters() -> Session {
        Session::new(StateSettings {
            filter_debounce: Duration::ZERO,
            ..StateSettings::default()
        })
    }

    fn change_price(session: &mut Session, now: Instant) {
        session.dispatch(Msg::FilterChanged {
            key: "priceMax".to_string(),
            value: "10".to_string(),
            at: now,
        });
    }

    #[test]
    fn busy_event_flow_still_fires_the_filter_debounce() {
        let mut session = quick_filters();
        let now = Instant::now();
        change_price(&mut session, now);

        let effects = absorb(&mut session, Some(&EngineEvent::StreamConnected), now);
        assert!(effects.contains(&Effect::FetchFilterOptions {
            query: "category=apartment&dealType=sale&priceCurrency=USD&priceMax=10".to_string()
        }));

        let effects = absorb(&mut session, Some(&EngineEvent::StreamConnected), now);
        assert!(!effects
            .iter()
            .any(|effect| matches!(effect, Effect::FetchFilterOptions { .. })));
    }

    #[test]
    fn idle_step_is_a_plain_tick() {
        let mut session = quick_filters();
        let now = Instant::now();
        change_price(&mut session, now);

        let effects = absorb(&mut session, None, now);
        assert_eq!(
            effects,
            vec![Effect::FetchFilterOptions {
                query: "category=apartment&dealType=sale&priceCurrency=USD&priceMax=10"
                    .to_string()
            }]
        );
    }
}
