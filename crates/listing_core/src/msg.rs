use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::auth::AuthUser;
use crate::registry::FetchTicket;
use crate::task::Task;

/// Which backend job a request or notice is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    FindNew,
    ActualizeActive,
    ActualizeArchived,
    ActualizeObject,
}

impl JobKind {
    pub fn describe(self) -> &'static str {
        match self {
            JobKind::FindNew => "search for new listings",
            JobKind::ActualizeActive => "actualization of active listings",
            JobKind::ActualizeArchived => "actualization of archived listings",
            JobKind::ActualizeObject => "object refresh",
        }
    }
}

/// Coarse reason a REST call failed, as far as the state machine cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Missing or rejected credential, or insufficient role.
    Unauthorized,
    /// The request never got a usable answer.
    Transport,
    /// The backend answered with an error.
    Server,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFailure {
    pub class: FailureClass,
    pub message: String,
}

impl RequestFailure {
    pub fn new(class: FailureClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Credential validated; the user is known.
    SessionStarted(AuthUser),
    /// User signed out.
    LoggedOut,
    /// Task stream acknowledged the subscription.
    StreamConnected,
    /// Task stream broke or was refused. It is not reopened automatically.
    StreamFailed(String),
    /// Task record pushed over the stream.
    TaskPushed {
        task: Task,
        received_at: DateTime<Utc>,
    },
    /// User asked for a manual reload of the task list.
    TasksRefreshRequested,
    /// Full task fetch finished.
    TasksLoaded { ticket: FetchTicket, tasks: Vec<Task> },
    TasksLoadFailed(RequestFailure),
    /// User clicked "refresh" on an object.
    ActualizeRequested { object_id: String },
    /// The single-object refresh job could not be started.
    ActualizeRejected {
        object_id: String,
        failure: RequestFailure,
    },
    FindNewRequested {
        categories: Vec<String>,
        regions: Vec<String>,
    },
    ActualizeActiveRequested { category: String, limit: u32 },
    ActualizeArchivedRequested { category: String, limit: u32 },
    /// Backend accepted a job.
    JobStarted(JobKind),
    /// Backend refused a bulk job.
    JobRejected {
        kind: JobKind,
        failure: RequestFailure,
    },
    /// Favorite ids fetched for the signed-in user.
    FavoritesLoaded(Vec<String>),
    /// User clicked the like toggle.
    FavoriteToggled { object_id: String },
    /// Favorites REST call succeeded.
    FavoriteConfirmed { object_id: String, liked: bool },
    FavoriteRejected {
        object_id: String,
        failure: RequestFailure,
    },
    /// Objects currently on screen; they are refetched when their refresh completes.
    ObjectsWatched(Vec<String>),
    /// User edited one filter field.
    FilterChanged {
        key: String,
        value: String,
        at: Instant,
    },
    /// Filters and page restored from a URL query string.
    FiltersRestored(String),
    PageChanged(u32),
    /// User submitted the filter form.
    SearchRequested,
    /// Timer tick driving the filter debounce.
    Tick(Instant),
    NoticeDismissed,
    /// Fallback for placeholder wiring.
    NoOp,
}
