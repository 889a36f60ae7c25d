use std::fmt;

use listing_core::{
    Effect, FailureClass, FavoritesPage, FetchTicket, FilterOptions, JobRequest, ObjectPage,
    ObjectView, RequestFailure, Task, TasksPage,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    /// 401 or 403 from the backend.
    Unauthorized,
    HttpStatus(u16),
    Timeout,
    Network,
    /// The backend answered with a body we could not read.
    Decode,
    /// The task stream ended without an error.
    StreamClosed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::Unauthorized => write!(f, "unauthorized"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "unreadable response"),
            FailureKind::StreamClosed => write!(f, "stream closed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn class(&self) -> FailureClass {
        match self.kind {
            FailureKind::Unauthorized => FailureClass::Unauthorized,
            FailureKind::HttpStatus(_) | FailureKind::Decode => FailureClass::Server,
            FailureKind::InvalidUrl
            | FailureKind::Timeout
            | FailureKind::Network
            | FailureKind::StreamClosed => FailureClass::Transport,
        }
    }

    pub fn to_failure(&self) -> RequestFailure {
        RequestFailure::new(self.class(), self.message.clone())
    }
}

/// Work the engine thread can be asked to do. Mirrors the core effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    OpenTaskStream,
    CloseTaskStream,
    FetchTasks {
        ticket: FetchTicket,
        page: u32,
        per_page: u32,
    },
    FetchFavoriteIds,
    FetchFavorites {
        page: u32,
        limit: u32,
    },
    StartJob(JobRequest),
    SetFavorite {
        object_id: String,
        liked: bool,
    },
    FetchFilterOptions {
        query: String,
    },
    FetchListings {
        query: String,
    },
    FetchObject {
        object_id: String,
    },
}

impl From<Effect> for Request {
    fn from(effect: Effect) -> Self {
        match effect {
            Effect::OpenTaskStream => Request::OpenTaskStream,
            Effect::CloseTaskStream => Request::CloseTaskStream,
            Effect::FetchTasks {
                ticket,
                page,
                per_page,
            } => Request::FetchTasks {
                ticket,
                page,
                per_page,
            },
            Effect::FetchFavoriteIds => Request::FetchFavoriteIds,
            Effect::StartJob(job) => Request::StartJob(job),
            Effect::AddFavorite { object_id } => Request::SetFavorite {
                object_id,
                liked: true,
            },
            Effect::RemoveFavorite { object_id } => Request::SetFavorite {
                object_id,
                liked: false,
            },
            Effect::FetchFilterOptions { query } => Request::FetchFilterOptions { query },
            Effect::FetchListings { query } => Request::FetchListings { query },
            Effect::RefetchObject { object_id } => Request::FetchObject { object_id },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    StreamConnected,
    TaskPushed(Task),
    /// The stream is gone and will not be reopened until asked.
    StreamFailed(ApiError),
    TasksLoaded {
        ticket: FetchTicket,
        result: Result<TasksPage, ApiError>,
    },
    FavoriteIdsLoaded(Result<Vec<String>, ApiError>),
    FavoritesLoaded(Result<FavoritesPage, ApiError>),
    /// `Ok` carries the id of the task the backend queued.
    JobStarted {
        job: JobRequest,
        result: Result<String, ApiError>,
    },
    FavoriteChanged {
        object_id: String,
        liked: bool,
        result: Result<(), ApiError>,
    },
    FilterOptionsLoaded(Result<FilterOptions, ApiError>),
    ListingsLoaded(Result<ObjectPage, ApiError>),
    ObjectLoaded {
        object_id: String,
        result: Result<ObjectView, ApiError>,
    },
}
