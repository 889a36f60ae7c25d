use crate::msg::JobKind;
use crate::registry::FetchTicket;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobRequest {
    FindNew {
        categories: Vec<String>,
        regions: Vec<String>,
    },
    ActualizeActive {
        category: String,
        limit: u32,
    },
    ActualizeArchived {
        category: String,
        limit: u32,
    },
    ActualizeObject {
        object_id: String,
    },
}

impl JobRequest {
    pub fn kind(&self) -> JobKind {
        match self {
            JobRequest::FindNew { .. } => JobKind::FindNew,
            JobRequest::ActualizeActive { .. } => JobKind::ActualizeActive,
            JobRequest::ActualizeArchived { .. } => JobKind::ActualizeArchived,
            JobRequest::ActualizeObject { .. } => JobKind::ActualizeObject,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    OpenTaskStream,
    CloseTaskStream,
    FetchTasks {
        ticket: FetchTicket,
        page: u32,
        per_page: u32,
    },
    FetchFavoriteIds,
    StartJob(JobRequest),
    AddFavorite { object_id: String },
    RemoveFavorite { object_id: String },
    FetchFilterOptions { query: String },
    FetchListings { query: String },
    /// Silently reload an object whose refresh just completed.
    RefetchObject { object_id: String },
}
