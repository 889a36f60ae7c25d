use chrono::{DateTime, Utc};

use crate::state::{AppState, Notice};
use crate::task::{progress, Task, TaskStatus, TaskType};

/// Badge shown next to a task in the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusBadge {
    Waiting,
    Working,
    Done,
    Failed,
}

impl From<TaskStatus> for StatusBadge {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Pending => StatusBadge::Waiting,
            TaskStatus::Running => StatusBadge::Working,
            TaskStatus::Completed => StatusBadge::Done,
            TaskStatus::Failed => StatusBadge::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRowView {
    pub id: String,
    pub label: String,
    pub status: TaskStatus,
    pub badge: StatusBadge,
    /// Only meaningful for running and completed tasks.
    pub progress: Option<u8>,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TaskRowView {
    pub fn from_task(task: &Task) -> Self {
        let progress = match task.status {
            TaskStatus::Running | TaskStatus::Completed => Some(progress(task)),
            TaskStatus::Pending | TaskStatus::Failed => None,
        };
        Self {
            id: task.id.clone(),
            label: task.label().to_owned(),
            status: task.status,
            badge: task.status.into(),
            progress,
            summary: summary_line(task),
            created_at: task.created_at,
        }
    }
}

fn summary_line(task: &Task) -> Option<String> {
    let summary = task.result_summary.as_ref()?;
    let mut parts = Vec::new();
    if let Some(created) = summary.created.filter(|n| *n > 0) {
        parts.push(format!("+{created} new"));
    }
    if let Some(updated) = summary.updated.filter(|n| *n > 0) {
        parts.push(format!("~{updated} updated"));
    }
    if let Some(archived) = summary.archived.filter(|n| *n > 0) {
        parts.push(format!("-{archived} archived"));
    }
    let processed = summary.total_processed.unwrap_or(0);
    parts.push(match task.task_type {
        TaskType::FindNew => format!(
            "{processed} (links found: {})",
            summary.new_links_found.unwrap_or(0)
        ),
        _ => format!(
            "{processed} / {}",
            summary.expected_results_count.unwrap_or(0)
        ),
    });
    Some(parts.join(", "))
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub live: bool,
    pub user_email: Option<String>,
    pub tasks: Vec<TaskRowView>,
    pub processing: Vec<String>,
    pub favorites_count: usize,
    pub updates_version: u64,
    pub filter_query: String,
    pub page: u32,
    pub notice: Option<Notice>,
}

impl AppViewModel {
    pub(crate) fn build(state: &AppState) -> Self {
        Self {
            live: state.is_live(),
            user_email: state.auth().user().map(|user| user.email.clone()),
            tasks: state.tasks().iter().map(TaskRowView::from_task).collect(),
            processing: state
                .signals()
                .processing()
                .map(ToOwned::to_owned)
                .collect(),
            favorites_count: state.favorites().len(),
            updates_version: state.signals().version(),
            filter_query: state.filters().url_query(),
            page: state.filters().page(),
            notice: state.notice().cloned(),
        }
    }
}
