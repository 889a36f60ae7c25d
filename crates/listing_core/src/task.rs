use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub type TaskId = String;

/// Kind of backend job, as named on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    FindNew,
    ActualizeActive,
    ActualizeArchived,
    ActualizeById,
}

impl TaskType {
    pub fn wire_name(self) -> &'static str {
        match self {
            TaskType::FindNew => "FIND_NEW",
            TaskType::ActualizeActive => "ACTUALIZE_ACTIVE",
            TaskType::ActualizeArchived => "ACTUALIZE_ARCHIVED",
            TaskType::ActualizeById => "ACTUALIZE_BY_ID",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Lifecycle of a task: `pending -> running -> {completed | failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters reported by the backend while a job runs.
///
/// The backend keeps the summary as a loose JSON map, so every counter is optional
/// and numbers may arrive as floats.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSummary {
    #[serde(default, deserialize_with = "counter", skip_serializing_if = "Option::is_none")]
    pub expected_results_count: Option<u64>,
    #[serde(default, deserialize_with = "counter", skip_serializing_if = "Option::is_none")]
    pub total_processed: Option<u64>,
    #[serde(default, deserialize_with = "counter", skip_serializing_if = "Option::is_none")]
    pub created: Option<u64>,
    #[serde(default, deserialize_with = "counter", skip_serializing_if = "Option::is_none")]
    pub updated: Option<u64>,
    #[serde(default, deserialize_with = "counter", skip_serializing_if = "Option::is_none")]
    pub archived: Option<u64>,
    #[serde(default, deserialize_with = "counter", skip_serializing_if = "Option::is_none")]
    pub new_links_found: Option<u64>,
    /// Master object id for single-object jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

fn counter<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?;
    Ok(raw.map(|value| {
        if value.is_finite() && value > 0.0 {
            value.trunc() as u64
        } else {
            0
        }
    }))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_summary: Option<ResultSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by_user_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum TaskDecodeError {
    #[error("task payload is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("task payload has an empty id")]
    MissingId,
    #[error("task {id} is {status} but has {field} set")]
    Inconsistent {
        id: TaskId,
        status: TaskStatus,
        field: &'static str,
    },
}

impl Task {
    /// Decodes a pushed or fetched task and checks its timestamp invariants.
    pub fn from_json(raw: &str) -> Result<Self, TaskDecodeError> {
        let task: Task = serde_json::from_str(raw)?;
        task.validate()?;
        Ok(task)
    }

    /// `started_at` implies the task left `pending`; `finished_at` implies a terminal status.
    pub fn validate(&self) -> Result<(), TaskDecodeError> {
        if self.id.trim().is_empty() {
            return Err(TaskDecodeError::MissingId);
        }
        if self.started_at.is_some() && self.status == TaskStatus::Pending {
            return Err(self.inconsistent("started_at"));
        }
        if self.finished_at.is_some() && !self.status.is_terminal() {
            return Err(self.inconsistent("finished_at"));
        }
        Ok(())
    }

    fn inconsistent(&self, field: &'static str) -> TaskDecodeError {
        TaskDecodeError::Inconsistent {
            id: self.id.clone(),
            status: self.status,
            field,
        }
    }

    /// Object embedded in the result summary of single-object jobs.
    pub fn target_object_id(&self) -> Option<&str> {
        self.result_summary
            .as_ref()
            .and_then(|summary| summary.id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Display label; unnamed tasks fall back to their type.
    pub fn label(&self) -> &str {
        if self.name.trim().is_empty() {
            self.task_type.wire_name()
        } else {
            &self.name
        }
    }
}

/// Percentage of work done, in `0..=100`.
///
/// Completed tasks always report 100 even when their counters lag behind.
pub fn progress(task: &Task) -> u8 {
    if task.status == TaskStatus::Completed {
        return 100;
    }
    let Some(summary) = task.result_summary.as_ref() else {
        return 0;
    };

    let processed = summary.total_processed.unwrap_or(0);
    let expected = match task.task_type {
        TaskType::FindNew => summary.new_links_found,
        TaskType::ActualizeActive | TaskType::ActualizeArchived | TaskType::ActualizeById => {
            summary.expected_results_count
        }
    };
    let expected = match expected {
        Some(value) if value > 0 => value,
        _ => return 0,
    };

    let percent = (processed as f64 / expected as f64 * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}
