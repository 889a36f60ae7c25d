use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};

use crate::task::{Task, TaskStatus, TaskType};

/// What a pushed task meant for the object it refreshes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalOutcome {
    /// Job completed: the object left "processing" and was flagged as updated.
    Refreshed { object_id: String },
    /// Job failed: the object left "processing" without an update flag.
    Abandoned { object_id: String },
    /// Not a terminal single-object job.
    Ignored,
}

/// Tracks objects with a refresh in flight and objects that recently finished one.
///
/// Views watch [`ActualizationSignals::version`] and re-check their own visible ids
/// with [`ActualizationSignals::has_update_for`] when it moves.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActualizationSignals {
    processing: BTreeSet<String>,
    updates: HashMap<String, DateTime<Utc>>,
    version: u64,
}

impl ActualizationSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the object was not already processing.
    pub fn start_processing(&mut self, object_id: &str) -> bool {
        self.processing.insert(object_id.to_owned())
    }

    /// Returns `true` if the object was processing.
    pub fn stop_processing(&mut self, object_id: &str) -> bool {
        self.processing.remove(object_id)
    }

    pub fn is_processing(&self, object_id: &str) -> bool {
        self.processing.contains(object_id)
    }

    pub fn processing(&self) -> impl Iterator<Item = &str> {
        self.processing.iter().map(String::as_str)
    }

    pub fn mark_updated(&mut self, object_id: &str, at: DateTime<Utc>) {
        self.updates.insert(object_id.to_owned(), at);
        self.version += 1;
    }

    pub fn last_updated(&self, object_id: &str) -> Option<DateTime<Utc>> {
        self.updates.get(object_id).copied()
    }

    pub fn has_update_for(&self, object_id: &str) -> bool {
        self.updates.contains_key(object_id)
    }

    /// Ids among `visible` that have been refreshed at least once.
    pub fn updated_among<'a, I>(&self, visible: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        visible
            .into_iter()
            .filter(|id| self.updates.contains_key(*id))
            .collect()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Reconciles a pushed task with the in-flight set.
    ///
    /// Matching is by the object id embedded in the result summary, not by job id.
    /// Any terminal status clears "processing"; only success flags the object as updated.
    pub fn apply_task(&mut self, task: &Task, now: DateTime<Utc>) -> SignalOutcome {
        if task.task_type != TaskType::ActualizeById || !task.status.is_terminal() {
            return SignalOutcome::Ignored;
        }
        let Some(object_id) = task.target_object_id() else {
            return SignalOutcome::Ignored;
        };
        let object_id = object_id.to_owned();

        self.stop_processing(&object_id);
        if task.status == TaskStatus::Completed {
            self.mark_updated(&object_id, now);
            SignalOutcome::Refreshed { object_id }
        } else {
            SignalOutcome::Abandoned { object_id }
        }
    }
}
