use std::collections::HashSet;

use crate::task::Task;

/// Marks the moment a full task fetch was started.
///
/// Pushes applied after the ticket was issued are newer than anything the fetch can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    task: Task,
    stamp: u64,
}

/// Ordered, id-unique collection of known tasks. Newest-seen tasks sit at the front.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskRegistry {
    entries: Vec<Entry>,
    generation: u64,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces a known task in place, or prepends an unknown one.
    ///
    /// Returns `true` when the task was new.
    pub fn upsert(&mut self, task: Task) -> bool {
        self.generation += 1;
        let stamp = self.generation;
        match self.position(&task.id) {
            Some(index) => {
                self.entries[index] = Entry { task, stamp };
                false
            }
            None => {
                self.entries.insert(0, Entry { task, stamp });
                true
            }
        }
    }

    /// Replaces the whole collection. Duplicate ids keep their first occurrence.
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        let stamp = self.generation;
        let mut seen = HashSet::new();
        self.entries = tasks
            .into_iter()
            .filter(|task| seen.insert(task.id.clone()))
            .map(|task| Entry { task, stamp })
            .collect();
    }

    pub fn begin_fetch(&self) -> FetchTicket {
        FetchTicket(self.generation)
    }

    /// Applies a full fetch that was started at `ticket`.
    ///
    /// Tasks pushed after the ticket win over their snapshot rows, and pushed tasks the
    /// snapshot does not know about stay at the front.
    pub fn apply_snapshot(&mut self, ticket: FetchTicket, tasks: Vec<Task>) {
        let fresher: Vec<Entry> = self
            .entries
            .iter()
            .filter(|entry| entry.stamp > ticket.0)
            .cloned()
            .collect();

        let mut seen = HashSet::new();
        let snapshot: Vec<Task> = tasks
            .into_iter()
            .filter(|task| seen.insert(task.id.clone()))
            .collect();

        let mut entries: Vec<Entry> = fresher
            .iter()
            .filter(|entry| !seen.contains(&entry.task.id))
            .cloned()
            .collect();
        entries.extend(snapshot.into_iter().map(|task| {
            match fresher.iter().find(|entry| entry.task.id == task.id) {
                Some(newer) => newer.clone(),
                None => Entry {
                    task,
                    stamp: ticket.0,
                },
            }
        }));
        self.entries = entries;
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.entries
            .iter()
            .find(|entry| entry.task.id == id)
            .map(|entry| &entry.task)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.entries.iter().map(|entry| &entry.task)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.task.id == id)
    }
}
