//! Last-known server state, one independently updated slot per polled resource.

use crate::model::{Metrics, Task, Worker};
use time::OffsetDateTime;

/// One polled resource: its latest good snapshot plus the outcome of the latest fetch.
#[derive(Debug, Clone)]
pub struct ResourceState<T> {
    pub data: Option<T>,
    /// Set while the most recent applied fetch failed; `data` keeps the last good value.
    pub error: Option<String>,
    /// Poll cycle that produced the applied outcome; 0 before the first one.
    pub seq: u64,
    pub updated_at: Option<OffsetDateTime>,
}

impl<T> Default for ResourceState<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            seq: 0,
            updated_at: None,
        }
    }
}

impl<T> ResourceState<T> {
    /// Apply the outcome of cycle `seq`. Returns false (and changes nothing) when a newer
    /// or equal cycle has already been applied.
    pub fn apply(&mut self, seq: u64, outcome: Result<T, String>) -> bool {
        if seq <= self.seq {
            return false;
        }
        self.seq = seq;
        match outcome {
            Ok(data) => {
                self.data = Some(data);
                self.error = None;
                self.updated_at = Some(OffsetDateTime::now_utc());
            }
            Err(e) => self.error = Some(e),
        }
        true
    }

    pub fn is_loading(&self) -> bool {
        self.data.is_none() && self.error.is_none()
    }

    /// Whole seconds since the last successful fetch, as of `now`.
    pub fn age_secs(&self, now: OffsetDateTime) -> Option<u64> {
        self.updated_at.map(|t| (now - t).whole_seconds().max(0) as u64)
    }
}

#[derive(Debug, Clone)]
pub enum ResourceUpdate {
    Workers(Result<Vec<Worker>, String>),
    Pending(Result<Vec<Task>, String>),
    Completed(Result<Vec<Task>, String>),
    Metrics(Result<Metrics, String>),
}

impl ResourceUpdate {
    pub fn name(&self) -> &'static str {
        match self {
            ResourceUpdate::Workers(_) => "minion_status",
            ResourceUpdate::Pending(_) => "pending_tasks",
            ResourceUpdate::Completed(_) => "completed_tasks",
            ResourceUpdate::Metrics(_) => "minion_metrics",
        }
    }
}

/// A fetch result stamped with the poll cycle that issued it.
#[derive(Debug, Clone)]
pub struct PollUpdate {
    pub seq: u64,
    pub update: ResourceUpdate,
}

#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    pub workers: ResourceState<Vec<Worker>>,
    pub pending: ResourceState<Vec<Task>>,
    pub completed: ResourceState<Vec<Task>>,
    pub metrics: ResourceState<Metrics>,
    /// Poll cycles started so far.
    pub cycles: u64,
}

impl StatusBoard {
    pub fn apply(&mut self, PollUpdate { seq, update }: PollUpdate) -> bool {
        match update {
            ResourceUpdate::Workers(r) => self.workers.apply(seq, r),
            ResourceUpdate::Pending(r) => self.pending.apply(seq, r),
            ResourceUpdate::Completed(r) => self.completed.apply(seq, r),
            ResourceUpdate::Metrics(r) => self.metrics.apply(seq, r),
        }
    }

    pub fn workers(&self) -> &[Worker] {
        self.workers.data.as_deref().unwrap_or(&[])
    }

    pub fn pending(&self) -> &[Task] {
        self.pending.data.as_deref().unwrap_or(&[])
    }

    pub fn completed(&self) -> &[Task] {
        self.completed.data.as_deref().unwrap_or(&[])
    }

    /// Workers are named after the task they run; show that task's mode.
    pub fn current_task_mode(&self, worker_id: &str) -> Option<&str> {
        self.pending()
            .iter()
            .find(|t| t.task_id == worker_id)
            .and_then(|t| t.mode.as_deref())
    }

    /// Any resource currently errored.
    pub fn errors(&self) -> Vec<(&'static str, &str)> {
        [
            ("minion_status", self.workers.error.as_deref()),
            ("pending_tasks", self.pending.error.as_deref()),
            ("completed_tasks", self.completed.error.as_deref()),
            ("minion_metrics", self.metrics.error.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, e)| e.map(|e| (name, e)))
        .collect()
    }
}
