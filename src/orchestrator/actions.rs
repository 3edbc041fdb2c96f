//! Lifecycle actions on workers and tasks, and when each one is offered.

use crate::api::ForgeApi;
use crate::error::ApiError;
use crate::model::Status;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleAction {
    /// Task id.
    Cancel(String),
    /// Worker id.
    Pause(String),
    /// Worker id.
    Resume(String),
    /// Task id.
    Retry(String),
}

impl LifecycleAction {
    pub fn target(&self) -> &str {
        match self {
            LifecycleAction::Cancel(id)
            | LifecycleAction::Pause(id)
            | LifecycleAction::Resume(id)
            | LifecycleAction::Retry(id) => id,
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            LifecycleAction::Cancel(_) => "cancel",
            LifecycleAction::Pause(_) => "pause",
            LifecycleAction::Resume(_) => "resume",
            LifecycleAction::Retry(_) => "retry",
        }
    }
}

/// Actions offered on a worker row. A busy worker's id is its task id, so cancel targets it.
pub fn worker_actions(worker_id: &str, status: &Status) -> Vec<LifecycleAction> {
    let id = worker_id.to_string();
    match status {
        Status::Busy => vec![LifecycleAction::Cancel(id)],
        Status::Idle => vec![LifecycleAction::Pause(id)],
        Status::Paused => vec![LifecycleAction::Resume(id)],
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskList {
    Pending,
    Completed,
}

pub fn task_actions(task_id: &str, list: TaskList, status: Option<&Status>) -> Vec<LifecycleAction> {
    let id = task_id.to_string();
    match (list, status) {
        (TaskList::Pending, _) => vec![LifecycleAction::Cancel(id)],
        (TaskList::Completed, Some(Status::Troubled)) => vec![LifecycleAction::Retry(id)],
        (TaskList::Completed, _) => Vec::new(),
    }
}

/// Send one action. A 2xx reply with `status: "error"` is reported as [`ApiError::Rejected`].
/// No local state is touched; callers re-poll to observe the effect.
pub async fn dispatch(api: &dyn ForgeApi, action: &LifecycleAction) -> Result<String, ApiError> {
    tracing::info!(action = action.verb(), target = action.target(), "dispatching action");
    let resp = match action {
        LifecycleAction::Cancel(id) => api.cancel_task(id).await?,
        LifecycleAction::Pause(id) => api.pause_minion(id).await?,
        LifecycleAction::Resume(id) => api.resume_minion(id).await?,
        LifecycleAction::Retry(id) => api.retry_task(id).await?,
    };
    if resp.is_rejected() {
        return Err(ApiError::Rejected(resp.message));
    }
    let mut message = if resp.message.is_empty() {
        format!("{} {} accepted", action.verb(), action.target())
    } else {
        resp.message
    };
    if let Some(new_id) = resp.new_task_id {
        message.push_str(&format!(" (new task {new_id})"));
    }
    Ok(message)
}
