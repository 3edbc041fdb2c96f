//! Boundary to the forge HTTP API.
//!
//! Everything above this module talks to the server through [`ForgeApi`], so the
//! poller, dispatcher and submission code can run against an in-memory fake in tests.

mod http;

#[cfg(test)]
pub(crate) mod fake;

pub use http::HttpForgeClient;

use crate::error::ApiError;
use crate::model::{
    ActionResponse, Gadget, Metrics, SubmitRequest, SubmitResponse, Task, UploadResponse, Worker,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// Called with `(bytes_sent, bytes_total)` while an upload body is produced.
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

#[async_trait]
pub trait ForgeApi: Send + Sync {
    async fn gadgets(&self) -> Result<Vec<Gadget>, ApiError>;
    async fn minion_status(&self) -> Result<Vec<Worker>, ApiError>;
    async fn pending_tasks(&self) -> Result<Vec<Task>, ApiError>;
    async fn completed_tasks(&self) -> Result<Vec<Task>, ApiError>;
    async fn minion_metrics(&self) -> Result<Metrics, ApiError>;
    async fn task_details(&self, task_id: &str) -> Result<Task, ApiError>;
    async fn submit_task(&self, request: &SubmitRequest) -> Result<SubmitResponse, ApiError>;
    async fn cancel_task(&self, task_id: &str) -> Result<ActionResponse, ApiError>;
    async fn retry_task(&self, task_id: &str) -> Result<ActionResponse, ApiError>;
    async fn pause_minion(&self, worker_id: &str) -> Result<ActionResponse, ApiError>;
    async fn resume_minion(&self, worker_id: &str) -> Result<ActionResponse, ApiError>;
    async fn upload_file(
        &self,
        file_name: String,
        contents: Bytes,
        progress: ProgressFn,
    ) -> Result<UploadResponse, ApiError>;
}
