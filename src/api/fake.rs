//! In-memory [`ForgeApi`] used by unit tests.

use super::{ForgeApi, ProgressFn};
use crate::error::ApiError;
use crate::model::{
    ActionResponse, Gadget, Metrics, Status, SubmitRequest, SubmitResponse, Task, UploadResponse,
    Worker,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
struct Inner {
    gadgets: Vec<Gadget>,
    workers: Vec<Worker>,
    pending: Vec<Task>,
    completed: Vec<Task>,
    metrics: Metrics,
    failing: HashSet<&'static str>,
    latency: HashMap<&'static str, Duration>,
    calls: HashMap<&'static str, usize>,
    submissions: Vec<SubmitRequest>,
    submit_response: Option<SubmitResponse>,
    action_response: Option<ActionResponse>,
    actions: Vec<(&'static str, String)>,
    uploads: Vec<(String, usize)>,
}

#[derive(Default)]
pub(crate) struct FakeApi {
    inner: Mutex<Inner>,
}

impl FakeApi {
    pub fn with_gadgets(gadgets: Vec<Gadget>) -> Self {
        let api = Self::default();
        api.inner.lock().unwrap().gadgets = gadgets;
        api
    }

    pub fn set_workers(&self, workers: Vec<(&str, Status)>) {
        self.inner.lock().unwrap().workers = workers
            .into_iter()
            .map(|(id, status)| Worker {
                id: id.to_string(),
                status,
            })
            .collect();
    }

    pub fn set_pending(&self, tasks: Vec<Task>) {
        self.inner.lock().unwrap().pending = tasks;
    }

    pub fn set_completed(&self, tasks: Vec<Task>) {
        self.inner.lock().unwrap().completed = tasks;
    }

    pub fn set_metrics(&self, metrics: Metrics) {
        self.inner.lock().unwrap().metrics = metrics;
    }

    /// Make every call to `endpoint` fail with a 500 until cleared.
    pub fn fail(&self, endpoint: &'static str, failing: bool) {
        let mut inner = self.inner.lock().unwrap();
        if failing {
            inner.failing.insert(endpoint);
        } else {
            inner.failing.remove(endpoint);
        }
    }

    pub fn delay(&self, endpoint: &'static str, latency: Duration) {
        self.inner.lock().unwrap().latency.insert(endpoint, latency);
    }

    pub fn respond_to_submit(&self, task_ids: &[&str], result_dirs: &[&str]) {
        self.inner.lock().unwrap().submit_response = Some(SubmitResponse {
            task_ids: task_ids.iter().map(|s| s.to_string()).collect(),
            result_dirs: result_dirs.iter().map(|s| s.to_string()).collect(),
            status: Some("submitted".into()),
        });
    }

    pub fn respond_to_actions(&self, response: ActionResponse) {
        self.inner.lock().unwrap().action_response = Some(response);
    }

    pub fn calls(&self, endpoint: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .calls
            .get(endpoint)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.inner.lock().unwrap().calls.values().sum()
    }

    pub fn submissions(&self) -> Vec<SubmitRequest> {
        self.inner.lock().unwrap().submissions.clone()
    }

    pub fn actions(&self) -> Vec<(&'static str, String)> {
        self.inner.lock().unwrap().actions.clone()
    }

    pub fn uploads(&self) -> Vec<(String, usize)> {
        self.inner.lock().unwrap().uploads.clone()
    }

    /// Count the call, wait out any configured latency, then fail if asked to.
    async fn enter(&self, endpoint: &'static str) -> Result<(), ApiError> {
        let (latency, failing) = {
            let mut inner = self.inner.lock().unwrap();
            *inner.calls.entry(endpoint).or_insert(0) += 1;
            (
                inner.latency.get(endpoint).copied(),
                inner.failing.contains(endpoint),
            )
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if failing {
            return Err(ApiError::Status {
                code: 500,
                message: format!("{endpoint} unavailable"),
            });
        }
        Ok(())
    }

    async fn action(&self, endpoint: &'static str, id: &str) -> Result<ActionResponse, ApiError> {
        self.enter(endpoint).await?;
        let mut inner = self.inner.lock().unwrap();
        inner.actions.push((endpoint, id.to_string()));
        Ok(inner.action_response.clone().unwrap_or(ActionResponse {
            status: Some("success".into()),
            message: format!("{endpoint} {id} ok"),
            new_task_id: None,
        }))
    }
}

#[async_trait]
impl ForgeApi for FakeApi {
    async fn gadgets(&self) -> Result<Vec<Gadget>, ApiError> {
        self.enter("gadgets").await?;
        Ok(self.inner.lock().unwrap().gadgets.clone())
    }

    async fn minion_status(&self) -> Result<Vec<Worker>, ApiError> {
        self.enter("minion_status").await?;
        Ok(self.inner.lock().unwrap().workers.clone())
    }

    async fn pending_tasks(&self) -> Result<Vec<Task>, ApiError> {
        self.enter("pending_tasks").await?;
        Ok(self.inner.lock().unwrap().pending.clone())
    }

    async fn completed_tasks(&self) -> Result<Vec<Task>, ApiError> {
        self.enter("completed_tasks").await?;
        Ok(self.inner.lock().unwrap().completed.clone())
    }

    async fn minion_metrics(&self) -> Result<Metrics, ApiError> {
        self.enter("minion_metrics").await?;
        Ok(self.inner.lock().unwrap().metrics.clone())
    }

    async fn task_details(&self, task_id: &str) -> Result<Task, ApiError> {
        self.enter("task_details").await?;
        let inner = self.inner.lock().unwrap();
        inner
            .completed
            .iter()
            .chain(inner.pending.iter())
            .find(|t| t.task_id == task_id)
            .cloned()
            .ok_or_else(|| ApiError::Rejected("Task not found".into()))
    }

    async fn submit_task(&self, request: &SubmitRequest) -> Result<SubmitResponse, ApiError> {
        self.enter("submit_task").await?;
        let mut inner = self.inner.lock().unwrap();
        inner.submissions.push(request.clone());
        Ok(inner.submit_response.clone().unwrap_or_else(|| SubmitResponse {
            task_ids: request.modes.iter().map(|m| format!("task-{m}")).collect(),
            result_dirs: request.modes.iter().map(|m| format!("results/{m}")).collect(),
            status: Some("submitted".into()),
        }))
    }

    async fn cancel_task(&self, task_id: &str) -> Result<ActionResponse, ApiError> {
        self.action("cancel_task", task_id).await
    }

    async fn retry_task(&self, task_id: &str) -> Result<ActionResponse, ApiError> {
        self.action("retry_task", task_id).await
    }

    async fn pause_minion(&self, worker_id: &str) -> Result<ActionResponse, ApiError> {
        self.action("pause_minion", worker_id).await
    }

    async fn resume_minion(&self, worker_id: &str) -> Result<ActionResponse, ApiError> {
        self.action("resume_minion", worker_id).await
    }

    async fn upload_file(
        &self,
        file_name: String,
        contents: Bytes,
        progress: ProgressFn,
    ) -> Result<UploadResponse, ApiError> {
        self.enter("upload_file").await?;
        let total = contents.len() as u64;
        for sent in [total / 4, total / 2, total / 2, total] {
            progress(sent, total);
        }
        self.inner
            .lock()
            .unwrap()
            .uploads
            .push((file_name.clone(), contents.len()));
        Ok(UploadResponse {
            file_path: format!("results/temp_upload/{file_name}"),
            original_filename: Some(file_name),
        })
    }
}
