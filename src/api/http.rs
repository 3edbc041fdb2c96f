use super::{ForgeApi, ProgressFn};
use crate::error::ApiError;
use crate::model::{
    ActionResponse, DashConfig, Gadget, Metrics, MinionStatusResponse, SubmitRequest,
    SubmitResponse, Task, UploadResponse, Worker,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt};
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Chunk size for upload body streaming (64 KB)
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// `reqwest`-backed client for the forge API rooted at `base_url`.
#[derive(Debug, Clone)]
pub struct HttpForgeClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpForgeClient {
    pub fn new(cfg: &DashConfig) -> Result<Self> {
        let base_url = Url::parse(&cfg.base_url)
            .with_context(|| format!("invalid base URL: {}", cfg.base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("base URL cannot carry a path: {}", cfg.base_url);
        }
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.request_timeout)
            .build()
            .context("build HTTP client")?;
        Ok(Self { http, base_url })
    }

    /// Append path segments (percent-encoded) to the base URL.
    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Decode(format!("base URL has no path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.url(segments)?;
        tracing::debug!(%url, "GET");
        decode(self.http.get(url).send().await?).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(segments)?;
        tracing::debug!(%url, "POST");
        decode(self.http.post(url).json(body).send().await?).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.url(segments)?;
        tracing::debug!(%url, "POST");
        decode(self.http.post(url).send().await?).await
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
    let status = resp.status();
    let body = resp.bytes().await?;
    if !status.is_success() {
        return Err(ApiError::Status {
            code: status.as_u16(),
            message: error_message(&body),
        });
    }
    serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Pull a human-readable message out of an error body (FastAPI uses `detail`).
fn error_message(body: &[u8]) -> String {
    if let Ok(v) = serde_json::from_slice::<serde_json::Value>(body) {
        for key in ["detail", "message", "error"] {
            if let Some(s) = v.get(key).and_then(|d| d.as_str()) {
                return s.to_string();
            }
        }
    }
    let text = String::from_utf8_lossy(body).trim().to_string();
    if text.is_empty() {
        "empty response body".into()
    } else {
        text
    }
}

#[async_trait]
impl ForgeApi for HttpForgeClient {
    async fn gadgets(&self) -> Result<Vec<Gadget>, ApiError> {
        self.get_json(&["gadgets"]).await
    }

    async fn minion_status(&self) -> Result<Vec<Worker>, ApiError> {
        let resp: MinionStatusResponse = self.get_json(&["minion_status"]).await?;
        Ok(resp.into_workers())
    }

    async fn pending_tasks(&self) -> Result<Vec<Task>, ApiError> {
        let tasks: Option<Vec<Task>> = self.get_json(&["pending_tasks"]).await?;
        Ok(tasks.unwrap_or_default())
    }

    async fn completed_tasks(&self) -> Result<Vec<Task>, ApiError> {
        let tasks: Option<Vec<Task>> = self.get_json(&["completed_tasks"]).await?;
        Ok(tasks.unwrap_or_default())
    }

    async fn minion_metrics(&self) -> Result<Metrics, ApiError> {
        let metrics: Option<Metrics> = self.get_json(&["minion_metrics"]).await?;
        Ok(metrics.unwrap_or_default())
    }

    async fn task_details(&self, task_id: &str) -> Result<Task, ApiError> {
        let value: serde_json::Value = self.get_json(&["task_details", task_id]).await?;
        // Unknown ids come back as 200 {"error": "Task not found"} without a task_id.
        if value.get("task_id").is_none() {
            let msg = value
                .get("error")
                .and_then(|e| e.as_str())
                .unwrap_or("task not found");
            return Err(ApiError::Rejected(msg.to_string()));
        }
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn submit_task(&self, request: &SubmitRequest) -> Result<SubmitResponse, ApiError> {
        self.post_json(&["submit_task"], request).await
    }

    async fn cancel_task(&self, task_id: &str) -> Result<ActionResponse, ApiError> {
        self.post_empty(&["cancel_task", task_id]).await
    }

    async fn retry_task(&self, task_id: &str) -> Result<ActionResponse, ApiError> {
        self.post_empty(&["retry_task", task_id]).await
    }

    async fn pause_minion(&self, worker_id: &str) -> Result<ActionResponse, ApiError> {
        self.post_empty(&["pause_minion", worker_id]).await
    }

    async fn resume_minion(&self, worker_id: &str) -> Result<ActionResponse, ApiError> {
        self.post_empty(&["resume_minion", worker_id]).await
    }

    async fn upload_file(
        &self,
        file_name: String,
        contents: Bytes,
        progress: ProgressFn,
    ) -> Result<UploadResponse, ApiError> {
        let total = contents.len() as u64;
        let chunks: Vec<Bytes> = (0..contents.len())
            .step_by(UPLOAD_CHUNK_SIZE)
            .map(|start| contents.slice(start..(start + UPLOAD_CHUNK_SIZE).min(contents.len())))
            .collect();

        // Progress counts bytes as they are handed to reqwest, which tracks the wire closely
        // enough for a progress bar.
        let mut sent = 0u64;
        let body_stream = stream::iter(chunks).map(move |chunk| {
            sent += chunk.len() as u64;
            progress(sent, total);
            Ok::<Bytes, std::io::Error>(chunk)
        });

        let part = Part::stream_with_length(reqwest::Body::wrap_stream(body_stream), total)
            .file_name(file_name);
        let form = Form::new().part("file", part);
        let url = self.url(&["upload_file"])?;
        tracing::debug!(%url, bytes = total, "POST multipart");
        decode(self.http.post(url).multipart(form).send().await?).await
    }
}
