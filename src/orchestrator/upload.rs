//! File uploads with per-field progress reporting.

use crate::api::{ForgeApi, ProgressFn};
use crate::error::ApiError;
use crate::model::{DashEvent, FieldKey, FileRef};
use bytes::Bytes;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedSender;

/// Turns byte counts into a percentage that only moves forward. It stays below 100 until
/// the server has answered, so 100 always means the reference exists.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    last: Option<u8>,
}

impl ProgressTracker {
    /// Returns the new percentage, or `None` when it would not advance.
    pub fn advance(&mut self, sent: u64, total: u64) -> Option<u8> {
        let pct = if total == 0 {
            0
        } else {
            ((sent.min(total) * 100) / total).min(99) as u8
        };
        match self.last {
            Some(prev) if pct <= prev => None,
            _ => {
                self.last = Some(pct);
                Some(pct)
            }
        }
    }
}

/// Read `path`, upload it and report progress for `key` on `events`.
pub async fn upload_file(
    api: &dyn ForgeApi,
    key: &FieldKey,
    path: &Path,
    events: &UnboundedSender<DashEvent>,
) -> Result<FileRef, ApiError> {
    let contents = Bytes::from(tokio::fs::read(path).await?);
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.bin".to_string());
    tracing::info!(file = %file_name, bytes = contents.len(), field = %key.field, "uploading");

    let tracker = Arc::new(Mutex::new(ProgressTracker::default()));
    let progress: ProgressFn = {
        let events = events.clone();
        let key = key.clone();
        Arc::new(move |sent, total| {
            let step = match tracker.lock() {
                Ok(mut t) => t.advance(sent, total),
                Err(_) => None,
            };
            if let Some(percent) = step {
                let _ = events.send(DashEvent::UploadProgress {
                    key: key.clone(),
                    percent,
                });
            }
        })
    };

    let resp = api.upload_file(file_name, contents, progress).await?;
    if resp.file_path.is_empty() {
        return Err(ApiError::Decode("upload response has no file_path".into()));
    }
    let _ = events.send(DashEvent::UploadProgress {
        key: key.clone(),
        percent: 100,
    });
    Ok(FileRef(resp.file_path))
}

/// Upload and finish with exactly one `UploadFinished` or `UploadFailed` event.
pub async fn run_upload(
    api: Arc<dyn ForgeApi>,
    key: FieldKey,
    path: std::path::PathBuf,
    events: UnboundedSender<DashEvent>,
) {
    match upload_file(api.as_ref(), &key, &path, &events).await {
        Ok(reference) => {
            let _ = events.send(DashEvent::UploadFinished { key, reference });
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "upload failed");
            let _ = events.send(DashEvent::UploadFailed {
                key,
                message: e.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeApi;
    use std::io::Write;

    fn key() -> FieldKey {
        FieldKey::new("scanner", "replay", "capture")
    }

    fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<DashEvent>) -> Vec<DashEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    #[test]
    fn tracker_is_monotonic_and_holds_back_completion() {
        let mut t = ProgressTracker::default();
        assert_eq!(t.advance(0, 200), Some(0));
        assert_eq!(t.advance(0, 200), None);
        assert_eq!(t.advance(100, 200), Some(50));
        assert_eq!(t.advance(50, 200), None);
        assert_eq!(t.advance(200, 200), Some(99));
        assert_eq!(t.advance(500, 200), None);
    }

    #[tokio::test]
    async fn upload_reports_progress_then_reference() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[7u8; 4096]).unwrap();
        let fake = Arc::new(FakeApi::default());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        run_upload(fake.clone(), key(), file.path().to_path_buf(), tx).await;

        let events = drain(&mut rx);
        let percents: Vec<u8> = events
            .iter()
            .filter_map(|e| match e {
                DashEvent::UploadProgress { percent, .. } => Some(*percent),
                _ => None,
            })
            .collect();
        assert_eq!(percents, [25, 50, 99, 100]);
        match events.last() {
            Some(DashEvent::UploadFinished { key: k, reference }) => {
                assert_eq!(k, &key());
                assert!(reference.0.starts_with("results/temp_upload/"));
            }
            other => panic!("unexpected final event {other:?}"),
        }
        assert_eq!(fake.uploads()[0].1, 4096);
    }

    #[tokio::test]
    async fn failed_upload_emits_failure_only() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"pcap").unwrap();
        let fake = Arc::new(FakeApi::default());
        fake.fail("upload_file", true);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        run_upload(fake, key(), file.path().to_path_buf(), tx).await;

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], DashEvent::UploadFailed { .. }));
    }

    #[tokio::test]
    async fn missing_file_fails_without_calling_server() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeApi::default());
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let res = upload_file(fake.as_ref(), &key(), &dir.path().join("nope.bin"), &tx).await;
        assert!(matches!(res, Err(ApiError::Io(_))));
        assert_eq!(fake.total_calls(), 0);
    }
}
