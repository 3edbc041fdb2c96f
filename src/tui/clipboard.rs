//! Clipboard access off the UI thread.
//!
//! On X11 and Wayland copied text is only readable while its owner is alive, so a worker
//! thread keeps one `arboard::Clipboard` open until it has been idle for a while.

use anyhow::{Context, Result};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::OnceLock;
use std::time::Duration;

static WORKER: OnceLock<Sender<String>> = OnceLock::new();

const LINGER: Duration = Duration::from_secs(5);

fn worker() -> &'static Sender<String> {
    WORKER.get_or_init(|| {
        let (tx, rx) = mpsc::channel::<String>();
        if let Err(e) = std::thread::Builder::new()
            .name("clipboard".into())
            .spawn(move || serve(rx))
        {
            tracing::warn!(error = %e, "clipboard thread failed to start");
        }
        tx
    })
}

fn serve(rx: Receiver<String>) {
    let mut held: Option<arboard::Clipboard> = None;
    loop {
        let text = match rx.recv_timeout(LINGER) {
            Ok(text) => text,
            Err(RecvTimeoutError::Timeout) => {
                held = None;
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        };
        if held.is_none() {
            match arboard::Clipboard::new() {
                Ok(c) => held = Some(c),
                Err(e) => {
                    tracing::warn!(error = %e, "clipboard unavailable");
                    continue;
                }
            }
        }
        if let Some(clipboard) = held.as_mut() {
            if let Err(e) = clipboard.set_text(text) {
                tracing::warn!(error = %e, "clipboard write failed");
                held = None;
            }
        }
    }
}

/// Queue `text` for the clipboard and return immediately.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    worker()
        .send(text.to_owned())
        .context("clipboard worker stopped")
}
