//! Command controller.
//!
//! Receives commands from the UI thread, performs the network work on the runtime and
//! answers with [`DashEvent`]s. Panel state never crosses this boundary; the UI applies
//! the events to the panels it owns.

use super::actions::{dispatch, LifecycleAction};
use super::poller::Refresher;
use super::upload::run_upload;
use crate::api::ForgeApi;
use crate::model::{DashEvent, FieldKey, SubmitRequest};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    LoadGadgets,
    Submit {
        gadget_id: String,
        request: SubmitRequest,
    },
    Action(LifecycleAction),
    Upload {
        key: FieldKey,
        path: PathBuf,
    },
    TaskDetail(String),
    Refresh,
    Quit,
}

/// Serve UI commands until `Quit` or until the UI drops its sender. Work in flight at that
/// point is aborted.
pub(crate) async fn run_controller(
    api: Arc<dyn ForgeApi>,
    refresher: Refresher,
    event_tx: UnboundedSender<DashEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut work: JoinSet<()> = JoinSet::new();

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else { break };
                tracing::debug!(?cmd, "ui command");
                match cmd {
                    UiCommand::LoadGadgets => {
                        let api = api.clone();
                        let tx = event_tx.clone();
                        work.spawn(async move {
                            let ev = match api.gadgets().await {
                                Ok(gadgets) => DashEvent::GadgetsLoaded(gadgets),
                                Err(e) => {
                                    tracing::error!(error = %e, "gadget list fetch failed");
                                    DashEvent::GadgetsFailed(e.to_string())
                                }
                            };
                            let _ = tx.send(ev);
                        });
                    }
                    UiCommand::Submit { gadget_id, request } => {
                        let api = api.clone();
                        let tx = event_tx.clone();
                        let refresher = refresher.clone();
                        work.spawn(async move {
                            let ev = match api.submit_task(&request).await {
                                Ok(response) => {
                                    refresher.refresh_now();
                                    DashEvent::SubmissionAccepted {
                                        gadget_id,
                                        modes: request.modes,
                                        response,
                                    }
                                }
                                Err(e) => {
                                    tracing::warn!(gadget = %gadget_id, error = %e, "submit failed");
                                    DashEvent::SubmissionFailed {
                                        gadget_id,
                                        message: e.to_string(),
                                    }
                                }
                            };
                            let _ = tx.send(ev);
                        });
                    }
                    UiCommand::Action(action) => {
                        let api = api.clone();
                        let tx = event_tx.clone();
                        let refresher = refresher.clone();
                        work.spawn(async move {
                            let ev = match dispatch(api.as_ref(), &action).await {
                                Ok(message) => DashEvent::ActionCompleted { action, message },
                                Err(e) => {
                                    tracing::warn!(action = action.verb(), error = %e, "action failed");
                                    DashEvent::ActionFailed {
                                        action,
                                        message: e.to_string(),
                                    }
                                }
                            };
                            let _ = tx.send(ev);
                            // State only changes through the next poll, success or not.
                            refresher.refresh_now();
                        });
                    }
                    UiCommand::Upload { key, path } => {
                        work.spawn(run_upload(api.clone(), key, path, event_tx.clone()));
                    }
                    UiCommand::TaskDetail(task_id) => {
                        let api = api.clone();
                        let tx = event_tx.clone();
                        work.spawn(async move {
                            match api.task_details(&task_id).await {
                                Ok(task) => {
                                    let _ = tx.send(DashEvent::TaskDetailLoaded(Box::new(task)));
                                }
                                // The viewer already shows the cached entry.
                                Err(e) => tracing::debug!(task = %task_id, error = %e, "task detail unavailable"),
                            }
                        });
                    }
                    UiCommand::Refresh => {
                        refresher.refresh_now();
                        let _ = event_tx.send(DashEvent::Info("Refreshing…".into()));
                    }
                    UiCommand::Quit => break,
                }
            }
            Some(joined) = work.join_next(), if !work.is_empty() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        tracing::error!(error = %e, "background task panicked");
                    }
                }
            }
        }
    }

    work.abort_all();
    Ok(())
}
