use crate::api::{ForgeApi, HttpForgeClient};
use crate::board::StatusBoard;
use crate::form::{FieldKind, GadgetPanel};
use crate::metrics::MetricsSummary;
use crate::model::{
    DashConfig, FieldKey, FileRef, Gadget, Metrics, ParamValue, SubmissionRecord, Task, Worker,
};
use crate::orchestrator::{poller, submit, upload};
use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "goblin-console",
    version,
    about = "Terminal control panel for a Goblin Forge server"
)]
pub struct Cli {
    /// Base URL of the forge API
    #[arg(long, env = "GOBLIN_API_URL", default_value = "http://localhost:8000/api")]
    pub base_url: String,

    /// Print one status snapshot as JSON and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Print one status snapshot as text and exit (no TUI)
    #[arg(long, conflicts_with = "json")]
    pub text: bool,

    /// How often the dashboard polls minions, tasks and metrics
    #[arg(long, default_value = "5s", value_parser = parse_period)]
    pub poll_interval: humantime::Duration,

    /// Per-request timeout
    #[arg(long, default_value = "10s", value_parser = parse_period)]
    pub request_timeout: humantime::Duration,

    /// Log file for TUI mode (default: <cache dir>/goblin-console/goblin-console.log)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Gadget tab to open first
    #[arg(long)]
    pub gadget: Option<String>,

    /// Submit a job for this gadget and exit (no TUI)
    #[arg(long, value_name = "GADGET")]
    pub submit: Option<String>,

    /// Mode to run; repeat for a batch
    #[arg(long = "mode", value_name = "MODE", requires = "submit")]
    pub modes: Vec<String>,

    /// Parameter as MODE.FIELD=VALUE; repeat a multiselect field to add values,
    /// use @PATH on a file field to upload PATH first
    #[arg(long = "param", value_name = "MODE.FIELD=VALUE", requires = "submit")]
    pub params: Vec<String>,
}

impl Cli {
    pub fn is_headless(&self) -> bool {
        self.json || self.text || self.submit.is_some()
    }
}

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args);

    if !args.is_headless() {
        #[cfg(feature = "tui")]
        {
            if let Some(path) = args.log_file.clone().or_else(crate::logging::default_log_path) {
                // Logging is best effort; the dashboard works without it.
                let _ = crate::logging::init_file(&path);
            }
            return crate::tui::run(cfg).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            crate::logging::init_stderr();
            return run_snapshot(&cfg, false).await;
        }
    }

    crate::logging::init_stderr();
    if let Some(gadget_id) = args.submit.as_deref() {
        return run_submit(&cfg, gadget_id, &args.modes, &args.params, args.json).await;
    }
    run_snapshot(&cfg, args.json).await
}

/// Build a `DashConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> DashConfig {
    DashConfig {
        base_url: args.base_url.clone(),
        poll_interval: Duration::from(args.poll_interval),
        request_timeout: Duration::from(args.request_timeout),
        user_agent: format!("goblin-console/{}", env!("CARGO_PKG_VERSION")),
        initial_gadget: args.gadget.clone(),
    }
}

pub fn connect(cfg: &DashConfig) -> Result<Arc<dyn ForgeApi>> {
    Ok(Arc::new(HttpForgeClient::new(cfg)?))
}

#[derive(Serialize)]
struct Snapshot<'a> {
    gadgets: &'a [Gadget],
    minions: &'a [Worker],
    pending_tasks: &'a [Task],
    completed_tasks: &'a [Task],
    metrics: Option<&'a Metrics>,
    severity: Option<MetricsSummary>,
    errors: BTreeMap<&'static str, &'a str>,
}

fn snapshot<'a>(gadgets: &'a [Gadget], board: &'a StatusBoard) -> Snapshot<'a> {
    Snapshot {
        gadgets,
        minions: board.workers(),
        pending_tasks: board.pending(),
        completed_tasks: board.completed(),
        metrics: board.metrics.data.as_ref(),
        severity: board.metrics.data.as_ref().map(crate::metrics::summarize),
        errors: board.errors().into_iter().collect(),
    }
}

/// One poll of everything, printed once. Fails only if the gadget list cannot be fetched.
async fn run_snapshot(cfg: &DashConfig, json: bool) -> Result<()> {
    let api = connect(cfg)?;
    let gadgets = api
        .gadgets()
        .await
        .with_context(|| format!("fetch gadget list from {}", cfg.base_url))?;
    let board = poller::poll_once(&api).await;

    let (out_tx, out_handle) = spawn_output_writer();
    if json {
        let out = serde_json::to_string_pretty(&snapshot(&gadgets, &board))?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else {
        for line in crate::text_summary::build_text_summary(&gadgets, &board).lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }
    for (resource, err) in board.errors() {
        let _ = out_tx.send(OutputLine::Stderr(format!("warning: {resource} failed: {err}")));
    }
    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

async fn run_submit(
    cfg: &DashConfig,
    gadget_id: &str,
    modes: &[String],
    params: &[String],
    json: bool,
) -> Result<()> {
    let api = connect(cfg)?;
    let record = submit_from_args(&api, gadget_id, modes, params).await?;

    let (out_tx, out_handle) = spawn_output_writer();
    if json {
        let _ = out_tx.send(OutputLine::Stdout(serde_json::to_string_pretty(&record)?));
    } else {
        for line in crate::text_summary::build_record_summary(&record).lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }
    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

/// A humantime duration that must be longer than zero.
fn parse_period(raw: &str) -> Result<humantime::Duration, String> {
    let d: humantime::Duration = raw.parse().map_err(|e| format!("{e}"))?;
    if d.is_zero() {
        return Err("must be greater than zero".into());
    }
    Ok(d)
}

/// Split `MODE.FIELD=VALUE`.
pub fn parse_param(raw: &str) -> Result<(String, String, String)> {
    let (key, value) = raw
        .split_once('=')
        .with_context(|| format!("parameter '{raw}' is not MODE.FIELD=VALUE"))?;
    let (mode, field) = key
        .split_once('.')
        .with_context(|| format!("parameter '{raw}' is missing the MODE. prefix"))?;
    if mode.is_empty() || field.is_empty() {
        anyhow::bail!("parameter '{raw}' has an empty mode or field name");
    }
    Ok((mode.to_string(), field.to_string(), value.to_string()))
}

/// Fill a panel from command-line modes and parameters, upload `@path` files, and submit.
pub(crate) async fn submit_from_args(
    api: &Arc<dyn ForgeApi>,
    gadget_id: &str,
    modes: &[String],
    params: &[String],
) -> Result<SubmissionRecord> {
    let gadgets = api.gadgets().await.context("fetch gadget list")?;
    let gadget = gadgets
        .into_iter()
        .find(|g| g.id == gadget_id)
        .with_context(|| format!("unknown gadget '{gadget_id}'"))?;
    let mut panel = GadgetPanel::new(gadget);

    for mode in modes {
        if !panel.selection.contains(mode) {
            panel.toggle_mode(mode)?;
        }
    }

    let mut grouped: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();
    for raw in params {
        let (mode, field, value) = parse_param(raw)?;
        grouped.entry((mode, field)).or_default().push(value);
    }

    for ((mode, field), values) in grouped {
        let kind = panel
            .gadget
            .mode(&mode)
            .and_then(|m| m.field(&field))
            .map(FieldKind::of)
            .with_context(|| format!("gadget '{gadget_id}' has no field {mode}.{field}"))?;
        let value = match kind {
            FieldKind::MultiSelect => ParamValue::Multi(values.into_iter().collect::<BTreeSet<_>>()),
            FieldKind::File => {
                let raw = values.last().cloned().unwrap_or_default();
                match raw.strip_prefix('@') {
                    Some(path) => {
                        let key = FieldKey::new(gadget_id, &mode, &field);
                        let (tx, _rx) = mpsc::unbounded_channel();
                        let reference =
                            upload::upload_file(api.as_ref(), &key, std::path::Path::new(path), &tx)
                                .await
                                .with_context(|| format!("upload {path} for {mode}.{field}"))?;
                        ParamValue::File(reference)
                    }
                    // Already a server-side reference.
                    None => ParamValue::File(FileRef(raw)),
                }
            }
            _ => ParamValue::Text(values.last().cloned().unwrap_or_default()),
        };
        panel.set_param(&mode, &field, value)?;
    }

    let record = submit::submit(api.as_ref(), &mut panel).await?;
    Ok(record)
}
