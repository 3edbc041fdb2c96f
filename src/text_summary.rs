//! Text summary builder for CLI output.
//!
//! Formats one status snapshot, or one submission record, as human-readable lines.

use crate::board::StatusBoard;
use crate::metrics::{self, Severity};
use crate::model::{short_id, Gadget, SubmissionRecord};

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

fn severity_tag(s: Severity) -> &'static str {
    match s {
        Severity::Ok => "",
        Severity::Warn => " (warn)",
        Severity::Danger => " (high)",
    }
}

/// Build a text summary of gadgets and one poll of the status resources.
pub(crate) fn build_text_summary(gadgets: &[Gadget], board: &StatusBoard) -> TextSummary {
    let mut lines = Vec::new();

    lines.push(format!("Gadgets ({}):", gadgets.len()));
    for g in gadgets {
        let modes: Vec<&str> = g.modes.iter().map(|m| m.id.as_str()).collect();
        lines.push(format!("  {:<20} {} [{}]", g.id, g.name, modes.join(", ")));
    }

    match &board.metrics.data {
        Some(m) => {
            let s = metrics::summarize(m);
            lines.push(format!(
                "Metrics: cpu {:.1}%{} mem {:.1}%{} active {}/{} errors {:.1}%{}",
                m.cpu_percent,
                severity_tag(s.cpu),
                m.memory_percent,
                severity_tag(s.memory),
                m.active_tasks,
                metrics::ACTIVE_TASK_CAPACITY,
                m.error_rate,
                severity_tag(s.error_rate),
            ));
        }
        None => lines.push("Metrics: unavailable".into()),
    }

    lines.push(format!("Minions ({}):", board.workers().len()));
    for w in board.workers() {
        let task = board.current_task_mode(&w.id).unwrap_or("-");
        lines.push(format!(
            "  {:<18} {:<10} {}",
            short_id(&w.id, 15),
            w.status.worker_label(),
            task
        ));
    }

    lines.push(format!("Pending ({}):", board.pending().len()));
    for t in board.pending() {
        lines.push(format!(
            "  {:<11} {:<20} {}",
            t.short_id(),
            t.gadget_name.as_deref().or(t.gadget_id.as_deref()).unwrap_or("-"),
            t.mode.as_deref().unwrap_or("-")
        ));
    }

    lines.push(format!("Completed ({}):", board.completed().len()));
    for t in board.completed() {
        lines.push(format!(
            "  {:<11} {:<20} {:<16} {}",
            t.short_id(),
            t.gadget_name.as_deref().or(t.gadget_id.as_deref()).unwrap_or("-"),
            t.mode.as_deref().unwrap_or("-"),
            t.status.as_ref().map(|s| s.task_label()).unwrap_or("-")
        ));
    }

    for (resource, err) in board.errors() {
        lines.push(format!("! {resource}: {err}"));
    }

    TextSummary { lines }
}

pub(crate) fn build_record_summary(record: &SubmissionRecord) -> TextSummary {
    let mut lines = vec![format!(
        "Submitted {} mode(s) of {} at {} (record {})",
        record.modes.len(),
        record.gadget_id,
        record.timestamp,
        record.id
    )];
    for ((mode, task), dir) in record
        .modes
        .iter()
        .zip(&record.task_ids)
        .zip(&record.result_dirs)
    {
        lines.push(format!("  {mode}: task {task} -> {dir}"));
    }
    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{PollUpdate, ResourceUpdate};
    use crate::model::{Metrics, Status, Task, Worker};

    #[test]
    fn summary_lists_every_section_and_errors() {
        let mut board = StatusBoard::default();
        board.apply(PollUpdate {
            seq: 1,
            update: ResourceUpdate::Workers(Ok(vec![Worker {
                id: "scanner_quick_scan_1712".into(),
                status: Status::Busy,
            }])),
        });
        board.apply(PollUpdate {
            seq: 1,
            update: ResourceUpdate::Pending(Ok(vec![Task {
                task_id: "scanner_quick_scan_1712".into(),
                mode: Some("quick_scan".into()),
                ..Default::default()
            }])),
        });
        board.apply(PollUpdate {
            seq: 1,
            update: ResourceUpdate::Metrics(Ok(Metrics {
                cpu_percent: 91.0,
                ..Default::default()
            })),
        });
        board.apply(PollUpdate {
            seq: 1,
            update: ResourceUpdate::Completed(Err("server returned 500: boom".into())),
        });

        let lines = build_text_summary(&[], &board).lines;
        assert!(lines.iter().any(|l| l.contains("cpu 91.0% (high)")));
        assert!(lines
            .iter()
            .any(|l| l.contains("scanner_quick_s...") && l.contains("Busy") && l.contains("quick_scan")));
        assert!(lines.iter().any(|l| l == "Completed (0):"));
        assert_eq!(
            lines.last().map(String::as_str),
            Some("! completed_tasks: server returned 500: boom")
        );
    }

    #[test]
    fn record_summary_pairs_modes_with_tasks() {
        let record = SubmissionRecord {
            id: "r1".into(),
            timestamp: "2024-01-01T00:00:00Z".into(),
            gadget_id: "scanner".into(),
            modes: vec!["quick_scan".into(), "full_scan".into()],
            task_ids: vec!["a".into(), "b".into()],
            result_dirs: vec!["d1".into(), "d2".into()],
            status: crate::model::RecordStatus::Submitted,
        };
        let lines = build_record_summary(&record).lines;
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], "  full_scan: task b -> d2");
    }
}
