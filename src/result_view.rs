//! Task result presentation: detail rows, submitted parameters and the result payload.

use crate::model::{Status, Task};
use serde_json::{Map, Value};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

/// Where the displayable result was found.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedResult {
    /// `result_file` / `result_preview` on the result object itself.
    Direct {
        file: Option<String>,
        preview: Option<String>,
    },
    /// The same fields one level down under `result`.
    Nested {
        file: Option<String>,
        preview: Option<String>,
    },
    /// Neither level had them; show the object as-is.
    Raw(Value),
}

fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn file_and_preview(obj: &Map<String, Value>) -> Option<(Option<String>, Option<String>)> {
    let file = text_field(obj, "result_file");
    let preview = text_field(obj, "result_preview");
    (file.is_some() || preview.is_some()).then_some((file, preview))
}

/// Resolve a task's result: direct fields, then nested under `result`, then raw.
/// A missing or non-object result is treated as an empty object.
pub fn normalize_result(result: Option<&Value>) -> NormalizedResult {
    let empty = Map::new();
    let obj = result.and_then(Value::as_object).unwrap_or(&empty);
    if let Some((file, preview)) = file_and_preview(obj) {
        return NormalizedResult::Direct { file, preview };
    }
    if let Some((file, preview)) = obj
        .get("result")
        .and_then(Value::as_object)
        .and_then(file_and_preview)
    {
        return NormalizedResult::Nested { file, preview };
    }
    NormalizedResult::Raw(match result {
        Some(v @ Value::Object(_)) => v.clone(),
        Some(Value::Null) | None => Value::Object(Map::new()),
        Some(other) => other.clone(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSection {
    pub title: &'static str,
    pub body: String,
}

impl NormalizedResult {
    pub fn file(&self) -> Option<&str> {
        match self {
            NormalizedResult::Direct { file, .. } | NormalizedResult::Nested { file, .. } => {
                file.as_deref()
            }
            NormalizedResult::Raw(_) => None,
        }
    }

    /// Always at least one section with a non-empty body.
    pub fn sections(&self) -> Vec<ResultSection> {
        match self {
            NormalizedResult::Direct { file, preview } | NormalizedResult::Nested { file, preview } => {
                let mut out = Vec::new();
                if let Some(f) = file {
                    out.push(ResultSection {
                        title: "Result file",
                        body: f.clone(),
                    });
                }
                if let Some(p) = preview {
                    out.push(ResultSection {
                        title: "Result preview",
                        body: p.clone(),
                    });
                }
                out
            }
            NormalizedResult::Raw(v) => vec![ResultSection {
                title: "No preview available, raw result",
                body: serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string()),
            }],
        }
    }
}

/// Reformat a server timestamp for display. Unparseable input is shown unchanged.
pub fn display_time(raw: &str) -> String {
    let out = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    if let Ok(t) = OffsetDateTime::parse(raw, &Rfc3339) {
        if let Ok(s) = t.format(out) {
            return s;
        }
    }
    let naive = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
    );
    PrimitiveDateTime::parse(raw, naive)
        .ok()
        .and_then(|t| t.format(out).ok())
        .unwrap_or_else(|| raw.to_string())
}

/// The details view of one task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDetail {
    pub task_id: String,
    pub status: Option<Status>,
    pub rows: Vec<(&'static str, String)>,
    pub error: Option<String>,
    pub params: String,
    pub result: NormalizedResult,
}

fn result_str(task: &Task, key: &str) -> Option<String> {
    task.result
        .as_ref()
        .and_then(Value::as_object)
        .and_then(|o| text_field(o, key))
}

impl TaskDetail {
    pub fn from_task(task: &Task) -> Self {
        let na = || "N/A".to_string();
        let gadget = task
            .gadget_name
            .clone()
            .or_else(|| result_str(task, "gadget_name"))
            .or_else(|| task.gadget_id.clone())
            .unwrap_or_else(|| "Unknown".into());
        let mode = task
            .mode
            .clone()
            .or_else(|| result_str(task, "mode"))
            .unwrap_or_else(|| "Unknown".into());
        let status = task
            .status
            .as_ref()
            .map(|s| s.task_label().to_string())
            .unwrap_or_else(na);
        let exec = match task.execution_time_seconds {
            Some(secs) if secs > 0.0 => format!("{secs:.2} seconds"),
            _ => na(),
        };

        let mut rows = vec![
            ("Task ID", task.task_id.clone()),
            ("Gadget", gadget),
            ("Mode", mode),
            ("Status", status),
            (
                "Submit Time",
                task.submit_time.as_deref().map(display_time).unwrap_or_else(na),
            ),
            (
                "Completion Time",
                task.completion_time
                    .as_deref()
                    .map(display_time)
                    .unwrap_or_else(na),
            ),
            ("Execution Time", exec),
            (
                "Result Directory",
                task.result_dir
                    .clone()
                    .or_else(|| result_str(task, "result_dir"))
                    .unwrap_or_else(na),
            ),
        ];
        if let Some(orig) = &task.original_task_id {
            rows.push(("Retry Of", orig.clone()));
        }

        let params = task.params.clone().unwrap_or_else(|| Value::Object(Map::new()));
        Self {
            task_id: task.task_id.clone(),
            status: task.status.clone(),
            rows,
            error: task.error.clone().or_else(|| result_str(task, "error")),
            params: serde_json::to_string_pretty(&params).unwrap_or_else(|_| params.to_string()),
            result: normalize_result(task.result.as_ref()),
        }
    }

    /// Path worth copying: the result file if there is one, else the result directory.
    pub fn copy_target(&self) -> Option<String> {
        if let Some(f) = self.result.file() {
            return Some(f.to_string());
        }
        self.rows
            .iter()
            .find(|(k, v)| *k == "Result Directory" && v != "N/A")
            .map(|(_, v)| v.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn direct_file_wins() {
        let r = json!({"result_file": "a.txt"});
        assert_eq!(
            normalize_result(Some(&r)),
            NormalizedResult::Direct {
                file: Some("a.txt".into()),
                preview: None
            }
        );
    }

    #[test]
    fn nested_file_is_found() {
        let r = json!({"result": {"result_file": "a.txt", "result_preview": "PORT 22 open"}});
        let n = normalize_result(Some(&r));
        assert_eq!(
            n,
            NormalizedResult::Nested {
                file: Some("a.txt".into()),
                preview: Some("PORT 22 open".into())
            }
        );
        assert_eq!(n.sections().len(), 2);
    }

    #[test]
    fn empty_object_falls_back_to_raw() {
        let n = normalize_result(Some(&json!({})));
        assert_eq!(n, NormalizedResult::Raw(json!({})));
        let sections = n.sections();
        assert_eq!(sections.len(), 1);
        assert!(!sections[0].body.is_empty());
    }

    #[test]
    fn missing_result_renders_something() {
        for r in [None, Some(&Value::Null)] {
            let n = normalize_result(r);
            assert_eq!(n, NormalizedResult::Raw(json!({})));
            assert_eq!(n.sections()[0].body, "{}");
        }
        let n = normalize_result(Some(&json!("plain text")));
        assert_eq!(n.sections()[0].body, "\"plain text\"");
    }

    #[test]
    fn direct_preview_beats_nested_file() {
        let r = json!({"result_preview": "top", "result": {"result_file": "deep.txt"}});
        assert_matches::assert_matches!(normalize_result(Some(&r)), NormalizedResult::Direct { file: None, .. });
    }

    #[test]
    fn detail_rows_fall_back_to_result_fields() {
        let task = Task {
            task_id: "scanner_quick_1".into(),
            status: Some(Status::Troubled),
            execution_time_seconds: Some(1.5),
            result: Some(json!({
                "gadget_name": "Network Scanner",
                "result_dir": "results/scanner/1",
                "error": "nmap exited with 1"
            })),
            ..Default::default()
        };
        let d = TaskDetail::from_task(&task);
        let row = |k: &str| d.rows.iter().find(|(n, _)| *n == k).map(|(_, v)| v.as_str());
        assert_eq!(row("Gadget"), Some("Network Scanner"));
        assert_eq!(row("Mode"), Some("Unknown"));
        assert_eq!(row("Status"), Some("Error"));
        assert_eq!(row("Execution Time"), Some("1.50 seconds"));
        assert_eq!(row("Submit Time"), Some("N/A"));
        assert_eq!(d.error.as_deref(), Some("nmap exited with 1"));
        assert_eq!(d.params, "{}");
        assert_eq!(d.copy_target().as_deref(), Some("results/scanner/1"));
    }

    #[test]
    fn timestamps_are_reformatted_or_kept() {
        assert_eq!(display_time("2024-05-01T10:20:30.123456"), "2024-05-01 10:20:30");
        assert_eq!(display_time("2024-05-01T10:20:30Z"), "2024-05-01 10:20:30");
        assert_eq!(display_time("yesterday"), "yesterday");
    }
}
