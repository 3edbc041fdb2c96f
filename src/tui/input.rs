//! Key handling and event application for the UI thread.
//!
//! Both functions only mutate [`UiState`]; anything that needs the network comes back as
//! an [`Effect`] for the render loop to forward to the controller.

use super::state::{form_rows, DashFocus, EditBuffer, FormFocus, FormRow, Screen, Tab, UiState};
use crate::board::StatusBoard;
use crate::form::{ControlInput, FieldKind};
use crate::model::{DashEvent, FieldKey, ParamValue};
use crate::orchestrator::actions::{task_actions, worker_actions, TaskList};
use crate::orchestrator::{submit, LifecycleAction, UiCommand};
use crate::result_view::TaskDetail;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::PathBuf;

#[derive(Debug)]
pub(super) enum Effect {
    Send(UiCommand),
    Copy(String),
    Quit,
}

pub(super) fn handle_key(state: &mut UiState, board: &StatusBoard, k: KeyEvent) -> Option<Effect> {
    if state.notice.take().is_some() {
        return None;
    }
    if state.edit.is_some() {
        return edit_key(state, k);
    }
    if state.modal.is_some() {
        return modal_key(state, k);
    }

    match (k.modifiers, k.code) {
        (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
            return Some(Effect::Quit)
        }
        (_, KeyCode::Tab) => {
            state.next_tab();
            return None;
        }
        (_, KeyCode::BackTab) => {
            state.prev_tab();
            return None;
        }
        (_, KeyCode::Char('?')) => {
            state.show_help();
            return None;
        }
        (_, KeyCode::Char('r')) => {
            if let Screen::LoadFailed(_) = state.screen {
                state.screen = Screen::Loading;
                return Some(Effect::Send(UiCommand::LoadGadgets));
            }
            return Some(Effect::Send(UiCommand::Refresh));
        }
        _ => {}
    }

    if state.screen != Screen::Ready {
        return None;
    }
    match state.current_tab() {
        Tab::Minions => minions_key(state, board, k),
        Tab::Completed => completed_key(state, board, k),
        Tab::Gadget(idx) => gadget_key(state, idx, k),
        Tab::Help => None,
    }
}

fn request_action(state: &mut UiState, action: Option<LifecycleAction>, what: &str) -> Option<Effect> {
    match action {
        Some(action) => {
            state.info = format!("Requesting {} of {}…", action.verb(), action.target());
            Some(Effect::Send(UiCommand::Action(action)))
        }
        None => {
            state.info = format!("Nothing to {what} here");
            None
        }
    }
}

fn minions_key(state: &mut UiState, board: &StatusBoard, k: KeyEvent) -> Option<Effect> {
    let delta = match k.code {
        KeyCode::Up | KeyCode::Char('k') => -1,
        KeyCode::Down | KeyCode::Char('j') => 1,
        KeyCode::Left | KeyCode::Right | KeyCode::Char('h') | KeyCode::Char('l') => {
            state.dash_focus = match state.dash_focus {
                DashFocus::Workers => DashFocus::Pending,
                DashFocus::Pending => DashFocus::Workers,
            };
            return None;
        }
        KeyCode::Char('c') => {
            let action = match state.dash_focus {
                DashFocus::Workers => state.selected_worker(board).and_then(|w| {
                    worker_actions(&w.id, &w.status)
                        .into_iter()
                        .find(|a| matches!(a, LifecycleAction::Cancel(_)))
                }),
                DashFocus::Pending => state.selected_pending(board).and_then(|t| {
                    task_actions(&t.task_id, TaskList::Pending, t.status.as_ref())
                        .into_iter()
                        .find(|a| matches!(a, LifecycleAction::Cancel(_)))
                }),
            };
            return request_action(state, action, "cancel");
        }
        KeyCode::Char('p') => {
            let action = match state.dash_focus {
                DashFocus::Workers => state.selected_worker(board).and_then(|w| {
                    worker_actions(&w.id, &w.status).into_iter().find(|a| {
                        matches!(a, LifecycleAction::Pause(_) | LifecycleAction::Resume(_))
                    })
                }),
                DashFocus::Pending => None,
            };
            return request_action(state, action, "pause or resume");
        }
        _ => return None,
    };
    match state.dash_focus {
        DashFocus::Workers => UiState::step(&mut state.worker_selected, delta, board.workers().len()),
        DashFocus::Pending => UiState::step(&mut state.pending_selected, delta, board.pending().len()),
    }
    None
}

fn retry_of(detail: &TaskDetail) -> Option<LifecycleAction> {
    task_actions(&detail.task_id, TaskList::Completed, detail.status.as_ref())
        .into_iter()
        .find(|a| matches!(a, LifecycleAction::Retry(_)))
}

fn copy_effect(state: &mut UiState, detail: &TaskDetail) -> Option<Effect> {
    match detail.copy_target() {
        Some(path) => {
            state.info = format!("Copied {path}");
            Some(Effect::Copy(path))
        }
        None => {
            state.info = "No result path to copy".into();
            None
        }
    }
}

fn completed_key(state: &mut UiState, board: &StatusBoard, k: KeyEvent) -> Option<Effect> {
    let len = board.completed().len();
    match k.code {
        KeyCode::Up | KeyCode::Char('k') => UiState::step(&mut state.completed_selected, -1, len),
        KeyCode::Down | KeyCode::Char('j') => UiState::step(&mut state.completed_selected, 1, len),
        KeyCode::Enter => {
            let task = state.selected_completed(board)?;
            state.open_result(task);
            return Some(Effect::Send(UiCommand::TaskDetail(task.task_id.clone())));
        }
        KeyCode::Char('t') => {
            let detail = TaskDetail::from_task(state.selected_completed(board)?);
            return request_action(state, retry_of(&detail), "retry");
        }
        KeyCode::Char('y') => {
            let detail = TaskDetail::from_task(state.selected_completed(board)?);
            return copy_effect(state, &detail);
        }
        _ => {}
    }
    None
}

fn modal_key(state: &mut UiState, k: KeyEvent) -> Option<Effect> {
    let modal = state.modal.as_mut()?;
    match (k.modifiers, k.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c')) => return Some(Effect::Quit),
        (_, KeyCode::Esc) => state.modal = None,
        (_, KeyCode::Left) | (_, KeyCode::Char('h')) => {
            modal.view = modal.view.prev();
            modal.scroll = 0;
        }
        (_, KeyCode::Right) | (_, KeyCode::Char('l')) => {
            modal.view = modal.view.next();
            modal.scroll = 0;
        }
        (_, KeyCode::Up) | (_, KeyCode::Char('k')) => modal.scroll = modal.scroll.saturating_sub(1),
        (_, KeyCode::Down) | (_, KeyCode::Char('j')) => modal.scroll = modal.scroll.saturating_add(1),
        (_, KeyCode::PageUp) => modal.scroll = modal.scroll.saturating_sub(10),
        (_, KeyCode::PageDown) => modal.scroll = modal.scroll.saturating_add(10),
        (_, KeyCode::Char('t')) => {
            let action = retry_of(&modal.detail);
            return request_action(state, action, "retry");
        }
        (_, KeyCode::Char('y')) => {
            let detail = modal.detail.clone();
            return copy_effect(state, &detail);
        }
        _ => {}
    }
    None
}

fn edit_key(state: &mut UiState, k: KeyEvent) -> Option<Effect> {
    let edit = state.edit.as_mut()?;
    match (k.modifiers, k.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c')) => return Some(Effect::Quit),
        (_, KeyCode::Esc) => state.edit = None,
        (m, KeyCode::Enter) if m.contains(KeyModifiers::ALT) && edit.kind == FieldKind::TextArea => {
            edit.text.push('\n')
        }
        (_, KeyCode::Enter) => {
            let edit = state.edit.take()?;
            return commit_edit(state, edit);
        }
        (_, KeyCode::Backspace) => {
            edit.text.pop();
        }
        (m, KeyCode::Char(c)) if !m.contains(KeyModifiers::CONTROL) => edit.text.push(c),
        _ => {}
    }
    None
}

fn commit_edit(state: &mut UiState, edit: EditBuffer) -> Option<Effect> {
    let panel = state.panels.get_mut(edit.panel)?;
    if edit.kind == FieldKind::File {
        let path = edit.text.trim();
        if path.is_empty() {
            return None;
        }
        if let Err(e) = panel.begin_upload(&edit.mode_id, &edit.field) {
            state.info = e.to_string();
            return None;
        }
        state.info = format!("Uploading {path}…");
        return Some(Effect::Send(UiCommand::Upload {
            key: FieldKey::new(panel.id(), &edit.mode_id, &edit.field),
            path: PathBuf::from(path),
        }));
    }
    if let Err(e) = panel.set_param(&edit.mode_id, &edit.field, ParamValue::Text(edit.text)) {
        state.info = e.to_string();
    }
    None
}

fn submit_key(state: &mut UiState, idx: usize) -> Option<Effect> {
    let panel = state.panels.get_mut(idx)?;
    if panel.submitting {
        state.info = "A submission is already in flight".into();
        return None;
    }
    if panel.uploads_in_flight() > 0 {
        state.info = "Wait for uploads to finish before submitting".into();
        return None;
    }
    match submit::prepare(panel) {
        Ok(request) => {
            panel.submitting = true;
            state.info = format!("Submitting {} mode(s)…", request.modes.len());
            Some(Effect::Send(UiCommand::Submit {
                gadget_id: panel.gadget.id.clone(),
                request,
            }))
        }
        Err(e) => {
            state.info = e.to_string();
            None
        }
    }
}

/// Move a select field to the neighbouring option, wrapping around.
fn cycle_select(state: &mut UiState, idx: usize, mode_id: &str, field: &str, forward: bool) {
    let panel = &mut state.panels[idx];
    let Some(control) = panel.field_controls(mode_id).into_iter().find(|c| c.name == field) else {
        return;
    };
    let ControlInput::Choice { selected, options } = control.input else {
        return;
    };
    if options.is_empty() {
        return;
    }
    let n = options.len();
    let at = selected.and_then(|s| options.iter().position(|o| o.value == s));
    let next = match (at, forward) {
        (None, _) => 0,
        (Some(i), true) => (i + 1) % n,
        (Some(i), false) => (i + n - 1) % n,
    };
    if let Err(e) = panel.set_param(mode_id, field, ParamValue::Text(options[next].value.clone())) {
        state.info = e.to_string();
    }
}

fn gadget_key(state: &mut UiState, idx: usize, k: KeyEvent) -> Option<Effect> {
    if k.code == KeyCode::Char('s') {
        return submit_key(state, idx);
    }
    let modes_len = state.panels.get(idx)?.gadget.modes.len();
    let cursor = state.forms.get_mut(idx)?;

    if cursor.focus == FormFocus::Modes {
        match k.code {
            KeyCode::Up | KeyCode::Char('k') => {
                UiState::step(&mut cursor.mode, -1, modes_len);
                cursor.row = 0;
            }
            KeyCode::Down | KeyCode::Char('j') => {
                UiState::step(&mut cursor.mode, 1, modes_len);
                cursor.row = 0;
            }
            KeyCode::Char(' ') => {
                let mode_id = state.panels[idx].gadget.modes.get(cursor.mode)?.id.clone();
                if let Err(e) = state.panels[idx].toggle_mode(&mode_id) {
                    state.info = e.to_string();
                }
            }
            KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') if modes_len > 0 => {
                cursor.focus = FormFocus::Fields;
                cursor.row = 0;
            }
            _ => {}
        }
        return None;
    }

    let mode_idx = cursor.mode;
    let rows = form_rows(&state.panels[idx], mode_idx);
    match k.code {
        KeyCode::Esc => {
            cursor.focus = FormFocus::Modes;
            return None;
        }
        KeyCode::Up | KeyCode::Char('k') => {
            UiState::step(&mut cursor.row, -1, rows.len());
            return None;
        }
        KeyCode::Down | KeyCode::Char('j') => {
            UiState::step(&mut cursor.row, 1, rows.len());
            return None;
        }
        _ => {}
    }
    let Some(row) = rows.get(cursor.row.min(rows.len().saturating_sub(1))).cloned() else {
        if k.code == KeyCode::Left {
            cursor.focus = FormFocus::Modes;
        }
        return None;
    };
    let mode_id = state.panels[idx].gadget.modes.get(mode_idx)?.id.clone();

    match row {
        FormRow::Field { name, kind } => match (kind, k.code) {
            (FieldKind::Select, KeyCode::Left) => cycle_select(state, idx, &mode_id, &name, false),
            (FieldKind::Select, KeyCode::Right | KeyCode::Enter) => {
                cycle_select(state, idx, &mode_id, &name, true)
            }
            (FieldKind::Text | FieldKind::TextArea | FieldKind::File, KeyCode::Enter) => {
                let text = match kind {
                    FieldKind::File => String::new(),
                    _ => state.panels[idx].params.text(&mode_id, &name).to_string(),
                };
                state.edit = Some(EditBuffer {
                    panel: idx,
                    mode_id,
                    field: name,
                    kind,
                    text,
                });
            }
            (_, KeyCode::Left) => state.forms[idx].focus = FormFocus::Modes,
            _ => {}
        },
        FormRow::Choice { field, value } => match k.code {
            KeyCode::Char(' ') | KeyCode::Enter => {
                if let Err(e) = state.panels[idx].toggle_option(&mode_id, &field, &value) {
                    state.info = e.to_string();
                }
            }
            KeyCode::Left => state.forms[idx].focus = FormFocus::Modes,
            _ => {}
        },
    }
    None
}

pub(super) fn apply_event(state: &mut UiState, ev: DashEvent) {
    match ev {
        DashEvent::GadgetsLoaded(gadgets) => {
            let n = gadgets.len();
            state.load_gadgets(gadgets);
            state.info = format!("Loaded {n} gadget(s)");
        }
        DashEvent::GadgetsFailed(message) => state.screen = Screen::LoadFailed(message),
        DashEvent::SubmissionAccepted {
            gadget_id,
            modes,
            response,
        } => {
            let Some(panel) = state.panel_mut(&gadget_id) else {
                return;
            };
            panel.submitting = false;
            match submit::apply_success(panel, &modes, response) {
                Ok(record) => {
                    state.info = format!(
                        "Submitted {} task(s): {}",
                        record.task_ids.len(),
                        record.task_ids.join(", ")
                    );
                }
                Err(e) => state.info = format!("Submission failed: {e}"),
            }
            if state
                .edit
                .as_ref()
                .is_some_and(|e| modes.contains(&e.mode_id))
            {
                state.edit = None;
            }
        }
        DashEvent::SubmissionFailed { gadget_id, message } => {
            if let Some(panel) = state.panel_mut(&gadget_id) {
                panel.submitting = false;
            }
            state.info = format!("Submission failed: {message}");
        }
        DashEvent::ActionCompleted { message, .. } => state.info = message,
        DashEvent::ActionFailed { action, message } => {
            state.notify(format!("Could not {} {}", action.verb(), action.target()), message);
        }
        DashEvent::UploadProgress { key, percent } => {
            if let Some(panel) = state.panel_mut(&key.gadget_id) {
                panel.upload_progress(&key.mode_id, &key.field, percent);
            }
        }
        DashEvent::UploadFinished { key, reference } => {
            if let Some(panel) = state.panel_mut(&key.gadget_id) {
                panel.finish_upload(&key.mode_id, &key.field, reference.clone());
            }
            state.info = format!("Uploaded {reference}");
        }
        DashEvent::UploadFailed { key, message } => {
            if let Some(panel) = state.panel_mut(&key.gadget_id) {
                panel.fail_upload(&key.mode_id, &key.field, message.clone());
            }
            state.info = format!("Upload of {} failed: {message}", key.field);
        }
        DashEvent::TaskDetailLoaded(task) => state.refresh_result(&task),
        DashEvent::Info(message) => state.info = message,
    }
}

/// Actions the row under the cursor offers, for the footer hint.
pub(super) fn available_actions(state: &UiState, board: &StatusBoard) -> Vec<LifecycleAction> {
    if state.screen != Screen::Ready || state.modal.is_some() {
        return Vec::new();
    }
    match (state.current_tab(), state.dash_focus) {
        (Tab::Minions, DashFocus::Workers) => state
            .selected_worker(board)
            .map(|w| worker_actions(&w.id, &w.status))
            .unwrap_or_default(),
        (Tab::Minions, DashFocus::Pending) => state
            .selected_pending(board)
            .map(|t| task_actions(&t.task_id, TaskList::Pending, t.status.as_ref()))
            .unwrap_or_default(),
        (Tab::Completed, _) => state
            .selected_completed(board)
            .map(|t| task_actions(&t.task_id, TaskList::Completed, t.status.as_ref()))
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{PollUpdate, ResourceUpdate};
    use crate::form::panel::tests::scanner;
    use crate::form::UploadState;
    use crate::model::{FileRef, Status, SubmitResponse, Task, Worker};
    use assert_matches::assert_matches;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn press(state: &mut UiState, board: &StatusBoard, codes: &[KeyCode]) -> Option<Effect> {
        let mut last = None;
        for code in codes {
            last = handle_key(state, board, key(*code));
        }
        last
    }

    fn type_text(state: &mut UiState, text: &str) {
        let board = StatusBoard::default();
        for c in text.chars() {
            assert!(handle_key(state, &board, key(KeyCode::Char(c))).is_none());
        }
    }

    fn on_gadget_tab() -> UiState {
        let mut state = UiState::default();
        state.load_gadgets(vec![scanner()]);
        state.tab = 2;
        state
    }

    fn task(id: &str, status: Status) -> Task {
        Task {
            task_id: id.into(),
            status: Some(status),
            result_dir: Some(format!("results/{id}")),
            ..Default::default()
        }
    }

    fn board(workers: Vec<(&str, Status)>, pending: Vec<Task>, completed: Vec<Task>) -> StatusBoard {
        let mut b = StatusBoard::default();
        let workers = workers
            .into_iter()
            .map(|(id, status)| Worker {
                id: id.into(),
                status,
            })
            .collect();
        for update in [
            ResourceUpdate::Workers(Ok(workers)),
            ResourceUpdate::Pending(Ok(pending)),
            ResourceUpdate::Completed(Ok(completed)),
        ] {
            b.apply(PollUpdate { seq: 1, update });
        }
        b
    }

    #[test]
    fn q_quits_but_not_while_typing() {
        let mut state = on_gadget_tab();
        let b = StatusBoard::default();
        assert_matches!(press(&mut state, &b, &[KeyCode::Char('q')]), Some(Effect::Quit));

        // quick_scan -> fields -> edit target
        press(&mut state, &b, &[KeyCode::Enter, KeyCode::Enter]);
        assert!(state.edit.is_some());
        type_text(&mut state, "q");
        assert_eq!(state.edit.as_ref().unwrap().text, "q");
    }

    #[test]
    fn r_retries_gadget_load_from_error_screen() {
        let mut state = UiState {
            screen: Screen::LoadFailed("connection refused".into()),
            ..Default::default()
        };
        let b = StatusBoard::default();
        assert_matches!(
            press(&mut state, &b, &[KeyCode::Char('r')]),
            Some(Effect::Send(UiCommand::LoadGadgets))
        );
        assert_eq!(state.screen, Screen::Loading);
        assert_matches!(
            press(&mut state, &b, &[KeyCode::Char('r')]),
            Some(Effect::Send(UiCommand::Refresh))
        );
    }

    #[test]
    fn worker_actions_follow_status() {
        let mut state = on_gadget_tab();
        state.tab = 0;
        let b = board(vec![("w1", Status::Idle), ("w2", Status::Busy)], vec![], vec![]);

        assert_matches!(
            press(&mut state, &b, &[KeyCode::Char('p')]),
            Some(Effect::Send(UiCommand::Action(LifecycleAction::Pause(id)))) if id == "w1"
        );
        assert!(press(&mut state, &b, &[KeyCode::Char('c')]).is_none());
        assert_eq!(state.info, "Nothing to cancel here");

        assert_matches!(
            press(&mut state, &b, &[KeyCode::Down, KeyCode::Char('c')]),
            Some(Effect::Send(UiCommand::Action(LifecycleAction::Cancel(id)))) if id == "w2"
        );
        assert_eq!(available_actions(&state, &b), vec![LifecycleAction::Cancel("w2".into())]);
    }

    #[test]
    fn pending_tasks_can_be_cancelled() {
        let mut state = on_gadget_tab();
        state.tab = 0;
        let b = board(vec![], vec![task("t-1", Status::Busy)], vec![]);
        assert_matches!(
            press(&mut state, &b, &[KeyCode::Right, KeyCode::Char('c')]),
            Some(Effect::Send(UiCommand::Action(LifecycleAction::Cancel(id)))) if id == "t-1"
        );
    }

    #[test]
    fn completed_task_opens_viewer_and_offers_retry_when_troubled() {
        let mut state = on_gadget_tab();
        state.tab = 1;
        let b = board(
            vec![],
            vec![],
            vec![task("ok-1", Status::Idle), task("bad-2", Status::Troubled)],
        );

        assert!(press(&mut state, &b, &[KeyCode::Char('t')]).is_none());
        assert_matches!(
            press(&mut state, &b, &[KeyCode::Down, KeyCode::Enter]),
            Some(Effect::Send(UiCommand::TaskDetail(id))) if id == "bad-2"
        );
        assert!(state.modal.is_some());
        assert_matches!(
            press(&mut state, &b, &[KeyCode::Char('y')]),
            Some(Effect::Copy(path)) if path == "results/bad-2"
        );
        assert_matches!(
            press(&mut state, &b, &[KeyCode::Char('t')]),
            Some(Effect::Send(UiCommand::Action(LifecycleAction::Retry(id)))) if id == "bad-2"
        );
        press(&mut state, &b, &[KeyCode::Esc]);
        assert!(state.modal.is_none());
    }

    #[test]
    fn submit_validates_then_sends_with_defaults() {
        let mut state = on_gadget_tab();
        let b = StatusBoard::default();

        assert!(press(&mut state, &b, &[KeyCode::Char('s')]).is_none());
        assert_eq!(state.info, "select at least one mode to run");

        press(&mut state, &b, &[KeyCode::Char(' ')]);
        assert!(press(&mut state, &b, &[KeyCode::Char('s')]).is_none());
        assert!(state.info.contains("TARGET is required"), "{}", state.info);

        press(&mut state, &b, &[KeyCode::Enter, KeyCode::Enter]);
        type_text(&mut state, "10.0.0.1");
        press(&mut state, &b, &[KeyCode::Enter]);
        assert!(state.edit.is_none());

        let Some(Effect::Send(UiCommand::Submit { gadget_id, request })) =
            press(&mut state, &b, &[KeyCode::Char('s')])
        else {
            panic!("expected a submit command, info: {}", state.info);
        };
        assert_eq!(gadget_id, "scanner");
        assert_eq!(request.modes, ["quick_scan"]);
        let quick = &request.parameters["quick_scan"];
        assert_eq!(quick["target"], ParamValue::Text("10.0.0.1".into()));
        assert_eq!(quick["timing"], ParamValue::Text("T3".into()));
        assert!(state.panels[0].submitting);

        assert!(press(&mut state, &b, &[KeyCode::Char('s')]).is_none());
        assert_eq!(state.info, "A submission is already in flight");

        apply_event(
            &mut state,
            DashEvent::SubmissionAccepted {
                gadget_id: "scanner".into(),
                modes: vec!["quick_scan".into()],
                response: SubmitResponse {
                    task_ids: vec!["t1".into()],
                    result_dirs: vec!["results/t1".into()],
                    status: None,
                },
            },
        );
        let panel = &state.panels[0];
        assert!(!panel.submitting);
        assert_eq!(panel.records.len(), 1);
        assert!(panel.selected_modes().is_empty());
        assert!(state.info.contains("t1"));
    }

    #[test]
    fn submission_failure_keeps_form() {
        let mut state = on_gadget_tab();
        state.panels[0].toggle_mode("quick_scan").unwrap();
        state.panels[0].submitting = true;
        apply_event(
            &mut state,
            DashEvent::SubmissionFailed {
                gadget_id: "scanner".into(),
                message: "server returned 500: boom".into(),
            },
        );
        assert!(!state.panels[0].submitting);
        assert_eq!(state.panels[0].selected_modes(), ["quick_scan"]);
        assert!(state.notice.is_none());
        assert_eq!(state.info, "Submission failed: server returned 500: boom");
    }

    #[test]
    fn select_cycles_through_options() {
        let mut state = on_gadget_tab();
        let b = StatusBoard::default();
        press(&mut state, &b, &[KeyCode::Enter, KeyCode::Down, KeyCode::Right]);
        assert_eq!(
            state.panels[0].effective("quick_scan", "timing"),
            Some(ParamValue::Text("T1".into()))
        );
        press(&mut state, &b, &[KeyCode::Right]);
        assert_eq!(
            state.panels[0].effective("quick_scan", "timing"),
            Some(ParamValue::Text("T3".into()))
        );
        press(&mut state, &b, &[KeyCode::Left]);
        assert_eq!(
            state.panels[0].effective("quick_scan", "timing"),
            Some(ParamValue::Text("T1".into()))
        );
    }

    #[test]
    fn space_toggles_multiselect_option() {
        let mut state = on_gadget_tab();
        let b = StatusBoard::default();
        // full_scan rows: target, notes, categories, web, sql, rce
        press(
            &mut state,
            &b,
            &[KeyCode::Down, KeyCode::Enter, KeyCode::Down, KeyCode::Down, KeyCode::Down, KeyCode::Down],
        );
        press(&mut state, &b, &[KeyCode::Char(' ')]);
        assert_eq!(
            state.panels[0].effective("full_scan", "categories"),
            Some(ParamValue::Multi(["sql".to_string(), "web".to_string()].into()))
        );
    }

    #[test]
    fn alt_enter_adds_newline_in_textarea() {
        let mut state = on_gadget_tab();
        let b = StatusBoard::default();
        press(&mut state, &b, &[KeyCode::Down, KeyCode::Enter, KeyCode::Down, KeyCode::Enter]);
        assert_eq!(state.edit.as_ref().map(|e| e.kind), Some(FieldKind::TextArea));
        type_text(&mut state, "a");
        handle_key(&mut state, &b, KeyEvent::new(KeyCode::Enter, KeyModifiers::ALT));
        type_text(&mut state, "b");
        press(&mut state, &b, &[KeyCode::Enter]);
        assert_eq!(state.panels[0].params.text("full_scan", "notes"), "a\nb");
    }

    #[test]
    fn file_field_starts_upload_and_applies_events() {
        let mut state = on_gadget_tab();
        let b = StatusBoard::default();
        press(&mut state, &b, &[KeyCode::Down, KeyCode::Down, KeyCode::Enter, KeyCode::Enter]);
        type_text(&mut state, "/tmp/cap.pcap");
        let effect = press(&mut state, &b, &[KeyCode::Enter]);
        assert_matches!(
            effect,
            Some(Effect::Send(UiCommand::Upload { key, path }))
                if key == FieldKey::new("scanner", "replay", "capture")
                    && path == PathBuf::from("/tmp/cap.pcap")
        );

        // A second upload for the same field is refused while the first runs.
        press(&mut state, &b, &[KeyCode::Enter]);
        type_text(&mut state, "/tmp/other.pcap");
        assert!(press(&mut state, &b, &[KeyCode::Enter]).is_none());
        assert_eq!(state.info, "an upload for capture is already running");

        let key = FieldKey::new("scanner", "replay", "capture");
        apply_event(
            &mut state,
            DashEvent::UploadProgress {
                key: key.clone(),
                percent: 50,
            },
        );
        assert_eq!(
            state.panels[0].upload_state("replay", "capture"),
            Some(&UploadState::InProgress { percent: 50 })
        );
        apply_event(
            &mut state,
            DashEvent::UploadFinished {
                key,
                reference: FileRef("results/temp_upload/cap.pcap".into()),
            },
        );
        assert_eq!(state.panels[0].upload_state("replay", "capture"), None);
        assert_eq!(
            state.panels[0].effective("replay", "capture"),
            Some(ParamValue::File(FileRef("results/temp_upload/cap.pcap".into())))
        );
    }

    #[test]
    fn failed_action_raises_notice_dismissed_by_any_key() {
        let mut state = on_gadget_tab();
        apply_event(
            &mut state,
            DashEvent::ActionFailed {
                action: LifecycleAction::Pause("w1".into()),
                message: "Minion is busy".into(),
            },
        );
        let notice = state.notice.clone().unwrap();
        assert_eq!(notice.title, "Could not pause w1");
        assert_eq!(notice.message, "Minion is busy");

        let b = StatusBoard::default();
        assert!(press(&mut state, &b, &[KeyCode::Char('q')]).is_none());
        assert!(state.notice.is_none());
    }

    #[test]
    fn gadget_load_failure_shows_error_screen() {
        let mut state = UiState::default();
        apply_event(&mut state, DashEvent::GadgetsFailed("server returned 500: down".into()));
        assert_eq!(state.screen, Screen::LoadFailed("server returned 500: down".into()));
        apply_event(&mut state, DashEvent::GadgetsLoaded(vec![scanner()]));
        assert_eq!(state.screen, Screen::Ready);
        assert_eq!(state.panels.len(), 1);
    }
}
