use crate::board::StatusBoard;
use crate::form::{FieldKind, GadgetPanel};
use crate::model::{Gadget, Status, Task, Worker};
use crate::result_view::TaskDetail;
use ratatui::style::{Color, Style};
use ratatui::text::Span;

/// Whole-dashboard state before and after the gadget list arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Loading,
    LoadFailed(String),
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Minions,
    Completed,
    Gadget(usize),
    Help,
}

/// Which table on the minions tab has the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DashFocus {
    #[default]
    Workers,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormFocus {
    #[default]
    Modes,
    Fields,
}

/// One selectable line in a mode's field list. Multiselect options get a line each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormRow {
    Field { name: String, kind: FieldKind },
    Choice { field: String, value: String },
}

/// Cursor of one gadget tab.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormCursor {
    pub focus: FormFocus,
    pub mode: usize,
    pub row: usize,
}

/// Text being typed into a field (text, textarea, or a file path to upload).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditBuffer {
    pub panel: usize,
    pub mode_id: String,
    pub field: String,
    pub kind: FieldKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultTab {
    #[default]
    Details,
    Params,
    Result,
}

impl ResultTab {
    pub const ALL: [ResultTab; 3] = [ResultTab::Details, ResultTab::Params, ResultTab::Result];

    pub fn title(self) -> &'static str {
        match self {
            ResultTab::Details => "Details",
            ResultTab::Params => "Parameters",
            ResultTab::Result => "Result",
        }
    }

    pub fn index(self) -> usize {
        match self {
            ResultTab::Details => 0,
            ResultTab::Params => 1,
            ResultTab::Result => 2,
        }
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % 3]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + 2) % 3]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultModal {
    pub detail: TaskDetail,
    pub view: ResultTab,
    pub scroll: u16,
}

/// Blocking message; any key dismisses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

pub struct UiState {
    pub screen: Screen,
    pub tab: usize,
    pub panels: Vec<GadgetPanel>,
    pub forms: Vec<FormCursor>,
    pub dash_focus: DashFocus,
    pub worker_selected: usize,
    pub pending_selected: usize,
    pub completed_selected: usize,
    pub edit: Option<EditBuffer>,
    pub modal: Option<ResultModal>,
    pub notice: Option<Notice>,
    pub info: String,
    pub initial_gadget: Option<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            screen: Screen::Loading,
            tab: 0,
            panels: Vec::new(),
            forms: Vec::new(),
            dash_focus: DashFocus::Workers,
            worker_selected: 0,
            pending_selected: 0,
            completed_selected: 0,
            edit: None,
            modal: None,
            notice: None,
            info: String::new(),
            initial_gadget: None,
        }
    }
}

impl UiState {
    /// Minions, Completed, one per gadget, Help.
    pub fn tab_count(&self) -> usize {
        self.panels.len() + 3
    }

    pub fn current_tab(&self) -> Tab {
        match self.tab {
            0 => Tab::Minions,
            1 => Tab::Completed,
            i if i < self.panels.len() + 2 => Tab::Gadget(i - 2),
            _ => Tab::Help,
        }
    }

    pub fn tab_titles(&self) -> Vec<String> {
        let mut titles = vec!["Minions".to_string(), "Completed".to_string()];
        titles.extend(self.panels.iter().map(|p| p.gadget.name.clone()));
        titles.push("Help".into());
        titles
    }

    pub fn next_tab(&mut self) {
        self.tab = (self.tab + 1) % self.tab_count();
    }

    pub fn prev_tab(&mut self) {
        let n = self.tab_count();
        self.tab = (self.tab + n - 1) % n;
    }

    pub fn show_help(&mut self) {
        self.tab = self.tab_count() - 1;
    }

    /// Replace the panels with fresh ones. Typed input from an earlier load is dropped.
    pub fn load_gadgets(&mut self, gadgets: Vec<Gadget>) {
        self.forms = vec![FormCursor::default(); gadgets.len()];
        self.panels = gadgets.into_iter().map(GadgetPanel::new).collect();
        self.screen = Screen::Ready;
        self.edit = None;
        if let Some(idx) = self
            .initial_gadget
            .as_deref()
            .and_then(|id| self.panels.iter().position(|p| p.gadget.id == id))
        {
            self.tab = idx + 2;
        } else if self.tab >= self.tab_count() {
            self.tab = 0;
        }
    }

    pub fn panel_mut(&mut self, gadget_id: &str) -> Option<&mut GadgetPanel> {
        self.panels.iter_mut().find(|p| p.gadget.id == gadget_id)
    }

    pub fn selected_worker<'a>(&self, board: &'a StatusBoard) -> Option<&'a Worker> {
        let workers = board.workers();
        workers.get(self.worker_selected.min(workers.len().saturating_sub(1)))
    }

    pub fn selected_pending<'a>(&self, board: &'a StatusBoard) -> Option<&'a Task> {
        let tasks = board.pending();
        tasks.get(self.pending_selected.min(tasks.len().saturating_sub(1)))
    }

    pub fn selected_completed<'a>(&self, board: &'a StatusBoard) -> Option<&'a Task> {
        let tasks = board.completed();
        tasks.get(self.completed_selected.min(tasks.len().saturating_sub(1)))
    }

    /// Move a list cursor by `delta`, clamped to `len`.
    pub fn step(cursor: &mut usize, delta: isize, len: usize) {
        if len == 0 {
            *cursor = 0;
            return;
        }
        let current = (*cursor).min(len - 1) as isize;
        *cursor = (current + delta).clamp(0, len as isize - 1) as usize;
    }

    pub fn open_result(&mut self, task: &Task) {
        self.modal = Some(ResultModal {
            detail: TaskDetail::from_task(task),
            view: ResultTab::Details,
            scroll: 0,
        });
    }

    /// Swap in fresher task data if the modal still shows that task.
    pub fn refresh_result(&mut self, task: &Task) {
        if let Some(modal) = self.modal.as_mut() {
            if modal.detail.task_id == task.task_id {
                modal.detail = TaskDetail::from_task(task);
            }
        }
    }

    pub fn notify(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.notice = Some(Notice {
            title: title.into(),
            message: message.into(),
        });
    }
}

/// Rows of one mode's form in schema order, multiselect options expanded.
pub fn form_rows(panel: &GadgetPanel, mode_idx: usize) -> Vec<FormRow> {
    let Some(mode) = panel.gadget.modes.get(mode_idx) else {
        return Vec::new();
    };
    let mut rows = Vec::new();
    for f in &mode.form_schema {
        let kind = FieldKind::of(&f.spec);
        rows.push(FormRow::Field {
            name: f.name.clone(),
            kind,
        });
        if kind == FieldKind::MultiSelect {
            for opt in f.spec.options.as_deref().unwrap_or(&[]) {
                rows.push(FormRow::Choice {
                    field: f.name.clone(),
                    value: opt.value.clone(),
                });
            }
        }
    }
    rows
}

pub fn status_color(status: &Status) -> Color {
    match status {
        Status::Idle => Color::Green,
        Status::Busy => Color::Yellow,
        Status::Troubled => Color::Red,
        Status::Paused => Color::Cyan,
        Status::Sleepy => Color::Gray,
        Status::Unknown(_) => Color::DarkGray,
    }
}

pub fn worker_badge(status: &Status) -> Span<'static> {
    Span::styled(
        status.worker_label().to_string(),
        Style::default().fg(status_color(status)),
    )
}

pub fn task_badge(status: Option<&Status>) -> Span<'static> {
    match status {
        Some(s) => Span::styled(s.task_label().to_string(), Style::default().fg(status_color(s))),
        None => Span::styled("-", Style::default().fg(Color::DarkGray)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::panel::tests::scanner;

    fn ready() -> UiState {
        let mut state = UiState::default();
        state.load_gadgets(vec![scanner()]);
        state
    }

    #[test]
    fn tabs_cycle_through_gadgets_and_help() {
        let mut state = ready();
        assert_eq!(state.tab_titles(), ["Minions", "Completed", "Network Scanner", "Help"]);
        assert_eq!(state.current_tab(), Tab::Minions);
        state.next_tab();
        state.next_tab();
        assert_eq!(state.current_tab(), Tab::Gadget(0));
        state.next_tab();
        assert_eq!(state.current_tab(), Tab::Help);
        state.next_tab();
        assert_eq!(state.current_tab(), Tab::Minions);
        state.prev_tab();
        assert_eq!(state.current_tab(), Tab::Help);
    }

    #[test]
    fn initial_gadget_opens_its_tab() {
        let mut state = UiState {
            initial_gadget: Some("scanner".into()),
            ..Default::default()
        };
        state.load_gadgets(vec![scanner()]);
        assert_eq!(state.screen, Screen::Ready);
        assert_eq!(state.current_tab(), Tab::Gadget(0));
    }

    #[test]
    fn step_clamps_to_list() {
        let mut c = 0;
        UiState::step(&mut c, -1, 3);
        assert_eq!(c, 0);
        UiState::step(&mut c, 5, 3);
        assert_eq!(c, 2);
        // List shrank underneath the cursor.
        let mut c = 9;
        UiState::step(&mut c, 0, 2);
        assert_eq!(c, 1);
        UiState::step(&mut c, 1, 0);
        assert_eq!(c, 0);
    }

    #[test]
    fn multiselect_options_get_their_own_rows() {
        let state = ready();
        let rows = form_rows(&state.panels[0], 1);
        // target, notes, categories + 3 options
        assert_eq!(rows.len(), 6);
        assert_eq!(
            rows[3],
            FormRow::Field {
                name: "categories".into(),
                kind: FieldKind::MultiSelect
            }
        );
        assert_eq!(
            rows[5],
            FormRow::Choice {
                field: "categories".into(),
                value: "rce".into()
            }
        );
        assert!(form_rows(&state.panels[0], 9).is_empty());
    }

    #[test]
    fn result_tabs_wrap() {
        assert_eq!(ResultTab::Details.prev(), ResultTab::Result);
        assert_eq!(ResultTab::Result.next(), ResultTab::Details);
    }
}
