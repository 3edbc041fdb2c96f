//! Gadget tab: mode selection, the dynamic form of the focused mode and the
//! session's submission log.

use super::state::{form_rows, FormFocus, FormRow, UiState};
use crate::form::{ControlInput, FieldControl, GadgetPanel, UploadState};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

fn dim() -> Style {
    Style::default().fg(Color::DarkGray)
}

fn cursor_style(active: bool) -> Style {
    if active {
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

pub fn draw_gadget(area: Rect, f: &mut Frame, state: &UiState, idx: usize) {
    let (Some(panel), Some(cursor)) = (state.panels.get(idx), state.forms.get(idx)) else {
        return;
    };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(6), Constraint::Length(8)])
        .split(area);

    let selected = panel.selection.len();
    let mut header = vec![Span::styled(
        panel.gadget.name.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    header.push(Span::styled(
        format!("  {selected} mode(s) selected"),
        dim(),
    ));
    if panel.submitting {
        header.push(Span::styled("  submitting…", Style::default().fg(Color::Yellow)));
    }
    let in_flight = panel.uploads_in_flight();
    if in_flight > 0 {
        header.push(Span::styled(
            format!("  {in_flight} upload(s) running"),
            Style::default().fg(Color::Yellow),
        ));
    }
    f.render_widget(
        Paragraph::new(vec![
            Line::from(header),
            Line::from(Span::styled(panel.gadget.description.clone(), dim())),
        ]),
        rows[0],
    );

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(rows[1]);
    draw_modes(cols[0], f, panel, cursor.mode, cursor.focus == FormFocus::Modes);
    draw_fields(cols[1], f, state, idx);
    draw_records(rows[2], f, panel);
}

fn draw_modes(area: Rect, f: &mut Frame, panel: &GadgetPanel, at: usize, focused: bool) {
    let items: Vec<ListItem> = panel
        .gadget
        .modes
        .iter()
        .map(|m| {
            let mark = if panel.selection.contains(&m.id) { "[x]" } else { "[ ]" };
            let mut lines = vec![Line::from(format!("{mark} {}", m.name))];
            if !m.description.is_empty() {
                lines.push(Line::from(Span::styled(format!("    {}", m.description), dim())));
            }
            ListItem::new(lines)
        })
        .collect();
    let border = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).border_style(border).title(" Modes "))
        .highlight_style(cursor_style(true));
    let mut ls = ListState::default();
    if !panel.gadget.modes.is_empty() {
        ls.select(Some(at.min(panel.gadget.modes.len() - 1)));
    }
    f.render_stateful_widget(list, area, &mut ls);
}

fn value_spans(control: &FieldControl, upload: Option<&UploadState>) -> Vec<Span<'static>> {
    let placeholder = |p: &str| {
        Span::styled(
            if p.is_empty() { "(empty)".to_string() } else { p.to_string() },
            dim(),
        )
    };
    let mut spans = match &control.input {
        ControlInput::Line(s) if s.is_empty() => vec![placeholder(&control.placeholder)],
        ControlInput::Line(s) => vec![Span::raw(s.clone())],
        ControlInput::Block(s) if s.is_empty() => vec![placeholder(&control.placeholder)],
        ControlInput::Block(s) => {
            let first = s.lines().next().unwrap_or_default().to_string();
            let more = s.lines().count().saturating_sub(1);
            let mut v = vec![Span::raw(first)];
            if more > 0 {
                v.push(Span::styled(format!(" (+{more} lines)"), dim()));
            }
            v
        }
        ControlInput::Choice { selected, options } => {
            let shown = selected
                .as_ref()
                .map(|sel| {
                    options
                        .iter()
                        .find(|o| &o.value == sel)
                        .map(|o| o.label.clone())
                        .unwrap_or_else(|| sel.clone())
                })
                .unwrap_or_else(|| "(choose)".into());
            vec![Span::styled(format!("‹ {shown} ›"), Style::default().fg(Color::Cyan))]
        }
        ControlInput::Checklist(items) => {
            let n = items.iter().filter(|i| i.checked).count();
            vec![Span::styled(format!("{n} selected"), dim())]
        }
        ControlInput::Upload { reference: Some(r) } => {
            vec![Span::styled(r.to_string(), Style::default().fg(Color::Green))]
        }
        ControlInput::Upload { reference: None } => vec![Span::styled("(no file)", dim())],
    };
    match upload {
        Some(UploadState::InProgress { percent }) => spans.push(Span::styled(
            format!("  uploading {percent}%"),
            Style::default().fg(Color::Yellow),
        )),
        Some(UploadState::Failed(msg)) => spans.push(Span::styled(
            format!("  upload failed: {msg}"),
            Style::default().fg(Color::Red),
        )),
        None => {}
    }
    spans
}

fn draw_fields(area: Rect, f: &mut Frame, state: &UiState, idx: usize) {
    let panel = &state.panels[idx];
    let cursor = &state.forms[idx];
    let focused = cursor.focus == FormFocus::Fields;
    let border = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let Some(mode) = panel.gadget.modes.get(cursor.mode) else {
        f.render_widget(
            Paragraph::new("This gadget has no modes").block(Block::default().borders(Borders::ALL)),
            area,
        );
        return;
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(format!(" {} ", mode.name));

    let controls = panel.field_controls(&mode.id);
    let is_selected = panel.selection.contains(&mode.id);
    let editing = state
        .edit
        .as_ref()
        .filter(|e| e.panel == idx && e.mode_id == mode.id);

    let rows = form_rows(panel, cursor.mode);
    if rows.is_empty() {
        f.render_widget(Paragraph::new("No parameters").block(block), area);
        return;
    }
    let mut lines: Vec<Line> = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        let active = focused && i == cursor.row.min(rows.len() - 1);
        match row {
            FormRow::Field { name, .. } => {
                let Some(control) = controls.iter().find(|c| &c.name == name) else {
                    continue;
                };
                let mut spans = vec![Span::styled(
                    format!("{}{}: ", control.label, if control.required { "*" } else { "" }),
                    Style::default().fg(Color::Gray),
                )];
                match editing.filter(|e| &e.field == name) {
                    Some(e) => spans.push(Span::styled(
                        format!("{}▏", e.text),
                        Style::default().fg(Color::White).add_modifier(Modifier::UNDERLINED),
                    )),
                    None => spans.extend(value_spans(control, panel.upload_state(&mode.id, name))),
                }
                if is_selected {
                    if let Some(err) = panel.field_error(&mode.id, name) {
                        spans.push(Span::styled(format!("  ✗ {err}"), Style::default().fg(Color::Red)));
                    }
                }
                lines.push(Line::from(spans).style(cursor_style(active)));
                if let Some(desc) = &control.description {
                    lines.push(Line::from(Span::styled(format!("  {desc}"), dim())));
                }
            }
            FormRow::Choice { field, value } => {
                let item = controls
                    .iter()
                    .find(|c| &c.name == field)
                    .and_then(|c| match &c.input {
                        ControlInput::Checklist(items) => items.iter().find(|it| &it.value == value),
                        _ => None,
                    });
                let (mark, label) = match item {
                    Some(it) => (if it.checked { "[x]" } else { "[ ]" }, it.label.clone()),
                    None => ("[ ]", value.clone()),
                };
                lines.push(Line::from(format!("    {mark} {label}")).style(cursor_style(active)));
            }
        }
    }
    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn draw_records(area: Rect, f: &mut Frame, panel: &GadgetPanel) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Submissions this session ({}) ", panel.records.len()));
    if panel.records.is_empty() {
        f.render_widget(Paragraph::new(Span::styled("Nothing submitted yet", dim())).block(block), area);
        return;
    }
    let mut lines = Vec::new();
    for r in &panel.records {
        lines.push(Line::from(vec![
            Span::styled(crate::result_view::display_time(&r.timestamp), dim()),
            Span::raw("  "),
            Span::styled("Submitted", Style::default().fg(Color::Green)),
        ]));
        for ((mode, task), dir) in r.modes.iter().zip(&r.task_ids).zip(&r.result_dirs) {
            lines.push(Line::from(format!("  {mode}: {task} → {dir}")));
        }
    }
    f.render_widget(Paragraph::new(lines).block(block), area);
}
