//! Completed-task list and the result viewer popup.

use super::dashboard::resource_block;
use super::state::{task_badge, ResultModal, ResultTab, UiState};
use crate::board::StatusBoard;
use crate::result_view::display_time;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Tabs, Wrap},
    Frame,
};

pub fn draw_completed(area: Rect, f: &mut Frame, state: &UiState, board: &StatusBoard) {
    let tasks = board.completed();
    let block = resource_block(
        &format!("Completed tasks ({})", tasks.len()),
        &board.completed,
        true,
    );
    if tasks.is_empty() && board.completed.data.is_some() {
        f.render_widget(Paragraph::new("No completed tasks yet").block(block), area);
        return;
    }

    let rows: Vec<Row> = tasks
        .iter()
        .map(|t| {
            Row::new(vec![
                Cell::from(t.short_id()),
                Cell::from(
                    t.gadget_name
                        .clone()
                        .or_else(|| t.gadget_id.clone())
                        .unwrap_or_else(|| "-".into()),
                ),
                Cell::from(t.mode.clone().unwrap_or_else(|| "-".into())),
                Cell::from(task_badge(t.status.as_ref())),
                Cell::from(
                    t.completion_time
                        .as_deref()
                        .map(display_time)
                        .unwrap_or_else(|| "-".into()),
                ),
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Min(12),
            Constraint::Min(12),
            Constraint::Length(10),
            Constraint::Length(20),
        ],
    )
    .header(
        Row::new(vec!["Task", "Gadget", "Mode", "Status", "Completed"])
            .style(Style::default().fg(Color::Gray)),
    )
    .block(block)
    .row_highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    );

    let mut ts = TableState::default();
    if !tasks.is_empty() {
        ts.select(Some(state.completed_selected.min(tasks.len() - 1)));
    }
    f.render_stateful_widget(table, area, &mut ts);
}

/// A rectangle of `pct_x` x `pct_y` percent centered in `area`.
pub(super) fn centered(area: Rect, pct_x: u16, pct_y: u16) -> Rect {
    let v = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - pct_y) / 2),
            Constraint::Percentage(pct_y),
            Constraint::Percentage((100 - pct_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - pct_x) / 2),
            Constraint::Percentage(pct_x),
            Constraint::Percentage((100 - pct_x) / 2),
        ])
        .split(v[1])[1]
}

fn label(text: &str) -> Span<'static> {
    Span::styled(format!("{text:<18}"), Style::default().fg(Color::Gray))
}

fn modal_lines(modal: &ResultModal) -> Vec<Line<'static>> {
    let detail = &modal.detail;
    match modal.view {
        ResultTab::Details => {
            let mut lines: Vec<Line> = detail
                .rows
                .iter()
                .map(|(k, v)| {
                    let value = if *k == "Status" {
                        task_badge(detail.status.as_ref())
                    } else {
                        Span::raw(v.clone())
                    };
                    Line::from(vec![label(k), value])
                })
                .collect();
            if let Some(err) = &detail.error {
                lines.push(Line::from(vec![
                    label("Error"),
                    Span::styled(err.clone(), Style::default().fg(Color::Red)),
                ]));
            }
            lines
        }
        ResultTab::Params => detail.params.lines().map(|l| Line::from(l.to_string())).collect(),
        ResultTab::Result => {
            let mut lines = Vec::new();
            for section in detail.result.sections() {
                lines.push(Line::from(Span::styled(
                    section.title,
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )));
                lines.extend(section.body.lines().map(|l| Line::from(format!("  {l}"))));
                lines.push(Line::from(""));
            }
            lines
        }
    }
}

pub fn draw_result_modal(area: Rect, f: &mut Frame, modal: &ResultModal) {
    let popup = centered(area, 80, 80);
    f.render_widget(Clear, popup);

    let retry_hint = match modal.detail.status {
        Some(crate::model::Status::Troubled) => "  t retry",
        _ => "",
    };
    let block = Block::default().borders(Borders::ALL).title(Line::from(vec![
        Span::styled(" Task Result ", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(
            format!("esc close  ←/→ view  y copy{retry_hint} "),
            Style::default().fg(Color::DarkGray),
        ),
    ]));
    let inner = block.inner(popup);
    f.render_widget(block, popup);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(inner);
    let tabs = Tabs::new(ResultTab::ALL.iter().map(|t| Line::from(t.title())).collect::<Vec<_>>())
        .select(modal.view.index())
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, parts[0]);

    let body = Paragraph::new(modal_lines(modal))
        .wrap(Wrap { trim: false })
        .scroll((modal.scroll, 0));
    f.render_widget(body, parts[1]);
}
