//! Minions tab: pool metrics, worker table and pending-task table.

use super::state::{task_badge, worker_badge, DashFocus, UiState};
use crate::board::{ResourceState, StatusBoard};
use crate::metrics::{self, Severity};
use crate::model::short_id;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table, TableState},
    Frame,
};
use time::OffsetDateTime;

fn severity_color(s: Severity) -> Color {
    match s {
        Severity::Ok => Color::Green,
        Severity::Warn => Color::Yellow,
        Severity::Danger => Color::Red,
    }
}

/// Block title carrying the resource's load/error state.
pub(super) fn resource_block<T>(title: &str, res: &ResourceState<T>, focused: bool) -> Block<'static> {
    let mut spans = vec![Span::raw(format!(" {title} "))];
    if res.is_loading() {
        spans.push(Span::styled("loading… ", Style::default().fg(Color::DarkGray)));
    }
    if let Some(err) = &res.error {
        spans.push(Span::styled(
            format!("error: {err} "),
            Style::default().fg(Color::Red),
        ));
    }
    if let Some(age) = res.age_secs(OffsetDateTime::now_utc()) {
        spans.push(Span::styled(
            format!("updated {age}s ago "),
            Style::default().fg(Color::DarkGray),
        ));
    }
    let border = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(Line::from(spans))
}

pub fn draw_minions(area: Rect, f: &mut Frame, state: &UiState, board: &StatusBoard) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);
    draw_metrics(rows[0], f, board);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(rows[1]);
    draw_workers(cols[0], f, state, board);
    draw_pending(cols[1], f, state, board);
}

fn draw_metrics(area: Rect, f: &mut Frame, board: &StatusBoard) {
    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(area);

    let Some(m) = board.metrics.data.as_ref() else {
        let msg = match &board.metrics.error {
            Some(e) => Span::styled(format!("Metrics unavailable: {e}"), Style::default().fg(Color::Red)),
            None => Span::styled("Loading metrics…", Style::default().fg(Color::DarkGray)),
        };
        f.render_widget(
            Paragraph::new(Line::from(msg)).block(Block::default().borders(Borders::ALL)),
            area,
        );
        return;
    };
    let summary = metrics::summarize(m);
    let stale = board.metrics.error.is_some();
    let title = |name: &str| {
        if stale {
            format!("{name} (stale)")
        } else {
            name.to_string()
        }
    };

    let cpu = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(title("CPU")))
        .gauge_style(Style::default().fg(severity_color(summary.cpu)))
        .percent(metrics::gauge_percent(m.cpu_percent))
        .label(format!("{:.1}%", m.cpu_percent));
    f.render_widget(cpu, cells[0]);

    let mem = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(title("Memory")))
        .gauge_style(Style::default().fg(severity_color(summary.memory)))
        .percent(metrics::gauge_percent(m.memory_percent))
        .label(format!("{:.1}%", m.memory_percent));
    f.render_widget(mem, cells[1]);

    let active = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(title("Active tasks")))
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(summary.active_ratio)
        .label(format!("{}/{}", m.active_tasks, metrics::ACTIVE_TASK_CAPACITY));
    f.render_widget(active, cells[2]);

    let errors = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(title("Error rate")))
        .gauge_style(Style::default().fg(severity_color(summary.error_rate)))
        .percent(metrics::gauge_percent(m.error_rate))
        .label(format!("{:.1}%", m.error_rate));
    f.render_widget(errors, cells[3]);
}

fn highlight() -> Style {
    Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD)
}

fn draw_workers(area: Rect, f: &mut Frame, state: &UiState, board: &StatusBoard) {
    let focused = state.dash_focus == DashFocus::Workers;
    let block = resource_block(
        &format!("Minions ({})", board.workers().len()),
        &board.workers,
        focused,
    );
    if board.workers().is_empty() && board.workers.data.is_some() {
        f.render_widget(Paragraph::new("No minions reported").block(block), area);
        return;
    }
    let rows: Vec<Row> = board
        .workers()
        .iter()
        .map(|w| {
            Row::new(vec![
                Cell::from(short_id(&w.id, 15)),
                Cell::from(worker_badge(&w.status)),
                Cell::from(board.current_task_mode(&w.id).unwrap_or("-").to_string()),
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [Constraint::Length(18), Constraint::Length(10), Constraint::Min(8)],
    )
    .header(Row::new(vec!["Minion", "Status", "Current task"]).style(Style::default().fg(Color::Gray)))
    .block(block)
    .row_highlight_style(highlight());

    let mut ts = TableState::default();
    if focused && !board.workers().is_empty() {
        ts.select(Some(
            state
                .worker_selected
                .min(board.workers().len().saturating_sub(1)),
        ));
    }
    f.render_stateful_widget(table, area, &mut ts);
}

fn draw_pending(area: Rect, f: &mut Frame, state: &UiState, board: &StatusBoard) {
    let focused = state.dash_focus == DashFocus::Pending;
    let block = resource_block(
        &format!("Pending tasks ({})", board.pending().len()),
        &board.pending,
        focused,
    );
    if board.pending().is_empty() && board.pending.data.is_some() {
        f.render_widget(Paragraph::new("No pending tasks").block(block), area);
        return;
    }
    let rows: Vec<Row> = board
        .pending()
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
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Min(10),
            Constraint::Min(10),
            Constraint::Length(10),
        ],
    )
    .header(Row::new(vec!["Task", "Gadget", "Mode", "Status"]).style(Style::default().fg(Color::Gray)))
    .block(block)
    .row_highlight_style(highlight());

    let mut ts = TableState::default();
    if focused && !board.pending().is_empty() {
        ts.select(Some(
            state
                .pending_selected
                .min(board.pending().len().saturating_sub(1)),
        ));
    }
    f.render_stateful_widget(table, area, &mut ts);
}
