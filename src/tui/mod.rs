mod clipboard;
mod completed;
mod dashboard;
mod forms;
mod help;
mod input;
mod state;

use crate::board::StatusBoard;
use crate::model::{DashConfig, DashEvent};
use crate::orchestrator::{self, UiCommand};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use input::Effect;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::{Notice, Screen, Tab, UiState};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;

pub async fn run(cfg: DashConfig) -> Result<()> {
    let api = crate::cli::connect(&cfg)?;

    // Unbounded channels keep the UI thread from ever blocking on the runtime.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<DashEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let mut poller = orchestrator::poller::activate(api.clone(), cfg.poll_interval);
    let board_rx = poller.board();
    let _ = cmd_tx.send(UiCommand::LoadGadgets);

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_cfg = cfg.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_cfg, board_rx, event_rx, cmd_tx));

    let res = orchestrator::run_controller(api, poller.refresher(), event_tx, cmd_rx).await;
    poller.deactivate();

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    cfg: DashConfig,
    mut board_rx: watch::Receiver<StatusBoard>,
    mut event_rx: UnboundedReceiver<DashEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState and the board snapshot are owned by this thread only.
    let mut state = UiState {
        initial_gadget: cfg.initial_gadget.clone(),
        ..Default::default()
    };
    let mut board = board_rx.borrow_and_update().clone();

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        while let Ok(ev) = event_rx.try_recv() {
            input::apply_event(&mut state, ev);
        }
        if board_rx.has_changed().unwrap_or(false) {
            board = board_rx.borrow_and_update().clone();
        }

        if last_tick.elapsed() >= tick_rate {
            terminal
                .draw(|f| draw(f.area(), f, &state, &board, &cfg.base_url))
                .ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match input::handle_key(&mut state, &board, k) {
                    Some(Effect::Quit) => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    Some(Effect::Send(cmd)) => {
                        if cmd_tx.send(cmd).is_err() {
                            break Err(anyhow::anyhow!("controller stopped"));
                        }
                    }
                    Some(Effect::Copy(text)) => {
                        if let Err(e) = clipboard::copy_to_clipboard(&text) {
                            state.info = format!("Copy failed: {e:#}");
                        }
                    }
                    None => {}
                }
                // Redraw right away so typing does not lag a tick behind.
                last_tick = Instant::now()
                    .checked_sub(tick_rate)
                    .unwrap_or(last_tick);
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState, board: &StatusBoard, base_url: &str) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    let tabs = Tabs::new(state.tab_titles().into_iter().map(Line::from).collect::<Vec<_>>())
        .select(state.tab)
        .block(Block::default().borders(Borders::ALL).title("goblin-console"))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match &state.screen {
        Screen::Loading => {
            let p = Paragraph::new(vec![
                Line::from(""),
                Line::from(format!("Loading gadgets from {base_url}…")),
            ])
            .block(Block::default().borders(Borders::ALL));
            f.render_widget(p, chunks[1]);
        }
        Screen::LoadFailed(message) => {
            let p = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(
                    "Could not load gadgets",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )),
                Line::from(message.clone()),
                Line::from(""),
                Line::from(Span::styled(
                    "press r to retry, q to quit",
                    Style::default().fg(Color::DarkGray),
                )),
            ])
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL));
            f.render_widget(p, chunks[1]);
        }
        Screen::Ready => match state.current_tab() {
            Tab::Minions => dashboard::draw_minions(chunks[1], f, state, board),
            Tab::Completed => completed::draw_completed(chunks[1], f, state, board),
            Tab::Gadget(idx) => forms::draw_gadget(chunks[1], f, state, idx),
            Tab::Help => help::draw_help(chunks[1], f, base_url),
        },
    }

    draw_footer(chunks[2], f, state, board);

    if let Some(modal) = &state.modal {
        completed::draw_result_modal(area, f, modal);
    }
    if let Some(notice) = &state.notice {
        draw_notice(area, f, notice);
    }
}

fn draw_footer(area: Rect, f: &mut ratatui::Frame, state: &UiState, board: &StatusBoard) {
    let mut spans = vec![Span::raw(state.info.clone())];
    let hints: Vec<String> = input::available_actions(state, board)
        .iter()
        .map(|a| {
            let key = match a {
                orchestrator::LifecycleAction::Cancel(_) => 'c',
                orchestrator::LifecycleAction::Pause(_) | orchestrator::LifecycleAction::Resume(_) => 'p',
                orchestrator::LifecycleAction::Retry(_) => 't',
            };
            format!("{key} {}", a.verb())
        })
        .collect();
    if !hints.is_empty() {
        spans.push(Span::styled(
            format!("  [{}]", hints.join(", ")),
            Style::default().fg(Color::Magenta),
        ));
    }
    let failing: Vec<&str> = board.errors().into_iter().map(|(name, _)| name).collect();
    if !failing.is_empty() {
        spans.push(Span::styled(
            format!("  poll errors: {}", failing.join(", ")),
            Style::default().fg(Color::Red),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_notice(area: Rect, f: &mut ratatui::Frame, notice: &Notice) {
    let popup = completed::centered(area, 50, 30);
    f.render_widget(Clear, popup);
    let p = Paragraph::new(vec![
        Line::from(notice.message.clone()),
        Line::from(""),
        Line::from(Span::styled(
            "press any key to dismiss",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .wrap(Wrap { trim: false })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title(format!(" {} ", notice.title)),
    );
    f.render_widget(p, popup);
}
