use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn key_line(key: &'static str, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(format!("{key:<12}"), Style::default().fg(Color::Magenta)),
        Span::raw(what),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame, base_url: &str) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        key_line("q / Ctrl-C", "Quit"),
        key_line("tab", "Next tab (shift-tab: previous)"),
        key_line("r", "Refresh now (retry loading gadgets on the error screen)"),
        key_line("?", "Show this help"),
        key_line("↑/↓ or j/k", "Navigate"),
        Line::from(""),
        Line::from("Minions tab:"),
        key_line("←/→", "Switch between minions and pending tasks"),
        key_line("c", "Cancel the selected pending task or busy minion"),
        key_line("p", "Pause an idle minion / resume a paused one"),
        Line::from(""),
        Line::from("Completed tab:"),
        key_line("enter", "View result (←/→ switch views, esc closes)"),
        key_line("t", "Retry a failed task"),
        key_line("y", "Copy result file or directory path"),
        Line::from(""),
        Line::from("Gadget tabs:"),
        key_line("space", "Toggle mode / multiselect option"),
        key_line("enter / →", "Edit fields of a mode, or edit the selected field"),
        key_line("←/→", "Cycle select options"),
        key_line("esc / ←", "Back to the mode list"),
        key_line("s", "Submit the selected modes"),
        key_line("alt-enter", "New line while editing a text area"),
        Line::from(""),
        Line::from("Server:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled(base_url.to_string(), Style::default().fg(Color::Cyan)),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
