//! State to frame rendering
//!
//! Pure view layer: reads [`AppState`], produces widgets, no side effects.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::app::{AppState, InputMode, View};
use crate::completer::compact_path;
use crate::theme::Styles;
use crate::vpn::{SessionStats, SessionStatus};

pub fn draw(frame: &mut Frame<'_>, app: &AppState) {
    let styles = Styles::new(&app.theme);
    let area = frame.size();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // title
            Constraint::Length(2), // tabs
            Constraint::Min(1),    // content
            Constraint::Length(2), // loading + message
            Constraint::Length(1), // help
        ])
        .split(area);

    frame.render_widget(
        Paragraph::new(Line::styled("OpenVPN3 TUI", styles.title)),
        layout[0],
    );
    render_tabs(frame, layout[1], app, &styles);

    if app.input_mode != InputMode::None {
        render_input(frame, layout[2], app, &styles);
    } else {
        match app.view {
            View::Profiles => render_profiles(frame, layout[2], app, &styles),
            View::Sessions => render_sessions(frame, layout[2], app, &styles),
        }
    }

    render_messages(frame, layout[3], app, &styles);
    render_help(frame, layout[4], app, &styles);
}

fn render_tabs(frame: &mut Frame<'_>, area: Rect, app: &AppState, styles: &Styles) {
    let (profiles_style, sessions_style) = match app.view {
        View::Profiles => (styles.active_tab, styles.inactive_tab),
        View::Sessions => (styles.inactive_tab, styles.active_tab),
    };
    let tabs = Line::from(vec![
        Span::styled(" Profiles ", profiles_style),
        Span::raw("  "),
        Span::styled(" Sessions ", sessions_style),
    ]);
    frame.render_widget(Paragraph::new(tabs), area);
}

fn render_profiles(frame: &mut Frame<'_>, area: Rect, app: &AppState, styles: &Styles) {
    if app.store.profiles.is_empty() {
        let lines = vec![
            Line::styled("No profiles configured", styles.subtitle),
            Line::styled("Press 'a' to add a profile", styles.normal),
        ];
        frame.render_widget(Paragraph::new(lines), area);
        return;
    }

    let mut lines = Vec::with_capacity(app.store.profiles.len());
    for (i, profile) in app.store.profiles.iter().enumerate() {
        let cursor = if i == app.profile_cursor { "> " } else { "  " };
        let valid = app.profile_valid.get(i).copied().unwrap_or(false);
        let connected = app.is_profile_connected(&profile.path);
        let label = format!("{cursor}{}", profile.name);

        let mut spans = Vec::new();
        if i == app.profile_cursor {
            spans.push(Span::styled(label, styles.selected));
        } else if !valid {
            spans.push(Span::styled(
                format!("{label} (file not found)"),
                styles.invalid,
            ));
        } else {
            spans.push(Span::styled(label, styles.normal));
        }
        if connected && (i == app.profile_cursor || valid) {
            spans.push(Span::raw(" "));
            spans.push(Span::styled("[connected]", styles.connected));
        }
        lines.push(Line::from(spans));
    }
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_sessions(frame: &mut Frame<'_>, area: Rect, app: &AppState, styles: &Styles) {
    if app.sessions.is_empty() {
        frame.render_widget(
            Paragraph::new(Line::styled("No active sessions", styles.subtitle)),
            area,
        );
        return;
    }

    let stats_lines = app.selected_stats.as_ref().map(stats_lines);
    let (list_area, stats_area) = match &stats_lines {
        Some(lines) => {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Min(1),
                    Constraint::Length(lines.len() as u16 + 2),
                ])
                .split(area);
            (chunks[0], Some(chunks[1]))
        }
        None => (area, None),
    };

    let mut lines = Vec::with_capacity(app.sessions.len());
    for (i, session) in app.sessions.iter().enumerate() {
        let cursor = if i == app.session_cursor { "> " } else { "  " };
        let status_style = match session.status {
            SessionStatus::Connected => styles.connected,
            SessionStatus::Paused => styles.paused,
            _ => styles.disconnected,
        };
        let row_style = if i == app.session_cursor {
            styles.selected
        } else {
            styles.normal
        };

        lines.push(Line::from(vec![
            Span::styled(format!("{cursor}{}", session.config_name), row_style),
            Span::raw(" ["),
            Span::styled(session.status.label(), status_style),
            Span::raw("]"),
        ]));
    }
    frame.render_widget(Paragraph::new(lines), list_area);

    if let (Some(lines), Some(stats_area)) = (stats_lines, stats_area) {
        frame.render_widget(
            Paragraph::new(lines).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(styles.success)
                    .title("Stats"),
            ),
            stats_area,
        );
    }
}

fn stats_lines(stats: &SessionStats) -> Vec<Line<'static>> {
    let mut lines = vec![Line::raw(format!("Tunnel IP:   {}", stats.tunnel_address))];
    if !stats.tunnel_address_v6.is_empty() {
        lines.push(Line::raw(format!("Tunnel IPv6: {}", stats.tunnel_address_v6)));
    }
    lines.push(Line::raw(format!("Bytes In:    {}", stats.bytes_in)));
    lines.push(Line::raw(format!("Bytes Out:   {}", stats.bytes_out)));
    lines.push(Line::raw(format!("Packets In:  {}", stats.packets_in)));
    lines.push(Line::raw(format!("Packets Out: {}", stats.packets_out)));
    if !stats.connected_duration.is_empty() {
        lines.push(Line::raw(format!("Connected:   {}", stats.connected_duration)));
    }
    lines
}

fn render_input(frame: &mut Frame<'_>, area: Rect, app: &AppState, styles: &Styles) {
    let title = match app.input_mode {
        InputMode::AwaitingPath => "Add Profile - Enter Path",
        InputMode::AwaitingName => "Add Profile - Enter Name",
        InputMode::None => return,
    };

    let mut lines = vec![Line::from(vec![
        Span::styled(app.input.clone(), styles.normal),
        Span::styled("█", styles.accent),
    ])];

    if app.input_mode == InputMode::AwaitingPath && app.completer.has_suggestions() {
        lines.push(Line::raw(""));
        for (i, suggestion) in app.completer.suggestions().iter().enumerate() {
            let display = compact_path(suggestion);
            if app.completer.selected_index() == Some(i) {
                lines.push(Line::styled(
                    format!("  > {display}"),
                    styles.suggestion_selected,
                ));
            } else {
                lines.push(Line::styled(format!("    {display}"), styles.suggestion));
            }
        }
    }

    lines.push(Line::raw(""));
    let help = if app.input_mode == InputMode::AwaitingPath {
        "tab: complete • enter: confirm • esc: cancel"
    } else {
        "enter: confirm • esc: cancel"
    };
    lines.push(Line::styled(help, styles.help));

    frame.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(styles.accent)
                .title(title),
        ),
        area,
    );
}

fn render_messages(frame: &mut Frame<'_>, area: Rect, app: &AppState, styles: &Styles) {
    let mut lines = Vec::new();
    if app.loading {
        lines.push(Line::styled(
            format!("· {}", app.loading_label),
            styles.accent,
        ));
    }
    if let Some(err) = &app.error {
        lines.push(Line::styled(err.clone(), styles.error));
    } else if let Some(status) = &app.status {
        lines.push(Line::styled(status.clone(), styles.success));
    }
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_help(frame: &mut Frame<'_>, area: Rect, app: &AppState, styles: &Styles) {
    let help = match app.view {
        View::Profiles => {
            "tab: switch view • j/k: navigate • enter: connect • a: add • d: delete • r: refresh • q: quit"
        }
        View::Sessions => {
            "tab: switch view • j/k: navigate • enter/s: stats • d: disconnect • r: refresh • q: quit"
        }
    };
    frame.render_widget(Paragraph::new(Line::styled(help, styles.help)), area);
}
