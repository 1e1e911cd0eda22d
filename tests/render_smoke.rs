//! Smoke tests rendering full frames through a TestBackend.

use ratatui::backend::TestBackend;
use ratatui::Terminal;

use ovpn_tui::{
    render, AppState, InputMode, Msg, ProfileStore, Session, SessionStats, SessionStatus, Theme,
    View,
};

fn draw_to_text(app: &AppState) -> String {
    let backend = TestBackend::new(80, 24);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal.draw(|frame| render::draw(frame, app)).unwrap();

    let buffer = terminal.backend().buffer();
    let mut out = String::new();
    for y in 0..buffer.area.height {
        for x in 0..buffer.area.width {
            out.push_str(buffer.get(x, y).symbol());
        }
        out.push('\n');
    }
    out
}

fn app_in(dir: &std::path::Path) -> AppState {
    AppState::new(
        ProfileStore::load_from(dir.join("profiles.json")),
        Theme::default(),
    )
}

#[test]
fn empty_profiles_view_renders_hint() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_in(dir.path());

    let text = draw_to_text(&app);
    assert!(text.contains("OpenVPN3 TUI"));
    assert!(text.contains("Profiles"));
    assert!(text.contains("No profiles configured"));
    assert!(text.contains("Fetching sessions..."));
}

#[test]
fn profiles_view_marks_connected_and_invalid_rows() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("Work.ovpn");
    std::fs::write(&config, "").unwrap();

    let mut store = ProfileStore::load_from(dir.path().join("profiles.json"));
    store.add("Work", config.to_string_lossy());
    store.add("Gone", dir.path().join("gone.ovpn").to_string_lossy());
    let mut app = AppState::new(store, Theme::default());
    app.update(Msg::SessionsRefreshed(Ok(vec![Session {
        path: "/net/openvpn/v3/sessions/x".into(),
        config_name: "Work".into(),
        status: SessionStatus::Connected,
        ..Session::default()
    }])));

    let text = draw_to_text(&app);
    assert!(text.contains("> Work"));
    assert!(text.contains("[connected]"));
    assert!(text.contains("Gone (file not found)"));
}

#[test]
fn sessions_view_renders_status_and_stats_box() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = app_in(dir.path());
    app.update(Msg::SessionsRefreshed(Ok(vec![Session {
        path: "/net/openvpn/v3/sessions/x".into(),
        config_name: "Work".into(),
        status: SessionStatus::Paused,
        ..Session::default()
    }])));
    app.view = View::Sessions;
    app.selected_stats = Some(SessionStats {
        bytes_in: "1.00 KB".into(),
        bytes_out: "2.00 KB".into(),
        packets_in: "10".into(),
        packets_out: "20".into(),
        ..SessionStats::default()
    });

    let text = draw_to_text(&app);
    assert!(text.contains("> Work [Paused]"));
    assert!(text.contains("Bytes In:    1.00 KB"));
    assert!(text.contains("Packets Out: 20"));
}

#[test]
fn input_mode_renders_modal_with_suggestions() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("configs")).unwrap();
    std::fs::write(dir.path().join("work.ovpn"), "").unwrap();

    let mut app = app_in(dir.path());
    app.input_mode = InputMode::AwaitingPath;
    app.input = format!("{}/", dir.path().display());
    let input = app.input.clone();
    app.completer.update(&input);

    let text = draw_to_text(&app);
    assert!(text.contains("Add Profile - Enter Path"));
    assert!(text.contains("configs/"));
    assert!(text.contains("work.ovpn"));
    assert!(text.contains("tab: complete"));
}

#[test]
fn error_line_takes_priority_over_status() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = app_in(dir.path());
    app.update(Msg::SessionsRefreshed(Err("dbus unavailable".into())));

    let text = draw_to_text(&app);
    assert!(text.contains("Failed to fetch sessions: dbus unavailable"));
}
