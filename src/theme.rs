//! Terminal color theme
//!
//! Loads colors from `~/.config/ovpn-tui/theme/theme.toml` and falls back to
//! built-in defaults on any failure. Upstream theme switchers replace the
//! whole `theme` directory atomically, so hot-reload watches its parent for
//! the directory being swapped back into place.

use std::path::{Path, PathBuf};
use std::sync::mpsc;

use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use ratatui::style::{Color, Modifier, Style};

/// The color scheme, keyed as in the theme file.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub accent: Color,
    pub foreground: Color,
    pub background: Color,
    pub selection_foreground: Color,
    pub selection_background: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub muted: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Color::Rgb(0x7c, 0x3a, 0xed),
            foreground: Color::Rgb(0xd8, 0xde, 0xe9),
            background: Color::Rgb(0x2e, 0x34, 0x40),
            selection_foreground: Color::Rgb(0xff, 0xff, 0xff),
            selection_background: Color::Rgb(0x7c, 0x3a, 0xed),
            success: Color::Rgb(0xa3, 0xbe, 0x8c),
            warning: Color::Rgb(0xeb, 0xcb, 0x8b),
            error: Color::Rgb(0xbf, 0x61, 0x6a),
            muted: Color::Rgb(0x6b, 0x72, 0x80),
        }
    }
}

fn config_root() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ovpn-tui")
}

impl Theme {
    pub fn theme_file() -> PathBuf {
        config_root().join("theme").join("theme.toml")
    }

    /// Loads the active theme file, or the defaults when it is absent.
    /// Theming is best-effort; this never errors.
    pub fn load() -> Self {
        match std::fs::read_to_string(Self::theme_file()) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    /// Parses flat `key = "value"` lines. Comments, blanks, unknown keys and
    /// unparseable colors are ignored, leaving the per-key default in place.
    pub fn parse(content: &str) -> Self {
        let mut theme = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"');
            let Ok(color) = value.parse::<Color>() else {
                continue;
            };

            match key.trim() {
                "accent" => theme.accent = color,
                "foreground" => theme.foreground = color,
                "background" => theme.background = color,
                "selection_foreground" => theme.selection_foreground = color,
                "selection_background" => theme.selection_background = color,
                "success" => theme.success = color,
                "warning" => theme.warning = color,
                "error" => theme.error = color,
                "muted" => theme.muted = color,
                _ => {}
            }
        }

        theme
    }
}

/// Named render styles derived from a theme.
pub struct Styles {
    pub title: Style,
    pub subtitle: Style,
    pub selected: Style,
    pub normal: Style,
    pub connected: Style,
    pub disconnected: Style,
    pub paused: Style,
    pub accent: Style,
    pub help: Style,
    pub error: Style,
    pub success: Style,
    pub invalid: Style,
    pub active_tab: Style,
    pub inactive_tab: Style,
    pub suggestion: Style,
    pub suggestion_selected: Style,
}

impl Styles {
    pub fn new(theme: &Theme) -> Self {
        Self {
            title: Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
            subtitle: Style::default().fg(theme.muted),
            selected: Style::default()
                .fg(theme.selection_foreground)
                .bg(theme.selection_background)
                .add_modifier(Modifier::BOLD),
            normal: Style::default().fg(theme.foreground),
            connected: Style::default()
                .fg(theme.success)
                .add_modifier(Modifier::BOLD),
            disconnected: Style::default().fg(theme.error),
            paused: Style::default().fg(theme.warning),
            accent: Style::default().fg(theme.accent),
            help: Style::default().fg(theme.muted),
            error: Style::default().fg(theme.error).add_modifier(Modifier::BOLD),
            success: Style::default()
                .fg(theme.success)
                .add_modifier(Modifier::BOLD),
            invalid: Style::default()
                .fg(theme.error)
                .add_modifier(Modifier::CROSSED_OUT),
            active_tab: Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            inactive_tab: Style::default().fg(theme.muted),
            suggestion: Style::default().fg(theme.muted),
            suggestion_selected: Style::default()
                .fg(theme.success)
                .add_modifier(Modifier::BOLD),
        }
    }
}

/// Blocks until the `theme` directory is created or renamed back into place
/// under the config root, then resolves once. Returns `None` when the watch
/// cannot be established; the caller re-arms after each firing.
pub fn watch_theme() -> Option<()> {
    watch_for_theme_swap(&config_root())
}

fn watch_for_theme_swap(dir: &Path) -> Option<()> {
    let (tx, rx) = mpsc::channel();
    let mut watcher = RecommendedWatcher::new(
        move |result: Result<notify::Event, notify::Error>| {
            let _ = tx.send(result);
        },
        notify::Config::default(),
    )
    .ok()?;
    watcher.watch(dir, RecursiveMode::NonRecursive).ok()?;

    for result in rx {
        let Ok(event) = result else {
            continue;
        };
        let swapped_in = matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(_))
        );
        if !swapped_in {
            continue;
        }
        if event
            .paths
            .iter()
            .any(|p| p.file_name().is_some_and(|name| name == "theme"))
        {
            return Some(());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn parses_known_keys() {
        let theme = Theme::parse(
            r##"
# palette
accent = "#ff0000"
success = "#00ff00"
unknown_key = "#123456"
"##,
        );
        assert_eq!(theme.accent, Color::Rgb(0xff, 0x00, 0x00));
        assert_eq!(theme.success, Color::Rgb(0x00, 0xff, 0x00));
        assert_eq!(theme.muted, Theme::default().muted);
    }

    #[test]
    fn bad_color_keeps_default() {
        let theme = Theme::parse("error = \"not-a-color\"\n");
        assert_eq!(theme.error, Theme::default().error);
    }

    #[test]
    fn blank_and_malformed_lines_are_ignored() {
        let theme = Theme::parse("\n\njust words\nmuted #aaa\n");
        assert_eq!(theme, Theme::default());
    }

    #[test]
    fn watch_of_missing_directory_yields_no_event() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("absent");
        assert_eq!(watch_for_theme_swap(&gone), None);
    }

    #[test]
    fn watch_fires_when_theme_directory_appears() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();

        let (done_tx, done_rx) = mpsc::channel();
        let watch_root = root.clone();
        std::thread::spawn(move || {
            let _ = done_tx.send(watch_for_theme_swap(&watch_root));
        });

        // Give the watcher time to register before swapping the directory in.
        std::thread::sleep(Duration::from_millis(300));
        let staged = root.join("theme.staged");
        std::fs::create_dir(&staged).unwrap();
        std::fs::rename(&staged, root.join("theme")).unwrap();

        let fired = done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("watcher did not fire");
        assert_eq!(fired, Some(()));
    }
}
