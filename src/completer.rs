//! Filesystem path completion for the add-profile input flow.

use std::path::{Path, PathBuf};

use crate::vpn::CONFIG_EXTENSION;

const MAX_SUGGESTIONS: usize = 5;

/// Expands a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{rest}", home.display());
        }
    }
    path.to_string()
}

/// Abbreviates the home directory back to `~` for display.
pub fn compact_path(path: &str) -> String {
    if let Some(home) = dirs::home_dir() {
        let home = home.display().to_string();
        if let Some(rest) = path.strip_prefix(&home) {
            return format!("~{rest}");
        }
    }
    path.to_string()
}

/// Live completion candidates for the path being typed.
///
/// Directories come first (with a trailing `/`), then configuration files,
/// case-insensitive prefix matched and capped at a handful of entries.
#[derive(Debug, Default)]
pub struct PathCompleter {
    suggestions: Vec<String>,
    selected: Option<usize>,
}

impl PathCompleter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recomputes suggestions for `input` and resets the selection.
    pub fn update(&mut self, input: &str) {
        self.suggestions = collect_suggestions(input);
        self.selected = None;
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn has_suggestions(&self) -> bool {
        !self.suggestions.is_empty()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected
            .and_then(|i| self.suggestions.get(i))
            .map(String::as_str)
    }

    pub fn select_next(&mut self) {
        if self.suggestions.is_empty() {
            return;
        }
        self.selected = Some(match self.selected {
            Some(i) if i + 1 < self.suggestions.len() => i + 1,
            Some(_) => 0,
            None => 0,
        });
    }

    pub fn select_prev(&mut self) {
        if self.suggestions.is_empty() {
            return;
        }
        self.selected = Some(match self.selected {
            Some(0) | None => self.suggestions.len() - 1,
            Some(i) => i - 1,
        });
    }

    pub fn clear(&mut self) {
        self.suggestions.clear();
        self.selected = None;
    }
}

fn collect_suggestions(input: &str) -> Vec<String> {
    if input.is_empty() {
        return Vec::new();
    }

    let input = expand_home(input);
    let (dir, prefix) = split_input(&input);

    let mut dir = dir;
    if !dir.is_dir() {
        let Some(parent) = dir.parent().map(Path::to_path_buf) else {
            return Vec::new();
        };
        if !parent.exists() {
            return Vec::new();
        }
        dir = parent;
    }

    let Ok(entries) = std::fs::read_dir(&dir) else {
        return Vec::new();
    };

    let prefix_lower = prefix.to_lowercase();
    let mut matches = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();

        // Hidden entries only show up once the prefix itself is hidden.
        if name.starts_with('.') && !prefix.starts_with('.') {
            continue;
        }
        if !prefix.is_empty() && !name.to_lowercase().starts_with(&prefix_lower) {
            continue;
        }

        let full = dir.join(&name);
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_dir {
            matches.push(format!("{}/", full.display()));
        } else if name.to_lowercase().ends_with(CONFIG_EXTENSION) {
            matches.push(full.display().to_string());
        }
    }

    matches.sort_by(|a, b| {
        let (a_dir, b_dir) = (a.ends_with('/'), b.ends_with('/'));
        b_dir
            .cmp(&a_dir)
            .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
    });
    matches.truncate(MAX_SUGGESTIONS);
    matches
}

/// Splits the typed input into the directory to scan and the name prefix to
/// match; an input ending in `/` means "inside that directory".
fn split_input(input: &str) -> (PathBuf, String) {
    if input.ends_with('/') {
        return (PathBuf::from(input), String::new());
    }
    let path = Path::new(input);
    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"));
    let prefix = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    (dir, prefix)
}
