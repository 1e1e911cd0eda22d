//! Saved connection profiles
//!
//! Persists the user's named configuration files to
//! `~/.config/ovpn-tui/profiles.json`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// A user-named reference to a VPN configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub path: String,
}

/// The ordered profile list plus the file it persists to.
#[derive(Debug)]
pub struct ProfileStore {
    path: PathBuf,
    pub profiles: Vec<Profile>,
}

impl ProfileStore {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ovpn-tui")
            .join("profiles.json")
    }

    /// Loads the store from the default location.
    pub fn load() -> Self {
        Self::load_from(Self::default_path())
    }

    /// Loads the store from `path`. A missing file yields an empty store;
    /// an unreadable or corrupt one is logged and treated the same way.
    pub fn load_from(path: PathBuf) -> Self {
        let profiles = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(profiles) => profiles,
                Err(err) => {
                    tracing::warn!("failed to parse {}: {err}, starting empty", path.display());
                    Vec::new()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => Vec::new(),
            Err(err) => {
                tracing::warn!("failed to read {}: {err}, starting empty", path.display());
                Vec::new()
            }
        };

        Self { path, profiles }
    }

    /// Writes the profile list, creating the directory if needed. The file is
    /// replaced atomically via a temporary sibling.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(&self.profiles)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }

    pub fn add(&mut self, name: impl Into<String>, path: impl Into<String>) {
        self.profiles.push(Profile {
            name: name.into(),
            path: path.into(),
        });
    }

    /// Removes the profile at `index`; out-of-bounds indices are a no-op.
    pub fn remove_at(&mut self, index: usize) {
        if index < self.profiles.len() {
            self.profiles.remove(index);
        }
    }

    /// File-existence check per entry, index-aligned with `profiles`.
    pub fn validate(&self) -> Vec<bool> {
        self.profiles
            .iter()
            .map(|p| Path::new(&p.path).exists())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &Path) -> ProfileStore {
        ProfileStore::load_from(dir.join("profiles.json"))
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        assert!(store.profiles.is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.json");
        fs::write(&path, "not json at all").unwrap();
        let store = ProfileStore::load_from(path);
        assert!(store.profiles.is_empty());
    }

    #[test]
    fn add_remove_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(dir.path());

        store.add("Work", "/etc/vpn/work.ovpn");
        store.add("Home", "/etc/vpn/home.ovpn");
        store.add("Backup", "/etc/vpn/backup.ovpn");
        store.remove_at(1);
        store.save().unwrap();

        let reloaded = store_in(dir.path());
        assert_eq!(reloaded.profiles, store.profiles);
        assert_eq!(reloaded.profiles.len(), 2);
        assert_eq!(reloaded.profiles[0].name, "Work");
        assert_eq!(reloaded.profiles[1].name, "Backup");
    }

    #[test]
    fn save_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ProfileStore::load_from(dir.path().join("nested").join("profiles.json"));
        store.add("Work", "/etc/vpn/work.ovpn");
        store.save().unwrap();
        assert_eq!(
            ProfileStore::load_from(dir.path().join("nested").join("profiles.json"))
                .profiles
                .len(),
            1
        );
    }

    #[test]
    fn remove_out_of_bounds_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(dir.path());
        store.add("Work", "/etc/vpn/work.ovpn");
        store.remove_at(5);
        assert_eq!(store.profiles.len(), 1);
    }

    #[test]
    fn validate_reports_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real.ovpn");
        fs::write(&real, "config").unwrap();

        let mut store = store_in(dir.path());
        store.add("Real", real.to_string_lossy());
        store.add("Gone", dir.path().join("gone.ovpn").to_string_lossy());

        assert_eq!(store.validate(), vec![true, false]);
    }
}
