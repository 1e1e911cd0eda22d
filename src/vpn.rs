//! OpenVPN 3 CLI interface
//!
//! Wraps the `openvpn3` command-line tool: session listing, per-session
//! statistics, and session lifecycle management. The tool's output is
//! semi-structured text; the parsers here are layout heuristics matched
//! against captured samples, not a grammar.

use anyhow::{bail, Context, Result};
use tokio::process::Command;

/// Configuration file extension recognized by the tool.
pub const CONFIG_EXTENSION: &str = ".ovpn";

/// Reported state of a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    Connected,
    Paused,
    Disconnected,
    #[default]
    Unknown,
}

impl SessionStatus {
    /// Derives the status from the free-text `Status:` field.
    fn from_label(label: &str) -> Self {
        let label = label.to_ascii_lowercase();
        // "disconnected" contains "connected", so it has to be checked first.
        if label.contains("paused") {
            Self::Paused
        } else if label.contains("disconnected") {
            Self::Disconnected
        } else if label.contains("connected") {
            Self::Connected
        } else {
            Self::Unknown
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Connected => "Connected",
            Self::Paused => "Paused",
            Self::Disconnected => "Disconnected",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// An active session as reported by `openvpn3 sessions-list`.
///
/// Rebuilt wholesale on every refresh; `path` is the opaque D-Bus handle
/// used to address the session in management calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub path: String,
    pub config_name: String,
    pub created: String,
    pub owner: String,
    pub status: SessionStatus,
    pub device: String,
    pub connected_to: String,
}

/// Statistics for one session, fetched on demand.
///
/// Every field is blank when the tool omits the corresponding counter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub bytes_in: String,
    pub bytes_out: String,
    pub packets_in: String,
    pub packets_out: String,
    pub tunnel_address: String,
    pub tunnel_address_v6: String,
    pub connected_duration: String,
}

/// Runs one `openvpn3` invocation, surfacing non-zero exit as an error.
async fn run_openvpn3(args: &[&str]) -> Result<String> {
    let subcommand = args.first().copied().unwrap_or_default();
    let output = Command::new("openvpn3")
        .args(args)
        .output()
        .await
        .with_context(|| format!("failed to run openvpn3 {subcommand}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = stderr.trim();
        if detail.is_empty() {
            bail!("openvpn3 {subcommand} exited with {}", output.status);
        }
        bail!("{detail}");
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Lists all active sessions.
pub async fn list_sessions() -> Result<Vec<Session>> {
    let stdout = run_openvpn3(&["sessions-list"]).await?;
    Ok(parse_sessions_list(&stdout))
}

/// Fetches statistics for the session at `session_path`.
pub async fn get_session_stats(session_path: &str) -> Result<SessionStats> {
    let stdout = run_openvpn3(&["session-stats", "--path", session_path]).await?;
    Ok(parse_session_stats(&stdout))
}

/// Starts a new session from a configuration file.
pub async fn connect(config_path: &str) -> Result<()> {
    run_openvpn3(&["session-start", "--config", config_path])
        .await
        .map(drop)
}

/// Terminates the session at `session_path`.
pub async fn disconnect(session_path: &str) -> Result<()> {
    run_openvpn3(&["session-manage", "--path", session_path, "--disconnect"])
        .await
        .map(drop)
}

/// Pauses the session at `session_path`.
pub async fn pause(session_path: &str) -> Result<()> {
    run_openvpn3(&["session-manage", "--path", session_path, "--pause"])
        .await
        .map(drop)
}

/// Resumes the paused session at `session_path`.
pub async fn resume(session_path: &str) -> Result<()> {
    run_openvpn3(&["session-manage", "--path", session_path, "--resume"])
        .await
        .map(drop)
}

/// Parses `openvpn3 sessions-list` output.
///
/// Blocks are introduced by a `Path:` field; `---` separator lines are
/// skipped. A single physical line may carry several `Key: Value` pairs.
pub fn parse_sessions_list(output: &str) -> Vec<Session> {
    let mut sessions = Vec::new();
    let mut current: Option<Session> = None;

    for line in output.lines() {
        if line.trim_start().starts_with("---") {
            continue;
        }

        if line.contains("Path:") {
            if let Some(done) = current.take() {
                sessions.push(done);
            }
            let mut session = Session::default();
            session.path = extract_field(line, "Path:").unwrap_or_default();
            current = Some(session);
            continue;
        }

        let Some(session) = current.as_mut() else {
            continue;
        };
        if let Some(value) = extract_field(line, "Created:") {
            session.created = value;
        }
        if let Some(value) = extract_field(line, "Owner:") {
            session.owner = value;
        }
        if let Some(value) = extract_field(line, "Device:") {
            session.device = value;
        }
        if let Some(value) = extract_field(line, "Config name:") {
            session.config_name = normalize_config_name(&value);
        }
        if let Some(value) = extract_field(line, "Connected to:") {
            session.connected_to = value;
        }
        if let Some(value) = extract_field(line, "Status:") {
            session.status = SessionStatus::from_label(&value);
        }
    }

    if let Some(done) = current.take() {
        sessions.push(done);
    }
    sessions
}

/// Extracts the value following `key` from a line that may hold several
/// `Key: Value` pairs.
///
/// A value ends where the next field begins: a run of spaces followed by an
/// uppercase-initial token with a colon within the next 20 characters.
fn extract_field(line: &str, key: &str) -> Option<String> {
    let start = line.find(key)? + key.len();
    let rest = &line[start..];
    let bytes = rest.as_bytes();

    let mut end = rest.len();
    for i in 1..bytes.len().saturating_sub(1) {
        if bytes[i] != b' ' {
            continue;
        }
        let candidate = rest[i..].trim_start_matches(' ');
        let Some(first) = candidate.chars().next() else {
            continue;
        };
        if !first.is_ascii_uppercase() {
            continue;
        }
        if let Some(colon) = candidate.find(':') {
            if colon > 0 && colon < 20 {
                end = i;
                break;
            }
        }
    }

    Some(rest[..end].trim().to_string())
}

/// Reduces a raw `Config name:` value to a bare display name.
fn normalize_config_name(raw: &str) -> String {
    let mut name = raw;
    if let Some(idx) = name.find("(Config not available)") {
        name = name[..idx].trim_end();
    }
    config_display_name(name)
}

/// The bare, extension-stripped final segment of a configuration path.
///
/// Shared by the session parser and the profile connected-match check so the
/// two sides always agree.
pub fn config_display_name(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.strip_suffix(CONFIG_EXTENSION).unwrap_or(name).to_string()
}

/// Parses `openvpn3 session-stats` output.
///
/// Lines look like `BYTES_IN....................5942`: the dots are filler,
/// the key is the first field and the value the last. Unrecognized keys are
/// ignored.
pub fn parse_session_stats(output: &str) -> SessionStats {
    let mut stats = SessionStats::default();

    for line in output.lines() {
        let line = line.trim().replace('.', " ");
        let mut fields = line.split_whitespace();
        let Some(key) = fields.next() else {
            continue;
        };
        let Some(value) = fields.last() else {
            continue;
        };

        match key {
            "BYTES_IN" => stats.bytes_in = format_byte_count(value),
            "BYTES_OUT" => stats.bytes_out = format_byte_count(value),
            "PACKETS_IN" => stats.packets_in = value.to_string(),
            "PACKETS_OUT" => stats.packets_out = value.to_string(),
            "TUN_BYTES_IN" => {
                stats.tunnel_address = format!("{} (TUN in)", format_byte_count(value));
            }
            "TUN_BYTES_OUT" => {
                stats.tunnel_address_v6 = format!("{} (TUN out)", format_byte_count(value));
            }
            _ => {}
        }
    }

    stats
}

fn format_byte_count(raw: &str) -> String {
    format_bytes(raw.parse().unwrap_or(0))
}

/// Converts a byte count to the largest 1024-based unit with two decimals.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    match bytes {
        b if b >= GB => format!("{:.2} GB", b as f64 / GB as f64),
        b if b >= MB => format!("{:.2} MB", b as f64 / MB as f64),
        b if b >= KB => format!("{:.2} KB", b as f64 / KB as f64),
        b => format!("{b} B"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_LISTING: &str = "\
-----------------------------------------------------------------------------
        Path: /net/openvpn/v3/sessions/5e2e95f4s5e4bs4e30sae32s24a295201329
     Created: 2024-01-01 10:00:00                  PID: 1234
       Owner: alice                             Device: tun0
 Config name: /home/alice/vpn/Work.ovpn (Config not available)
      Status: Connection, Client connected
-----------------------------------------------------------------------------
        Path: /net/openvpn/v3/sessions/90feca96sc2f2s48b8sb643s7dd9d4d8b530
     Created: 2024-01-02 08:30:00                  PID: 5678
       Owner: bob                               Device: tun1
 Config name: backup.ovpn
Connected to: udp:203.0.113.7:1194
      Status: Connection paused
-----------------------------------------------------------------------------
";

    #[test]
    fn parses_session_blocks() {
        let sessions = parse_sessions_list(SAMPLE_LISTING);
        assert_eq!(sessions.len(), 2);

        let first = &sessions[0];
        assert_eq!(
            first.path,
            "/net/openvpn/v3/sessions/5e2e95f4s5e4bs4e30sae32s24a295201329"
        );
        assert_eq!(first.config_name, "Work");
        assert_eq!(first.created, "2024-01-01 10:00:00");
        assert_eq!(first.owner, "alice");
        assert_eq!(first.device, "tun0");
        assert_eq!(first.status, SessionStatus::Connected);

        let second = &sessions[1];
        assert_eq!(second.config_name, "backup");
        assert_eq!(second.connected_to, "udp:203.0.113.7:1194");
        assert_eq!(second.status, SessionStatus::Paused);
    }

    #[test]
    fn multi_field_line_yields_first_value_only() {
        let line = "Created: 2024-01-01 10:00:00 PID: 1234 Owner: alice";
        assert_eq!(
            extract_field(line, "Created:").unwrap(),
            "2024-01-01 10:00:00"
        );
        assert_eq!(extract_field(line, "Owner:").unwrap(), "alice");
        assert_eq!(extract_field(line, "Missing:"), None);
    }

    #[test]
    fn status_value_with_commas_survives_extraction() {
        let line = "      Status: Connection, Client connected";
        assert_eq!(
            extract_field(line, "Status:").unwrap(),
            "Connection, Client connected"
        );
    }

    #[test]
    fn config_name_is_normalized() {
        assert_eq!(
            normalize_config_name("/home/alice/vpn/Work.ovpn (Config not available)"),
            "Work"
        );
        assert_eq!(normalize_config_name("plain.ovpn"), "plain");
        assert_eq!(normalize_config_name("/etc/openvpn/office"), "office");
    }

    #[test]
    fn display_name_strips_directory_and_extension() {
        assert_eq!(config_display_name("/home/u/Work.ovpn"), "Work");
        assert_eq!(config_display_name("Work.ovpn"), "Work");
        assert_eq!(config_display_name("Work"), "Work");
    }

    #[test]
    fn status_labels_map_case_insensitively() {
        assert_eq!(
            SessionStatus::from_label("Connection, Client connected"),
            SessionStatus::Connected
        );
        assert_eq!(
            SessionStatus::from_label("Connection paused"),
            SessionStatus::Paused
        );
        assert_eq!(
            SessionStatus::from_label("Client disconnected"),
            SessionStatus::Disconnected
        );
        assert_eq!(
            SessionStatus::from_label("Web authentication required"),
            SessionStatus::Unknown
        );
    }

    #[test]
    fn parses_dotted_stats_lines() {
        let output = "\
     BYTES_IN....................5942
     BYTES_OUT...................1772584
     PACKETS_IN..................41
     PACKETS_OUT.................79
     TUN_BYTES_IN................2048
     TUN_BYTES_OUT...............1024
     NETWORK_SEND_ERROR..........2
";
        let stats = parse_session_stats(output);
        assert_eq!(stats.bytes_in, "5.80 KB");
        assert_eq!(stats.bytes_out, "1.69 MB");
        assert_eq!(stats.packets_in, "41");
        assert_eq!(stats.packets_out, "79");
        assert_eq!(stats.tunnel_address, "2.00 KB (TUN in)");
        assert_eq!(stats.tunnel_address_v6, "1.00 KB (TUN out)");
        assert_eq!(stats.connected_duration, "");
    }

    #[test]
    fn empty_stats_output_yields_blank_fields() {
        assert_eq!(parse_session_stats(""), SessionStats::default());
    }

    #[test]
    fn byte_formatting_boundaries() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
        assert_eq!(format_bytes(1073741824), "1.00 GB");
    }
}
