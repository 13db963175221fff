use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level sync configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SyncConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub board: BoardSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_server_url")]
    pub url: String,
    #[serde(default)]
    pub token: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            token: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_backoff_base")]
    pub push_backoff_base_ms: u64,
    #[serde(default = "default_backoff_max")]
    pub push_backoff_max_ms: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            push_backoff_base_ms: default_backoff_base(),
            push_backoff_max_ms: default_backoff_max(),
        }
    }
}

/// Visible-window hours of the rendered day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSettings {
    #[serde(default = "default_start_hour")]
    pub start_hour: u32,
    #[serde(default = "default_end_hour")]
    pub end_hour: u32,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            start_hour: default_start_hour(),
            end_hour: default_end_hour(),
        }
    }
}

fn default_server_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_poll_interval() -> u64 {
    60
}

fn default_backoff_base() -> u64 {
    1000
}

fn default_backoff_max() -> u64 {
    30_000
}

fn default_start_hour() -> u32 {
    9
}

fn default_end_hour() -> u32 {
    18
}

/// Load configuration from a toml file, or defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<SyncConfig> {
    let Some(path) = path else {
        return Ok(SyncConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_without_a_path() {
        let cfg = load_config(None).unwrap();
        assert_eq!(cfg.server.url, "http://localhost:3000");
        assert_eq!(cfg.sync.poll_interval_secs, 60);
        assert_eq!(cfg.sync.push_backoff_base_ms, 1000);
        assert_eq!(cfg.sync.push_backoff_max_ms, 30_000);
        assert_eq!(cfg.board.start_hour, 9);
        assert_eq!(cfg.board.end_hour, 18);
    }

    #[test]
    fn partial_file_keeps_section_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nurl = \"https://grid.example.com\"\ntoken = \"t0ken\"\n\n[sync]\npoll_interval_secs = 15\n"
        )
        .unwrap();
        let cfg = load_config(Some(file.path())).unwrap();
        assert_eq!(cfg.server.url, "https://grid.example.com");
        assert_eq!(cfg.server.token, "t0ken");
        assert_eq!(cfg.sync.poll_interval_secs, 15);
        // Untouched sections and fields fall back to defaults.
        assert_eq!(cfg.sync.push_backoff_max_ms, 30_000);
        assert_eq!(cfg.board.start_hour, 9);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/timegrid.toml")));
        assert!(err.is_err());
    }

    #[test]
    fn garbage_toml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server = 3").unwrap();
        assert!(load_config(Some(file.path())).is_err());
    }
}
