//! Operator configuration loaded from `config.json`.
//!
//! One file drives both the update checker (install location, Steam branch,
//! remote command port) and the control surface (target host and the ports
//! it may address). The transport client itself never reads this: callers
//! pass host, port and timeouts explicitly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::transport::Timeouts;

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Steam install directory of the dedicated server.
    #[serde(default)]
    pub install_dir: Option<PathBuf>,

    /// Steam beta branch to track. Empty or missing means `public`.
    #[serde(default)]
    pub steam_beta_branch: Option<String>,

    /// Port the game server listens on for remote commands.
    #[serde(rename = "RemoteCommandPort", default)]
    pub remote_command_port: Option<u16>,

    /// Steam app id of the dedicated server.
    #[serde(default = "default_app_id")]
    pub app_id: String,

    /// steamcmd executable (name on `PATH` or absolute path).
    #[serde(default = "default_steamcmd")]
    pub steamcmd: String,

    /// How long a steamcmd invocation may run.
    #[serde(default = "default_steamcmd_timeout")]
    pub steamcmd_timeout_seconds: u64,

    /// Host the game servers run on.
    #[serde(default = "default_server_host")]
    pub server_host: String,

    /// Ports the control surface may send commands to. The first is the default.
    #[serde(default = "default_server_ports")]
    pub server_ports: Vec<u16>,

    /// Transport timeouts.
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// Transport timeouts in seconds, as written in the config file.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_seconds: u64,
    #[serde(default = "default_io_timeout")]
    pub write_seconds: u64,
    #[serde(default = "default_io_timeout")]
    pub read_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_seconds: default_connect_timeout(),
            write_seconds: default_io_timeout(),
            read_seconds: default_io_timeout(),
        }
    }
}

impl From<TimeoutConfig> for Timeouts {
    fn from(t: TimeoutConfig) -> Self {
        Self {
            connect: Duration::from_secs(t.connect_seconds),
            write: Duration::from_secs(t.write_seconds),
            read: Duration::from_secs(t.read_seconds),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_json(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("Failed to parse JSON")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.server_ports.is_empty(),
            "server_ports must list at least one port"
        );
        anyhow::ensure!(!self.server_host.is_empty(), "server_host must not be empty");
        anyhow::ensure!(
            self.timeouts.connect_seconds > 0
                && self.timeouts.write_seconds > 0
                && self.timeouts.read_seconds > 0,
            "timeouts must be positive"
        );
        Ok(())
    }

    /// Branch to track; defaults to `public`.
    pub fn branch(&self) -> &str {
        self.steam_beta_branch
            .as_deref()
            .filter(|b| !b.is_empty())
            .unwrap_or("public")
    }

    /// Path of the local app manifest, if an install directory is configured.
    pub fn manifest_path(&self) -> Option<PathBuf> {
        self.install_dir.as_ref().map(|dir| {
            dir.join("steamapps")
                .join(format!("appmanifest_{}.acf", self.app_id))
        })
    }

    /// Port used when a caller does not pick one.
    pub fn default_port(&self) -> u16 {
        self.server_ports[0]
    }

    /// Resolve a requested port against the allow-list.
    pub fn allowed_port(&self, requested: Option<u16>) -> Result<u16> {
        match requested {
            None => Ok(self.default_port()),
            Some(port) if self.server_ports.contains(&port) => Ok(port),
            Some(port) => anyhow::bail!(
                "Port {port} is not allowed. Allowed ports: {:?}",
                self.server_ports
            ),
        }
    }

    pub fn transport_timeouts(&self) -> Timeouts {
        self.timeouts.into()
    }
}

fn default_app_id() -> String {
    "3930080".into()
}

fn default_steamcmd() -> String {
    "steamcmd".into()
}

fn default_server_host() -> String {
    "127.0.0.1".into()
}

fn default_server_ports() -> Vec<u16> {
    vec![7779]
}

const fn default_steamcmd_timeout() -> u64 {
    120
}

const fn default_connect_timeout() -> u64 {
    10
}

const fn default_io_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_updater_config() {
        let json = r#"{
            "install_dir": "/srv/nuclear-option",
            "steam_beta_branch": "experimental",
            "RemoteCommandPort": 7779
        }"#;

        let config = Config::from_json(json).unwrap();

        assert_eq!(config.branch(), "experimental");
        assert_eq!(config.remote_command_port, Some(7779));
        assert_eq!(
            config.manifest_path(),
            Some(PathBuf::from(
                "/srv/nuclear-option/steamapps/appmanifest_3930080.acf"
            ))
        );

        // Defaults
        assert_eq!(config.app_id, "3930080");
        assert_eq!(config.steamcmd, "steamcmd");
        assert_eq!(config.steamcmd_timeout_seconds, 120);
        assert_eq!(config.server_host, "127.0.0.1");
        assert_eq!(config.server_ports, vec![7779]);
    }

    #[test]
    fn empty_branch_means_public() {
        let config = Config::from_json(r#"{"steam_beta_branch": ""}"#).unwrap();
        assert_eq!(config.branch(), "public");

        let config = Config::from_json("{}").unwrap();
        assert_eq!(config.branch(), "public");
        assert!(config.manifest_path().is_none());
    }

    #[test]
    fn port_allow_list() {
        let config = Config::from_json(r#"{"server_ports": [7779, 7780]}"#).unwrap();
        assert_eq!(config.allowed_port(None).unwrap(), 7779);
        assert_eq!(config.allowed_port(Some(7780)).unwrap(), 7780);

        let err = config.allowed_port(Some(22)).unwrap_err();
        assert!(err.to_string().contains("Port 22 is not allowed"));
    }

    #[test]
    fn empty_port_list_rejected() {
        assert!(Config::from_json(r#"{"server_ports": []}"#).is_err());
    }

    #[test]
    fn zero_timeout_rejected() {
        assert!(Config::from_json(r#"{"timeouts": {"read_seconds": 0}}"#).is_err());
    }

    #[test]
    fn timeouts_convert() {
        let config =
            Config::from_json(r#"{"timeouts": {"connect_seconds": 2, "read_seconds": 5}}"#).unwrap();
        let t = config.transport_timeouts();
        assert_eq!(t.connect, Duration::from_secs(2));
        assert_eq!(t.write, Duration::from_secs(30));
        assert_eq!(t.read, Duration::from_secs(5));
    }

    #[test]
    fn from_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"RemoteCommandPort": 7781, "server_ports": [7781]}"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.remote_command_port, Some(7781));
        assert_eq!(config.default_port(), 7781);
    }

    #[test]
    fn from_file_missing() {
        let err = Config::from_file(Path::new("/nonexistent/config.json")).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read config file"));
    }
}
