//! Configuration for the Roborock vacuum accessory.
//!
//! Layered loading (defaults, TOML file, `ROBOROCK_*` environment) and
//! translation to `roborock_core::VacuumConfig`. The host may also build a
//! `VacuumConfig` directly and skip this crate entirely.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use roborock_core::VacuumConfig;
use roborock_core::config::{DEFAULT_CALL_TIMEOUT, DEFAULT_NAME, DEFAULT_POLL_INTERVAL};

/// Environment variable prefix, e.g. `ROBOROCK_IP`.
pub const ENV_PREFIX: &str = "ROBOROCK_";

const TOKEN_HEX_LEN: usize = 32;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("You must provide {what} of the vacuum cleaner.")]
    Missing { field: &'static str, what: &'static str },

    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config struct ──────────────────────────────────────────────

/// Accessory configuration as written by the user.
///
/// Keys match the environment names without the prefix: `ip` is read from
/// `ROBOROCK_IP`, `poll_interval_secs` from `ROBOROCK_POLL_INTERVAL_SECS`.
#[derive(Deserialize, Serialize)]
pub struct Config {
    /// Display name and service name prefix.
    #[serde(default = "default_name")]
    pub name: String,

    /// Network address of the vacuum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    /// Device token (32 hex characters). Never serialized back out.
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    /// Expose a pause switch.
    #[serde(default)]
    pub pause: bool,

    /// Expose a dock occupancy sensor.
    #[serde(default)]
    pub dock: bool,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Upper bound for every appliance call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("name", &self.name)
            .field("ip", &self.ip)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("pause", &self.pause)
            .field("dock", &self.dock)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: default_name(),
            ip: None,
            token: None,
            pause: false,
            dock: false,
            poll_interval_secs: default_poll_interval_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_name() -> String {
    DEFAULT_NAME.into()
}
fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}
fn default_timeout_secs() -> u64 {
    DEFAULT_CALL_TIMEOUT.as_secs()
}

impl Config {
    /// Validate and build the runtime accessory config.
    ///
    /// A missing `ip` or `token` is fatal. A token that does not look like
    /// 32 hex characters is passed through with a warning; the handshake
    /// is the real judge.
    pub fn to_vacuum_config(&self) -> Result<VacuumConfig, ConfigError> {
        let ip = self
            .ip
            .as_deref()
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .ok_or(ConfigError::Missing {
                field: "ip",
                what: "an ip address",
            })?;

        let token = self
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::Missing {
                field: "token",
                what: "a token",
            })?;
        if !looks_like_token(token) {
            warn!(ip, "token is not {TOKEN_HEX_LEN} hex characters, the handshake will likely fail");
        }

        let poll_interval = positive_secs("poll_interval_secs", self.poll_interval_secs)?;
        let call_timeout = positive_secs("timeout_secs", self.timeout_secs)?;

        let config = VacuumConfig::new(ip, SecretString::from(token.to_owned()))
            .with_name(self.name.trim())
            .with_pause_switch(self.pause)
            .with_dock_sensor(self.dock)
            .with_poll_interval(poll_interval)
            .with_call_timeout(call_timeout);
        config.validate().map_err(|e| ConfigError::Validation {
            field: "config".into(),
            reason: e.to_string(),
        })?;
        Ok(config)
    }
}

fn looks_like_token(token: &str) -> bool {
    token.len() == TOKEN_HEX_LEN && token.chars().all(|c| c.is_ascii_hexdigit())
}

fn positive_secs(field: &str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(Duration::from_secs(secs))
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "roborock", "roborock").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("roborock");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Layered sources: defaults, then the TOML file at `path` (skipped if
/// absent), then `ROBOROCK_*` environment variables.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX))
}

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from an explicit file + environment.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = figment(path).extract()?;
    Ok(config)
}

/// Load and validate in one step.
pub fn load_vacuum_config(path: Option<&Path>) -> Result<VacuumConfig, ConfigError> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    config.to_vacuum_config()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(ip: &str, token: &str) -> Config {
        Config {
            ip: Some(ip.into()),
            token: Some(token.into()),
            ..Config::default()
        }
    }

    #[test]
    fn defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.name, "Roborock vacuum cleaner");
        assert_eq!(cfg.poll_interval_secs, 30);
        assert_eq!(cfg.timeout_secs, 10);
        assert!(!cfg.pause && !cfg.dock);
    }

    #[test]
    fn missing_ip_is_fatal() {
        let cfg = Config {
            ip: None,
            ..config("", "476e6b70343055483230644c53707a12")
        };
        let err = cfg.to_vacuum_config().expect_err("ip is mandatory");
        assert!(matches!(err, ConfigError::Missing { field: "ip", .. }));
        assert_eq!(
            err.to_string(),
            "You must provide an ip address of the vacuum cleaner."
        );
    }

    #[test]
    fn blank_token_is_fatal() {
        let err = config("192.168.1.50", "   ")
            .to_vacuum_config()
            .expect_err("token is mandatory");
        assert!(matches!(err, ConfigError::Missing { field: "token", .. }));
    }

    #[test]
    fn non_hex_token_is_accepted() {
        assert!(
            config("192.168.1.50", "not-a-real-token")
                .to_vacuum_config()
                .is_ok()
        );
        assert!(!looks_like_token("xyz"));
        assert!(looks_like_token("476E6B70343055483230644C53707A12"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let cfg = Config {
            timeout_secs: 0,
            ..config("192.168.1.50", "476e6b70343055483230644c53707a12")
        };
        let err = cfg.to_vacuum_config().expect_err("zero timeout");
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "timeout_secs"));
    }

    #[test]
    fn debug_output_redacts_the_token() {
        let cfg = config("192.168.1.50", "476e6b70343055483230644c53707a12");
        let rendered = format!("{cfg:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("476e6b70"));
    }

    #[test]
    fn path_ends_in_config_toml() {
        assert!(config_path().ends_with("config.toml"));
    }
}
