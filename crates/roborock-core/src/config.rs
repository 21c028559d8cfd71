// ── Runtime accessory configuration ──
//
// Describes *which* appliance to talk to and which optional services to
// expose. Never touches disk: `roborock-config` (or the host) builds a
// `VacuumConfig` and hands it in.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::error::CoreError;

pub const DEFAULT_NAME: &str = "Roborock vacuum cleaner";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for a single vacuum accessory. Immutable once the
/// accessory is constructed.
#[derive(Debug, Clone)]
pub struct VacuumConfig {
    /// Display name; also the prefix of every service name.
    pub name: String,
    /// Network address of the appliance (e.g. `192.168.1.50`).
    pub address: String,
    /// Device token used for the protocol handshake.
    pub token: SecretString,
    /// Expose a pause switch.
    pub pause: bool,
    /// Expose a dock occupancy sensor.
    pub dock: bool,
    /// How often the reconciliation loop re-reads the appliance.
    pub poll_interval: Duration,
    /// Upper bound for every appliance call, connect included.
    pub call_timeout: Duration,
}

impl VacuumConfig {
    /// Config with default name, intervals, and no optional services.
    pub fn new(address: impl Into<String>, token: SecretString) -> Self {
        Self {
            name: DEFAULT_NAME.into(),
            address: address.into(),
            token,
            pause: false,
            dock: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_pause_switch(mut self, enabled: bool) -> Self {
        self.pause = enabled;
        self
    }

    pub fn with_dock_sensor(mut self, enabled: bool) -> Self {
        self.dock = enabled;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Check the invariants the accessory relies on.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.address.trim().is_empty() {
            return Err(CoreError::Config {
                message: "You must provide an ip address of the vacuum cleaner.".into(),
            });
        }
        if self.token.expose_secret().trim().is_empty() {
            return Err(CoreError::Config {
                message: "You must provide a token of the vacuum cleaner.".into(),
            });
        }
        if self.poll_interval.is_zero() {
            return Err(CoreError::Config {
                message: "poll interval must be greater than zero".into(),
            });
        }
        if self.call_timeout.is_zero() {
            return Err(CoreError::Config {
                message: "call timeout must be greater than zero".into(),
            });
        }
        Ok(())
    }
}
