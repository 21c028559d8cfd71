// ── Appliance transport seam ──
//
// The wire protocol lives behind these two traits. A `Transport` performs
// discovery and the token handshake; the `Appliance` it returns is the live
// handle used for property reads and remote calls.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::Value;
use tracing::debug;

use crate::error::Error;
use crate::models::{self, FirmwareInfo, StatusReport};

/// Capability string every supported appliance must match.
pub const VACUUM_CAPABILITY: &str = "vacuum";

/// Properties the transport keeps for a connected vacuum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    /// Operational state as a kebab-case string (`"cleaning"`, `"charging"`, ...).
    State,
    /// Suction power as a percentage.
    FanSpeed,
    /// Battery charge as a percentage.
    BatteryLevel,
}

impl Property {
    /// Name used by the transport for this property.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::State => "state",
            Self::FanSpeed => "fanSpeed",
            Self::BatteryLevel => "batteryLevel",
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A live, connected appliance.
///
/// Implementations are shared behind `Arc<dyn Appliance>` and must be
/// safe to call concurrently.
#[async_trait]
pub trait Appliance: Send + Sync + fmt::Debug {
    /// Model identifier reported during the handshake (e.g. `roborock.vacuum.s5`).
    fn model(&self) -> &str;

    /// Whether the appliance advertises the given capability.
    fn matches_capability(&self, capability: &str) -> bool;

    /// Read one property.
    async fn property(&self, property: Property) -> Result<Value, Error>;

    /// Invoke a named remote procedure and return its raw JSON result.
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, Error>;

    /// Start (or resume) a full clean.
    async fn activate_cleaning(&self) -> Result<(), Error>;

    /// Stop and return to the dock.
    async fn activate_charging(&self) -> Result<(), Error>;

    async fn pause(&self) -> Result<(), Error>;

    /// Set suction power as a percentage.
    async fn change_fan_speed(&self, speed: u8) -> Result<(), Error>;

    /// Play the locate sound.
    async fn find(&self) -> Result<(), Error>;

    // ── Diagnostic calls ────────────────────────────────────────────

    /// `get_serial_number` → `[{"serial_number": "..."}]`
    async fn serial_number(&self) -> Result<String, Error> {
        debug!("fetching serial number");
        let raw = self.call("get_serial_number", Vec::new()).await?;
        let serial: models::SerialNumber = models::first_of("get_serial_number", raw)?;
        Ok(serial.serial_number)
    }

    /// `miIO.info` → `{"fw_ver": "...", ...}`
    async fn firmware_info(&self) -> Result<FirmwareInfo, Error> {
        debug!("fetching firmware info");
        let raw = self.call("miIO.info", Vec::new()).await?;
        models::decode("miIO.info", raw)
    }

    /// `get_status` → `[{"state": 8, ...}]`
    async fn status(&self) -> Result<StatusReport, Error> {
        debug!("fetching raw status");
        let raw = self.call("get_status", Vec::new()).await?;
        models::first_of("get_status", raw)
    }
}

/// Discovery and handshake against a single appliance.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to the appliance at `address` using its device token.
    async fn connect(
        &self,
        address: &str,
        token: &SecretString,
    ) -> Result<Arc<dyn Appliance>, Error>;
}
