// ── Appliance state types ──

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;
use strum::EnumString;

use crate::error::CoreError;

/// Self-reported activity mode of the appliance.
///
/// Parsed from the transport's kebab-case state string. States this crate
/// has no special handling for land in [`Other`](Self::Other) with the raw
/// string kept for logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum OperationalState {
    Cleaning,
    SpotCleaning,
    Paused,
    Waiting,
    Returning,
    Charging,
    ChargerOffline,
    Idle,
    #[strum(default)]
    Other(String),
}

impl OperationalState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Cleaning => "cleaning",
            Self::SpotCleaning => "spot-cleaning",
            Self::Paused => "paused",
            Self::Waiting => "waiting",
            Self::Returning => "returning",
            Self::Charging => "charging",
            Self::ChargerOffline => "charger-offline",
            Self::Idle => "idle",
            Self::Other(raw) => raw,
        }
    }

    /// Interpret a raw `state` property value.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(raw) => Self::parse(raw),
            other => Self::Other(other.to_string()),
        }
    }

    fn parse(raw: &str) -> Self {
        Self::from_str(raw).unwrap_or_else(|_| Self::Other(raw.to_owned()))
    }
}

impl fmt::Display for OperationalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OperationalState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Raw property values read from one appliance handle in one go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplianceSnapshot {
    pub state: OperationalState,
    /// Battery charge, 0–100.
    pub battery_level: u8,
    /// Suction power, 0–100.
    pub fan_speed: u8,
}

impl ApplianceSnapshot {
    /// Build a snapshot from raw property values.
    pub fn from_values(state: &Value, battery: &Value, fan_speed: &Value) -> Result<Self, CoreError> {
        Ok(Self {
            state: OperationalState::from_value(state),
            battery_level: percent("batteryLevel", battery)?,
            fan_speed: percent("fanSpeed", fan_speed)?,
        })
    }
}

/// Read a percentage, clamping out-of-range numbers into 0–100.
fn percent(property: &str, value: &Value) -> Result<u8, CoreError> {
    let unexpected = || CoreError::UnexpectedResponse {
        property: property.to_owned(),
        value: value.to_string(),
    };

    let number = match value {
        Value::Number(n) => n.as_f64().ok_or_else(unexpected)?,
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| unexpected())?,
        _ => return Err(unexpected()),
    };
    if !number.is_finite() {
        return Err(unexpected());
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
    let clamped = number.round().clamp(0.0, 100.0) as u8;
    Ok(clamped)
}
