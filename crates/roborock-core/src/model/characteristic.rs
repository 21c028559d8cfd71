// ── Exposed accessory vocabulary ──
//
// What the host sees: services, characteristics, and their values. Numeric
// encodings follow the HomeKit Accessory Protocol so a host adapter can pass
// `CharacteristicValue::raw()` straight through.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Service types this accessory can register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ServiceKind {
    AccessoryInformation,
    Fan,
    Battery,
    PauseSwitch,
    DockSensor,
}

/// Every characteristic the accessory may expose.
///
/// `On` (fan) and `PauseOn` (switch) are the same HAP characteristic type
/// on two different services, so they are distinct kinds here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum CharacteristicKind {
    On,
    RotationSpeed,
    BatteryLevel,
    ChargingState,
    StatusLowBattery,
    PauseOn,
    OccupancyDetected,
}

impl CharacteristicKind {
    pub const ALL: [Self; 7] = [
        Self::On,
        Self::RotationSpeed,
        Self::BatteryLevel,
        Self::ChargingState,
        Self::StatusLowBattery,
        Self::PauseOn,
        Self::OccupancyDetected,
    ];

    /// The service this characteristic belongs to.
    pub fn service(self) -> ServiceKind {
        match self {
            Self::On | Self::RotationSpeed => ServiceKind::Fan,
            Self::BatteryLevel | Self::ChargingState | Self::StatusLowBattery => {
                ServiceKind::Battery
            }
            Self::PauseOn => ServiceKind::PauseSwitch,
            Self::OccupancyDetected => ServiceKind::DockSensor,
        }
    }

    /// Whether the host may set this characteristic.
    pub fn is_writable(self) -> bool {
        matches!(self, Self::On | Self::RotationSpeed | Self::PauseOn)
    }

    /// HAP characteristic type name.
    pub fn hap_name(self) -> &'static str {
        match self {
            Self::On | Self::PauseOn => "On",
            Self::RotationSpeed => "RotationSpeed",
            Self::BatteryLevel => "BatteryLevel",
            Self::ChargingState => "ChargingState",
            Self::StatusLowBattery => "StatusLowBattery",
            Self::OccupancyDetected => "OccupancyDetected",
        }
    }

    /// Value the characteristic holds before the appliance was ever read.
    pub fn initial_value(self) -> CharacteristicValue {
        match self {
            Self::On | Self::PauseOn => CharacteristicValue::Bool(false),
            Self::RotationSpeed | Self::BatteryLevel => CharacteristicValue::Percent(0),
            Self::ChargingState => CharacteristicValue::Charging(ChargingState::NotCharging),
            Self::StatusLowBattery => CharacteristicValue::LowBattery(StatusLowBattery::Normal),
            Self::OccupancyDetected => {
                CharacteristicValue::Occupancy(OccupancyDetected::NotDetected)
            }
        }
    }
}

impl fmt::Display for CharacteristicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PauseOn => f.write_str("On (pause)"),
            other => f.write_str(other.hap_name()),
        }
    }
}

/// HAP `ChargingState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum ChargingState {
    NotCharging = 0,
    Charging = 1,
    NotChargeable = 2,
}

/// HAP `StatusLowBattery`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum StatusLowBattery {
    Normal = 0,
    Low = 1,
}

/// HAP `OccupancyDetected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum OccupancyDetected {
    NotDetected = 0,
    Detected = 1,
}

/// A characteristic value as exchanged with the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum CharacteristicValue {
    Bool(bool),
    /// 0–100.
    Percent(u8),
    Charging(ChargingState),
    LowBattery(StatusLowBattery),
    Occupancy(OccupancyDetected),
}

impl CharacteristicValue {
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_percent(self) -> Option<u8> {
        match self {
            Self::Percent(p) => Some(p),
            _ => None,
        }
    }

    /// HAP numeric encoding (`bool` as 0/1, enums as their discriminant).
    #[allow(clippy::as_conversions)]
    pub fn raw(self) -> u8 {
        match self {
            Self::Bool(b) => u8::from(b),
            Self::Percent(p) => p,
            Self::Charging(c) => c as u8,
            Self::LowBattery(l) => l as u8,
            Self::Occupancy(o) => o as u8,
        }
    }
}

impl fmt::Display for CharacteristicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Percent(p) => write!(f, "{p}%"),
            Self::Charging(c) => write!(f, "{c:?}"),
            Self::LowBattery(l) => write!(f, "{l:?}"),
            Self::Occupancy(o) => write!(f, "{o:?}"),
        }
    }
}

/// Static description of one registered service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceDescriptor {
    pub kind: ServiceKind,
    pub name: String,
    pub characteristics: Vec<CharacteristicKind>,
    /// Fixed string characteristics (manufacturer, model, ...).
    pub metadata: BTreeMap<&'static str, String>,
}

impl ServiceDescriptor {
    pub(crate) fn new(kind: ServiceKind, name: impl Into<String>) -> Self {
        let characteristics = CharacteristicKind::ALL
            .into_iter()
            .filter(|c| c.service() == kind)
            .collect();
        Self {
            kind,
            name: name.into(),
            characteristics,
            metadata: BTreeMap::new(),
        }
    }

    pub(crate) fn with_metadata(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.metadata.insert(key, value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_belongs_to_a_non_information_service() {
        for kind in CharacteristicKind::ALL {
            assert_ne!(kind.service(), ServiceKind::AccessoryInformation);
        }
    }

    #[test]
    fn only_on_speed_and_pause_are_writable() {
        let writable: Vec<_> = CharacteristicKind::ALL
            .into_iter()
            .filter(|k| k.is_writable())
            .collect();
        assert_eq!(
            writable,
            vec![
                CharacteristicKind::On,
                CharacteristicKind::RotationSpeed,
                CharacteristicKind::PauseOn
            ]
        );
    }

    #[test]
    fn raw_encoding_follows_hap() {
        assert_eq!(CharacteristicValue::Bool(true).raw(), 1);
        assert_eq!(
            CharacteristicValue::Charging(ChargingState::NotChargeable).raw(),
            2
        );
        assert_eq!(
            CharacteristicValue::LowBattery(StatusLowBattery::Low).raw(),
            1
        );
        assert_eq!(
            CharacteristicValue::Occupancy(OccupancyDetected::NotDetected).raw(),
            0
        );
    }

    #[test]
    fn fan_service_lists_on_and_rotation_speed() {
        let fan = ServiceDescriptor::new(ServiceKind::Fan, "Robo");
        assert_eq!(
            fan.characteristics,
            vec![CharacteristicKind::On, CharacteristicKind::RotationSpeed]
        );
    }
}
