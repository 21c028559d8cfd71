// ── Raw appliance state → characteristic values ──
//
// Pure functions, no I/O. Every exposed value is derived from one
// `ApplianceSnapshot` so a poll tick and a get-request agree.

use crate::model::{
    ApplianceSnapshot, CharacteristicKind, CharacteristicValue, ChargingState, OccupancyDetected,
    OperationalState, StatusLowBattery,
};

/// Battery levels strictly below this are reported as low.
pub const LOW_BATTERY_THRESHOLD: u8 = 20;

/// Whether the fan (main power) reads as on.
///
/// Returning and charging are deliberately not running; the appliance has
/// finished or abandoned its clean at that point.
pub fn is_running(state: &OperationalState) -> bool {
    matches!(
        state,
        OperationalState::Cleaning
            | OperationalState::Paused
            | OperationalState::Waiting
            | OperationalState::SpotCleaning
    )
}

pub fn is_paused(state: &OperationalState) -> bool {
    matches!(state, OperationalState::Paused | OperationalState::Waiting)
}

pub fn charging_state(state: &OperationalState) -> ChargingState {
    match state {
        OperationalState::Charging => ChargingState::Charging,
        OperationalState::ChargerOffline => ChargingState::NotChargeable,
        _ => ChargingState::NotCharging,
    }
}

pub fn is_docked(state: &OperationalState) -> bool {
    matches!(state, OperationalState::Charging)
}

pub fn low_battery(level: u8) -> bool {
    level < LOW_BATTERY_THRESHOLD
}

pub fn status_low_battery(level: u8) -> StatusLowBattery {
    if low_battery(level) {
        StatusLowBattery::Low
    } else {
        StatusLowBattery::Normal
    }
}

pub fn occupancy(state: &OperationalState) -> OccupancyDetected {
    if is_docked(state) {
        OccupancyDetected::Detected
    } else {
        OccupancyDetected::NotDetected
    }
}

/// Value of one characteristic for the given snapshot.
pub fn map_characteristic(kind: CharacteristicKind, snap: &ApplianceSnapshot) -> CharacteristicValue {
    match kind {
        CharacteristicKind::On => CharacteristicValue::Bool(is_running(&snap.state)),
        CharacteristicKind::RotationSpeed => CharacteristicValue::Percent(snap.fan_speed),
        CharacteristicKind::BatteryLevel => CharacteristicValue::Percent(snap.battery_level),
        CharacteristicKind::ChargingState => {
            CharacteristicValue::Charging(charging_state(&snap.state))
        }
        CharacteristicKind::StatusLowBattery => {
            CharacteristicValue::LowBattery(status_low_battery(snap.battery_level))
        }
        CharacteristicKind::PauseOn => CharacteristicValue::Bool(is_paused(&snap.state)),
        CharacteristicKind::OccupancyDetected => {
            CharacteristicValue::Occupancy(occupancy(&snap.state))
        }
    }
}

/// Values for every given characteristic, in input order.
pub fn map_all(
    kinds: impl IntoIterator<Item = CharacteristicKind>,
    snap: &ApplianceSnapshot,
) -> Vec<(CharacteristicKind, CharacteristicValue)> {
    kinds
        .into_iter()
        .map(|kind| (kind, map_characteristic(kind, snap)))
        .collect()
}
