// ── Domain model ──

pub mod characteristic;
pub mod state;

pub use characteristic::{
    CharacteristicKind, CharacteristicValue, ChargingState, OccupancyDetected, ServiceDescriptor,
    ServiceKind, StatusLowBattery,
};
pub use state::{ApplianceSnapshot, OperationalState};
