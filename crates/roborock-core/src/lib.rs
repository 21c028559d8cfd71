//! Device-state reconciliation between a Roborock vacuum and a
//! home-automation host.
//!
//! The appliance is reached through the opaque [`roborock_api::Transport`]
//! seam and is expected to drop off the network regularly. Nothing in this
//! crate treats that as fatal:
//!
//! - **[`DeviceConnection`]**: Single-flight cache around the live
//!   appliance handle. Concurrent callers share one in-flight connect; a
//!   failed connect leaves the cache empty so the next caller retries.
//!
//! - **[`mapping`]**: Pure translation of raw appliance state (operational
//!   state, fan speed, battery level) into characteristic values.
//!
//! - **[`CommandDispatcher`]**: Turns host set-requests into appliance
//!   calls, with fan-speed tier quantization and state-aware pause/resume
//!   guards.
//!
//! - **[`PollState`]**: Observable state of the fixed-interval
//!   reconciliation loop that re-reads the appliance and pushes every exposed
//!   characteristic.
//!
//! - **[`Vacuum`]**: The accessory facade the host talks to: service
//!   descriptors, per-characteristic get/set, `identify`, and push
//!   subscriptions backed by the [`CharacteristicStore`].

pub mod accessory;
pub mod command;
pub mod config;
pub mod connection;
mod diagnostics;
pub mod error;
pub mod mapping;
pub mod model;
pub mod poll;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use accessory::Vacuum;
pub use command::{ApplianceCommand, CommandDispatcher, Dispatch, FanSpeedTier};
pub use config::VacuumConfig;
pub use connection::{ApplianceHandle, DeviceConnection};
pub use error::CoreError;
pub use poll::{PollLoop, PollState};
pub use store::{CharacteristicSnapshot, CharacteristicStore, CharacteristicUpdate};

pub use model::{
    ApplianceSnapshot, CharacteristicKind, CharacteristicValue, ChargingState, OccupancyDetected,
    OperationalState, ServiceDescriptor, ServiceKind, StatusLowBattery,
};
