// roborock-api: Transport seam for a single Roborock vacuum (connect, properties, RPC)

pub mod appliance;
pub mod error;
pub mod models;

#[cfg(feature = "mock")]
pub mod mock;

pub use appliance::{Appliance, Property, Transport, VACUUM_CAPABILITY};
pub use error::Error;
pub use models::{FirmwareInfo, SerialNumber, StatusReport};
