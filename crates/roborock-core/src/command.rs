// ── Command dispatch ──
//
// Host set-requests become appliance calls here. Every operation first
// acquires a handle; if that fails the caller gets the error and nothing is
// sent. The call itself is fire-and-forget: it runs on a tracked background
// task bounded by the call timeout and its outcome is only logged.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use roborock_api::Appliance;
use strum::Display;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::connection::{ApplianceHandle, DeviceConnection, with_timeout};
use crate::error::CoreError;
use crate::model::{CharacteristicKind, CharacteristicValue, OccupancyDetected, OperationalState};
use crate::store::CharacteristicStore;

// ── Fan speed tiers ──────────────────────────────────────────────

/// Discrete suction levels the appliance accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[strum(serialize_all = "lowercase")]
pub enum FanSpeedTier {
    Off,
    Quiet,
    Balanced,
    Turbo,
    Max,
}

impl FanSpeedTier {
    pub const ALL: [Self; 5] = [Self::Off, Self::Quiet, Self::Balanced, Self::Turbo, Self::Max];

    /// Percentage sent to the appliance for this tier.
    pub fn percent(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::Quiet => 38,
            Self::Balanced => 60,
            Self::Turbo => 77,
            Self::Max => 90,
        }
    }

    /// The lowest tier at or above `percent`; anything above the top tier
    /// clamps to [`Max`](Self::Max).
    pub fn quantize(percent: u8) -> Self {
        Self::ALL
            .into_iter()
            .find(|tier| tier.percent() >= percent)
            .unwrap_or(Self::Max)
    }
}

// ── Appliance commands ───────────────────────────────────────────

/// One outbound appliance action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplianceCommand {
    StartCleaning,
    ReturnToDock,
    Pause,
    ChangeFanSpeed(u8),
    Find,
}

impl ApplianceCommand {
    async fn send(self, appliance: &dyn Appliance) -> Result<(), roborock_api::Error> {
        match self {
            Self::StartCleaning => appliance.activate_cleaning().await,
            Self::ReturnToDock => appliance.activate_charging().await,
            Self::Pause => appliance.pause().await,
            Self::ChangeFanSpeed(speed) => appliance.change_fan_speed(speed).await,
            Self::Find => appliance.find().await,
        }
    }
}

impl fmt::Display for ApplianceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartCleaning => f.write_str("start cleaning"),
            Self::ReturnToDock => f.write_str("return to dock"),
            Self::Pause => f.write_str("pause"),
            Self::ChangeFanSpeed(speed) => write!(f, "change fan speed to {speed}"),
            Self::Find => f.write_str("find"),
        }
    }
}

/// Outcome of a state-guarded request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A command was handed to the appliance.
    Sent,
    /// The current state made the request a no-op.
    Skipped,
}

// ── CommandDispatcher ────────────────────────────────────────────

/// Routes host set-requests to appliance calls.
#[derive(Clone)]
pub struct CommandDispatcher {
    connection: DeviceConnection,
    store: Arc<CharacteristicStore>,
    tracker: TaskTracker,
    timeout: Duration,
}

impl CommandDispatcher {
    pub fn new(
        connection: DeviceConnection,
        store: Arc<CharacteristicStore>,
        timeout: Duration,
    ) -> Self {
        let tracker = connection.tasks().clone();
        Self {
            connection,
            store,
            tracker,
            timeout,
        }
    }

    /// Start cleaning, or send the appliance back to its dock.
    ///
    /// Starting also marks the dock as empty right away, ahead of the next
    /// poll. The return-to-dock call is known to be ignored by some firmware
    /// when repeated; it is not retried.
    pub async fn set_running(&self, on: bool) -> Result<Dispatch, CoreError> {
        let handle = self.connection.acquire().await?;
        if on {
            self.dispatch(handle, ApplianceCommand::StartCleaning);
            self.store.update_value(
                CharacteristicKind::OccupancyDetected,
                CharacteristicValue::Occupancy(OccupancyDetected::NotDetected),
            );
        } else {
            self.dispatch(handle, ApplianceCommand::ReturnToDock);
        }
        Ok(Dispatch::Sent)
    }

    /// Snap `percent` to a tier, send it, and publish the tier as the new
    /// rotation speed. Returns the percentage actually sent.
    pub async fn set_speed(&self, percent: u8) -> Result<u8, CoreError> {
        let handle = self.connection.acquire().await?;
        let tier = FanSpeedTier::quantize(percent);
        let speed = tier.percent();
        debug!(requested = percent, %tier, speed, "quantized fan speed");

        self.dispatch(handle, ApplianceCommand::ChangeFanSpeed(speed));
        self.store.update_value(
            CharacteristicKind::RotationSpeed,
            CharacteristicValue::Percent(speed),
        );
        Ok(speed)
    }

    /// Pause or resume, depending on what the appliance is doing right now.
    ///
    /// Pausing only applies while cleaning, spot-cleaning, or returning, and
    /// drops the cached handle afterwards. Resuming only applies while
    /// paused or waiting. Anything else is a successful no-op.
    pub async fn set_paused(&self, paused: bool) -> Result<Dispatch, CoreError> {
        let (handle, state) = self.connection.read_state().await?;

        let command = if paused {
            can_pause(&state).then_some(ApplianceCommand::Pause)
        } else {
            can_resume(&state).then_some(ApplianceCommand::StartCleaning)
        };

        let Some(command) = command else {
            debug!(%state, paused, "pause request does not apply in current state");
            return Ok(Dispatch::Skipped);
        };

        self.dispatch(handle, command);
        if paused {
            self.connection.invalidate();
        }
        Ok(Dispatch::Sent)
    }

    /// Play the locate sound. Returns immediately; connecting and the call
    /// both happen in the background.
    pub fn locate(&self) {
        let connection = self.connection.clone();
        let timeout = self.timeout;
        self.tracker.spawn(async move {
            match connection.acquire().await {
                Ok(handle) => send_logged(&handle, ApplianceCommand::Find, timeout).await,
                Err(e) => warn!(error = %e, "cannot locate vacuum cleaner"),
            }
        });
    }

    /// Number of background calls still running, identification included.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait for every background call to finish, identification included.
    pub async fn flush(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    fn dispatch(&self, handle: ApplianceHandle, command: ApplianceCommand) {
        let timeout = self.timeout;
        self.tracker
            .spawn(async move { send_logged(&handle, command, timeout).await });
    }
}

fn can_pause(state: &OperationalState) -> bool {
    matches!(
        state,
        OperationalState::Cleaning | OperationalState::Returning | OperationalState::SpotCleaning
    )
}

fn can_resume(state: &OperationalState) -> bool {
    matches!(state, OperationalState::Paused | OperationalState::Waiting)
}

async fn send_logged(handle: &ApplianceHandle, command: ApplianceCommand, timeout: Duration) {
    match with_timeout(timeout, command.send(handle.appliance())).await {
        Ok(()) => debug!(%command, "appliance accepted command"),
        Err(e) => warn!(%command, error = %e, "appliance command failed"),
    }
}
