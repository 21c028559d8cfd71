// ── Accessory facade ──
//
// What the home-automation host talks to. Owns the connection, the
// characteristic store, the command dispatcher, and the poll loop, and
// wires host get/set requests through them.

use std::sync::{Arc, Mutex, PoisonError};

use roborock_api::Transport;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::command::CommandDispatcher;
use crate::config::VacuumConfig;
use crate::connection::DeviceConnection;
use crate::error::CoreError;
use crate::mapping;
use crate::model::{CharacteristicKind, CharacteristicValue, ServiceDescriptor, ServiceKind};
use crate::poll::{PollLoop, PollState};
use crate::store::{CharacteristicSnapshot, CharacteristicStore, CharacteristicUpdate};

pub const MANUFACTURER: &str = "Xiaomi";
pub const MODEL: &str = "Roborock";

// ── Vacuum ───────────────────────────────────────────────────────

/// One vacuum exposed as a host accessory.
///
/// Cheaply cloneable via `Arc<VacuumInner>`. Construction validates the
/// config and builds the service list but does no I/O; call
/// [`start()`](Self::start) to connect and begin polling.
#[derive(Clone)]
pub struct Vacuum {
    inner: Arc<VacuumInner>,
}

struct VacuumInner {
    config: VacuumConfig,
    services: Vec<ServiceDescriptor>,
    connection: DeviceConnection,
    store: Arc<CharacteristicStore>,
    dispatcher: CommandDispatcher,
    poll: PollLoop,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Vacuum {
    pub fn new(config: VacuumConfig, transport: Arc<dyn Transport>) -> Result<Self, CoreError> {
        config.validate()?;

        let services = build_services(&config);
        let kinds = services
            .iter()
            .flat_map(|service| service.characteristics.iter().copied());
        let store = Arc::new(CharacteristicStore::new(kinds));

        let connection = DeviceConnection::new(&config, transport);
        let dispatcher =
            CommandDispatcher::new(connection.clone(), Arc::clone(&store), config.call_timeout);
        let poll = PollLoop::new(connection.clone(), Arc::clone(&store), config.poll_interval);

        Ok(Self {
            inner: Arc::new(VacuumInner {
                config,
                services,
                connection,
                store,
                dispatcher,
                poll,
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn config(&self) -> &VacuumConfig {
        &self.inner.config
    }

    /// Registered services. Fixed at construction.
    pub fn services(&self) -> &[ServiceDescriptor] {
        &self.inner.services
    }

    pub fn connection(&self) -> &DeviceConnection {
        &self.inner.connection
    }

    pub fn store(&self) -> &Arc<CharacteristicStore> {
        &self.inner.store
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Connect eagerly in the background and start the poll loop.
    /// Calling it again while running does nothing.
    pub fn start(&self) {
        let mut handles = self.lock_handles();
        if !handles.is_empty() || self.inner.cancel.is_cancelled() {
            return;
        }

        let connection = self.inner.connection.clone();
        handles.push(tokio::spawn(async move {
            if let Err(e) = connection.acquire().await {
                debug!(error = %e, "initial connect failed, waiting for next poll");
            }
        }));

        let poll = self.inner.poll.clone();
        handles.push(tokio::spawn(poll.run(self.inner.cancel.clone())));

        info!(
            name = %self.inner.config.name,
            address = %self.inner.config.address,
            interval_secs = self.inner.poll.interval().as_secs(),
            "vacuum accessory started"
        );
    }

    /// Stop polling and wait for background work, dispatched calls included.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let handles: Vec<_> = self.lock_handles().drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
        self.inner.dispatcher.flush().await;
        debug!("vacuum accessory stopped");
    }

    // ── Host requests ────────────────────────────────────────────────

    /// Read one characteristic from the appliance and record it.
    pub async fn get(&self, kind: CharacteristicKind) -> Result<CharacteristicValue, CoreError> {
        self.ensure_exposed(kind)?;

        let snap = self.inner.connection.read_snapshot().await?;
        let value = mapping::map_characteristic(kind, &snap);
        self.inner.store.update_value(kind, value);
        debug!(%kind, %value, "characteristic read");
        Ok(value)
    }

    /// Apply a host write. Returns the value that was actually sent, which
    /// differs from `value` only for a quantized rotation speed.
    pub async fn set(
        &self,
        kind: CharacteristicKind,
        value: CharacteristicValue,
    ) -> Result<CharacteristicValue, CoreError> {
        self.ensure_exposed(kind)?;
        let invalid = || CoreError::InvalidValue { kind, value };
        let dispatcher = &self.inner.dispatcher;

        match kind {
            CharacteristicKind::On => {
                let on = value.as_bool().ok_or_else(invalid)?;
                dispatcher.set_running(on).await?;
                Ok(value)
            }
            CharacteristicKind::RotationSpeed => {
                let percent = value
                    .as_percent()
                    .filter(|p| *p <= 100)
                    .ok_or_else(invalid)?;
                let speed = dispatcher.set_speed(percent).await?;
                Ok(CharacteristicValue::Percent(speed))
            }
            CharacteristicKind::PauseOn => {
                let paused = value.as_bool().ok_or_else(invalid)?;
                dispatcher.set_paused(paused).await?;
                Ok(value)
            }
            CharacteristicKind::BatteryLevel
            | CharacteristicKind::ChargingState
            | CharacteristicKind::StatusLowBattery
            | CharacteristicKind::OccupancyDetected => Err(CoreError::ReadOnly { kind }),
        }
    }

    /// Make the appliance play its locate sound. Returns immediately.
    pub fn identify(&self) {
        debug!("identify requested");
        self.inner.dispatcher.locate();
    }

    /// Run one reconciliation pass now, outside the poll schedule.
    pub async fn reconcile(&self) -> Result<(), CoreError> {
        self.inner.poll.reconcile().await
    }

    /// Wait for every background appliance call to finish, identification
    /// included.
    pub async fn flush(&self) {
        self.inner.dispatcher.flush().await;
    }

    // ── State observation ────────────────────────────────────────────

    /// Last recorded value, without touching the appliance.
    pub fn value(&self, kind: CharacteristicKind) -> Option<CharacteristicValue> {
        self.inner.store.get(kind)
    }

    pub fn snapshot(&self) -> CharacteristicSnapshot {
        self.inner.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<CharacteristicSnapshot> {
        self.inner.store.subscribe()
    }

    pub fn updates(&self) -> broadcast::Receiver<CharacteristicUpdate> {
        self.inner.store.updates()
    }

    pub fn poll_state(&self) -> PollState {
        self.inner.poll.state()
    }

    pub fn poll_states(&self) -> watch::Receiver<PollState> {
        self.inner.poll.subscribe()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn ensure_exposed(&self, kind: CharacteristicKind) -> Result<(), CoreError> {
        if self.inner.store.contains(kind) {
            Ok(())
        } else {
            Err(CoreError::NotExposed { kind })
        }
    }

    fn lock_handles(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.inner
            .task_handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn build_services(config: &VacuumConfig) -> Vec<ServiceDescriptor> {
    let name = &config.name;
    let mut services = vec![
        ServiceDescriptor::new(ServiceKind::AccessoryInformation, name.as_str())
            .with_metadata("Manufacturer", MANUFACTURER)
            .with_metadata("Model", MODEL),
        ServiceDescriptor::new(ServiceKind::Fan, name.as_str()),
        ServiceDescriptor::new(ServiceKind::Battery, format!("{name} Battery")),
    ];
    if config.pause {
        services.push(ServiceDescriptor::new(
            ServiceKind::PauseSwitch,
            format!("{name} Pause"),
        ));
    }
    if config.dock {
        services.push(ServiceDescriptor::new(
            ServiceKind::DockSensor,
            format!("{name} Dock"),
        ));
    }
    services
}
