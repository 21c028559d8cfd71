// ── Reconciliation loop ──
//
// Every tick drops the cached handle, reconnects, reads a fresh snapshot,
// and pushes every exposed characteristic. A failed tick changes nothing;
// the next one tries again. No backoff, no jitter.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::connection::DeviceConnection;
use crate::error::CoreError;
use crate::mapping;
use crate::store::CharacteristicStore;

/// Observable state of the poll loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PollState {
    #[default]
    Idle,
    Reconciling,
}

/// Periodically re-reads the appliance into the characteristic store.
///
/// Cheaply cloneable; clones share the observable state.
#[derive(Clone)]
pub struct PollLoop {
    connection: DeviceConnection,
    store: Arc<CharacteristicStore>,
    state: Arc<watch::Sender<PollState>>,
    interval: Duration,
}

impl PollLoop {
    pub fn new(
        connection: DeviceConnection,
        store: Arc<CharacteristicStore>,
        interval: Duration,
    ) -> Self {
        let (state, _) = watch::channel(PollState::Idle);
        Self {
            connection,
            store,
            state: Arc::new(state),
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> PollState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.state.subscribe()
    }

    /// One reconciliation pass. Always ends back in [`PollState::Idle`].
    pub async fn reconcile(&self) -> Result<(), CoreError> {
        self.state.send_replace(PollState::Reconciling);
        let result = self.refresh().await;
        self.state.send_replace(PollState::Idle);
        result
    }

    /// Tick every `interval` until `cancel` fires. The first pass happens one
    /// interval after the call; failures are logged at debug level only.
    pub async fn run(self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await; // consume the immediate first tick

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = interval.tick() => {
                    if let Err(e) = self.reconcile().await {
                        debug!(error = %e, "no vacuum cleaner is discovered");
                    }
                }
            }
        }
        debug!("poll loop stopped");
    }

    async fn refresh(&self) -> Result<(), CoreError> {
        self.connection.invalidate();
        let snap = self.connection.read_snapshot().await?;

        let kinds = self.store.kinds();
        for (kind, value) in mapping::map_all(kinds, &snap) {
            self.store.update_value(kind, value);
        }
        debug!(
            state = %snap.state,
            battery = snap.battery_level,
            fan_speed = snap.fan_speed,
            "reconciled appliance state"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::VacuumConfig;
    use crate::model::{CharacteristicKind, CharacteristicValue};
    use roborock_api::mock::MockTransport;
    use secrecy::SecretString;

    fn poll_loop(transport: &MockTransport, interval: Duration) -> PollLoop {
        let config = VacuumConfig::new("192.168.1.50", SecretString::from("token".to_string()));
        let connection = DeviceConnection::new(&config, Arc::new(transport.clone()));
        let store = Arc::new(CharacteristicStore::new([
            CharacteristicKind::On,
            CharacteristicKind::BatteryLevel,
        ]));
        PollLoop::new(connection, store, interval)
    }

    #[tokio::test]
    async fn reconcile_pushes_exposed_values() {
        let transport = MockTransport::new();
        transport.set_state("cleaning");
        transport.set_battery_level(42);
        let poll = poll_loop(&transport, Duration::from_secs(30));

        poll.reconcile().await.unwrap();

        assert_eq!(
            poll.store.get(CharacteristicKind::On),
            Some(CharacteristicValue::Bool(true))
        );
        assert_eq!(
            poll.store.get(CharacteristicKind::BatteryLevel),
            Some(CharacteristicValue::Percent(42))
        );
        assert!(!poll.store.contains(CharacteristicKind::RotationSpeed));
        assert_eq!(poll.state(), PollState::Idle);
    }

    #[tokio::test]
    async fn reconcile_always_reconnects() {
        let transport = MockTransport::new();
        let poll = poll_loop(&transport, Duration::from_secs(30));

        poll.reconcile().await.unwrap();
        poll.reconcile().await.unwrap();

        assert_eq!(transport.connect_count(), 2);
    }

    #[tokio::test]
    async fn failed_reconcile_keeps_values_and_returns_to_idle() {
        let transport = MockTransport::new();
        transport.set_battery_level(80);
        let poll = poll_loop(&transport, Duration::from_secs(30));
        poll.reconcile().await.unwrap();
        let version = poll.store.version();

        transport.set_reachable(false);
        let err = poll.reconcile().await.unwrap_err();

        assert!(err.is_unreachable());
        assert_eq!(poll.state(), PollState::Idle);
        assert_eq!(poll.store.version(), version);
        assert_eq!(
            poll.store.get(CharacteristicKind::BatteryLevel),
            Some(CharacteristicValue::Percent(80))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn run_ticks_until_cancelled() {
        let transport = MockTransport::new();
        let poll = poll_loop(&transport, Duration::from_secs(30));
        let cancel = CancellationToken::new();
        let task = tokio::spawn(poll.clone().run(cancel.clone()));

        // Nothing happens before the first interval elapses.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(transport.connect_count(), 0);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.connect_count(), 2);

        cancel.cancel();
        task.await.unwrap();

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(transport.connect_count(), 2);
    }
}
