// ── Reactive characteristic store ──
//
// Concurrent storage for the exposed characteristic set, with push-based
// change notification: a `watch` snapshot for "latest state" consumers and a
// `broadcast` stream of individual updates for hosts that forward each
// `updateValue` as it happens.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{broadcast, watch};
use tracing::trace;

use crate::model::{CharacteristicKind, CharacteristicValue};

const UPDATE_CHANNEL_SIZE: usize = 64;

/// Point-in-time copy of every exposed value.
pub type CharacteristicSnapshot = Arc<BTreeMap<CharacteristicKind, CharacteristicValue>>;

/// One pushed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicUpdate {
    pub kind: CharacteristicKind,
    pub value: CharacteristicValue,
}

/// The fixed set of characteristics one accessory exposes.
///
/// Keys are fixed at construction; updates for kinds outside the set are
/// ignored, so an optimistic push for a disabled service is harmless. Every
/// accepted update bumps a version counter and rebuilds the snapshot, even if
/// the value did not change, matching a host's `updateValue` semantics.
pub struct CharacteristicStore {
    values: DashMap<CharacteristicKind, CharacteristicValue>,

    /// Version counter, bumped on every accepted update.
    version: watch::Sender<u64>,

    /// Full snapshot, rebuilt on update for cheap subscription.
    snapshot: watch::Sender<CharacteristicSnapshot>,

    updates: broadcast::Sender<CharacteristicUpdate>,
}

impl CharacteristicStore {
    /// Seed the store with the initial value of each kind.
    pub fn new(kinds: impl IntoIterator<Item = CharacteristicKind>) -> Self {
        let values: DashMap<_, _> = kinds
            .into_iter()
            .map(|kind| (kind, kind.initial_value()))
            .collect();
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(BTreeMap::new()));
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_SIZE);

        let store = Self {
            values,
            version,
            snapshot,
            updates,
        };
        store.rebuild_snapshot();
        store
    }

    /// Push a value. Returns `false` if the kind is not exposed.
    pub fn update_value(&self, kind: CharacteristicKind, value: CharacteristicValue) -> bool {
        let Some(mut slot) = self.values.get_mut(&kind) else {
            trace!(%kind, "ignoring update for unexposed characteristic");
            return false;
        };
        *slot = value;
        drop(slot);

        self.rebuild_snapshot();
        self.bump_version();
        // No receivers is fine; the snapshot still holds the value.
        let _ = self.updates.send(CharacteristicUpdate { kind, value });
        true
    }

    pub fn get(&self, kind: CharacteristicKind) -> Option<CharacteristicValue> {
        self.values.get(&kind).map(|r| *r.value())
    }

    pub fn contains(&self, kind: CharacteristicKind) -> bool {
        self.values.contains_key(&kind)
    }

    /// Exposed kinds in declaration order.
    pub fn kinds(&self) -> Vec<CharacteristicKind> {
        self.snapshot.borrow().keys().copied().collect()
    }

    /// Get the current snapshot (cheap `Arc` clone).
    pub fn snapshot(&self) -> CharacteristicSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CharacteristicSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn updates(&self) -> broadcast::Receiver<CharacteristicUpdate> {
        self.updates.subscribe()
    }

    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn rebuild_snapshot(&self) {
        let values: BTreeMap<_, _> = self.values.iter().map(|r| (*r.key(), *r.value())).collect();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }

    fn bump_version(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::ChargingState;

    fn fan_and_battery() -> CharacteristicStore {
        CharacteristicStore::new([
            CharacteristicKind::On,
            CharacteristicKind::RotationSpeed,
            CharacteristicKind::BatteryLevel,
            CharacteristicKind::ChargingState,
            CharacteristicKind::StatusLowBattery,
        ])
    }

    #[test]
    fn seeded_with_initial_values() {
        let store = fan_and_battery();
        assert_eq!(store.len(), 5);
        assert_eq!(
            store.get(CharacteristicKind::On),
            Some(CharacteristicValue::Bool(false))
        );
        assert_eq!(
            store.get(CharacteristicKind::ChargingState),
            Some(CharacteristicValue::Charging(ChargingState::NotCharging))
        );
        assert_eq!(store.snapshot().len(), 5);
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn update_of_exposed_kind_is_stored() {
        let store = fan_and_battery();
        assert!(store.update_value(
            CharacteristicKind::RotationSpeed,
            CharacteristicValue::Percent(77)
        ));
        assert_eq!(
            store.get(CharacteristicKind::RotationSpeed),
            Some(CharacteristicValue::Percent(77))
        );
        assert_eq!(
            store.snapshot().get(&CharacteristicKind::RotationSpeed),
            Some(&CharacteristicValue::Percent(77))
        );
        assert_eq!(store.version(), 1);
    }

    #[test]
    fn update_of_unexposed_kind_is_ignored() {
        let store = fan_and_battery();
        assert!(!store.update_value(
            CharacteristicKind::OccupancyDetected,
            CharacteristicValue::Bool(true)
        ));
        assert!(!store.contains(CharacteristicKind::OccupancyDetected));
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn same_value_still_bumps_version() {
        let store = fan_and_battery();
        store.update_value(CharacteristicKind::On, CharacteristicValue::Bool(false));
        store.update_value(CharacteristicKind::On, CharacteristicValue::Bool(false));
        assert_eq!(store.version(), 2);
    }

    #[test]
    fn kinds_are_ordered() {
        let store = CharacteristicStore::new([
            CharacteristicKind::OccupancyDetected,
            CharacteristicKind::On,
        ]);
        assert_eq!(
            store.kinds(),
            vec![
                CharacteristicKind::On,
                CharacteristicKind::OccupancyDetected
            ]
        );
    }

    #[tokio::test]
    async fn subscribers_see_pushed_values() {
        let store = fan_and_battery();
        let mut snapshots = store.subscribe();
        let mut updates = store.updates();

        store.update_value(CharacteristicKind::BatteryLevel, CharacteristicValue::Percent(15));

        snapshots.changed().await.unwrap();
        assert_eq!(
            snapshots.borrow().get(&CharacteristicKind::BatteryLevel),
            Some(&CharacteristicValue::Percent(15))
        );
        assert_eq!(
            updates.recv().await.unwrap(),
            CharacteristicUpdate {
                kind: CharacteristicKind::BatteryLevel,
                value: CharacteristicValue::Percent(15),
            }
        );
    }
}
