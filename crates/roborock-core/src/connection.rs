// ── Single-flight appliance connection ──
//
// Owns the lazily-resolved handle to the appliance. The cache is an explicit
// state machine so that concurrent callers during a connect share the one
// in-flight attempt instead of each opening their own:
//
//   Empty ──acquire──▶ Resolving(shared future) ──ok──▶ Resolved(handle)
//     ▲                        │ err                          │
//     └────────────────────────┴──────── invalidate ──────────┘

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use roborock_api::{Appliance, Property, Transport, VACUUM_CAPABILITY};
use secrecy::SecretString;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use crate::config::VacuumConfig;
use crate::diagnostics;
use crate::error::CoreError;
use crate::model::{ApplianceSnapshot, OperationalState};

type ConnectFuture = Shared<BoxFuture<'static, Result<ApplianceHandle, CoreError>>>;

// ── ApplianceHandle ──────────────────────────────────────────────

/// A live, verified connection to the vacuum. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ApplianceHandle {
    appliance: Arc<dyn Appliance>,
    connected_at: DateTime<Utc>,
}

impl ApplianceHandle {
    pub(crate) fn new(appliance: Arc<dyn Appliance>) -> Self {
        Self {
            appliance,
            connected_at: Utc::now(),
        }
    }

    pub fn appliance(&self) -> &dyn Appliance {
        self.appliance.as_ref()
    }

    pub fn model(&self) -> &str {
        self.appliance.model()
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Whole seconds since the handshake.
    pub fn age_secs(&self) -> i64 {
        (Utc::now() - self.connected_at).num_seconds()
    }

    /// Whether both handles wrap the same connection.
    pub fn same_connection(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.appliance), Arc::as_ptr(&other.appliance))
    }

    /// Read state, battery level, and fan speed.
    pub async fn snapshot(&self, timeout: Duration) -> Result<ApplianceSnapshot, CoreError> {
        let appliance = self.appliance();
        let (state, battery, fan_speed) = with_timeout(timeout, async {
            tokio::try_join!(
                appliance.property(Property::State),
                appliance.property(Property::BatteryLevel),
                appliance.property(Property::FanSpeed),
            )
        })
        .await?;
        ApplianceSnapshot::from_values(&state, &battery, &fan_speed)
    }

    /// Read only the operational state.
    pub async fn state(&self, timeout: Duration) -> Result<OperationalState, CoreError> {
        let raw = with_timeout(timeout, self.appliance().property(Property::State)).await?;
        Ok(OperationalState::from_value(&raw))
    }
}

/// Bound an appliance call with a caller-side timeout.
pub(crate) async fn with_timeout<T, F>(timeout: Duration, call: F) -> Result<T, CoreError>
where
    F: Future<Output = Result<T, roborock_api::Error>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result.map_err(CoreError::from),
        Err(_) => Err(CoreError::Timeout {
            timeout_secs: whole_secs(timeout),
        }),
    }
}

/// Seconds for display, rounded up so a sub-second bound never reads as 0s.
pub(crate) fn whole_secs(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}

// ── DeviceConnection ─────────────────────────────────────────────

enum CacheState {
    Empty,
    Resolving {
        generation: u64,
        future: ConnectFuture,
    },
    Resolved(ApplianceHandle),
}

struct Cache {
    state: CacheState,
    /// Bumped for every connect attempt, so a result from an attempt that
    /// was invalidated mid-flight never lands in the cache.
    generation: u64,
}

/// Lazily connects to the appliance and caches the handle.
///
/// Cheaply cloneable via `Arc<ConnectionInner>`.
#[derive(Clone)]
pub struct DeviceConnection {
    inner: Arc<ConnectionInner>,
}

struct ConnectionInner {
    transport: Arc<dyn Transport>,
    address: String,
    token: SecretString,
    timeout: Duration,
    cache: Mutex<Cache>,
    /// Set after the first successful connect; identification is logged once.
    identified: AtomicBool,
    /// Background appliance work (identification, dispatched commands).
    tasks: TaskTracker,
}

impl DeviceConnection {
    pub fn new(config: &VacuumConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                transport,
                address: config.address.clone(),
                token: config.token.clone(),
                timeout: config.call_timeout,
                cache: Mutex::new(Cache {
                    state: CacheState::Empty,
                    generation: 0,
                }),
                identified: AtomicBool::new(false),
                tasks: TaskTracker::new(),
            }),
        }
    }

    pub fn address(&self) -> &str {
        &self.inner.address
    }

    /// Tracker shared by everything this connection runs in the background.
    pub(crate) fn tasks(&self) -> &TaskTracker {
        &self.inner.tasks
    }

    /// Get a live handle.
    ///
    /// Resolves immediately from the cache when possible. Otherwise joins
    /// the in-flight connect, or starts one. A failed connect leaves the
    /// cache empty so the next call retries.
    pub async fn acquire(&self) -> Result<ApplianceHandle, CoreError> {
        let (generation, future) = {
            let mut cache = self.lock();
            match &cache.state {
                CacheState::Resolved(handle) => return Ok(handle.clone()),
                CacheState::Resolving { generation, future } => (*generation, future.clone()),
                CacheState::Empty => {
                    cache.generation += 1;
                    let generation = cache.generation;
                    let future = self.connect_future();
                    cache.state = CacheState::Resolving {
                        generation,
                        future: future.clone(),
                    };
                    (generation, future)
                }
            }
        };

        let result = future.await;
        self.settle(generation, &result);
        result
    }

    /// Drop the cached handle. An in-flight connect is abandoned: its
    /// waiters still get its result, but it is not cached.
    pub fn invalidate(&self) {
        let mut cache = self.lock();
        match &cache.state {
            CacheState::Resolved(handle) => debug!(
                address = %self.inner.address,
                age_secs = handle.age_secs(),
                "clearing appliance cache"
            ),
            CacheState::Resolving { .. } => {
                debug!(address = %self.inner.address, "abandoning appliance connect");
            }
            CacheState::Empty => {}
        }
        cache.state = CacheState::Empty;
    }

    /// Drop the cache only if it still holds `handle`.
    pub(crate) fn invalidate_handle(&self, handle: &ApplianceHandle) {
        let mut cache = self.lock();
        if let CacheState::Resolved(current) = &cache.state {
            if current.same_connection(handle) {
                debug!(
                    address = %self.inner.address,
                    age_secs = current.age_secs(),
                    "dropping failed appliance handle"
                );
                cache.state = CacheState::Empty;
            }
        }
    }

    /// The cached handle, without connecting.
    pub fn cached(&self) -> Option<ApplianceHandle> {
        match &self.lock().state {
            CacheState::Resolved(handle) => Some(handle.clone()),
            CacheState::Empty | CacheState::Resolving { .. } => None,
        }
    }

    pub fn is_resolving(&self) -> bool {
        matches!(self.lock().state, CacheState::Resolving { .. })
    }

    /// Acquire and read a snapshot. A read failure drops the handle so the
    /// next caller reconnects.
    pub async fn read_snapshot(&self) -> Result<ApplianceSnapshot, CoreError> {
        let handle = self.acquire().await?;
        handle
            .snapshot(self.inner.timeout)
            .await
            .inspect_err(|_| self.invalidate_handle(&handle))
    }

    /// Acquire and read only the operational state.
    pub async fn read_state(&self) -> Result<(ApplianceHandle, OperationalState), CoreError> {
        let handle = self.acquire().await?;
        match handle.state(self.inner.timeout).await {
            Ok(state) => Ok((handle, state)),
            Err(e) => {
                self.invalidate_handle(&handle);
                Err(e)
            }
        }
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn connect_future(&self) -> ConnectFuture {
        let inner = Arc::clone(&self.inner);
        async move { inner.connect().await }.boxed().shared()
    }

    fn settle(&self, generation: u64, result: &Result<ApplianceHandle, CoreError>) {
        let mut cache = self.lock();
        let CacheState::Resolving {
            generation: current,
            ..
        } = cache.state
        else {
            return;
        };
        if current != generation {
            return;
        }
        cache.state = match result {
            Ok(handle) => CacheState::Resolved(handle.clone()),
            Err(_) => CacheState::Empty,
        };
    }

    fn lock(&self) -> MutexGuard<'_, Cache> {
        self.inner
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl ConnectionInner {
    async fn connect(&self) -> Result<ApplianceHandle, CoreError> {
        let address = self.address.as_str();
        if !self.identified.load(Ordering::Acquire) {
            debug!(address, "discovering vacuum cleaner");
        }

        let appliance = match tokio::time::timeout(
            self.timeout,
            self.transport.connect(address, &self.token),
        )
        .await
        {
            Ok(Ok(appliance)) => appliance,
            Ok(Err(e)) => {
                debug!(address, error = %e, "no correct answer from appliance");
                return Err(CoreError::connect_failed(address, e));
            }
            Err(_) => {
                debug!(address, "appliance handshake timed out");
                return Err(CoreError::DeviceUnreachable {
                    address: address.to_owned(),
                    reason: format!("no answer within {}s", whole_secs(self.timeout)),
                });
            }
        };

        if !appliance.matches_capability(VACUUM_CAPABILITY) {
            info!(address, model = appliance.model(), "appliance is not a vacuum cleaner");
            return Err(CoreError::UnexpectedApplianceType {
                address: address.to_owned(),
                model: appliance.model().to_owned(),
            });
        }

        let handle = ApplianceHandle::new(appliance);
        if !self.identified.swap(true, Ordering::AcqRel) {
            info!(address, "connected to vacuum cleaner");
            self.tasks
                .spawn(diagnostics::log_identification(handle.clone(), self.timeout));
        }
        Ok(handle)
    }
}
