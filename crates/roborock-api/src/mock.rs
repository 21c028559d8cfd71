//! Scripted in-memory appliance for tests.
//!
//! [`MockTransport`] hands out [`Appliance`] handles that all share one
//! mutable state, so a test can flip reachability, change the reported
//! state, or inspect the calls that reached the "device" at any time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::{Value, json};

use crate::appliance::{Appliance, Property, Transport, VACUUM_CAPABILITY};
use crate::error::Error;

/// A call that reached the mock appliance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    ActivateCleaning,
    ActivateCharging,
    Pause,
    ChangeFanSpeed(u8),
    Find,
    Rpc(String),
}

#[derive(Debug)]
struct MockState {
    model: String,
    capability: String,
    reachable: bool,
    connect_delay: Duration,
    connects: usize,
    properties: HashMap<Property, Value>,
    rpc: HashMap<String, Value>,
    calls: Vec<MockCall>,
}

impl Default for MockState {
    fn default() -> Self {
        let properties = HashMap::from([
            (Property::State, json!("charging")),
            (Property::FanSpeed, json!(60)),
            (Property::BatteryLevel, json!(100)),
        ]);
        let rpc = HashMap::from([
            (
                "get_serial_number".to_owned(),
                json!([{ "serial_number": "R0018S91800123" }]),
            ),
            (
                "miIO.info".to_owned(),
                json!({ "fw_ver": "3.3.9_003194", "hw_ver": "Linux", "model": "roborock.vacuum.s5" }),
            ),
            (
                "get_status".to_owned(),
                json!([{ "state": 8, "battery": 100, "fan_power": 60 }]),
            ),
        ]);

        Self {
            model: "roborock.vacuum.s5".into(),
            capability: VACUUM_CAPABILITY.into(),
            reachable: true,
            connect_delay: Duration::ZERO,
            connects: 0,
            properties,
            rpc,
            calls: Vec::new(),
        }
    }
}

/// Transport double. Cheap to clone; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// A reachable, docked vacuum at 100% battery.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend to be a different kind of device.
    pub fn with_model(self, model: &str, capability: &str) -> Self {
        {
            let mut state = self.lock();
            model.clone_into(&mut state.model);
            capability.clone_into(&mut state.capability);
        }
        self
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.lock().reachable = reachable;
    }

    /// Delay every handshake; useful to overlap concurrent connects.
    pub fn set_connect_delay(&self, delay: Duration) {
        self.lock().connect_delay = delay;
    }

    pub fn set_state(&self, state: &str) {
        self.set_property(Property::State, json!(state));
    }

    pub fn set_battery_level(&self, level: u8) {
        self.set_property(Property::BatteryLevel, json!(level));
    }

    pub fn set_fan_speed(&self, speed: u8) {
        self.set_property(Property::FanSpeed, json!(speed));
    }

    pub fn set_property(&self, property: Property, value: Value) {
        self.lock().properties.insert(property, value);
    }

    pub fn remove_property(&self, property: Property) {
        self.lock().properties.remove(&property);
    }

    /// Script the reply of a named remote procedure.
    pub fn set_rpc_response(&self, method: &str, reply: Value) {
        self.lock().rpc.insert(method.to_owned(), reply);
    }

    pub fn remove_rpc_response(&self, method: &str) {
        self.lock().rpc.remove(method);
    }

    /// Number of handshakes attempted so far, successful or not.
    pub fn connect_count(&self) -> usize {
        self.lock().connects
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(
        &self,
        address: &str,
        _token: &SecretString,
    ) -> Result<Arc<dyn Appliance>, Error> {
        let (delay, reachable, model, capability) = {
            let mut state = self.lock();
            state.connects += 1;
            (
                state.connect_delay,
                state.reachable,
                state.model.clone(),
                state.capability.clone(),
            )
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if !reachable {
            return Err(Error::Connect {
                address: address.to_owned(),
                reason: "no reply to handshake".into(),
            });
        }

        Ok(Arc::new(MockAppliance {
            model,
            capability,
            state: Arc::clone(&self.state),
        }))
    }
}

#[derive(Debug)]
struct MockAppliance {
    model: String,
    capability: String,
    state: Arc<Mutex<MockState>>,
}

impl MockAppliance {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record an action, failing if the appliance dropped off the network.
    fn record(&self, method: &str, call: MockCall) -> Result<(), Error> {
        let mut state = self.lock();
        if !state.reachable {
            return Err(Error::Call {
                method: method.to_owned(),
                reason: "appliance not responding".into(),
            });
        }
        state.calls.push(call);
        Ok(())
    }
}

#[async_trait]
impl Appliance for MockAppliance {
    fn model(&self) -> &str {
        &self.model
    }

    fn matches_capability(&self, capability: &str) -> bool {
        self.capability == capability
    }

    async fn property(&self, property: Property) -> Result<Value, Error> {
        let state = self.lock();
        if !state.reachable {
            return Err(Error::Call {
                method: property.as_str().to_owned(),
                reason: "appliance not responding".into(),
            });
        }
        state
            .properties
            .get(&property)
            .cloned()
            .ok_or(Error::MissingProperty(property))
    }

    async fn call(&self, method: &str, _params: Vec<Value>) -> Result<Value, Error> {
        self.record(method, MockCall::Rpc(method.to_owned()))?;
        self.lock()
            .rpc
            .get(method)
            .cloned()
            .ok_or_else(|| Error::Call {
                method: method.to_owned(),
                reason: "unknown method".into(),
            })
    }

    async fn activate_cleaning(&self) -> Result<(), Error> {
        self.record("app_start", MockCall::ActivateCleaning)
    }

    async fn activate_charging(&self) -> Result<(), Error> {
        self.record("app_charge", MockCall::ActivateCharging)
    }

    async fn pause(&self) -> Result<(), Error> {
        self.record("app_pause", MockCall::Pause)
    }

    async fn change_fan_speed(&self, speed: u8) -> Result<(), Error> {
        self.record("set_custom_mode", MockCall::ChangeFanSpeed(speed))
    }

    async fn find(&self) -> Result<(), Error> {
        self.record("find_me", MockCall::Find)
    }
}
