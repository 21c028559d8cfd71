// ── One-time identification logging ──
//
// Runs once, after the first successful connect. Every value is a local of
// this routine; nothing is stored and no failure reaches a caller.

use std::time::Duration;

use tracing::{info, warn};

use crate::connection::{ApplianceHandle, with_timeout};
use crate::error::CoreError;

/// Log model, live state, serial number, firmware, and raw status code.
pub(crate) async fn log_identification(handle: ApplianceHandle, timeout: Duration) {
    let model = handle.model().to_owned();

    match handle.snapshot(timeout).await {
        Ok(snap) => info!(
            %model,
            state = %snap.state,
            battery = snap.battery_level,
            fan_speed = snap.fan_speed,
            "vacuum cleaner identified"
        ),
        Err(e) => report("properties", &e),
    }

    let appliance = handle.appliance();

    match with_timeout(timeout, appliance.serial_number()).await {
        Ok(serial) => info!(%model, %serial, "serial number"),
        Err(e) => report("get_serial_number", &e),
    }

    match with_timeout(timeout, appliance.firmware_info()).await {
        Ok(fw) => info!(
            %model,
            firmware = %fw.fw_ver,
            hardware = fw.hw_ver.as_deref().unwrap_or("unknown"),
            "firmware version"
        ),
        Err(e) => report("miIO.info", &e),
    }

    match with_timeout(timeout, appliance.status()).await {
        Ok(status) => info!(
            %model,
            status_code = status.state,
            error_code = status.error_code.unwrap_or_default(),
            "raw status"
        ),
        Err(e) => report("get_status", &e),
    }
}

fn report(call: &str, cause: &CoreError) {
    let err = CoreError::DiagnosticFetch {
        call: call.to_owned(),
        reason: cause.to_string(),
    };
    warn!(error = %err, "identification incomplete");
}
