// ── Core error types ──
//
// User-facing errors from roborock-core. These are NOT transport-specific --
// the host never sees handshake or RPC envelopes directly. The
// `From<roborock_api::Error>` impl translates transport-layer errors into
// domain-appropriate variants.
//
// `Clone` because one connect result is shared by every caller that was
// waiting on it.

use thiserror::Error;

use crate::model::{CharacteristicKind, CharacteristicValue};

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Reachability ─────────────────────────────────────────────────
    #[error("No vacuum cleaner is discovered at {address}: {reason}")]
    DeviceUnreachable { address: String, reason: String },

    #[error("{address} is not a vacuum cleaner (model {model})")]
    UnexpectedApplianceType { address: String, model: String },

    #[error("Appliance call timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Appliance replies ────────────────────────────────────────────
    #[error("Appliance call {operation} failed: {message}")]
    Appliance { operation: String, message: String },

    #[error("Unexpected value for {property}: {value}")]
    UnexpectedResponse { property: String, value: String },

    /// One-time identification call failed. Logged, never returned to the host.
    #[error("Diagnostic fetch {call} failed: {reason}")]
    DiagnosticFetch { call: String, reason: String },

    // ── Host requests ────────────────────────────────────────────────
    #[error("{kind} is not exposed by this accessory")]
    NotExposed { kind: CharacteristicKind },

    #[error("{kind} is read-only")]
    ReadOnly { kind: CharacteristicKind },

    #[error("Invalid value for {kind}: {value}")]
    InvalidValue {
        kind: CharacteristicKind,
        value: CharacteristicValue,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Whether the failure means "no usable appliance right now". The host
    /// sees these as a failed get/set; the poll loop just waits for the next
    /// tick.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            Self::DeviceUnreachable { .. }
                | Self::UnexpectedApplianceType { .. }
                | Self::Timeout { .. }
        )
    }

    /// Classify a failed connect or discovery. Whatever the transport
    /// reported, the appliance is unreachable.
    pub(crate) fn connect_failed(address: &str, err: roborock_api::Error) -> Self {
        let reason = match err {
            roborock_api::Error::Connect { reason, .. } => reason,
            roborock_api::Error::InvalidToken { .. } => "token rejected during handshake".into(),
            other => other.to_string(),
        };
        Self::DeviceUnreachable {
            address: address.to_owned(),
            reason,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<roborock_api::Error> for CoreError {
    fn from(err: roborock_api::Error) -> Self {
        match err {
            roborock_api::Error::Connect { address, reason } => {
                CoreError::DeviceUnreachable { address, reason }
            }
            roborock_api::Error::InvalidToken { address } => CoreError::DeviceUnreachable {
                address,
                reason: "token rejected during handshake".into(),
            },
            roborock_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            roborock_api::Error::Call { method, reason } => CoreError::Appliance {
                operation: method,
                message: reason,
            },
            roborock_api::Error::MissingProperty(property) => CoreError::UnexpectedResponse {
                property: property.to_string(),
                value: "<missing>".into(),
            },
            roborock_api::Error::Deserialization {
                method,
                message,
                body: _,
            } => CoreError::UnexpectedResponse {
                property: method,
                value: message,
            },
        }
    }
}
