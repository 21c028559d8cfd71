use thiserror::Error;

use crate::appliance::Property;

/// Top-level error type for the `roborock-api` crate.
///
/// Covers every failure a transport can report while discovering the
/// appliance or talking to it. `roborock-core` maps these into the
/// user-facing taxonomy (unreachable, wrong appliance type, timeout).
#[derive(Debug, Error)]
pub enum Error {
    // ── Discovery ───────────────────────────────────────────────────
    /// Handshake or discovery against the appliance failed.
    #[error("Cannot connect to appliance at {address}: {reason}")]
    Connect { address: String, reason: String },

    /// The token was rejected during the handshake.
    #[error("Appliance at {address} rejected the token")]
    InvalidToken { address: String },

    // ── Calls ───────────────────────────────────────────────────────
    /// A remote procedure call failed or returned an error envelope.
    #[error("Call {method} failed: {reason}")]
    Call { method: String, reason: String },

    /// The transport gave up waiting for a reply.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// A property was never reported by the appliance.
    #[error("Property {0} is not available")]
    MissingProperty(Property),

    // ── Data ────────────────────────────────────────────────────────
    /// A reply could not be decoded into the expected shape, with the raw
    /// body for debugging.
    #[error("Unexpected reply to {method}: {message}")]
    Deserialization {
        method: String,
        message: String,
        body: String,
    },
}

impl Error {
    /// Returns `true` if the appliance simply could not be reached, as
    /// opposed to answering with something unexpected.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. } | Self::InvalidToken { .. } | Self::Timeout { .. }
        )
    }
}
