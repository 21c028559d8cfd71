// ── Diagnostic RPC payloads ──
//
// Loosely-typed replies to the identification calls. Most list-style
// methods wrap their single result object in a one-element array.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Error;

/// Reply item of `get_serial_number`.
#[derive(Debug, Clone, Deserialize)]
pub struct SerialNumber {
    pub serial_number: String,
}

/// Reply of `miIO.info`. Only the fields we log are kept.
#[derive(Debug, Clone, Deserialize)]
pub struct FirmwareInfo {
    pub fw_ver: String,
    #[serde(default)]
    pub hw_ver: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

/// Reply item of `get_status`. `state` is the numeric status code the
/// string states are derived from.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusReport {
    pub state: i64,
    #[serde(default)]
    pub battery: Option<u8>,
    #[serde(default)]
    pub fan_power: Option<u8>,
    #[serde(default)]
    pub error_code: Option<i64>,
}

/// Decode a whole reply.
pub(crate) fn decode<T: DeserializeOwned>(method: &str, raw: Value) -> Result<T, Error> {
    let body = raw.to_string();
    serde_json::from_value(raw).map_err(|e| Error::Deserialization {
        method: method.to_owned(),
        message: e.to_string(),
        body,
    })
}

/// Decode the first element of an array reply. A bare object is accepted
/// as well since some firmware skips the wrapping array.
pub(crate) fn first_of<T: DeserializeOwned>(method: &str, raw: Value) -> Result<T, Error> {
    match raw {
        Value::Array(items) => {
            let Some(first) = items.into_iter().next() else {
                return Err(Error::Deserialization {
                    method: method.to_owned(),
                    message: "empty result array".into(),
                    body: "[]".into(),
                });
            };
            decode(method, first)
        }
        other => decode(method, other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serial_number_from_wrapped_array() {
        let raw = json!([{ "serial_number": "R0018S91800123" }]);
        let serial: SerialNumber = first_of("get_serial_number", raw).unwrap();
        assert_eq!(serial.serial_number, "R0018S91800123");
    }

    #[test]
    fn status_accepts_bare_object() {
        let raw = json!({ "state": 8, "battery": 100, "fan_power": 60 });
        let status: StatusReport = first_of("get_status", raw).unwrap();
        assert_eq!(status.state, 8);
        assert_eq!(status.battery, Some(100));
        assert_eq!(status.fan_power, Some(60));
        assert_eq!(status.error_code, None);
    }

    #[test]
    fn firmware_info_ignores_unknown_fields() {
        let raw = json!({
            "fw_ver": "3.3.9_003194",
            "hw_ver": "Linux",
            "model": "roborock.vacuum.s5",
            "ap": { "ssid": "home" }
        });
        let info: FirmwareInfo = decode("miIO.info", raw).unwrap();
        assert_eq!(info.fw_ver, "3.3.9_003194");
        assert_eq!(info.model.as_deref(), Some("roborock.vacuum.s5"));
    }

    #[test]
    fn empty_array_is_a_deserialization_error() {
        let result: Result<StatusReport, Error> = first_of("get_status", json!([]));
        assert!(
            matches!(result, Err(Error::Deserialization { ref method, .. }) if method == "get_status"),
            "expected Deserialization error, got: {result:?}"
        );
    }

    #[test]
    fn wrong_shape_keeps_raw_body() {
        let result: Result<SerialNumber, Error> =
            first_of("get_serial_number", json!([{ "serial": 12 }]));
        match result {
            Err(Error::Deserialization { body, .. }) => assert!(body.contains("serial")),
            other => panic!("expected Deserialization error, got: {other:?}"),
        }
    }
}
