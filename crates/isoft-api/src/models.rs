// Wire types for the appliance protocol.
//
// Every reply is a flat JSON object. Keys are optional and a missing key
// means "unchanged" for the identity fields.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::Error;

/// Literal data values the device uses to signal session faults.
pub const NOT_LOGGED_IN: &str = "not logged in";
pub const NOT_CONNECTED: &str = "not connected";
pub const ALREADY_CONNECTED: &str = "already connected";

/// Raw reply to any command.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DeviceResponse {
    #[serde(default, deserialize_with = "lenient_opt")]
    pub token: Option<String>,

    #[serde(default, rename = "wtuType", deserialize_with = "lenient_opt")]
    pub wtu_type: Option<String>,

    #[serde(default, rename = "serial number", deserialize_with = "lenient_opt")]
    pub serial_number: Option<String>,

    /// `"ok"` on success; anything else (or absent) is a failure.
    #[serde(default)]
    pub status: Option<String>,

    /// Free-form payload: a string for most commands, a list of unit
    /// records for `register/show`.
    #[serde(default)]
    pub data: Option<Value>,

    /// `"error"` when `data` carries an error description.
    #[serde(default)]
    pub error: Option<String>,
}

/// What a reply means for the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Success, or a non-recoverable error reduced to "no data".
    Data(Option<Value>),
    /// The token is stale; log in again and retry.
    NotLoggedIn,
    /// The unit connection was dropped; connect again and retry.
    NotConnected,
    /// A connect raced with an existing connection.
    AlreadyConnected,
}

impl DeviceResponse {
    pub fn is_ok(&self) -> bool {
        self.status.as_deref() == Some("ok")
    }

    /// Classify this reply.
    pub fn reply(&self) -> Reply {
        if self.is_ok() {
            return Reply::Data(self.data.clone());
        }
        if self.error.as_deref() != Some("error") {
            return Reply::Data(None);
        }
        match self.data.as_ref().and_then(Value::as_str) {
            Some(NOT_LOGGED_IN) => Reply::NotLoggedIn,
            Some(NOT_CONNECTED) => Reply::NotConnected,
            Some(ALREADY_CONNECTED) => Reply::AlreadyConnected,
            _ => Reply::Data(None),
        }
    }
}

/// One entry of the `register/show` unit list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UnitRecord {
    #[serde(rename = "wtuType", deserialize_with = "lenient")]
    pub wtu_type: String,

    #[serde(rename = "serial number", deserialize_with = "lenient")]
    pub serial_number: String,
}

/// The unit described by the first record of a `register/show` payload.
///
/// `Ok(None)` when the payload is absent, not a list, or empty. A first
/// record missing either identity field is a protocol error; later
/// records are never consulted.
pub fn first_unit(data: Option<&Value>) -> Result<Option<UnitRecord>, Error> {
    let Some(first) = data.and_then(Value::as_array).and_then(|items| items.first()) else {
        return Ok(None);
    };
    UnitRecord::deserialize(first)
        .map(Some)
        .map_err(|e| Error::Protocol {
            message: format!("malformed unit record: {first}"),
            source: Some(e.into()),
        })
}

// Identity fields arrive as strings on current firmware and as numbers
// on some older units.
fn lenient<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    match Value::deserialize(de)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

fn lenient_opt<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    match Value::deserialize(de)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}
