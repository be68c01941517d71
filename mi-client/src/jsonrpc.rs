//! JSON-RPC 2.0 framing used on the management interface.
//!
//! Requests and responses travel on the MI socket, while event notifications are
//! pushed by OpenSIPS to the datagram sockets registered through `event_subscribe`.
//! Each datagram carries exactly one JSON document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DecodeError, MiError};

/// The only protocol version spoken on the MI.
pub const JSONRPC_VERSION: &str = "2.0";

/// Outgoing MI request.
#[derive(Debug, Serialize)]
pub struct Request<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: &'a Value,
    id: u64,
}

impl<'a> Request<'a> {
    pub fn new(method: &'a str, params: &'a Value, id: u64) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method,
            params,
            id,
        }
    }

    /// Serialize the request into a single datagram.
    pub fn to_vec(&self) -> Result<Vec<u8>, MiError> {
        serde_json::to_vec(self).map_err(|e| MiError::Decode(e.to_string()))
    }
}

/// Error object carried by a failed MI response.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Reply to an MI request.
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

impl Response {
    pub fn parse(bytes: &[u8]) -> Result<Self, MiError> {
        serde_json::from_slice(bytes).map_err(|e| MiError::Decode(e.to_string()))
    }

    /// Whether this response answers the request with the given id.
    pub fn answers(&self, id: u64) -> bool {
        match &self.id {
            Some(Value::Number(n)) => n.as_u64() == Some(id),
            Some(Value::String(s)) => s.parse::<u64>().ok() == Some(id),
            _ => false,
        }
    }

    pub fn into_result(self) -> Result<Value, MiError> {
        if let Some(error) = self.error {
            return Err(MiError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

/// A decoded event notification.
///
/// `method` is the event name (for instance `E_DIALOG_ID` or `dialog`) and
/// `params` the event attributes, left exactly as received.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub method: String,
    pub params: Value,
}

impl Notification {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Decode one datagram into a notification.
    pub fn parse(bytes: &[u8]) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_slice(bytes)?;
        let Value::Object(mut object) = value else {
            return Err(DecodeError::NotAnObject);
        };

        check_version(&object)?;

        if object.get("id").is_some_and(|id| !id.is_null()) {
            return Err(DecodeError::UnexpectedId);
        }

        let method = match object.remove("method") {
            Some(Value::String(method)) if !method.is_empty() => method,
            _ => return Err(DecodeError::MissingMethod),
        };
        let params = object.remove("params").unwrap_or(Value::Null);

        Ok(Self { method, params })
    }

    /// Encode the notification the way OpenSIPS puts it on the wire.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut object = Map::new();
        object.insert("jsonrpc".into(), Value::from(JSONRPC_VERSION));
        object.insert("method".into(), Value::from(self.method.clone()));
        object.insert("params".into(), self.params.clone());
        Value::Object(object).to_string().into_bytes()
    }
}

fn check_version(object: &Map<String, Value>) -> Result<(), DecodeError> {
    match object.get("jsonrpc") {
        Some(Value::String(version)) if version == JSONRPC_VERSION => Ok(()),
        Some(Value::String(version)) => Err(DecodeError::InvalidVersion(Some(version.clone()))),
        Some(other) => Err(DecodeError::InvalidVersion(Some(other.to_string()))),
        None => Err(DecodeError::InvalidVersion(None)),
    }
}
