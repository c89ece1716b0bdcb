//! Typed-message subprotocol riding over an established WebSocket.
//!
//! Every message is a single JSON object with compact keys:
//!
//! | key | meaning            | present when          |
//! |-----|--------------------|-----------------------|
//! | `t` | message type id    | always                |
//! | `u` | unique id          | always                |
//! | `a` | action name        | Call                  |
//! | `c` | numeric error code | CallError             |
//! | `m` | error message      | CallError             |
//! | `p` | payload (obj/arr)  | all except CallError  |
//!
//! Unique ids correlate a `Call` with the `CallResult`/`CallError` it
//! produces; when the caller does not supply one, a 42-character hex id
//! is drawn from the thread RNG.

use rand::Rng;
use serde_json::Value;
use tidewire_http::util::hex_encode;

/// Subprotocol message kind; the wire `t` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageType {
    #[default]
    Open,
    Close,
    Call,
    CallResult,
    CallError,
}

impl MessageType {
    #[must_use]
    pub fn id(self) -> i64 {
        match self {
            Self::Open => 0,
            Self::Close => 1,
            Self::Call => 2,
            Self::CallResult => 3,
            Self::CallError => 4,
        }
    }

    #[must_use]
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            0 => Some(Self::Open),
            1 => Some(Self::Close),
            2 => Some(Self::Call),
            3 => Some(Self::CallResult),
            4 => Some(Self::CallError),
            _ => None,
        }
    }
}

/// Envelope decoding failure.
#[derive(Debug)]
pub enum EnvelopeError {
    /// The frame payload is not a JSON object.
    InvalidJson(serde_json::Error),
    /// The `t` field is missing or outside `0..=4`.
    InvalidMessageType(i64),
}

impl std::fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidJson(err) => write!(f, "invalid envelope JSON: {err}"),
            Self::InvalidMessageType(id) => {
                write!(f, "invalid message type id: {id}")
            }
        }
    }
}

impl std::error::Error for EnvelopeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidJson(err) => Some(err),
            Self::InvalidMessageType(_) => None,
        }
    }
}

/// A decoded or to-be-encoded subprotocol message.
#[derive(Debug, Clone)]
pub struct WsMessage {
    pub message_type: MessageType,
    pub unique_id: String,
    pub action: String,
    pub error_code: i64,
    pub error_message: String,
    pub payload: Value,
}

impl Default for WsMessage {
    fn default() -> Self {
        Self {
            message_type: MessageType::Open,
            unique_id: String::new(),
            action: String::new(),
            error_code: -1,
            error_message: String::new(),
            payload: Value::Object(serde_json::Map::new()),
        }
    }
}

impl WsMessage {
    #[must_use]
    pub fn new(message_type: MessageType) -> Self {
        Self {
            message_type,
            ..Self::default()
        }
    }

    /// Decode an envelope. Missing string fields default to `""`, a
    /// missing `c` to `-1`; a `p` that is neither object nor array is
    /// treated as absent.
    pub fn decode(text: &str) -> Result<Self, EnvelopeError> {
        let value: Value = serde_json::from_str(text).map_err(EnvelopeError::InvalidJson)?;

        // `t` arrives as a number from conforming peers but is tolerated
        // as a numeric string.
        let type_id = match &value["t"] {
            Value::Number(n) => n.as_i64().unwrap_or(-1),
            Value::String(s) => s.parse().unwrap_or(-1),
            _ => -1,
        };
        let message_type =
            MessageType::from_id(type_id).ok_or(EnvelopeError::InvalidMessageType(type_id))?;

        let field = |key: &str| value[key].as_str().unwrap_or_default().to_string();

        let error_code = match &value["c"] {
            Value::Number(n) => n.as_i64().unwrap_or(-1),
            Value::String(s) => s.parse().unwrap_or(-1),
            _ => -1,
        };

        let payload = match &value["p"] {
            p @ (Value::Object(_) | Value::Array(_)) => p.clone(),
            _ => Value::Object(serde_json::Map::new()),
        };

        Ok(Self {
            message_type,
            unique_id: field("u"),
            action: field("a"),
            error_code,
            error_message: field("m"),
            payload,
        })
    }

    /// Encode the envelope in wire key order. An empty `unique_id` is
    /// replaced by a fresh one.
    #[must_use]
    pub fn encode(&self) -> String {
        let uid = if self.unique_id.is_empty() {
            unique_id()
        } else {
            self.unique_id.clone()
        };
        let payload = match &self.payload {
            Value::Object(map) if map.is_empty() => "{}".to_string(),
            other => other.to_string(),
        };

        match self.message_type {
            MessageType::Open => format!("{{\"t\":0,\"u\":\"{uid}\",\"p\":{payload}}}"),
            MessageType::Close => format!("{{\"t\":1,\"u\":\"{uid}\",\"p\":{payload}}}"),
            MessageType::Call => format!(
                "{{\"t\":2,\"u\":\"{uid}\",\"a\":\"{}\",\"p\":{payload}}}",
                self.action
            ),
            MessageType::CallResult => {
                format!("{{\"t\":3,\"u\":\"{uid}\",\"p\":{payload}}}")
            }
            MessageType::CallError => format!(
                "{{\"t\":4,\"u\":\"{uid}\",\"c\":{},\"m\":{}}}",
                self.error_code,
                Value::String(self.error_message.clone())
            ),
        }
    }
}

/// A correlation id: 21 bytes from the thread RNG, hex-encoded to 42
/// characters.
#[must_use]
pub fn unique_id() -> String {
    let mut bytes = [0u8; 21];
    rand::thread_rng().fill(&mut bytes[..]);
    hex_encode(&bytes)
}

/// Encode a `Call` envelope.
#[must_use]
pub fn call(unique_id: &str, action: &str, payload: &Value) -> String {
    let mut message = WsMessage::new(MessageType::Call);
    message.unique_id = unique_id.into();
    message.action = action.into();
    message.payload = payload.clone();
    message.encode()
}

/// Encode a `CallResult` envelope.
#[must_use]
pub fn call_result(unique_id: &str, payload: &Value) -> String {
    let mut message = WsMessage::new(MessageType::CallResult);
    message.unique_id = unique_id.into();
    message.payload = payload.clone();
    message.encode()
}

/// Encode a `CallError` envelope.
#[must_use]
pub fn call_error(unique_id: &str, code: i64, error_message: &str, payload: Option<&Value>) -> String {
    let mut message = WsMessage::new(MessageType::CallError);
    message.unique_id = unique_id.into();
    message.error_code = code;
    message.error_message = error_message.into();
    if let Some(payload) = payload {
        message.payload = payload.clone();
    }
    message.encode()
}

/// Seed a `CallResult` answering `request`, copying its unique id.
#[must_use]
pub fn prepare_response(request: &WsMessage) -> WsMessage {
    let mut response = WsMessage::new(MessageType::CallResult);
    response.unique_id = request.unique_id.clone();
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unique_ids_are_42_hex_chars() {
        let a = unique_id();
        let b = unique_id();
        assert_eq!(a.len(), 42);
        assert!(a.bytes().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn call_encodes_in_wire_order() {
        let text = call("aa11", "ping", &json!({}));
        assert_eq!(text, "{\"t\":2,\"u\":\"aa11\",\"a\":\"ping\",\"p\":{}}");
    }

    #[test]
    fn call_error_escapes_the_message() {
        let text = call_error("aa11", 500, "broken \"quote\"", None);
        assert_eq!(
            text,
            "{\"t\":4,\"u\":\"aa11\",\"c\":500,\"m\":\"broken \\\"quote\\\"\"}"
        );
    }

    #[test]
    fn decode_round_trips_a_call() {
        let text = call("aa11", "sum", &json!({"x": 1, "y": 2}));
        let message = WsMessage::decode(&text).unwrap();
        assert_eq!(message.message_type, MessageType::Call);
        assert_eq!(message.unique_id, "aa11");
        assert_eq!(message.action, "sum");
        assert_eq!(message.payload["x"], 1);
    }

    #[test]
    fn decode_defaults() {
        let message = WsMessage::decode("{\"t\":3}").unwrap();
        assert_eq!(message.message_type, MessageType::CallResult);
        assert_eq!(message.unique_id, "");
        assert_eq!(message.error_code, -1);
        assert!(message.payload.as_object().unwrap().is_empty());
    }

    #[test]
    fn decode_rejects_out_of_range_type() {
        let err = WsMessage::decode("{\"t\":9,\"u\":\"x\"}").unwrap_err();
        assert!(matches!(err, EnvelopeError::InvalidMessageType(9)));

        let err = WsMessage::decode("{\"u\":\"x\"}").unwrap_err();
        assert!(matches!(err, EnvelopeError::InvalidMessageType(-1)));
    }

    #[test]
    fn decode_accepts_string_type_ids() {
        let message = WsMessage::decode("{\"t\":\"2\",\"u\":\"x\",\"a\":\"go\"}").unwrap();
        assert_eq!(message.message_type, MessageType::Call);
    }

    #[test]
    fn scalar_payload_is_treated_as_absent() {
        let message = WsMessage::decode("{\"t\":0,\"u\":\"x\",\"p\":42}").unwrap();
        assert!(message.payload.as_object().unwrap().is_empty());
    }

    #[test]
    fn empty_unique_id_gets_generated_on_encode() {
        let message = WsMessage::new(MessageType::Open);
        let text = message.encode();
        let decoded = WsMessage::decode(&text).unwrap();
        assert_eq!(decoded.unique_id.len(), 42);
    }
}
