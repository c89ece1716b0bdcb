//! Application layer of the tidewire stack.
//!
//! Rides over connections established by `tidewire-http`: the typed
//! JSON message subprotocol with call/result correlation, the session
//! registry binding logical clients to live connections, the OAuth2
//! provider parameter/key cache, and structured logging.
//!
//! # Example
//!
//! ```
//! use tidewire_core::wsproto::{self, MessageType, WsMessage};
//!
//! let text = wsproto::call("aa", "ping", &serde_json::json!({}));
//! let message = WsMessage::decode(&text).unwrap();
//! assert_eq!(message.message_type, MessageType::Call);
//! assert_eq!(message.action, "ping");
//! ```

#![deny(unsafe_code)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod logging;
pub mod oauth2;
pub mod session;
pub mod wsproto;

pub use logging::{LogConfig, LogLevel, Logger};
pub use oauth2::{AuthParam, AuthParams, KeyStatus, OAuth2Error};
pub use session::{
    MessageCallback, MessageHandler, MessageManager, Session, SessionManager, SESSION_DATA_KEY,
};
pub use wsproto::{
    call, call_error, call_result, prepare_response, unique_id, EnvelopeError, MessageType,
    WsMessage,
};
