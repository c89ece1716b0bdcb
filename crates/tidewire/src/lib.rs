//! tidewire: an incremental HTTP/1.1 and WebSocket protocol stack for
//! reactor-driven services.
//!
//! This facade re-exports the two halves of the workspace:
//!
//! - [`http`] — the wire layer: resumable parsers, the RFC 6455 frame
//!   codec, connection lifecycle objects and the server/client shells.
//! - [`core`] — the application layer: the typed-message subprotocol,
//!   session management, the OAuth2 key cache and structured logging.

pub use tidewire_core as core;
pub use tidewire_http as http;

pub use tidewire_core::{
    AuthParams, Logger, MessageManager, Session, SessionManager, WsMessage,
};
pub use tidewire_http::{
    ClientConnection, ContentType, HttpClient, HttpServer, Reply, Request, ServerConnection,
    Status, WebSocketFrame,
};
