//! Incremental HTTP/1.1 and WebSocket wire layer.
//!
//! This crate is the byte-oriented half of the tidewire stack: resumable
//! request/reply parsers, the RFC 6455 frame codec, and connection
//! objects that bind both to a non-blocking endpoint behind the
//! [`Transport`](connection::Transport) trait. The readiness reactor and
//! the sockets themselves are external collaborators; everything here
//! consumes whatever bytes are buffered and returns, leaving resumable
//! state on the connection for the next event.
//!
//! # Example
//!
//! ```
//! use tidewire_http::parser::{RequestContext, RequestParser, Verdict};
//! use tidewire_http::request::Request;
//!
//! let mut request = Request::new();
//! let mut ctx = RequestContext::new();
//! let (verdict, _) = RequestParser::parse(
//!     &mut request,
//!     &mut ctx,
//!     b"GET /items?id=7 HTTP/1.1\r\nHost: example.com\r\n\r\n",
//! );
//! assert_eq!(verdict, Verdict::Done);
//! assert_eq!(request.uri, "/items");
//! assert_eq!(request.headers.value_of("host"), "example.com");
//! ```

#![deny(unsafe_code)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]

pub mod client;
pub mod connection;
pub mod form;
pub mod handshake;
pub mod headers;
pub mod message;
pub mod mime;
pub mod parser;
pub mod reply;
pub mod request;
pub mod server;
pub mod testio;
pub mod util;
pub mod wsframe;

pub use client::{ClientConfig, HttpClient, HttpProxy, ProxyManager, DEFAULT_CLIENT_NAME};
pub use connection::{
    ClientConnection, ConnectionId, ConnectionStatus, Protocol, ServerConnection, Transport,
};
pub use form::{parse_form_data, url_decode, FormData, FormDataItem, UrlDecodeError};
pub use handshake::{accept_key, validate_upgrade, HandshakeError};
pub use headers::{Header, Headers};
pub use message::ContentType;
pub use parser::{
    ReplyContext, ReplyParser, ReplyState, RequestContext, RequestParser, RequestState, Verdict,
};
pub use reply::{Reply, Status, DEFAULT_ALLOWED_METHODS, DEFAULT_SERVER_NAME};
pub use request::Request;
pub use server::{HookError, HookResult, HttpServer, ServerConfig};
pub use wsframe::{Opcode, WebSocketFrame, WebSocketParser};
