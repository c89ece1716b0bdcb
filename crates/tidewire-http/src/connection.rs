//! Connection objects binding the parsers to a non-blocking endpoint.
//!
//! A connection owns its current request, reply, frame slots, parser
//! resume state and the input/output buffers. The socket itself is behind
//! the [`Transport`] trait: the readiness reactor and the endpoints are
//! external collaborators, and everything here operates on whatever bytes
//! they deliver. Parsing and serialization never block; `send_*` with
//! `send_now` attempts a single non-blocking flush and otherwise leaves
//! the status at `ReplyReady`/`RequestReady` for the next writable event.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;

use crate::handshake::accept_key;
use crate::parser::{
    ReplyContext, ReplyParser, RequestContext, RequestParser, Verdict,
};
use crate::reply::{Reply, Status};
use crate::request::Request;
use crate::wsframe::{WebSocketFrame, WebSocketParser};

/// Handle identifying a connection inside a shell's registry. Sessions
/// and proxies hold these instead of references.
pub type ConnectionId = u64;

/// Progress of the request/reply cycle on one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConnectionStatus {
    Connected,
    WaitRequest,
    RequestOk,
    RequestReady,
    RequestSent,
    RequestError,
    WaitReply,
    ReplyOk,
    ReplyReady,
    ReplySent,
    ReplyError,
}

/// Wire protocol currently spoken on the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    WebSocket,
}

/// The non-blocking byte endpoint a connection is bound to.
///
/// `read_async` moves all currently readable bytes into `buf` and returns
/// the count; `write_async` drains as many bytes from the front of `buf`
/// as the peer accepts without blocking.
pub trait Transport {
    fn read_async(&mut self, buf: &mut Vec<u8>) -> io::Result<usize>;
    fn write_async(&mut self, buf: &mut Vec<u8>) -> io::Result<usize>;
    fn connected(&self) -> bool;
    fn disconnect(&mut self);
    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }
}

/// Server-side connection: parses requests, emits replies, and switches
/// to WebSocket framing after a successful upgrade.
pub struct ServerConnection {
    id: ConnectionId,
    transport: Box<dyn Transport>,
    request: Option<Request>,
    reply: Option<Reply>,
    frame_in: Option<WebSocketFrame>,
    frame_out: Option<WebSocketFrame>,
    parse_state: RequestContext,
    status: ConnectionStatus,
    protocol: Protocol,
    close_connection: bool,
    input: Vec<u8>,
    output: Vec<u8>,
    /// Free-form named slots; the session layer keeps its binding under
    /// the `"session"` key.
    data: HashMap<String, String>,
    server_name: String,
    allowed_methods: String,
}

impl ServerConnection {
    pub fn new(id: ConnectionId, transport: Box<dyn Transport>) -> Self {
        Self {
            id,
            transport,
            request: None,
            reply: None,
            frame_in: None,
            frame_out: None,
            parse_state: RequestContext::new(),
            status: ConnectionStatus::Connected,
            protocol: Protocol::Http,
            close_connection: true,
            input: Vec::new(),
            output: Vec::new(),
            data: HashMap::new(),
            server_name: crate::reply::DEFAULT_SERVER_NAME.into(),
            allowed_methods: crate::reply::DEFAULT_ALLOWED_METHODS.into(),
        }
    }

    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn set_status(&mut self, status: ConnectionStatus) {
        self.status = status;
    }

    #[must_use]
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    #[must_use]
    pub fn close_connection(&self) -> bool {
        self.close_connection
    }

    pub fn set_close_connection(&mut self, value: bool) {
        self.close_connection = value;
    }

    #[must_use]
    pub fn connected(&self) -> bool {
        self.transport.connected()
    }

    pub fn disconnect(&mut self) {
        self.transport.disconnect();
    }

    #[must_use]
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.transport.peer_addr()
    }

    /// Identity strings stamped onto lazily created replies.
    pub fn set_identity(&mut self, server_name: &str, allowed_methods: &str) {
        self.server_name = server_name.into();
        self.allowed_methods = allowed_methods.into();
    }

    #[must_use]
    pub fn data(&self) -> &HashMap<String, String> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.data
    }

    /// The current request, created on first access.
    pub fn request(&mut self) -> &mut Request {
        self.request.get_or_insert_with(Request::new)
    }

    /// The current reply, created on first access with this connection's
    /// server name and allowed methods.
    pub fn reply(&mut self) -> &mut Reply {
        let server_name = self.server_name.clone();
        let allowed_methods = self.allowed_methods.clone();
        self.reply.get_or_insert_with(|| {
            let mut reply = Reply::new();
            reply.server_name = server_name;
            reply.allowed_methods = allowed_methods;
            reply
        })
    }

    pub fn frame_in(&mut self) -> &mut WebSocketFrame {
        self.frame_in.get_or_insert_with(WebSocketFrame::new)
    }

    pub fn frame_out(&mut self) -> &mut WebSocketFrame {
        self.frame_out.get_or_insert_with(WebSocketFrame::new)
    }

    /// Drop the current request/reply and reset the parser resume state.
    /// Frame slots survive; a WebSocket session outlives many messages.
    pub fn clear(&mut self) {
        self.parse_state = RequestContext::new();
        self.request = None;
        self.reply = None;
    }

    /// Reset both frame slots after a WebSocket message has been handled.
    pub fn clear_frames(&mut self) {
        if let Some(frame) = self.frame_in.as_mut() {
            frame.clear();
        }
        if let Some(frame) = self.frame_out.as_mut() {
            frame.clear();
        }
    }

    /// Pull readable bytes from the transport and run the parser for the
    /// current protocol mode. Returns whether any bytes arrived; the
    /// resulting verdict is left in [`ServerConnection::status`].
    pub fn parse_input(&mut self) -> io::Result<bool> {
        if !self.transport.connected() {
            return Ok(false);
        }

        let mut chunk = Vec::new();
        let count = self.transport.read_async(&mut chunk)?;
        if count == 0 && self.input.is_empty() {
            return Ok(false);
        }
        self.input.extend_from_slice(&chunk);

        match self.protocol {
            Protocol::Http => self.parse_http(),
            Protocol::WebSocket => self.parse_web_socket(),
        }
        Ok(true)
    }

    fn parse_http(&mut self) {
        let input = std::mem::take(&mut self.input);
        let request = self.request.get_or_insert_with(Request::new);
        let (verdict, consumed) = RequestParser::parse(request, &mut self.parse_state, &input);
        self.input.extend_from_slice(&input[consumed..]);

        match verdict {
            Verdict::Error => self.status = ConnectionStatus::RequestError,
            Verdict::Done => self.status = ConnectionStatus::RequestOk,
            Verdict::More => self.status = ConnectionStatus::WaitRequest,
        }
    }

    fn parse_web_socket(&mut self) {
        let input = std::mem::take(&mut self.input);
        let frame = self.frame_in.get_or_insert_with(WebSocketFrame::new);
        let consumed = WebSocketParser::parse(frame, &input);
        self.input.extend_from_slice(&input[consumed..]);

        if frame.is_complete() {
            self.status = ConnectionStatus::RequestOk;
        } else {
            self.status = ConnectionStatus::WaitRequest;
        }
    }

    /// Serialize the prepared reply for `status` into the output buffer.
    ///
    /// Persistence: the connection closes unless the reply status is OK
    /// and the request asked for `keep-alive`. With `send_now` the output
    /// is flushed immediately and the message slots are cleared.
    pub fn send_reply(
        &mut self,
        status: Status,
        content_type: Option<&str>,
        send_now: bool,
    ) -> io::Result<()> {
        let mut close = true;
        if status == Status::Ok {
            if let Some(request) = self.request.as_ref() {
                if request.headers.value_of("connection") == "keep-alive" {
                    close = false;
                }
            }
        }
        self.close_connection = close;

        let reply = self.reply();
        reply.close_connection = close;
        reply.get_reply(status, content_type);
        self.push_reply(send_now)
    }

    /// Serialize the stock page for `status`. Stock replies are error
    /// paths; they always close the connection.
    pub fn send_stock_reply(&mut self, status: Status, send_now: bool) -> io::Result<()> {
        self.close_connection = true;

        let reply = self.reply();
        reply.close_connection = true;
        reply.get_stock_reply(status);
        self.push_reply(send_now)
    }

    fn push_reply(&mut self, send_now: bool) -> io::Result<()> {
        if let Some(reply) = self.reply.as_ref() {
            reply.to_buffer(&mut self.output);
        }
        self.status = ConnectionStatus::ReplyReady;

        if send_now {
            self.flush()?;
            self.status = ConnectionStatus::ReplySent;
            self.clear();
        }
        Ok(())
    }

    /// Emit the 101 upgrade reply and switch the connection to WebSocket
    /// framing. All subsequent inbound bytes are parsed as frames.
    pub fn switching_protocols(&mut self, accept: &str, protocol: &str) {
        self.close_connection = false;

        {
            let reply = self.reply();
            reply.status = Status::SwitchingProtocols;
            reply.close_connection = false;
            reply.add_header("Upgrade", "websocket");
            reply.add_header("Connection", "Upgrade");
            reply.add_header("Sec-WebSocket-Accept", accept);
            if !protocol.is_empty() {
                reply.add_header("Sec-WebSocket-Protocol", protocol);
            }
        }
        if let Some(reply) = self.reply.as_ref() {
            reply.to_buffer(&mut self.output);
        }

        self.status = ConnectionStatus::ReplyReady;
        self.protocol = Protocol::WebSocket;
        self.request = None;
        self.reply = None;
        self.parse_state = RequestContext::new();
    }

    /// Validate the buffered request as an upgrade and answer it.
    ///
    /// # Errors
    ///
    /// Propagates [`crate::handshake::HandshakeError`] when the request is
    /// not a well-formed upgrade.
    pub fn upgrade_web_socket(
        &mut self,
        subprotocol: &str,
    ) -> Result<(), crate::handshake::HandshakeError> {
        let key = {
            let request = self.request();
            crate::handshake::validate_upgrade(request)?
        };
        let accept = accept_key(&key);
        self.switching_protocols(&accept, subprotocol);
        Ok(())
    }

    /// Serialize the outbound frame into the output buffer.
    pub fn send_web_socket(&mut self, send_now: bool) -> io::Result<()> {
        if let Some(frame) = self.frame_out.as_ref() {
            frame.write(&mut self.output);
        }
        self.status = ConnectionStatus::ReplyReady;

        if send_now {
            self.flush()?;
            self.status = ConnectionStatus::ReplySent;
            self.clear_frames();
        }
        Ok(())
    }

    /// Attempt a non-blocking drain of the output buffer. Returns whether
    /// the buffer is now empty.
    pub fn flush(&mut self) -> io::Result<bool> {
        self.transport.write_async(&mut self.output)?;
        Ok(self.output.is_empty())
    }

    #[must_use]
    pub fn output_len(&self) -> usize {
        self.output.len()
    }
}

/// Client-side connection: emits requests, parses replies.
pub struct ClientConnection {
    id: ConnectionId,
    transport: Box<dyn Transport>,
    request: Option<Request>,
    reply: Option<Reply>,
    parse_state: ReplyContext,
    status: ConnectionStatus,
    close_connection: bool,
    input: Vec<u8>,
    output: Vec<u8>,
    host: String,
    port: u16,
    user_agent: String,
}

impl ClientConnection {
    pub fn new(id: ConnectionId, transport: Box<dyn Transport>) -> Self {
        Self {
            id,
            transport,
            request: None,
            reply: None,
            parse_state: ReplyContext::new(),
            status: ConnectionStatus::Connected,
            close_connection: false,
            input: Vec::new(),
            output: Vec::new(),
            host: String::new(),
            port: 0,
            user_agent: String::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn set_status(&mut self, status: ConnectionStatus) {
        self.status = status;
    }

    #[must_use]
    pub fn close_connection(&self) -> bool {
        self.close_connection
    }

    pub fn set_close_connection(&mut self, value: bool) {
        self.close_connection = value;
    }

    #[must_use]
    pub fn connected(&self) -> bool {
        self.transport.connected()
    }

    pub fn disconnect(&mut self) {
        self.transport.disconnect();
    }

    /// Origin identity stamped onto lazily created requests.
    pub fn set_origin(&mut self, host: &str, port: u16, user_agent: &str) {
        self.host = host.into();
        self.port = port;
        self.user_agent = user_agent.into();
    }

    /// The current request, created on first access with this
    /// connection's host, port and user agent.
    pub fn request(&mut self) -> &mut Request {
        let host = self.host.clone();
        let port = self.port;
        let user_agent = self.user_agent.clone();
        self.request.get_or_insert_with(|| {
            let mut request = Request::new();
            request.host = host;
            request.port = port;
            request.user_agent = user_agent;
            request
        })
    }

    pub fn reply(&mut self) -> &mut Reply {
        self.reply.get_or_insert_with(Reply::new)
    }

    pub fn clear(&mut self) {
        self.parse_state = ReplyContext::new();
        self.request = None;
        self.reply = None;
    }

    /// Pull readable bytes and run the reply parser; the verdict is left
    /// in [`ClientConnection::status`].
    pub fn parse_input(&mut self) -> io::Result<bool> {
        if !self.transport.connected() {
            return Ok(false);
        }

        let mut chunk = Vec::new();
        let count = self.transport.read_async(&mut chunk)?;
        if count == 0 && self.input.is_empty() {
            return Ok(false);
        }
        self.input.extend_from_slice(&chunk);

        let input = std::mem::take(&mut self.input);
        let reply = self.reply.get_or_insert_with(Reply::new);
        let (verdict, consumed) = ReplyParser::parse(reply, &mut self.parse_state, &input);
        self.input.extend_from_slice(&input[consumed..]);

        match verdict {
            Verdict::Error => self.status = ConnectionStatus::ReplyError,
            Verdict::Done => self.status = ConnectionStatus::ReplyOk,
            Verdict::More => self.status = ConnectionStatus::WaitReply,
        }
        Ok(true)
    }

    /// Serialize the prepared request into the output buffer; with
    /// `send_now`, flush and advance to `RequestSent`.
    pub fn send_request(&mut self, send_now: bool) -> io::Result<()> {
        if let Some(request) = self.request.as_ref() {
            request.to_buffer(&mut self.output);
        }
        self.status = ConnectionStatus::RequestReady;

        if send_now {
            self.flush()?;
            self.status = ConnectionStatus::RequestSent;
        }
        Ok(())
    }

    /// Attempt a non-blocking drain of the output buffer. Returns whether
    /// the buffer is now empty.
    pub fn flush(&mut self) -> io::Result<bool> {
        self.transport.write_async(&mut self.output)?;
        Ok(self.output.is_empty())
    }
}
