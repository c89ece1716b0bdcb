//! Server shell: translates reactor events into connection calls.
//!
//! The readiness reactor itself is an external collaborator; it delivers
//! `on_accept`/`on_read`/`on_write`/`on_timeout` one event at a time and
//! this shell drives the bound [`ServerConnection`]s, dispatching the
//! application hooks. Hook failures are routed to `on_exception` and the
//! offending connection is dropped rather than left with a half-served
//! request.

use std::collections::HashMap;

use crate::connection::{ConnectionId, ConnectionStatus, Protocol, ServerConnection, Transport};
use crate::reply::{Status, DEFAULT_ALLOWED_METHODS, DEFAULT_SERVER_NAME};

/// Error type surfaced by application hooks.
pub type HookError = Box<dyn std::error::Error>;
/// Result of an application hook.
pub type HookResult = Result<(), HookError>;

type ConnHook = Box<dyn FnMut(&mut ServerConnection) -> HookResult>;
type NotifyHook = Box<dyn FnMut(&mut ServerConnection)>;
type ExceptionHook = Box<dyn FnMut(ConnectionId, &(dyn std::error::Error))>;
type ExecuteHook = Box<dyn FnMut(&mut ServerConnection) -> HookResult>;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Value of the `Server` header on generated replies.
    pub server_name: String,
    /// Value of the `Allow` header on 405/501 replies.
    pub allowed_methods: String,
    /// Document root for applications that serve files.
    pub doc_root: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_name: DEFAULT_SERVER_NAME.into(),
            allowed_methods: DEFAULT_ALLOWED_METHODS.into(),
            doc_root: String::new(),
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_server_name(mut self, name: &str) -> Self {
        self.server_name = name.into();
        self
    }

    #[must_use]
    pub fn with_allowed_methods(mut self, methods: &str) -> Self {
        self.allowed_methods = methods.into();
        self
    }

    #[must_use]
    pub fn with_doc_root(mut self, root: &str) -> Self {
        self.doc_root = root.into();
        self
    }
}

/// A method-keyed dispatch entry consulted when no `on_execute` override
/// is installed.
struct CommandHandler {
    method: String,
    enabled: bool,
    callback: ConnHook,
}

#[derive(Default)]
struct ServerHooks {
    on_request: Option<ConnHook>,
    on_reply: Option<NotifyHook>,
    on_connected: Option<NotifyHook>,
    on_disconnected: Option<NotifyHook>,
    on_exception: Option<ExceptionHook>,
    on_execute: Option<ExecuteHook>,
    on_access_log: Option<NotifyHook>,
}

/// HTTP/WebSocket server shell over a connection registry.
pub struct HttpServer {
    config: ServerConfig,
    hooks: ServerHooks,
    commands: Vec<CommandHandler>,
    connections: HashMap<ConnectionId, ServerConnection>,
    next_id: ConnectionId,
}

impl HttpServer {
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            hooks: ServerHooks::default(),
            commands: Vec::new(),
            connections: HashMap::new(),
            next_id: 1,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    // Hook installers.

    pub fn on_request(&mut self, hook: impl FnMut(&mut ServerConnection) -> HookResult + 'static) {
        self.hooks.on_request = Some(Box::new(hook));
    }

    pub fn on_reply(&mut self, hook: impl FnMut(&mut ServerConnection) + 'static) {
        self.hooks.on_reply = Some(Box::new(hook));
    }

    pub fn on_connected(&mut self, hook: impl FnMut(&mut ServerConnection) + 'static) {
        self.hooks.on_connected = Some(Box::new(hook));
    }

    pub fn on_disconnected(&mut self, hook: impl FnMut(&mut ServerConnection) + 'static) {
        self.hooks.on_disconnected = Some(Box::new(hook));
    }

    pub fn on_exception(
        &mut self,
        hook: impl FnMut(ConnectionId, &(dyn std::error::Error)) + 'static,
    ) {
        self.hooks.on_exception = Some(Box::new(hook));
    }

    /// Replace the default command-table dispatch entirely.
    pub fn on_execute(&mut self, hook: impl FnMut(&mut ServerConnection) -> HookResult + 'static) {
        self.hooks.on_execute = Some(Box::new(hook));
    }

    pub fn on_access_log(&mut self, hook: impl FnMut(&mut ServerConnection) + 'static) {
        self.hooks.on_access_log = Some(Box::new(hook));
    }

    /// Register a command handler for an HTTP method.
    pub fn add_command(
        &mut self,
        method: &str,
        callback: impl FnMut(&mut ServerConnection) -> HookResult + 'static,
    ) {
        self.commands.push(CommandHandler {
            method: method.into(),
            enabled: true,
            callback: Box::new(callback),
        });
    }

    /// Enable or disable a registered command by method name.
    pub fn set_command_enabled(&mut self, method: &str, enabled: bool) {
        for command in &mut self.commands {
            if command.method.eq_ignore_ascii_case(method) {
                command.enabled = enabled;
            }
        }
    }

    #[must_use]
    pub fn connection(&self, id: ConnectionId) -> Option<&ServerConnection> {
        self.connections.get(&id)
    }

    pub fn connection_mut(&mut self, id: ConnectionId) -> Option<&mut ServerConnection> {
        self.connections.get_mut(&id)
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn connection_ids(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.connections.keys().copied()
    }

    /// Accept event: bind a freshly accepted endpoint to a new connection.
    pub fn on_accept(&mut self, transport: Box<dyn Transport>) -> ConnectionId {
        let id = self.next_id;
        self.next_id += 1;

        let mut connection = ServerConnection::new(id, transport);
        connection.set_identity(&self.config.server_name, &self.config.allowed_methods);
        self.connections.insert(id, connection);

        if let Some(hook) = self.hooks.on_connected.as_mut() {
            if let Some(connection) = self.connections.get_mut(&id) {
                hook(connection);
            }
        }
        id
    }

    /// Readable event: parse whatever arrived and dispatch on the verdict.
    pub fn on_read(&mut self, id: ConnectionId) {
        let parsed = match self.connections.get_mut(&id) {
            Some(connection) => connection.parse_input(),
            None => return,
        };

        match parsed {
            Err(err) => {
                self.fire_exception(id, &err);
                self.drop_connection(id);
            }
            Ok(false) => {}
            Ok(true) => {
                let status = self
                    .connections
                    .get(&id)
                    .map(ServerConnection::status);
                match status {
                    Some(ConnectionStatus::RequestError) => {
                        if let Some(connection) = self.connections.get_mut(&id) {
                            let result = connection.send_stock_reply(Status::BadRequest, false);
                            connection.clear();
                            if let Err(err) = result {
                                self.fire_exception(id, &err);
                                self.drop_connection(id);
                                return;
                            }
                        }
                        self.fire_reply_hooks(id);
                    }
                    Some(ConnectionStatus::RequestOk) => self.execute(id),
                    _ => {}
                }
            }
        }
    }

    /// Writable event: drain the output buffer; once a ready reply is
    /// fully flushed the cycle completes and a close-flagged connection
    /// goes away.
    pub fn on_write(&mut self, id: ConnectionId) {
        let flushed = match self.connections.get_mut(&id) {
            Some(connection) => connection.flush(),
            None => return,
        };

        match flushed {
            Err(err) => {
                self.fire_exception(id, &err);
                self.drop_connection(id);
            }
            Ok(true) => {
                let Some(connection) = self.connections.get_mut(&id) else {
                    return;
                };
                if connection.status() == ConnectionStatus::ReplyReady {
                    connection.set_status(ConnectionStatus::ReplySent);
                    connection.clear();
                    if connection.protocol() == Protocol::WebSocket {
                        connection.clear_frames();
                    }
                    if connection.close_connection() {
                        self.drop_connection(id);
                    }
                }
            }
            Ok(false) => {}
        }
    }

    /// Idle-timeout event: answer 504 only when a request had already been
    /// promoted to `RequestOk`; otherwise the disconnect is silent.
    pub fn on_timeout(&mut self, id: ConnectionId) {
        if let Some(connection) = self.connections.get_mut(&id) {
            if connection.status() == ConnectionStatus::RequestOk {
                if let Err(err) = connection.send_stock_reply(Status::GatewayTimeout, true) {
                    self.fire_exception(id, &err);
                }
            }
        }
        self.drop_connection(id);
    }

    /// Route a request to `on_execute` or the command table; a request
    /// nothing claims gets a stock `501 Not Implemented`.
    fn execute(&mut self, id: ConnectionId) {
        let result = self.run_handlers(id);
        if let Err(err) = result {
            self.fire_exception(id, err.as_ref());
            self.drop_connection(id);
            return;
        }

        let Some(connection) = self.connections.get_mut(&id) else {
            return;
        };
        if connection.protocol() == Protocol::WebSocket
            && connection.status() != ConnectionStatus::ReplyReady
        {
            // Message consumed without a queued reply; ready for the next
            // inbound frame.
            connection.clear_frames();
            connection.set_status(ConnectionStatus::WaitRequest);
        }

        self.fire_reply_hooks(id);
    }

    fn run_handlers(&mut self, id: ConnectionId) -> HookResult {
        if let Some(hook) = self.hooks.on_request.as_mut() {
            if let Some(connection) = self.connections.get_mut(&id) {
                hook(connection)?;
            }
        }

        let Some(connection) = self.connections.get_mut(&id) else {
            return Ok(());
        };
        if connection.status() != ConnectionStatus::RequestOk {
            // The request hook already produced a reply.
            return Ok(());
        }

        if let Some(execute) = self.hooks.on_execute.as_mut() {
            return execute(connection);
        }

        let method = connection.request().method.clone();
        for command in &mut self.commands {
            if command.enabled && command.method.eq_ignore_ascii_case(&method) {
                if let Some(connection) = self.connections.get_mut(&id) {
                    return (command.callback)(connection);
                }
            }
        }

        if let Some(connection) = self.connections.get_mut(&id) {
            if connection.protocol() == Protocol::Http {
                connection.send_stock_reply(Status::NotImplemented, false)?;
            }
        }
        Ok(())
    }

    fn fire_reply_hooks(&mut self, id: ConnectionId) {
        let ready = self
            .connections
            .get(&id)
            .is_some_and(|c| c.status() == ConnectionStatus::ReplyReady
                || c.status() == ConnectionStatus::ReplySent);
        if !ready {
            return;
        }

        if let Some(hook) = self.hooks.on_reply.as_mut() {
            if let Some(connection) = self.connections.get_mut(&id) {
                hook(connection);
            }
        }
        if let Some(hook) = self.hooks.on_access_log.as_mut() {
            if let Some(connection) = self.connections.get_mut(&id) {
                hook(connection);
            }
        }
    }

    fn fire_exception(&mut self, id: ConnectionId, error: &(dyn std::error::Error)) {
        if let Some(hook) = self.hooks.on_exception.as_mut() {
            hook(id, error);
        }
    }

    /// Disconnect and remove a connection, firing `on_disconnected`.
    pub fn drop_connection(&mut self, id: ConnectionId) {
        if let Some(hook) = self.hooks.on_disconnected.as_mut() {
            if let Some(connection) = self.connections.get_mut(&id) {
                hook(connection);
            }
        }
        if let Some(mut connection) = self.connections.remove(&id) {
            connection.disconnect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ContentType;
    use crate::testio::{FailingTransport, MemoryTransport};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn accept(server: &mut HttpServer) -> (MemoryTransport, ConnectionId) {
        let transport = MemoryTransport::new();
        let peer = transport.clone();
        let id = server.on_accept(Box::new(transport));
        (peer, id)
    }

    #[test]
    fn request_hook_serves_a_reply() {
        let mut server = HttpServer::new(ServerConfig::new().with_server_name("t"));
        server.on_request(|conn| {
            conn.reply().content = b"hello".to_vec();
            conn.reply().content_type = ContentType::Text;
            conn.send_reply(Status::Ok, None, false)?;
            Ok(())
        });

        let (peer, id) = accept(&mut server);
        peer.push_input(b"GET / HTTP/1.1\r\nHost: h\r\nConnection: keep-alive\r\n\r\n");
        server.on_read(id);

        assert_eq!(
            server.connection(id).unwrap().status(),
            ConnectionStatus::ReplyReady
        );
        server.on_write(id);
        let text = String::from_utf8_lossy(&peer.take_output()).into_owned();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.ends_with("hello"));

        // keep-alive: the connection survives the cycle.
        assert!(server.connection(id).is_some());
        assert_eq!(
            server.connection(id).unwrap().status(),
            ConnectionStatus::ReplySent
        );
    }

    #[test]
    fn parse_error_yields_stock_400_and_close() {
        let mut server = HttpServer::new(ServerConfig::default());
        let (peer, id) = accept(&mut server);

        peer.push_input(b"BROKEN\x01LINE\r\n\r\n");
        server.on_read(id);
        server.on_write(id);

        let text = String::from_utf8_lossy(&peer.take_output()).into_owned();
        assert!(text.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        // Close-flagged reply tears the connection down after the flush.
        assert!(server.connection(id).is_none());
    }

    #[test]
    fn unclaimed_request_gets_501() {
        let mut server = HttpServer::new(ServerConfig::default());
        let (peer, id) = accept(&mut server);

        peer.push_input(b"BREW /pot HTTP/1.1\r\nHost: h\r\n\r\n");
        server.on_read(id);
        server.on_write(id);

        let text = String::from_utf8_lossy(&peer.take_output()).into_owned();
        assert!(text.starts_with("HTTP/1.1 501 Not Implemented\r\n"));
        assert!(text.contains("Allow: OPTIONS, GET\r\n"));
    }

    #[test]
    fn command_table_dispatches_by_method() {
        let mut server = HttpServer::new(ServerConfig::default());
        server.add_command("GET", |conn| {
            conn.reply().content = b"indexed".to_vec();
            conn.send_reply(Status::Ok, None, false)?;
            Ok(())
        });

        let (peer, id) = accept(&mut server);
        peer.push_input(b"GET / HTTP/1.1\r\nHost: h\r\n\r\n");
        server.on_read(id);
        server.on_write(id);

        let text = String::from_utf8_lossy(&peer.take_output()).into_owned();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.ends_with("indexed"));
    }

    #[test]
    fn timeout_after_request_ok_sends_504() {
        let mut server = HttpServer::new(ServerConfig::default());
        // No handlers: the request parses to RequestOk and stays there
        // until on_execute would run; install an execute hook that leaves
        // the request pending to simulate a stalled application.
        server.on_execute(|_conn| Ok(()));

        let (peer, id) = accept(&mut server);
        peer.push_input(b"GET / HTTP/1.1\r\nHost: h\r\n\r\n");
        server.on_read(id);
        assert_eq!(
            server.connection(id).unwrap().status(),
            ConnectionStatus::RequestOk
        );

        server.on_timeout(id);
        let text = String::from_utf8_lossy(&peer.take_output()).into_owned();
        assert!(text.starts_with("HTTP/1.1 504 Gateway Timeout\r\n"));
        assert!(server.connection(id).is_none());
    }

    #[test]
    fn timeout_before_request_ok_is_silent() {
        let mut server = HttpServer::new(ServerConfig::default());
        let (peer, id) = accept(&mut server);

        peer.push_input(b"GET / HT");
        server.on_read(id);
        server.on_timeout(id);

        assert!(peer.take_output().is_empty());
        assert!(server.connection(id).is_none());
    }

    #[test]
    fn transport_failure_routes_to_exception_hook() {
        let mut server = HttpServer::new(ServerConfig::default());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        server.on_exception(move |id, err| {
            log.borrow_mut().push(format!("{id}: {err}"));
        });

        let id = server.on_accept(Box::new(FailingTransport));
        server.on_read(id);

        assert_eq!(seen.borrow().len(), 1);
        assert!(seen.borrow()[0].contains("read failed"));
        assert!(server.connection(id).is_none());
    }

    #[test]
    fn handler_failure_disconnects() {
        let mut server = HttpServer::new(ServerConfig::default());
        let seen = Rc::new(RefCell::new(0));
        let count = seen.clone();
        server.on_exception(move |_, _| *count.borrow_mut() += 1);
        server.on_request(|_conn| Err("handler blew up".into()));

        let (peer, id) = accept(&mut server);
        peer.push_input(b"GET / HTTP/1.1\r\nHost: h\r\n\r\n");
        server.on_read(id);

        assert_eq!(*seen.borrow(), 1);
        assert!(server.connection(id).is_none());
    }

    #[test]
    fn partial_write_resumes_on_next_writable_event() {
        let mut server = HttpServer::new(ServerConfig::default());
        server.on_request(|conn| {
            conn.reply().content = b"0123456789".to_vec();
            conn.send_reply(Status::Ok, None, false)?;
            Ok(())
        });

        let (peer, id) = accept(&mut server);
        peer.set_write_limit(Some(16));
        peer.push_input(b"GET / HTTP/1.1\r\nHost: h\r\nConnection: keep-alive\r\n\r\n");
        server.on_read(id);

        server.on_write(id);
        assert_eq!(
            server.connection(id).unwrap().status(),
            ConnectionStatus::ReplyReady
        );

        peer.set_write_limit(None);
        server.on_write(id);
        assert_eq!(
            server.connection(id).unwrap().status(),
            ConnectionStatus::ReplySent
        );
        let text = String::from_utf8_lossy(&peer.take_output()).into_owned();
        assert!(text.ends_with("0123456789"));
    }
}
