//! Client shell and the proxy pairing that forwards a server-side
//! request over an outbound connection.

use std::collections::HashMap;

use crate::connection::{ClientConnection, ConnectionId, ConnectionStatus, Transport};
use crate::request::Request;
use crate::server::{HookError, HookResult};

/// Default `User-Agent` for outbound requests.
pub const DEFAULT_CLIENT_NAME: &str = concat!("tidewire/", env!("CARGO_PKG_VERSION"));

type ClientHook = Box<dyn FnMut(&mut ClientConnection) -> HookResult>;
type ClientNotifyHook = Box<dyn FnMut(&mut ClientConnection)>;
type ExceptionHook = Box<dyn FnMut(ConnectionId, &(dyn std::error::Error))>;

/// Client configuration: the origin to connect to and the agent name
/// stamped onto requests.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub client_name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 80,
            client_name: DEFAULT_CLIENT_NAME.into(),
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_client_name(mut self, name: &str) -> Self {
        self.client_name = name.into();
        self
    }
}

#[derive(Default)]
struct ClientHooks {
    on_request: Option<ClientNotifyHook>,
    on_reply: Option<ClientHook>,
    on_connected: Option<ClientNotifyHook>,
    on_disconnected: Option<ClientNotifyHook>,
    on_exception: Option<ExceptionHook>,
    on_execute: Option<ClientHook>,
}

/// HTTP client shell over a connection registry; the reactor reports
/// connect/read/write/timeout events and this shell drives the bound
/// [`ClientConnection`]s.
pub struct HttpClient {
    config: ClientConfig,
    hooks: ClientHooks,
    connections: HashMap<ConnectionId, ClientConnection>,
    next_id: ConnectionId,
}

impl HttpClient {
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            hooks: ClientHooks::default(),
            connections: HashMap::new(),
            next_id: 1,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn on_request(&mut self, hook: impl FnMut(&mut ClientConnection) + 'static) {
        self.hooks.on_request = Some(Box::new(hook));
    }

    pub fn on_reply(&mut self, hook: impl FnMut(&mut ClientConnection) -> HookResult + 'static) {
        self.hooks.on_reply = Some(Box::new(hook));
    }

    pub fn on_connected(&mut self, hook: impl FnMut(&mut ClientConnection) + 'static) {
        self.hooks.on_connected = Some(Box::new(hook));
    }

    pub fn on_disconnected(&mut self, hook: impl FnMut(&mut ClientConnection) + 'static) {
        self.hooks.on_disconnected = Some(Box::new(hook));
    }

    pub fn on_exception(
        &mut self,
        hook: impl FnMut(ConnectionId, &(dyn std::error::Error)) + 'static,
    ) {
        self.hooks.on_exception = Some(Box::new(hook));
    }

    /// Override the default reply handling.
    pub fn on_execute(&mut self, hook: impl FnMut(&mut ClientConnection) -> HookResult + 'static) {
        self.hooks.on_execute = Some(Box::new(hook));
    }

    #[must_use]
    pub fn connection(&self, id: ConnectionId) -> Option<&ClientConnection> {
        self.connections.get(&id)
    }

    pub fn connection_mut(&mut self, id: ConnectionId) -> Option<&mut ClientConnection> {
        self.connections.get_mut(&id)
    }

    /// Connect-completed event: bind the endpoint to a new connection and
    /// let the application prepare its request.
    pub fn on_connect(&mut self, transport: Box<dyn Transport>) -> ConnectionId {
        let id = self.next_id;
        self.next_id += 1;

        let mut connection = ClientConnection::new(id, transport);
        connection.set_origin(&self.config.host, self.config.port, &self.config.client_name);
        self.connections.insert(id, connection);

        if let Some(hook) = self.hooks.on_connected.as_mut() {
            if let Some(connection) = self.connections.get_mut(&id) {
                hook(connection);
            }
        }
        if let Some(hook) = self.hooks.on_request.as_mut() {
            if let Some(connection) = self.connections.get_mut(&id) {
                hook(connection);
            }
        }
        id
    }

    /// Readable event: parse the reply; a complete one is handed to the
    /// application, then the slot is cleared for the next cycle.
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
                let status = self.connections.get(&id).map(ClientConnection::status);
                match status {
                    Some(ConnectionStatus::ReplyError) => {
                        if let Some(connection) = self.connections.get_mut(&id) {
                            connection.clear();
                        }
                    }
                    Some(ConnectionStatus::ReplyOk) => {
                        if let Err(err) = self.execute(id) {
                            self.fire_exception(id, err.as_ref());
                            self.drop_connection(id);
                            return;
                        }
                        let close = match self.connections.get_mut(&id) {
                            Some(connection) => {
                                connection.clear();
                                connection.close_connection()
                            }
                            None => return,
                        };
                        if close {
                            self.drop_connection(id);
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    /// Writable event: drain the output buffer; a fully flushed request
    /// advances to `RequestSent` and the reply wait begins.
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
                if let Some(connection) = self.connections.get_mut(&id) {
                    if connection.status() == ConnectionStatus::RequestReady {
                        connection.set_status(ConnectionStatus::RequestSent);
                    }
                }
            }
            Ok(false) => {}
        }
    }

    /// Idle-timeout event: tear the connection down.
    pub fn on_timeout(&mut self, id: ConnectionId) {
        self.drop_connection(id);
    }

    fn execute(&mut self, id: ConnectionId) -> Result<(), HookError> {
        if let Some(execute) = self.hooks.on_execute.as_mut() {
            if let Some(connection) = self.connections.get_mut(&id) {
                return execute(connection);
            }
        }
        if let Some(hook) = self.hooks.on_reply.as_mut() {
            if let Some(connection) = self.connections.get_mut(&id) {
                return hook(connection);
            }
        }
        Ok(())
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

/// An outbound request bound to an inbound server connection: the reply
/// the proxy receives is meant to be relayed back to that connection.
pub struct HttpProxy {
    server_connection: crate::connection::ConnectionId,
    request: Request,
    client: HttpClient,
    client_connection: Option<ConnectionId>,
}

impl HttpProxy {
    #[must_use]
    pub fn new(server_connection: crate::connection::ConnectionId, config: ClientConfig) -> Self {
        let mut request = Request::new();
        request.host = config.host.clone();
        request.port = config.port;
        request.user_agent = config.client_name.clone();
        Self {
            server_connection,
            request,
            client: HttpClient::new(config),
            client_connection: None,
        }
    }

    /// The server-side connection this proxy answers for.
    #[must_use]
    pub fn server_connection(&self) -> crate::connection::ConnectionId {
        self.server_connection
    }

    /// The request to forward; populate before the connect completes.
    pub fn request(&mut self) -> &mut Request {
        &mut self.request
    }

    pub fn client(&mut self) -> &mut HttpClient {
        &mut self.client
    }

    /// Connect-completed event: copy the prepared request onto the new
    /// connection and transmit it at once.
    pub fn on_connect(&mut self, transport: Box<dyn Transport>) -> std::io::Result<ConnectionId> {
        let id = self.client.on_connect(transport);
        if let Some(connection) = self.client.connection_mut(id) {
            *connection.request() = self.request.clone();
            connection.send_request(true)?;
        }
        self.client_connection = Some(id);
        Ok(id)
    }

    #[must_use]
    pub fn client_connection(&self) -> Option<ConnectionId> {
        self.client_connection
    }
}

/// Registry of proxies keyed by the server connection they serve.
#[derive(Default)]
pub struct ProxyManager {
    proxies: Vec<HttpProxy>,
}

impl ProxyManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a proxy for a server connection.
    pub fn add(
        &mut self,
        server_connection: crate::connection::ConnectionId,
        config: ClientConfig,
    ) -> &mut HttpProxy {
        self.proxies.push(HttpProxy::new(server_connection, config));
        self.proxies.last_mut().expect("just pushed")
    }

    pub fn find(&mut self, server_connection: crate::connection::ConnectionId) -> Option<&mut HttpProxy> {
        self.proxies
            .iter_mut()
            .find(|p| p.server_connection == server_connection)
    }

    pub fn remove(&mut self, server_connection: crate::connection::ConnectionId) {
        self.proxies
            .retain(|p| p.server_connection != server_connection);
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.proxies.len()
    }
}
