//! Message correlation and session management.
//!
//! A [`Session`] is the application-scoped context for one logical
//! client. It is bound to exactly one live connection at a time and can
//! be retargeted with [`Session::switch_connection`] when the client
//! reconnects. Connections are referenced by [`ConnectionId`] handles;
//! the connection side of the link is a `"session"` entry in the
//! connection's named-data map, so neither side owns the other.

use serde_json::Value;
use tidewire_http::connection::{ConnectionId, ServerConnection};
use tidewire_http::server::{HookError, HookResult};

use crate::wsproto::{self, MessageType, WsMessage};

/// Key of the session slot in a connection's named-data map.
pub const SESSION_DATA_KEY: &str = "session";

/// Callback invoked when the `CallResult`/`CallError` matching a sent
/// `Call` arrives.
pub type MessageCallback = Box<dyn FnMut(&WsMessage, &mut ServerConnection) -> HookResult>;

/// A pending `Call` awaiting its result.
pub struct MessageHandler {
    unique_id: String,
    action: String,
    callback: MessageCallback,
}

impl MessageHandler {
    #[must_use]
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }
}

impl std::fmt::Debug for MessageHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageHandler")
            .field("unique_id", &self.unique_id)
            .field("action", &self.action)
            .finish_non_exhaustive()
    }
}

/// Registry of pending calls keyed by unique id.
#[derive(Debug, Default)]
pub struct MessageManager {
    handlers: Vec<MessageHandler>,
}

impl MessageManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    #[must_use]
    pub fn find_message_by_id(&self, unique_id: &str) -> Option<&MessageHandler> {
        self.handlers.iter().find(|h| h.unique_id == unique_id)
    }

    /// Issue a `Call`: register a handler under a fresh unique id,
    /// serialize the envelope into the connection's outbound frame and
    /// transmit it. Returns the unique id.
    pub fn send_call(
        &mut self,
        connection: &mut ServerConnection,
        action: &str,
        payload: &Value,
        callback: MessageCallback,
    ) -> std::io::Result<String> {
        let unique_id = wsproto::unique_id();
        let text = wsproto::call(&unique_id, action, payload);

        connection.frame_out().set_payload_text(&text);
        connection.send_web_socket(true)?;

        self.handlers.push(MessageHandler {
            unique_id: unique_id.clone(),
            action: action.into(),
            callback,
        });
        Ok(unique_id)
    }

    /// Route an inbound `CallResult`/`CallError` to its pending handler.
    ///
    /// The handler is removed before it runs, so it fires exactly once;
    /// a message with no matching handler returns `Ok(false)` and leaves
    /// the registry untouched. Unmatched handlers persist until the
    /// session ends.
    pub fn dispatch(
        &mut self,
        message: &WsMessage,
        connection: &mut ServerConnection,
    ) -> Result<bool, HookError> {
        if !matches!(
            message.message_type,
            MessageType::CallResult | MessageType::CallError
        ) {
            return Ok(false);
        }

        let Some(index) = self
            .handlers
            .iter()
            .position(|h| h.unique_id == message.unique_id)
        else {
            return Ok(false);
        };

        let mut handler = self.handlers.remove(index);
        (handler.callback)(message, connection)?;
        Ok(true)
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

/// Application context bound to one live connection at a time.
#[derive(Debug)]
pub struct Session {
    connection: ConnectionId,
    messages: MessageManager,
    update_count: u32,
    pub authorized: bool,
    pub session_id: String,
    pub identity: String,
    pub ip: String,
}

impl Session {
    #[must_use]
    pub fn new(connection: ConnectionId) -> Self {
        Self {
            connection,
            messages: MessageManager::new(),
            update_count: 0,
            authorized: false,
            session_id: String::new(),
            identity: String::new(),
            ip: String::new(),
        }
    }

    #[must_use]
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    pub fn messages(&mut self) -> &mut MessageManager {
        &mut self.messages
    }

    #[must_use]
    pub fn update_count(&self) -> u32 {
        self.update_count
    }

    pub fn begin_update(&mut self) {
        self.update_count += 1;
    }

    pub fn end_update(&mut self) {
        self.update_count = self.update_count.saturating_sub(1);
    }

    /// Write this session's slot into a connection's named-data map.
    pub fn attach_to(&self, connection: &mut ServerConnection) {
        connection
            .data_mut()
            .insert(SESSION_DATA_KEY.into(), self.session_id.clone());
    }

    /// Remove this session's slot from a connection's named-data map.
    pub fn detach_from(&self, connection: &mut ServerConnection) {
        connection.data_mut().remove(SESSION_DATA_KEY);
    }

    /// Atomically rebind the session: the old connection is disconnected
    /// and unlinked, the new one linked, with the change bracketed by
    /// `begin_update`/`end_update`.
    pub fn switch_connection(
        &mut self,
        old_connection: &mut ServerConnection,
        new_connection: &mut ServerConnection,
    ) {
        if old_connection.id() == new_connection.id() {
            return;
        }
        self.begin_update();
        old_connection.disconnect();
        self.detach_from(old_connection);
        self.connection = new_connection.id();
        self.attach_to(new_connection);
        self.end_update();
    }
}

/// Registry of sessions with the lookup set the application layer needs.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: Vec<Session>,
}

impl SessionManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    /// Create a session bound to `connection` and link the connection's
    /// session slot.
    pub fn add(&mut self, connection: &mut ServerConnection) -> &mut Session {
        let session = Session::new(connection.id());
        session.attach_to(connection);
        self.sessions.push(session);
        self.sessions.last_mut().expect("just pushed")
    }

    #[must_use]
    pub fn find(&self, session_id: &str, identity: &str) -> Option<&Session> {
        self.sessions
            .iter()
            .find(|s| s.session_id == session_id && s.identity == identity)
    }

    pub fn find_mut(&mut self, session_id: &str, identity: &str) -> Option<&mut Session> {
        self.sessions
            .iter_mut()
            .find(|s| s.session_id == session_id && s.identity == identity)
    }

    #[must_use]
    pub fn find_by_session(&self, session_id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.session_id == session_id)
    }

    pub fn find_by_session_mut(&mut self, session_id: &str) -> Option<&mut Session> {
        self.sessions
            .iter_mut()
            .find(|s| s.session_id == session_id)
    }

    #[must_use]
    pub fn find_by_identity(&self, identity: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.identity == identity)
    }

    #[must_use]
    pub fn find_by_ip(&self, ip: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.ip == ip)
    }

    #[must_use]
    pub fn find_by_connection(&self, connection: ConnectionId) -> Option<&Session> {
        self.sessions.iter().find(|s| s.connection == connection)
    }

    pub fn find_by_connection_mut(&mut self, connection: ConnectionId) -> Option<&mut Session> {
        self.sessions
            .iter_mut()
            .find(|s| s.connection == connection)
    }

    /// Drop a session, e.g. when its client is gone for good. Pending
    /// message handlers go with it.
    pub fn remove_by_session(&mut self, session_id: &str) {
        self.sessions.retain(|s| s.session_id != session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tidewire_http::testio::MemoryTransport;

    fn ws_connection(id: ConnectionId) -> (MemoryTransport, ServerConnection) {
        let transport = MemoryTransport::new();
        let peer = transport.clone();
        let conn = ServerConnection::new(id, Box::new(transport));
        (peer, conn)
    }

    #[test]
    fn call_registers_handler_and_transmits() {
        let (peer, mut conn) = ws_connection(1);
        let mut manager = MessageManager::new();

        let uid = manager
            .send_call(&mut conn, "ping", &json!({}), Box::new(|_, _| Ok(())))
            .unwrap();

        assert_eq!(uid.len(), 42);
        assert_eq!(manager.count(), 1);
        assert_eq!(manager.find_message_by_id(&uid).unwrap().action(), "ping");

        let wire = peer.take_output();
        // Unmasked server-to-client text frame carrying the envelope.
        assert_eq!(wire[0], 0x81);
        let body = String::from_utf8_lossy(&wire[2..]).into_owned();
        assert!(body.contains("\"t\":2"));
        assert!(body.contains(&format!("\"u\":\"{uid}\"")));
        assert!(body.contains("\"a\":\"ping\""));
    }

    #[test]
    fn matching_result_fires_handler_exactly_once() {
        let (_peer, mut conn) = ws_connection(1);
        let mut manager = MessageManager::new();
        let fired = Rc::new(RefCell::new(0));
        let count = fired.clone();

        let uid = manager
            .send_call(
                &mut conn,
                "ping",
                &json!({}),
                Box::new(move |message, _conn| {
                    assert_eq!(message.payload["pong"], true);
                    *count.borrow_mut() += 1;
                    Ok(())
                }),
            )
            .unwrap();

        let mut result = WsMessage::new(MessageType::CallResult);
        result.unique_id = uid.clone();
        result.payload = json!({"pong": true});

        assert!(manager.dispatch(&result, &mut conn).unwrap());
        assert_eq!(*fired.borrow(), 1);
        assert_eq!(manager.count(), 0);

        // A second identical result finds no handler.
        assert!(!manager.dispatch(&result, &mut conn).unwrap());
        assert_eq!(*fired.borrow(), 1);
    }

    #[test]
    fn mismatched_unique_id_leaves_handler_pending() {
        let (_peer, mut conn) = ws_connection(1);
        let mut manager = MessageManager::new();

        manager
            .send_call(&mut conn, "ping", &json!({}), Box::new(|_, _| Ok(())))
            .unwrap();

        let mut stray = WsMessage::new(MessageType::CallResult);
        stray.unique_id = "0000".into();
        assert!(!manager.dispatch(&stray, &mut conn).unwrap());
        assert_eq!(manager.count(), 1);
    }

    #[test]
    fn switch_connection_relinks_the_session_slot() {
        let (_p1, mut old_conn) = ws_connection(1);
        let (_p2, mut new_conn) = ws_connection(2);

        let mut manager = SessionManager::new();
        let session = manager.add(&mut old_conn);
        session.session_id = "s-1".into();
        session.identity = "alice".into();
        session.attach_to(&mut old_conn);

        let session = manager.find_by_session_mut("s-1").unwrap();
        session.switch_connection(&mut old_conn, &mut new_conn);

        assert_eq!(session.connection(), 2);
        assert_eq!(session.update_count(), 0);
        assert!(!old_conn.data().contains_key(SESSION_DATA_KEY));
        assert_eq!(
            new_conn.data().get(SESSION_DATA_KEY),
            Some(&"s-1".to_string())
        );
        assert!(!old_conn.connected());
    }

    #[test]
    fn session_manager_lookups() {
        let (_p1, mut c1) = ws_connection(1);
        let (_p2, mut c2) = ws_connection(2);

        let mut manager = SessionManager::new();
        {
            let s = manager.add(&mut c1);
            s.session_id = "s-1".into();
            s.identity = "alice".into();
            s.ip = "10.0.0.1".into();
        }
        {
            let s = manager.add(&mut c2);
            s.session_id = "s-2".into();
            s.identity = "bob".into();
            s.ip = "10.0.0.2".into();
        }

        assert_eq!(manager.find_by_session("s-2").unwrap().identity, "bob");
        assert_eq!(manager.find_by_identity("alice").unwrap().session_id, "s-1");
        assert_eq!(manager.find_by_ip("10.0.0.2").unwrap().session_id, "s-2");
        assert_eq!(manager.find_by_connection(1).unwrap().session_id, "s-1");
        assert!(manager.find("s-1", "alice").is_some());
        assert!(manager.find("s-1", "bob").is_none());

        manager.remove_by_session("s-1");
        assert_eq!(manager.count(), 1);
    }
}
