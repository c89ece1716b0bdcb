//! In-memory [`Transport`] for driving connections in tests.
//!
//! The transport is a cloneable handle over shared buffers: the test keeps
//! one clone as the "peer" and hands the other to the connection, then
//! scripts the conversation with [`MemoryTransport::push_input`] and
//! [`MemoryTransport::take_output`]. A write limit simulates a kernel that
//! accepts only part of the output per writable event.

use std::cell::RefCell;
use std::io;
use std::net::SocketAddr;
use std::rc::Rc;

use crate::connection::Transport;

#[derive(Debug, Default)]
struct Inner {
    input: Vec<u8>,
    output: Vec<u8>,
    disconnected: bool,
    write_limit: Option<usize>,
    peer_addr: Option<SocketAddr>,
}

/// Shared-buffer transport; see the module docs.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    inner: Rc<RefCell<Inner>>,
}

impl MemoryTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes the connection will see on its next read.
    pub fn push_input(&self, bytes: &[u8]) {
        self.inner.borrow_mut().input.extend_from_slice(bytes);
    }

    /// Take everything the connection has written so far.
    #[must_use]
    pub fn take_output(&self) -> Vec<u8> {
        std::mem::take(&mut self.inner.borrow_mut().output)
    }

    /// Cap how many bytes each `write_async` call drains.
    pub fn set_write_limit(&self, limit: Option<usize>) {
        self.inner.borrow_mut().write_limit = limit;
    }

    pub fn set_peer_addr(&self, addr: SocketAddr) {
        self.inner.borrow_mut().peer_addr = Some(addr);
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        !self.inner.borrow().disconnected
    }
}

impl Transport for MemoryTransport {
    fn read_async(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        let mut inner = self.inner.borrow_mut();
        let taken = std::mem::take(&mut inner.input);
        let count = taken.len();
        buf.extend_from_slice(&taken);
        Ok(count)
    }

    fn write_async(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        let mut inner = self.inner.borrow_mut();
        let count = inner.write_limit.map_or(buf.len(), |l| l.min(buf.len()));
        inner.output.extend_from_slice(&buf[..count]);
        buf.drain(..count);
        Ok(count)
    }

    fn connected(&self) -> bool {
        !self.inner.borrow().disconnected
    }

    fn disconnect(&mut self) {
        self.inner.borrow_mut().disconnected = true;
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.inner.borrow().peer_addr
    }
}

/// A transport whose reads and writes always fail; exercises the
/// exception paths of the shells.
#[derive(Debug, Default)]
pub struct FailingTransport;

impl Transport for FailingTransport {
    fn read_async(&mut self, _buf: &mut Vec<u8>) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "read failed"))
    }

    fn write_async(&mut self, _buf: &mut Vec<u8>) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "write failed"))
    }

    fn connected(&self) -> bool {
        true
    }

    fn disconnect(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_limit_leaves_the_tail_buffered() {
        let mut transport = MemoryTransport::new();
        transport.set_write_limit(Some(3));

        let mut buf = b"abcdef".to_vec();
        assert_eq!(transport.write_async(&mut buf).unwrap(), 3);
        assert_eq!(buf, b"def");
        assert_eq!(transport.take_output(), b"abc");
    }
}
