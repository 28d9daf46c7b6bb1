use std::collections::VecDeque;
use std::io::ErrorKind;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::trace;

use crate::error::{Result, TransportError};
use crate::traits::SerialLink;

/// In-memory serial link.
///
/// Inbound bytes are scripted up front (or pushed later); every write is
/// recorded. Clones share state, so a clone kept by the caller can inspect
/// what a session wrote after the link itself has been moved into it.
///
/// Reads never block: a read that cannot be satisfied from the scripted
/// bytes consumes what is there and fails with `TransportError::Timeout`.
#[derive(Debug, Clone, Default)]
pub struct MemoryLink {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    inbound: VecDeque<u8>,
    writes: Vec<Vec<u8>>,
    discards: usize,
    closed: bool,
    fail_next_write: Option<ErrorKind>,
}

impl MemoryLink {
    /// An empty link: writes succeed, reads time out.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `bytes` to be returned by subsequent reads.
    pub fn with_inbound(self, bytes: &[u8]) -> Self {
        self.push_inbound(bytes);
        self
    }

    /// Queue `bytes` to be returned by subsequent reads.
    pub fn push_inbound(&self, bytes: &[u8]) {
        self.lock().inbound.extend(bytes.iter().copied());
    }

    /// Make the next write fail with an I/O error of `kind`.
    pub fn fail_next_write(&self, kind: ErrorKind) {
        self.lock().fail_next_write = Some(kind);
    }

    /// Every completed write, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.lock().writes.clone()
    }

    /// All written bytes, concatenated.
    pub fn written(&self) -> Vec<u8> {
        self.lock().writes.concat()
    }

    /// Forget recorded writes.
    pub fn clear_writes(&self) {
        self.lock().writes.clear();
    }

    /// Bytes still waiting to be read.
    pub fn pending_inbound(&self) -> usize {
        self.lock().inbound.len()
    }

    /// Number of `discard_input` calls.
    pub fn discards(&self) -> usize {
        self.lock().discards
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panic while holding the lock leaves plain data behind; keep using it.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SerialLink for MemoryLink {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let mut state = self.lock();
        if state.closed {
            return Err(TransportError::Closed);
        }
        if let Some(kind) = state.fail_next_write.take() {
            return Err(TransportError::Io(std::io::Error::from(kind)));
        }
        trace!(len = bytes.len(), "memory link write");
        state.writes.push(bytes.to_vec());
        Ok(())
    }

    fn read_exact_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> Result<()> {
        let mut state = self.lock();
        if state.closed {
            return Err(TransportError::Closed);
        }

        let available = state.inbound.len().min(buf.len());
        for (slot, byte) in buf.iter_mut().zip(state.inbound.drain(..available)) {
            *slot = byte;
        }

        if available < buf.len() {
            return Err(TransportError::Timeout {
                expected: buf.len(),
                received: available,
                timeout,
            });
        }
        Ok(())
    }

    fn discard_input(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.inbound.clear();
        state.discards += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.lock().closed = true;
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
