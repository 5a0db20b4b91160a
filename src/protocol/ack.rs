//! Acknowledgement correlation.
//!
//! Two directions meet here:
//! - **Incoming requests**: an EVENT carrying a correlation id hands each ack
//!   listener an [`AckCallback`]; calling it emits the ACK reply.
//! - **Outgoing requests**: ACK packets from the peer are surfaced to an
//!   [`AckResolver`]. [`AckManager`] is the default one, matching replies to the
//!   one-shot callbacks registered when the requests were sent.

use crate::core::packet::Packet;
use crate::core::value::Value;
use crate::error::{constants, ProtocolError, Result};
use crate::transport::PacketSink;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, instrument};

/// One-shot emit-back capability bound to an incoming packet's correlation id.
pub struct AckCallback {
    id: u64,
    sink: Arc<dyn PacketSink>,
}

impl AckCallback {
    pub(crate) fn new(id: u64, sink: Arc<dyn PacketSink>) -> Self {
        Self { id, sink }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Emit an ACK carrying `args` and this callback's correlation id.
    #[instrument(skip(self, args), fields(id = self.id, len = args.len()))]
    pub fn send(self, args: Vec<Value>) -> Result<()> {
        self.sink.emit(Packet::ack(self.id, args))
    }
}

impl fmt::Debug for AckCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AckCallback").field("id", &self.id).finish()
    }
}

/// Receives the reply array of every incoming ACK.
pub trait AckResolver: Send + Sync {
    fn resolve(&self, id: Option<u64>, args: Vec<Value>);
}

type ReplyFn = Box<dyn FnOnce(Vec<Value>) + Send + 'static>;

/// Table of callbacks waiting for the peer to acknowledge an outgoing request.
#[derive(Default)]
pub struct AckManager {
    next_id: AtomicU64,
    waiting: Mutex<HashMap<u64, ReplyFn>>,
}

impl AckManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reply callback, returning the correlation id to send with the request.
    pub fn register<F>(&self, callback: F) -> Result<u64>
    where
        F: FnOnce(Vec<Value>) + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.waiting
            .lock()
            .map_err(|_| ProtocolError::LockPoisoned(constants::ERR_ACK_TABLE_LOCK))?
            .insert(id, Box::new(callback));
        Ok(id)
    }

    /// Number of requests still waiting for a reply.
    pub fn pending(&self) -> usize {
        self.waiting.lock().map(|w| w.len()).unwrap_or(0)
    }

    /// Forget every waiting callback, e.g. when the connection drops.
    pub fn clear(&self) {
        if let Ok(mut waiting) = self.waiting.lock() {
            waiting.clear();
        }
    }
}

impl AckResolver for AckManager {
    fn resolve(&self, id: Option<u64>, args: Vec<Value>) {
        let Some(id) = id else {
            debug!("ACK without correlation id ignored");
            return;
        };
        // Release the lock before running user code
        let callback = match self.waiting.lock() {
            Ok(mut waiting) => waiting.remove(&id),
            Err(_) => None,
        };
        match callback {
            Some(callback) => callback(args),
            None => debug!(id, "ACK for unknown correlation id ignored"),
        }
    }
}

impl fmt::Debug for AckManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AckManager")
            .field("pending", &self.pending())
            .finish()
    }
}
