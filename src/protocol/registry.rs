//! Event and ack listener registry.
//!
//! Two independent stores map an event name to an ordered list of listeners:
//! plain listeners receive the argument array, ack listeners additionally
//! receive an optional [`AckCallback`]. Registration order is invocation order.
//!
//! `on_*` hands back a [`ListenerId`]; `off_*` removes by that identity, so
//! registering the same closure twice yields two independently removable
//! entries.
//!
//! Both stores sit behind an `RwLock` and are safe to mutate from any thread
//! while packets are being dispatched. Dispatch snapshots the listener list
//! and releases the lock before calling user code, so a listener may register
//! or remove listeners without deadlocking.

use crate::core::packet::Packet;
use crate::core::value::Value;
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::ack::AckCallback;
use crate::transport::PacketSink;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, trace};

/// Listener that receives only the argument array.
pub type EventListener = dyn Fn(&[Value]) + Send + Sync + 'static;

/// Listener that also receives an emit-back callback when the sender expects
/// an acknowledgement. `None` means no acknowledgement will be sent.
pub type AckListener = dyn Fn(&[Value], Option<AckCallback>) + Send + Sync + 'static;

/// Registration token returned by `on_event`/`on_ack`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct ListenerMap<L: ?Sized> {
    buckets: RwLock<HashMap<Value, Vec<(ListenerId, Arc<L>)>>>,
}

impl<L: ?Sized> ListenerMap<L> {
    fn new() -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
        }
    }

    fn insert(&self, name: Value, id: ListenerId, listener: Arc<L>) -> Result<()> {
        let mut buckets = self
            .buckets
            .write()
            .map_err(|_| ProtocolError::LockPoisoned(constants::ERR_REGISTRY_WRITE_LOCK))?;
        buckets.entry(name).or_default().push((id, listener));
        Ok(())
    }

    fn remove(&self, name: &Value, id: ListenerId) -> Result<bool> {
        let mut buckets = self
            .buckets
            .write()
            .map_err(|_| ProtocolError::LockPoisoned(constants::ERR_REGISTRY_WRITE_LOCK))?;
        // Emptied buckets stay in the map
        let Some(bucket) = buckets.get_mut(name) else {
            return Ok(false);
        };
        let before = bucket.len();
        bucket.retain(|(existing, _)| *existing != id);
        Ok(bucket.len() != before)
    }

    fn snapshot(&self, name: &Value) -> Result<Vec<Arc<L>>> {
        let buckets = self
            .buckets
            .read()
            .map_err(|_| ProtocolError::LockPoisoned(constants::ERR_REGISTRY_READ_LOCK))?;
        Ok(buckets
            .get(name)
            .map(|bucket| bucket.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default())
    }

    fn count(&self, name: &Value) -> usize {
        self.buckets
            .read()
            .map(|b| b.get(name).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    fn contains_key(&self, name: &Value) -> bool {
        self.buckets
            .read()
            .map(|b| b.contains_key(name))
            .unwrap_or(false)
    }
}

/// Name-keyed listener stores and the logic that invokes them.
pub struct Registry {
    next_id: AtomicU64,
    events: ListenerMap<EventListener>,
    acks: ListenerMap<AckListener>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            events: ListenerMap::new(),
            acks: ListenerMap::new(),
        }
    }

    fn allocate_id(&self) -> ListenerId {
        ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a plain listener. A null event name registers nothing.
    pub fn on_event<F>(&self, name: impl Into<Value>, listener: F) -> Result<Option<ListenerId>>
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        let name = name.into();
        if name.is_null() {
            return Ok(None);
        }
        let id = self.allocate_id();
        trace!(event = %name, ?id, "Event listener registered");
        self.events.insert(name, id, Arc::new(listener))?;
        Ok(Some(id))
    }

    /// Remove a plain listener. Returns false if it was not registered.
    pub fn off_event(&self, name: impl Into<Value>, id: ListenerId) -> Result<bool> {
        self.events.remove(&name.into(), id)
    }

    /// Register an ack listener. A null event name registers nothing.
    pub fn on_ack<F>(&self, name: impl Into<Value>, listener: F) -> Result<Option<ListenerId>>
    where
        F: Fn(&[Value], Option<AckCallback>) + Send + Sync + 'static,
    {
        let name = name.into();
        if name.is_null() {
            return Ok(None);
        }
        let id = self.allocate_id();
        trace!(event = %name, ?id, "Ack listener registered");
        self.acks.insert(name, id, Arc::new(listener))?;
        Ok(Some(id))
    }

    /// Remove an ack listener. Returns false if it was not registered.
    pub fn off_ack(&self, name: impl Into<Value>, id: ListenerId) -> Result<bool> {
        self.acks.remove(&name.into(), id)
    }

    pub fn event_listener_count(&self, name: &Value) -> usize {
        self.events.count(name)
    }

    pub fn ack_listener_count(&self, name: &Value) -> usize {
        self.acks.count(name)
    }

    /// Whether an entry exists for `name`, even an emptied one.
    pub fn has_event_entry(&self, name: &Value) -> bool {
        self.events.contains_key(name)
    }

    /// Invoke every plain listener for `name` in registration order.
    ///
    /// Returns the number of listeners invoked.
    pub fn dispatch_event(&self, name: &Value, args: &[Value]) -> Result<usize> {
        let listeners = self.events.snapshot(name)?;
        for listener in &listeners {
            listener(args);
        }
        trace!(event = %name, invoked = listeners.len(), "Dispatched event");
        Ok(listeners.len())
    }

    /// Invoke every ack listener for `name` in registration order.
    ///
    /// Each listener gets its own [`AckCallback`] bound to `id` when the sender
    /// expects an acknowledgement, and `None` otherwise.
    pub fn dispatch_ack(
        &self,
        name: &Value,
        id: Option<u64>,
        args: &[Value],
        sink: &Arc<dyn PacketSink>,
    ) -> Result<usize> {
        let listeners = self.acks.snapshot(name)?;
        for listener in &listeners {
            let callback = id.map(|id| AckCallback::new(id, Arc::clone(sink)));
            listener(args, callback);
        }
        trace!(event = %name, ?id, invoked = listeners.len(), "Dispatched ack listeners");
        Ok(listeners.len())
    }

    /// Split an EVENT payload into `[name, args...]` and dispatch to both
    /// stores. Non-array or empty payloads dispatch nothing.
    pub fn dispatch_packet(&self, packet: &Packet, sink: &Arc<dyn PacketSink>) -> Result<usize> {
        let Some((name, args)) = packet.payload_items().and_then(<[Value]>::split_first) else {
            debug!(packet = %packet, "Event packet without name ignored");
            return Ok(0);
        };
        let invoked = self.dispatch_event(name, args)?;
        Ok(invoked + self.dispatch_ack(name, packet.id, args, sink)?)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
