//! # Event Client
//!
//! The single ingress point for decoded packets and the listener registration
//! surface exposed to applications.
//!
//! ```text
//! transport ──(Packet, is_binary)──▶ handle_incoming_packet
//!                                        │ route()
//!        ┌────────────┬─────────────┬────┴──────┬──────────────┐
//!     CONNECT     DISCONNECT     EVENT/ERROR    ACK       BINARY_* / attachment
//!        │            │             │            │              │
//!  "connection"   sink.close()   Registry    AckResolver    Reconstructor
//!                                                              │ complete
//!                                                   re-routed as ACK or EVENT
//! ```
//!
//! Packets are expected one at a time, in arrival order. Listeners run
//! synchronously on the calling thread; a slow listener delays the next packet.
//! Registration is safe from any thread at any time.

use crate::config::EventConfig;
use crate::core::packet::Packet;
use crate::core::value::Value;
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::ack::{AckCallback, AckManager, AckResolver};
use crate::protocol::dispatcher::{route, route_reconstructed, Route};
use crate::protocol::events;
use crate::protocol::reconstructor::{Absorbed, Reconstructor};
use crate::protocol::registry::{ListenerId, Registry};
use crate::transport::PacketSink;
use crate::utils::metrics::DispatchMetrics;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, instrument, trace, warn};

pub struct EventClient {
    registry: Registry,
    reconstructor: Mutex<Reconstructor>,
    sink: Arc<dyn PacketSink>,
    resolver: Arc<dyn AckResolver>,
    metrics: Arc<DispatchMetrics>,
    config: EventConfig,
}

impl EventClient {
    /// Create a client that emits through `sink` and resolves ACKs with a
    /// fresh [`AckManager`].
    pub fn new(sink: Arc<dyn PacketSink>) -> Self {
        Self::with_config(sink, Arc::new(AckManager::new()), EventConfig::default())
    }

    pub fn with_config(
        sink: Arc<dyn PacketSink>,
        resolver: Arc<dyn AckResolver>,
        config: EventConfig,
    ) -> Self {
        Self {
            registry: Registry::new(),
            reconstructor: Mutex::new(Reconstructor::with_limit(config.dispatch.max_attachments)),
            sink,
            resolver,
            metrics: Arc::new(DispatchMetrics::new()),
            config,
        }
    }

    /// Share a metrics collector, e.g. the process-wide one.
    pub fn with_metrics(mut self, metrics: Arc<DispatchMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &DispatchMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &EventConfig {
        &self.config
    }

    pub fn sink(&self) -> &Arc<dyn PacketSink> {
        &self.sink
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Register a listener for `name`. Null names register nothing.
    pub fn on_event<F>(&self, name: impl Into<Value>, listener: F) -> Result<Option<ListenerId>>
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.registry.on_event(name, listener)
    }

    pub fn off_event(&self, name: impl Into<Value>, id: ListenerId) -> Result<bool> {
        self.registry.off_event(name, id)
    }

    /// Register a listener that may acknowledge the event it receives.
    pub fn on_ack<F>(&self, name: impl Into<Value>, listener: F) -> Result<Option<ListenerId>>
    where
        F: Fn(&[Value], Option<AckCallback>) + Send + Sync + 'static,
    {
        self.registry.on_ack(name, listener)
    }

    pub fn off_ack(&self, name: impl Into<Value>, id: ListenerId) -> Result<bool> {
        self.registry.off_ack(name, id)
    }

    /// Route one decoded packet.
    ///
    /// `is_binary` marks frames that arrived on the binary subchannel. Only
    /// protocol violations are returned as errors; the caller should treat
    /// them as connection-fatal.
    #[instrument(skip(self, packet), fields(kind = packet.kind.name(), id = ?packet.id))]
    pub fn handle_incoming_packet(&self, packet: Packet, is_binary: bool) -> Result<()> {
        self.metrics.packet_received();
        let result = self.handle_route(route(&packet, is_binary), packet);
        if let Err(e) = &result {
            if e.is_protocol_violation() {
                self.metrics.protocol_error();
            }
        }
        result
    }

    fn handle_route(&self, route: Route, packet: Packet) -> Result<()> {
        trace!(?route, "Routing packet");
        match route {
            Route::Connect => self.fire(events::CONNECTION, &[]),
            Route::Disconnect => self.handle_disconnect(),
            Route::Event => self.handle_event(&packet),
            Route::Ack => {
                self.handle_ack(packet);
                Ok(())
            }
            Route::Error => {
                let text = match &packet.payload {
                    None | Some(Value::Null) => String::new(),
                    Some(payload) => payload.to_string(),
                };
                self.fire(events::ERROR, &[Value::String(text)])
            }
            Route::BeginBinary => self.begin_binary(packet),
            Route::Attachment => self.absorb_attachments(packet),
            Route::Ignore => {
                debug!(packet = %packet, "Unroutable packet ignored");
                self.metrics.packet_ignored();
                Ok(())
            }
        }
    }

    fn fire(&self, name: &str, args: &[Value]) -> Result<()> {
        let invoked = self.registry.dispatch_event(&Value::from(name), args)?;
        self.metrics.event_dispatched(invoked);
        Ok(())
    }

    fn handle_disconnect(&self) -> Result<()> {
        debug!("Peer requested disconnect");
        self.sink.close();
        self.lock_reconstructor()?.reset();
        if self.config.dispatch.fire_disconnect_event {
            self.fire(events::DISCONNECT, &[])?;
        }
        self.metrics.log_metrics();
        Ok(())
    }

    fn handle_event(&self, packet: &Packet) -> Result<()> {
        let invoked = self.registry.dispatch_packet(packet, &self.sink)?;
        self.metrics.event_dispatched(invoked);
        Ok(())
    }

    fn handle_ack(&self, packet: Packet) {
        let Some(payload) = packet.payload else {
            trace!("ACK without payload ignored");
            return;
        };
        let args = match payload {
            Value::Array(items) => items,
            other => vec![other],
        };
        self.metrics.ack_resolved();
        self.resolver.resolve(packet.id, args);
    }

    fn begin_binary(&self, packet: Packet) -> Result<()> {
        let completed = self.lock_reconstructor()?.begin(packet)?;
        self.metrics.reconstruction_started();
        match completed {
            Some(packet) => self.finish_binary(packet),
            None => Ok(()),
        }
    }

    fn absorb_attachments(&self, packet: Packet) -> Result<()> {
        self.lock_reconstructor()?.expect_attachment(&packet)?;
        for data in packet.attachments {
            // Guard is dropped before listeners run
            let absorbed = self.lock_reconstructor()?.absorb(data)?;
            self.metrics.attachment_absorbed();
            if let Absorbed::Complete(done) = absorbed {
                self.finish_binary(done)?;
            }
        }
        Ok(())
    }

    fn finish_binary(&self, packet: Packet) -> Result<()> {
        self.metrics.reconstruction_completed();
        self.handle_route(route_reconstructed(&packet), packet)
    }

    fn lock_reconstructor(&self) -> Result<MutexGuard<'_, Reconstructor>> {
        self.reconstructor.lock().map_err(|_| {
            warn!("Reconstructor lock poisoned");
            ProtocolError::LockPoisoned(constants::ERR_RECONSTRUCTOR_LOCK)
        })
    }
}

impl std::fmt::Debug for EventClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventClient")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
