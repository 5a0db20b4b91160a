//! Observability and Metrics
//!
//! Counters for monitoring packet dispatch health.
//!
//! Uses atomic counters for thread-safe metrics collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Metrics collector for one dispatch core
#[derive(Debug)]
pub struct DispatchMetrics {
    /// Total packets handed to `handle_incoming_packet`
    pub packets_received: AtomicU64,
    /// Packets that matched no handler
    pub packets_ignored: AtomicU64,
    /// EVENT packets (plain or reconstructed) dispatched to listeners
    pub events_dispatched: AtomicU64,
    /// Individual listener calls
    pub listener_invocations: AtomicU64,
    /// ACK packets surfaced to the ack resolver
    pub acks_resolved: AtomicU64,
    /// Binary reconstructions started
    pub reconstructions_started: AtomicU64,
    /// Binary reconstructions completed
    pub reconstructions_completed: AtomicU64,
    /// Raw attachments absorbed
    pub attachments_absorbed: AtomicU64,
    /// Protocol violations raised
    pub protocol_errors: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl DispatchMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            packets_received: AtomicU64::new(0),
            packets_ignored: AtomicU64::new(0),
            events_dispatched: AtomicU64::new(0),
            listener_invocations: AtomicU64::new(0),
            acks_resolved: AtomicU64::new(0),
            reconstructions_started: AtomicU64::new(0),
            reconstructions_completed: AtomicU64::new(0),
            attachments_absorbed: AtomicU64::new(0),
            protocol_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn packet_received(&self) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn packet_ignored(&self) {
        self.packets_ignored.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an event dispatch and how many listeners it reached
    pub fn event_dispatched(&self, invoked: usize) {
        self.events_dispatched.fetch_add(1, Ordering::Relaxed);
        self.listener_invocations
            .fetch_add(invoked as u64, Ordering::Relaxed);
    }

    pub fn ack_resolved(&self) {
        self.acks_resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reconstruction_started(&self) {
        self.reconstructions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reconstruction_completed(&self) {
        self.reconstructions_completed
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn attachment_absorbed(&self) {
        self.attachments_absorbed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            packets_received: self.packets_received.load(Ordering::Relaxed),
            packets_ignored: self.packets_ignored.load(Ordering::Relaxed),
            events_dispatched: self.events_dispatched.load(Ordering::Relaxed),
            listener_invocations: self.listener_invocations.load(Ordering::Relaxed),
            acks_resolved: self.acks_resolved.load(Ordering::Relaxed),
            reconstructions_started: self.reconstructions_started.load(Ordering::Relaxed),
            reconstructions_completed: self.reconstructions_completed.load(Ordering::Relaxed),
            attachments_absorbed: self.attachments_absorbed.load(Ordering::Relaxed),
            protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            packets_received = snapshot.packets_received,
            packets_ignored = snapshot.packets_ignored,
            events_dispatched = snapshot.events_dispatched,
            listener_invocations = snapshot.listener_invocations,
            acks_resolved = snapshot.acks_resolved,
            reconstructions_started = snapshot.reconstructions_started,
            reconstructions_completed = snapshot.reconstructions_completed,
            attachments_absorbed = snapshot.attachments_absorbed,
            protocol_errors = snapshot.protocol_errors,
            uptime_seconds = snapshot.uptime_seconds,
            "Dispatch metrics snapshot"
        );
    }
}

impl Default for DispatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub packets_received: u64,
    pub packets_ignored: u64,
    pub events_dispatched: u64,
    pub listener_invocations: u64,
    pub acks_resolved: u64,
    pub reconstructions_started: u64,
    pub reconstructions_completed: u64,
    pub attachments_absorbed: u64,
    pub protocol_errors: u64,
    pub uptime_seconds: u64,
}

/// Process-wide collector for callers that do not want one per client
static METRICS: once_cell::sync::Lazy<Arc<DispatchMetrics>> =
    once_cell::sync::Lazy::new(|| Arc::new(DispatchMetrics::new()));

/// Get the global metrics instance
pub fn global_metrics() -> Arc<DispatchMetrics> {
    Arc::clone(&METRICS)
}
