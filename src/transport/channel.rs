//! Channel-backed transport glue.
//!
//! [`ChannelSink`] queues outbound packets on a tokio channel for a writer task
//! to encode and send. [`drive`] pumps decoded packets from any stream into an
//! [`EventClient`] until the stream ends or the peer violates the protocol.

use crate::client::EventClient;
use crate::core::packet::Packet;
use crate::error::{ProtocolError, Result};
use crate::transport::PacketSink;
use futures::{Stream, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, instrument, warn};

/// Outbound sink writing to an unbounded tokio channel.
#[derive(Debug)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Packet>,
    closed: AtomicBool,
}

impl ChannelSink {
    /// Create a sink and the receiver a writer task should drain.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Packet>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                closed: AtomicBool::new(false),
            },
            rx,
        )
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.tx.is_closed()
    }
}

impl PacketSink for ChannelSink {
    fn emit(&self, packet: Packet) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ProtocolError::ConnectionClosed);
        }
        self.tx
            .send(packet)
            .map_err(|_| ProtocolError::ConnectionClosed)
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("Outbound channel closed");
        }
    }
}

/// Channel a decoder task pushes `(packet, is_binary)` pairs into, paired
/// with the stream [`drive`] consumes.
pub fn inbound_channel() -> (
    mpsc::UnboundedSender<(Packet, bool)>,
    UnboundedReceiverStream<(Packet, bool)>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, UnboundedReceiverStream::new(rx))
}

/// Feed `(packet, is_binary)` pairs from `incoming` to `client` in arrival order.
///
/// Returns `Ok(())` when the stream ends. On the first error the client's
/// sink is closed and the error returned.
#[instrument(skip_all)]
pub async fn drive<S>(client: &EventClient, incoming: S) -> Result<()>
where
    S: Stream<Item = (Packet, bool)>,
{
    futures::pin_mut!(incoming);
    while let Some((packet, is_binary)) = incoming.next().await {
        if let Err(e) = client.handle_incoming_packet(packet, is_binary) {
            warn!(error = %e, "Dispatch failed, closing connection");
            client.sink().close();
            return Err(e);
        }
    }
    info!("Incoming packet stream ended");
    Ok(())
}
