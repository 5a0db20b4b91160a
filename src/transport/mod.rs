//! # Transport Boundary
//!
//! The dispatch core never touches sockets. It consumes decoded
//! `(Packet, is_binary)` pairs and hands finished outbound packets to a
//! [`PacketSink`], which owns encoding, sending and teardown.
//!
//! ## Components
//! - **PacketSink**: outbound emission and connection teardown
//! - **Channel**: a sink backed by a tokio channel plus an async ingestion loop

pub mod channel;

use crate::core::packet::Packet;
use crate::error::Result;

/// Outbound half of the transport.
pub trait PacketSink: Send + Sync {
    /// Encode and send a fully formed packet.
    fn emit(&self, packet: Packet) -> Result<()>;

    /// Tear the connection down. Later emits fail with `ConnectionClosed`.
    fn close(&self);
}
