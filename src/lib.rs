//! # eventwire
//!
//! Packet dispatch and binary reconstruction core for real-time
//! event-messaging clients.
//!
//! A transport decodes frames into [`Packet`]s and hands them, one at a time,
//! to [`EventClient::handle_incoming_packet`]. The client routes each packet by
//! kind, reassembles binary packets from their trailing attachments, invokes
//! registered listeners, and emits ACK replies through a [`PacketSink`].
//!
//! ## Example
//! ```rust
//! use eventwire::{ChannelSink, EventClient, Packet, Value};
//! use std::sync::Arc;
//!
//! let (sink, mut outbound) = ChannelSink::new();
//! let client = EventClient::new(Arc::new(sink));
//!
//! client
//!     .on_ack("ping", |args, ack| {
//!         if let Some(ack) = ack {
//!             let _ = ack.send(args.to_vec());
//!         }
//!     })
//!     .unwrap();
//!
//! let ping = Packet::event("ping", vec![Value::from(1i64)]).with_id(5);
//! client.handle_incoming_packet(ping, false).unwrap();
//!
//! assert_eq!(outbound.try_recv().unwrap(), Packet::ack(5, vec![Value::from(1i64)]));
//! ```

pub mod client;
pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod utils;

pub use client::EventClient;
pub use crate::core::packet::{Packet, PacketKind};
pub use crate::core::value::Value;
pub use error::{ProtocolError, Result};
pub use protocol::ack::{AckCallback, AckManager, AckResolver};
pub use protocol::registry::ListenerId;
pub use transport::channel::ChannelSink;
pub use transport::PacketSink;
