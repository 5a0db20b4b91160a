//! # Protocol Layer
//!
//! What happens to a packet once it has been decoded.
//!
//! ## Components
//! - **Dispatcher**: stateless packet-kind routing
//! - **Reconstructor**: reassembly of binary packets from trailing attachments
//! - **Registry**: event-name keyed listener stores
//! - **Ack**: emit-back callbacks and correlation of incoming ACKs
//! - **Events**: names of the synthetic events raised by the core

pub mod ack;
pub mod dispatcher;
pub mod events;
pub mod reconstructor;
pub mod registry;
