//! # Core Protocol Components
//!
//! The packet model and the structured values it carries.
//!
//! Decoding bytes into packets belongs to the transport; this module only
//! describes a packet once it has been received as a typed unit.
//!
//! ## Components
//! - **Packet**: kind, correlation id, payload and raw attachments
//! - **Value**: tree-structured payload with placeholder markers for binary data
//!
//! ## Packet Kinds
//! ```text
//! CONNECT=0 DISCONNECT=1 EVENT=2 ACK=3 ERROR=4 BINARY_EVENT=5 BINARY_ACK=6
//! ```

pub mod packet;
pub mod value;
