//! # Error Types
//!
//! Error handling for the packet dispatch core.
//!
//! This module defines the error variants that can surface from
//! `handle_incoming_packet`, listener registration and configuration loading.
//!
//! ## Error Categories
//! - **Protocol violations**: binary frames arriving out of sequence, placeholder
//!   counts that disagree with the declared attachment count
//! - **Emission errors**: the outbound sink has been closed
//! - **Synchronization errors**: a registry or reconstructor lock was poisoned
//! - **Configuration errors**: TOML parsing and validation failures
//!
//! Malformed payloads (an EVENT whose payload is not a non-empty array) and
//! removals of unknown listeners are never errors; they are absorbed silently.
//!
//! ## Example Usage
//! ```rust
//! use eventwire::error::{ProtocolError, Result};
//! use tracing::error;
//!
//! fn check(declared: usize, found: usize) -> Result<()> {
//!     if declared != found {
//!         return Err(ProtocolError::PlaceholderMismatch { declared, found });
//!     }
//!     Ok(())
//! }
//!
//! if let Err(e) = check(2, 1) {
//!     error!(error = %e, "binary packet rejected");
//! }
//! ```

use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Registry-related error messages
    pub const ERR_REGISTRY_WRITE_LOCK: &str = "Failed to acquire write lock on listener registry";
    pub const ERR_REGISTRY_READ_LOCK: &str = "Failed to acquire read lock on listener registry";

    /// Reconstruction errors
    pub const ERR_RECONSTRUCTOR_LOCK: &str = "Failed to acquire binary reconstructor lock";
    pub const ERR_ACK_TABLE_LOCK: &str = "Failed to acquire ack table lock";

    /// Connection errors
    pub const ERR_CONNECTION_CLOSED: &str = "Connection closed";

    /// Placeholder markers
    pub const PLACEHOLDER_KEY: &str = "_placeholder";
    pub const PLACEHOLDER_NUM_KEY: &str = "num";
}

/// Primary error type for all dispatch operations.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// A binary packet arrived while another was still being reconstructed,
    /// or a non-binary packet was handed to the reconstructor.
    #[error("Unexpected binary data: {packet}. Reconstructor: {in_progress}")]
    UnexpectedBinary { packet: String, in_progress: String },

    /// A raw attachment arrived with no reconstruction in progress.
    #[error("Unexpected binary attachment: {packet}. Reconstructor: idle")]
    UnexpectedAttachment { packet: String },

    #[error("Placeholder mismatch: packet declares {declared} attachments, payload references {found}")]
    PlaceholderMismatch { declared: usize, found: usize },

    #[error("Too many attachments: {declared} declared (limit {limit})")]
    TooManyAttachments { declared: usize, limit: usize },

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Synchronization primitive poisoned: {0}")]
    LockPoisoned(&'static str),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Custom error: {0}")]
    Custom(String),
}

impl ProtocolError {
    /// True for errors that signal a malformed or out-of-order frame sequence
    /// from the peer. These are connection-fatal.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            ProtocolError::UnexpectedBinary { .. }
                | ProtocolError::UnexpectedAttachment { .. }
                | ProtocolError::PlaceholderMismatch { .. }
                | ProtocolError::TooManyAttachments { .. }
        )
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
