//! Names of the synthetic events raised by the dispatch core itself.

/// Raised with no arguments when a CONNECT packet arrives.
pub const CONNECTION: &str = "connection";

/// Raised with no arguments after a DISCONNECT packet tears the connection down.
pub const DISCONNECT: &str = "disconnect";

/// Raised with the ERROR packet's payload text as the sole argument.
pub const ERROR: &str = "error";
