//! Common types for the shared crate

/// Timestamp type (Unix milliseconds)
pub type Timestamp = i64;
