//! Shared types for the Comanda table-service system
//!
//! Common types used by the server and any future client crates:
//! domain models, wire messages, timestamps, and formatting helpers.

pub mod message;
pub mod models;
pub mod time;
pub mod types;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

// Message bus re-exports (for convenient access)
pub use message::{BusMessage, EventType, Room};
pub use message::payload::{ClientRequest, ServerEvent};
