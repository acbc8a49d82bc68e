//! Data models
//!
//! Shared between comanda-server and frontend clients (via the wire
//! protocol and the read-only HTTP endpoints). All record IDs are `i64`.

pub mod menu;
pub mod records;
pub mod table;

// Re-exports
pub use menu::*;
pub use records::*;
pub use table::*;
