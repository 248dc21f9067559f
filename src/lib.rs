// Clippy allows for reasonable defaults
// These suppress warnings where the suggested change doesn't improve
// readability
#![allow(clippy::derivable_impls)] // Explicit Default impls can be clearer
#![allow(clippy::needless_borrow)] // Explicit borrows can clarify ownership
#![allow(clippy::collapsible_if)] // Separate ifs can be more readable
#![allow(clippy::redundant_closure)] // |x| f(x) can be clearer than f

// Module declarations
pub mod config;
pub mod content;
pub mod error;
pub mod file_storage;
pub mod models;
pub mod search;
pub mod shutdown;
pub mod tags;
pub mod transfer;
pub mod workflow;

// Server module (HTTP API)
pub mod server;

// Re-export the record types and error type for use in handlers
pub use error::{StoreError, StoreResult};
pub use models::*;
