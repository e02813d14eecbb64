//! # Core Types
//!
//! Layer 0 of the workspace: the record shape every analyzer consumes and the
//! small enums shared between the analytics and configuration crates.

pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{RecordStatus, Trend};
pub use error::CoreError;
pub use structs::{Record, Stage};
