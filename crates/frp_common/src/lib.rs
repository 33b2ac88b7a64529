//! FRP Freedom Common - Shared types, configuration, and audit logging
//!
//! Used by the toolkit binary and anything that needs to read its records.

pub mod audit;
pub mod config;
pub mod error;
pub mod types;

pub use audit::{AuditEvent, AuditLogger};
pub use config::Config;
pub use error::ToolError;
pub use types::*;
