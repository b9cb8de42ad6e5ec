//! Infrastructure layer
//!
//! PostgreSQL access through sqlx and the log message catalogue.

pub mod database;
pub mod log_messages;

pub use database::*;
