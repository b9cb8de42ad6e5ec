//! Acid Test - two concurrent PostgreSQL transactions contending for row locks
//!
//! Seeds a three-row table, runs two workers that each lock overlapping rows
//! with `SELECT ... FOR UPDATE`, hold the locks, update, and commit, then
//! lists what survived. The isolation level is the knob: under repeatable
//! read the second worker's conflicting transaction is rolled back by the
//! store, under read committed it goes through.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use application::Application;
pub use error::{Error, Result};
