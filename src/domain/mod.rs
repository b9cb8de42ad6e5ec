//! Domain types for the transaction conflict scenario
//!
//! Pure values: rows, isolation levels, the worker state machine and the
//! classification of what the workers left behind.

pub mod account;
pub mod identifiers;
pub mod isolation;
pub mod resolution;
pub mod worker;

pub use account::*;
pub use identifiers::*;
pub use isolation::*;
pub use resolution::*;
pub use worker::*;
