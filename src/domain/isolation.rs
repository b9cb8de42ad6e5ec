//! Transaction isolation levels
//!
//! The isolation level is the one axis the scenario is meant to be replayed
//! across. `Default` leaves the session's configured level untouched.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Isolation level requested when a worker begins its transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    /// Whatever the server's `default_transaction_isolation` is
    #[display("default")]
    Default,
    /// PostgreSQL treats this as read committed
    #[display("read uncommitted")]
    ReadUncommitted,
    #[display("read committed")]
    ReadCommitted,
    /// Snapshot taken at the first statement; concurrent updates abort
    #[default]
    #[display("repeatable read")]
    RepeatableRead,
    #[display("serializable")]
    Serializable,
}

impl IsolationLevel {
    pub const ALL: [IsolationLevel; 5] = [
        Self::Default,
        Self::ReadUncommitted,
        Self::ReadCommitted,
        Self::RepeatableRead,
        Self::Serializable,
    ];

    /// Statement that must run first inside the transaction, if any
    pub fn set_transaction_sql(&self) -> Option<&'static str> {
        match self {
            Self::Default => None,
            Self::ReadUncommitted => Some("SET TRANSACTION ISOLATION LEVEL READ UNCOMMITTED"),
            Self::ReadCommitted => Some("SET TRANSACTION ISOLATION LEVEL READ COMMITTED"),
            Self::RepeatableRead => Some("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ"),
            Self::Serializable => Some("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE"),
        }
    }

    /// Whether a concurrent committed update to a locked row aborts the waiter
    pub fn aborts_on_concurrent_update(&self) -> bool {
        matches!(self, Self::RepeatableRead | Self::Serializable)
    }
}
