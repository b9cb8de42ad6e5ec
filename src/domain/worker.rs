//! Worker transaction model
//!
//! A worker runs exactly one transaction: begin, lock, hold, update, commit.
//! Any failure along the way rolls the transaction back and ends the worker.
//! Nothing here talks to the store; the runner in `application::worker`
//! drives these types.

use derive_more::Display;
use nutype::nutype;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::account::{account_names, AccountName, Version};
use crate::error::{Error, Result};

/// SQLSTATE raised when a transaction cannot be serialized
pub const SQLSTATE_SERIALIZATION_FAILURE: &str = "40001";

/// SQLSTATE raised when the lock manager breaks a deadlock
pub const SQLSTATE_DEADLOCK_DETECTED: &str = "40P01";

/// Version both workers write
pub const TARGET_VERSION: i64 = 6;

/// Label used for a worker in logs and reports
#[nutype(
    validate(not_empty, len_char_max = 32),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Serialize,
        Deserialize,
        AsRef,
        Display
    )
)]
pub struct WorkerName(String);

/// Progress of a single worker transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Serialize, Deserialize)]
pub enum WorkerPhase {
    /// Spawned, no transaction yet
    #[default]
    #[display("pending")]
    Pending,
    #[display("begun")]
    Begun,
    /// Locking read returned; row locks are held
    #[display("locked")]
    Locked,
    #[display("sleeping")]
    Sleeping,
    #[display("updated")]
    Updated,
    #[display("committed")]
    Committed,
    #[display("rolled back")]
    RolledBack,
}

impl WorkerPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::RolledBack)
    }

    /// Move along the success path: Pending → Begun → Locked → Sleeping → Updated → Committed
    pub fn advance(self) -> Result<Self> {
        match self {
            Self::Pending => Ok(Self::Begun),
            Self::Begun => Ok(Self::Locked),
            Self::Locked => Ok(Self::Sleeping),
            Self::Sleeping => Ok(Self::Updated),
            Self::Updated => Ok(Self::Committed),
            Self::Committed | Self::RolledBack => Err(Error::InvalidStateTransition(format!(
                "Cannot advance a worker that is already {self}"
            ))),
        }
    }

    /// Abandon the transaction from any non-terminal phase
    pub fn roll_back(self) -> Result<Self> {
        if self.is_terminal() {
            return Err(Error::InvalidStateTransition(format!(
                "Cannot roll back a worker that is already {self}"
            )));
        }
        Ok(Self::RolledBack)
    }

    /// The step a worker in this phase attempts next
    pub fn next_step(&self) -> Option<WorkerStep> {
        match self {
            Self::Pending => Some(WorkerStep::Begin),
            Self::Begun => Some(WorkerStep::Lock),
            Self::Locked => Some(WorkerStep::Hold),
            Self::Sleeping => Some(WorkerStep::Update),
            Self::Updated => Some(WorkerStep::Commit),
            Self::Committed | Self::RolledBack => None,
        }
    }
}

/// Store interaction a worker can fail on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum WorkerStep {
    #[display("begin")]
    Begin,
    #[display("select-for-update")]
    Lock,
    #[display("hold")]
    Hold,
    #[display("update")]
    Update,
    #[display("commit")]
    Commit,
}

/// Why a worker rolled back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerFailure {
    pub step: WorkerStep,
    pub message: String,
    /// SQLSTATE reported by the store, if the failure came from the store
    pub sql_state: Option<String>,
}

impl WorkerFailure {
    pub fn new(step: WorkerStep, message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self {
            step,
            message: message.into(),
            sql_state,
        }
    }

    /// Serialization failure or deadlock, i.e. the store's conflict detection fired
    pub fn is_conflict(&self) -> bool {
        matches!(
            self.sql_state.as_deref(),
            Some(SQLSTATE_SERIALIZATION_FAILURE) | Some(SQLSTATE_DEADLOCK_DETECTED)
        )
    }
}

/// Terminal result of one worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerOutcome {
    Committed,
    RolledBack(WorkerFailure),
}

impl WorkerOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }

    pub fn failure(&self) -> Option<&WorkerFailure> {
        match self {
            Self::Committed => None,
            Self::RolledBack(failure) => Some(failure),
        }
    }
}

/// Outcome tagged with the worker that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerReport {
    pub worker: WorkerName,
    /// Always terminal once the runner returns
    pub phase: WorkerPhase,
    pub outcome: WorkerOutcome,
}

/// What a worker locks, how long it holds, and what it writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerPlan {
    pub name: WorkerName,
    pub lock_accounts: Vec<AccountName>,
    pub update_accounts: Vec<AccountName>,
    pub new_version: Version,
    pub hold: Duration,
}

impl WorkerPlan {
    /// Worker A: locks and updates alice and bob, holds for one unit
    pub fn first(hold_unit: Duration) -> Self {
        Self::fixed("tx1", &["alice", "bob"], &["alice", "bob"], hold_unit)
    }

    /// Worker B: locks alice and bob, updates bob and candy, holds for two units
    pub fn second(hold_unit: Duration) -> Self {
        Self::fixed("tx2", &["alice", "bob"], &["bob", "candy"], hold_unit * 2)
    }

    fn fixed(name: &str, lock: &[&str], update: &[&str], hold: Duration) -> Self {
        Self {
            name: WorkerName::try_new(name.to_string()).expect("Fixed worker name is valid"),
            lock_accounts: account_names(lock).expect("Fixed lock accounts are valid"),
            update_accounts: account_names(update).expect("Fixed update accounts are valid"),
            new_version: Version::try_new(TARGET_VERSION).expect("Target version is valid"),
            hold,
        }
    }
}
