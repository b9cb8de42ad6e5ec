//! Worker transaction runner
//!
//! Drives one [`WorkerPlan`] against its own [`Database`] handle, moving a
//! [`WorkerPhase`] along as each step succeeds. Errors never escape the
//! runner: any failure rolls the transaction back and ends up in the returned
//! [`WorkerReport`], attributed to the step the phase was attempting.

use sqlx::{Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::instrument;

use crate::application::observer::{Milestone, ScenarioObserver, WorkerEvent};
use crate::domain::{
    IsolationLevel, WorkerFailure, WorkerOutcome, WorkerPhase, WorkerPlan, WorkerReport,
    WorkerStep,
};
use crate::infrastructure::{lock_account_versions, update_account_versions, Database};
use crate::{Error, Result};

type PgTransaction = Transaction<'static, Postgres>;

/// Fired by a worker once its locking read returns
pub struct LockAnnouncer(oneshot::Sender<()>);

/// Awaited by a worker before it issues its own locking read
pub struct LockGate(oneshot::Receiver<()>);

/// Pair used to start one worker's locking read after another's
pub fn lock_signal() -> (LockAnnouncer, LockGate) {
    let (sender, receiver) = oneshot::channel();
    (LockAnnouncer(sender), LockGate(receiver))
}

impl LockAnnouncer {
    pub fn announce(self) {
        let _ = self.0.send(());
    }
}

impl LockGate {
    /// Resolves when the peer holds its locks or gave up before locking
    pub async fn wait(self) {
        let _ = self.0.await;
    }
}

pub struct WorkerRunner {
    db: Database,
    plan: WorkerPlan,
    isolation_level: IsolationLevel,
    observer: Arc<dyn ScenarioObserver>,
    announcer: Option<LockAnnouncer>,
    gate: Option<LockGate>,
}

impl WorkerRunner {
    pub fn new(
        db: Database,
        plan: WorkerPlan,
        isolation_level: IsolationLevel,
        observer: Arc<dyn ScenarioObserver>,
    ) -> Self {
        Self {
            db,
            plan,
            isolation_level,
            observer,
            announcer: None,
            gate: None,
        }
    }

    /// Signal `announcer` once this worker's rows are locked
    pub fn announce_lock(mut self, announcer: LockAnnouncer) -> Self {
        self.announcer = Some(announcer);
        self
    }

    /// Hold off the locking read until `gate` opens
    pub fn after_peer_lock(mut self, gate: LockGate) -> Self {
        self.gate = Some(gate);
        self
    }

    #[instrument(skip(self), fields(worker = %self.plan.name, isolation_level = %self.isolation_level))]
    pub async fn run(mut self) -> WorkerReport {
        let mut phase = WorkerPhase::default();
        let mut tx = None;

        let outcome = match self.drive(&mut phase, &mut tx).await {
            Ok(()) => WorkerOutcome::Committed,
            Err(error) => {
                let failure = failure_at(phase, &error);
                self.emit(WorkerEvent::Failed(failure.clone()));
                if let Some(tx) = tx.take() {
                    self.roll_back(tx).await;
                }
                phase = phase.roll_back().unwrap_or(WorkerPhase::RolledBack);
                WorkerOutcome::RolledBack(failure)
            }
        };

        self.emit(WorkerEvent::Done);
        WorkerReport {
            worker: self.plan.name.clone(),
            phase,
            outcome,
        }
    }

    /// Walk the success path; on error `phase` is where the worker stopped
    async fn drive(
        &mut self,
        phase: &mut WorkerPhase,
        slot: &mut Option<PgTransaction>,
    ) -> Result<()> {
        self.emit(WorkerEvent::Begin {
            isolation_level: self.isolation_level,
        });
        let tx = slot.insert(self.db.begin(self.isolation_level).await?);
        *phase = phase.advance()?;

        if let Some(gate) = self.gate.take() {
            self.emit(WorkerEvent::WaitingForPeer);
            gate.wait().await;
        }

        self.emit(WorkerEvent::SelectForUpdate);
        let rows = lock_account_versions(&mut **tx, &self.plan.lock_accounts).await?;
        *phase = phase.advance()?;
        self.emit(WorkerEvent::Locked { rows });
        if let Some(announcer) = self.announcer.take() {
            announcer.announce();
        }

        *phase = phase.advance()?;
        self.emit(WorkerEvent::Holding(self.plan.hold));
        tokio::time::sleep(self.plan.hold).await;

        self.emit(WorkerEvent::Update);
        update_account_versions(
            &mut **tx,
            &self.plan.update_accounts,
            self.plan.new_version,
        )
        .await?;
        *phase = phase.advance()?;

        self.emit(WorkerEvent::Commit);
        // Commit consumes the transaction; if it fails sqlx rolls back on drop
        if let Some(tx) = slot.take() {
            tx.commit().await?;
        }
        *phase = phase.advance()?;
        self.emit(WorkerEvent::Committed);

        Ok(())
    }

    async fn roll_back(&self, tx: PgTransaction) {
        if let Err(e) = tx.rollback().await {
            self.emit(WorkerEvent::RollbackFailed(e.to_string()));
        }
    }

    fn emit(&self, event: WorkerEvent) {
        self.observer.observe(&Milestone::Worker {
            worker: self.plan.name.clone(),
            event,
        });
    }
}

/// Attribute `error` to the step `phase` was attempting
///
/// Keeps the store's SQLSTATE so callers can tell conflicts apart.
pub fn failure_at(phase: WorkerPhase, error: &Error) -> WorkerFailure {
    let step = phase.next_step().unwrap_or(WorkerStep::Commit);
    let sql_state = match error {
        Error::Database(db) => db
            .as_database_error()
            .and_then(|db_error| db_error.code())
            .map(|code| code.into_owned()),
        _ => None,
    };
    WorkerFailure::new(step, error.to_string(), sql_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::Duration;

    #[rstest]
    #[case(WorkerPhase::Pending, WorkerStep::Begin)]
    #[case(WorkerPhase::Begun, WorkerStep::Lock)]
    #[case(WorkerPhase::Sleeping, WorkerStep::Update)]
    #[case(WorkerPhase::Updated, WorkerStep::Commit)]
    fn failure_is_attributed_to_the_pending_step(
        #[case] phase: WorkerPhase,
        #[case] expected: WorkerStep,
    ) {
        let failure = failure_at(phase, &Error::Database(sqlx::Error::PoolTimedOut));
        assert_eq!(failure.step, expected);
    }

    #[test]
    fn non_database_errors_have_no_sqlstate() {
        let failure = failure_at(WorkerPhase::Begun, &Error::Database(sqlx::Error::PoolTimedOut));
        assert!(failure.sql_state.is_none());
        assert!(!failure.is_conflict());
    }

    #[test]
    fn invalid_transition_is_not_a_conflict() {
        let error = WorkerPhase::Committed.advance().unwrap_err();
        let failure = failure_at(WorkerPhase::Committed, &error);
        assert_eq!(failure.step, WorkerStep::Commit);
        assert!(failure.sql_state.is_none());
    }

    #[tokio::test]
    async fn gate_opens_on_announce() {
        let (announcer, gate) = lock_signal();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            announcer.announce();
        });

        tokio::time::timeout(Duration::from_secs(1), gate.wait())
            .await
            .expect("gate should open");
    }

    #[tokio::test]
    async fn gate_opens_when_announcer_is_dropped() {
        let (announcer, gate) = lock_signal();
        drop(announcer);

        tokio::time::timeout(Duration::from_secs(1), gate.wait())
            .await
            .expect("gate should open");
    }
}
