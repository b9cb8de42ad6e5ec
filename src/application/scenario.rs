//! The transaction conflict scenario
//!
//! setup → fork two workers → wait on the completion barrier → verify.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{field, info, instrument, Instrument, Span};

use crate::application::barrier::CompletionBarrier;
use crate::application::observer::{Milestone, ScenarioObserver};
use crate::application::worker::{lock_signal, WorkerRunner};
use crate::config::{Coordination, DatabaseSettings, ScenarioSettings};
use crate::domain::{
    AccountVersion, IsolationLevel, Resolution, RunId, WorkerOutcome, WorkerPlan, WorkerReport,
};
use crate::infrastructure::Database;
use crate::Result;

/// Two independent handles to the same store, one per worker
#[derive(Clone)]
pub struct Connections {
    pub first: Database,
    pub second: Database,
}

impl Connections {
    pub fn new(first: Database, second: Database) -> Self {
        Self { first, second }
    }
}

/// Everything a run produced
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub run_id: RunId,
    pub isolation_level: IsolationLevel,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Sorted by worker name
    pub workers: Vec<WorkerReport>,
    /// Final listing, ordered by account
    pub rows: Vec<AccountVersion>,
    pub resolution: Resolution,
}

impl ScenarioReport {
    pub fn outcome_of(&self, worker: &str) -> Option<&WorkerOutcome> {
        self.workers
            .iter()
            .find(|report| report.worker.as_ref() == worker)
            .map(|report| &report.outcome)
    }

    pub fn committed_count(&self) -> usize {
        self.workers
            .iter()
            .filter(|report| report.outcome.is_committed())
            .count()
    }
}

pub struct Scenario {
    settings: ScenarioSettings,
    plans: [WorkerPlan; 2],
    observer: Arc<dyn ScenarioObserver>,
}

impl Scenario {
    pub fn new(settings: ScenarioSettings, observer: Arc<dyn ScenarioObserver>) -> Self {
        let hold_unit = settings.hold_unit();
        Self {
            settings,
            plans: [WorkerPlan::first(hold_unit), WorkerPlan::second(hold_unit)],
            observer,
        }
    }

    /// Replace the two worker plans; `first` is the one that locks first
    /// under signal coordination
    pub fn with_plans(mut self, first: WorkerPlan, second: WorkerPlan) -> Self {
        self.plans = [first, second];
        self
    }

    /// Open both handles; either failing is fatal
    pub async fn connect(&self, database: &DatabaseSettings) -> Result<Connections> {
        self.emit(Milestone::Connecting);
        let first = Database::connect(database).await?;
        let second = Database::connect(database).await?;
        self.emit(Milestone::Connected);
        Ok(Connections::new(first, second))
    }

    /// Create the table if absent and reset it to the seed rows
    pub async fn setup(&self, db: &Database) -> Result<()> {
        self.emit(Milestone::SettingUpTable);
        db.reset_account_versions().await?;
        self.emit(Milestone::TableReady);
        Ok(())
    }

    #[instrument(skip(self, connections), fields(run_id = field::Empty))]
    pub async fn run(&self, connections: &Connections) -> Result<ScenarioReport> {
        let run_id = RunId::generate();
        Span::current().record("run_id", field::display(&run_id));
        let started_at = Utc::now();
        let isolation_level = self.settings.isolation_level;

        self.setup(&connections.first).await?;

        let [first_plan, second_plan] = self.plans.clone();
        let mut first = WorkerRunner::new(
            connections.first.clone(),
            first_plan,
            isolation_level,
            self.observer.clone(),
        );
        let mut second = WorkerRunner::new(
            connections.second.clone(),
            second_plan,
            isolation_level,
            self.observer.clone(),
        );
        if self.settings.coordination == Coordination::Signal {
            let (announcer, gate) = lock_signal();
            first = first.announce_lock(announcer);
            second = second.after_peer_lock(gate);
        }

        let barrier = CompletionBarrier::new(2);
        for runner in [first, second] {
            let handle = barrier.handle();
            tokio::spawn(
                async move {
                    handle.complete(runner.run().await);
                }
                .instrument(Span::current()),
            );
        }

        let mut workers = barrier.wait().await?;
        workers.sort_by(|a, b| a.worker.as_ref().cmp(b.worker.as_ref()));
        self.emit(Milestone::AllWorkersDone);

        let rows = self.verify(&connections.second).await?;
        let resolution = Resolution::classify(&rows);
        self.emit(Milestone::Resolved(resolution));

        let report = ScenarioReport {
            run_id,
            isolation_level,
            started_at,
            finished_at: Utc::now(),
            workers,
            rows,
            resolution,
        };
        info!(
            run_id = %report.run_id,
            committed = report.committed_count(),
            elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
            "Scenario finished"
        );
        Ok(report)
    }

    /// Read and report every row ordered by account
    pub async fn verify(&self, db: &Database) -> Result<Vec<AccountVersion>> {
        self.emit(Milestone::Listing);
        let rows = db.list_account_versions().await?;
        for row in &rows {
            self.emit(Milestone::Row(row.clone()));
        }
        Ok(rows)
    }

    fn emit(&self, milestone: Milestone) {
        self.observer.observe(&milestone);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::observer::RecordingObserver;
    use crate::domain::{account_names, WorkerFailure, WorkerName, WorkerPhase, WorkerStep};
    use std::time::Duration;

    fn report_with(workers: Vec<WorkerReport>) -> ScenarioReport {
        ScenarioReport {
            run_id: RunId::generate(),
            isolation_level: IsolationLevel::RepeatableRead,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            workers,
            rows: Vec::new(),
            resolution: Resolution::Unexpected,
        }
    }

    fn worker_report(name: &str, outcome: WorkerOutcome) -> WorkerReport {
        WorkerReport {
            worker: WorkerName::try_new(name.to_string()).unwrap(),
            phase: if outcome.is_committed() {
                WorkerPhase::Committed
            } else {
                WorkerPhase::RolledBack
            },
            outcome,
        }
    }

    #[test]
    fn report_looks_up_outcomes_by_worker() {
        let failure = WorkerFailure::new(WorkerStep::Lock, "conflict", Some("40001".into()));
        let report = report_with(vec![
            worker_report("tx1", WorkerOutcome::Committed),
            worker_report("tx2", WorkerOutcome::RolledBack(failure)),
        ]);

        assert_eq!(report.committed_count(), 1);
        assert!(report.outcome_of("tx1").unwrap().is_committed());
        assert!(report.outcome_of("tx2").unwrap().failure().unwrap().is_conflict());
        assert!(report.outcome_of("tx3").is_none());
    }

    #[test]
    fn plans_follow_the_hold_unit_until_replaced() {
        let settings = ScenarioSettings {
            isolation_level: IsolationLevel::RepeatableRead,
            hold_unit_ms: 10,
            coordination: Coordination::Signal,
        };
        let scenario = Scenario::new(settings, Arc::new(RecordingObserver::new()));
        assert_eq!(scenario.plans[0].hold, Duration::from_millis(10));
        assert_eq!(scenario.plans[1].hold, Duration::from_millis(20));

        let mut second = WorkerPlan::second(Duration::from_millis(10));
        second.lock_accounts = account_names(&["candy"]).unwrap();
        let scenario = scenario.with_plans(WorkerPlan::first(Duration::from_millis(10)), second);
        assert_eq!(scenario.plans[1].lock_accounts[0].as_ref(), "candy");
    }
}
