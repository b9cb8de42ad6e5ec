//! Scenario milestone observers
//!
//! Setup, each worker and the verifier report progress through an injected
//! [`ScenarioObserver`] instead of writing to a global logger directly. The
//! binary uses [`TracingObserver`]; tests use [`RecordingObserver`] to assert
//! on the order milestones happened in.

use parking_lot::Mutex;
use std::time::Duration;
use tracing::{info, warn};

use crate::domain::{AccountVersion, IsolationLevel, Resolution, WorkerFailure, WorkerName};
use crate::infrastructure::log_messages;

/// Something worth logging that happened during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Milestone {
    Connecting,
    Connected,
    SettingUpTable,
    TableReady,
    Worker {
        worker: WorkerName,
        event: WorkerEvent,
    },
    AllWorkersDone,
    Listing,
    Row(AccountVersion),
    Resolved(Resolution),
}

/// Progress of one worker, emitted in order by that worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    Begin { isolation_level: IsolationLevel },
    WaitingForPeer,
    SelectForUpdate,
    Locked { rows: usize },
    Holding(Duration),
    Update,
    Commit,
    Committed,
    Failed(WorkerFailure),
    RollbackFailed(String),
    Done,
}

pub trait ScenarioObserver: Send + Sync {
    fn observe(&self, milestone: &Milestone);
}

/// Logs every milestone through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ScenarioObserver for TracingObserver {
    fn observe(&self, milestone: &Milestone) {
        match milestone {
            Milestone::Connecting => info!("{}", log_messages::setup::CONNECTING),
            Milestone::Connected => info!("{}", log_messages::setup::CONNECTED),
            Milestone::SettingUpTable => info!("{}", log_messages::setup::SETTING_UP_TABLE),
            Milestone::TableReady => info!("{}", log_messages::setup::TABLE_READY),
            Milestone::Worker { worker, event } => log_worker_event(worker, event),
            Milestone::AllWorkersDone => info!("{}", log_messages::verify::ALL_WORKERS_DONE),
            Milestone::Listing => info!("{}", log_messages::verify::LISTING),
            Milestone::Row(row) => info!(" - {row}"),
            Milestone::Resolved(resolution) => {
                info!(%resolution, "{}", log_messages::verify::RESOLUTION)
            }
        }
    }
}

fn log_worker_event(worker: &WorkerName, event: &WorkerEvent) {
    use log_messages::worker as msg;

    match event {
        WorkerEvent::Begin { isolation_level } => {
            info!(%worker, %isolation_level, "{}", msg::BEGIN)
        }
        WorkerEvent::WaitingForPeer => info!(%worker, "{}", msg::WAITING_FOR_PEER),
        WorkerEvent::SelectForUpdate => info!(%worker, "{}", msg::SELECT_FOR_UPDATE),
        WorkerEvent::Locked { rows } => info!(%worker, rows, "{}", msg::LOCKED),
        WorkerEvent::Holding(hold) => {
            info!(%worker, hold_ms = hold.as_millis() as u64, "{}", msg::HOLDING)
        }
        WorkerEvent::Update => info!(%worker, "{}", msg::UPDATE),
        WorkerEvent::Commit => info!(%worker, "{}", msg::COMMIT),
        WorkerEvent::Committed => info!(%worker, "{}", msg::COMMITTED),
        WorkerEvent::Failed(failure) => warn!(
            %worker,
            step = %failure.step,
            sql_state = failure.sql_state.as_deref().unwrap_or("-"),
            conflict = failure.is_conflict(),
            error = %failure.message,
            "{}",
            msg::FAILED
        ),
        WorkerEvent::RollbackFailed(error) => warn!(%worker, %error, "{}", msg::ROLLBACK_FAILED),
        WorkerEvent::Done => info!(%worker, "{}", msg::DONE),
    }
}

/// Keeps every milestone in emission order
#[derive(Debug, Default)]
pub struct RecordingObserver {
    milestones: Mutex<Vec<Milestone>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn milestones(&self) -> Vec<Milestone> {
        self.milestones.lock().clone()
    }

    /// Index of the first milestone matching `predicate`
    pub fn position(&self, predicate: impl Fn(&Milestone) -> bool) -> Option<usize> {
        self.milestones.lock().iter().position(predicate)
    }

    /// Index of `worker`'s first event matching `predicate`
    pub fn worker_position(
        &self,
        worker: &str,
        predicate: impl Fn(&WorkerEvent) -> bool,
    ) -> Option<usize> {
        self.position(|milestone| match milestone {
            Milestone::Worker { worker: name, event } => {
                name.as_ref() == worker && predicate(event)
            }
            _ => false,
        })
    }

    /// Events emitted by `worker`, in order
    pub fn worker_events(&self, worker: &str) -> Vec<WorkerEvent> {
        self.milestones
            .lock()
            .iter()
            .filter_map(|milestone| match milestone {
                Milestone::Worker { worker: name, event } if name.as_ref() == worker => {
                    Some(event.clone())
                }
                _ => None,
            })
            .collect()
    }
}

impl ScenarioObserver for RecordingObserver {
    fn observe(&self, milestone: &Milestone) {
        self.milestones.lock().push(milestone.clone());
    }
}
