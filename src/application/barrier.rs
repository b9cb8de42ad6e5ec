//! Count-down completion barrier
//!
//! Workers send their terminal report through a [`CompletionHandle`]. The
//! verifier awaits [`CompletionBarrier::wait`], which only returns once every
//! expected worker has reported, whether it committed or rolled back.

use tokio::sync::mpsc;

use crate::domain::WorkerReport;
use crate::{Error, Result};

pub struct CompletionBarrier {
    expected: usize,
    sender: mpsc::UnboundedSender<WorkerReport>,
    receiver: mpsc::UnboundedReceiver<WorkerReport>,
}

/// One worker's slot in the barrier; consumed when the worker reports
pub struct CompletionHandle {
    sender: mpsc::UnboundedSender<WorkerReport>,
}

impl CompletionBarrier {
    pub fn new(expected: usize) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            expected,
            sender,
            receiver,
        }
    }

    pub fn handle(&self) -> CompletionHandle {
        CompletionHandle {
            sender: self.sender.clone(),
        }
    }

    /// Suspend until `expected` reports arrive, returned in arrival order
    ///
    /// Fails if every handle is dropped before enough reports came in, which
    /// only happens when a worker task dies without reporting.
    pub async fn wait(self) -> Result<Vec<WorkerReport>> {
        let Self {
            expected,
            sender,
            mut receiver,
        } = self;
        drop(sender);

        let mut reports = Vec::with_capacity(expected);
        while reports.len() < expected {
            match receiver.recv().await {
                Some(report) => reports.push(report),
                None => {
                    return Err(Error::application(format!(
                        "Only {} of {} workers reported completion",
                        reports.len(),
                        expected
                    )))
                }
            }
        }
        Ok(reports)
    }
}

impl CompletionHandle {
    pub fn complete(self, report: WorkerReport) {
        // The receiver only goes away if the verifier itself was dropped
        let _ = self.sender.send(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{WorkerFailure, WorkerName, WorkerOutcome, WorkerPhase, WorkerStep};
    use std::time::Duration;

    fn report(name: &str, outcome: WorkerOutcome) -> WorkerReport {
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

    #[tokio::test]
    async fn releases_once_all_workers_report() {
        let barrier = CompletionBarrier::new(2);
        let first = barrier.handle();
        let second = barrier.handle();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            second.complete(report(
                "tx2",
                WorkerOutcome::RolledBack(WorkerFailure::new(
                    WorkerStep::Lock,
                    "could not serialize access",
                    Some("40001".to_string()),
                )),
            ));
        });
        first.complete(report("tx1", WorkerOutcome::Committed));

        let reports = barrier.wait().await.unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].worker.to_string(), "tx1");
        assert!(reports[1].outcome.failure().unwrap().is_conflict());
    }

    #[tokio::test]
    async fn does_not_release_early() {
        let barrier = CompletionBarrier::new(2);
        let first = barrier.handle();
        let _second = barrier.handle();
        first.complete(report("tx1", WorkerOutcome::Committed));

        let waited = tokio::time::timeout(Duration::from_millis(50), barrier.wait()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn errors_when_a_worker_never_reports() {
        let barrier = CompletionBarrier::new(2);
        let first = barrier.handle();
        let second = barrier.handle();
        first.complete(report("tx1", WorkerOutcome::Committed));
        drop(second);

        let result = barrier.wait().await;
        assert!(matches!(result, Err(Error::Application(_))));
    }

    #[tokio::test]
    async fn zero_expected_releases_immediately() {
        let barrier = CompletionBarrier::new(0);
        assert!(barrier.wait().await.unwrap().is_empty());
    }
}
