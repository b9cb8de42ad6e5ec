//! Application services
//!
//! Orchestrates the scenario: connections, workers, the completion barrier
//! and the verifier, all reporting through an injected observer.

pub mod app;
pub mod barrier;
pub mod observer;
pub mod scenario;
pub mod worker;

pub use app::Application;
pub use barrier::{CompletionBarrier, CompletionHandle};
pub use observer::{Milestone, RecordingObserver, ScenarioObserver, TracingObserver, WorkerEvent};
pub use scenario::{Connections, Scenario, ScenarioReport};
pub use worker::{lock_signal, LockAnnouncer, LockGate, WorkerRunner};
