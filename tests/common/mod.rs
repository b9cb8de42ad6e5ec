//! Shared helpers for scenario tests against a live PostgreSQL
//!
//! Set `DB_DSN` and run with `cargo test -- --ignored`.

use acid_test::application::{Connections, RecordingObserver, Scenario};
use acid_test::config::{Coordination, Settings};
use acid_test::domain::IsolationLevel;
use std::sync::Arc;

/// Short enough to keep the suite quick, long enough to order the workers
pub const TEST_HOLD_UNIT_MS: u64 = 200;

pub struct Harness {
    pub scenario: Scenario,
    pub connections: Connections,
    pub observer: Arc<RecordingObserver>,
}

pub async fn harness(level: IsolationLevel, coordination: Coordination) -> Harness {
    let mut settings = Settings::new().expect("DB_DSN must be set for database tests");
    settings.scenario.isolation_level = level;
    settings.scenario.coordination = coordination;
    settings.scenario.hold_unit_ms = TEST_HOLD_UNIT_MS;

    let observer = Arc::new(RecordingObserver::new());
    let scenario = Scenario::new(settings.scenario.clone(), observer.clone());
    let connections = scenario
        .connect(&settings.database)
        .await
        .expect("Failed to connect to database");

    Harness {
        scenario,
        connections,
        observer,
    }
}
