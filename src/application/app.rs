use crate::application::observer::{ScenarioObserver, TracingObserver};
use crate::application::scenario::{Connections, Scenario, ScenarioReport};
use crate::config::Settings;
use crate::Result;
use std::sync::Arc;
use tracing::{info, instrument};

/// Main application struct that coordinates all components
pub struct Application {
    settings: Settings,
    scenario: Scenario,
    connections: Connections,
}

impl Application {
    #[instrument]
    pub async fn new() -> Result<Self> {
        let settings = Settings::new()?;
        Self::with_observer(settings, Arc::new(TracingObserver)).await
    }

    /// Connect both handles up front; failure here aborts before any worker runs
    #[instrument(skip(settings, observer), fields(isolation_level = %settings.scenario.isolation_level))]
    pub async fn with_observer(
        settings: Settings,
        observer: Arc<dyn ScenarioObserver>,
    ) -> Result<Self> {
        let scenario = Scenario::new(settings.scenario.clone(), observer);
        let connections = scenario.connect(&settings.database).await?;

        Ok(Self {
            settings,
            scenario,
            connections,
        })
    }

    #[instrument(skip(self))]
    pub async fn run(self) -> Result<ScenarioReport> {
        let report = self.scenario.run(&self.connections).await?;
        info!(
            resolution = %report.resolution,
            isolation_level = %report.isolation_level,
            "Scenario complete"
        );
        Ok(report)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn connections(&self) -> &Connections {
        &self.connections
    }
}
