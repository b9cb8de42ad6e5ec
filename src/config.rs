use config::{Config, ConfigError, Environment, File};
use nutype::nutype;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::time::Duration;

use crate::domain::IsolationLevel;

/// Environment variable holding the data source name
pub const DSN_ENV_VAR: &str = "DB_DSN";

/// Prefix for layered environment overrides, e.g. `ACID_TEST__SCENARIO__ISOLATION_LEVEL`
pub const ENV_PREFIX: &str = "ACID_TEST";

/// PostgreSQL connection string
///
/// May carry credentials, so `Debug` never prints it.
#[nutype(
    validate(predicate = |url| url.starts_with("postgres://") || url.starts_with("postgresql://")),
    derive(Clone, PartialEq, Eq, Deserialize, AsRef)
)]
pub struct DatabaseUrl(String);

impl fmt::Debug for DatabaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DatabaseUrl(***)")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub scenario: ScenarioSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: DatabaseUrl,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScenarioSettings {
    pub isolation_level: IsolationLevel,
    pub hold_unit_ms: u64,
    pub coordination: Coordination,
}

/// How worker B is sequenced behind worker A
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Coordination {
    /// Both start together; only the hold durations differ
    Stagger,
    /// Worker B starts its locking read once worker A holds its locks
    Signal,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Full,
    Compact,
    Json,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(env::var(DSN_ENV_VAR).ok())
    }

    /// Build settings with `dsn` taking precedence over every other source
    pub fn load(dsn: Option<String>) -> Result<Self, ConfigError> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            .set_default("database.max_connections", 1)?
            .set_default("database.acquire_timeout_secs", 10)?
            .set_default("scenario.isolation_level", "repeatable_read")?
            .set_default("scenario.hold_unit_ms", 1000)?
            .set_default("scenario.coordination", "stagger")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "full")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .set_override_option("database.url", dsn)?
            .build()?;

        config.try_deserialize()
    }
}

impl DatabaseSettings {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

impl ScenarioSettings {
    /// Worker A holds its locks for one unit, worker B for two
    pub fn hold_unit(&self) -> Duration {
        Duration::from_millis(self.hold_unit_ms)
    }
}
