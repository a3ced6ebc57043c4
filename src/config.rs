//! Process configuration loaded from `LEDGER_*` environment variables.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::streaming::WorkerSettings;

pub const PARTITIONS_VAR: &str = "LEDGER_PARTITIONS";
pub const POLL_INTERVAL_VAR: &str = "LEDGER_POLL_INTERVAL_MS";
pub const FETCH_MAX_BYTES_VAR: &str = "LEDGER_FETCH_MAX_BYTES";
pub const IDLE_SAMPLE_VAR: &str = "LEDGER_IDLE_SAMPLE_MS";
pub const SHUTDOWN_TIMEOUT_VAR: &str = "LEDGER_SHUTDOWN_TIMEOUT_SECS";
pub const STATS_INTERVAL_VAR: &str = "LEDGER_STATS_INTERVAL_MS";
pub const STATS_LOGGING_VAR: &str = "LEDGER_STATS_LOGGING";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("{0} must be positive")]
    NotPositive(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub partitions: u32,
    pub poll_interval: Duration,
    pub fetch_max_bytes: usize,
    pub idle_sample_interval: Duration,
    pub shutdown_timeout: Duration,
    pub stats_interval: Duration,
    pub stats_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        let worker = WorkerSettings::default();
        Self {
            partitions: 5,
            poll_interval: worker.poll_interval,
            fetch_max_bytes: worker.fetch_max_bytes,
            idle_sample_interval: Duration::from_millis(1_000),
            shutdown_timeout: Duration::from_secs(30),
            stats_interval: Duration::from_millis(1_000),
            stats_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source; unset variables keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let partitions = parse_or(&lookup, PARTITIONS_VAR, defaults.partitions)?;
        if partitions == 0 {
            return Err(ConfigError::NotPositive(PARTITIONS_VAR));
        }

        let fetch_max_bytes = parse_or(&lookup, FETCH_MAX_BYTES_VAR, defaults.fetch_max_bytes)?;
        if fetch_max_bytes == 0 {
            return Err(ConfigError::NotPositive(FETCH_MAX_BYTES_VAR));
        }

        Ok(Self {
            partitions,
            poll_interval: millis_or(&lookup, POLL_INTERVAL_VAR, defaults.poll_interval)?,
            fetch_max_bytes,
            idle_sample_interval: millis_or(
                &lookup,
                IDLE_SAMPLE_VAR,
                defaults.idle_sample_interval,
            )?,
            shutdown_timeout: Duration::from_secs(parse_or(
                &lookup,
                SHUTDOWN_TIMEOUT_VAR,
                defaults.shutdown_timeout.as_secs(),
            )?),
            stats_interval: millis_or(&lookup, STATS_INTERVAL_VAR, defaults.stats_interval)?,
            stats_logging: parse_or(&lookup, STATS_LOGGING_VAR, defaults.stats_logging)?,
        })
    }

    pub fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            poll_interval: self.poll_interval,
            fetch_max_bytes: self.fetch_max_bytes,
        }
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
    }
}

fn millis_or<F>(lookup: &F, var: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let millis = parse_or(lookup, var, default.as_millis() as u64)?;
    if millis == 0 {
        return Err(ConfigError::NotPositive(var));
    }
    Ok(Duration::from_millis(millis))
}
