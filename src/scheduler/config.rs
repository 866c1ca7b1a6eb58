use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub host: String,
    pub port: u16,
    pub state_file_path: String,
    pub health_check_interval_ms: u64,
    pub health_check_timeout_ms: u64,
    pub failure_threshold: u32,
    pub max_retries: u32,
    pub recovery_period_ms: u64,
    pub state_save_period_ms: u64,
    pub cpu_placement_ceiling: f64,
    pub rpc_timeout_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            state_file_path: "orchestrator_state.json".to_string(),
            health_check_interval_ms: 3_000,
            health_check_timeout_ms: 2_000,
            failure_threshold: 2,
            max_retries: 3,
            recovery_period_ms: 1_000,
            state_save_period_ms: 30_000,
            cpu_placement_ceiling: 80.0,
            rpc_timeout_ms: 10_000,
        }
    }
}

impl SchedulerConfig {
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(config::Environment::with_prefix("SCHEDULER").separator("__"));

        builder
            .build()
            .context("failed to build scheduler configuration")?
            .try_deserialize()
            .context("invalid scheduler configuration")
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }

    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_millis(self.health_check_timeout_ms)
    }

    pub fn recovery_period(&self) -> Duration {
        Duration::from_millis(self.recovery_period_ms)
    }

    pub fn state_save_period(&self) -> Duration {
        Duration::from_millis(self.state_save_period_ms)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }
}
