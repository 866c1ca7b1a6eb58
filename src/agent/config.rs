use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub port: u16,
    pub stop_grace_period_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            stop_grace_period_ms: 500,
        }
    }
}

impl AgentConfig {
    /// Layers an optional config file over built-in defaults, then
    /// `NODE_AGENT__`-prefixed environment variables on top.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(config::Environment::with_prefix("NODE_AGENT").separator("__"));

        builder
            .build()
            .context("failed to build node agent configuration")?
            .try_deserialize()
            .context("invalid node agent configuration")
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_period_ms)
    }
}
