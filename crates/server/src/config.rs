//! YAML server configuration.
//!
//! ```yaml
//! throttle:
//!   enabled: true
//!   interval_ms: 10
//!   strategy: target_tick_duration
//! update_budget_ms: 50
//! tick_history: 120
//! ```
//!
//! Every field is optional and falls back to its default.

use serde::{Deserialize, Serialize};
use shardloop_pacing::{DEFAULT_INTERVAL_MS, MAX_INTERVAL_MS, PacingMode, ThrottleConfig};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Initial rate lock settings. The live value is a `ThrottleConfig`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleSettings {
    pub enabled: bool,
    pub interval_ms: i64,
    pub strategy: PacingMode,
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: DEFAULT_INTERVAL_MS,
            strategy: PacingMode::FixedSleep,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub throttle: ThrottleSettings,
    /// Per-update deadline; overruns are recorded as isolated faults.
    pub update_budget_ms: Option<u64>,
    /// Number of recent tick durations kept for diagnostics.
    pub tick_history: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            throttle: ThrottleSettings::default(),
            update_budget_ms: None,
            tick_history: 120,
        }
    }
}

impl ServerConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        tracing::info!(path = %path.as_ref().display(), "loading server config");
        Self::from_yaml_str(&text)
    }

    /// Reject values the loop cannot run with. A non-positive throttle
    /// interval is accepted: at runtime it simply disables throttling.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_history == 0 {
            return Err(ConfigError::Invalid("tick_history must be at least 1".into()));
        }
        if self.update_budget_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "update_budget_ms must be positive when set".into(),
            ));
        }
        if self.throttle.interval_ms <= 0 {
            tracing::warn!(
                interval_ms = self.throttle.interval_ms,
                "non-positive throttle interval; throttling will stay off"
            );
        } else if self.throttle.interval_ms > MAX_INTERVAL_MS {
            tracing::warn!(
                interval_ms = self.throttle.interval_ms,
                cap_ms = MAX_INTERVAL_MS,
                "throttle interval above cap; sleeps will be capped"
            );
        }
        Ok(())
    }

    pub fn update_budget(&self) -> Option<Duration> {
        self.update_budget_ms.map(Duration::from_millis)
    }

    /// Fresh shared rate lock initialised from these settings.
    pub fn throttle_config(&self) -> ThrottleConfig {
        ThrottleConfig::new(self.throttle.enabled, self.throttle.interval_ms)
    }
}
