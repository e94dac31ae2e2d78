//! TOML configuration with environment overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::packer::{
    DEFAULT_CAPACITY_MINUTES, DEFAULT_ROUND_COUNT, FitPolicy, PackConfig, PackOrder,
};
use crate::readiness::ReadinessGate;

/// Looked up in the working directory when no `--config` is given.
pub const LOCAL_CONFIG_FILE: &str = "roundpack.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub rounds: RoundsConfig,

    #[serde(default)]
    pub readiness: ReadinessConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundsConfig {
    #[serde(default = "default_round_count")]
    pub count: usize,

    #[serde(default = "default_capacity_minutes")]
    pub capacity_minutes: u32,

    #[serde(default)]
    pub policy: FitPolicy,

    #[serde(default)]
    pub order: PackOrder,
}

fn default_round_count() -> usize {
    DEFAULT_ROUND_COUNT
}
fn default_capacity_minutes() -> u32 {
    DEFAULT_CAPACITY_MINUTES
}

impl Default for RoundsConfig {
    fn default() -> Self {
        Self {
            count: default_round_count(),
            capacity_minutes: default_capacity_minutes(),
            policy: FitPolicy::default(),
            order: PackOrder::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessConfig {
    #[serde(default = "default_start_percent")]
    pub start_percent: u32,

    #[serde(default = "default_full_percent")]
    pub full_percent: u32,
}

fn default_start_percent() -> u32 {
    75
}
fn default_full_percent() -> u32 {
    100
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            start_percent: default_start_percent(),
            full_percent: default_full_percent(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String, // "error" | "warn" | "info" | "debug" | "trace"
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(raw: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw, &path.display().to_string())
    }

    /// Apply `ROUNDPACK_*` overrides from `lookup` (normally `std::env::var`).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |key: &'static str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = set("ROUNDPACK_ROUNDS") {
            self.rounds.count = v
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { key: "ROUNDPACK_ROUNDS", value: v })?;
        }
        if let Some(v) = set("ROUNDPACK_CAPACITY") {
            self.rounds.capacity_minutes = v.trim().parse().map_err(|_| {
                ConfigError::InvalidValue {
                    key: "ROUNDPACK_CAPACITY",
                    value: v,
                }
            })?;
        }
        if let Some(v) = set("ROUNDPACK_POLICY") {
            self.rounds.policy = v
                .parse()
                .map_err(|_| ConfigError::InvalidValue { key: "ROUNDPACK_POLICY", value: v })?;
        }
        if let Some(v) = set("ROUNDPACK_LOG") {
            self.log.level = v;
        }
        Ok(())
    }

    /// Explicit path first, then `./roundpack.toml`, then defaults; env wins over all.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let local = Path::new(LOCAL_CONFIG_FILE);
        let mut cfg = match explicit {
            Some(path) => Self::from_file(path)?,
            None if local.exists() => Self::from_file(local)?,
            None => Self::default(),
        };
        cfg.apply_env(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Readiness thresholds must satisfy `0 < start_percent <= full_percent`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ReadinessConfig {
            start_percent,
            full_percent,
        } = self.readiness;
        if full_percent == 0 {
            return Err(ConfigError::InvalidValue {
                key: "readiness.full_percent",
                value: full_percent.to_string(),
            });
        }
        if start_percent == 0 || start_percent > full_percent {
            return Err(ConfigError::InvalidValue {
                key: "readiness.start_percent",
                value: start_percent.to_string(),
            });
        }
        Ok(())
    }

    pub fn pack_config(&self) -> PackConfig {
        PackConfig::new(self.rounds.count, self.rounds.capacity_minutes)
            .with_policy(self.rounds.policy)
            .with_order(self.rounds.order)
    }

    pub fn readiness_gate(&self) -> ReadinessGate {
        ReadinessGate {
            start_percent: self.readiness.start_percent,
            full_percent: self.readiness.full_percent,
        }
    }
}
