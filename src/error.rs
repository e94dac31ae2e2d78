use thiserror::Error;

use crate::types::TaskId;

/// Caller contract violations rejected before packing starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PackError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("invalid task '{id}': estimated_minutes must be > 0")]
    InvalidTask { id: TaskId },
}

/// Reasons a large task cannot be broken into round-sized steps.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SplitError {
    #[error("split needs at least one step")]
    NoSteps,

    #[error("{minutes} min is too big for one session ({limit} min max)")]
    ExceedsSession { minutes: u32, limit: u32 },

    #[error("each step still exceeds {capacity} min (you'd need {needed} min per step)")]
    StepTooLong { needed: u32, capacity: u32 },

    #[error("{minutes} min cannot be spread over {steps} steps")]
    StepTooShort { minutes: u32, steps: usize },

    #[error(transparent)]
    Pack(#[from] PackError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}
