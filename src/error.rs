//! Sequencer error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::step::StepId;

/// Exit code used when a command could not be started at all.
pub const EXIT_SPAWN_FAILED: i32 = 127;

/// Exit code used when the configuration could not be loaded.
pub const EXIT_CONFIG: i32 = 2;

/// Exit code used when a script succeeded but its environment was lost.
pub const EXIT_CAPTURE_FAILED: i32 = 1;

/// Errors that halt a bootstrap run.
#[derive(Error, Debug)]
pub enum SequenceError {
    #[error("step {step} failed: {cmd} (exit code: {code})")]
    StepFailed { step: StepId, cmd: String, code: i32 },

    #[error("step {step} failed to start: {cmd}: {source}")]
    Spawn {
        step: StepId,
        cmd: String,
        #[source]
        source: std::io::Error,
    },

    #[error("step {step} ran but its environment could not be captured: {cmd}: {source}")]
    Capture {
        step: StepId,
        cmd: String,
        #[source]
        source: std::io::Error,
    },
}

impl SequenceError {
    /// The step that stopped the sequence.
    pub fn step(&self) -> StepId {
        match self {
            Self::StepFailed { step, .. } | Self::Spawn { step, .. } | Self::Capture { step, .. } => {
                *step
            }
        }
    }

    /// Process exit code to propagate for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::StepFailed { code, .. } => *code,
            Self::Spawn { .. } => EXIT_SPAWN_FAILED,
            Self::Capture { .. } => EXIT_CAPTURE_FAILED,
        }
    }
}

/// Ways sourcing a script can fail before its exit status is known to matter.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to start: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("failed to capture environment: {0}")]
    Capture(#[source] std::io::Error),
}

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
