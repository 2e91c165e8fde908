// Simulation Configuration
//
// Defaults, validation and the YAML simulation file. Values are layered as
// defaults <- YAML file <- command line flags; the binaries do the layering,
// this module only knows how to load and check a `Config`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tk_interface::Millis;

/// Upper bound on the number of talkers in one pool
pub const MAX_TALKERS: usize = 64;

// ============================================================================
// Errors
// ============================================================================

/// Reasons a configuration is rejected
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("talker count must be between 1 and {max}, got {got}")]
    TalkerCount { got: usize, max: usize },

    #[error("idle pause bounds must satisfy 0 < min <= max, got [{min}, {max}] ms")]
    IdleBounds { min: Millis, max: Millis },

    #[error("call duration bounds must satisfy 0 < min <= max, got [{min}, {max}] ms")]
    CallBounds { min: Millis, max: Millis },

    #[error("leave probability must be within 0..=1, got {0}")]
    LeaveProbability(f64),

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

// ============================================================================
// Synchronization mode
// ============================================================================

/// Which rendezvous strategy the talkers use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Two signal counters per talker (incoming call, call answered)
    #[default]
    Semaphore,
    /// Mailbox condition variable plus a two-party barrier per call
    Condition,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Semaphore => write!(f, "semaphore"),
            SyncMode::Condition => write!(f, "condition"),
        }
    }
}

// ============================================================================
// Main Configuration
// ============================================================================

/// Parameters of one simulation run, read-only once the run starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of talkers (1..=MAX_TALKERS)
    pub talkers: usize,

    /// Idle pause between loop iterations (milliseconds)
    pub min_idle_ms: Millis,
    pub max_idle_ms: Millis,

    /// Conversation length chosen by the caller (milliseconds)
    pub min_call_ms: Millis,
    pub max_call_ms: Millis,

    /// Leave after this many conversations (0 = no limit)
    pub stop_after_calls: u32,

    /// Chance of leaving, drawn once per loop iteration
    pub leave_probability: f64,

    /// Wall-clock budget for the whole run (0 = no limit)
    pub time_budget_ms: Millis,

    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            talkers: 4,
            min_idle_ms: 200,
            max_idle_ms: 800,
            min_call_ms: 300,
            max_call_ms: 1200,
            stop_after_calls: 0,
            leave_probability: 0.2,
            time_budget_ms: 10_000,
            seed: None,
        }
    }
}

impl Config {
    /// Check the bounds the simulation relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.talkers < 1 || self.talkers > MAX_TALKERS {
            return Err(ConfigError::TalkerCount {
                got: self.talkers,
                max: MAX_TALKERS,
            });
        }
        if self.min_idle_ms == 0 || self.max_idle_ms < self.min_idle_ms {
            return Err(ConfigError::IdleBounds {
                min: self.min_idle_ms,
                max: self.max_idle_ms,
            });
        }
        if self.min_call_ms == 0 || self.max_call_ms < self.min_call_ms {
            return Err(ConfigError::CallBounds {
                min: self.min_call_ms,
                max: self.max_call_ms,
            });
        }
        if !(0.0..=1.0).contains(&self.leave_probability) {
            return Err(ConfigError::LeaveProbability(self.leave_probability));
        }
        Ok(())
    }

    pub fn call_limit(&self) -> Option<u32> {
        (self.stop_after_calls > 0).then_some(self.stop_after_calls)
    }

    pub fn time_budget(&self) -> Option<Duration> {
        (self.time_budget_ms > 0).then(|| Duration::from_millis(self.time_budget_ms))
    }

    /// Upper bound on target picks per outbound call
    pub fn call_attempts(&self) -> usize {
        self.talkers * 2
    }
}

// ============================================================================
// Simulation File
// ============================================================================

/// YAML simulation file
///
/// ```yaml
/// meta:
///   name: "Crowded line"
/// mode: condition
/// output: outputs/run.log
/// config:
///   talkers: 8
///   leave_probability: 0.05
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationFile {
    #[serde(default)]
    pub meta: SimulationMeta,

    #[serde(default)]
    pub mode: Option<SyncMode>,

    /// Log file written next to the console output
    #[serde(default)]
    pub output: Option<PathBuf>,

    #[serde(default)]
    pub config: Config,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationMeta {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl SimulationFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
