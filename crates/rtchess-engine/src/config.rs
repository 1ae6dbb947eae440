//! Engine configuration.
//!
//! [`EngineConfig`] gathers every tunable the engine reads: tick rate, board
//! geometry, motion timing and admission limits. It deserializes from JSON,
//! with every field optional and defaulted, and is validated on load.
//!
//! # Example
//!
//! ```
//! use rtchess_engine::config::EngineConfig;
//!
//! let config = EngineConfig::from_json(r#"{ "tick_rate_hz": 60, "admission": { "max_jump_distance": 2 } }"#).unwrap();
//! assert_eq!(config.tick_rate_hz, 60.0);
//! assert_eq!(config.admission.max_jump_distance, 2);
//! assert_eq!(config.admission.max_move_distance, 1);
//! assert_eq!(config.board.width, 8);
//! ```

use std::path::Path;
use std::time::Duration;

use rtchess_core::board::Board;
use rtchess_core::motion::MotionConfig;
use rtchess_core::state::DEFAULT_MIN_DWELL_MS;
use rtchess_events::journal::DEFAULT_MAX_HISTORY;
use serde::{Deserialize, Serialize};

/// Slowest accepted tick rate: one tick every 1000 seconds.
pub const MIN_TICK_RATE_HZ: f64 = 0.001;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors produced while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The text was not valid JSON for [`EngineConfig`].
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    /// A value was out of range.
    #[error("invalid config value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ---------------------------------------------------------------------------
// AdmissionConfig
// ---------------------------------------------------------------------------

/// Limits applied by the command processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Largest Chebyshev distance a plain move may cover.
    pub max_move_distance: u32,
    /// Largest Chebyshev distance a jump may cover.
    pub max_jump_distance: u32,
    /// Minimum time a piece's state must exist before it accepts another
    /// command.
    pub min_dwell_ms: u64,
    /// Also require the destination to be reachable through the piece
    /// type's move rules.
    pub enforce_move_rules: bool,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_move_distance: 1,
            max_jump_distance: 3,
            min_dwell_ms: DEFAULT_MIN_DWELL_MS,
            enforce_move_rules: false,
        }
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Simulation ticks per second.
    pub tick_rate_hz: f64,
    /// Board geometry.
    pub board: Board,
    /// Default motion timing for every piece type.
    pub motion: MotionConfig,
    /// Admission limits.
    pub admission: AdmissionConfig,
    /// Number of events kept in the journal.
    pub event_history: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 30.0,
            board: Board::default(),
            motion: MotionConfig::default(),
            admission: AdmissionConfig::default(),
            event_history: DEFAULT_MAX_HISTORY,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Check every value for range errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tick_rate_hz >= MIN_TICK_RATE_HZ && self.tick_rate_hz.is_finite()) {
            return Err(invalid(
                "tick_rate_hz",
                format!(
                    "must be finite and at least {MIN_TICK_RATE_HZ}, got {}",
                    self.tick_rate_hz
                ),
            ));
        }
        if self.board.width == 0 || self.board.height == 0 {
            return Err(invalid(
                "board",
                format!("must be non-empty, got {}x{}", self.board.width, self.board.height),
            ));
        }
        // Square encoding uses one letter per column.
        if self.board.width > 26 {
            return Err(invalid(
                "board.width",
                format!("at most 26 columns are supported, got {}", self.board.width),
            ));
        }
        let rate = self.motion.slide_cells_per_sec;
        if !(rate > 0.0 && rate.is_finite()) {
            return Err(invalid(
                "motion.slide_cells_per_sec",
                format!("must be positive and finite, got {rate}"),
            ));
        }
        if self.admission.max_move_distance == 0 {
            return Err(invalid("admission.max_move_distance", "must be at least 1".into()));
        }
        if self.admission.max_move_distance > self.admission.max_jump_distance {
            return Err(invalid(
                "admission.max_move_distance",
                format!(
                    "must not exceed max_jump_distance ({} > {})",
                    self.admission.max_move_distance, self.admission.max_jump_distance
                ),
            ));
        }
        Ok(())
    }

    /// Wall-clock budget of one tick. Unvalidated rates saturate to
    /// [`Duration::MAX`] or zero instead of panicking.
    pub fn tick_interval(&self) -> Duration {
        let secs = 1.0 / self.tick_rate_hz;
        if secs.is_nan() {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}
