use std::time::Duration;

use crate::{difficulty::Difficulty, error::ConfigError, thermal::DEFAULT_THRESHOLD};

/// Everything needed to build a [`crate::ThermalAwareSelector`]
#[derive(Clone, PartialEq, Debug)]
pub struct EngineConfig {
    pub difficulty: Difficulty,
    /// degrees Celsius at which the reduced engine takes over
    pub threshold: f64,
    /// how long one temperature reading is reused
    pub cache_ttl: Duration,
    /// overrides the difficulty's own depths when set
    pub standard_depth: Option<u8>,
    pub reduced_depth: Option<u8>,
    pub time_limit: Option<Duration>,
    pub parallel: bool,
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            threshold: DEFAULT_THRESHOLD,
            cache_ttl: Duration::from_secs(5),
            standard_depth: None,
            reduced_depth: None,
            time_limit: None,
            parallel: false,
            seed: 0,
        }
    }
}

impl EngineConfig {
    pub fn standard_depth(&self) -> u8 {
        self.standard_depth.unwrap_or(self.difficulty.depth())
    }

    pub fn reduced_depth(&self) -> u8 {
        self.reduced_depth.unwrap_or(self.difficulty.reduced_depth())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.threshold.is_finite() {
            return Err(ConfigError::Validation(format!(
                "threshold must be a finite temperature, got {}",
                self.threshold
            )));
        }
        if self.standard_depth() == 0 {
            return Err(ConfigError::Validation("standard depth must be >= 1".to_string()));
        }
        if self.reduced_depth() == 0 {
            return Err(ConfigError::Validation("reduced depth must be >= 1".to_string()));
        }
        if self.reduced_depth() > self.standard_depth() {
            return Err(ConfigError::Validation(format!(
                "reduced depth {} is deeper than standard depth {}",
                self.reduced_depth(),
                self.standard_depth()
            )));
        }
        if self.time_limit.is_some_and(|limit| limit.is_zero()) {
            return Err(ConfigError::Validation("time limit must be non-zero".to_string()));
        }
        Ok(())
    }
}
