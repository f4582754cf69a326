//! Engine configuration assembled by host layers.
//!
//! # Invariants
//! - A validated config always has a positive sampling interval, a finite
//!   non-negative displacement, a non-empty storage key and a supported level.

use crate::logging::{default_log_level, normalize_level};
use crate::repo::reminder_store::REMINDERS_STORAGE_KEY;
use crate::tracking::provider::SamplingPolicy;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Tunables for the reminder engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub sampling: SamplingPolicy,
    /// Storage key holding the serialized reminder collection.
    pub storage_key: String,
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sampling: SamplingPolicy::default(),
            storage_key: REMINDERS_STORAGE_KEY.to_string(),
            log_level: default_log_level().to_string(),
        }
    }
}

impl EngineConfig {
    pub fn with_sampling(mut self, sampling: SamplingPolicy) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_storage_key(mut self, storage_key: impl Into<String>) -> Self {
        self.storage_key = storage_key.into();
        self
    }

    pub fn with_log_level(mut self, log_level: impl Into<String>) -> Self {
        self.log_level = log_level.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sampling.interval_ms == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        let displacement = self.sampling.min_displacement_meters;
        if !displacement.is_finite() || displacement < 0.0 {
            return Err(ConfigError::InvalidDisplacement(displacement));
        }
        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::EmptyStorageKey);
        }
        normalize_level(&self.log_level).map_err(ConfigError::InvalidLogLevel)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    InvalidInterval,
    InvalidDisplacement(f64),
    EmptyStorageKey,
    InvalidLogLevel(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInterval => write!(f, "sampling interval must be greater than zero"),
            Self::InvalidDisplacement(value) => {
                write!(f, "minimum displacement must be a non-negative number, got {value}")
            }
            Self::EmptyStorageKey => write!(f, "storage key cannot be empty"),
            Self::InvalidLogLevel(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ConfigError {}
