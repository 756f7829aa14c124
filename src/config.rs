//! Construction-time tunables for the simulator.
//!
//! Every field has a default, so a JSON file only needs the keys it overrides.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 32000;
pub const DEFAULT_SEED: u64 = 109;
/// Largest imagery chunk, in pixels. Keeps encoded image frames well under
/// the transport's frame limit.
pub const MAX_CHUNK_PIXELS: u64 = 512 * 512;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub host: String,
    pub port: u16,
    pub seed: u64,
    pub view_width: f64,
    pub view_height: f64,
    pub chunk_width: u32,
    pub chunk_height: u32,
    pub max_entities: usize,
    /// Entities spawned at session start. `None` fills the field to `max_entities`.
    pub initial_entities: Option<usize>,
    pub spawn_probability: f64,
    pub mean_size: f64,
    pub size_stddev: f64,
    pub max_speed: f64,
    pub broadcast_period_ms: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            seed: DEFAULT_SEED,
            view_width: 1000.0,
            view_height: 1000.0,
            chunk_width: 50,
            chunk_height: 50,
            max_entities: 10,
            initial_entities: None,
            spawn_probability: 0.2,
            mean_size: 20.0,
            size_stddev: 10.0,
            max_speed: 3.0,
            broadcast_period_ms: 1000,
        }
    }
}

impl SimConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.view_width > 0.0 && self.view_height > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "view region must be positive, got {}x{}",
                self.view_width, self.view_height
            )));
        }
        if self.chunk_width == 0 || self.chunk_height == 0 {
            return Err(ConfigError::Invalid(format!(
                "chunk size must be positive, got {}x{}",
                self.chunk_width, self.chunk_height
            )));
        }
        if u64::from(self.chunk_width) * u64::from(self.chunk_height) > MAX_CHUNK_PIXELS {
            return Err(ConfigError::Invalid(format!(
                "chunk of {}x{} exceeds {} pixels",
                self.chunk_width, self.chunk_height, MAX_CHUNK_PIXELS
            )));
        }
        if !(0.0..=1.0).contains(&self.spawn_probability) {
            return Err(ConfigError::Invalid(format!(
                "spawn probability must be within [0, 1], got {}",
                self.spawn_probability
            )));
        }
        if !(self.max_speed >= 0.0 && self.max_speed.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "max speed must be finite and non-negative, got {}",
                self.max_speed
            )));
        }
        if !(self.size_stddev >= 0.0 && self.mean_size.is_finite() && self.size_stddev.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "size distribution must be finite with non-negative stddev, got mean {} stddev {}",
                self.mean_size, self.size_stddev
            )));
        }
        // A degenerate distribution at zero could never yield a positive size.
        if self.mean_size == 0.0 && self.size_stddev == 0.0 {
            return Err(ConfigError::Invalid(
                "mean size and size stddev cannot both be zero".to_string(),
            ));
        }
        if self.broadcast_period_ms == 0 {
            return Err(ConfigError::Invalid("broadcast period must be positive".to_string()));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn broadcast_period(&self) -> Duration {
        Duration::from_millis(self.broadcast_period_ms)
    }

    pub fn initial_entity_count(&self) -> usize {
        self.initial_entities.unwrap_or(self.max_entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.port, 32000);
        assert_eq!(config.seed, 109);
        assert_eq!(config.initial_entity_count(), 10);
        assert_eq!(config.broadcast_period(), Duration::from_millis(1000));
        assert_eq!(config.listen_addr(), "127.0.0.1:32000");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SimConfig::from_json_str(r#"{"seed": 42, "max_entities": 25}"#).unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.max_entities, 25);
        assert_eq!(config.view_width, 1000.0);
        assert_eq!(config.chunk_height, 50);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            SimConfig::from_json_str(r#"{"spawn_probability": 1.5}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SimConfig::from_json_str(r#"{"view_width": 0.0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SimConfig::from_json_str(r#"{"broadcast_period_ms": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SimConfig::from_json_str(r#"{"mean_size": 0.0, "size_stddev": 0.0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SimConfig::from_json_str(r#"{"chunk_width": 4096, "chunk_height": 4096}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SimConfig::from_json_str("not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
