//! # Collector Configuration
//!
//! Configuration for the batch collection pipeline: material quality,
//! per-drawable light budget, worker lanes and the parallel-for thresholds.
//! Supports loading from TOML and RON files through the [`Config`] trait.

use serde::{Deserialize, Serialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Material quality tiers used for technique selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum QualityLevel {
    /// Cheapest techniques only
    #[default]
    Low,
    /// Mid-tier techniques
    Medium,
    /// All techniques allowed
    High,
}

/// Settings for the scene batch collector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Highest material quality techniques may require
    pub material_quality: QualityLevel,

    /// Per-drawable pixel light budget; lights beyond it are truncated by
    /// importance and penalized distance
    pub max_pixel_lights: usize,

    /// Worker thread count; 0 picks (available parallelism - 1) so the
    /// calling thread stays a full lane
    pub worker_threads: usize,

    /// Minimum drawables per parallel partition during visibility collection
    pub drawable_work_threshold: usize,

    /// Minimum lit geometries per parallel partition during light accumulation
    pub lit_geometry_work_threshold: usize,

    /// Minimum intermediate batches per parallel partition during classification
    pub batch_work_threshold: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            material_quality: QualityLevel::High,
            max_pixel_lights: 1,
            worker_threads: 0,
            drawable_work_threshold: 16,
            lit_geometry_work_threshold: 16,
            batch_work_threshold: 64,
        }
    }
}

impl CollectorConfig {
    /// Worker thread count after resolving the automatic setting
    pub fn resolved_worker_threads(&self) -> usize {
        if self.worker_threads > 0 {
            return self.worker_threads;
        }
        std::thread::available_parallelism()
            .map(|n| n.get().saturating_sub(1))
            .unwrap_or(0)
    }

    /// Pixel light budget with the lower bound applied
    pub fn effective_max_pixel_lights(&self) -> usize {
        self.max_pixel_lights.max(1)
    }
}

impl Config for CollectorConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_sane() {
        let config = CollectorConfig::default();
        assert_eq!(config.effective_max_pixel_lights(), 1);
        assert!(config.drawable_work_threshold > 0);
        assert_eq!(config.material_quality, QualityLevel::High);
    }

    #[test]
    fn test_quality_levels_are_ordered() {
        assert!(QualityLevel::Low < QualityLevel::Medium);
        assert!(QualityLevel::Medium < QualityLevel::High);
    }

    #[test]
    fn test_config_toml_round_trip() {
        let mut config = CollectorConfig::default();
        config.material_quality = QualityLevel::Medium;
        config.max_pixel_lights = 4;

        let text = toml::to_string(&config).unwrap();
        let parsed: CollectorConfig = toml::from_str(&text).unwrap();

        assert_eq!(parsed.material_quality, QualityLevel::Medium);
        assert_eq!(parsed.max_pixel_lights, 4);
    }

    #[test]
    fn test_zero_light_budget_clamps_to_one() {
        let config = CollectorConfig {
            max_pixel_lights: 0,
            ..CollectorConfig::default()
        };
        assert_eq!(config.effective_max_pixel_lights(), 1);
    }
}
