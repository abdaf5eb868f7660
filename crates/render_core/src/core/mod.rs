//! # Core Module
//!
//! Shared abstractions the rest of the crate depends on: the configuration
//! system and the frame-scoped work queue that drives every parallel
//! collection stage.
//!
//! ## Organization
//!
//! - **Config**: Configuration types with TOML/RON file loading
//! - **WorkQueue**: Deterministic fork/join execution over worker lanes

pub mod config;
pub mod work_queue;

// Re-export commonly used types
pub use config::{CollectorConfig, Config, ConfigError, QualityLevel};
pub use work_queue::{LaneJob, WorkQueue};
