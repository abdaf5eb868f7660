//! # Render Core
//!
//! Per-frame scene batch collection and pipeline-state resolution for
//! forward renderers.
//!
//! Given a camera, a spatial index of drawables and lights, and a set of
//! scene pass descriptions, the collector produces sorted draw batches each
//! paired with a memoized pipeline state, ready for submission:
//!
//! - **Visibility**: parallel culling and per-drawable batch update, with
//!   technique selection by LOD and quality
//! - **Lighting**: per-light geometry queries and a budget-limited,
//!   importance-ranked per-drawable light accumulation
//! - **Classification**: intermediate batches become final ones, pipeline
//!   states resolved through a two-phase cache (parallel lookup,
//!   single-threaded creation)
//! - **Sorting**: deterministic submission order per pass
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use render_core::prelude::*;
//!
//! struct NullBackend;
//!
//! impl PipelineBackend for NullBackend {
//!     fn create_pipeline_state(
//!         &mut self,
//!         _desc: &PipelineStateDesc<'_>,
//!     ) -> Result<u64, PipelineStateError> {
//!         Ok(0)
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut materials = MaterialRegistry::new();
//!     let mut collector = SceneBatchCollector::new(CollectorConfig::default());
//!     collector.initialize_passes(
//!         &[ScenePassDescription::unlit("opaque", "base")],
//!         &mut materials,
//!     )?;
//!
//!     let mut scene: Vec<Box<dyn Drawable>> = Vec::new();
//!     let octree = Octree::new(
//!         Aabb::from_center_extents(Vec3::zeros(), Vec3::new(100.0, 100.0, 100.0)),
//!         OctreeConfig::default(),
//!     );
//!     let camera = Camera::perspective(Vec3::new(0.0, 0.0, 10.0), 60.0, 1.0, 0.1, 100.0);
//!
//!     let stats = collector.collect(&mut scene, &octree, &camera, &materials, &mut NullBackend)?;
//!     println!("{} batches", stats.total_batches);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod core;
pub mod foundation;
pub mod render;
pub mod scene;
pub mod spatial;

/// Common imports for collector users
pub mod prelude {
    pub use crate::{
        core::{CollectorConfig, Config, QualityLevel, WorkQueue},
        foundation::math::{Mat4, Vec3},
        render::{
            BatchSortMode, CollectError, FrameStats, PipelineBackend, PipelineStateDesc,
            PipelineStateError, SceneBatch, SceneBatchCollector, ScenePassDescription,
            ScenePassType,
        },
        scene::{
            Camera, Drawable, DrawableFlags, FrameInfo, GeometryId, Light, LightId, Material,
            MaterialId, MaterialRegistry, Model, Pass, SourceBatch, Technique, TechniqueEntry,
        },
        spatial::{Aabb, Octree, OctreeConfig, SpatialIndex},
    };
}
