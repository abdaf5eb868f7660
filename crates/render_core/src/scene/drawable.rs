//! Drawable abstraction consumed by the batch collector
//!
//! The collector never owns scene objects; it sees them through the
//! [`Drawable`] trait. Geometry drawables expose source batches, lights
//! expose their [`Light`](crate::scene::Light) parameters, and both keep
//! their own distance bookkeeping up to date in the per-frame update call.

use bitflags::bitflags;

use crate::foundation::math::Vec3;
use crate::scene::light::Light;
use crate::scene::material::MaterialId;
use crate::spatial::bounds::Aabb;

bitflags! {
    /// What a drawable contributes to the frame
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DrawableFlags: u8 {
        /// Renderable geometry with source batches
        const GEOMETRY = 1 << 0;
        /// Light source
        const LIGHT = 1 << 1;
    }
}

/// Identifier of a geometry resource owned by the application.
///
/// The collector never dereferences geometry; the id only contributes to
/// batch identity and pipeline-state keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct GeometryId(pub u32);

/// One renderable piece of a drawable
#[derive(Debug, Clone, Copy)]
pub struct SourceBatch {
    /// Geometry to draw
    pub geometry: GeometryId,
    /// Material override; `None` falls back to the registry's default material
    pub material: Option<MaterialId>,
}

/// Per-frame context handed to drawables during batch update
#[derive(Debug, Clone, Copy)]
pub struct FrameInfo {
    /// Monotonic frame number
    pub frame_number: u64,
    /// World-space camera position, for distance bookkeeping
    pub camera_position: Vec3,
}

/// Scene object visible to the collector: geometry, light, or both.
///
/// Implementations must tolerate `update_batches` running on a worker
/// thread; each drawable is updated by exactly one lane per frame, and all
/// other trait methods are called only after that update.
pub trait Drawable: Send + Sync {
    /// Prepare per-frame state (world transforms, camera distance, LOD
    /// distance). Called once per frame before any other access.
    fn update_batches(&mut self, frame: &FrameInfo);

    /// World-space bounds. Half-extents at or beyond
    /// [`LARGE_VALUE`](crate::foundation::math::constants::LARGE_VALUE)
    /// mark the drawable as unbounded (skyboxes, directional lights).
    fn world_bounds(&self) -> Aabb;

    /// What this drawable contributes to the frame
    fn flags(&self) -> DrawableFlags;

    /// Camera distance computed by the last [`Drawable::update_batches`] call
    fn distance(&self) -> f32;

    /// Distance used for technique LOD selection
    fn lod_distance(&self) -> f32 {
        self.distance()
    }

    /// Beyond this camera distance the drawable is skipped entirely;
    /// zero disables the limit
    fn draw_distance(&self) -> f32 {
        0.0
    }

    /// Layer mask matched against light masks during light collection
    fn light_mask(&self) -> u32 {
        u32::MAX
    }

    /// Source batches to submit while this drawable is visible geometry
    fn source_batches(&self) -> &[SourceBatch] {
        &[]
    }

    /// Light parameters when this drawable is a light source
    fn as_light(&self) -> Option<&Light> {
        None
    }
}
