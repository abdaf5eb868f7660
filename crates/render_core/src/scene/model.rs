//! Minimal static-geometry drawable
//!
//! Enough of a model implementation to feed the collector: world bounds,
//! source batches and distance bookkeeping. Applications with richer scene
//! objects implement [`Drawable`] themselves.

use crate::scene::drawable::{Drawable, DrawableFlags, FrameInfo, GeometryId, SourceBatch};
use crate::scene::material::MaterialId;
use crate::spatial::bounds::Aabb;

/// A static geometry drawable with fixed world bounds
#[derive(Debug, Clone)]
pub struct Model {
    bounds: Aabb,
    batches: Vec<SourceBatch>,
    light_mask: u32,
    draw_distance: f32,
    distance: f32,
}

impl Model {
    /// Create a model with the given world bounds and no batches
    pub fn new(bounds: Aabb) -> Self {
        Self {
            bounds,
            batches: Vec::new(),
            light_mask: u32::MAX,
            draw_distance: 0.0,
            distance: 0.0,
        }
    }

    /// Append a source batch; builder style for scene setup
    pub fn with_batch(mut self, geometry: GeometryId, material: Option<MaterialId>) -> Self {
        self.batches.push(SourceBatch { geometry, material });
        self
    }

    /// Set the receiving light mask; builder style for scene setup
    pub fn with_light_mask(mut self, mask: u32) -> Self {
        self.light_mask = mask;
        self
    }

    /// Set the maximum draw distance; builder style for scene setup
    pub fn with_draw_distance(mut self, distance: f32) -> Self {
        self.draw_distance = distance;
        self
    }

    /// Move or resize the model
    pub fn set_bounds(&mut self, bounds: Aabb) {
        self.bounds = bounds;
    }
}

impl Drawable for Model {
    fn update_batches(&mut self, frame: &FrameInfo) {
        self.distance = (self.bounds.center() - frame.camera_position).magnitude();
    }

    fn world_bounds(&self) -> Aabb {
        self.bounds
    }

    fn flags(&self) -> DrawableFlags {
        DrawableFlags::GEOMETRY
    }

    fn distance(&self) -> f32 {
        self.distance
    }

    fn draw_distance(&self) -> f32 {
        self.draw_distance
    }

    fn light_mask(&self) -> u32 {
        self.light_mask
    }

    fn source_batches(&self) -> &[SourceBatch] {
        &self.batches
    }
}
