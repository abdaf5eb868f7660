//! Per-light frame processing: lit-geometry queries and lighting accumulation
//!
//! Each visible light owns a [`LightData`] record holding the geometries it
//! lights this frame. Records are recycled through [`LightDataCache`] keyed
//! by stable light id, so a light that stays visible keeps its allocation
//! across frames. The queries themselves go through the spatial index for
//! spot and point lights and through the visible-geometry list for
//! directional ones.

use std::collections::HashMap;

use crate::core::work_queue::WorkQueue;
use crate::render::light_accumulator::{AccumulatedLight, LightAccumulatorSet};
use crate::render::transient::{DrawableTraits, TransientDrawableIndex};
use crate::scene::drawable::{Drawable, DrawableFlags};
use crate::scene::light::{Light, LightId, LightType};
use crate::spatial::query::SpatialIndex;

/// Frames a cache entry may go unused before it is dropped
pub const LIGHT_CACHE_PRUNE_AGE: u64 = 64;

/// Frame state of one visible light
#[derive(Debug, Default)]
pub struct LightData {
    /// Drawable indices of the geometries this light reaches
    pub lit_geometries: Vec<u32>,
    last_used_frame: u64,
}

/// Cross-frame recycling pool for [`LightData`], keyed by light id.
///
/// Dense drawable indices shift as the scene changes, so the pool keys on
/// the stable [`LightId`] instead. Entries unused for
/// [`LIGHT_CACHE_PRUNE_AGE`] frames are dropped, which bounds the pool when
/// lights disappear from the scene.
pub struct LightDataCache {
    entries: HashMap<LightId, LightData>,
}

impl LightDataCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Drop entries that have not been taken for too long
    pub fn begin_frame(&mut self, frame: u64) {
        self.entries
            .retain(|_, data| frame.saturating_sub(data.last_used_frame) <= LIGHT_CACHE_PRUNE_AGE);
    }

    /// Check out the record for a light, creating one on first sight.
    ///
    /// The returned record is cleared but keeps its allocation.
    pub fn take(&mut self, id: LightId, frame: u64) -> LightData {
        let mut data = self.entries.remove(&id).unwrap_or_default();
        data.lit_geometries.clear();
        data.last_used_frame = frame;
        data
    }

    /// Return a checked-out record to the pool
    pub fn put_back(&mut self, id: LightId, data: LightData) {
        self.entries.insert(id, data);
    }

    /// Number of pooled records
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the pool holds no records
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LightDataCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Collect the drawable indices of geometries lit by `light` into `out`.
///
/// A geometry qualifies when it was marked visible this frame, its light
/// mask intersects the light's, and its bounds touch the light volume.
/// Directional lights skip the spatial query and filter the already-merged
/// visible-geometry list by mask alone.
pub(crate) fn collect_lit_geometries(
    light: &Light,
    scene: &[Box<dyn Drawable>],
    spatial_index: &dyn SpatialIndex,
    transient: &TransientDrawableIndex,
    visible_geometries: &[u32],
    out: &mut Vec<u32>,
) {
    let mask = light.light_mask;
    match light.light_type {
        LightType::Spot => {
            let frustum = light.spot_frustum();
            spatial_index.query_frustum(&frustum, DrawableFlags::GEOMETRY, &mut |index, inside| {
                let Some(drawable) = scene.get(index as usize) else {
                    return;
                };
                if !transient.traits(index).contains(DrawableTraits::VISIBLE_GEOMETRY) {
                    return;
                }
                if drawable.light_mask() & mask == 0 {
                    return;
                }
                if inside || frustum.intersects_aabb(&drawable.world_bounds()) {
                    out.push(index);
                }
            });
        }
        LightType::Point => {
            let sphere = light.volume_sphere();
            spatial_index.query_sphere(&sphere, DrawableFlags::GEOMETRY, &mut |index, inside| {
                let Some(drawable) = scene.get(index as usize) else {
                    return;
                };
                if !transient.traits(index).contains(DrawableTraits::VISIBLE_GEOMETRY) {
                    return;
                }
                if drawable.light_mask() & mask == 0 {
                    return;
                }
                if inside || sphere.intersects_aabb(&drawable.world_bounds()) {
                    out.push(index);
                }
            });
        }
        LightType::Directional => {
            for &index in visible_geometries {
                if scene[index as usize].light_mask() & mask != 0 {
                    out.push(index);
                }
            }
        }
    }
}

/// Offer `light` to the accumulator of every geometry it lights.
///
/// Distance is penalized by the light's intensity divisor so brighter
/// lights rank as if they were closer; directional lights rank at distance
/// zero.
pub(crate) fn accumulate_forward_lighting(
    queue: &WorkQueue,
    threshold: usize,
    scene: &[Box<dyn Drawable>],
    light: &Light,
    light_index: u32,
    lit_geometries: &[u32],
    accumulators: &LightAccumulatorSet,
) {
    let penalty = 1.0 / light.intensity_divisor();
    let importance = light.importance;

    queue.for_each(lit_geometries, threshold, |_lane, &drawable_index| {
        let distance = match light.light_type {
            LightType::Directional => 0.0,
            LightType::Point | LightType::Spot => {
                let bounds = scene[drawable_index as usize].world_bounds();
                (light.position - bounds.center()).magnitude()
            }
        };
        accumulators.insert(
            drawable_index,
            AccumulatedLight {
                importance,
                scaled_distance: distance * penalty,
                light_index,
            },
        );
    });
}
