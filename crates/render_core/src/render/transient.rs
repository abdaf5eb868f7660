//! Per-frame transient drawable state
//!
//! The collector tracks a small amount of state per drawable per frame:
//! which pipeline stages have touched it and its view-space depth interval.
//! Both live in flat arrays indexed by drawable index and are written from
//! worker lanes during the visibility phase, so the storage is atomic and
//! the writes use relaxed ordering; the lane barrier at the end of each
//! phase publishes the values.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use bitflags::bitflags;

use crate::foundation::math::{constants, Mat4, Vec3};
use crate::spatial::bounds::Aabb;

bitflags! {
    /// Stage markers accumulated for one drawable over one frame
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DrawableTraits: u8 {
        /// `update_batches` ran this frame
        const UPDATED = 1 << 0;
        /// Passed culling and distance checks as geometry
        const VISIBLE_GEOMETRY = 1 << 1;
        /// At least one pass classified the drawable as forward lit
        const FORWARD_LIT = 1 << 2;
    }
}

/// View-space depth interval of a drawable or of the whole scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZRange {
    /// Nearest depth
    pub min: f32,
    /// Farthest depth
    pub max: f32,
}

impl ZRange {
    /// The empty interval; merging it leaves the other operand unchanged
    pub const EMPTY: Self = Self {
        min: constants::LARGE_VALUE,
        max: -constants::LARGE_VALUE,
    };

    /// Sentinel for unbounded drawables, excluded from scene aggregation
    pub const INFINITE: Self = Self {
        min: constants::LARGE_VALUE,
        max: constants::LARGE_VALUE,
    };

    /// True for the empty interval
    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    /// True for the unbounded sentinel
    pub fn is_infinite(&self) -> bool {
        self.min >= constants::LARGE_VALUE
    }

    /// Extend this interval to cover `other`
    pub fn merge(&mut self, other: &ZRange) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }
}

impl Default for ZRange {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Projects world-space bounds onto the camera's view axis.
///
/// Built once per frame from the view matrix; evaluation is a couple of dot
/// products, cheap enough to run inline in the visibility loop.
#[derive(Debug, Clone, Copy)]
pub struct ZRangeEvaluator {
    z_axis: Vec3,
    offset: f32,
}

impl ZRangeEvaluator {
    /// Build an evaluator from a world-to-view matrix.
    ///
    /// The view matrix maps world positions into a space where the camera
    /// looks down -Z, so depth in front of the camera is the negated third
    /// row applied to the world position.
    pub fn new(view: &Mat4) -> Self {
        Self {
            z_axis: -Vec3::new(view[(2, 0)], view[(2, 1)], view[(2, 2)]),
            offset: -view[(2, 3)],
        }
    }

    /// Depth interval covered by `bounds`.
    ///
    /// Unbounded boxes produce [`ZRange::INFINITE`] so skyboxes and
    /// directional light volumes never stretch the scene interval.
    pub fn evaluate(&self, bounds: &Aabb) -> ZRange {
        let extents = bounds.extents();
        if extents.magnitude_squared() >= constants::LARGE_VALUE * constants::LARGE_VALUE {
            return ZRange::INFINITE;
        }

        let center_depth = self.z_axis.dot(&bounds.center()) + self.offset;
        let edge = extents.x * self.z_axis.x.abs()
            + extents.y * self.z_axis.y.abs()
            + extents.z * self.z_axis.z.abs();

        ZRange {
            min: center_depth - edge,
            max: center_depth + edge,
        }
    }
}

fn pack_z_range(range: ZRange) -> u64 {
    (u64::from(range.min.to_bits()) << 32) | u64::from(range.max.to_bits())
}

fn unpack_z_range(bits: u64) -> ZRange {
    ZRange {
        min: f32::from_bits((bits >> 32) as u32),
        max: f32::from_bits(bits as u32),
    }
}

/// Frame-scoped per-drawable traits and depth intervals.
///
/// Indexed by drawable index. Reset once at the start of the frame on the
/// calling thread; after that, worker lanes store values for disjoint
/// drawables, so every atomic access is relaxed.
pub struct TransientDrawableIndex {
    traits: Vec<AtomicU8>,
    z_ranges: Vec<AtomicU64>,
}

impl TransientDrawableIndex {
    /// Create empty storage; call [`TransientDrawableIndex::reset`] before use
    pub fn new() -> Self {
        Self {
            traits: Vec::new(),
            z_ranges: Vec::new(),
        }
    }

    /// Size for `count` drawables and clear all values.
    ///
    /// Runs before any lane is spawned, so plain `get_mut` access is enough.
    pub fn reset(&mut self, count: usize) {
        if self.traits.len() < count {
            self.traits.resize_with(count, || AtomicU8::new(0));
            self.z_ranges
                .resize_with(count, || AtomicU64::new(pack_z_range(ZRange::EMPTY)));
        }
        let empty = pack_z_range(ZRange::EMPTY);
        for (trait_slot, z_slot) in self.traits.iter_mut().zip(&mut self.z_ranges) {
            *trait_slot.get_mut() = 0;
            *z_slot.get_mut() = empty;
        }
    }

    /// Number of drawables currently tracked
    pub fn len(&self) -> usize {
        self.traits.len()
    }

    /// True when no drawables are tracked
    pub fn is_empty(&self) -> bool {
        self.traits.is_empty()
    }

    /// Merge `traits` into the drawable's marker set
    pub fn mark(&self, index: u32, traits: DrawableTraits) {
        self.traits[index as usize].fetch_or(traits.bits(), Ordering::Relaxed);
    }

    /// Markers accumulated for the drawable so far this frame
    pub fn traits(&self, index: u32) -> DrawableTraits {
        DrawableTraits::from_bits_truncate(self.traits[index as usize].load(Ordering::Relaxed))
    }

    /// Record the drawable's depth interval for this frame
    pub fn store_z_range(&self, index: u32, range: ZRange) {
        self.z_ranges[index as usize].store(pack_z_range(range), Ordering::Relaxed);
    }

    /// Depth interval recorded for the drawable this frame
    pub fn z_range(&self, index: u32) -> ZRange {
        unpack_z_range(self.z_ranges[index as usize].load(Ordering::Relaxed))
    }
}

impl Default for TransientDrawableIndex {
    fn default() -> Self {
        Self::new()
    }
}
