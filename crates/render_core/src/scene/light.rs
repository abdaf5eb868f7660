//! Light sources and their culling volumes
//!
//! Lights participate in the frame as drawables: they are stored in the
//! spatial index, culled against the camera, and then drive the per-light
//! lit-geometry queries. This module keeps the light data model together
//! with the volume math the collector needs (spot frustum, point sphere,
//! importance ranking and the pipeline-relevant hash).

use crate::foundation::math::{constants, Mat4, Mat4Ext, Vec3};
use crate::scene::drawable::{Drawable, DrawableFlags, FrameInfo};
use crate::spatial::bounds::{Aabb, Frustum, Sphere};

/// Stable identity of a light, unique within the scene.
///
/// Dense drawable indices shift as the scene changes; this id is what keeps
/// per-light caches valid across frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct LightId(pub u64);

/// Types of lights supported by the lighting system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightType {
    /// Directional light (like sunlight) with parallel rays
    Directional,
    /// Point light that radiates in all directions from a position
    Point,
    /// Spot light that creates a cone of light from a position
    Spot,
}

/// Relative priority of a light when a drawable's per-pixel budget overflows
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LightImportance {
    /// Always loses against auto and important lights
    NotImportant,
    /// Ranked purely by penalized distance
    #[default]
    Auto,
    /// Always wins against auto and not-important lights
    Important,
}

/// Divisor floor so lights with black effective color still rank
const INTENSITY_EPSILON: f32 = 1.0e-5;

/// A light source in the scene
#[derive(Debug, Clone)]
pub struct Light {
    /// Stable identity for caches spanning frames
    pub id: LightId,
    /// The type of light (directional, point, or spot)
    pub light_type: LightType,
    /// Position for point/spot lights in world space
    pub position: Vec3,
    /// Direction vector for directional/spot lights in world space
    pub direction: Vec3,
    /// RGB color values for the light (0.0 to 1.0 range)
    pub color: Vec3,
    /// Brightness multiplier applied to the color
    pub brightness: f32,
    /// Maximum range/distance for point/spot lights
    pub range: f32,
    /// Inner cone angle for spot lights in radians
    pub inner_cone: f32,
    /// Outer cone angle for spot lights in radians
    pub outer_cone: f32,
    /// Mask matched against drawable light masks
    pub light_mask: u32,
    /// Priority class for the per-drawable pixel light budget
    pub importance: LightImportance,
    /// Whether this light should cast shadows
    pub cast_shadows: bool,
    /// Camera distance from the last batch update
    distance: f32,
}

impl Light {
    /// Create a directional light with world-space direction
    pub fn directional(id: LightId, direction: Vec3, color: Vec3, brightness: f32) -> Self {
        Self {
            id,
            light_type: LightType::Directional,
            position: Vec3::zeros(),
            direction: direction.normalize(),
            color,
            brightness,
            range: 0.0,
            inner_cone: 0.0,
            outer_cone: 0.0,
            light_mask: u32::MAX,
            importance: LightImportance::default(),
            cast_shadows: false,
            distance: 0.0,
        }
    }

    /// Create a point light with world-space position
    pub fn point(id: LightId, position: Vec3, color: Vec3, brightness: f32, range: f32) -> Self {
        Self {
            id,
            light_type: LightType::Point,
            position,
            direction: Vec3::new(0.0, -1.0, 0.0),
            color,
            brightness,
            range,
            inner_cone: 0.0,
            outer_cone: 0.0,
            light_mask: u32::MAX,
            importance: LightImportance::default(),
            cast_shadows: false,
            distance: 0.0,
        }
    }

    /// Create a spot light with world-space position and direction
    pub fn spot(
        id: LightId,
        position: Vec3,
        direction: Vec3,
        color: Vec3,
        brightness: f32,
        range: f32,
        inner_cone: f32,
        outer_cone: f32,
    ) -> Self {
        Self {
            id,
            light_type: LightType::Spot,
            position,
            direction: direction.normalize(),
            color,
            brightness,
            range,
            inner_cone,
            outer_cone,
            light_mask: u32::MAX,
            importance: LightImportance::default(),
            cast_shadows: false,
            distance: 0.0,
        }
    }

    /// Set the layer mask; builder style for scene setup
    pub fn with_light_mask(mut self, mask: u32) -> Self {
        self.light_mask = mask;
        self
    }

    /// Set the importance class; builder style for scene setup
    pub fn with_importance(mut self, importance: LightImportance) -> Self {
        self.importance = importance;
        self
    }

    /// Color scaled by brightness
    pub fn effective_color(&self) -> Vec3 {
        self.color * self.brightness
    }

    /// Rec. 709 luminance of the effective color
    pub fn luminance(&self) -> f32 {
        let c = self.effective_color();
        0.2126 * c.x + 0.7152 * c.y + 0.0722 * c.z
    }

    /// True when the light cannot contribute: black effective color
    pub fn is_negligible(&self) -> bool {
        self.luminance() <= 0.0
    }

    /// Divisor applied to geometric distance when ranking lights per
    /// drawable; brighter lights rank as if they were closer
    pub fn intensity_divisor(&self) -> f32 {
        self.luminance().max(0.0) + INTENSITY_EPSILON
    }

    /// Pipeline-relevant state folded into lit batch keys.
    ///
    /// Nonzero by construction; zero is reserved for "no light".
    pub fn pipeline_hash(&self) -> u64 {
        let type_bits: u64 = match self.light_type {
            LightType::Directional => 1,
            LightType::Point => 2,
            LightType::Spot => 3,
        };
        type_bits | (u64::from(self.cast_shadows) << 2)
    }

    /// Culling frustum for a spot light
    pub fn spot_frustum(&self) -> Frustum {
        // Pick an up vector that is not parallel to the light direction
        let up = if self.direction.y.abs() > 0.99 {
            Vec3::new(1.0, 0.0, 0.0)
        } else {
            Vec3::new(0.0, 1.0, 0.0)
        };
        let view = Mat4::look_at(self.position, self.position + self.direction, up);
        let proj = Mat4::perspective(
            self.outer_cone.max(constants::MIN_NEAR_CLIP),
            1.0,
            constants::MIN_NEAR_CLIP,
            self.range.max(constants::MIN_NEAR_CLIP * 2.0),
        );
        Frustum::from_matrix(&(proj * Mat4::vulkan_coordinate_transform() * view))
    }

    /// Culling sphere for a point light
    pub fn volume_sphere(&self) -> Sphere {
        Sphere::new(self.position, self.range)
    }
}

impl Drawable for Light {
    fn update_batches(&mut self, frame: &FrameInfo) {
        self.distance = match self.light_type {
            LightType::Directional => 0.0,
            _ => (self.position - frame.camera_position).magnitude(),
        };
    }

    fn world_bounds(&self) -> Aabb {
        match self.light_type {
            // Unbounded: always passes the camera query
            LightType::Directional => Aabb::from_center_extents(
                Vec3::zeros(),
                Vec3::new(constants::LARGE_VALUE, constants::LARGE_VALUE, constants::LARGE_VALUE),
            ),
            // The whole spot cone fits inside the range sphere around the apex
            LightType::Point | LightType::Spot => {
                Aabb::from_center_extents(self.position, Vec3::new(self.range, self.range, self.range))
            }
        }
    }

    fn flags(&self) -> DrawableFlags {
        DrawableFlags::LIGHT
    }

    fn distance(&self) -> f32 {
        self.distance
    }

    fn light_mask(&self) -> u32 {
        self.light_mask
    }

    fn as_light(&self) -> Option<&Light> {
        Some(self)
    }
}
