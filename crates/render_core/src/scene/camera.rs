//! # 3D Camera System
//!
//! Provides the camera abstraction the batch collector culls and sorts
//! against, with proper matrix mathematics following Johannes
//! Unterguggenberger's academically correct approach.
//!
//! ## Design Principles
//! - **Library-agnostic**: No graphics API dependencies in camera math
//! - **Immutable operation**: Methods don't modify camera state unexpectedly
//! - **Mathematical correctness**: Follows established computer graphics conventions

use bitflags::bitflags;

use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3};
use crate::spatial::bounds::Frustum;

bitflags! {
    /// Per-camera overrides applied during collection
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ViewOverrideFlags: u8 {
        /// Clamp material quality to the lowest level for this camera,
        /// regardless of the global quality setting
        const LOW_MATERIAL_QUALITY = 1 << 0;
    }
}

/// 3D camera for perspective projection
///
/// Represents a camera in 3D space with position, orientation, and projection
/// parameters.
///
/// # Coordinate System
/// Uses standard right-handed Y-up coordinates in view space; the clip-space
/// coordinate transform is applied when building the combined matrix, so
/// frustum extraction and depth ranges stay consistent with the projection
/// matrices in `foundation::math`.
///
/// # Performance Notes
/// Matrix calculations are performed on-demand rather than cached. For
/// performance-critical applications with static cameras, consider caching
/// the computed matrices.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,

    /// Point the camera is looking at in world space
    pub target: Vec3,

    /// Up vector for camera orientation (typically [0, 1, 0])
    pub up: Vec3,

    /// Field of view angle in radians
    pub fov: f32,

    /// Aspect ratio (width / height) for projection calculations
    pub aspect: f32,

    /// Distance to near clipping plane
    pub near: f32,

    /// Distance to far clipping plane
    pub far: f32,

    /// Collection-time overrides active for this camera
    pub view_overrides: ViewOverrideFlags,
}

impl Camera {
    /// Create a new perspective camera with standard Y-up orientation
    ///
    /// # Arguments
    /// * `position` - Camera position in world space
    /// * `fov_degrees` - Field of view angle in degrees (converted to radians internally)
    /// * `aspect` - Aspect ratio (width / height) of the viewport
    /// * `near` - Distance to near clipping plane (must be > 0)
    /// * `far` - Distance to far clipping plane (must be > near)
    ///
    /// The default target is the origin and the up vector is +Y; both can be
    /// customized after creation.
    pub fn perspective(position: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            target: Vec3::zeros(),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov: utils::deg_to_rad(fov_degrees),
            aspect,
            near,
            far,
            view_overrides: ViewOverrideFlags::empty(),
        }
    }

    /// Update camera position in world space
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        log::trace!("Camera position updated to: {:?}", position);
    }

    /// Configure camera to look at a specific point with custom up vector
    ///
    /// The up vector doesn't need to be perpendicular to the view direction;
    /// the view matrix calculation orthonormalizes the basis.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        self.target = target;
        self.up = up;
        log::trace!("Camera look_at updated - target: {:?}, up: {:?}", target, up);
    }

    /// Get the view matrix transforming world space to view space
    pub fn get_view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.target, self.up)
    }

    /// Get the perspective projection matrix
    pub fn get_projection_matrix(&self) -> Mat4 {
        Mat4::perspective(self.fov, self.aspect, self.near, self.far)
    }

    /// Get the combined clip-space matrix (projection x coordinate transform x view)
    pub fn get_view_projection_matrix(&self) -> Mat4 {
        self.get_projection_matrix() * Mat4::vulkan_coordinate_transform() * self.get_view_matrix()
    }

    /// Extract the world-space culling frustum for this camera
    pub fn frustum(&self) -> Frustum {
        Frustum::from_matrix(&self.get_view_projection_matrix())
    }
}
