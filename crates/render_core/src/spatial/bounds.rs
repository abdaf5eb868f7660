//! Bounding volumes for spatial queries and culling

use crate::foundation::math::{Mat4, Vec3, Vec4};

/// Result of testing a bounding volume against a query volume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intersection {
    /// Completely outside the query volume
    Outside,
    /// Partially inside the query volume
    Intersects,
    /// Completely inside the query volume
    Inside,
}

/// Axis-Aligned Bounding Box for spatial queries
#[derive(Debug, Clone, Copy)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with given extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Check if this AABB fully contains another AABB
    pub fn contains_aabb(&self, other: &Aabb) -> bool {
        other.min.x >= self.min.x && other.max.x <= self.max.x &&
        other.min.y >= self.min.y && other.max.y <= self.max.y &&
        other.min.z >= self.min.z && other.max.z <= self.max.z
    }

    /// Check if this AABB intersects another AABB
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }
}

/// Plane defined by normal and distance from origin
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    /// Normal vector (should be normalized)
    pub normal: Vec3,
    /// Distance from origin along the normal
    pub distance: f32,
}

impl Plane {
    /// Create a new plane from normal and distance
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self {
            normal: normal.normalize(),
            distance,
        }
    }

    /// Build a plane from implicit-equation coefficients `(a, b, c, d)`.
    ///
    /// Normalizes the normal and scales the distance by the same factor, so
    /// signed distances stay in world units.
    pub fn from_coefficients(coefficients: Vec4) -> Self {
        let normal = Vec3::new(coefficients.x, coefficients.y, coefficients.z);
        let inv_len = 1.0 / normal.magnitude();
        Self {
            normal: normal * inv_len,
            distance: coefficients.w * inv_len,
        }
    }

    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(&point) + self.distance
    }
}

/// Frustum for visibility culling
#[derive(Debug, Clone)]
pub struct Frustum {
    /// Six planes defining the frustum (left, right, bottom, top, near, far)
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Create a frustum from six planes
    pub fn new(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Extract frustum planes from a combined clip-space matrix
    /// (projection x coordinate transform x view).
    ///
    /// Gribb-Hartmann extraction, adjusted for the [0, 1] clip-space depth
    /// range used by the projection matrices in `foundation::math`.
    pub fn from_matrix(clip: &Mat4) -> Self {
        let row = |i: usize| Vec4::new(clip[(i, 0)], clip[(i, 1)], clip[(i, 2)], clip[(i, 3)]);

        let r0 = row(0);
        let r1 = row(1);
        let r2 = row(2);
        let r3 = row(3);

        Self {
            planes: [
                Plane::from_coefficients(r3 + r0), // left:   x >= -w
                Plane::from_coefficients(r3 - r0), // right:  x <=  w
                Plane::from_coefficients(r3 + r1), // bottom: y >= -w
                Plane::from_coefficients(r3 - r1), // top:    y <=  w
                Plane::from_coefficients(r2),      // near:   z >=  0
                Plane::from_coefficients(r3 - r2), // far:    z <=  w
            ],
        }
    }

    /// Check if an AABB is inside or intersects the frustum
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        // For each plane, check if the AABB is completely outside
        for plane in &self.planes {
            // Get the point on the AABB closest to the plane
            let mut p = aabb.min;
            if plane.normal.x >= 0.0 { p.x = aabb.max.x; }
            if plane.normal.y >= 0.0 { p.y = aabb.max.y; }
            if plane.normal.z >= 0.0 { p.z = aabb.max.z; }

            if plane.distance_to_point(p) < 0.0 {
                return false;
            }
        }

        true
    }

    /// Classify an AABB as outside, intersecting, or fully inside the frustum
    pub fn classify_aabb(&self, aabb: &Aabb) -> Intersection {
        let mut result = Intersection::Inside;
        for plane in &self.planes {
            // p-vertex is the corner farthest along the plane normal,
            // n-vertex the corner farthest against it
            let mut p = aabb.min;
            let mut n = aabb.max;
            if plane.normal.x >= 0.0 { p.x = aabb.max.x; n.x = aabb.min.x; }
            if plane.normal.y >= 0.0 { p.y = aabb.max.y; n.y = aabb.min.y; }
            if plane.normal.z >= 0.0 { p.z = aabb.max.z; n.z = aabb.min.z; }

            if plane.distance_to_point(p) < 0.0 {
                return Intersection::Outside;
            }
            if plane.distance_to_point(n) < 0.0 {
                result = Intersection::Intersects;
            }
        }
        result
    }
}

/// Sphere volume for light range queries
#[derive(Debug, Clone, Copy)]
pub struct Sphere {
    /// Center of the sphere
    pub center: Vec3,
    /// Radius of the sphere
    pub radius: f32,
}

impl Sphere {
    /// Create a new sphere
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Check if this sphere touches an AABB (closest-point test)
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        let closest = Vec3::new(
            self.center.x.clamp(aabb.min.x, aabb.max.x),
            self.center.y.clamp(aabb.min.y, aabb.max.y),
            self.center.z.clamp(aabb.min.z, aabb.max.z),
        );
        (closest - self.center).magnitude_squared() <= self.radius * self.radius
    }

    /// Check if this sphere fully contains an AABB (farthest-corner test)
    pub fn contains_aabb(&self, aabb: &Aabb) -> bool {
        let farthest_sq = |min: f32, max: f32, c: f32| {
            let d = (min - c).abs().max((max - c).abs());
            d * d
        };
        let distance_sq = farthest_sq(aabb.min.x, aabb.max.x, self.center.x)
            + farthest_sq(aabb.min.y, aabb.max.y, self.center.y)
            + farthest_sq(aabb.min.z, aabb.max.z, self.center.z);
        distance_sq <= self.radius * self.radius
    }

    /// Classify an AABB as outside, intersecting, or fully inside the sphere
    pub fn classify_aabb(&self, aabb: &Aabb) -> Intersection {
        if !self.intersects_aabb(aabb) {
            Intersection::Outside
        } else if self.contains_aabb(aabb) {
            Intersection::Inside
        } else {
            Intersection::Intersects
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{utils, Mat4Ext};

    fn unit_cube_at(center: Vec3) -> Aabb {
        Aabb::from_center_extents(center, Vec3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_aabb_contains_point() {
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));

        assert!(aabb.contains_point(Vec3::zeros()));
        assert!(aabb.contains_point(Vec3::new(0.5, 0.5, 0.5)));
        assert!(!aabb.contains_point(Vec3::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn test_aabb_intersects() {
        let a = Aabb::new(Vec3::zeros(), Vec3::new(2.0, 2.0, 2.0));
        let b = Aabb::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(3.0, 3.0, 3.0));
        let c = Aabb::new(Vec3::new(5.0, 5.0, 5.0), Vec3::new(7.0, 7.0, 7.0));

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_aabb_contains_aabb() {
        let outer = Aabb::new(Vec3::zeros(), Vec3::new(4.0, 4.0, 4.0));
        let inner = Aabb::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(2.0, 2.0, 2.0));
        let straddling = Aabb::new(Vec3::new(3.0, 3.0, 3.0), Vec3::new(5.0, 5.0, 5.0));

        assert!(outer.contains_aabb(&inner));
        assert!(!outer.contains_aabb(&straddling));
        assert!(!inner.contains_aabb(&outer));
    }

    fn test_frustum() -> Frustum {
        // Camera at origin looking down +z, 90 degree fov, near 1, far 101
        let view = Mat4::look_at(Vec3::zeros(), Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, 1.0, 0.0));
        let proj = Mat4::perspective(utils::deg_to_rad(90.0), 1.0, 1.0, 101.0);
        Frustum::from_matrix(&(proj * Mat4::vulkan_coordinate_transform() * view))
    }

    #[test]
    fn test_frustum_culls_behind_camera() {
        let frustum = test_frustum();

        assert!(frustum.intersects_aabb(&unit_cube_at(Vec3::new(0.0, 0.0, 5.0))));
        assert!(!frustum.intersects_aabb(&unit_cube_at(Vec3::new(0.0, 0.0, -5.0))));
        // Way off to the side at shallow depth: outside the 90 degree cone
        assert!(!frustum.intersects_aabb(&unit_cube_at(Vec3::new(50.0, 0.0, 5.0))));
    }

    #[test]
    fn test_frustum_classify_aabb() {
        let frustum = test_frustum();

        assert_eq!(
            frustum.classify_aabb(&unit_cube_at(Vec3::new(0.0, 0.0, 5.0))),
            Intersection::Inside
        );
        // Straddles the near plane at z = 1
        assert_eq!(
            frustum.classify_aabb(&unit_cube_at(Vec3::new(0.0, 0.0, 0.5))),
            Intersection::Intersects
        );
        assert_eq!(
            frustum.classify_aabb(&unit_cube_at(Vec3::new(0.0, 0.0, -5.0))),
            Intersection::Outside
        );
    }

    #[test]
    fn test_sphere_classify_aabb() {
        let sphere = Sphere::new(Vec3::zeros(), 10.0);

        assert_eq!(sphere.classify_aabb(&unit_cube_at(Vec3::zeros())), Intersection::Inside);
        assert_eq!(
            sphere.classify_aabb(&unit_cube_at(Vec3::new(10.0, 0.0, 0.0))),
            Intersection::Intersects
        );
        assert_eq!(
            sphere.classify_aabb(&unit_cube_at(Vec3::new(20.0, 0.0, 0.0))),
            Intersection::Outside
        );
    }
}
