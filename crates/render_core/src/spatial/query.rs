//! Spatial index abstraction used for visibility and light queries
//!
//! Allows pluggable acceleration structures behind the collector. The
//! shipped implementation is [`Octree`](crate::spatial::Octree); scenes with
//! their own spatial structure implement this trait instead.

use crate::scene::drawable::DrawableFlags;
use crate::spatial::bounds::{Frustum, Sphere};

/// Volume queries over drawable indices.
///
/// Implementations must report every stored drawable whose containing node
/// touches the volume **at most once** per query, with `inside = true` when
/// the containing node was classified fully inside the volume. Callers do
/// the exact per-drawable bounds test for candidates reported with
/// `inside = false`, so over-reporting from coarse nodes is fine;
/// under-reporting is not.
pub trait SpatialIndex: Send + Sync {
    /// Visit drawables matching `flags` whose node touches the frustum
    fn query_frustum(
        &self,
        frustum: &Frustum,
        flags: DrawableFlags,
        visitor: &mut dyn FnMut(u32, bool),
    );

    /// Visit drawables matching `flags` whose node touches the sphere
    fn query_sphere(
        &self,
        sphere: &Sphere,
        flags: DrawableFlags,
        visitor: &mut dyn FnMut(u32, bool),
    );
}
