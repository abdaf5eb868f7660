//! Spatial partitioning and bounding volumes
//!
//! Provides the bounding volume types used for culling and the octree
//! index the collector queries for visible drawables and lit geometry.

pub mod bounds;
pub mod octree;
pub mod query;

pub use bounds::{Aabb, Frustum, Intersection, Plane, Sphere};
pub use octree::{Octree, OctreeConfig, OctreeEntry};
pub use query::SpatialIndex;
