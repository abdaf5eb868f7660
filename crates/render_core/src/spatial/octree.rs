//! Octree spatial partitioning for drawable visibility and light queries
//!
//! Drawables are stored by index at the smallest node that fully contains
//! their world bounds. Entries that outgrow every child (or the root volume
//! itself, such as directional light boxes) stay higher up, so every query
//! that touches the root still reaches them.

use crate::scene::drawable::DrawableFlags;
use crate::spatial::bounds::{Aabb, Frustum, Intersection, Sphere};
use crate::spatial::query::SpatialIndex;

/// Configuration for octree behavior
#[derive(Debug, Clone, Copy)]
pub struct OctreeConfig {
    /// Maximum entries per node before subdivision
    pub max_entries_per_node: usize,
    /// Maximum depth of the tree
    pub max_depth: u32,
    /// Minimum node size before stopping subdivision
    pub min_node_size: f32,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            max_entries_per_node: 8,
            max_depth: 8,
            min_node_size: 1.0,
        }
    }
}

/// A drawable registered in the octree
#[derive(Debug, Clone, Copy)]
pub struct OctreeEntry {
    /// Index of the drawable in the scene's drawable list
    pub index: u32,
    /// Kind flags used to filter queries
    pub flags: DrawableFlags,
    /// World-space bounding box
    pub bounds: Aabb,
}

/// A node in the octree
#[derive(Debug, Clone)]
struct OctreeNode {
    /// Spatial bounds of this node
    bounds: Aabb,
    /// Entries stored in this node
    entries: Vec<OctreeEntry>,
    /// Child nodes (None if leaf)
    children: Option<Box<[OctreeNode; 8]>>,
    /// Depth of this node (root = 0)
    depth: u32,
}

impl OctreeNode {
    fn new(bounds: Aabb, depth: u32) -> Self {
        Self {
            bounds,
            entries: Vec::new(),
            children: None,
            depth,
        }
    }

    fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Split this node into 8 children and push down entries that fit
    fn subdivide(&mut self) {
        let min = self.bounds.min;
        let max = self.bounds.max;
        let center = self.bounds.center();
        let depth = self.depth + 1;

        // Octant index bit layout: (z << 2) | (y << 1) | x
        let child = |octant: usize| {
            let child_min = crate::foundation::math::Vec3::new(
                if octant & 1 == 0 { min.x } else { center.x },
                if octant & 2 == 0 { min.y } else { center.y },
                if octant & 4 == 0 { min.z } else { center.z },
            );
            let child_max = crate::foundation::math::Vec3::new(
                if octant & 1 == 0 { center.x } else { max.x },
                if octant & 2 == 0 { center.y } else { max.y },
                if octant & 4 == 0 { center.z } else { max.z },
            );
            OctreeNode::new(Aabb::new(child_min, child_max), depth)
        };

        self.children = Some(Box::new([
            child(0),
            child(1),
            child(2),
            child(3),
            child(4),
            child(5),
            child(6),
            child(7),
        ]));

        // Redistribute entries that fit fully inside a child; the rest stay here
        let entries = std::mem::take(&mut self.entries);
        if let Some(children) = &mut self.children {
            for entry in entries {
                match children
                    .iter_mut()
                    .find(|c| c.bounds.contains_aabb(&entry.bounds))
                {
                    Some(node) => node.entries.push(entry),
                    None => self.entries.push(entry),
                }
            }
        }
    }

    /// Insert an entry at the smallest node that fully contains it
    fn insert(&mut self, entry: OctreeEntry, config: &OctreeConfig) {
        // Subdivide on pressure so dense leaves stay shallow
        if self.is_leaf()
            && self.entries.len() >= config.max_entries_per_node
            && self.depth < config.max_depth
            && self.bounds.extents().x > config.min_node_size
        {
            self.subdivide();
        }

        if let Some(children) = &mut self.children {
            if let Some(node) = children
                .iter_mut()
                .find(|c| c.bounds.contains_aabb(&entry.bounds))
            {
                return node.insert(entry, config);
            }
        }

        self.entries.push(entry);
    }

    /// Remove an entry from this node or its children
    fn remove(&mut self, index: u32) -> bool {
        if let Some(pos) = self.entries.iter().position(|e| e.index == index) {
            self.entries.swap_remove(pos);
            return true;
        }

        if let Some(children) = &mut self.children {
            for child in children.iter_mut() {
                if child.remove(index) {
                    return true;
                }
            }
        }

        false
    }

    /// Report every matching entry in this subtree as fully inside
    fn report_subtree(&self, flags: DrawableFlags, visitor: &mut dyn FnMut(u32, bool)) {
        for entry in &self.entries {
            if entry.flags.intersects(flags) {
                visitor(entry.index, true);
            }
        }
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.report_subtree(flags, visitor);
            }
        }
    }

    fn query_frustum(
        &self,
        frustum: &Frustum,
        flags: DrawableFlags,
        visitor: &mut dyn FnMut(u32, bool),
    ) {
        match frustum.classify_aabb(&self.bounds) {
            Intersection::Outside => {}
            Intersection::Inside => self.report_subtree(flags, visitor),
            Intersection::Intersects => {
                for entry in &self.entries {
                    if entry.flags.intersects(flags) {
                        visitor(entry.index, false);
                    }
                }
                if let Some(children) = &self.children {
                    for child in children.iter() {
                        child.query_frustum(frustum, flags, visitor);
                    }
                }
            }
        }
    }

    fn query_sphere(
        &self,
        sphere: &Sphere,
        flags: DrawableFlags,
        visitor: &mut dyn FnMut(u32, bool),
    ) {
        match sphere.classify_aabb(&self.bounds) {
            Intersection::Outside => {}
            Intersection::Inside => self.report_subtree(flags, visitor),
            Intersection::Intersects => {
                for entry in &self.entries {
                    if entry.flags.intersects(flags) {
                        visitor(entry.index, false);
                    }
                }
                if let Some(children) = &self.children {
                    for child in children.iter() {
                        child.query_sphere(sphere, flags, visitor);
                    }
                }
            }
        }
    }
}

/// Octree spatial partitioning structure
///
/// Traversal order is fixed (node entries in insertion order, children in
/// octant order), so queries over the same tree report candidates in the
/// same order every time.
#[derive(Debug, Clone)]
pub struct Octree {
    /// Root node covering the world volume
    root: OctreeNode,
    /// Configuration
    config: OctreeConfig,
    /// Total number of stored entries
    entry_count: usize,
}

impl Octree {
    /// Create a new octree with given world bounds
    pub fn new(world_bounds: Aabb, config: OctreeConfig) -> Self {
        Self {
            root: OctreeNode::new(world_bounds, 0),
            config,
            entry_count: 0,
        }
    }

    /// Insert a drawable. Bounds larger than the root volume stay at the
    /// root, so they are reachable from any query that touches the world.
    pub fn insert(&mut self, index: u32, flags: DrawableFlags, bounds: Aabb) {
        let entry = OctreeEntry {
            index,
            flags,
            bounds,
        };
        self.root.insert(entry, &self.config);
        self.entry_count += 1;
    }

    /// Remove a drawable by index
    pub fn remove(&mut self, index: u32) -> bool {
        let removed = self.root.remove(index);
        if removed {
            self.entry_count -= 1;
        }
        removed
    }

    /// Reinsert a drawable whose bounds or flags changed
    pub fn update(&mut self, index: u32, flags: DrawableFlags, bounds: Aabb) {
        self.remove(index);
        self.insert(index, flags, bounds);
    }

    /// Remove all entries, keeping the world bounds
    pub fn clear(&mut self) {
        self.root = OctreeNode::new(self.root.bounds, 0);
        self.entry_count = 0;
    }

    /// Total number of stored entries
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }
}

impl SpatialIndex for Octree {
    fn query_frustum(
        &self,
        frustum: &Frustum,
        flags: DrawableFlags,
        visitor: &mut dyn FnMut(u32, bool),
    ) {
        self.root.query_frustum(frustum, flags, visitor);
    }

    fn query_sphere(
        &self,
        sphere: &Sphere,
        flags: DrawableFlags,
        visitor: &mut dyn FnMut(u32, bool),
    ) {
        self.root.query_sphere(sphere, flags, visitor);
    }
}
