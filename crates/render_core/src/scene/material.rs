//! Materials and the registry that resolves them for batch collection
//!
//! The registry is the single lookup surface the collector works against:
//! material storage, technique storage, pass-name interning and the default
//! material for source batches that don't specify one. Technique selection
//! (quality filter plus LOD walk) lives here as well, since it needs both
//! the material's entry list and the technique storage.

use std::collections::HashMap;

use crate::core::config::QualityLevel;
use crate::foundation::collections::HandleMap;
use crate::scene::technique::{PassIndex, Technique, TechniqueEntry, TechniqueHandle};

/// Unique identifier for registered materials.
///
/// Id 0 is reserved for "no material" and never issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct MaterialId(pub u32);

/// A material: a named, ordered list of technique entries
#[derive(Debug, Clone)]
pub struct Material {
    name: String,
    techniques: Vec<TechniqueEntry>,
}

impl Material {
    /// Create a material with no techniques
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            techniques: Vec::new(),
        }
    }

    /// Material name, for diagnostics
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a technique entry, keeping the list ordered most-demanding-first
    /// (higher quality before lower, larger LOD distance before smaller)
    pub fn add_technique(&mut self, entry: TechniqueEntry) {
        self.techniques.push(entry);
        self.techniques.sort_by(|a, b| {
            b.quality
                .cmp(&a.quality)
                .then(b.lod_distance.total_cmp(&a.lod_distance))
        });
    }

    /// Technique entries in selection order
    pub fn techniques(&self) -> &[TechniqueEntry] {
        &self.techniques
    }
}

/// Storage and lookup for materials, techniques and interned pass names
pub struct MaterialRegistry {
    materials: HashMap<MaterialId, Material>,
    next_id: u32,
    techniques: HandleMap<Technique>,
    pass_names: Vec<String>,
    pass_lookup: HashMap<String, PassIndex>,
    default_material: MaterialId,
}

impl MaterialRegistry {
    /// Create a registry with an empty default material.
    ///
    /// The default material starts without techniques; batches that fall back
    /// to it are dropped until the application gives it one.
    pub fn new() -> Self {
        let mut registry = Self {
            materials: HashMap::new(),
            next_id: 1, // reserve 0 for "no material"
            techniques: HandleMap::with_key(),
            pass_names: Vec::new(),
            pass_lookup: HashMap::new(),
            default_material: MaterialId(0),
        };
        registry.default_material = registry.register_material(Material::new("default"));
        registry
    }

    /// Register a material and assign its id
    pub fn register_material(&mut self, material: Material) -> MaterialId {
        let id = MaterialId(self.next_id);
        self.next_id += 1;
        log::debug!("Registered material {:?} ({})", id, material.name());
        self.materials.insert(id, material);
        id
    }

    /// Get a material by id
    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(&id)
    }

    /// Get a material for modification
    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(&id)
    }

    /// Number of registered materials, including the default
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    /// The material used when a source batch has none
    pub fn default_material(&self) -> MaterialId {
        self.default_material
    }

    /// Replace the default material
    pub fn set_default_material(&mut self, id: MaterialId) {
        self.default_material = id;
    }

    /// Resolve an optional material reference to a concrete id
    pub fn resolve_material(&self, id: Option<MaterialId>) -> MaterialId {
        id.unwrap_or(self.default_material)
    }

    /// Store a technique and hand back its handle
    pub fn register_technique(&mut self, technique: Technique) -> TechniqueHandle {
        log::debug!("Registered technique '{}'", technique.name());
        TechniqueHandle::new(self.techniques.insert(technique))
    }

    /// Get a technique by handle
    pub fn technique(&self, handle: TechniqueHandle) -> Option<&Technique> {
        self.techniques.get(handle.key())
    }

    /// Intern a pass name, returning its dense index
    pub fn pass_index(&mut self, name: &str) -> PassIndex {
        if let Some(index) = self.pass_lookup.get(name) {
            return *index;
        }
        let index = PassIndex(self.pass_names.len() as u32);
        self.pass_names.push(name.to_string());
        self.pass_lookup.insert(name.to_string(), index);
        index
    }

    /// Name of an interned pass index
    pub fn pass_name(&self, index: PassIndex) -> Option<&str> {
        self.pass_names.get(index.0 as usize).map(String::as_str)
    }

    /// Select the technique to render a material with.
    ///
    /// Entries are walked most-demanding-first: unsupported techniques and
    /// entries requiring more than `quality` are skipped, the first entry
    /// whose LOD distance is at or below the drawable's wins, and the last
    /// entry is the fallback. A single-entry material short-circuits.
    pub fn find_technique(
        &self,
        material: MaterialId,
        lod_distance: f32,
        quality: QualityLevel,
    ) -> Option<TechniqueHandle> {
        let entries = self.materials.get(&material)?.techniques();
        if entries.is_empty() {
            return None;
        }
        if entries.len() == 1 {
            return Some(entries[0].technique);
        }

        for entry in entries {
            let supported = self
                .technique(entry.technique)
                .is_some_and(Technique::is_supported);
            if !supported || quality < entry.quality {
                continue;
            }
            if lod_distance >= entry.lod_distance {
                return Some(entry.technique);
            }
        }

        // Nothing qualified; the cheapest entry is the fallback
        entries.last().map(|entry| entry.technique)
    }
}

impl Default for MaterialRegistry {
    fn default() -> Self {
        Self::new()
    }
}
