//! Techniques: named shader passes grouped by quality tier
//!
//! A technique is the renderable recipe a material selects at runtime: a set
//! of passes addressed by interned pass index, each carrying the shader pair
//! the pipeline backend compiles against. Materials hold a list of
//! technique entries ordered most-demanding-first; selection walks that list
//! with the drawable's LOD distance and the effective quality level.

use crate::core::config::QualityLevel;
use crate::foundation::collections::TypedHandle;

/// Interned index of a pass name, assigned by the material registry.
///
/// Pass indices are dense and shared by every technique, so "does this
/// technique have the shadow pass" is a vector probe rather than a string
/// compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct PassIndex(pub u32);

/// Handle to a technique stored in the material registry
pub type TechniqueHandle = TypedHandle<Technique>;

/// Stable reference to one pass of one technique.
///
/// Identity, not data: this is what batch classification carries around and
/// what pipeline-state keys hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassRef {
    /// Technique owning the pass
    pub technique: TechniqueHandle,
    /// Which pass slot within the technique
    pub index: PassIndex,
}

/// A single pass within a technique
#[derive(Debug, Clone)]
pub struct Pass {
    /// Vertex shader identifier handed to the pipeline backend
    pub vertex_shader: String,
    /// Fragment shader identifier handed to the pipeline backend
    pub fragment_shader: String,
}

impl Pass {
    /// Create a pass from a shader pair
    pub fn new(vertex_shader: impl Into<String>, fragment_shader: impl Into<String>) -> Self {
        Self {
            vertex_shader: vertex_shader.into(),
            fragment_shader: fragment_shader.into(),
        }
    }
}

/// A set of passes a material can be rendered with
#[derive(Debug, Clone)]
pub struct Technique {
    name: String,
    supported: bool,
    passes: Vec<Option<Pass>>,
}

impl Technique {
    /// Create an empty technique, supported by default
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supported: true,
            passes: Vec::new(),
        }
    }

    /// Technique name, for diagnostics
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mark whether the host can render this technique
    pub fn set_supported(&mut self, supported: bool) {
        self.supported = supported;
    }

    /// Whether the host can render this technique
    pub fn is_supported(&self) -> bool {
        self.supported
    }

    /// Install a pass at the given interned index, replacing any previous one
    pub fn set_pass(&mut self, index: PassIndex, pass: Pass) {
        let slot = index.0 as usize;
        if slot >= self.passes.len() {
            self.passes.resize_with(slot + 1, || None);
        }
        self.passes[slot] = Some(pass);
    }

    /// Look up a pass by interned index
    pub fn get_pass(&self, index: PassIndex) -> Option<&Pass> {
        self.passes.get(index.0 as usize)?.as_ref()
    }

    /// Whether a pass exists at the given index
    pub fn has_pass(&self, index: PassIndex) -> bool {
        self.get_pass(index).is_some()
    }
}

/// One selectable technique of a material, with its quality requirement and
/// LOD threshold
#[derive(Debug, Clone, Copy)]
pub struct TechniqueEntry {
    /// The technique this entry selects
    pub technique: TechniqueHandle,
    /// Minimum material quality this entry requires
    pub quality: QualityLevel,
    /// Drawable LOD distance must reach this value for the entry to apply
    pub lod_distance: f32,
}

impl TechniqueEntry {
    /// Create a technique entry
    pub fn new(technique: TechniqueHandle, quality: QualityLevel, lod_distance: f32) -> Self {
        Self {
            technique,
            quality,
            lod_distance,
        }
    }
}
