//! Batch records produced by the collection pipeline
//!
//! Collection runs in two representations. The visibility phase emits
//! [`IntermediateSceneBatch`] per drawable source batch per pass: just the
//! pass references picked from the selected technique, bucketed into the
//! pass's unlit or lit arena. Classification then expands intermediates
//! into [`SceneBatch`] draw records carrying everything the sorter and the
//! submission side need.

use std::sync::Arc;

use crate::render::pipeline_cache::PipelineState;
use crate::scene::drawable::GeometryId;
use crate::scene::material::MaterialId;
use crate::scene::technique::PassRef;

/// One source batch routed into one scene pass, before lighting is known.
///
/// For lit batches of a forward-lit pass, `base_pass` holds the first-light
/// pass; the plain base pass is re-derived during classification when the
/// drawable's main light does not match.
#[derive(Debug, Clone, Copy)]
pub struct IntermediateSceneBatch {
    /// Index of the drawable in the scene slice
    pub drawable_index: u32,
    /// Index into the drawable's source batches
    pub source_batch_index: u32,
    /// Pass drawn once per batch, `None` when the technique lacks it
    pub base_pass: Option<PassRef>,
    /// Pass drawn once per additional light, `None` for unlit batches
    pub additional_pass: Option<PassRef>,
}

/// A fully classified draw record for one pass.
///
/// `pipeline_state` starts out `None` for batches whose key missed the
/// cache; the resolution step fills it in or drops the batch if creation
/// failed.
#[derive(Debug, Clone)]
pub struct SceneBatch {
    /// Index of the drawable in the scene slice
    pub drawable_index: u32,
    /// Index into the drawable's source batches
    pub source_batch_index: u32,
    /// Geometry to draw
    pub geometry: GeometryId,
    /// Material after default resolution
    pub material: MaterialId,
    /// Technique pass this record draws
    pub pass: PassRef,
    /// Camera distance of the drawable, for back-to-front sorting
    pub distance: f32,
    /// Visible-light index for per-light batches and for lit base batches
    /// (the folded main light), `None` for unlit and plain base batches
    pub light_index: Option<u32>,
    /// Resolved pipeline state, shared with the cache
    pub pipeline_state: Option<Arc<PipelineState>>,
}
