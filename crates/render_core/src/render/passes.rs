//! Scene pass configuration and per-pass batch processing
//!
//! A scene pass names up to three technique passes (base, first-light,
//! additional-light) and owns every batch container for that pass: the
//! per-lane intermediate buckets filled during visibility, the final batch
//! lists, and the dirty-record bookkeeping for deferred pipeline-state
//! creation. The collector drives one [`PassData`] per configured pass
//! through the frame.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::work_queue::{LaneJob, WorkQueue};
use crate::foundation::collections::LaneVec;
use crate::render::batch::{IntermediateSceneBatch, SceneBatch};
use crate::render::light_accumulator::{AccumulatedLight, LightAccumulatorSet};
use crate::render::pipeline_cache::{
    PipelineBackend, PipelineState, PipelineStateCache, PipelineStateDesc, PipelineStateError,
    PipelineStateKey,
};
use crate::render::sort::{sort_batches, BatchSortMode};
use crate::scene::drawable::Drawable;
use crate::scene::light::Light;
use crate::scene::material::MaterialRegistry;
use crate::scene::technique::{PassIndex, PassRef, Technique, TechniqueHandle};

/// How a scene pass combines its technique passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenePassType {
    /// Base pass only, no lighting
    Unlit,
    /// Lit geometry draws a combined base-plus-main-light pass, then one
    /// additional pass per remaining light
    ForwardLitBase,
    /// Lit geometry draws an unlit base pass, then one additional pass per
    /// light including the main one
    ForwardUnlitBase,
}

/// Configuration of one scene pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenePassDescription {
    /// Pass name, for lookup and diagnostics
    pub name: String,
    /// How the named technique passes combine
    pub pass_type: ScenePassType,
    /// Technique pass drawn once per batch
    pub base_pass: Option<String>,
    /// Technique pass combining base and main light, for forward-lit passes
    pub first_light_pass: Option<String>,
    /// Technique pass drawn once per additional light
    pub additional_light_pass: Option<String>,
    /// Submission order for this pass's batches
    pub sort_mode: BatchSortMode,
}

impl ScenePassDescription {
    /// Describe an unlit pass drawing `base_pass`
    pub fn unlit(name: impl Into<String>, base_pass: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pass_type: ScenePassType::Unlit,
            base_pass: Some(base_pass.into()),
            first_light_pass: None,
            additional_light_pass: None,
            sort_mode: BatchSortMode::default(),
        }
    }

    /// Describe a forward-lit pass; add the plain base with
    /// [`ScenePassDescription::with_base_pass`] if unlit fallback rendering
    /// is wanted
    pub fn forward_lit(
        name: impl Into<String>,
        first_light_pass: impl Into<String>,
        additional_light_pass: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            pass_type: ScenePassType::ForwardLitBase,
            base_pass: None,
            first_light_pass: Some(first_light_pass.into()),
            additional_light_pass: Some(additional_light_pass.into()),
            sort_mode: BatchSortMode::default(),
        }
    }

    /// Describe a forward pass whose base stays unlit and every light is an
    /// additional pass
    pub fn forward_unlit(
        name: impl Into<String>,
        base_pass: impl Into<String>,
        additional_light_pass: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            pass_type: ScenePassType::ForwardUnlitBase,
            base_pass: Some(base_pass.into()),
            first_light_pass: None,
            additional_light_pass: None,
            sort_mode: BatchSortMode::default(),
        }
        .with_additional_light_pass(additional_light_pass)
    }

    fn with_additional_light_pass(mut self, name: impl Into<String>) -> Self {
        self.additional_light_pass = Some(name.into());
        self
    }

    /// Set the plain base pass; builder style
    pub fn with_base_pass(mut self, name: impl Into<String>) -> Self {
        self.base_pass = Some(name.into());
        self
    }

    /// Set the sort mode; builder style
    pub fn with_sort_mode(mut self, mode: BatchSortMode) -> Self {
        self.sort_mode = mode;
        self
    }

    /// Check that the configured pass names match what the pass type needs
    pub fn validate(&self) -> Result<(), &'static str> {
        let has = |pass: &Option<String>| pass.as_deref().is_some_and(|name| !name.is_empty());
        let combination = (
            has(&self.base_pass),
            has(&self.first_light_pass),
            has(&self.additional_light_pass),
        );
        let valid = match self.pass_type {
            ScenePassType::Unlit => combination == (true, false, false),
            ScenePassType::ForwardLitBase => {
                combination == (false, true, true) || combination == (true, true, true)
            }
            ScenePassType::ForwardUnlitBase => combination == (true, false, true),
        };
        if valid {
            Ok(())
        } else {
            Err(match self.pass_type {
                ScenePassType::Unlit => "unlit passes take exactly a base pass",
                ScenePassType::ForwardLitBase => {
                    "forward-lit passes take first-light and additional-light passes, base optional"
                }
                ScenePassType::ForwardUnlitBase => {
                    "forward-unlit passes take base and additional-light passes"
                }
            })
        }
    }
}

/// Errors from installing scene pass descriptions
#[derive(thiserror::Error, Debug)]
pub enum PassConfigError {
    /// One or more descriptions had a pass combination their type forbids
    #[error("invalid scene pass descriptions: {}", .0.join(", "))]
    InvalidDescriptions(Vec<String>),
}

/// Runtime state of one configured scene pass
#[derive(Debug)]
pub struct PassData {
    description: ScenePassDescription,
    base_pass_index: Option<PassIndex>,
    first_light_pass_index: Option<PassIndex>,
    additional_light_pass_index: Option<PassIndex>,

    unlit: LaneVec<IntermediateSceneBatch>,
    lit: LaneVec<IntermediateSceneBatch>,

    intermediate_scratch: Vec<IntermediateSceneBatch>,
    base_scratch: Vec<Option<SceneBatch>>,
    dirty_base: LaneVec<(usize, PipelineStateKey)>,
    dirty_lights: LaneVec<(usize, usize, PipelineStateKey)>,
    light_batch_lanes: LaneVec<SceneBatch>,

    unlit_base_batches: Vec<SceneBatch>,
    lit_base_batches: Vec<SceneBatch>,
    light_batches: Vec<SceneBatch>,
}

impl PassData {
    /// Validate a description and intern its pass names
    pub(crate) fn new(
        description: ScenePassDescription,
        registry: &mut MaterialRegistry,
    ) -> Result<Self, String> {
        if let Err(reason) = description.validate() {
            return Err(format!("{} ({reason})", description.name));
        }

        let mut intern = |name: &Option<String>| {
            name.as_deref()
                .filter(|name| !name.is_empty())
                .map(|name| registry.pass_index(name))
        };
        let base_pass_index = intern(&description.base_pass);
        let first_light_pass_index = intern(&description.first_light_pass);
        let additional_light_pass_index = intern(&description.additional_light_pass);

        Ok(Self {
            description,
            base_pass_index,
            first_light_pass_index,
            additional_light_pass_index,
            unlit: LaneVec::new(),
            lit: LaneVec::new(),
            intermediate_scratch: Vec::new(),
            base_scratch: Vec::new(),
            dirty_base: LaneVec::new(),
            dirty_lights: LaneVec::new(),
            light_batch_lanes: LaneVec::new(),
            unlit_base_batches: Vec::new(),
            lit_base_batches: Vec::new(),
            light_batches: Vec::new(),
        })
    }

    /// The description this pass was built from
    pub fn description(&self) -> &ScenePassDescription {
        &self.description
    }

    /// Pass name, for lookup and diagnostics
    pub fn name(&self) -> &str {
        &self.description.name
    }

    /// Final base batches of unlit-classified geometry, sorted
    pub fn unlit_base_batches(&self) -> &[SceneBatch] {
        &self.unlit_base_batches
    }

    /// Final base batches of lit-classified geometry, sorted
    pub fn lit_base_batches(&self) -> &[SceneBatch] {
        &self.lit_base_batches
    }

    /// Final per-light batches, sorted
    pub fn light_batches(&self) -> &[SceneBatch] {
        &self.light_batches
    }

    pub(crate) fn total_batches(&self) -> usize {
        self.unlit_base_batches.len() + self.lit_base_batches.len() + self.light_batches.len()
    }

    pub(crate) fn begin_frame(&mut self, lane_count: usize) {
        self.unlit.reset(lane_count);
        self.lit.reset(lane_count);
        self.unlit_base_batches.clear();
        self.lit_base_batches.clear();
        self.light_batches.clear();
    }

    /// Route one source batch into this pass's intermediate buckets.
    ///
    /// Returns true when the batch landed in the lit bucket, which is the
    /// caller's cue to mark the drawable forward-lit. Batches whose
    /// technique supports none of the required passes are dropped.
    pub(crate) fn add_source_batch(
        &self,
        lane: usize,
        drawable_index: u32,
        source_batch_index: u32,
        technique_handle: TechniqueHandle,
        technique: &Technique,
    ) -> bool {
        let resolve = |index: Option<PassIndex>| {
            index.and_then(|index| {
                technique
                    .has_pass(index)
                    .then_some(PassRef { technique: technique_handle, index })
            })
        };
        let base = resolve(self.base_pass_index);
        let first_light = resolve(self.first_light_pass_index);
        let additional = resolve(self.additional_light_pass_index);

        let batch = if self.description.pass_type == ScenePassType::Unlit || additional.is_none() {
            IntermediateSceneBatch {
                drawable_index,
                source_batch_index,
                base_pass: base,
                additional_pass: None,
            }
        } else if self.description.pass_type == ScenePassType::ForwardUnlitBase && base.is_some() {
            IntermediateSceneBatch {
                drawable_index,
                source_batch_index,
                base_pass: base,
                additional_pass: additional,
            }
        } else if self.description.pass_type == ScenePassType::ForwardLitBase && first_light.is_some()
        {
            // The combined first-light pass takes the base slot; the plain
            // base is re-derived at classification when the main light does
            // not apply
            IntermediateSceneBatch {
                drawable_index,
                source_batch_index,
                base_pass: first_light,
                additional_pass: additional,
            }
        } else {
            return false;
        };

        if batch.additional_pass.is_some() {
            self.lit.push(lane, batch);
            true
        } else if batch.base_pass.is_some() {
            self.unlit.push(lane, batch);
            false
        } else {
            false
        }
    }

    /// Expand unlit intermediates into final base batches.
    ///
    /// Worker lanes build batches and probe the cache; misses are resolved
    /// single-threaded afterwards. Returns the number of batches dropped
    /// because state creation failed.
    pub(crate) fn collect_unlit_batches(
        &mut self,
        queue: &WorkQueue,
        threshold: usize,
        scene: &[Box<dyn Drawable>],
        materials: &MaterialRegistry,
        cache: &mut PipelineStateCache,
        backend: &mut dyn PipelineBackend,
    ) -> u64 {
        let mut intermediates = std::mem::take(&mut self.intermediate_scratch);
        intermediates.clear();
        self.unlit.drain_ordered(&mut intermediates);

        self.base_scratch.clear();
        self.base_scratch.resize_with(intermediates.len(), || None);
        self.dirty_base.reset(queue.num_lanes());

        {
            let ranges = queue.partition(intermediates.len(), threshold);
            let dirty_base = &self.dirty_base;
            let cache_ref: &PipelineStateCache = cache;
            let mut remaining = self.base_scratch.as_mut_slice();
            let mut jobs: Vec<LaneJob> = Vec::with_capacity(ranges.len());
            for (lane, range) in ranges.iter().enumerate() {
                let (chunk, rest) = remaining.split_at_mut(range.len());
                remaining = rest;
                let items = &intermediates[range.clone()];
                let offset = range.start;
                jobs.push(Box::new(move || {
                    for (i, intermediate) in items.iter().enumerate() {
                        let Some(pass) = intermediate.base_pass else {
                            continue;
                        };
                        let mut batch = build_scene_batch(scene, materials, intermediate, pass, None);
                        let key = batch_key(&batch, 0);
                        batch.pipeline_state = cache_ref.try_get(&key);
                        if batch.pipeline_state.is_none() {
                            dirty_base.push(lane, (offset + i, key));
                        }
                        chunk[i] = Some(batch);
                    }
                }));
            }
            queue.run_lanes(jobs);
        }

        self.intermediate_scratch = intermediates;

        let failures = self.resolve_dirty_base(cache, materials, backend, scene, &[]);

        self.unlit_base_batches.clear();
        self.unlit_base_batches.extend(
            self.base_scratch
                .drain(..)
                .flatten()
                .filter(|batch| batch.pipeline_state.is_some()),
        );
        failures
    }

    /// Expand lit intermediates into final base and per-light batches.
    ///
    /// A drawable whose top-ranked light is the frame's main light folds
    /// that light into its base batch (forward-lit passes only); every
    /// remaining ranked light becomes a per-light batch drawn with the
    /// additional pass. Returns the number of batches dropped because state
    /// creation failed.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn collect_lit_batches(
        &mut self,
        queue: &WorkQueue,
        threshold: usize,
        scene: &[Box<dyn Drawable>],
        materials: &MaterialRegistry,
        cache: &mut PipelineStateCache,
        backend: &mut dyn PipelineBackend,
        lighting: &LightAccumulatorSet,
        main_light: Option<u32>,
        light_hashes: &[u64],
        visible_lights: &[u32],
    ) -> u64 {
        let mut intermediates = std::mem::take(&mut self.intermediate_scratch);
        intermediates.clear();
        self.lit.drain_ordered(&mut intermediates);

        self.base_scratch.clear();
        self.base_scratch.resize_with(intermediates.len(), || None);
        self.dirty_base.reset(queue.num_lanes());
        self.dirty_lights.reset(queue.num_lanes());
        self.light_batch_lanes.reset(queue.num_lanes());

        let main_light_hash = main_light.map_or(0, |index| light_hashes[index as usize]);
        let lit_base_type = self.description.pass_type == ScenePassType::ForwardLitBase;
        let plain_base_index = self.base_pass_index;

        {
            let ranges = queue.partition(intermediates.len(), threshold);
            let dirty_base = &self.dirty_base;
            let dirty_lights = &self.dirty_lights;
            let light_lanes = &self.light_batch_lanes;
            let cache_ref: &PipelineStateCache = cache;
            let mut remaining = self.base_scratch.as_mut_slice();
            let mut jobs: Vec<LaneJob> = Vec::with_capacity(ranges.len());
            for (lane, range) in ranges.iter().enumerate() {
                let (chunk, rest) = remaining.split_at_mut(range.len());
                remaining = rest;
                let items = &intermediates[range.clone()];
                let offset = range.start;
                jobs.push(Box::new(move || {
                    let mut pixel_lights: Vec<AccumulatedLight> = Vec::new();
                    for (i, intermediate) in items.iter().enumerate() {
                        let Some(additional_pass) = intermediate.additional_pass else {
                            continue;
                        };
                        lighting.visit(intermediate.drawable_index, |entries| {
                            pixel_lights.clear();
                            pixel_lights.extend_from_slice(entries);
                        });

                        let has_lit_base = lit_base_type
                            && !pixel_lights.is_empty()
                            && main_light == Some(pixel_lights[0].light_index);

                        let base_pass = if has_lit_base {
                            intermediate.base_pass
                        } else {
                            plain_base(intermediate, plain_base_index, lit_base_type, materials)
                        };
                        if let Some(pass) = base_pass {
                            let light_index = if has_lit_base { main_light } else { None };
                            let light_hash = if has_lit_base { main_light_hash } else { 0 };
                            let mut batch =
                                build_scene_batch(scene, materials, intermediate, pass, light_index);
                            let key = batch_key(&batch, light_hash);
                            batch.pipeline_state = cache_ref.try_get(&key);
                            if batch.pipeline_state.is_none() {
                                dirty_base.push(lane, (offset + i, key));
                            }
                            chunk[i] = Some(batch);
                        }

                        let first_rank = usize::from(has_lit_base);
                        for entry in &pixel_lights[first_rank..] {
                            let light_hash = light_hashes[entry.light_index as usize];
                            let mut batch = build_scene_batch(
                                scene,
                                materials,
                                intermediate,
                                additional_pass,
                                Some(entry.light_index),
                            );
                            let key = batch_key(&batch, light_hash);
                            batch.pipeline_state = cache_ref.try_get(&key);
                            let missing = batch.pipeline_state.is_none();
                            let slot = light_lanes.push(lane, batch);
                            if missing {
                                dirty_lights.push(lane, (lane, slot, key));
                            }
                        }
                    }
                }));
            }
            queue.run_lanes(jobs);
        }

        self.intermediate_scratch = intermediates;

        let mut failures = self.resolve_dirty_base(cache, materials, backend, scene, visible_lights);
        failures += self.resolve_dirty_lights(cache, materials, backend, scene, visible_lights);

        self.lit_base_batches.clear();
        self.lit_base_batches.extend(
            self.base_scratch
                .drain(..)
                .flatten()
                .filter(|batch| batch.pipeline_state.is_some()),
        );
        self.light_batches.clear();
        self.light_batch_lanes.drain_ordered(&mut self.light_batches);
        self.light_batches.retain(|batch| batch.pipeline_state.is_some());

        failures
    }

    /// Order the final batch lists by the pass's sort mode
    pub(crate) fn sort(&mut self) {
        let mode = self.description.sort_mode;
        sort_batches(&mut self.unlit_base_batches, mode);
        sort_batches(&mut self.lit_base_batches, mode);
        sort_batches(&mut self.light_batches, mode);
    }

    fn resolve_dirty_base(
        &mut self,
        cache: &mut PipelineStateCache,
        materials: &MaterialRegistry,
        backend: &mut dyn PipelineBackend,
        scene: &[Box<dyn Drawable>],
        visible_lights: &[u32],
    ) -> u64 {
        let mut dirty = Vec::new();
        self.dirty_base.drain_ordered(&mut dirty);

        let mut failures = 0;
        for (slot, key) in dirty {
            let Some(batch) = self.base_scratch.get_mut(slot).and_then(Option::as_mut) else {
                continue;
            };
            let light = batch
                .light_index
                .and_then(|index| light_at(scene, visible_lights, index));
            match resolve_state(cache, materials, backend, key, light) {
                Ok(state) => batch.pipeline_state = Some(state),
                Err(error) => {
                    failures += 1;
                    log::warn!("Dropping base batch in pass '{}': {error}", self.description.name);
                }
            }
        }
        failures
    }

    fn resolve_dirty_lights(
        &mut self,
        cache: &mut PipelineStateCache,
        materials: &MaterialRegistry,
        backend: &mut dyn PipelineBackend,
        scene: &[Box<dyn Drawable>],
        visible_lights: &[u32],
    ) -> u64 {
        let mut dirty = Vec::new();
        self.dirty_lights.drain_ordered(&mut dirty);

        let mut failures = 0;
        for (lane, slot, key) in dirty {
            let Some(batch) = self.light_batch_lanes.get_mut(lane, slot) else {
                continue;
            };
            let light = batch
                .light_index
                .and_then(|index| light_at(scene, visible_lights, index));
            match resolve_state(cache, materials, backend, key, light) {
                Ok(state) => batch.pipeline_state = Some(state),
                Err(error) => {
                    failures += 1;
                    log::warn!("Dropping light batch in pass '{}': {error}", self.description.name);
                }
            }
        }
        failures
    }
}

/// The plain base pass of a lit intermediate.
///
/// Forward-unlit intermediates carry it directly; forward-lit intermediates
/// carry the first-light pass instead, so the plain base is looked up from
/// the same technique when configured.
fn plain_base(
    intermediate: &IntermediateSceneBatch,
    base_pass_index: Option<PassIndex>,
    lit_base_type: bool,
    materials: &MaterialRegistry,
) -> Option<PassRef> {
    if !lit_base_type {
        return intermediate.base_pass;
    }
    let index = base_pass_index?;
    let technique = intermediate.additional_pass?.technique;
    materials
        .technique(technique)
        .is_some_and(|tech| tech.has_pass(index))
        .then_some(PassRef { technique, index })
}

fn build_scene_batch(
    scene: &[Box<dyn Drawable>],
    materials: &MaterialRegistry,
    intermediate: &IntermediateSceneBatch,
    pass: PassRef,
    light_index: Option<u32>,
) -> SceneBatch {
    let drawable = &scene[intermediate.drawable_index as usize];
    let source = drawable.source_batches()[intermediate.source_batch_index as usize];
    SceneBatch {
        drawable_index: intermediate.drawable_index,
        source_batch_index: intermediate.source_batch_index,
        geometry: source.geometry,
        material: materials.resolve_material(source.material),
        pass,
        distance: drawable.distance(),
        light_index,
        pipeline_state: None,
    }
}

fn batch_key(batch: &SceneBatch, light_hash: u64) -> PipelineStateKey {
    PipelineStateKey {
        geometry: batch.geometry,
        material: batch.material,
        pass: batch.pass,
        source_batch_index: batch.source_batch_index,
        light_hash,
    }
}

fn resolve_state(
    cache: &mut PipelineStateCache,
    materials: &MaterialRegistry,
    backend: &mut dyn PipelineBackend,
    key: PipelineStateKey,
    light: Option<&Light>,
) -> Result<Arc<PipelineState>, PipelineStateError> {
    cache.get_or_create(key, || {
        let technique = materials
            .technique(key.pass.technique)
            .ok_or(PipelineStateError::MissingPass)?;
        let pass = technique
            .get_pass(key.pass.index)
            .ok_or(PipelineStateError::MissingPass)?;
        let pass_name = materials.pass_name(key.pass.index).unwrap_or("");
        backend.create_pipeline_state(&PipelineStateDesc {
            key,
            pass,
            pass_name,
            light,
        })
    })
}

fn light_at<'a>(scene: &'a [Box<dyn Drawable>], visible_lights: &[u32], index: u32) -> Option<&'a Light> {
    let drawable_index = *visible_lights.get(index as usize)? as usize;
    scene.get(drawable_index)?.as_light()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::technique::Pass;

    fn lit_technique(
        registry: &mut MaterialRegistry,
        passes: &[&str],
    ) -> (TechniqueHandle, Vec<PassIndex>) {
        let mut technique = Technique::new("test");
        let indices: Vec<PassIndex> = passes
            .iter()
            .map(|name| {
                let index = registry.pass_index(name);
                technique.set_pass(index, Pass::new("v", "f"));
                index
            })
            .collect();
        (registry.register_technique(technique), indices)
    }

    #[test]
    fn test_description_validity_matrix() {
        assert!(ScenePassDescription::unlit("opaque", "base").validate().is_ok());
        assert!(ScenePassDescription::forward_lit("lit", "litbase", "light")
            .validate()
            .is_ok());
        assert!(ScenePassDescription::forward_lit("lit", "litbase", "light")
            .with_base_pass("base")
            .validate()
            .is_ok());
        assert!(ScenePassDescription::forward_unlit("alpha", "base", "light")
            .validate()
            .is_ok());

        // Unlit passes must not name light passes
        let mut bad_unlit = ScenePassDescription::unlit("opaque", "base");
        bad_unlit.additional_light_pass = Some("light".into());
        assert!(bad_unlit.validate().is_err());

        // Forward-lit passes need the first-light pass
        let mut bad_lit = ScenePassDescription::forward_lit("lit", "litbase", "light");
        bad_lit.first_light_pass = None;
        assert!(bad_lit.validate().is_err());

        // Forward-unlit passes must not name a first-light pass
        let mut bad_forward_unlit = ScenePassDescription::forward_unlit("alpha", "base", "light");
        bad_forward_unlit.first_light_pass = Some("litbase".into());
        assert!(bad_forward_unlit.validate().is_err());

        // Empty names count as absent
        let mut empty_name = ScenePassDescription::unlit("opaque", "");
        assert!(empty_name.validate().is_err());
        empty_name.base_pass = None;
        assert!(empty_name.validate().is_err());
    }

    #[test]
    fn test_forward_lit_routing_by_technique_support() {
        let mut registry = MaterialRegistry::new();
        let description = ScenePassDescription::forward_lit("lit", "litbase", "light")
            .with_base_pass("base");
        let mut pass = PassData::new(description, &mut registry).unwrap();
        pass.begin_frame(1);

        // Technique with all three passes: lit bucket, first-light pass in
        // the base slot
        let (full, indices) = lit_technique(&mut registry, &["base", "litbase", "light"]);
        let technique = registry.technique(full).unwrap();
        assert!(pass.add_source_batch(0, 0, 0, full, technique));
        let mut lit = Vec::new();
        pass.lit.drain_ordered(&mut lit);
        assert_eq!(lit.len(), 1);
        assert_eq!(lit[0].base_pass, Some(PassRef { technique: full, index: indices[1] }));
        assert_eq!(
            lit[0].additional_pass,
            Some(PassRef { technique: full, index: indices[2] })
        );

        // Technique with only the base pass: unlit bucket
        let (base_only, base_indices) = lit_technique(&mut registry, &["base"]);
        let technique = registry.technique(base_only).unwrap();
        assert!(!pass.add_source_batch(0, 1, 0, base_only, technique));
        let mut unlit = Vec::new();
        pass.unlit.drain_ordered(&mut unlit);
        assert_eq!(unlit.len(), 1);
        assert_eq!(
            unlit[0].base_pass,
            Some(PassRef { technique: base_only, index: base_indices[0] })
        );
        assert_eq!(unlit[0].additional_pass, None);

        // Technique with light pass but no first-light pass: dropped, and
        // no bucket is touched
        let (no_first, _) = lit_technique(&mut registry, &["base", "light"]);
        let dropped_pass = ScenePassDescription::forward_lit("lit2", "litbase", "light");
        let dropped = PassData::new(dropped_pass, &mut registry).unwrap();
        let technique = registry.technique(no_first).unwrap();
        assert!(!dropped.add_source_batch(0, 2, 0, no_first, technique));
    }

    #[test]
    fn test_unlit_pass_ignores_light_passes() {
        let mut registry = MaterialRegistry::new();
        let mut pass =
            PassData::new(ScenePassDescription::unlit("opaque", "base"), &mut registry).unwrap();
        pass.begin_frame(1);

        let (handle, indices) = lit_technique(&mut registry, &["base", "litbase", "light"]);
        let technique = registry.technique(handle).unwrap();

        assert!(!pass.add_source_batch(0, 0, 0, handle, technique));
        let mut unlit = Vec::new();
        pass.unlit.drain_ordered(&mut unlit);
        assert_eq!(unlit.len(), 1);
        assert_eq!(unlit[0].base_pass, Some(PassRef { technique: handle, index: indices[0] }));
        assert_eq!(unlit[0].additional_pass, None);
    }

    #[test]
    fn test_forward_unlit_requires_base_for_lit_bucket() {
        let mut registry = MaterialRegistry::new();
        let mut pass = PassData::new(
            ScenePassDescription::forward_unlit("alpha", "base", "light"),
            &mut registry,
        )
        .unwrap();
        pass.begin_frame(1);

        // Base and light present: lit bucket with the plain base
        let (both, indices) = lit_technique(&mut registry, &["base", "light"]);
        let technique = registry.technique(both).unwrap();
        assert!(pass.add_source_batch(0, 0, 0, both, technique));
        let mut lit = Vec::new();
        pass.lit.drain_ordered(&mut lit);
        assert_eq!(lit[0].base_pass, Some(PassRef { technique: both, index: indices[0] }));

        // Light present but no base: dropped entirely
        let (light_only, _) = lit_technique(&mut registry, &["light"]);
        let technique = registry.technique(light_only).unwrap();
        assert!(!pass.add_source_batch(0, 1, 0, light_only, technique));
        assert!(pass.lit.is_empty());
        assert!(pass.unlit.is_empty());
    }

    #[test]
    fn test_invalid_description_reports_name() {
        let mut registry = MaterialRegistry::new();
        let mut description = ScenePassDescription::unlit("broken", "base");
        description.first_light_pass = Some("litbase".into());

        let error = PassData::new(description, &mut registry).unwrap_err();
        assert!(error.contains("broken"));
    }
}
