//! Frame orchestration: visibility, lighting, classification, sorting
//!
//! [`SceneBatchCollector`] owns every frame-scoped buffer and drives the
//! collection pipeline stage by stage. Each stage runs as one parallel
//! section on the work queue; joining the section is the barrier before the
//! next stage reads the merged results. The collector borrows the scene,
//! the spatial index and the material registry only for the duration of
//! [`SceneBatchCollector::collect`].

use crate::core::config::{CollectorConfig, QualityLevel};
use crate::core::work_queue::{LaneJob, WorkQueue};
use crate::foundation::collections::LaneVec;
use crate::render::light_accumulator::LightAccumulatorSet;
use crate::render::lights::{accumulate_forward_lighting, collect_lit_geometries, LightData, LightDataCache};
use crate::render::passes::{PassConfigError, PassData, ScenePassDescription};
use crate::render::pipeline_cache::{PipelineBackend, PipelineCacheStats, PipelineStateCache};
use crate::render::transient::{DrawableTraits, TransientDrawableIndex, ZRange, ZRangeEvaluator};
use crate::scene::camera::{Camera, ViewOverrideFlags};
use crate::scene::drawable::{Drawable, DrawableFlags, FrameInfo};
use crate::scene::light::LightType;
use crate::scene::material::MaterialRegistry;
use crate::spatial::query::SpatialIndex;

/// Errors from running a collection
#[derive(thiserror::Error, Debug)]
pub enum CollectError {
    /// [`SceneBatchCollector::initialize_passes`] has not installed any pass
    #[error("no scene passes configured")]
    NoPasses,
}

/// Per-frame collection statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame the stats were gathered for
    pub frame_number: u64,
    /// Drawables that passed culling as geometry
    pub visible_geometries: usize,
    /// Lights in the visible-light list
    pub visible_lights: usize,
    /// Final batches across all passes after sorting
    pub total_batches: usize,
    /// Batches dropped because pipeline-state creation failed
    pub failed_pipeline_states: u64,
    /// Pipeline cache activity for the frame
    pub pipeline_cache: PipelineCacheStats,
}

/// Per-frame scene batch collection and pipeline-state resolution.
///
/// Owns the work queue, the transient per-drawable state, the per-drawable
/// light accumulators, the cross-frame light-data and pipeline-state caches
/// and the configured scene passes. One collector serves one view; it is
/// reused every frame so its buffers amortize their allocations.
pub struct SceneBatchCollector {
    config: CollectorConfig,
    queue: WorkQueue,
    frame_number: u64,

    passes: Vec<PassData>,
    transient: TransientDrawableIndex,
    accumulators: LightAccumulatorSet,
    light_cache: LightDataCache,
    pipeline_cache: PipelineStateCache,

    geometry_lanes: LaneVec<u32>,
    light_lanes: LaneVec<u32>,
    visible_geometries: Vec<u32>,
    visible_lights: Vec<u32>,
    light_hashes: Vec<u64>,
    scene_z_range: ZRange,
    main_light: Option<u32>,
    stats: FrameStats,
}

impl SceneBatchCollector {
    /// Create a collector; the worker thread count comes from `config`
    pub fn new(config: CollectorConfig) -> Self {
        let queue = WorkQueue::new(config.resolved_worker_threads());
        log::info!(
            "Scene batch collector ready with {} lanes, pixel light budget {}",
            queue.num_lanes(),
            config.effective_max_pixel_lights()
        );
        Self {
            config,
            queue,
            frame_number: 0,
            passes: Vec::new(),
            transient: TransientDrawableIndex::new(),
            accumulators: LightAccumulatorSet::new(),
            light_cache: LightDataCache::new(),
            pipeline_cache: PipelineStateCache::new(),
            geometry_lanes: LaneVec::new(),
            light_lanes: LaneVec::new(),
            visible_geometries: Vec::new(),
            visible_lights: Vec::new(),
            light_hashes: Vec::new(),
            scene_z_range: ZRange::EMPTY,
            main_light: None,
            stats: FrameStats::default(),
        }
    }

    /// Install the scene passes batches will be collected for.
    ///
    /// Replaces any previously installed passes. Descriptions whose pass
    /// combination their type forbids are excluded and reported through the
    /// returned error; the remaining valid passes are still installed, so a
    /// single bad entry never blacks out the frame.
    pub fn initialize_passes(
        &mut self,
        descriptions: &[ScenePassDescription],
        registry: &mut MaterialRegistry,
    ) -> Result<(), PassConfigError> {
        self.passes.clear();
        let mut rejected = Vec::new();
        for description in descriptions {
            match PassData::new(description.clone(), registry) {
                Ok(pass) => self.passes.push(pass),
                Err(reason) => {
                    log::error!("Excluding scene pass: {reason}");
                    rejected.push(reason);
                }
            }
        }
        if rejected.is_empty() {
            Ok(())
        } else {
            Err(PassConfigError::InvalidDescriptions(rejected))
        }
    }

    /// Installed passes, in configuration order
    pub fn passes(&self) -> &[PassData] {
        &self.passes
    }

    /// Look up an installed pass by name
    pub fn pass(&self, name: &str) -> Option<&PassData> {
        self.passes.iter().find(|pass| pass.name() == name)
    }

    /// Drawable indices that passed culling as geometry, ascending
    pub fn visible_geometries(&self) -> &[u32] {
        &self.visible_geometries
    }

    /// Drawable indices of the visible lights; batch light indices point
    /// into this list
    pub fn visible_lights(&self) -> &[u32] {
        &self.visible_lights
    }

    /// Merged depth interval of the finite visible geometry
    pub fn scene_z_range(&self) -> ZRange {
        self.scene_z_range
    }

    /// Index into [`SceneBatchCollector::visible_lights`] of the brightest
    /// visible directional light, if any
    pub fn main_light(&self) -> Option<u32> {
        self.main_light
    }

    /// Per-drawable traits and depth intervals of the last collected frame
    pub fn transient_index(&self) -> &TransientDrawableIndex {
        &self.transient
    }

    /// Statistics of the last collected frame
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Run the full collection pipeline for one frame.
    ///
    /// On return every installed pass holds its sorted batch lists and every
    /// surviving batch carries a resolved pipeline state. Pipeline-state
    /// creation failures drop the affected batch and are counted in the
    /// stats; they never fail the frame.
    pub fn collect(
        &mut self,
        scene: &mut [Box<dyn Drawable>],
        spatial: &dyn SpatialIndex,
        camera: &Camera,
        materials: &MaterialRegistry,
        backend: &mut dyn PipelineBackend,
    ) -> Result<FrameStats, CollectError> {
        if self.passes.is_empty() {
            return Err(CollectError::NoPasses);
        }

        self.frame_number += 1;
        let lane_count = self.queue.num_lanes();

        self.transient.reset(scene.len());
        self.accumulators
            .reset(scene.len(), self.config.effective_max_pixel_lights());
        self.light_cache.begin_frame(self.frame_number);
        self.pipeline_cache.begin_frame();
        self.geometry_lanes.reset(lane_count);
        self.light_lanes.reset(lane_count);
        for pass in &mut self.passes {
            pass.begin_frame(lane_count);
        }

        self.collect_visibility(scene, spatial, camera, materials);

        let scene: &[Box<dyn Drawable>] = scene;
        self.select_main_light(scene);
        let light_data = self.process_lights(scene, spatial);
        self.accumulate_lighting(scene, &light_data);

        let mut failures = 0;
        for pass in &mut self.passes {
            failures += pass.collect_unlit_batches(
                &self.queue,
                self.config.batch_work_threshold,
                scene,
                materials,
                &mut self.pipeline_cache,
                backend,
            );
            failures += pass.collect_lit_batches(
                &self.queue,
                self.config.batch_work_threshold,
                scene,
                materials,
                &mut self.pipeline_cache,
                backend,
                &self.accumulators,
                self.main_light,
                &self.light_hashes,
                &self.visible_lights,
            );
            pass.sort();
        }

        // Return the lit-geometry allocations to the cross-frame pool
        for (&drawable_index, data) in self.visible_lights.iter().zip(light_data) {
            if let Some(light) = scene[drawable_index as usize].as_light() {
                self.light_cache.put_back(light.id, data);
            }
        }

        self.stats = FrameStats {
            frame_number: self.frame_number,
            visible_geometries: self.visible_geometries.len(),
            visible_lights: self.visible_lights.len(),
            total_batches: self.passes.iter().map(PassData::total_batches).sum(),
            failed_pipeline_states: failures,
            pipeline_cache: self.pipeline_cache.stats(),
        };
        log::debug!(
            "Frame {}: {} visible geometries, {} lights, {} batches ({} dropped), cache {}H/{}M/{}C",
            self.stats.frame_number,
            self.stats.visible_geometries,
            self.stats.visible_lights,
            self.stats.total_batches,
            self.stats.failed_pipeline_states,
            self.stats.pipeline_cache.hits,
            self.stats.pipeline_cache.misses,
            self.stats.pipeline_cache.created,
        );
        Ok(self.stats)
    }

    /// Visibility stage: cull against the camera, update drawables, fill the
    /// per-pass intermediate buckets and the visible geometry/light lists.
    ///
    /// Requires the spatial index to report each drawable index at most
    /// once per query; the lane split over the sorted candidate list panics
    /// on duplicates.
    fn collect_visibility(
        &mut self,
        scene: &mut [Box<dyn Drawable>],
        spatial: &dyn SpatialIndex,
        camera: &Camera,
        materials: &MaterialRegistry,
    ) {
        let frustum = camera.frustum();
        let evaluator = ZRangeEvaluator::new(&camera.get_view_matrix());
        let frame_info = FrameInfo {
            frame_number: self.frame_number,
            camera_position: camera.position,
        };
        let quality = if camera
            .view_overrides
            .contains(ViewOverrideFlags::LOW_MATERIAL_QUALITY)
        {
            QualityLevel::Low
        } else {
            self.config.material_quality
        };

        // Node-granular candidates; `inside` skips the exact bounds test.
        // Sorting by index makes the lane partitions contiguous in the scene
        // slice, which both allows disjoint mutable splits and makes the
        // merged output order a function of the candidate set alone.
        let mut candidates: Vec<(u32, bool)> = Vec::new();
        spatial.query_frustum(
            &frustum,
            DrawableFlags::GEOMETRY | DrawableFlags::LIGHT,
            &mut |index, inside| {
                if (index as usize) < scene.len() {
                    candidates.push((index, inside));
                }
            },
        );
        candidates.sort_unstable_by_key(|&(index, _)| index);

        let ranges = self
            .queue
            .partition(candidates.len(), self.config.drawable_work_threshold);
        let mut z_partials = vec![ZRange::EMPTY; ranges.len()];

        {
            let transient = &self.transient;
            let accumulators = &self.accumulators;
            let geometry_lanes = &self.geometry_lanes;
            let light_lanes = &self.light_lanes;
            let passes = &self.passes;
            let frustum = &frustum;

            let mut jobs: Vec<LaneJob> = Vec::with_capacity(ranges.len());
            let mut remaining = &mut scene[..];
            let mut consumed = 0usize;
            for ((lane, range), lane_z) in ranges.iter().enumerate().zip(&mut z_partials) {
                let chunk = &candidates[range.clone()];
                let first = chunk[0].0 as usize;
                let last = chunk[chunk.len() - 1].0 as usize;
                let (_, rest) = remaining.split_at_mut(first - consumed);
                let (lane_slice, rest) = rest.split_at_mut(last - first + 1);
                remaining = rest;
                consumed = last + 1;

                jobs.push(Box::new(move || {
                    for &(index, inside) in chunk {
                        let drawable = &mut lane_slice[index as usize - first];
                        drawable.update_batches(&frame_info);
                        transient.mark(index, DrawableTraits::UPDATED);

                        // Skips only this drawable; the rest of the chunk
                        // still collects
                        let draw_distance = drawable.draw_distance();
                        if draw_distance > 0.0 && drawable.distance() > draw_distance {
                            continue;
                        }

                        let flags = drawable.flags();
                        let bounds = drawable.world_bounds();
                        let visible = inside || frustum.intersects_aabb(&bounds);
                        if !visible {
                            continue;
                        }

                        if flags.contains(DrawableFlags::GEOMETRY) {
                            let z_range = evaluator.evaluate(&bounds);
                            transient.store_z_range(index, z_range);
                            if !z_range.is_infinite() {
                                lane_z.merge(&z_range);
                            }
                            transient.mark(index, DrawableTraits::VISIBLE_GEOMETRY);
                            geometry_lanes.push(lane, index);
                            accumulators.reset_drawable(index);

                            let lod_distance = drawable.lod_distance();
                            for (batch_index, source) in
                                drawable.source_batches().iter().enumerate()
                            {
                                let material = materials.resolve_material(source.material);
                                let Some(handle) =
                                    materials.find_technique(material, lod_distance, quality)
                                else {
                                    continue;
                                };
                                let Some(technique) = materials.technique(handle) else {
                                    continue;
                                };
                                for pass in passes {
                                    if pass.add_source_batch(
                                        lane,
                                        index,
                                        batch_index as u32,
                                        handle,
                                        technique,
                                    ) {
                                        transient.mark(index, DrawableTraits::FORWARD_LIT);
                                    }
                                }
                            }
                        }

                        if flags.contains(DrawableFlags::LIGHT) {
                            if let Some(light) = drawable.as_light() {
                                if !light.is_negligible() && light.light_mask != 0 {
                                    light_lanes.push(lane, index);
                                }
                            }
                        }
                    }
                }));
            }
            self.queue.run_lanes(jobs);
        }

        self.visible_geometries.clear();
        self.geometry_lanes.drain_ordered(&mut self.visible_geometries);
        self.visible_lights.clear();
        self.light_lanes.drain_ordered(&mut self.visible_lights);

        self.scene_z_range = ZRange::EMPTY;
        for partial in &z_partials {
            self.scene_z_range.merge(partial);
        }
    }

    /// The brightest visible directional light anchors forward-lit base
    /// batches for the frame
    fn select_main_light(&mut self, scene: &[Box<dyn Drawable>]) {
        self.main_light = None;
        let mut best = 0.0f32;
        for (light_index, &drawable_index) in self.visible_lights.iter().enumerate() {
            let Some(light) = scene[drawable_index as usize].as_light() else {
                continue;
            };
            if light.light_type == LightType::Directional && light.luminance() > best {
                best = light.luminance();
                self.main_light = Some(light_index as u32);
            }
        }
    }

    /// Light query stage: one work item per visible light, each filling its
    /// own lit-geometry list
    fn process_lights(
        &mut self,
        scene: &[Box<dyn Drawable>],
        spatial: &dyn SpatialIndex,
    ) -> Vec<LightData> {
        self.light_hashes.clear();
        let mut light_data = Vec::with_capacity(self.visible_lights.len());
        for &drawable_index in &self.visible_lights {
            match scene[drawable_index as usize].as_light() {
                Some(light) => {
                    self.light_hashes.push(light.pipeline_hash());
                    light_data.push(self.light_cache.take(light.id, self.frame_number));
                }
                None => {
                    self.light_hashes.push(0);
                    light_data.push(LightData::default());
                }
            }
        }

        {
            let transient = &self.transient;
            let visible_geometries = &self.visible_geometries;
            let visible_lights = &self.visible_lights;
            let ranges = self.queue.partition(visible_lights.len(), 1);

            let mut jobs: Vec<LaneJob> = Vec::with_capacity(ranges.len());
            let mut remaining = light_data.as_mut_slice();
            for range in &ranges {
                let (chunk, rest) = remaining.split_at_mut(range.len());
                remaining = rest;
                let lights = &visible_lights[range.clone()];
                jobs.push(Box::new(move || {
                    for (data, &drawable_index) in chunk.iter_mut().zip(lights) {
                        let Some(light) = scene[drawable_index as usize].as_light() else {
                            continue;
                        };
                        collect_lit_geometries(
                            light,
                            scene,
                            spatial,
                            transient,
                            visible_geometries,
                            &mut data.lit_geometries,
                        );
                    }
                }));
            }
            self.queue.run_lanes(jobs);
        }

        light_data
    }

    /// Accumulation stage: offer every light to its lit geometries,
    /// partitioned over each light's list
    fn accumulate_lighting(&self, scene: &[Box<dyn Drawable>], light_data: &[LightData]) {
        for (light_index, (&drawable_index, data)) in
            self.visible_lights.iter().zip(light_data).enumerate()
        {
            let Some(light) = scene[drawable_index as usize].as_light() else {
                continue;
            };
            accumulate_forward_lighting(
                &self.queue,
                self.config.lit_geometry_work_threshold,
                scene,
                light,
                light_index as u32,
                &data.lit_geometries,
                &self.accumulators,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::QualityLevel;
    use crate::foundation::math::{constants, Vec3};
    use crate::render::pipeline_cache::{PipelineStateDesc, PipelineStateError, PipelineStateKey};
    use crate::render::sort::BatchSortMode;
    use crate::scene::drawable::GeometryId;
    use crate::scene::light::{Light, LightId};
    use crate::scene::material::MaterialId;
    use crate::scene::model::Model;
    use crate::scene::technique::{Pass, Technique, TechniqueEntry};
    use crate::spatial::bounds::Aabb;
    use crate::spatial::octree::{Octree, OctreeConfig};

    /// Backend that hands out sequential handles and records every creation
    #[derive(Default)]
    struct MockBackend {
        created: Vec<PipelineStateKey>,
        shaders: Vec<String>,
        fail_pass: Option<String>,
    }

    impl PipelineBackend for MockBackend {
        fn create_pipeline_state(
            &mut self,
            desc: &PipelineStateDesc<'_>,
        ) -> Result<u64, PipelineStateError> {
            if self.fail_pass.as_deref() == Some(desc.pass_name) {
                return Err(PipelineStateError::Backend("forced failure".into()));
            }
            self.created.push(desc.key);
            self.shaders.push(desc.pass.vertex_shader.clone());
            Ok(self.created.len() as u64)
        }
    }

    struct TestScene {
        scene: Vec<Box<dyn Drawable>>,
        octree: Octree,
        materials: MaterialRegistry,
        camera: Camera,
        default_material: MaterialId,
    }

    impl TestScene {
        /// Registry with one technique carrying base, litbase and light
        /// passes, installed on the default material
        fn new() -> Self {
            let mut materials = MaterialRegistry::new();
            let mut technique = Technique::new("forward");
            for name in ["base", "litbase", "light"] {
                let index = materials.pass_index(name);
                technique.set_pass(index, Pass::new(format!("{name}.vert"), format!("{name}.frag")));
            }
            let handle = materials.register_technique(technique);
            let default_material = materials.default_material();
            materials
                .material_mut(default_material)
                .unwrap()
                .add_technique(TechniqueEntry::new(handle, QualityLevel::Low, 0.0));

            Self {
                scene: Vec::new(),
                octree: Octree::new(
                    Aabb::from_center_extents(Vec3::zeros(), Vec3::new(200.0, 200.0, 200.0)),
                    OctreeConfig::default(),
                ),
                materials,
                // Looking from +z toward the origin
                camera: Camera::perspective(Vec3::new(0.0, 0.0, 30.0), 60.0, 1.0, 0.1, 200.0),
                default_material,
            }
        }

        fn add(&mut self, drawable: impl Drawable + 'static) -> u32 {
            let index = self.scene.len() as u32;
            let bounds = drawable.world_bounds();
            let flags = drawable.flags();
            self.octree.insert(index, flags, bounds);
            self.scene.push(Box::new(drawable));
            index
        }

        fn add_model_at(&mut self, position: Vec3) -> u32 {
            let bounds = Aabb::from_center_extents(position, Vec3::new(1.0, 1.0, 1.0));
            self.add(Model::new(bounds).with_batch(GeometryId(100), None))
        }

        fn collect(
            &mut self,
            collector: &mut SceneBatchCollector,
            backend: &mut MockBackend,
        ) -> FrameStats {
            collector
                .collect(&mut self.scene, &self.octree, &self.camera, &self.materials, backend)
                .unwrap()
        }
    }

    fn single_lane_collector() -> SceneBatchCollector {
        SceneBatchCollector::new(CollectorConfig {
            worker_threads: 1,
            ..CollectorConfig::default()
        })
    }

    fn unlit_descriptions() -> Vec<ScenePassDescription> {
        vec![ScenePassDescription::unlit("opaque", "base")]
    }

    fn forward_lit_descriptions() -> Vec<ScenePassDescription> {
        vec![ScenePassDescription::forward_lit("lit", "litbase", "light").with_base_pass("base")]
    }

    #[test]
    fn test_unlit_end_to_end() {
        let mut world = TestScene::new();
        world.add_model_at(Vec3::zeros());

        let mut collector = single_lane_collector();
        collector
            .initialize_passes(&unlit_descriptions(), &mut world.materials)
            .unwrap();
        let mut backend = MockBackend::default();
        let stats = world.collect(&mut collector, &mut backend);

        assert_eq!(stats.visible_geometries, 1);
        assert_eq!(stats.total_batches, 1);
        let pass = collector.pass("opaque").unwrap();
        assert_eq!(pass.unlit_base_batches().len(), 1);

        let batch = &pass.unlit_base_batches()[0];
        assert_eq!(batch.geometry, GeometryId(100));
        assert_eq!(batch.material, world.default_material);
        assert_eq!(batch.light_index, None);
        assert!(batch.pipeline_state.is_some());
        assert_eq!(backend.created.len(), 1);
    }

    #[test]
    fn test_point_light_produces_base_and_light_batch() {
        let mut world = TestScene::new();
        let model = world.add_model_at(Vec3::zeros());
        world.add(Light::point(
            LightId(1),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 1.0),
            1.0,
            10.0,
        ));

        let mut collector = single_lane_collector();
        collector
            .initialize_passes(&forward_lit_descriptions(), &mut world.materials)
            .unwrap();
        let mut backend = MockBackend::default();
        let stats = world.collect(&mut collector, &mut backend);

        assert_eq!(stats.visible_lights, 1);
        assert_eq!(collector.main_light(), None);

        // No directional main light, so the base batch stays on the plain
        // base pass and the point light draws as an additional batch
        let pass = collector.pass("lit").unwrap();
        assert_eq!(pass.lit_base_batches().len(), 1);
        assert_eq!(pass.lit_base_batches()[0].light_index, None);
        assert_eq!(pass.light_batches().len(), 1);
        assert_eq!(pass.light_batches()[0].light_index, Some(0));
        assert_eq!(pass.light_batches()[0].drawable_index, model);
        assert!(pass.light_batches()[0].pipeline_state.is_some());
    }

    #[test]
    fn test_forward_lit_without_base_pass_emits_only_light_batches() {
        let mut world = TestScene::new();
        let model = world.add_model_at(Vec3::zeros());
        world.add(Light::point(
            LightId(1),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 1.0),
            1.0,
            10.0,
        ));

        let mut collector = single_lane_collector();
        // No plain base pass configured; a drawable whose top light is not
        // the main light has nowhere to put a base batch
        let descriptions = vec![ScenePassDescription::forward_lit("lit", "litbase", "light")];
        collector
            .initialize_passes(&descriptions, &mut world.materials)
            .unwrap();
        let mut backend = MockBackend::default();
        let stats = world.collect(&mut collector, &mut backend);

        assert_eq!(collector.main_light(), None);
        let pass = collector.pass("lit").unwrap();
        assert!(pass.lit_base_batches().is_empty());
        assert_eq!(pass.light_batches().len(), 1);
        assert_eq!(pass.light_batches()[0].light_index, Some(0));
        assert_eq!(pass.light_batches()[0].drawable_index, model);
        assert_eq!(stats.total_batches, 1);
    }

    #[test]
    fn test_main_directional_light_folds_into_base() {
        let mut world = TestScene::new();
        world.add_model_at(Vec3::zeros());
        world.add(Light::directional(
            LightId(1),
            Vec3::new(0.0, -1.0, 0.0),
            Vec3::new(1.0, 1.0, 1.0),
            1.0,
        ));

        let mut collector = single_lane_collector();
        collector
            .initialize_passes(&forward_lit_descriptions(), &mut world.materials)
            .unwrap();
        let mut backend = MockBackend::default();
        world.collect(&mut collector, &mut backend);

        assert_eq!(collector.main_light(), Some(0));
        let pass = collector.pass("lit").unwrap();
        // The main light rides the lit base pass; with a budget of one
        // light there is nothing left for additional batches
        assert_eq!(pass.lit_base_batches().len(), 1);
        assert_eq!(pass.lit_base_batches()[0].light_index, Some(0));
        assert!(pass.light_batches().is_empty());
    }

    #[test]
    fn test_main_light_is_brightest_directional() {
        let mut world = TestScene::new();
        world.add_model_at(Vec3::zeros());
        world.add(Light::directional(
            LightId(1),
            Vec3::new(0.0, -1.0, 0.0),
            Vec3::new(1.0, 1.0, 1.0),
            0.5,
        ));
        world.add(Light::directional(
            LightId(2),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(1.0, 1.0, 1.0),
            3.0,
        ));

        let mut collector = single_lane_collector();
        collector
            .initialize_passes(&forward_lit_descriptions(), &mut world.materials)
            .unwrap();
        let mut backend = MockBackend::default();
        world.collect(&mut collector, &mut backend);

        assert_eq!(collector.main_light(), Some(1));
    }

    #[test]
    fn test_low_quality_view_override_selects_cheaper_technique() {
        let mut world = TestScene::new();
        // Second technique on the same base pass, gated on High quality;
        // entry ordering puts it ahead of the Low-quality default
        let base_index = world.materials.pass_index("base");
        let mut technique = Technique::new("forward_hq");
        technique.set_pass(base_index, Pass::new("hq.vert", "hq.frag"));
        let handle = world.materials.register_technique(technique);
        let material = world.default_material;
        world
            .materials
            .material_mut(material)
            .unwrap()
            .add_technique(TechniqueEntry::new(handle, QualityLevel::High, 0.0));
        world.add_model_at(Vec3::zeros());

        let mut collector = single_lane_collector();
        collector
            .initialize_passes(&unlit_descriptions(), &mut world.materials)
            .unwrap();
        let mut backend = MockBackend::default();

        // Default quality is High, so the demanding technique wins
        world.collect(&mut collector, &mut backend);
        assert_eq!(backend.shaders, ["hq.vert"]);

        // The per-view override clamps selection to Low for this camera
        world.camera.view_overrides |= ViewOverrideFlags::LOW_MATERIAL_QUALITY;
        world.collect(&mut collector, &mut backend);
        assert_eq!(backend.shaders, ["hq.vert", "base.vert"]);
    }

    #[test]
    fn test_culling_excludes_out_of_frustum_geometry() {
        let mut world = TestScene::new();
        let visible = world.add_model_at(Vec3::zeros());
        // Behind the camera at z = 30 looking toward the origin
        world.add_model_at(Vec3::new(0.0, 0.0, 60.0));

        let mut collector = single_lane_collector();
        collector
            .initialize_passes(&unlit_descriptions(), &mut world.materials)
            .unwrap();
        let mut backend = MockBackend::default();
        let stats = world.collect(&mut collector, &mut backend);

        assert_eq!(stats.visible_geometries, 1);
        assert_eq!(collector.visible_geometries(), &[visible]);
        assert!(collector
            .transient_index()
            .traits(visible)
            .contains(DrawableTraits::VISIBLE_GEOMETRY));
    }

    #[test]
    fn test_draw_distance_skips_only_offending_drawable() {
        let mut world = TestScene::new();
        // Three drawables in one lane's chunk; the middle one is capped at
        // a draw distance the camera exceeds
        let first = world.add_model_at(Vec3::new(-2.0, 0.0, 0.0));
        let bounds = Aabb::from_center_extents(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));
        world.add(
            Model::new(bounds)
                .with_batch(GeometryId(100), None)
                .with_draw_distance(5.0),
        );
        let third = world.add_model_at(Vec3::new(2.0, 0.0, 0.0));

        let mut collector = SceneBatchCollector::new(CollectorConfig {
            worker_threads: 0,
            ..CollectorConfig::default()
        });
        collector
            .initialize_passes(&unlit_descriptions(), &mut world.materials)
            .unwrap();
        let mut backend = MockBackend::default();
        let stats = world.collect(&mut collector, &mut backend);

        assert_eq!(stats.visible_geometries, 2);
        assert_eq!(collector.visible_geometries(), &[first, third]);
    }

    #[test]
    fn test_scene_z_range_excludes_unbounded_geometry() {
        let mut world = TestScene::new();
        world.add_model_at(Vec3::zeros());
        // Skybox-sized drawable: visible, but its sentinel depth interval
        // must not stretch the aggregate
        let sky = Aabb::from_center_extents(
            Vec3::zeros(),
            Vec3::new(constants::LARGE_VALUE, constants::LARGE_VALUE, constants::LARGE_VALUE),
        );
        let sky_index = world.add(Model::new(sky).with_batch(GeometryId(200), None));

        let mut collector = single_lane_collector();
        collector
            .initialize_passes(&unlit_descriptions(), &mut world.materials)
            .unwrap();
        let mut backend = MockBackend::default();
        let stats = world.collect(&mut collector, &mut backend);

        assert_eq!(stats.visible_geometries, 2);
        assert!(collector.transient_index().z_range(sky_index).is_infinite());

        let range = collector.scene_z_range();
        // Camera at z = 30, unit box at the origin: depth roughly 29..31
        assert!(range.min > 25.0 && range.max < 35.0, "{range:?}");
    }

    #[test]
    fn test_negligible_lights_are_pruned() {
        let mut world = TestScene::new();
        world.add_model_at(Vec3::zeros());
        world.add(Light::point(
            LightId(1),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 1.0),
            0.0, // black
            10.0,
        ));
        world.add(
            Light::point(
                LightId(2),
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 1.0),
                1.0,
                10.0,
            )
            .with_light_mask(0),
        );
        let kept = world.add(Light::point(
            LightId(3),
            Vec3::new(-2.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 1.0),
            1.0,
            10.0,
        ));

        let mut collector = single_lane_collector();
        collector
            .initialize_passes(&forward_lit_descriptions(), &mut world.materials)
            .unwrap();
        let mut backend = MockBackend::default();
        let stats = world.collect(&mut collector, &mut backend);

        assert_eq!(stats.visible_lights, 1);
        assert_eq!(collector.visible_lights(), &[kept]);
    }

    #[test]
    fn test_invalid_pass_excluded_but_valid_installed() {
        let mut world = TestScene::new();
        let mut bad = ScenePassDescription::unlit("broken", "base");
        bad.additional_light_pass = Some("light".into());
        let descriptions = vec![ScenePassDescription::unlit("opaque", "base"), bad];

        let mut collector = single_lane_collector();
        let result = collector.initialize_passes(&descriptions, &mut world.materials);
        assert!(result.is_err());
        assert_eq!(collector.passes().len(), 1);
        assert!(collector.pass("opaque").is_some());
        assert!(collector.pass("broken").is_none());
    }

    #[test]
    fn test_collect_without_passes_is_an_error() {
        let mut world = TestScene::new();
        world.add_model_at(Vec3::zeros());
        let mut collector = single_lane_collector();
        let mut backend = MockBackend::default();

        let result = collector.collect(
            &mut world.scene,
            &world.octree,
            &world.camera,
            &world.materials,
            &mut backend,
        );
        assert!(matches!(result, Err(CollectError::NoPasses)));
    }

    #[test]
    fn test_pipeline_cache_reused_across_frames() {
        let mut world = TestScene::new();
        for i in 0..8 {
            world.add_model_at(Vec3::new(-7.0 + 2.0 * i as f32, 0.0, 0.0));
        }

        let mut collector = single_lane_collector();
        collector
            .initialize_passes(&unlit_descriptions(), &mut world.materials)
            .unwrap();
        let mut backend = MockBackend::default();

        let first = world.collect(&mut collector, &mut backend);
        // All models share geometry, material and pass, so one state serves
        // every batch
        assert_eq!(first.pipeline_cache.created, 1);
        assert_eq!(backend.created.len(), 1);

        let second = world.collect(&mut collector, &mut backend);
        assert_eq!(second.pipeline_cache.created, 0);
        assert_eq!(second.pipeline_cache.misses, 0);
        assert_eq!(backend.created.len(), 1);
        assert_eq!(second.total_batches, first.total_batches);
    }

    #[test]
    fn test_failed_creation_drops_only_affected_batches() {
        let mut world = TestScene::new();
        world.add_model_at(Vec3::zeros());
        world.add(Light::point(
            LightId(1),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 1.0),
            1.0,
            10.0,
        ));

        let mut collector = single_lane_collector();
        collector
            .initialize_passes(&forward_lit_descriptions(), &mut world.materials)
            .unwrap();
        let mut backend = MockBackend {
            fail_pass: Some("light".into()),
            ..MockBackend::default()
        };
        let stats = world.collect(&mut collector, &mut backend);

        // The additional-light batch is dropped, the base batch survives
        assert_eq!(stats.failed_pipeline_states, 1);
        let pass = collector.pass("lit").unwrap();
        assert_eq!(pass.lit_base_batches().len(), 1);
        assert!(pass.light_batches().is_empty());
    }

    #[test]
    fn test_repeated_collection_is_deterministic() {
        let mut world = TestScene::new();
        for i in 0..20 {
            world.add_model_at(Vec3::new(
                -10.0 + i as f32,
                (i % 3) as f32,
                -5.0 + (i % 7) as f32,
            ));
        }
        world.add(Light::directional(
            LightId(1),
            Vec3::new(0.0, -1.0, 0.0),
            Vec3::new(1.0, 1.0, 1.0),
            1.0,
        ));
        world.add(Light::point(
            LightId(2),
            Vec3::new(3.0, 0.0, 0.0),
            Vec3::new(1.0, 0.8, 0.6),
            2.0,
            15.0,
        ));

        let mut collector = SceneBatchCollector::new(CollectorConfig {
            worker_threads: 3,
            ..CollectorConfig::default()
        });
        collector
            .initialize_passes(&forward_lit_descriptions(), &mut world.materials)
            .unwrap();
        let mut backend = MockBackend::default();

        let identity = |pass: &PassData| {
            let flatten = |batches: &[crate::render::batch::SceneBatch]| {
                batches
                    .iter()
                    .map(|b| (b.drawable_index, b.source_batch_index, b.light_index))
                    .collect::<Vec<_>>()
            };
            (
                flatten(pass.unlit_base_batches()),
                flatten(pass.lit_base_batches()),
                flatten(pass.light_batches()),
            )
        };

        world.collect(&mut collector, &mut backend);
        let first = identity(collector.pass("lit").unwrap());
        let first_visible = collector.visible_geometries().to_vec();

        world.collect(&mut collector, &mut backend);
        let second = identity(collector.pass("lit").unwrap());

        assert_eq!(first, second);
        assert_eq!(first_visible, collector.visible_geometries());
    }

    #[test]
    fn test_back_to_front_pass_orders_by_distance() {
        let mut world = TestScene::new();
        let near = world.add_model_at(Vec3::new(0.0, 0.0, 20.0));
        let far = world.add_model_at(Vec3::new(0.0, 0.0, -20.0));

        let descriptions = vec![ScenePassDescription::unlit("alpha", "base")
            .with_sort_mode(BatchSortMode::BackToFront)];
        let mut collector = single_lane_collector();
        collector
            .initialize_passes(&descriptions, &mut world.materials)
            .unwrap();
        let mut backend = MockBackend::default();
        world.collect(&mut collector, &mut backend);

        let pass = collector.pass("alpha").unwrap();
        let order: Vec<u32> = pass
            .unlit_base_batches()
            .iter()
            .map(|b| b.drawable_index)
            .collect();
        assert_eq!(order, vec![far, near]);
    }

    #[test]
    fn test_light_mask_excludes_geometry_from_lighting() {
        let mut world = TestScene::new();
        let bounds = Aabb::from_center_extents(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));
        world.add(
            Model::new(bounds)
                .with_batch(GeometryId(100), None)
                .with_light_mask(0x1),
        );
        world.add(
            Light::point(
                LightId(1),
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 1.0),
                1.0,
                10.0,
            )
            .with_light_mask(0x2),
        );

        let mut collector = single_lane_collector();
        collector
            .initialize_passes(&forward_lit_descriptions(), &mut world.materials)
            .unwrap();
        let mut backend = MockBackend::default();
        let stats = world.collect(&mut collector, &mut backend);

        // The light is visible but reaches nothing; the batch stays lit-
        // classified (the technique has a light pass) with no light batches
        assert_eq!(stats.visible_lights, 1);
        let pass = collector.pass("lit").unwrap();
        assert_eq!(pass.lit_base_batches().len(), 1);
        assert_eq!(pass.lit_base_batches()[0].light_index, None);
        assert!(pass.light_batches().is_empty());
    }
}
