//! Headless collection demo on a synthetic sponza-style scene
//!
//! Builds a courtyard of columns and scattered props, lights it with a sun
//! and a handful of point and spot lights, then runs the batch collector
//! for a few frames while the camera orbits. The pipeline backend is a
//! stub that just counts creations, which makes the cache behavior easy to
//! watch: the first frame compiles every unique state, later frames hit
//! the cache even as visibility changes.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use render_core::prelude::*;

/// Counts creations in place of a real GPU backend
#[derive(Default)]
struct CountingBackend {
    created: u64,
}

impl PipelineBackend for CountingBackend {
    fn create_pipeline_state(
        &mut self,
        desc: &PipelineStateDesc<'_>,
    ) -> Result<u64, PipelineStateError> {
        self.created += 1;
        log::info!(
            "Compiling pipeline state #{} for pass '{}' ({} / {})",
            self.created,
            desc.pass_name,
            desc.pass.vertex_shader,
            desc.pass.fragment_shader,
        );
        Ok(self.created)
    }
}

/// A forward technique with base, lit-base and per-light passes
fn register_technique(materials: &mut MaterialRegistry, name: &str) -> MaterialId {
    let mut technique = Technique::new(format!("{name}_forward"));
    for pass_name in ["base", "litbase", "light"] {
        let index = materials.pass_index(pass_name);
        technique.set_pass(
            index,
            Pass::new(format!("{name}_{pass_name}.vert"), format!("{name}_{pass_name}.frag")),
        );
    }
    let handle = materials.register_technique(technique);

    let mut material = Material::new(name);
    material.add_technique(TechniqueEntry::new(handle, QualityLevel::Low, 0.0));
    materials.register_material(material)
}

fn build_scene(
    materials: &mut MaterialRegistry,
    octree: &mut Octree,
    rng: &mut StdRng,
) -> Vec<Box<dyn Drawable>> {
    let stone = register_technique(materials, "stone");
    let cloth = register_technique(materials, "cloth");

    let mut scene: Vec<Box<dyn Drawable>> = Vec::new();
    let mut add = |octree: &mut Octree, scene: &mut Vec<Box<dyn Drawable>>, drawable: Model| {
        let index = scene.len() as u32;
        octree.insert(index, drawable.flags(), drawable.world_bounds());
        scene.push(Box::new(drawable));
    };
    let mut add_light = |octree: &mut Octree, scene: &mut Vec<Box<dyn Drawable>>, light: Light| {
        let index = scene.len() as u32;
        octree.insert(index, light.flags(), light.world_bounds());
        scene.push(Box::new(light));
    };

    // Colonnade: two rows of columns along the courtyard
    let column_geometry = GeometryId(1);
    for i in 0..10 {
        for &x in &[-8.0f32, 8.0] {
            let z = -22.5 + 5.0 * i as f32;
            let bounds =
                Aabb::from_center_extents(Vec3::new(x, 4.0, z), Vec3::new(1.0, 4.0, 1.0));
            add(
                octree,
                &mut scene,
                Model::new(bounds).with_batch(column_geometry, Some(stone)),
            );
        }
    }

    // Floor slabs
    let slab_geometry = GeometryId(2);
    for i in 0..5 {
        let z = -20.0 + 10.0 * i as f32;
        let bounds =
            Aabb::from_center_extents(Vec3::new(0.0, -0.5, z), Vec3::new(10.0, 0.5, 5.0));
        add(
            octree,
            &mut scene,
            Model::new(bounds).with_batch(slab_geometry, Some(stone)),
        );
    }

    // Scattered props with a distance cap so far ones cull out
    let prop_geometry = GeometryId(3);
    for _ in 0..40 {
        let position = Vec3::new(
            rng.gen_range(-7.0..7.0),
            rng.gen_range(0.5..2.0),
            rng.gen_range(-24.0..24.0),
        );
        let bounds = Aabb::from_center_extents(position, Vec3::new(0.5, 0.5, 0.5));
        add(
            octree,
            &mut scene,
            Model::new(bounds)
                .with_batch(prop_geometry, Some(cloth))
                .with_draw_distance(45.0),
        );
    }

    // The sun, and torches along the columns
    add_light(
        octree,
        &mut scene,
        Light::directional(
            LightId(1),
            Vec3::new(0.3, -1.0, 0.2),
            Vec3::new(1.0, 0.96, 0.88),
            2.0,
        ),
    );
    for i in 0..6 {
        let z = -20.0 + 8.0 * i as f32;
        let side = if i % 2 == 0 { -7.0 } else { 7.0 };
        add_light(
            octree,
            &mut scene,
            Light::point(
                LightId(10 + i),
                Vec3::new(side, 3.0, z),
                Vec3::new(1.0, 0.6, 0.3),
                rng.gen_range(0.8..1.6),
                9.0,
            ),
        );
    }
    add_light(
        octree,
        &mut scene,
        Light::spot(
            LightId(20),
            Vec3::new(0.0, 10.0, 0.0),
            Vec3::new(0.0, -1.0, 0.1),
            Vec3::new(0.6, 0.7, 1.0),
            3.0,
            25.0,
            0.4,
            0.7,
        ),
    );

    scene
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut materials = MaterialRegistry::new();
    let world_bounds =
        Aabb::from_center_extents(Vec3::new(0.0, 10.0, 0.0), Vec3::new(60.0, 30.0, 60.0));
    let mut octree = Octree::new(world_bounds, OctreeConfig::default());
    let mut rng = StdRng::seed_from_u64(7);
    let mut scene = build_scene(&mut materials, &mut octree, &mut rng);

    let mut collector = SceneBatchCollector::new(CollectorConfig {
        max_pixel_lights: 2,
        ..CollectorConfig::default()
    });
    collector.initialize_passes(
        &[
            ScenePassDescription::forward_lit("forward", "litbase", "light").with_base_pass("base"),
            ScenePassDescription::unlit("alpha", "base").with_sort_mode(BatchSortMode::BackToFront),
        ],
        &mut materials,
    )?;

    let mut backend = CountingBackend::default();

    for frame in 0..8 {
        // Orbit the courtyard center
        let angle = frame as f32 * 0.35;
        let mut camera =
            Camera::perspective(Vec3::new(30.0 * angle.cos(), 6.0, 30.0 * angle.sin()), 70.0, 16.0 / 9.0, 0.1, 120.0);
        camera.look_at(Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, 1.0, 0.0));

        let stats = collector.collect(&mut scene, &octree, &camera, &materials, &mut backend)?;
        println!(
            "frame {:>2}: {:>3} geometries, {:>2} lights, {:>4} batches, cache {}H/{}M/{}C, z {:.1}..{:.1}",
            stats.frame_number,
            stats.visible_geometries,
            stats.visible_lights,
            stats.total_batches,
            stats.pipeline_cache.hits,
            stats.pipeline_cache.misses,
            stats.pipeline_cache.created,
            collector.scene_z_range().min,
            collector.scene_z_range().max,
        );
    }

    println!("total pipeline states compiled: {}", backend.created);
    Ok(())
}
