use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use glam::{Vec3, Vec4};
use tin_3d::{
    device::Topology,
    texture::{LoadCallback, PLACEHOLDER_PIXEL},
    AssetLoader, DecodedImage, Engine, EngineConfig, HeadlessDevice, ObjectKind, Renderable,
    TextureState,
};

/// Parks load callbacks so the test decides when each image arrives.
#[derive(Clone, Default)]
struct ParkedLoader {
    parked: Arc<Mutex<Vec<(String, LoadCallback)>>>,
}

impl ParkedLoader {
    fn finish_all(&self, image: DecodedImage) -> Vec<String> {
        let parked = std::mem::take(&mut *self.parked.lock().unwrap());
        parked
            .into_iter()
            .map(|(url, done)| {
                done(Ok(image.clone()));
                url
            })
            .collect()
    }
}

impl AssetLoader for ParkedLoader {
    fn load_image(&self, url: &str, done: LoadCallback) {
        self.parked.lock().unwrap().push((url.to_string(), done));
    }
}

fn engine_with(loader: &ParkedLoader) -> Engine<HeadlessDevice> {
    Engine::new(
        HeadlessDevice::new(640, 480),
        Box::new(loader.clone()),
        &EngineConfig::default(),
    )
    .unwrap()
}

fn step(engine: &mut Engine<HeadlessDevice>, millis: u64) {
    let now = engine.last_frame() + Duration::from_millis(millis);
    engine.device_mut().take_commands();
    engine.frame(now, None);
}

#[test]
fn textured_plane_shows_placeholder_until_image_arrives() {
    let loader = ParkedLoader::default();
    let mut engine = engine_with(&loader);

    let plane = engine.create_object(ObjectKind::Plane);
    let texture = engine.create_and_load_texture("bricks.png");
    assert!(engine.scene_mut().get_mut(plane).unwrap().set_texture(Some(texture)));

    step(&mut engine, 16);
    let draw = engine.device().draws().next().unwrap().clone();
    assert!(draw.use_texture);
    assert_eq!(draw.texture, Some(texture));
    assert_eq!(engine.device().texture_size(texture), Some((1, 1)));
    assert_eq!(engine.device().texture_pixels(texture), Some(&PLACEHOLDER_PIXEL[..]));
    assert_eq!(engine.texture_info(texture).unwrap().state, TextureState::Pending);

    let finished = loader.finish_all(DecodedImage {
        width: 4,
        height: 2,
        pixels: vec![200; 4 * 2 * 4],
    });
    assert_eq!(finished, vec!["bricks.png".to_string()]);

    // The decoded image is uploaded at the start of the next frame.
    step(&mut engine, 16);
    assert_eq!(engine.device().texture_size(texture), Some((4, 2)));
    let info = engine.texture_info(texture).unwrap();
    assert_eq!((info.width, info.height, info.state), (4, 2, TextureState::Loaded));
    assert_eq!(engine.device().draws().next().unwrap().texture, Some(texture));
}

#[test]
fn scene_draws_follow_creation_order_across_removal() {
    let loader = ParkedLoader::default();
    let mut engine = engine_with(&loader);

    let grid = engine.create_object(ObjectKind::Grid);
    let plane = engine.create_object(ObjectKind::Plane);
    let mesh = engine.create_object(ObjectKind::Mesh);

    step(&mut engine, 16);
    let topologies: Vec<_> = engine.device().draws().map(|d| d.topology).collect();
    assert_eq!(
        topologies,
        vec![Topology::Lines, Topology::Triangles, Topology::Triangles]
    );
    assert_eq!(engine.device().draws().map(|d| d.count).collect::<Vec<_>>(), vec![204, 6, 36]);

    let buffers = engine.device().buffer_count();
    assert_eq!(engine.remove_object(plane), Some(ObjectKind::Plane));
    assert_eq!(engine.device().buffer_count(), buffers - 3);
    step(&mut engine, 16);
    assert_eq!(engine.device().draws().map(|d| d.count).collect::<Vec<_>>(), vec![204, 36]);
    assert_eq!(engine.scene().ids().collect::<Vec<_>>(), vec![grid, mesh]);
}

#[test]
fn moved_object_draws_with_camera_relative_matrix() {
    let loader = ParkedLoader::default();
    let mut engine = engine_with(&loader);
    engine.camera_mut().set_position(Vec3::new(0.0, 0.0, 5.0));

    let mesh = engine.create_object(ObjectKind::Mesh);
    let object = engine.scene_mut().get_mut(mesh).unwrap();
    object.set_color(Vec4::new(0.2, 0.4, 0.6, 1.0));
    object.transform_mut().set_position(Vec3::new(1.0, 0.0, 0.0));

    step(&mut engine, 16);
    let draw = engine.device().draws().next().unwrap().clone();
    let origin = draw.world_view.transform_point3(Vec3::ZERO);
    assert!(origin.abs_diff_eq(Vec3::new(1.0, 0.0, -5.0), 1e-5), "{origin:?}");
    assert_eq!(draw.color, Vec4::new(0.2, 0.4, 0.6, 1.0));
    assert!(!draw.use_texture);
}
