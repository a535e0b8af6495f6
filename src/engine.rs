// Engine: owns the scene, camera and device and runs one frame at a time

use std::time::Instant;

use glam::Vec4;

use crate::{
    camera::{Camera, CameraConfig, Fog},
    device::{GraphicsDevice, TextureHandle},
    error::EngineError,
    input::InputState,
    objects::{ObjectKind, RenderContext},
    scene::{ObjectId, Scene},
    texture::{AssetLoader, TextureCache, TextureInfo},
};

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub clear_color: Vec4,
    /// View depth where fog starts.
    pub fog_near: f32,
    /// View depth where fog fully covers geometry.
    pub fog_far: f32,
    pub camera: CameraConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "tin-3d".to_string(),
            width: 800,
            height: 600,
            clear_color: Vec4::new(0.07, 0.07, 0.27, 1.0),
            fog_near: 1.0,
            fog_far: 50.0,
            camera: CameraConfig::default(),
        }
    }
}

/// Callback run once per frame after the scene was drawn. Changes it makes
/// show up in the next frame.
pub type TickFn<'a, D> = dyn FnMut(&mut Engine<D>, f32) + 'a;

pub struct Engine<D: GraphicsDevice> {
    device: D,
    scene: Scene,
    camera: Camera,
    input: InputState,
    textures: TextureCache,
    loader: Box<dyn AssetLoader>,
    clear_color: Vec4,
    fog_near: f32,
    fog_far: f32,
    last_frame: Instant,
    delta_time: f32,
    frame_count: u64,
}

impl<D: GraphicsDevice> Engine<D> {
    pub fn new(mut device: D, loader: Box<dyn AssetLoader>, config: &EngineConfig) -> Result<Self, EngineError> {
        let (width, height) = device.viewport_size();
        if width == 0 || height == 0 {
            return Err(EngineError::ZeroViewport { width, height });
        }

        device.set_clear_color(config.clear_color);
        let camera = Camera::new(&config.camera, (width, height));
        log::info!("engine ready ({}x{})", width, height);

        Ok(Self {
            device,
            scene: Scene::new(),
            camera,
            input: InputState::new(),
            textures: TextureCache::new(),
            loader,
            clear_color: config.clear_color,
            fog_near: config.fog_near,
            fog_far: config.fog_far,
            last_frame: Instant::now(),
            delta_time: 0.0,
            frame_count: 0,
        })
    }

    /// Runs one iteration of the frame loop as of `now`.
    ///
    /// The delta time is not clamped: a stalled caller gets one large step.
    pub fn frame(&mut self, now: Instant, on_tick: Option<&mut TickFn<'_, D>>) {
        self.delta_time = now.saturating_duration_since(self.last_frame).as_secs_f32();
        let delta_time = self.delta_time;

        self.textures.pump(&mut self.device);

        self.device.set_clear_color(self.clear_color);
        self.device.clear(true, true);

        let fog = Fog {
            color: self.clear_color,
            near: self.fog_near,
            far: self.fog_far,
        };
        self.camera
            .render(delta_time, &mut self.input, &mut self.device, &fog);

        let mut ctx = RenderContext {
            device: &mut self.device,
            camera: &self.camera,
        };
        self.scene.render(delta_time, &mut ctx);

        if let Some(on_tick) = on_tick {
            on_tick(self, delta_time);
        }

        self.device.present();
        self.last_frame = now;
        self.frame_count += 1;
        log::trace!("frame {} took {:.4}s", self.frame_count, delta_time);
    }

    pub fn create_object(&mut self, kind: ObjectKind) -> ObjectId {
        self.scene.create_object(kind, &mut self.device)
    }

    pub fn create_object_by_tag(&mut self, tag: &str) -> Option<ObjectId> {
        self.scene.create_object_by_tag(tag, &mut self.device)
    }

    /// Removes the object and frees its buffers; `None` if it was already gone.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<ObjectKind> {
        self.scene.remove_object(id, &mut self.device)
    }

    /// Returns a texture that can be bound at once; it shows a 1×1 red
    /// placeholder until the image arrives.
    pub fn create_and_load_texture(&mut self, url: &str) -> TextureHandle {
        self.textures
            .request(url, &mut self.device, self.loader.as_ref())
    }

    pub fn texture_info(&self, texture: TextureHandle) -> Option<&TextureInfo> {
        self.textures.info(texture)
    }

    /// Zero sizes (minimized windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.device.resize(width, height);
        let viewport = self.device.viewport_size();
        let (fov, near, far) = (self.camera.fov(), self.camera.near(), self.camera.far());
        self.camera.create_perspective(fov, near, far, viewport);
    }

    pub fn clear_color(&self) -> Vec4 {
        self.clear_color
    }

    pub fn set_clear_color(&mut self, color: Vec4) {
        self.clear_color = color;
        self.device.set_clear_color(color);
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Seconds between the two most recent frames.
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    pub fn last_frame(&self) -> Instant {
        self.last_frame
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        device::{Uniform, UniformValue},
        headless::{Command, HeadlessDevice},
        texture::tests::ManualLoader,
    };
    use approx::assert_relative_eq;
    use glam::Vec3;
    use std::time::Duration;
    use winit::keyboard::KeyCode;

    fn engine() -> Engine<HeadlessDevice> {
        Engine::new(
            HeadlessDevice::new(800, 600),
            Box::new(ManualLoader::default()),
            &EngineConfig::default(),
        )
        .expect("engine")
    }

    #[test]
    fn zero_height_viewport_is_rejected() {
        let result = Engine::new(
            HeadlessDevice::new(800, 0),
            Box::new(ManualLoader::default()),
            &EngineConfig::default(),
        );
        assert!(matches!(
            result,
            Err(EngineError::ZeroViewport { width: 800, height: 0 })
        ));
    }

    #[test]
    fn delta_time_is_seconds_since_previous_frame() {
        let mut engine = engine();
        let start = engine.last_frame();

        engine.frame(start + Duration::from_millis(250), None);
        assert_relative_eq!(engine.delta_time(), 0.25, epsilon = 1e-6);

        engine.frame(start + Duration::from_secs(10), None);
        assert_relative_eq!(engine.delta_time(), 9.75, epsilon = 1e-5);
        assert_eq!(engine.frame_count(), 2);
    }

    #[test]
    fn frame_clears_then_camera_then_scene_then_presents() {
        let mut engine = engine();
        engine.create_object(ObjectKind::Grid);
        engine.device_mut().take_commands();

        let start = engine.last_frame();
        engine.frame(start + Duration::from_millis(16), None);

        let commands = engine.device_mut().take_commands();
        let position = |predicate: &dyn Fn(&Command) -> bool| {
            commands.iter().position(|command| predicate(command)).expect("command issued")
        };
        let clear = position(&|c| matches!(c, Command::Clear { color: true, depth: true }));
        let projection = position(&|c| matches!(c, Command::SetUniform(Uniform::Projection, _)));
        let draw = position(&|c| matches!(c, Command::Draw(_)));
        let present = position(&|c| matches!(c, Command::Present));

        assert!(clear < projection);
        assert!(projection < draw);
        assert!(draw < present);
        assert_eq!(present, commands.len() - 1);
    }

    #[test]
    fn tick_runs_after_render_and_shows_next_frame() {
        let mut engine = engine();
        let id = engine.create_object(ObjectKind::Mesh);
        let start = engine.last_frame();

        let mut ticks = Vec::new();
        let mut on_tick = |engine: &mut Engine<HeadlessDevice>, dt: f32| {
            ticks.push(dt);
            if let Some(object) = engine.scene_mut().get_mut(id) {
                object.set_color(Vec4::new(0.0, 1.0, 0.0, 1.0));
            }
        };

        engine.device_mut().take_commands();
        engine.frame(start + Duration::from_millis(100), Some(&mut on_tick));
        let first: Vec<_> = engine.device().draws().map(|d| d.color).collect();
        assert_eq!(first, vec![Vec4::ONE]);

        engine.device_mut().take_commands();
        engine.frame(start + Duration::from_millis(200), Some(&mut on_tick));
        let second: Vec<_> = engine.device().draws().map(|d| d.color).collect();
        assert_eq!(second, vec![Vec4::new(0.0, 1.0, 0.0, 1.0)]);

        assert_eq!(ticks.len(), 2);
        assert_relative_eq!(ticks[0], 0.1, epsilon = 1e-6);
    }

    #[test]
    fn held_key_moves_camera_during_frame() {
        let mut engine = engine();
        engine.input_mut().press(KeyCode::KeyW);
        let start = engine.last_frame();

        engine.frame(start + Duration::from_millis(100), None);

        let position = engine.camera().position();
        assert!(position.abs_diff_eq(Vec3::new(0.0, 0.0, -3.0), 1e-4), "{position:?}");
    }

    #[test]
    fn clear_color_accessors_and_fog_color() {
        let mut engine = engine();
        assert_eq!(engine.clear_color(), Vec4::new(0.07, 0.07, 0.27, 1.0));

        let sky = Vec4::new(0.5, 0.6, 0.7, 1.0);
        engine.set_clear_color(sky);
        assert_eq!(engine.clear_color(), sky);

        let start = engine.last_frame();
        engine.frame(start + Duration::from_millis(16), None);
        assert_eq!(
            engine.device().uniform(Uniform::FogColor),
            Some(UniformValue::Vec4(sky))
        );
        assert!(engine
            .device()
            .commands()
            .contains(&Command::SetClearColor(sky)));
    }

    #[test]
    fn resize_updates_projection_aspect() {
        let mut engine = engine();
        let fov = engine.camera().fov();

        engine.resize(1000, 500);
        let expected = glam::Mat4::perspective_rh(fov, 2.0, engine.camera().near(), engine.camera().far());
        assert_eq!(engine.camera().projection(), expected);

        engine.resize(0, 0);
        assert_eq!(engine.device().viewport_size(), (1000, 500));
    }

    #[test]
    fn unknown_tag_leaves_scene_empty() {
        let mut engine = engine();
        assert!(engine.create_object_by_tag("camera").is_none());
        assert!(engine.scene().is_empty());
    }
}
