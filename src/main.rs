// tin-3d demo: grid floor, textured plane and a spinning cube

use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use clap::Parser;
use glam::{Mat4, Vec3, Vec4};
use winit::event_loop::EventLoop;

use tin_3d::{
    app, AssetLoader, Engine, EngineConfig, FileImageLoader, GraphicsDevice, HeadlessDevice, ObjectId,
    ObjectKind, Renderable, WgpuDevice,
};

#[derive(Parser, Debug)]
#[command(name = "tin-3d", about = "Minimal real-time 3D scene runtime")]
struct Args {
    /// Window width in pixels
    #[arg(long, default_value_t = 800)]
    width: u32,

    /// Window height in pixels
    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Window title
    #[arg(long, default_value = "tin-3d")]
    title: String,

    /// Image to put on the plane, relative to the asset root
    #[arg(long)]
    texture: Option<String>,

    /// Directory textures are loaded from
    #[arg(long, default_value = ".")]
    asset_root: PathBuf,

    /// Render this many frames without a window and exit
    #[arg(long)]
    headless_frames: Option<u32>,
}

fn build_demo<D: GraphicsDevice>(engine: &mut Engine<D>, texture: Option<&str>) -> anyhow::Result<ObjectId> {
    engine.create_object(ObjectKind::Grid);

    let plane = engine.create_object(ObjectKind::Plane);
    let texture = texture.map(|url| engine.create_and_load_texture(url));
    let object = engine
        .scene_mut()
        .get_mut(plane)
        .context("plane missing from scene")?;
    object.set_texture(texture);
    let transform = object.transform_mut();
    transform.set_position(Vec3::new(0.0, 0.0, -10.0));
    transform.set_scale(Vec3::splat(4.0));

    let cube = engine.create_object(ObjectKind::Mesh);
    let object = engine
        .scene_mut()
        .get_mut(cube)
        .context("cube missing from scene")?;
    object.set_color(Vec4::new(0.9, 0.6, 0.1, 1.0));
    object.transform_mut().set_position(Vec3::new(3.0, 1.0, -6.0));

    engine.camera_mut().set_position(Vec3::new(0.0, 2.0, 5.0));
    Ok(cube)
}

fn spin<D: GraphicsDevice>(cube: ObjectId) -> impl FnMut(&mut Engine<D>, f32) {
    let mut angle = 0.0_f32;
    move |engine: &mut Engine<D>, delta_time: f32| {
        angle += delta_time;
        if let Some(object) = engine.scene_mut().get_mut(cube) {
            object
                .transform_mut()
                .set_rotation(Mat4::from_rotation_y(angle) * Mat4::from_rotation_x(angle * 0.5));
        }
    }
}

fn run_headless(config: &EngineConfig, loader: Box<dyn AssetLoader>, args: &Args, frames: u32) -> anyhow::Result<()> {
    let device = HeadlessDevice::new(config.width, config.height);
    let mut engine = Engine::new(device, loader, config)?;
    let cube = build_demo(&mut engine, args.texture.as_deref())?;
    let mut tick = spin::<HeadlessDevice>(cube);

    let mut now = engine.last_frame();
    for _ in 0..frames {
        now += Duration::from_millis(16);
        engine.device_mut().take_commands();
        engine.frame(now, Some(&mut tick));
        log::info!(
            "frame {}: {} draws, dt {:.3}s",
            engine.frame_count(),
            engine.device().draws().count(),
            engine.delta_time()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = EngineConfig {
        title: args.title.clone(),
        width: args.width,
        height: args.height,
        ..EngineConfig::default()
    };
    let loader = Box::new(FileImageLoader::new(&args.asset_root));

    if let Some(frames) = args.headless_frames {
        return run_headless(&config, loader, &args, frames);
    }

    // Create event loop
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    let window = app::create_window(&event_loop, &config)?;
    let device = WgpuDevice::new(window).await?;

    let mut engine = Engine::new(device, loader, &config)?;
    let cube = build_demo(&mut engine, args.texture.as_deref())?;

    // Run the engine
    engine.run(event_loop, spin::<WgpuDevice>(cube))?;
    Ok(())
}
