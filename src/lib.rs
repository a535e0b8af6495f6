//! tin-3d: a small real-time 3D scene runtime.
//!
//! An [`Engine`] owns a [`Scene`] of planes, grids and meshes, a first-person
//! [`Camera`] and a [`GraphicsDevice`]. Each call to [`Engine::frame`] pumps
//! finished texture loads, clears the target, updates the camera, draws every
//! object in insertion order, runs the user tick and presents.
//!
//! [`WgpuDevice`] draws to a winit window; [`HeadlessDevice`] records the
//! same calls for tests and offscreen runs.

pub mod app;
pub mod camera;
pub mod device;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod headless;
pub mod input;
pub mod math;
pub mod objects;
pub mod renderer;
pub mod scene;
pub mod texture;

pub use camera::{Camera, CameraConfig, Fog};
pub use device::{BufferHandle, GraphicsDevice, TextureHandle};
pub use engine::{Engine, EngineConfig, TickFn};
pub use error::{AssetError, EngineError, UnknownObjectKind};
pub use headless::HeadlessDevice;
pub use input::{InputSource, InputState};
pub use math::Transform;
pub use objects::{Grid, Mesh, ObjectKind, Plane, Renderable, SceneObject};
pub use renderer::WgpuDevice;
pub use scene::{ObjectId, Scene};
pub use texture::{AssetLoader, DecodedImage, FileImageLoader, TextureCache, TextureInfo, TextureState};
