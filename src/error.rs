// Error types

use thiserror::Error;

/// Failures that prevent the engine from starting.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("viewport has zero size ({width}x{height})")]
    ZeroViewport { width: u32, height: u32 },

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to create render surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable graphics adapter found")]
    AdapterUnavailable,

    #[error("failed to request graphics device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("shader program failed to build: {0}")]
    Shader(String),
}

/// Failures while loading an image for a texture.
///
/// These are recoverable: the texture keeps its placeholder.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read {url}: {source}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: image::ImageError,
    },

    #[error("{url}: expected {expected} bytes of RGBA8 pixels, got {actual}")]
    Malformed {
        url: String,
        expected: usize,
        actual: usize,
    },

    #[error("{url}: {width}x{height} exceeds the device texture limit of {max}")]
    TooLarge {
        url: String,
        width: u32,
        height: u32,
        max: u32,
    },
}

/// Textual object tag that names no known object kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown object kind `{0}`")]
pub struct UnknownObjectKind(pub String);
