// Asynchronous texture loading with placeholder fallback

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::mpsc::{self, Receiver, Sender},
};

use crate::{
    device::{GraphicsDevice, TextureHandle},
    error::AssetError,
};

/// Pixels shown until a texture's image has been decoded: opaque red.
pub const PLACEHOLDER_PIXEL: [u8; 4] = [255, 0, 0, 255];

/// Tightly packed RGBA8 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    pub fn from_bytes(url: &str, bytes: &[u8]) -> Result<Self, AssetError> {
        let image = image::load_from_memory(bytes).map_err(|source| AssetError::Decode {
            url: url.to_string(),
            source,
        })?;
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();

        Ok(Self {
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }

    fn validate(&self, url: &str) -> Result<(), AssetError> {
        let expected = self.width as usize * self.height as usize * 4;
        if expected == 0 || self.pixels.len() != expected {
            return Err(AssetError::Malformed {
                url: url.to_string(),
                expected,
                actual: self.pixels.len(),
            });
        }
        Ok(())
    }

    fn fit_within(&self, url: &str, max: u32) -> Result<(), AssetError> {
        if self.width > max || self.height > max {
            return Err(AssetError::TooLarge {
                url: url.to_string(),
                width: self.width,
                height: self.height,
                max,
            });
        }
        Ok(())
    }
}

pub type LoadCallback = Box<dyn FnOnce(Result<DecodedImage, AssetError>) + Send + 'static>;

/// Source of image data for textures.
///
/// `load_image` must return without blocking and call `done` exactly once,
/// from any thread, when the image is ready or has failed.
pub trait AssetLoader {
    fn load_image(&self, url: &str, done: LoadCallback);
}

/// Reads images from disk and decodes them on the tokio blocking pool.
#[derive(Debug, Clone)]
pub struct FileImageLoader {
    root: PathBuf,
    runtime: tokio::runtime::Handle,
}

impl FileImageLoader {
    /// Resolves relative urls against `root`. Must be called from within a
    /// tokio runtime.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_runtime(root, tokio::runtime::Handle::current())
    }

    pub fn with_runtime(root: impl Into<PathBuf>, runtime: tokio::runtime::Handle) -> Self {
        Self {
            root: root.into(),
            runtime,
        }
    }
}

impl AssetLoader for FileImageLoader {
    fn load_image(&self, url: &str, done: LoadCallback) {
        let path = self.root.join(url);
        let url = url.to_string();
        self.runtime.spawn_blocking(move || {
            let result = std::fs::read(&path)
                .map_err(|source| AssetError::Io {
                    url: url.clone(),
                    source,
                })
                .and_then(|bytes| DecodedImage::from_bytes(&url, &bytes));
            done(result);
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureState {
    /// Still showing the 1×1 placeholder; the load is in flight.
    Pending,
    Loaded,
    /// The load failed; the placeholder stays for good.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureInfo {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub state: TextureState,
}

struct Completion {
    texture: TextureHandle,
    result: Result<DecodedImage, AssetError>,
}

/// Every texture requested through the engine, alive until the engine drops.
pub struct TextureCache {
    entries: HashMap<TextureHandle, TextureInfo>,
    sender: Sender<Completion>,
    receiver: Receiver<Completion>,
}

impl TextureCache {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            entries: HashMap::new(),
            sender,
            receiver,
        }
    }

    /// Creates a texture backed by the placeholder and starts loading `url`.
    /// The handle is usable right away.
    pub fn request(
        &mut self,
        url: &str,
        device: &mut dyn GraphicsDevice,
        loader: &dyn AssetLoader,
    ) -> TextureHandle {
        let texture = device.create_texture(url);
        device.upload_texture_image(texture, &PLACEHOLDER_PIXEL, 1, 1);
        self.entries.insert(
            texture,
            TextureInfo {
                url: url.to_string(),
                width: 1,
                height: 1,
                state: TextureState::Pending,
            },
        );

        let sender = self.sender.clone();
        loader.load_image(
            url,
            Box::new(move |result| {
                // The receiver only goes away with the engine.
                let _ = sender.send(Completion { texture, result });
            }),
        );
        log::info!("loading texture {url} into {:?}", texture);
        texture
    }

    /// Uploads every image that finished since the last call. Returns how many
    /// completions were handled.
    pub fn pump(&mut self, device: &mut dyn GraphicsDevice) -> usize {
        let mut handled = 0;
        while let Ok(Completion { texture, result }) = self.receiver.try_recv() {
            handled += 1;
            let Some(info) = self.entries.get_mut(&texture) else {
                continue;
            };
            let max = device.max_texture_size();
            let checked = result.and_then(|image| {
                image.validate(&info.url)?;
                image.fit_within(&info.url, max)?;
                Ok(image)
            });
            match checked {
                Ok(image) => {
                    device.upload_texture_image(texture, &image.pixels, image.width, image.height);
                    info.width = image.width;
                    info.height = image.height;
                    info.state = TextureState::Loaded;
                    log::info!("texture {} loaded ({}x{})", info.url, image.width, image.height);
                }
                Err(err) => {
                    info.state = TextureState::Failed;
                    log::warn!("keeping placeholder for {}: {err}", info.url);
                }
            }
        }
        handled
    }

    pub fn info(&self, texture: TextureHandle) -> Option<&TextureInfo> {
        self.entries.get(&texture)
    }

    pub fn pending(&self) -> usize {
        self.entries
            .values()
            .filter(|info| info.state == TextureState::Pending)
            .count()
    }
}

impl Default for TextureCache {
    fn default() -> Self {
        Self::new()
    }
}
