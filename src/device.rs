// Graphics device abstraction used by the camera, scene objects and engine

use glam::{Mat4, Vec4};

/// Opaque reference to a GPU buffer owned by a [`GraphicsDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) u32);

impl BufferHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Opaque reference to a 2D texture owned by a [`GraphicsDevice`].
///
/// Handles are `Copy` so one texture can be shared by any number of objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub(crate) u32);

impl TextureHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    Triangles,
    Lines,
}

/// Vertex attribute a buffer is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexSlot {
    /// `vec3<f32>` positions.
    Position,
    /// `vec2<f32>` texture coordinates.
    TexCoord,
}

/// Uniforms understood by the default shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Uniform {
    WorldView,
    Projection,
    Color,
    UseTexture,
    FogColor,
    FogNear,
    FogFar,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Mat4(Mat4),
    Vec4(Vec4),
    Int(i32),
    Float(f32),
}

/// Capability surface the core needs from a rendering backend.
///
/// Calls are stateful in the immediate-mode style: bindings and uniforms stay
/// in effect until overwritten, and `draw_indexed` uses whatever is bound at
/// that moment. A frame starts with `clear` and ends with `present`.
pub trait GraphicsDevice {
    fn create_vertex_buffer(&mut self, label: &str, data: &[f32]) -> BufferHandle;
    fn create_index_buffer(&mut self, label: &str, data: &[u16]) -> BufferHandle;
    /// Release a buffer. The handle may be handed out again by a later
    /// `create_*_buffer` call, so it must not be bound afterwards.
    fn destroy_buffer(&mut self, buffer: BufferHandle);

    fn bind_vertex_buffer(&mut self, slot: VertexSlot, buffer: BufferHandle);
    fn bind_index_buffer(&mut self, buffer: BufferHandle);

    fn set_uniform_mat4(&mut self, uniform: Uniform, value: Mat4);
    fn set_uniform_vec4(&mut self, uniform: Uniform, value: Vec4);
    fn set_uniform_int(&mut self, uniform: Uniform, value: i32);
    fn set_uniform_float(&mut self, uniform: Uniform, value: f32);

    /// Draw `count` indices from the bound index buffer.
    fn draw_indexed(&mut self, topology: Topology, count: u32);

    /// Allocate an empty 1×1 texture; fill it with `upload_texture_image`.
    fn create_texture(&mut self, label: &str) -> TextureHandle;
    /// Replace the texture's contents with tightly packed RGBA8 `pixels`.
    fn upload_texture_image(&mut self, texture: TextureHandle, pixels: &[u8], width: u32, height: u32);
    fn activate_texture(&mut self, texture: TextureHandle, slot: u32);
    /// Largest width or height `upload_texture_image` accepts.
    fn max_texture_size(&self) -> u32;

    fn set_clear_color(&mut self, color: Vec4);
    fn clear(&mut self, color: bool, depth: bool);
    /// Submit everything recorded since the last `clear`.
    fn present(&mut self);

    /// Current drawable size in pixels.
    fn viewport_size(&self) -> (u32, u32);
    fn resize(&mut self, width: u32, height: u32);
}
