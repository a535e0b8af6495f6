// Headless device that records every call instead of talking to a GPU

use std::collections::HashMap;

use glam::{Mat4, Vec4};

use crate::device::{
    BufferHandle, GraphicsDevice, TextureHandle, Topology, Uniform, UniformValue, VertexSlot,
};

/// State captured at the moment of a `draw_indexed` call.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub topology: Topology,
    pub count: u32,
    pub position_buffer: Option<BufferHandle>,
    pub tex_coord_buffer: Option<BufferHandle>,
    pub index_buffer: Option<BufferHandle>,
    pub world_view: Mat4,
    pub color: Vec4,
    pub use_texture: bool,
    pub texture: Option<TextureHandle>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetClearColor(Vec4),
    Clear { color: bool, depth: bool },
    SetUniform(Uniform, UniformValue),
    ActivateTexture { texture: TextureHandle, slot: u32 },
    UploadTexture { texture: TextureHandle, width: u32, height: u32 },
    Draw(DrawRecord),
    Present,
}

#[derive(Debug, Clone)]
enum BufferData {
    Vertex(Vec<f32>),
    Index(Vec<u16>),
}

#[derive(Debug, Clone)]
struct TextureData {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

/// A [`GraphicsDevice`] without a GPU.
///
/// Keeps buffer and texture contents in memory and appends one [`Command`]
/// per state-changing call, so frames can be inspected after the fact.
#[derive(Debug)]
pub struct HeadlessDevice {
    width: u32,
    height: u32,
    buffers: Vec<Option<BufferData>>,
    free_buffers: Vec<BufferHandle>,
    textures: Vec<TextureData>,
    uniforms: HashMap<Uniform, UniformValue>,
    position: Option<BufferHandle>,
    tex_coord: Option<BufferHandle>,
    index: Option<BufferHandle>,
    active_texture: Option<TextureHandle>,
    commands: Vec<Command>,
    frames_presented: usize,
    max_texture_size: u32,
}

impl HeadlessDevice {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            buffers: Vec::new(),
            free_buffers: Vec::new(),
            textures: Vec::new(),
            uniforms: HashMap::new(),
            position: None,
            tex_coord: None,
            index: None,
            active_texture: None,
            commands: Vec::new(),
            frames_presented: 0,
            max_texture_size: 8192,
        }
    }

    /// Lower the texture size limit, e.g. to exercise oversized images.
    pub fn with_max_texture_size(mut self, max_texture_size: u32) -> Self {
        self.max_texture_size = max_texture_size;
        self
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    pub fn draws(&self) -> impl Iterator<Item = &DrawRecord> {
        self.commands.iter().filter_map(|command| match command {
            Command::Draw(draw) => Some(draw),
            _ => None,
        })
    }

    pub fn frames_presented(&self) -> usize {
        self.frames_presented
    }

    pub fn uniform(&self, uniform: Uniform) -> Option<UniformValue> {
        self.uniforms.get(&uniform).copied()
    }

    /// Buffers created and not yet destroyed.
    pub fn buffer_count(&self) -> usize {
        self.buffers.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn texture_size(&self, texture: TextureHandle) -> Option<(u32, u32)> {
        self.textures
            .get(texture.index())
            .map(|data| (data.width, data.height))
    }

    pub fn texture_pixels(&self, texture: TextureHandle) -> Option<&[u8]> {
        self.textures
            .get(texture.index())
            .map(|data| data.pixels.as_slice())
    }

    pub fn vertex_data(&self, buffer: BufferHandle) -> Option<&[f32]> {
        match self.buffers.get(buffer.index()) {
            Some(Some(BufferData::Vertex(data))) => Some(data),
            _ => None,
        }
    }

    pub fn index_data(&self, buffer: BufferHandle) -> Option<&[u16]> {
        match self.buffers.get(buffer.index()) {
            Some(Some(BufferData::Index(data))) => Some(data),
            _ => None,
        }
    }

    fn push_buffer(&mut self, data: BufferData) -> BufferHandle {
        if let Some(handle) = self.free_buffers.pop() {
            self.buffers[handle.index()] = Some(data);
            return handle;
        }
        self.buffers.push(Some(data));
        BufferHandle(self.buffers.len() as u32 - 1)
    }

    fn set_uniform(&mut self, uniform: Uniform, value: UniformValue) {
        self.uniforms.insert(uniform, value);
        self.commands.push(Command::SetUniform(uniform, value));
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn create_vertex_buffer(&mut self, _label: &str, data: &[f32]) -> BufferHandle {
        self.push_buffer(BufferData::Vertex(data.to_vec()))
    }

    fn create_index_buffer(&mut self, _label: &str, data: &[u16]) -> BufferHandle {
        self.push_buffer(BufferData::Index(data.to_vec()))
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        let Some(slot) = self
            .buffers
            .get_mut(buffer.index())
            .filter(|slot| slot.is_some())
        else {
            log::warn!("destroying unknown buffer {:?}", buffer);
            return;
        };
        *slot = None;
        self.free_buffers.push(buffer);
    }

    fn bind_vertex_buffer(&mut self, slot: VertexSlot, buffer: BufferHandle) {
        match slot {
            VertexSlot::Position => self.position = Some(buffer),
            VertexSlot::TexCoord => self.tex_coord = Some(buffer),
        }
    }

    fn bind_index_buffer(&mut self, buffer: BufferHandle) {
        self.index = Some(buffer);
    }

    fn set_uniform_mat4(&mut self, uniform: Uniform, value: Mat4) {
        self.set_uniform(uniform, UniformValue::Mat4(value));
    }

    fn set_uniform_vec4(&mut self, uniform: Uniform, value: Vec4) {
        self.set_uniform(uniform, UniformValue::Vec4(value));
    }

    fn set_uniform_int(&mut self, uniform: Uniform, value: i32) {
        self.set_uniform(uniform, UniformValue::Int(value));
    }

    fn set_uniform_float(&mut self, uniform: Uniform, value: f32) {
        self.set_uniform(uniform, UniformValue::Float(value));
    }

    fn draw_indexed(&mut self, topology: Topology, count: u32) {
        let world_view = match self.uniform(Uniform::WorldView) {
            Some(UniformValue::Mat4(matrix)) => matrix,
            _ => Mat4::IDENTITY,
        };
        let color = match self.uniform(Uniform::Color) {
            Some(UniformValue::Vec4(color)) => color,
            _ => Vec4::ONE,
        };
        let use_texture = matches!(self.uniform(Uniform::UseTexture), Some(UniformValue::Int(1)));
        let record = DrawRecord {
            topology,
            count,
            position_buffer: self.position,
            tex_coord_buffer: self.tex_coord,
            index_buffer: self.index,
            world_view,
            color,
            use_texture,
            texture: if use_texture { self.active_texture } else { None },
        };
        log::trace!("headless draw {:?} x{}", topology, count);
        self.commands.push(Command::Draw(record));
    }

    fn create_texture(&mut self, _label: &str) -> TextureHandle {
        self.textures.push(TextureData {
            width: 1,
            height: 1,
            pixels: vec![0; 4],
        });
        TextureHandle(self.textures.len() as u32 - 1)
    }

    fn upload_texture_image(&mut self, texture: TextureHandle, pixels: &[u8], width: u32, height: u32) {
        let Some(data) = self.textures.get_mut(texture.index()) else {
            log::warn!("upload to unknown texture {:?}", texture);
            return;
        };
        data.width = width;
        data.height = height;
        data.pixels = pixels.to_vec();
        self.commands.push(Command::UploadTexture {
            texture,
            width,
            height,
        });
    }

    fn activate_texture(&mut self, texture: TextureHandle, slot: u32) {
        self.active_texture = Some(texture);
        self.commands.push(Command::ActivateTexture { texture, slot });
    }

    fn max_texture_size(&self) -> u32 {
        self.max_texture_size
    }

    fn set_clear_color(&mut self, color: Vec4) {
        self.commands.push(Command::SetClearColor(color));
    }

    fn clear(&mut self, color: bool, depth: bool) {
        self.commands.push(Command::Clear { color, depth });
    }

    fn present(&mut self) {
        self.frames_presented += 1;
        self.commands.push(Command::Present);
    }

    fn viewport_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_snapshots_bound_state() {
        let mut device = HeadlessDevice::new(4, 4);
        let vertices = device.create_vertex_buffer("v", &[0.0; 9]);
        let indices = device.create_index_buffer("i", &[0, 1, 2]);
        device.bind_vertex_buffer(VertexSlot::Position, vertices);
        device.bind_index_buffer(indices);
        device.set_uniform_vec4(Uniform::Color, Vec4::new(1.0, 0.0, 0.0, 1.0));
        device.draw_indexed(Topology::Triangles, 3);

        let draw = device.draws().next().expect("one draw");
        assert_eq!(draw.count, 3);
        assert_eq!(draw.position_buffer, Some(vertices));
        assert_eq!(draw.index_buffer, Some(indices));
        assert_eq!(draw.color, Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert!(!draw.use_texture);
        assert_eq!(device.index_data(indices), Some(&[0u16, 1, 2][..]));
        assert_eq!(device.vertex_data(indices), None);
    }

    #[test]
    fn texture_upload_replaces_size_and_pixels() {
        let mut device = HeadlessDevice::new(4, 4);
        let texture = device.create_texture("t");
        assert_eq!(device.texture_size(texture), Some((1, 1)));

        device.upload_texture_image(texture, &[7; 2 * 3 * 4], 2, 3);
        assert_eq!(device.texture_size(texture), Some((2, 3)));
        assert_eq!(device.texture_pixels(texture).map(<[u8]>::len), Some(24));
    }

    #[test]
    fn destroyed_buffer_slot_is_reused() {
        let mut device = HeadlessDevice::new(4, 4);
        let first = device.create_vertex_buffer("a", &[1.0; 3]);
        let second = device.create_index_buffer("b", &[0]);
        assert_eq!(device.buffer_count(), 2);

        device.destroy_buffer(first);
        assert_eq!(device.buffer_count(), 1);
        assert_eq!(device.vertex_data(first), None);

        let third = device.create_vertex_buffer("c", &[2.0; 3]);
        assert_eq!(third, first);
        assert_eq!(device.vertex_data(third), Some(&[2.0; 3][..]));
        assert_eq!(device.index_data(second), Some(&[0u16][..]));
        assert_eq!(device.buffer_count(), 2);
    }
}
