// Renderable scene object variants

use std::str::FromStr;

use glam::Vec4;

use crate::{
    camera::Camera,
    device::{BufferHandle, GraphicsDevice, TextureHandle, Topology, Uniform, VertexSlot},
    error::UnknownObjectKind,
    geometry::Geometry,
    math::Transform,
};

/// Everything an object may read while drawing itself.
pub struct RenderContext<'a> {
    pub device: &'a mut dyn GraphicsDevice,
    pub camera: &'a Camera,
}

pub trait Renderable {
    fn render(&mut self, delta_time: f32, ctx: &mut RenderContext<'_>);
    fn transform(&self) -> &Transform;
    fn transform_mut(&mut self) -> &mut Transform;
}

/// Which variant `Scene::create_object` should build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Plane,
    Grid,
    Mesh,
}

impl FromStr for ObjectKind {
    type Err = UnknownObjectKind;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "plane" => Ok(ObjectKind::Plane),
            "grid" => Ok(ObjectKind::Grid),
            "mesh" => Ok(ObjectKind::Mesh),
            other => Err(UnknownObjectKind(other.to_string())),
        }
    }
}

/// Buffers of one uploaded [`Geometry`].
#[derive(Debug)]
pub struct GpuGeometry {
    pub vertices: BufferHandle,
    pub tex_coords: Option<BufferHandle>,
    pub indices: BufferHandle,
    pub index_count: u32,
    pub topology: Topology,
}

impl GpuGeometry {
    pub fn upload(device: &mut dyn GraphicsDevice, label: &str, geometry: &Geometry) -> Self {
        let vertices = device.create_vertex_buffer(&format!("{label} Vertex Buffer"), &geometry.positions);
        let tex_coords = geometry
            .tex_coords
            .as_ref()
            .map(|uv| device.create_vertex_buffer(&format!("{label} UV Buffer"), uv));
        let indices = device.create_index_buffer(&format!("{label} Index Buffer"), &geometry.indices);

        Self {
            vertices,
            tex_coords,
            indices,
            index_count: geometry.index_count(),
            topology: geometry.topology,
        }
    }

    /// Frees every buffer created by `upload`.
    pub fn release(self, device: &mut dyn GraphicsDevice) {
        device.destroy_buffer(self.vertices);
        if let Some(uv) = self.tex_coords {
            device.destroy_buffer(uv);
        }
        device.destroy_buffer(self.indices);
    }

    fn bind(&self, device: &mut dyn GraphicsDevice) {
        device.bind_vertex_buffer(VertexSlot::Position, self.vertices);
        if let Some(uv) = self.tex_coords {
            device.bind_vertex_buffer(VertexSlot::TexCoord, uv);
        }
        device.bind_index_buffer(self.indices);
    }

    fn draw(&self, device: &mut dyn GraphicsDevice) {
        device.draw_indexed(self.topology, self.index_count);
    }
}

/// Flat color, optionally replaced by a shared texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Appearance {
    pub color: Vec4,
    pub texture: Option<TextureHandle>,
}

impl Appearance {
    fn apply(&self, device: &mut dyn GraphicsDevice) {
        device.set_uniform_vec4(Uniform::Color, self.color);
        match self.texture {
            Some(texture) => {
                device.set_uniform_int(Uniform::UseTexture, 1);
                device.activate_texture(texture, 0);
            }
            None => device.set_uniform_int(Uniform::UseTexture, 0),
        }
    }
}

fn draw_with(
    transform: &Transform,
    geometry: &GpuGeometry,
    appearance: &Appearance,
    ctx: &mut RenderContext<'_>,
) {
    geometry.bind(ctx.device);
    ctx.device
        .set_uniform_mat4(Uniform::WorldView, ctx.camera.view() * transform.matrix());
    appearance.apply(ctx.device);
    geometry.draw(ctx.device);
}

/// Textured 2×2 quad on the XZ plane.
#[derive(Debug)]
pub struct Plane {
    transform: Transform,
    geometry: GpuGeometry,
    appearance: Appearance,
}

impl Plane {
    pub fn new(device: &mut dyn GraphicsDevice) -> Self {
        Self {
            transform: Transform::default(),
            geometry: GpuGeometry::upload(device, "Plane", &Geometry::plane()),
            appearance: Appearance {
                color: Vec4::new(1.0, 0.0, 1.0, 1.0),
                texture: None,
            },
        }
    }

    pub fn color(&self) -> Vec4 {
        self.appearance.color
    }

    pub fn set_color(&mut self, color: Vec4) {
        self.appearance.color = color;
    }

    pub fn texture(&self) -> Option<TextureHandle> {
        self.appearance.texture
    }

    pub fn set_texture(&mut self, texture: Option<TextureHandle>) {
        self.appearance.texture = texture;
    }

    pub fn geometry(&self) -> &GpuGeometry {
        &self.geometry
    }
}

impl Renderable for Plane {
    fn render(&mut self, _delta_time: f32, ctx: &mut RenderContext<'_>) {
        draw_with(&self.transform, &self.geometry, &self.appearance, ctx);
    }

    fn transform(&self) -> &Transform {
        &self.transform
    }

    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }
}

/// Line grid used as a floor reference. Always drawn with its flat color.
#[derive(Debug)]
pub struct Grid {
    transform: Transform,
    geometry: GpuGeometry,
    color: Vec4,
}

impl Grid {
    pub const SLICES: u16 = 50;

    pub fn new(device: &mut dyn GraphicsDevice) -> Self {
        Self {
            transform: Transform::default(),
            geometry: GpuGeometry::upload(device, "Grid", &Geometry::grid(Self::SLICES)),
            color: Vec4::ONE,
        }
    }

    pub fn color(&self) -> Vec4 {
        self.color
    }

    pub fn set_color(&mut self, color: Vec4) {
        self.color = color;
    }

    pub fn geometry(&self) -> &GpuGeometry {
        &self.geometry
    }
}

impl Renderable for Grid {
    fn render(&mut self, _delta_time: f32, ctx: &mut RenderContext<'_>) {
        let appearance = Appearance {
            color: self.color,
            texture: None,
        };
        draw_with(&self.transform, &self.geometry, &appearance, ctx);
    }

    fn transform(&self) -> &Transform {
        &self.transform
    }

    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }
}

/// Indexed triangle mesh; a unit cube unless built from custom geometry.
#[derive(Debug)]
pub struct Mesh {
    transform: Transform,
    geometry: GpuGeometry,
    appearance: Appearance,
}

impl Mesh {
    pub fn new(device: &mut dyn GraphicsDevice) -> Self {
        Self::from_geometry(device, &Geometry::cube())
    }

    pub fn from_geometry(device: &mut dyn GraphicsDevice, geometry: &Geometry) -> Self {
        Self {
            transform: Transform::default(),
            geometry: GpuGeometry::upload(device, "Mesh", geometry),
            appearance: Appearance {
                color: Vec4::ONE,
                texture: None,
            },
        }
    }

    pub fn color(&self) -> Vec4 {
        self.appearance.color
    }

    pub fn set_color(&mut self, color: Vec4) {
        self.appearance.color = color;
    }

    pub fn texture(&self) -> Option<TextureHandle> {
        self.appearance.texture
    }

    /// Ignored for geometry without texture coordinates.
    pub fn set_texture(&mut self, texture: Option<TextureHandle>) {
        if texture.is_some() && self.geometry.tex_coords.is_none() {
            log::warn!("mesh has no texture coordinates, keeping flat color");
            return;
        }
        self.appearance.texture = texture;
    }

    pub fn geometry(&self) -> &GpuGeometry {
        &self.geometry
    }
}

impl Renderable for Mesh {
    fn render(&mut self, _delta_time: f32, ctx: &mut RenderContext<'_>) {
        draw_with(&self.transform, &self.geometry, &self.appearance, ctx);
    }

    fn transform(&self) -> &Transform {
        &self.transform
    }

    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }
}

/// Closed set of objects a scene can hold.
#[derive(Debug)]
pub enum SceneObject {
    Plane(Plane),
    Grid(Grid),
    Mesh(Mesh),
}

impl SceneObject {
    pub fn new(kind: ObjectKind, device: &mut dyn GraphicsDevice) -> Self {
        match kind {
            ObjectKind::Plane => SceneObject::Plane(Plane::new(device)),
            ObjectKind::Grid => SceneObject::Grid(Grid::new(device)),
            ObjectKind::Mesh => SceneObject::Mesh(Mesh::new(device)),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            SceneObject::Plane(_) => ObjectKind::Plane,
            SceneObject::Grid(_) => ObjectKind::Grid,
            SceneObject::Mesh(_) => ObjectKind::Mesh,
        }
    }

    pub fn set_color(&mut self, color: Vec4) {
        match self {
            SceneObject::Plane(plane) => plane.set_color(color),
            SceneObject::Grid(grid) => grid.set_color(color),
            SceneObject::Mesh(mesh) => mesh.set_color(color),
        }
    }

    /// Drops the object and frees its buffers on `device`.
    pub fn release(self, device: &mut dyn GraphicsDevice) {
        let geometry = match self {
            SceneObject::Plane(plane) => plane.geometry,
            SceneObject::Grid(grid) => grid.geometry,
            SceneObject::Mesh(mesh) => mesh.geometry,
        };
        geometry.release(device);
    }

    /// Returns `false` for variants that cannot be textured.
    pub fn set_texture(&mut self, texture: Option<TextureHandle>) -> bool {
        match self {
            SceneObject::Plane(plane) => {
                plane.set_texture(texture);
                true
            }
            SceneObject::Mesh(mesh) => {
                mesh.set_texture(texture);
                mesh.texture() == texture
            }
            SceneObject::Grid(_) => false,
        }
    }

    pub fn as_plane_mut(&mut self) -> Option<&mut Plane> {
        match self {
            SceneObject::Plane(plane) => Some(plane),
            _ => None,
        }
    }

    pub fn as_grid_mut(&mut self) -> Option<&mut Grid> {
        match self {
            SceneObject::Grid(grid) => Some(grid),
            _ => None,
        }
    }

    pub fn as_mesh_mut(&mut self) -> Option<&mut Mesh> {
        match self {
            SceneObject::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    fn as_renderable(&self) -> &dyn Renderable {
        match self {
            SceneObject::Plane(plane) => plane,
            SceneObject::Grid(grid) => grid,
            SceneObject::Mesh(mesh) => mesh,
        }
    }

    fn as_renderable_mut(&mut self) -> &mut dyn Renderable {
        match self {
            SceneObject::Plane(plane) => plane,
            SceneObject::Grid(grid) => grid,
            SceneObject::Mesh(mesh) => mesh,
        }
    }
}

impl Renderable for SceneObject {
    fn render(&mut self, delta_time: f32, ctx: &mut RenderContext<'_>) {
        self.as_renderable_mut().render(delta_time, ctx);
    }

    fn transform(&self) -> &Transform {
        self.as_renderable().transform()
    }

    fn transform_mut(&mut self) -> &mut Transform {
        self.as_renderable_mut().transform_mut()
    }
}
