// Renderer module: wgpu implementation of the graphics device

use std::{mem, num::NonZeroU64, sync::Arc};

use glam::{Mat4, Vec4};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    device::{BufferHandle, GraphicsDevice, TextureHandle, Topology, Uniform, VertexSlot},
    error::EngineError,
};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
// u16 indices can address at most this many vertices.
const MAX_VERTICES: u64 = u16::MAX as u64 + 1;

// Uniform block for a single draw; matches `DrawUniforms` in shader.wgsl.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct DrawUniforms {
    world_view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    color: [f32; 4],
    fog_color: [f32; 4],
    fog_near: f32,
    fog_far: f32,
    use_texture: i32,
    _padding: f32,
}

impl DrawUniforms {
    fn new() -> Self {
        Self {
            world_view: Mat4::IDENTITY.to_cols_array_2d(),
            projection: Mat4::IDENTITY.to_cols_array_2d(),
            color: Vec4::ONE.to_array(),
            fog_color: Vec4::ZERO.to_array(),
            fog_near: 1.0,
            fog_far: 50.0,
            use_texture: 0,
            _padding: 0.0,
        }
    }
}

struct GpuTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
    mip_level_count: u32,
}

struct DrawCall {
    topology: Topology,
    positions: BufferHandle,
    tex_coords: Option<BufferHandle>,
    indices: BufferHandle,
    count: u32,
    uniform_offset: u32,
    texture: Option<TextureHandle>,
}

/// [`GraphicsDevice`] backed by a wgpu surface on a winit window.
///
/// Calls between `clear` and `present` are recorded; `present` encodes them
/// into a single render pass, giving each draw its own slice of a dynamic
/// uniform buffer.
pub struct WgpuDevice {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    triangle_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    repeat_sampler: wgpu::Sampler,
    clamp_sampler: wgpu::Sampler,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniform_stride: u64,
    uniform_capacity: u64,
    depth_view: wgpu::TextureView,
    fallback_tex_coords: wgpu::Buffer,
    fallback_texture: GpuTexture,
    buffers: Vec<Option<wgpu::Buffer>>,
    free_buffers: Vec<BufferHandle>,
    // Destroyed this frame; reusable once the frame's draws are gone.
    retired_buffers: Vec<BufferHandle>,
    textures: Vec<GpuTexture>,
    current: DrawUniforms,
    bound_positions: Option<BufferHandle>,
    bound_tex_coords: Option<BufferHandle>,
    bound_indices: Option<BufferHandle>,
    active_texture: Option<TextureHandle>,
    clear_color: wgpu::Color,
    clear_color_buffer: bool,
    clear_depth_buffer: bool,
    staged_uniforms: Vec<u8>,
    draws: Vec<DrawCall>,
}

impl WgpuDevice {
    pub async fn new(window: Arc<Window>) -> Result<Self, EngineError> {
        // Initialize wgpu
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        // Get surface from window
        let surface = instance.create_surface(window.clone())?;

        // Request adapter
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(EngineError::AdapterUnavailable)?;
        log::info!("using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Renderer Device"),
                    required_features: wgpu::Features::default(),
                    required_limits: wgpu::Limits::default(),
                },
                None, // Trace path
            )
            .await?;

        // Get surface capabilities
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        // Configure surface
        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let uniform_size = mem::size_of::<DrawUniforms>() as u64;
        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let uniform_stride = uniform_size.div_ceil(alignment) * alignment;

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Uniform Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(uniform_size),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Texture Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        // Shader and pipeline problems only surface through the error scope.
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });
        let triangle_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader_module,
            surface_format,
            wgpu::PrimitiveTopology::TriangleList,
        );
        let line_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader_module,
            surface_format,
            wgpu::PrimitiveTopology::LineList,
        );
        if let Some(err) = device.pop_error_scope().await {
            return Err(EngineError::Shader(err.to_string()));
        }
        log::info!("default shader program ready");

        let repeat_sampler = create_sampler(&device, wgpu::AddressMode::Repeat);
        let clamp_sampler = create_sampler(&device, wgpu::AddressMode::ClampToEdge);

        let uniform_capacity = 64;
        let (uniform_buffer, uniform_bind_group) =
            create_uniform_buffer(&device, &uniform_layout, uniform_stride, uniform_capacity);

        let fallback_tex_coords = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Fallback UV Buffer"),
            size: MAX_VERTICES * mem::size_of::<[f32; 2]>() as u64,
            usage: wgpu::BufferUsages::VERTEX,
            mapped_at_creation: false,
        });
        let fallback_texture = create_gpu_texture(
            &device,
            &texture_layout,
            &repeat_sampler,
            (1, 1),
            1,
            "Fallback Texture",
        );
        write_texture_level(&queue, &fallback_texture, 0, (1, 1), &[255; 4]);

        let depth_view = create_depth_view(&device, &config);

        Ok(Self {
            window,
            surface,
            adapter,
            device,
            queue,
            config,
            triangle_pipeline,
            line_pipeline,
            uniform_layout,
            texture_layout,
            repeat_sampler,
            clamp_sampler,
            uniform_buffer,
            uniform_bind_group,
            uniform_stride,
            uniform_capacity,
            depth_view,
            fallback_tex_coords,
            fallback_texture,
            buffers: Vec::new(),
            free_buffers: Vec::new(),
            retired_buffers: Vec::new(),
            textures: Vec::new(),
            current: DrawUniforms::new(),
            bound_positions: None,
            bound_tex_coords: None,
            bound_indices: None,
            active_texture: None,
            clear_color: wgpu::Color::BLACK,
            clear_color_buffer: true,
            clear_depth_buffer: true,
            staged_uniforms: Vec::new(),
            draws: Vec::new(),
        })
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    fn reconfigure(&mut self) {
        let surface_caps = self.surface.get_capabilities(&self.adapter);
        self.config.present_mode = surface_caps.present_modes[0];
        self.config.alpha_mode = surface_caps.alpha_modes[0];
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_view(&self.device, &self.config);
    }

    fn ensure_uniform_capacity(&mut self, draws: u64) {
        if draws <= self.uniform_capacity {
            return;
        }
        self.uniform_capacity = draws.next_power_of_two();
        let (buffer, bind_group) = create_uniform_buffer(
            &self.device,
            &self.uniform_layout,
            self.uniform_stride,
            self.uniform_capacity,
        );
        self.uniform_buffer = buffer;
        self.uniform_bind_group = bind_group;
        log::debug!("uniform buffer grown to {} draws", self.uniform_capacity);
    }

    fn reset_frame(&mut self) {
        self.draws.clear();
        self.staged_uniforms.clear();
        self.free_buffers.append(&mut self.retired_buffers);
    }

    fn insert_buffer(&mut self, buffer: wgpu::Buffer) -> BufferHandle {
        if let Some(handle) = self.free_buffers.pop() {
            self.buffers[handle.index()] = Some(buffer);
            return handle;
        }
        self.buffers.push(Some(buffer));
        BufferHandle(self.buffers.len() as u32 - 1)
    }

    fn buffer(&self, handle: BufferHandle) -> Option<&wgpu::Buffer> {
        self.buffers.get(handle.index()).and_then(Option::as_ref)
    }

    fn pipeline(&self, topology: Topology) -> &wgpu::RenderPipeline {
        match topology {
            Topology::Triangles => &self.triangle_pipeline,
            Topology::Lines => &self.line_pipeline,
        }
    }
}

impl GraphicsDevice for WgpuDevice {
    fn create_vertex_buffer(&mut self, label: &str, data: &[f32]) -> BufferHandle {
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(data),
            usage: wgpu::BufferUsages::VERTEX,
        });
        self.insert_buffer(buffer)
    }

    fn create_index_buffer(&mut self, label: &str, data: &[u16]) -> BufferHandle {
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(data),
            usage: wgpu::BufferUsages::INDEX,
        });
        self.insert_buffer(buffer)
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        match self.buffers.get_mut(buffer.index()).and_then(Option::take) {
            Some(_released) => self.retired_buffers.push(buffer),
            None => log::warn!("destroying unknown buffer {:?}", buffer),
        }
    }

    fn bind_vertex_buffer(&mut self, slot: VertexSlot, buffer: BufferHandle) {
        match slot {
            VertexSlot::Position => self.bound_positions = Some(buffer),
            VertexSlot::TexCoord => self.bound_tex_coords = Some(buffer),
        }
    }

    fn bind_index_buffer(&mut self, buffer: BufferHandle) {
        self.bound_indices = Some(buffer);
    }

    fn set_uniform_mat4(&mut self, uniform: Uniform, value: Mat4) {
        match uniform {
            Uniform::WorldView => self.current.world_view = value.to_cols_array_2d(),
            Uniform::Projection => self.current.projection = value.to_cols_array_2d(),
            other => log::warn!("{:?} is not a matrix uniform", other),
        }
    }

    fn set_uniform_vec4(&mut self, uniform: Uniform, value: Vec4) {
        match uniform {
            Uniform::Color => self.current.color = value.to_array(),
            Uniform::FogColor => self.current.fog_color = value.to_array(),
            other => log::warn!("{:?} is not a vector uniform", other),
        }
    }

    fn set_uniform_int(&mut self, uniform: Uniform, value: i32) {
        match uniform {
            Uniform::UseTexture => self.current.use_texture = value,
            other => log::warn!("{:?} is not an integer uniform", other),
        }
    }

    fn set_uniform_float(&mut self, uniform: Uniform, value: f32) {
        match uniform {
            Uniform::FogNear => self.current.fog_near = value,
            Uniform::FogFar => self.current.fog_far = value,
            other => log::warn!("{:?} is not a float uniform", other),
        }
    }

    fn draw_indexed(&mut self, topology: Topology, count: u32) {
        let (Some(positions), Some(indices)) = (self.bound_positions, self.bound_indices) else {
            log::warn!("draw_indexed without bound geometry, skipping");
            return;
        };

        let uniform_offset = self.staged_uniforms.len() as u32;
        self.staged_uniforms
            .extend_from_slice(bytemuck::bytes_of(&self.current));
        self.staged_uniforms
            .resize(uniform_offset as usize + self.uniform_stride as usize, 0);

        self.draws.push(DrawCall {
            topology,
            positions,
            tex_coords: self.bound_tex_coords.take(),
            indices,
            count,
            uniform_offset,
            texture: (self.current.use_texture == 1)
                .then_some(self.active_texture)
                .flatten(),
        });
    }

    fn create_texture(&mut self, label: &str) -> TextureHandle {
        let texture = create_gpu_texture(
            &self.device,
            &self.texture_layout,
            &self.repeat_sampler,
            (1, 1),
            1,
            label,
        );
        self.textures.push(texture);
        TextureHandle(self.textures.len() as u32 - 1)
    }

    fn upload_texture_image(&mut self, texture: TextureHandle, pixels: &[u8], width: u32, height: u32) {
        let max = self.max_texture_size();
        if width > max || height > max {
            log::warn!("{}x{} texture exceeds the device limit of {}, skipping upload", width, height, max);
            return;
        }
        let Some(slot) = self.textures.get_mut(texture.index()) else {
            log::warn!("upload to unknown texture {:?}", texture);
            return;
        };

        let mips = mip_chain(pixels, width, height);
        let mip_level_count = mips.len() as u32 + 1;
        if slot.width != width || slot.height != height || slot.mip_level_count != mip_level_count {
            let sampler = if width.is_power_of_two() && height.is_power_of_two() {
                &self.repeat_sampler
            } else {
                &self.clamp_sampler
            };
            *slot = create_gpu_texture(
                &self.device,
                &self.texture_layout,
                sampler,
                (width, height),
                mip_level_count,
                "Loaded Texture",
            );
        }

        write_texture_level(&self.queue, slot, 0, (width, height), pixels);
        for (level, (size, level_pixels)) in mips.iter().enumerate() {
            write_texture_level(&self.queue, slot, level as u32 + 1, *size, level_pixels);
        }
    }

    fn activate_texture(&mut self, texture: TextureHandle, slot: u32) {
        if slot != 0 {
            log::warn!("only texture slot 0 is supported, ignoring slot {}", slot);
            return;
        }
        self.active_texture = Some(texture);
    }

    fn max_texture_size(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    fn set_clear_color(&mut self, color: Vec4) {
        self.clear_color = wgpu::Color {
            r: color.x as f64,
            g: color.y as f64,
            b: color.z as f64,
            a: color.w as f64,
        };
    }

    fn clear(&mut self, color: bool, depth: bool) {
        self.reset_frame();
        self.clear_color_buffer = color;
        self.clear_depth_buffer = depth;
    }

    fn present(&mut self) {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.reconfigure();
                self.reset_frame();
                return;
            }
            Err(err) => {
                log::warn!("dropping frame: {err}");
                self.reset_frame();
                return;
            }
        };

        self.ensure_uniform_capacity(self.draws.len() as u64);
        if !self.staged_uniforms.is_empty() {
            self.queue
                .write_buffer(&self.uniform_buffer, 0, &self.staged_uniforms);
        }

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let color_load = if self.clear_color_buffer {
                wgpu::LoadOp::Clear(self.clear_color)
            } else {
                wgpu::LoadOp::Load
            };
            let depth_load = if self.clear_depth_buffer {
                wgpu::LoadOp::Clear(1.0)
            } else {
                wgpu::LoadOp::Load
            };

            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: depth_load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            for draw in &self.draws {
                let texture = draw
                    .texture
                    .and_then(|handle| self.textures.get(handle.index()))
                    .unwrap_or(&self.fallback_texture);
                let tex_coords = draw
                    .tex_coords
                    .and_then(|handle| self.buffer(handle))
                    .unwrap_or(&self.fallback_tex_coords);
                let (Some(positions), Some(indices)) =
                    (self.buffer(draw.positions), self.buffer(draw.indices))
                else {
                    continue;
                };

                render_pass.set_pipeline(self.pipeline(draw.topology));
                render_pass.set_bind_group(0, &self.uniform_bind_group, &[draw.uniform_offset]);
                render_pass.set_bind_group(1, &texture.bind_group, &[]);
                render_pass.set_vertex_buffer(0, positions.slice(..));
                render_pass.set_vertex_buffer(1, tex_coords.slice(..));
                render_pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint16);
                render_pass.draw_indexed(0..draw.count, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        self.reset_frame();
    }

    fn viewport_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.reconfigure();
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader_module: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    topology: wgpu::PrimitiveTopology,
) -> wgpu::RenderPipeline {
    let vertex_layouts = [
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            }],
        },
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[wgpu::VertexAttribute {
                offset: 0,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2,
            }],
        },
    ];

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Render Pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader_module,
            entry_point: "vs_main",
            buffers: &vertex_layouts,
        },
        fragment: Some(wgpu::FragmentState {
            module: shader_module,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

fn create_uniform_buffer(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    stride: u64,
    capacity: u64,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Uniform Buffer"),
        size: stride * capacity,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Uniform Bind Group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: NonZeroU64::new(mem::size_of::<DrawUniforms>() as u64),
            }),
        }],
    });
    (buffer, bind_group)
}

fn create_sampler(device: &wgpu::Device, address_mode: wgpu::AddressMode) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

fn create_gpu_texture(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    (width, height): (u32, u32),
    mip_level_count: u32,
    label: &str,
) -> GpuTexture {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });

    GpuTexture {
        texture,
        bind_group,
        width,
        height,
        mip_level_count,
    }
}

fn write_texture_level(
    queue: &wgpu::Queue,
    target: &GpuTexture,
    mip_level: u32,
    (width, height): (u32, u32),
    pixels: &[u8],
) {
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &target.texture,
            mip_level,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}

/// Downsampled mip levels below the base image, largest first. Only
/// power-of-two images get mips; others sample the base level alone.
fn mip_chain(pixels: &[u8], width: u32, height: u32) -> Vec<((u32, u32), Vec<u8>)> {
    if !(width.is_power_of_two() && height.is_power_of_two()) {
        return Vec::new();
    }
    let Some(mut level) = image::RgbaImage::from_raw(width, height, pixels.to_vec()) else {
        return Vec::new();
    };

    let mut levels = Vec::new();
    while level.width() > 1 || level.height() > 1 {
        let size = ((level.width() / 2).max(1), (level.height() / 2).max(1));
        level = image::imageops::resize(&level, size.0, size.1, image::imageops::FilterType::Triangle);
        levels.push((size, level.as_raw().clone()));
    }
    levels
}

fn create_depth_view(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_of_two_image_gets_full_mip_chain() {
        let pixels = vec![200; 8 * 2 * 4];
        let levels = mip_chain(&pixels, 8, 2);

        let sizes: Vec<_> = levels.iter().map(|(size, _)| *size).collect();
        assert_eq!(sizes, vec![(4, 1), (2, 1), (1, 1)]);
        for ((width, height), data) in &levels {
            assert_eq!(data.len(), (width * height * 4) as usize);
            assert!(data.iter().all(|&value| value.abs_diff(200) <= 1));
        }
    }

    #[test]
    fn non_power_of_two_or_short_image_has_no_mips() {
        assert!(mip_chain(&[0; 3 * 2 * 4], 3, 2).is_empty());
        assert!(mip_chain(&[0; 4], 1, 1).is_empty());
        assert!(mip_chain(&[0; 5], 4, 4).is_empty());
    }

    #[test]
    fn draw_uniforms_match_shader_layout() {
        assert_eq!(mem::size_of::<DrawUniforms>(), 176);
    }
}
