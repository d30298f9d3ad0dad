//! Offscreen wgpu backend.

use std::borrow::Cow;
use std::collections::HashMap;

use scene::prefabs::Light;
use tracing::{debug, info};
use wgpu::util::DeviceExt;

use crate::device::{
    BufferDesc, BufferId, BufferUsage, ProgramDesc, ProgramId, ProgramKind, RenderDevice,
    ResourceCounts, TextureDesc, TextureFormat, TextureId,
};
use crate::error::GpuError;
use crate::mesh::{PinInstance, StarVertex, Vertex};
use crate::renderer::{Material, RenderCommand, RenderFrame};

const SURFACE_SHADER: &str = concat!(
    include_str!("shaders/common.wgsl"),
    include_str!("shaders/surface.wgsl")
);
const ATMOSPHERE_SHADER: &str = concat!(
    include_str!("shaders/common.wgsl"),
    include_str!("shaders/atmosphere.wgsl")
);
const STARFIELD_SHADER: &str = concat!(
    include_str!("shaders/common.wgsl"),
    include_str!("shaders/starfield.wgsl")
);
const PIN_SHADER: &str = concat!(
    include_str!("shaders/common.wgsl"),
    include_str!("shaders/pin.wgsl")
);

const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Globals {
    view_proj: [[f32; 4]; 4],
    eye: [f32; 4],
    fog: [f32; 4],
    ambient: [f32; 4],
    sun_dir: [f32; 4],
    sun_color: [f32; 4],
    rim_pos: [f32; 4],
    rim_color: [f32; 4],
}

impl Globals {
    fn from_frame(frame: &RenderFrame) -> Self {
        let [ex, ey, ez] = frame.eye;
        let [fr, fg, fb] = frame.fog_color;
        let mut globals = Self {
            view_proj: frame.view_proj,
            eye: [ex, ey, ez, 1.0],
            fog: [fr, fg, fb, frame.fog_density],
            ambient: [0.0; 4],
            sun_dir: [0.0, 1.0, 0.0, 0.0],
            sun_color: [0.0; 4],
            rim_pos: [0.0; 4],
            rim_color: [0.0; 4],
        };
        for light in &frame.lights {
            match *light {
                Light::Ambient { color, intensity } => {
                    let [r, g, b] = color.as_array();
                    globals.ambient[0] += r * intensity;
                    globals.ambient[1] += g * intensity;
                    globals.ambient[2] += b * intensity;
                }
                Light::Directional {
                    color,
                    intensity,
                    position,
                } => {
                    let [x, y, z] = position.as_f32();
                    let [r, g, b] = color.as_array();
                    globals.sun_dir = [x, y, z, 0.0];
                    globals.sun_color = [r * intensity, g * intensity, b * intensity, 0.0];
                }
                Light::Spot {
                    color,
                    intensity,
                    position,
                    ..
                } => {
                    let [x, y, z] = position.as_f32();
                    let [r, g, b] = color.as_array();
                    globals.rim_pos = [x, y, z, 1.0];
                    globals.rim_color = [r * intensity, g * intensity, b * intensity, 0.0];
                }
            }
        }
        globals
    }
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct DrawUniforms {
    color: [f32; 4],
    params: [f32; 4],
    maps: [u32; 4],
}

impl DrawUniforms {
    fn from_material(material: &Material) -> Self {
        let [r, g, b] = material.color;
        Self {
            color: [r, g, b, material.opacity],
            params: [material.roughness, material.metalness, material.clearcoat, 1.0],
            maps: [
                material.albedo_map.is_some() as u32,
                material.roughness_map.is_some() as u32,
                material.normal_map.is_some() as u32,
                0,
            ],
        }
    }

    fn points(color: [f32; 3], opacity: f32, size: f32) -> Self {
        let [r, g, b] = color;
        Self {
            color: [r, g, b, opacity],
            params: [1.0, 0.0, 0.0, size],
            maps: [0; 4],
        }
    }
}

struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

struct Program {
    kind: ProgramKind,
    pipeline: wgpu::RenderPipeline,
}

struct Targets {
    color: wgpu::Texture,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
}

/// Renders into an offscreen color target; no window or surface needed.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    size: (u32, u32),
    targets: Targets,
    next_id: u64,
    buffers: HashMap<BufferId, wgpu::Buffer>,
    textures: HashMap<TextureId, GpuTexture>,
    programs: HashMap<ProgramId, Program>,
    globals_buffer: wgpu::Buffer,
    globals_group: wgpu::BindGroup,
    globals_layout: wgpu::BindGroupLayout,
    draw_layout: wgpu::BindGroupLayout,
    maps_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    /// 1x1 stand-ins bound when a surface map hasn't arrived: white, white, flat normal.
    fallback_maps: [GpuTexture; 3],
    frames_drawn: u64,
}

impl std::fmt::Debug for WgpuDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuDevice")
            .field("size", &self.size)
            .field("live", &self.live_resources())
            .field("frames_drawn", &self.frames_drawn)
            .finish()
    }
}

impl WgpuDevice {
    /// Blocks on adapter and device creation.
    pub fn new_offscreen(width: u32, height: u32) -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| GpuError::NoAdapter(e.to_string()))?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("globe-device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            ..Default::default()
        }))
        .map_err(|e| GpuError::Backend(e.to_string()))?;
        info!(adapter = ?adapter.get_info().name, "wgpu device ready");

        let globals_layout = uniform_layout(&device, "globe-globals-bgl");
        let draw_layout = uniform_layout(&device, "globe-draw-bgl");
        let maps_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("globe-maps-bgl"),
            entries: &[
                texture_entry(0),
                texture_entry(1),
                texture_entry(2),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("globe-globals"),
            size: std::mem::size_of::<Globals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let globals_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("globe-globals-bg"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("globe-surface-sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let fallback_maps = [
            upload_texture(&device, &queue, "fallback-albedo", 1, 1, COLOR_FORMAT, &[255; 4]),
            upload_texture(
                &device,
                &queue,
                "fallback-roughness",
                1,
                1,
                wgpu::TextureFormat::Rgba8Unorm,
                &[255; 4],
            ),
            upload_texture(
                &device,
                &queue,
                "fallback-normal",
                1,
                1,
                wgpu::TextureFormat::Rgba8Unorm,
                &[128, 128, 255, 255],
            ),
        ];

        let targets = create_targets(&device, width, height);

        Ok(Self {
            device,
            queue,
            size: (width.max(1), height.max(1)),
            targets,
            next_id: 0,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            programs: HashMap::new(),
            globals_buffer,
            globals_group,
            globals_layout,
            draw_layout,
            maps_layout,
            sampler,
            fallback_maps,
            frames_drawn: 0,
        })
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn color_target(&self) -> &wgpu::Texture {
        &self.targets.color
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn buffer(&self, id: BufferId) -> Result<&wgpu::Buffer, GpuError> {
        self.buffers.get(&id).ok_or(GpuError::UnknownBuffer(id))
    }

    fn map_view(&self, id: Option<TextureId>, fallback: usize) -> Result<&wgpu::TextureView, GpuError> {
        match id {
            Some(id) => self
                .textures
                .get(&id)
                .map(|t| &t.view)
                .ok_or(GpuError::UnknownTexture(id)),
            None => Ok(&self.fallback_maps[fallback].view),
        }
    }

    fn draw_group(&self, uniforms: &DrawUniforms) -> wgpu::BindGroup {
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("globe-draw-uniforms"),
            contents: bytemuck::bytes_of(uniforms),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("globe-draw-bg"),
            layout: &self.draw_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        })
    }

    fn maps_group(&self, material: &Material) -> Result<wgpu::BindGroup, GpuError> {
        let albedo = self.map_view(material.albedo_map, 0)?;
        let roughness = self.map_view(material.roughness_map, 1)?;
        let normal = self.map_view(material.normal_map, 2)?;
        Ok(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("globe-maps-bg"),
            layout: &self.maps_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(albedo),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(roughness),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(normal),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        }))
    }

    fn build_pipeline(&self, desc: &ProgramDesc<'_>) -> wgpu::RenderPipeline {
        let (source, with_maps) = match desc.kind {
            ProgramKind::Surface => (SURFACE_SHADER, true),
            ProgramKind::Atmosphere => (ATMOSPHERE_SHADER, false),
            ProgramKind::Starfield => (STARFIELD_SHADER, false),
            ProgramKind::Pin => (PIN_SHADER, false),
        };
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(desc.label),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
        });

        let layouts: Vec<&wgpu::BindGroupLayout> = if with_maps {
            vec![&self.globals_layout, &self.draw_layout, &self.maps_layout]
        } else {
            vec![&self.globals_layout, &self.draw_layout]
        };
        let layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(desc.label),
            bind_group_layouts: &layouts,
            immediate_size: 0,
        });

        let mesh_attributes = [
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x3,
                offset: 0,
                shader_location: 0,
            },
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x3,
                offset: 12,
                shader_location: 1,
            },
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x2,
                offset: 24,
                shader_location: 2,
            },
        ];
        let instance_attributes = [
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x3,
                offset: 0,
                shader_location: 3,
            },
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x4,
                offset: 16,
                shader_location: 4,
            },
        ];
        let vertex_stride = std::mem::size_of::<Vertex>() as wgpu::BufferAddress;

        let buffers: Vec<wgpu::VertexBufferLayout<'_>> = match desc.kind {
            ProgramKind::Surface => vec![wgpu::VertexBufferLayout {
                array_stride: vertex_stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &mesh_attributes,
            }],
            ProgramKind::Atmosphere => vec![wgpu::VertexBufferLayout {
                array_stride: vertex_stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &mesh_attributes[..2],
            }],
            ProgramKind::Starfield => vec![wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<StarVertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &mesh_attributes[..1],
            }],
            ProgramKind::Pin => vec![
                wgpu::VertexBufferLayout {
                    array_stride: vertex_stride,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &mesh_attributes[..1],
                },
                wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<PinInstance>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &instance_attributes,
                },
            ],
        };

        let additive = wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::One,
            operation: wgpu::BlendOperation::Add,
        };
        let (blend, cull_mode, depth_write, topology) = match desc.kind {
            ProgramKind::Surface => (
                wgpu::BlendState::REPLACE,
                None,
                true,
                wgpu::PrimitiveTopology::TriangleList,
            ),
            // Back faces only, so the glow rims the globe instead of covering it.
            ProgramKind::Atmosphere => (
                wgpu::BlendState {
                    color: additive,
                    alpha: additive,
                },
                Some(wgpu::Face::Front),
                false,
                wgpu::PrimitiveTopology::TriangleList,
            ),
            ProgramKind::Starfield => (
                wgpu::BlendState::ALPHA_BLENDING,
                None,
                false,
                wgpu::PrimitiveTopology::PointList,
            ),
            ProgramKind::Pin => (
                wgpu::BlendState::ALPHA_BLENDING,
                None,
                true,
                wgpu::PrimitiveTopology::TriangleList,
            ),
        };

        self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(desc.label),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &buffers,
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: COLOR_FORMAT,
                    blend: Some(blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: depth_write,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    }
}

struct PreparedDraw<'a> {
    pipeline: &'a wgpu::RenderPipeline,
    draw_group: wgpu::BindGroup,
    maps_group: Option<wgpu::BindGroup>,
    vertices: &'a wgpu::Buffer,
    indices: Option<(&'a wgpu::Buffer, u32)>,
    instances: Option<(&'a wgpu::Buffer, u32)>,
    vertex_count: u32,
}

impl RenderDevice for WgpuDevice {
    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferId, GpuError> {
        let usage = match desc.usage {
            BufferUsage::Vertex | BufferUsage::Instance => wgpu::BufferUsages::VERTEX,
            BufferUsage::Index => wgpu::BufferUsages::INDEX,
        };
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(desc.label),
            contents: desc.contents,
            usage,
        });
        let id = BufferId(self.next());
        self.buffers.insert(id, buffer);
        Ok(id)
    }

    fn release_buffer(&mut self, id: BufferId) -> Result<(), GpuError> {
        let buffer = self.buffers.remove(&id).ok_or(GpuError::UnknownBuffer(id))?;
        buffer.destroy();
        Ok(())
    }

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureId, GpuError> {
        desc.validate()?;
        let format = match desc.format {
            TextureFormat::Rgba8Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            TextureFormat::Rgba8Linear => wgpu::TextureFormat::Rgba8Unorm,
        };
        let texture = upload_texture(
            &self.device,
            &self.queue,
            desc.label,
            desc.width,
            desc.height,
            format,
            desc.rgba,
        );
        let id = TextureId(self.next());
        self.textures.insert(id, texture);
        Ok(id)
    }

    fn release_texture(&mut self, id: TextureId) -> Result<(), GpuError> {
        let texture = self
            .textures
            .remove(&id)
            .ok_or(GpuError::UnknownTexture(id))?;
        texture.texture.destroy();
        Ok(())
    }

    fn create_program(&mut self, desc: &ProgramDesc<'_>) -> Result<ProgramId, GpuError> {
        let pipeline = self.build_pipeline(desc);
        let id = ProgramId(self.next());
        self.programs.insert(
            id,
            Program {
                kind: desc.kind,
                pipeline,
            },
        );
        debug!(?id, kind = ?desc.kind, "created pipeline");
        Ok(id)
    }

    fn release_program(&mut self, id: ProgramId) -> Result<(), GpuError> {
        self.programs
            .remove(&id)
            .map(|_| ())
            .ok_or(GpuError::UnknownProgram(id))
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width.max(1), height.max(1));
        self.targets = create_targets(&self.device, width, height);
    }

    fn draw(&mut self, frame: &RenderFrame) -> Result<(), GpuError> {
        self.queue.write_buffer(
            &self.globals_buffer,
            0,
            bytemuck::bytes_of(&Globals::from_frame(frame)),
        );

        let mut prepared = Vec::with_capacity(frame.commands.len());
        for command in &frame.commands {
            match command {
                RenderCommand::Mesh {
                    program,
                    mesh,
                    instances,
                    material,
                } => {
                    let program = self
                        .programs
                        .get(program)
                        .ok_or(GpuError::UnknownProgram(*program))?;
                    let maps_group = match program.kind {
                        ProgramKind::Surface => Some(self.maps_group(material)?),
                        _ => None,
                    };
                    let instances = match instances {
                        Some(range) => Some((self.buffer(range.buffer)?, range.count)),
                        None => None,
                    };
                    prepared.push(PreparedDraw {
                        pipeline: &program.pipeline,
                        draw_group: self.draw_group(&DrawUniforms::from_material(material)),
                        maps_group,
                        vertices: self.buffer(mesh.vertices)?,
                        indices: Some((self.buffer(mesh.indices)?, mesh.index_count)),
                        instances,
                        vertex_count: 0,
                    });
                }
                RenderCommand::Points {
                    program,
                    vertices,
                    count,
                    color,
                    opacity,
                    size,
                } => {
                    let program = self
                        .programs
                        .get(program)
                        .ok_or(GpuError::UnknownProgram(*program))?;
                    prepared.push(PreparedDraw {
                        pipeline: &program.pipeline,
                        draw_group: self.draw_group(&DrawUniforms::points(*color, *opacity, *size)),
                        maps_group: None,
                        vertices: self.buffer(*vertices)?,
                        indices: None,
                        instances: None,
                        vertex_count: *count,
                    });
                }
            }
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("globe-frame-encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("globe-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets.color_view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });

            rpass.set_bind_group(0, &self.globals_group, &[]);
            for draw in &prepared {
                rpass.set_pipeline(draw.pipeline);
                rpass.set_bind_group(1, &draw.draw_group, &[]);
                if let Some(maps) = &draw.maps_group {
                    rpass.set_bind_group(2, maps, &[]);
                }
                rpass.set_vertex_buffer(0, draw.vertices.slice(..));
                let instance_count = match draw.instances {
                    Some((buffer, count)) => {
                        rpass.set_vertex_buffer(1, buffer.slice(..));
                        count
                    }
                    None => 1,
                };
                match draw.indices {
                    Some((buffer, count)) => {
                        rpass.set_index_buffer(buffer.slice(..), wgpu::IndexFormat::Uint16);
                        rpass.draw_indexed(0..count, 0, 0..instance_count);
                    }
                    None => rpass.draw(0..draw.vertex_count, 0..instance_count),
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        drop(prepared);
        self.frames_drawn += 1;
        Ok(())
    }

    fn live_resources(&self) -> ResourceCounts {
        ResourceCounts {
            buffers: self.buffers.len(),
            textures: self.textures.len(),
            programs: self.programs.len(),
        }
    }
}

fn uniform_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    }
}

fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    rgba: &[u8],
) -> GpuTexture {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture { texture, view }
}

fn create_targets(device: &wgpu::Device, width: u32, height: u32) -> Targets {
    let size = wgpu::Extent3d {
        width: width.max(1),
        height: height.max(1),
        depth_or_array_layers: 1,
    };
    let color = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("globe-color"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: COLOR_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let depth = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("globe-depth"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    Targets {
        color_view: color.create_view(&wgpu::TextureViewDescriptor::default()),
        depth_view: depth.create_view(&wgpu::TextureViewDescriptor::default()),
        color,
    }
}
