//! The wgpu device, surface and frame encoder.
//!
//! [`Context`] is the production [`Backend`]: it owns the GPU handles, creates
//! vertex arrays, instance buffers, textures and shader programs, and turns a
//! planned [`Frame`] into one render pass.

use std::{num::NonZeroU64, sync::Arc};

use anyhow::Context as _;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    camera::CameraUniform,
    data_structures::{
        material::MaterialUniform,
        mesh::{Geometry, NORMAL_COMPONENTS, POSITION_COMPONENTS, UV_COMPONENTS},
        texture::Texture,
    },
    error::ResourceError,
    pipelines::basic::{self, ShaderProgram},
    render::{Backend, DrawMode, Frame, FrameCommand, IndexRange, IndexType},
    resources::shader::{ShaderInfo, ShaderSource},
};

/// Index and vertex streams of one drawable on the GPU.
///
/// Missing uv or normal streams are zero-filled so every slot has a buffer.
#[derive(Debug)]
pub struct VertexArray {
    positions: wgpu::Buffer,
    uvs: wgpu::Buffer,
    normals: wgpu::Buffer,
    indices: wgpu::Buffer,
}

#[derive(Debug)]
pub struct InstanceBuffer {
    buffer: wgpu::Buffer,
    label: String,
}

#[derive(Debug)]
pub struct CameraResources {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: Texture,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub material_layout: wgpu::BindGroupLayout,
    pub clear_colour: wgpu::Color,
    default_texture: Texture,
    is_surface_configured: bool,
}

impl Context {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();

        // BackendBit::PRIMARY => Vulkan + Metal + DX12 + Browser WebGPU
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no compatible graphics adapter")?;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                // WebGL2 is the lowest common denominator.
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no texture formats")?;
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

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[CameraUniform {
                projection: [[0.0; 4]; 4],
                view: [[0.0; 4]; 4],
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group_layout = basic::camera_layout(&device);
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });
        let camera = CameraResources {
            buffer: camera_buffer,
            bind_group: camera_bind_group,
            bind_group_layout: camera_bind_group_layout,
        };

        let depth_texture =
            Texture::create_depth_texture(&device, [config.width, config.height], "depth_texture");
        let default_texture = Texture::create_white(&device, &queue);
        let material_layout = basic::material_layout(&device);

        Ok(Self {
            window,
            depth_texture,
            surface,
            device,
            queue,
            config,
            camera,
            material_layout,
            clear_colour: wgpu::Color::BLACK,
            default_texture,
            is_surface_configured: false,
        })
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
            self.depth_texture = Texture::create_depth_texture(
                &self.device,
                [self.config.width, self.config.height],
                "depth_texture",
            );
            self.is_surface_configured = true;
        }
    }

    fn stream_buffer(&self, label: &str, data: &[f32], usage: wgpu::BufferUsages) -> wgpu::Buffer {
        self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(data),
            usage,
        })
    }

    /// Stride of one material in the per-frame uniform buffer.
    fn material_stride(&self) -> u64 {
        let alignment = self.device.limits().min_uniform_buffer_offset_alignment as u64;
        let size = std::mem::size_of::<MaterialUniform>() as u64;
        size.div_ceil(alignment) * alignment
    }
}

/// Streams `data` or, if empty, zeros for every vertex.
fn or_zeros(data: &[f32], vertex_count: usize, components: usize) -> Vec<f32> {
    if data.is_empty() {
        vec![0.0; vertex_count.max(1) * components]
    } else {
        data.to_vec()
    }
}

/// State collected for one drawable while walking the frame commands.
struct PendingDraw<'a> {
    vertex_array: &'a VertexArray,
    instances: &'a InstanceBuffer,
    material: usize,
    textures: Vec<Option<&'a Texture>>,
}

struct Draw<'a> {
    pending: PendingDraw<'a>,
    mode: DrawMode,
    index: IndexRange,
    instance_count: u32,
}

impl Backend for Context {
    type VertexArray = VertexArray;
    type InstanceBuffer = InstanceBuffer;
    type Texture = Texture;
    type Program = ShaderProgram;

    fn create_vertex_array(&self, label: &str, geometry: &Geometry) -> VertexArray {
        let vertex_count = geometry.vertex_count();
        let vertex = wgpu::BufferUsages::VERTEX;
        let indices = match geometry.index_range().index_type {
            IndexType::U16 => {
                let narrow: Vec<u16> = geometry.indices.iter().map(|&i| i as u16).collect();
                bytemuck::cast_slice(&narrow).to_vec()
            }
            IndexType::U32 => bytemuck::cast_slice(&geometry.indices).to_vec(),
        };
        // keep at least 4 bytes so the buffer can be sliced
        let mut indices = indices;
        indices.resize(indices.len().max(4).next_multiple_of(4), 0);

        VertexArray {
            positions: self.stream_buffer(
                &format!("{label} positions"),
                &or_zeros(&geometry.positions, vertex_count, POSITION_COMPONENTS),
                vertex,
            ),
            uvs: self.stream_buffer(
                &format!("{label} uvs"),
                &or_zeros(&geometry.uvs, vertex_count, UV_COMPONENTS),
                vertex,
            ),
            normals: self.stream_buffer(
                &format!("{label} normals"),
                &or_zeros(&geometry.normals, vertex_count, NORMAL_COMPONENTS),
                vertex,
            ),
            indices: self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} indices")),
                contents: &indices,
                usage: wgpu::BufferUsages::INDEX,
            }),
        }
    }

    fn create_instance_buffer(&self, label: &str, data: &[f32]) -> InstanceBuffer {
        let label = format!("{label} Instance Buffer");
        let usage = wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST;
        let buffer = if data.is_empty() {
            self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&label),
                size: std::mem::size_of::<[f32; 16]>() as u64,
                usage,
                mapped_at_creation: false,
            })
        } else {
            self.stream_buffer(&label, data, usage)
        };
        InstanceBuffer { buffer, label }
    }

    fn upload_instances(&self, buffer: &mut InstanceBuffer, data: &[f32]) {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        if bytes.len() as u64 > buffer.buffer.size() {
            buffer.buffer = self.stream_buffer(
                &buffer.label,
                data,
                wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            );
        } else {
            self.queue.write_buffer(&buffer.buffer, 0, bytes);
        }
    }

    fn update_instances(&self, buffer: &mut InstanceBuffer, offset: usize, data: &[f32]) {
        let offset = (offset * std::mem::size_of::<f32>()) as u64;
        self.queue
            .write_buffer(&buffer.buffer, offset, bytemuck::cast_slice(data));
    }

    fn create_texture(&self, name: &str, image: &image::RgbaImage) -> Texture {
        Texture::from_image(&self.device, &self.queue, image, Some(name))
    }

    fn link_program(
        &self,
        name: &str,
        source: &ShaderSource,
        info: &ShaderInfo,
    ) -> Result<ShaderProgram, ResourceError> {
        basic::link_program(
            &self.device,
            self.config.format,
            &self.camera.bind_group_layout,
            &self.material_layout,
            name,
            source,
            info,
        )
    }

    fn submit(&mut self, frame: Frame<'_, Self>) -> anyhow::Result<()> {
        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        let mut program = None;
        let mut clear = false;
        let mut materials = vec![MaterialUniform::default()];
        let mut pending: Option<PendingDraw> = None;
        let mut draws = Vec::new();
        for command in frame.commands {
            match command {
                FrameCommand::Clear => clear = true,
                FrameCommand::UseProgram(shader) => program = Some(shader),
                FrameCommand::CameraUniforms(uniform) => {
                    self.queue
                        .write_buffer(&self.camera.buffer, 0, bytemuck::cast_slice(&[uniform]));
                }
                FrameCommand::BindVertexArray {
                    vertex_array,
                    instances,
                    ..
                } => {
                    pending = Some(PendingDraw {
                        vertex_array,
                        instances,
                        material: 0,
                        textures: Vec::new(),
                    });
                }
                FrameCommand::MaterialUniforms(uniform) => {
                    materials.push(uniform);
                    if let Some(pending) = pending.as_mut() {
                        pending.material = materials.len() - 1;
                    }
                }
                FrameCommand::BindTexture { unit, texture } => {
                    if let Some(pending) = pending.as_mut() {
                        let unit = unit as usize;
                        if pending.textures.len() <= unit {
                            pending.textures.resize(unit + 1, None);
                        }
                        pending.textures[unit] = Some(texture);
                    }
                }
                FrameCommand::DrawInstanced {
                    mode,
                    index,
                    instance_count,
                } => {
                    let pending = pending
                        .take()
                        .context("draw issued without a bound vertex array")?;
                    draws.push(Draw {
                        pending,
                        mode,
                        index,
                        instance_count,
                    });
                }
            }
        }
        let program = program.context("frame has no shader program")?;

        let stride = self.material_stride();
        let mut staging = vec![0u8; stride as usize * materials.len()];
        for (slot, material) in materials.iter().enumerate() {
            let start = slot * stride as usize;
            staging[start..start + std::mem::size_of::<MaterialUniform>()]
                .copy_from_slice(bytemuck::bytes_of(material));
        }
        let material_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Material Buffer"),
            contents: &staging,
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let material_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.material_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &material_buffer,
                    offset: 0,
                    size: NonZeroU64::new(std::mem::size_of::<MaterialUniform>() as u64),
                }),
            }],
            label: Some("material_bind_group"),
        });
        let texture_groups: Vec<Option<wgpu::BindGroup>> = draws
            .iter()
            .map(|draw| {
                program.texture_bind_group(
                    &self.device,
                    &draw.pending.textures,
                    &self.default_texture,
                )
            })
            .collect();

        let output = match self.surface.get_current_texture() {
            wgpu::CurrentSurfaceTexture::Success(output)
            | wgpu::CurrentSurfaceTexture::Suboptimal(output) => output,
            wgpu::CurrentSurfaceTexture::Lost | wgpu::CurrentSurfaceTexture::Outdated => {
                let size = self.window.inner_size();
                self.resize(size.width, size.height);
                return Ok(());
            }
            e => return Err(anyhow::anyhow!("failed to acquire surface texture: {e:?}")),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: if clear {
                            wgpu::LoadOp::Clear(self.clear_colour)
                        } else {
                            wgpu::LoadOp::Load
                        },
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
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

            render_pass.set_bind_group(0, &self.camera.bind_group, &[]);
            for (draw, textures) in draws.iter().zip(&texture_groups) {
                if draw.instance_count == 0 || draw.index.count == 0 {
                    continue;
                }
                let Some(pipeline) = program.pipeline(draw.mode) else {
                    continue;
                };
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(
                    1,
                    &material_bind_group,
                    &[(draw.pending.material as u64 * stride) as u32],
                );
                if let Some(textures) = textures {
                    render_pass.set_bind_group(2, textures, &[]);
                }
                let vertex_array = draw.pending.vertex_array;
                render_pass.set_vertex_buffer(0, vertex_array.positions.slice(..));
                render_pass.set_vertex_buffer(1, vertex_array.uvs.slice(..));
                render_pass.set_vertex_buffer(2, vertex_array.normals.slice(..));
                render_pass.set_vertex_buffer(3, draw.pending.instances.buffer.slice(..));
                render_pass.set_index_buffer(
                    vertex_array.indices.slice(..),
                    draw.index.index_type.into(),
                );
                render_pass.draw_indexed(draw.index.elements(), 0, 0..draw.instance_count);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        log::trace!("frame submitted after {:?}", frame.elapsed);
        Ok(())
    }
}
