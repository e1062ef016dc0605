//! GLSL shader programs linked into wgpu render pipelines.
//!
//! A [`ShaderProgram`] holds one pipeline per [`DrawMode`] built from the same
//! pair of GLSL stages. Bind groups are fixed:
//!
//! - group 0: camera uniforms (`projectionMatrix`, `viewMatrix`)
//! - group 1: material uniforms, addressed with a dynamic offset
//! - group 2: `sampler0..samplerN`, texture at binding `2k`, sampler at `2k + 1`
//!
//! Vertex buffers are fixed as well: slot 0 positions, slot 1 uvs, slot 2
//! normals and slot 3 the per-instance matrix.

use std::{borrow::Cow, collections::HashMap, num::NonZeroU64};

use crate::{
    data_structures::{material::MaterialUniform, texture::Texture},
    error::ResourceError,
    render::DrawMode,
    resources::shader::{AttributeLocations, ShaderInfo, ShaderSource},
};

pub struct ShaderProgram {
    name: String,
    pipelines: HashMap<DrawMode, wgpu::RenderPipeline>,
    texture_layout: Option<wgpu::BindGroupLayout>,
    sampler_count: u32,
}

impl ShaderProgram {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pipeline(&self, mode: DrawMode) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(&mode)
    }

    pub fn sampler_count(&self) -> u32 {
        self.sampler_count
    }

    /// Binds `textures` to the sampler units, filling gaps with `fallback`.
    pub fn texture_bind_group(
        &self,
        device: &wgpu::Device,
        textures: &[Option<&Texture>],
        fallback: &Texture,
    ) -> Option<wgpu::BindGroup> {
        let layout = self.texture_layout.as_ref()?;
        let entries: Vec<wgpu::BindGroupEntry> = (0..self.sampler_count as usize)
            .flat_map(|unit| {
                let texture = textures.get(unit).copied().flatten().unwrap_or(fallback);
                [
                    wgpu::BindGroupEntry {
                        binding: 2 * unit as u32,
                        resource: wgpu::BindingResource::TextureView(&texture.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2 * unit as u32 + 1,
                        resource: wgpu::BindingResource::Sampler(&texture.sampler),
                    },
                ]
            })
            .collect();
        Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &entries,
            label: Some("texture_bind_group"),
        }))
    }
}

pub fn camera_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("camera_bind_group_layout"),
    })
}

pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: NonZeroU64::new(std::mem::size_of::<MaterialUniform>() as u64),
            },
            count: None,
        }],
        label: Some("material_bind_group_layout"),
    })
}

fn texture_layout(device: &wgpu::Device, sampler_count: u32) -> wgpu::BindGroupLayout {
    let entries: Vec<wgpu::BindGroupLayoutEntry> = (0..sampler_count)
        .flat_map(|unit| {
            [
                wgpu::BindGroupLayoutEntry {
                    binding: 2 * unit,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2 * unit + 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ]
        })
        .collect();
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &entries,
        label: Some("texture_bind_group_layout"),
    })
}

fn attribute(location: u32, format: wgpu::VertexFormat, offset: u64) -> wgpu::VertexAttribute {
    wgpu::VertexAttribute {
        offset,
        shader_location: location,
        format,
    }
}

/**
 * Attributes of the four vertex buffer slots. A stream the shader does not
 * read keeps its slot with no attributes so the buffer indices stay fixed.
 */
fn vertex_attributes(locations: &AttributeLocations) -> [Vec<wgpu::VertexAttribute>; 4] {
    use std::mem::size_of;
    let column = size_of::<[f32; 4]>() as u64;
    [
        vec![attribute(locations.position, wgpu::VertexFormat::Float32x4, 0)],
        locations
            .uv
            .map(|location| attribute(location, wgpu::VertexFormat::Float32x2, 0))
            .into_iter()
            .collect(),
        locations
            .normal
            .map(|location| attribute(location, wgpu::VertexFormat::Float32x3, 0))
            .into_iter()
            .collect(),
        // A mat4 takes up 4 vertex slots as it is technically 4 vec4s.
        (0..4)
            .map(|i| {
                attribute(
                    locations.instance + i,
                    wgpu::VertexFormat::Float32x4,
                    column * i as u64,
                )
            })
            .collect(),
    ]
}

fn compile_stage(
    name: &str,
    source: &str,
    stage: wgpu::naga::ShaderStage,
) -> Result<(), ResourceError> {
    let options = wgpu::naga::front::glsl::Options::from(stage);
    wgpu::naga::front::glsl::Frontend::default()
        .parse(&options, source)
        .map(|_| ())
        .map_err(|e| ResourceError::invalid_shader(name, format!("{:?} stage: {}", stage, e)))
}

/// Checks `source` against `info`, compiles both stages and builds a pipeline per draw mode.
pub fn link_program(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    camera_layout: &wgpu::BindGroupLayout,
    material_layout: &wgpu::BindGroupLayout,
    name: &str,
    source: &ShaderSource,
    info: &ShaderInfo,
) -> Result<ShaderProgram, ResourceError> {
    let locations = info.resolve(name, source)?;
    compile_stage(name, &source.vertex, wgpu::naga::ShaderStage::Vertex)?;
    compile_stage(name, &source.fragment, wgpu::naga::ShaderStage::Fragment)?;

    let sampler_count = info.sampler_count();
    let texture_layout = (sampler_count > 0).then(|| texture_layout(device, sampler_count));
    let mut bind_group_layouts = vec![camera_layout, material_layout];
    bind_group_layouts.extend(texture_layout.as_ref());
    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Render Pipeline Layout"),
        bind_group_layouts: &bind_group_layouts.iter().copied().map(Some).collect::<Vec<_>>(),
        immediate_size: 0,
    });

    let vertex = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("{name} vertex stage")),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(&source.vertex),
            stage: wgpu::naga::ShaderStage::Vertex,
            defines: Default::default(),
        },
    });
    let fragment = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("{name} fragment stage")),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(&source.fragment),
            stage: wgpu::naga::ShaderStage::Fragment,
            defines: Default::default(),
        },
    });

    let attributes = vertex_attributes(&locations);
    let strides = [4, 2, 3, 16].map(|floats| (floats * std::mem::size_of::<f32>()) as u64);
    let vertex_layouts: Vec<wgpu::VertexBufferLayout> = attributes
        .iter()
        .zip(strides)
        .enumerate()
        .map(|(slot, (attributes, array_stride))| wgpu::VertexBufferLayout {
            array_stride,
            step_mode: if slot == 3 {
                wgpu::VertexStepMode::Instance
            } else {
                wgpu::VertexStepMode::Vertex
            },
            attributes,
        })
        .collect();

    let pipelines = DrawMode::ALL
        .into_iter()
        .map(|mode| {
            let pipeline = mk_render_pipeline(
                device,
                &render_pipeline_layout,
                color_format,
                Some(wgpu::BlendState::ALPHA_BLENDING),
                Some(Texture::DEPTH_FORMAT),
                &vertex_layouts,
                (&vertex, &fragment),
                mode.topology(),
            );
            (mode, pipeline)
        })
        .collect();

    Ok(ShaderProgram {
        name: name.to_string(),
        pipelines,
        texture_layout,
        sampler_count,
    })
}

#[allow(clippy::too_many_arguments)]
pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    depth_format: Option<wgpu::TextureFormat>,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    (vertex, fragment): (&wgpu::ShaderModule, &wgpu::ShaderModule),
    topology: wgpu::PrimitiveTopology,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some("Render Pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: vertex,
            entry_point: Some("main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: fragment,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // OBJ exports do not agree on winding
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: Some(true),
            depth_compare: Some(wgpu::CompareFunction::Less),
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview_mask: None,
    })
}
