use wayfarer::{
    camera::{Camera, Projection},
    data_structures::{material::MaterialUniform, mesh::Geometry, scene_graph::DrawableId},
    error::ResourceError,
    render::{Backend, DrawMode, Frame, FrameCommand, IndexRange},
    renderer::Renderer,
    resources::shader::{ShaderInfo, ShaderSource},
};

/// A vertex array as the headless backend keeps it: the geometry it was created from.
#[derive(Debug, Clone)]
pub struct VertexArray {
    pub label: String,
    pub geometry: Geometry,
}

/// Instance data mirrored on the "GPU" together with how it got there.
#[derive(Debug, Clone, Default)]
pub struct InstanceBuffer {
    pub label: String,
    pub data: Vec<f32>,
    pub full_uploads: usize,
    /// `(offset, len)` in floats of every partial update.
    pub partial_updates: Vec<(usize, usize)>,
}

#[derive(Debug, Clone)]
pub struct Texture {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct Program {
    pub name: String,
    pub sampler_count: u32,
}

/// A submitted frame command with handles replaced by names.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Clear,
    UseProgram(String),
    CameraUniforms,
    Bind(DrawableId),
    Material(MaterialUniform),
    Texture { unit: u32, name: String },
    Draw {
        mode: DrawMode,
        index: IndexRange,
        instances: u32,
    },
}

/// Records everything the renderer asks of it instead of drawing.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    pub frames: Vec<Vec<Step>>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_frame(&self) -> &[Step] {
        self.frames.last().map(Vec::as_slice).unwrap_or_default()
    }

    /// Drawables in the order they were drawn in the last frame.
    pub fn draw_order(&self) -> Vec<DrawableId> {
        self.last_frame()
            .iter()
            .filter_map(|step| match step {
                Step::Bind(id) => Some(*id),
                _ => None,
            })
            .collect()
    }
}

impl Backend for HeadlessBackend {
    type VertexArray = VertexArray;
    type InstanceBuffer = InstanceBuffer;
    type Texture = Texture;
    type Program = Program;

    fn create_vertex_array(&self, label: &str, geometry: &Geometry) -> VertexArray {
        VertexArray {
            label: label.to_string(),
            geometry: geometry.clone(),
        }
    }

    fn create_instance_buffer(&self, label: &str, data: &[f32]) -> InstanceBuffer {
        InstanceBuffer {
            label: label.to_string(),
            data: data.to_vec(),
            ..Default::default()
        }
    }

    fn upload_instances(&self, buffer: &mut InstanceBuffer, data: &[f32]) {
        buffer.data = data.to_vec();
        buffer.full_uploads += 1;
    }

    fn update_instances(&self, buffer: &mut InstanceBuffer, offset: usize, data: &[f32]) {
        buffer.data[offset..offset + data.len()].copy_from_slice(data);
        buffer.partial_updates.push((offset, data.len()));
    }

    fn create_texture(&self, name: &str, image: &image::RgbaImage) -> Texture {
        Texture {
            name: name.to_string(),
            width: image.width(),
            height: image.height(),
        }
    }

    fn link_program(
        &self,
        name: &str,
        source: &ShaderSource,
        info: &ShaderInfo,
    ) -> Result<Program, ResourceError> {
        info.resolve(name, source)?;
        Ok(Program {
            name: name.to_string(),
            sampler_count: info.sampler_count(),
        })
    }

    fn submit(&mut self, frame: Frame<'_, Self>) -> anyhow::Result<()> {
        let steps = frame
            .commands
            .into_iter()
            .map(|command| match command {
                FrameCommand::Clear => Step::Clear,
                FrameCommand::UseProgram(program) => Step::UseProgram(program.name.clone()),
                FrameCommand::CameraUniforms(_) => Step::CameraUniforms,
                FrameCommand::BindVertexArray { drawable, .. } => Step::Bind(drawable),
                FrameCommand::MaterialUniforms(material) => Step::Material(material),
                FrameCommand::BindTexture { unit, texture } => Step::Texture {
                    unit,
                    name: texture.name.clone(),
                },
                FrameCommand::DrawInstanced {
                    mode,
                    index,
                    instance_count,
                } => Step::Draw {
                    mode,
                    index,
                    instances: instance_count,
                },
            })
            .collect();
        self.frames.push(steps);
        Ok(())
    }
}

pub const VERTEX_SHADER: &str = r#"#version 450
layout(location = 0) in vec4 aVertexPosition;
layout(location = 1) in vec2 aTextureCoord;
layout(location = 2) in vec3 aVertexNormal;
layout(location = 3) in vec4 aInstanceColumn0;
layout(location = 4) in vec4 aInstanceColumn1;
layout(location = 5) in vec4 aInstanceColumn2;
layout(location = 6) in vec4 aInstanceColumn3;

layout(set = 0, binding = 0) uniform Camera {
    mat4 uProjectionMatrix;
    mat4 uViewMatrix;
};

void main() {
    mat4 model = mat4(aInstanceColumn0, aInstanceColumn1, aInstanceColumn2, aInstanceColumn3);
    gl_Position = uProjectionMatrix * uViewMatrix * model * aVertexPosition;
}
"#;

pub const FRAGMENT_SHADER: &str = r#"#version 450
layout(set = 2, binding = 0) uniform texture2D sampler0;
layout(set = 2, binding = 1) uniform sampler sampler0Sampler;
layout(location = 0) out vec4 fragColor;

void main() {
    fragColor = texture(sampler2D(sampler0, sampler0Sampler), vec2(0.0));
}
"#;

pub const SHADER_INFO: &str = r#"{
    "attributes": {
        "vertexPosition": "aVertexPosition",
        "textureCoord": "aTextureCoord",
        "vertexNormal": "aVertexNormal",
        "instanceMatrix": "aInstanceColumn0"
    },
    "uniforms": {
        "projectionMatrix": "uProjectionMatrix",
        "viewMatrix": "uViewMatrix",
        "sampler0": "sampler0"
    }
}"#;

pub fn shader_source() -> ShaderSource {
    ShaderSource {
        vertex: VERTEX_SHADER.to_string(),
        fragment: FRAGMENT_SHADER.to_string(),
    }
}

pub fn shader_info() -> ShaderInfo {
    ShaderInfo::from_json("color", SHADER_INFO).expect("test shader description parses")
}

pub fn renderer() -> Renderer<HeadlessBackend> {
    Renderer::new(
        HeadlessBackend::new(),
        Camera::default(),
        Projection::new(800, 600, cgmath::Deg(45.0), 0.1, 100.0),
    )
}

/// A renderer with the `color` shader loaded and active.
pub fn ready_renderer() -> Renderer<HeadlessBackend> {
    let mut renderer = renderer();
    renderer
        .load_shader("color", &shader_source(), &shader_info())
        .expect("test shader loads");
    assert!(renderer.set_active_shader("color"));
    renderer
}

pub fn triangle() -> Geometry {
    Geometry::new(
        DrawMode::Triangles,
        vec![0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0],
        Vec::new(),
        Vec::new(),
        vec![0, 1, 2],
    )
}

/// A pure transform that only translates.
pub fn translation(x: f32, y: f32, z: f32) -> [f32; 16] {
    let mut transform = wayfarer::data_structures::instance::IDENTITY;
    transform[12] = x;
    transform[13] = y;
    transform[14] = z;
    transform
}
