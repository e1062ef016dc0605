//! Frame composition.
//!
//! The renderer never talks to the GPU directly. Every frame it walks the
//! scene graph and produces a flat list of [`FrameCommand`]s which a
//! [`Backend`] turns into real draw calls. [`crate::context::Context`] is the
//! wgpu backend; anything else implementing [`Backend`] (for example a
//! recording backend in tests) can stand in for it.
//!
//! # Key types
//!
//! - [`Backend`] creates GPU objects and submits frames
//! - [`FrameCommand`] is a single step of a frame
//! - [`DrawMode`] and [`IndexRange`] describe how a drawable is drawn
//!

use instant::Duration;

use crate::{
    camera::CameraUniform,
    data_structures::{
        material::MaterialUniform,
        mesh::Geometry,
        scene_graph::{DrawableId, SceneGraph},
    },
    error::{RenderError, ResourceError},
    resources::{
        shader::{ShaderInfo, ShaderSource},
        table::ResourceTable,
    },
};

/// Primitive assembly of a drawable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DrawMode {
    Points,
    Lines,
    /// Drawn as a strip. [`Geometry::new`] repeats the first index at the end.
    LineLoop,
    #[default]
    Triangles,
}

impl DrawMode {
    pub const ALL: [DrawMode; 4] = [
        DrawMode::Points,
        DrawMode::Lines,
        DrawMode::LineLoop,
        DrawMode::Triangles,
    ];

    pub fn topology(self) -> wgpu::PrimitiveTopology {
        match self {
            DrawMode::Points => wgpu::PrimitiveTopology::PointList,
            DrawMode::Lines => wgpu::PrimitiveTopology::LineList,
            DrawMode::LineLoop => wgpu::PrimitiveTopology::LineStrip,
            DrawMode::Triangles => wgpu::PrimitiveTopology::TriangleList,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexType {
    #[default]
    U16,
    U32,
}

impl IndexType {
    /// Picks the narrowest type able to address `vertex_count` vertices.
    pub fn for_vertex_count(vertex_count: usize) -> Self {
        if vertex_count <= u16::MAX as usize + 1 {
            IndexType::U16
        } else {
            IndexType::U32
        }
    }

    pub fn size(self) -> u64 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

impl From<IndexType> for wgpu::IndexFormat {
    fn from(value: IndexType) -> Self {
        match value {
            IndexType::U16 => wgpu::IndexFormat::Uint16,
            IndexType::U32 => wgpu::IndexFormat::Uint32,
        }
    }
}

/// The slice of the index buffer a drawable draws. `offset` is in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexRange {
    pub count: u32,
    pub index_type: IndexType,
    pub offset: u64,
}

impl IndexRange {
    /// Index range as element indices rather than bytes.
    pub fn elements(&self) -> std::ops::Range<u32> {
        let first = (self.offset / self.index_type.size()) as u32;
        first..first + self.count
    }
}

/// Everything the resource model needs from a GPU.
///
/// Handles are owned by the resource table and the scene graph. The backend
/// only borrows them back while a frame is submitted.
pub trait Backend: Sized {
    type VertexArray;
    type InstanceBuffer;
    type Texture;
    type Program;

    fn create_vertex_array(&self, label: &str, geometry: &Geometry) -> Self::VertexArray;

    fn create_instance_buffer(&self, label: &str, data: &[f32]) -> Self::InstanceBuffer;

    /// Replaces the whole content of `buffer` with `data`, growing it if needed.
    fn upload_instances(&self, buffer: &mut Self::InstanceBuffer, data: &[f32]);

    /// Overwrites `data.len()` floats starting at float `offset`.
    fn update_instances(&self, buffer: &mut Self::InstanceBuffer, offset: usize, data: &[f32]);

    fn create_texture(&self, name: &str, image: &image::RgbaImage) -> Self::Texture;

    fn link_program(
        &self,
        name: &str,
        source: &ShaderSource,
        info: &ShaderInfo,
    ) -> Result<Self::Program, ResourceError>;

    fn submit(&mut self, frame: Frame<'_, Self>) -> anyhow::Result<()>;
}

/// One step of a frame. Commands are executed in order.
pub enum FrameCommand<'a, B: Backend> {
    Clear,
    UseProgram(&'a B::Program),
    CameraUniforms(CameraUniform),
    /// Starts a new drawable. Material and textures fall back to defaults until set.
    BindVertexArray {
        drawable: DrawableId,
        vertex_array: &'a B::VertexArray,
        instances: &'a B::InstanceBuffer,
    },
    MaterialUniforms(MaterialUniform),
    BindTexture {
        unit: u32,
        texture: &'a B::Texture,
    },
    DrawInstanced {
        mode: DrawMode,
        index: IndexRange,
        instance_count: u32,
    },
}

pub struct Frame<'a, B: Backend> {
    pub elapsed: Duration,
    pub commands: Vec<FrameCommand<'a, B>>,
}

/// Builds the command list for one frame.
///
/// Drawables are visited breadth first from the root, children in insertion
/// order. A material or texture that does not resolve in `resources` is
/// skipped and the drawable is drawn with the backend defaults.
pub fn plan_frame<'a, B: Backend>(
    resources: &'a ResourceTable<B>,
    scene: &'a SceneGraph<B>,
    camera: CameraUniform,
) -> Result<Vec<FrameCommand<'a, B>>, RenderError> {
    let program = resources
        .active_shader()
        .map_err(|_| RenderError::NotReady)?;

    let mut commands = vec![
        FrameCommand::Clear,
        FrameCommand::UseProgram(program),
        FrameCommand::CameraUniforms(camera),
    ];

    for drawable_id in scene.breadth_first() {
        let Some(drawable) = scene.drawable(drawable_id) else {
            continue;
        };
        commands.push(FrameCommand::BindVertexArray {
            drawable: drawable_id,
            vertex_array: drawable.vertex_array(),
            instances: drawable.instance_buffer(),
        });
        if let Some(material) = drawable.material().and_then(|name| resources.material(name)) {
            commands.push(FrameCommand::MaterialUniforms(material.into()));
        }
        for (unit, name) in drawable.textures().iter().enumerate() {
            match resources.texture(name) {
                Some(texture) => commands.push(FrameCommand::BindTexture {
                    unit: unit as u32,
                    texture: &texture.texture,
                }),
                None => log::debug!(
                    "Texture `{}` is not loaded, unit {} keeps its default",
                    name,
                    unit
                ),
            }
        }
        commands.push(FrameCommand::DrawInstanced {
            mode: drawable.mode(),
            index: drawable.index_range(),
            instance_count: drawable.instance_count() as u32,
        });
    }

    Ok(commands)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_type_switches_past_u16_range() {
        assert_eq!(IndexType::for_vertex_count(3), IndexType::U16);
        assert_eq!(IndexType::for_vertex_count(65_536), IndexType::U16);
        assert_eq!(IndexType::for_vertex_count(65_537), IndexType::U32);
    }

    #[test]
    fn index_range_elements_honour_byte_offset() {
        let range = IndexRange {
            count: 6,
            index_type: IndexType::U32,
            offset: 12,
        };
        assert_eq!(range.elements(), 3..9);
    }
}
