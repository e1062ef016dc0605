//! Vertex streams and multi-part meshes.
//!
//! [`Geometry`] is the CPU side of a drawable: flat position, uv and normal
//! streams plus local indices. A [`MeshAssembly`] groups the drawables created
//! from one model file so they can be addressed by the model's name.

use crate::{
    data_structures::scene_graph::DrawableId,
    render::{DrawMode, IndexRange, IndexType},
};

pub const POSITION_COMPONENTS: usize = 4;
pub const UV_COMPONENTS: usize = 2;
pub const NORMAL_COMPONENTS: usize = 3;

/// Vertex streams of one drawable.
///
/// `uvs` and `normals` are either empty or hold one entry per vertex.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    pub mode: DrawMode,
    pub positions: Vec<f32>,
    pub uvs: Vec<f32>,
    pub normals: Vec<f32>,
    pub indices: Vec<u32>,
}

impl Geometry {
    pub fn new(
        mode: DrawMode,
        positions: Vec<f32>,
        uvs: Vec<f32>,
        normals: Vec<f32>,
        mut indices: Vec<u32>,
    ) -> Self {
        if mode == DrawMode::LineLoop
            && let (Some(&first), Some(&last)) = (indices.first(), indices.last())
            && (indices.len() < 2 || first != last)
        {
            indices.push(first);
        }
        Self {
            mode,
            positions,
            uvs,
            normals,
            indices,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / POSITION_COMPONENTS
    }

    pub fn has_uvs(&self) -> bool {
        !self.uvs.is_empty()
    }

    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty()
    }

    pub fn index_range(&self) -> IndexRange {
        IndexRange {
            count: self.indices.len() as u32,
            index_type: IndexType::for_vertex_count(self.vertex_count()),
            offset: 0,
        }
    }
}

/// A drawable inside an assembly, named after the `g` group it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshPart {
    pub name: Option<String>,
    pub drawable: DrawableId,
}

/// The drawables of one model, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshAssembly {
    name: Option<String>,
    parts: Vec<MeshPart>,
}

impl MeshAssembly {
    pub fn new(name: Option<String>) -> Self {
        Self {
            name,
            parts: Vec::new(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn push(&mut self, name: Option<String>, drawable: DrawableId) {
        self.parts.push(MeshPart { name, drawable });
    }

    pub fn parts(&self) -> &[MeshPart] {
        &self.parts
    }

    /// The first part named `name`.
    pub fn part(&self, name: &str) -> Option<DrawableId> {
        self.parts
            .iter()
            .find(|part| part.name.as_deref() == Some(name))
            .map(|part| part.drawable)
    }

    pub fn drawables(&self) -> impl Iterator<Item = DrawableId> + '_ {
        self.parts.iter().map(|part| part.drawable)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}
