//! Instanced drawables and per-instance transforms.
//!
//! An [`InstancedDrawable`] is one vertex/index set that is drawn once per
//! stored transform in a single draw call. The transforms live twice: as a
//! CPU copy used for reads and as a GPU buffer the vertex shader consumes.

use cgmath::One;

use crate::{
    data_structures::mesh::Geometry,
    error::ResourceError,
    render::{Backend, DrawMode, IndexRange},
};

/// Floats per instance: one column-major 4x4 matrix.
pub const INSTANCE_STRIDE: usize = 16;

/// A column-major 4x4 model matrix, as stored in the instance buffer.
pub type Transform = [f32; INSTANCE_STRIDE];

#[rustfmt::skip]
pub const IDENTITY: Transform = [
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 1.0, 0.0,
    0.0, 0.0, 0.0, 1.0,
];

/// Per-instance placement: position, rotation (as quaternion), and scale.
///
/// A convenience to build [`Transform`]s without writing matrices by hand.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Instance {
    /// Identity placement (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn to_transform(&self) -> Transform {
        matrix_to_transform(self.to_matrix())
    }
}

impl From<cgmath::Vector3<f32>> for Instance {
    fn from(position: cgmath::Vector3<f32>) -> Self {
        Instance {
            position,
            ..Default::default()
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

pub fn matrix_to_transform(matrix: cgmath::Matrix4<f32>) -> Transform {
    let columns: [[f32; 4]; 4] = matrix.into();
    bytemuck::cast(columns)
}

/// A vertex array plus a growable array of instance transforms.
///
/// `instance_count()` always equals the number of 16-float transforms held,
/// and the GPU buffer mirrors the CPU copy after every mutation.
pub struct InstancedDrawable<B: Backend> {
    mode: DrawMode,
    index: IndexRange,
    vertex_array: B::VertexArray,
    instance_buffer: B::InstanceBuffer,
    instance_data: Vec<f32>,
    textures: Vec<String>,
    material: Option<String>,
}

impl<B: Backend> InstancedDrawable<B> {
    /// Uploads `geometry` and starts with zero instances.
    pub fn new(backend: &B, label: &str, geometry: &Geometry) -> Self {
        let vertex_array = backend.create_vertex_array(label, geometry);
        let instance_buffer = backend.create_instance_buffer(label, &[]);
        Self {
            mode: geometry.mode,
            index: geometry.index_range(),
            vertex_array,
            instance_buffer,
            instance_data: Vec::new(),
            textures: Vec::new(),
            material: None,
        }
    }

    /// Appends a transform (identity when `None`) and returns its index.
    ///
    /// The whole instance buffer is uploaded again.
    pub fn add_instance(&mut self, backend: &B, transform: Option<Transform>) -> usize {
        let index = self.instance_count();
        self.instance_data
            .extend_from_slice(&transform.unwrap_or(IDENTITY));
        backend.upload_instances(&mut self.instance_buffer, &self.instance_data);
        index
    }

    /// Replaces the transform at `index`, uploading only its 16 floats.
    pub fn modify_instance(
        &mut self,
        backend: &B,
        index: usize,
        transform: Transform,
    ) -> Result<(), ResourceError> {
        let range = self.instance_range(index)?;
        let offset = range.start;
        self.instance_data[range].copy_from_slice(&transform);
        backend.update_instances(&mut self.instance_buffer, offset, &transform);
        Ok(())
    }

    pub fn instance_data(&self, index: usize) -> Result<Transform, ResourceError> {
        let range = self.instance_range(index)?;
        let mut transform = [0.0; INSTANCE_STRIDE];
        transform.copy_from_slice(&self.instance_data[range]);
        Ok(transform)
    }

    fn instance_range(&self, index: usize) -> Result<std::ops::Range<usize>, ResourceError> {
        let count = self.instance_count();
        if index >= count {
            return Err(ResourceError::IndexOutOfRange { index, count });
        }
        let start = index * INSTANCE_STRIDE;
        Ok(start..start + INSTANCE_STRIDE)
    }

    pub fn instance_count(&self) -> usize {
        self.instance_data.len() / INSTANCE_STRIDE
    }

    /// All transforms, back to back.
    pub fn instances(&self) -> &[f32] {
        &self.instance_data
    }

    pub fn set_material(&mut self, material: Option<String>) {
        self.material = material;
    }

    pub fn material(&self) -> Option<&str> {
        self.material.as_deref()
    }

    /// Binds `texture` to the next free sampler unit.
    pub fn add_texture(&mut self, texture: impl Into<String>) {
        self.textures.push(texture.into());
    }

    pub fn textures(&self) -> &[String] {
        &self.textures
    }

    pub fn mode(&self) -> DrawMode {
        self.mode
    }

    pub fn index_range(&self) -> IndexRange {
        self.index
    }

    pub fn vertex_array(&self) -> &B::VertexArray {
        &self.vertex_array
    }

    pub fn instance_buffer(&self) -> &B::InstanceBuffer {
        &self.instance_buffer
    }
}
