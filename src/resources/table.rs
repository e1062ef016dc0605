//! The named GPU resources a frame can refer to.

use std::collections::{HashMap, HashSet};

use crate::{
    data_structures::{material::Material, mesh::MeshAssembly},
    error::{ResourceError, ResourceKind},
    render::Backend,
    resources::texture::SheetInfo,
};

/// A texture on the GPU together with the image it was created from.
pub struct LoadedTexture<B: Backend> {
    pub texture: B::Texture,
    pub source: image::RgbaImage,
    pub sheet: Option<SheetInfo>,
}

impl<B: Backend> LoadedTexture<B> {
    /// Normalized `[u, v, width, height]` of a sheet tile, `None` for plain textures.
    pub fn tile_uv(&self, index: u32) -> Option<[f32; 4]> {
        self.sheet
            .as_ref()?
            .tile_uv(index, self.source.width(), self.source.height())
    }
}

/// Shaders, textures, materials and meshes by name, plus the active shader.
///
/// Names are unique per category: registering a taken name fails and leaves
/// the existing entry untouched.
pub struct ResourceTable<B: Backend> {
    active_shader: Option<String>,
    shaders: HashMap<String, B::Program>,
    textures: HashMap<String, LoadedTexture<B>>,
    materials: HashMap<String, Material>,
    meshes: HashMap<String, MeshAssembly>,
    material_libraries: HashSet<String>,
}

impl<B: Backend> Default for ResourceTable<B> {
    fn default() -> Self {
        Self {
            active_shader: None,
            shaders: HashMap::new(),
            textures: HashMap::new(),
            materials: HashMap::new(),
            meshes: HashMap::new(),
            material_libraries: HashSet::new(),
        }
    }
}

fn insert_unique<T>(
    map: &mut HashMap<String, T>,
    kind: ResourceKind,
    name: &str,
    value: T,
) -> Result<(), ResourceError> {
    if map.contains_key(name) {
        return Err(ResourceError::Duplicate {
            kind,
            name: name.to_string(),
        });
    }
    map.insert(name.to_string(), value);
    Ok(())
}

impl<B: Backend> ResourceTable<B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_shader(
        &mut self,
        name: &str,
        program: B::Program,
    ) -> Result<(), ResourceError> {
        insert_unique(&mut self.shaders, ResourceKind::Shader, name, program)
    }

    pub fn register_texture(
        &mut self,
        name: &str,
        texture: LoadedTexture<B>,
    ) -> Result<(), ResourceError> {
        insert_unique(&mut self.textures, ResourceKind::Texture, name, texture)
    }

    pub fn register_material(
        &mut self,
        name: &str,
        material: Material,
    ) -> Result<(), ResourceError> {
        insert_unique(&mut self.materials, ResourceKind::Material, name, material)
    }

    pub fn register_mesh(&mut self, name: &str, mesh: MeshAssembly) -> Result<(), ResourceError> {
        insert_unique(&mut self.meshes, ResourceKind::Mesh, name, mesh)
    }

    /// Switches the shader used by the next frame. Unknown names are ignored.
    pub fn set_active_shader(&mut self, name: &str) -> bool {
        if !self.shaders.contains_key(name) {
            log::warn!("Cannot activate shader `{}`: it is not loaded", name);
            return false;
        }
        self.active_shader = Some(name.to_string());
        true
    }

    pub fn is_ready(&self) -> bool {
        self.active_shader
            .as_ref()
            .is_some_and(|name| self.shaders.contains_key(name))
    }

    pub fn active_shader_name(&self) -> Option<&str> {
        self.active_shader.as_deref()
    }

    pub fn active_shader(&self) -> Result<&B::Program, ResourceError> {
        let name = self
            .active_shader
            .as_ref()
            .ok_or(ResourceError::NoActiveShader)?;
        self.shaders.get(name).ok_or_else(|| ResourceError::Lookup {
            kind: ResourceKind::Shader,
            name: name.clone(),
        })
    }

    pub fn shader(&self, name: &str) -> Option<&B::Program> {
        self.shaders.get(name)
    }

    pub fn texture(&self, name: &str) -> Option<&LoadedTexture<B>> {
        self.textures.get(name)
    }

    pub fn material(&self, name: &str) -> Option<&Material> {
        self.materials.get(name)
    }

    pub fn mesh(&self, name: &str) -> Option<&MeshAssembly> {
        self.meshes.get(name)
    }

    pub fn has_shader(&self, name: &str) -> bool {
        self.shaders.contains_key(name)
    }

    pub fn has_texture(&self, name: &str) -> bool {
        self.textures.contains_key(name)
    }

    pub fn has_mesh(&self, name: &str) -> bool {
        self.meshes.contains_key(name)
    }

    /// Marks a material library as requested. Returns `false` if it already was.
    pub fn request_material_library(&mut self, file: &str) -> bool {
        self.material_libraries.insert(file.to_string())
    }
}
