//! The renderer: resource table, scene graph and camera behind one backend.
//!
//! Loading entry points only register resources and place drawables; nothing
//! is drawn until [`Renderer::render`] runs on the frame tick.

use instant::Duration;

use crate::{
    camera::{Camera, CameraUniform, Projection},
    data_structures::{
        instance::{InstancedDrawable, Transform},
        mesh::{Geometry, MeshAssembly},
        scene_graph::{DrawableId, SceneGraph},
    },
    error::{RenderError, ResourceError, ResourceKind},
    render::{Backend, Frame, plan_frame},
    resources::{
        mtl, obj,
        shader::{ShaderInfo, ShaderSource},
        table::{LoadedTexture, ResourceTable},
        texture::SheetInfo,
    },
};

/// Result of [`Renderer::load_obj`].
#[derive(Debug, Clone, PartialEq)]
pub struct ObjLoad {
    pub mesh: MeshAssembly,
    /// `mtllib` files that were not requested before and still need loading.
    pub material_libraries: Vec<String>,
}

/// One instance of every part of a mesh, moved as a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshInstance {
    mesh: String,
    parts: Vec<(DrawableId, usize)>,
}

impl MeshInstance {
    pub fn mesh(&self) -> &str {
        &self.mesh
    }

    /// `(drawable, instance index)` per part.
    pub fn parts(&self) -> &[(DrawableId, usize)] {
        &self.parts
    }
}

pub struct Renderer<B: Backend> {
    backend: B,
    pub camera: Camera,
    pub projection: Projection,
    resources: ResourceTable<B>,
    scene: SceneGraph<B>,
}

impl<B: Backend> Renderer<B> {
    pub fn new(backend: B, camera: Camera, projection: Projection) -> Self {
        Self {
            backend,
            camera,
            projection,
            resources: ResourceTable::new(),
            scene: SceneGraph::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn resources(&self) -> &ResourceTable<B> {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut ResourceTable<B> {
        &mut self.resources
    }

    pub fn scene(&self) -> &SceneGraph<B> {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneGraph<B> {
        &mut self.scene
    }

    pub fn is_ready(&self) -> bool {
        self.resources.is_ready()
    }

    pub fn set_active_shader(&mut self, name: &str) -> bool {
        self.resources.set_active_shader(name)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.projection.resize(width, height);
    }

    /// Draws every placed drawable once with the active shader.
    pub fn render(&mut self, elapsed: Duration) -> Result<(), RenderError> {
        let camera = CameraUniform::new(&self.camera, &self.projection);
        let commands = plan_frame(&self.resources, &self.scene, camera)?;
        self.backend.submit(Frame { elapsed, commands })?;
        Ok(())
    }

    /// Validates and links a shader program, then registers it as `name`.
    pub fn load_shader(
        &mut self,
        name: &str,
        source: &ShaderSource,
        info: &ShaderInfo,
    ) -> Result<(), ResourceError> {
        if self.resources.has_shader(name) {
            return Err(ResourceError::Duplicate {
                kind: ResourceKind::Shader,
                name: name.to_string(),
            });
        }
        info.validate(name)?;
        let program = self.backend.link_program(name, source, info)?;
        self.resources.register_shader(name, program)?;
        log::info!("Loaded shader `{}`", name);
        Ok(())
    }

    /// Registers every material of an MTL library and returns their names.
    ///
    /// A material whose name is taken is skipped; the rest still load.
    pub fn load_materials(
        &mut self,
        library: &str,
        text: &str,
    ) -> Result<Vec<String>, ResourceError> {
        let parsed = mtl::parse(text)?;
        self.resources.request_material_library(library);
        let mut registered = Vec::with_capacity(parsed.materials.len());
        for (name, material) in parsed.materials {
            match self.resources.register_material(&name, material) {
                Ok(()) => registered.push(name),
                Err(e) => log::error!("{}: {}", library, e),
            }
        }
        log::info!("Loaded {} material(s) from `{}`", registered.len(), library);
        Ok(registered)
    }

    /// Parses an OBJ document into a mesh whose parts are placed at the scene root.
    ///
    /// The mesh is named by its `o` line, else by `default_name`. Named meshes are
    /// registered in the resource table; unnamed ones are only returned.
    pub fn load_obj(
        &mut self,
        text: &str,
        default_name: Option<&str>,
    ) -> Result<ObjLoad, ResourceError> {
        let model = obj::parse(text)?;
        let name = model.name.or_else(|| default_name.map(str::to_string));
        if let Some(name) = &name
            && self.resources.has_mesh(name)
        {
            return Err(ResourceError::Duplicate {
                kind: ResourceKind::Mesh,
                name: name.clone(),
            });
        }

        let root = self.scene.root();
        let mut mesh = MeshAssembly::new(name.clone());
        for (i, group) in model.groups.into_iter().enumerate() {
            let label = format!(
                "{}/{}",
                name.as_deref().unwrap_or("mesh"),
                group.name.clone().unwrap_or_else(|| i.to_string())
            );
            let mut drawable = InstancedDrawable::new(&self.backend, &label, &group.geometry);
            drawable.set_material(group.material);
            let id = self.scene.insert_drawable(drawable);
            self.scene.place(root, id)?;
            mesh.push(group.name, id);
        }

        if let Some(name) = &name {
            self.resources.register_mesh(name, mesh.clone())?;
            log::info!("Loaded mesh `{}` with {} part(s)", name, mesh.len());
        }

        let material_libraries = model
            .material_libraries
            .into_iter()
            .filter(|file| self.resources.request_material_library(file))
            .collect();
        Ok(ObjLoad {
            mesh,
            material_libraries,
        })
    }

    pub fn load_texture(
        &mut self,
        name: &str,
        image: image::RgbaImage,
        sheet: Option<SheetInfo>,
    ) -> Result<(), ResourceError> {
        if self.resources.has_texture(name) {
            return Err(ResourceError::Duplicate {
                kind: ResourceKind::Texture,
                name: name.to_string(),
            });
        }
        let texture = self.backend.create_texture(name, &image);
        self.resources.register_texture(
            name,
            LoadedTexture {
                texture,
                source: image,
                sheet,
            },
        )?;
        log::info!("Loaded texture `{}`", name);
        Ok(())
    }

    /// Uploads `geometry` as a new drawable. It is not drawn until placed in the scene.
    pub fn create_drawable(&mut self, label: &str, geometry: &Geometry) -> DrawableId {
        let drawable = InstancedDrawable::new(&self.backend, label, geometry);
        self.scene.insert_drawable(drawable)
    }

    pub fn add_instance(
        &mut self,
        drawable: DrawableId,
        transform: Option<Transform>,
    ) -> Result<usize, ResourceError> {
        let target = self.scene.drawable_or_err(drawable)?;
        Ok(target.add_instance(&self.backend, transform))
    }

    pub fn modify_instance(
        &mut self,
        drawable: DrawableId,
        index: usize,
        transform: Transform,
    ) -> Result<(), ResourceError> {
        let target = self.scene.drawable_or_err(drawable)?;
        target.modify_instance(&self.backend, index, transform)
    }

    /// Adds one instance to every part of mesh `name`.
    pub fn spawn_mesh(
        &mut self,
        name: &str,
        transform: Transform,
    ) -> Result<MeshInstance, ResourceError> {
        let drawables: Vec<DrawableId> = self
            .resources
            .mesh(name)
            .ok_or_else(|| ResourceError::Lookup {
                kind: ResourceKind::Mesh,
                name: name.to_string(),
            })?
            .drawables()
            .collect();
        let mut parts = Vec::with_capacity(drawables.len());
        for drawable in drawables {
            parts.push((drawable, self.add_instance(drawable, Some(transform))?));
        }
        Ok(MeshInstance {
            mesh: name.to_string(),
            parts,
        })
    }

    pub fn move_mesh(
        &mut self,
        instance: &MeshInstance,
        transform: Transform,
    ) -> Result<(), ResourceError> {
        for &(drawable, index) in instance.parts() {
            self.modify_instance(drawable, index, transform)?;
        }
        Ok(())
    }
}
