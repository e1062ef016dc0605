//! Engine data structures: drawables, meshes, materials, scene graph and textures.
//!
//! - `instance` holds instanced drawables and per-instance transforms
//! - `material` contains MTL materials and their uniform layout
//! - `mesh` contains vertex streams and multi-part mesh assemblies
//! - `scene_graph` enables hierarchical scene organization
//! - `texture` contains the GPU texture wrapper and creation utilities

pub mod instance;
pub mod material;
pub mod mesh;
pub mod scene_graph;
pub mod texture;
