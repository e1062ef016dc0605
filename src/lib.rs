//! wayfarer
//!
//! An instanced mesh renderer for a browser-first 3D game client. Meshes,
//! materials, textures and shader programs are loaded from plain text assets
//! (Wavefront OBJ/MTL, GLSL, JSON), registered by name and drawn every frame
//! by walking a scene graph. WebGL2 is the baseline; native builds run on
//! wgpu's primary backends.
//!
//! High-level modules
//! - `app`: window, event loop and background asset loading
//! - `camera`: camera, projection and the keyboard/mouse controller
//! - `config`: bootstrap manifest and renderer settings
//! - `context`: the wgpu backend that owns device, queue and surface
//! - `data_structures`: drawables, meshes, materials, scene graph, textures
//! - `error`: error types shared by the modules
//! - `pipelines`: GLSL programs linked into render pipelines
//! - `readiness`: waiting for the first drawable frame with a deadline
//! - `render`: the backend seam and per-frame command planning
//! - `renderer`: the renderer facade tying everything together
//! - `resources`: OBJ/MTL parsers, shader descriptions, loaders, resource table
//!

pub mod app;
pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod pipelines;
pub mod readiness;
pub mod render;
pub mod renderer;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use error::{ParseError, RenderError, ResourceError, SetupError};
pub use render::{Backend, DrawMode};
pub use renderer::Renderer;
