//! Start-up configuration read from `json/bootstrap.json`.
//!
//! ```json
//! {
//!     "shaders": ["color"],
//!     "active_shader": "color",
//!     "object_files": ["objects/cube.obj"],
//!     "image_files": ["images/terrain_tilesheet.png"],
//!     "renderer": { "fov_degrees": 60.0 }
//! }
//! ```
//!
//! Every field is optional.

use instant::Duration;
use serde::Deserialize;

pub const BOOTSTRAP_FILE: &str = "json/bootstrap.json";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Bootstrap {
    pub shaders: Vec<String>,
    /// Shader activated once it is loaded. Defaults to the first of `shaders`.
    pub active_shader: Option<String>,
    pub object_files: Vec<String>,
    pub image_files: Vec<String>,
    pub renderer: RendererSettings,
}

impl Bootstrap {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn active_shader(&self) -> Option<&str> {
        self.active_shader
            .as_deref()
            .or_else(|| self.shaders.first().map(String::as_str))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    pub clear_colour: [f64; 4],
    pub fov_degrees: f32,
    pub znear: f32,
    pub zfar: f32,
    pub camera_position: [f32; 3],
    pub camera_forward: [f32; 3],
    pub camera_speed: f32,
    pub mouse_sensitivity: f32,
    pub ready_timeout_secs: u64,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            clear_colour: [0.1, 0.1, 0.1, 1.0],
            fov_degrees: 45.0,
            znear: 0.1,
            zfar: 1000.0,
            camera_position: [0.0, 5.0, 10.0],
            camera_forward: [0.0, -0.3, -1.0],
            camera_speed: 10.0,
            mouse_sensitivity: 0.4,
            ready_timeout_secs: 30,
        }
    }
}

impl RendererSettings {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    pub fn clear_colour(&self) -> wgpu::Color {
        let [r, g, b, a] = self.clear_colour;
        wgpu::Color { r, g, b, a }
    }
}
