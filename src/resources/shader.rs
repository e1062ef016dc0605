//! Shader programs: GLSL sources plus a typed description of their interface.
//!
//! A shader `<id>` is made of `shaders/<id>Vertex.glsl`,
//! `shaders/<id>Fragment.glsl` and `json/<id>.json`. The JSON maps the
//! logical attribute and uniform names the renderer uses onto the names in
//! the GLSL code:
//!
//! ```json
//! {
//!     "attributes": { "vertexPosition": "aVertexPosition", "instanceMatrix": "aInstanceMatrix" },
//!     "uniforms": { "projectionMatrix": "uProjectionMatrix", "viewMatrix": "uViewMatrix" }
//! }
//! ```
//!
//! [`ShaderInfo::validate`] rejects a description the renderer cannot drive
//! before any GPU object is created.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::{error::ResourceError, resources::texture::load_string};

pub const VERTEX_POSITION: &str = "vertexPosition";
pub const TEXTURE_COORD: &str = "textureCoord";
pub const VERTEX_NORMAL: &str = "vertexNormal";
pub const INSTANCE_MATRIX: &str = "instanceMatrix";

pub const PROJECTION_MATRIX: &str = "projectionMatrix";
pub const VIEW_MATRIX: &str = "viewMatrix";

const REQUIRED_ATTRIBUTES: [&str; 2] = [VERTEX_POSITION, INSTANCE_MATRIX];
const OPTIONAL_ATTRIBUTES: [&str; 2] = [TEXTURE_COORD, VERTEX_NORMAL];
const REQUIRED_UNIFORMS: [&str; 2] = [PROJECTION_MATRIX, VIEW_MATRIX];

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ShaderInfo {
    pub attributes: BTreeMap<String, String>,
    pub uniforms: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderSource {
    pub vertex: String,
    pub fragment: String,
}

/// Shader inputs resolved to their `layout(location = N)` slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeLocations {
    pub position: u32,
    pub uv: Option<u32>,
    pub normal: Option<u32>,
    /// First of the four consecutive slots of the instance matrix.
    pub instance: u32,
}

impl ShaderInfo {
    pub fn from_json(name: &str, text: &str) -> Result<Self, ResourceError> {
        serde_json::from_str(text)
            .map_err(|e| ResourceError::invalid_shader(name, format!("malformed description: {e}")))
    }

    pub fn validate(&self, name: &str) -> Result<(), ResourceError> {
        for required in REQUIRED_ATTRIBUTES {
            if !self.attributes.contains_key(required) {
                return Err(ResourceError::invalid_shader(
                    name,
                    format!("attribute `{required}` is not declared"),
                ));
            }
        }
        if let Some(unknown) = self.attributes.keys().find(|attribute| {
            !REQUIRED_ATTRIBUTES.contains(&attribute.as_str())
                && !OPTIONAL_ATTRIBUTES.contains(&attribute.as_str())
        }) {
            return Err(ResourceError::invalid_shader(
                name,
                format!("attribute `{unknown}` has no vertex stream"),
            ));
        }
        for required in REQUIRED_UNIFORMS {
            if !self.uniforms.contains_key(required) {
                return Err(ResourceError::invalid_shader(
                    name,
                    format!("uniform `{required}` is not declared"),
                ));
            }
        }
        Ok(())
    }

    /// Number of texture units, from the consecutive `sampler0`, `sampler1`, ... uniforms.
    pub fn sampler_count(&self) -> u32 {
        (0..)
            .take_while(|k| self.uniforms.contains_key(&format!("sampler{k}")))
            .count() as u32
    }

    /// Checks the description against the GLSL code and resolves attribute slots.
    pub fn resolve(
        &self,
        name: &str,
        source: &ShaderSource,
    ) -> Result<AttributeLocations, ResourceError> {
        self.validate(name)?;
        for (logical, glsl) in &self.uniforms {
            let identifier = glsl.rsplit('.').next().unwrap_or(glsl);
            if !contains_identifier(&source.vertex, identifier)
                && !contains_identifier(&source.fragment, identifier)
            {
                return Err(ResourceError::invalid_shader(
                    name,
                    format!("uniform `{logical}` (`{glsl}`) does not occur in either stage"),
                ));
            }
        }

        let inputs = vertex_inputs(&source.vertex);
        let location = |logical: &str| -> Result<Option<u32>, ResourceError> {
            let Some(glsl) = self.attributes.get(logical) else {
                return Ok(None);
            };
            inputs
                .iter()
                .find(|(input, _)| input == glsl)
                .map(|(_, location)| Some(*location))
                .ok_or_else(|| {
                    ResourceError::invalid_shader(
                        name,
                        format!("attribute `{logical}` (`{glsl}`) has no `layout(location = N) in` declaration"),
                    )
                })
        };

        Ok(AttributeLocations {
            position: location(VERTEX_POSITION)?.unwrap_or_default(),
            uv: location(TEXTURE_COORD)?,
            normal: location(VERTEX_NORMAL)?,
            instance: location(INSTANCE_MATRIX)?.unwrap_or_default(),
        })
    }
}

impl ShaderSource {
    pub fn vertex_path(id: &str) -> String {
        format!("shaders/{id}Vertex.glsl")
    }

    pub fn fragment_path(id: &str) -> String {
        format!("shaders/{id}Fragment.glsl")
    }
}

pub fn info_path(id: &str) -> String {
    format!("json/{id}.json")
}

/// `(name, location)` of every `layout(location = N) in <type> <name>;` in `source`.
pub fn vertex_inputs(source: &str) -> Vec<(String, u32)> {
    let code: String = source
        .lines()
        .map(|line| line.split_once("//").map_or(line, |(code, _)| code))
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n");
    code.split(';')
        .filter_map(|statement| {
            let statement = statement.trim();
            let rest = statement.strip_prefix("layout")?.trim_start();
            let (qualifiers, declaration) = rest.strip_prefix('(')?.split_once(')')?;
            let location = qualifiers.split(',').find_map(|qualifier| {
                let (key, value) = qualifier.split_once('=')?;
                (key.trim() == "location").then(|| value.trim().parse::<u32>().ok())?
            })?;
            let mut tokens = declaration.split_whitespace();
            if tokens.next()? != "in" {
                return None;
            }
            let _ty = tokens.next()?;
            Some((tokens.next()?.to_string(), location))
        })
        .collect()
}

fn contains_identifier(source: &str, identifier: &str) -> bool {
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '_';
    source.match_indices(identifier).any(|(start, _)| {
        let before = source[..start].chars().next_back();
        let after = source[start + identifier.len()..].chars().next();
        !before.is_some_and(is_ident) && !after.is_some_and(is_ident)
    })
}

/// Fetches the sources and description of shader `id` concurrently.
pub async fn load_shader_files(id: &str) -> Result<(ShaderSource, ShaderInfo), ResourceError> {
    let vertex_path = ShaderSource::vertex_path(id);
    let fragment_path = ShaderSource::fragment_path(id);
    let info_path = info_path(id);
    let (vertex, fragment, info) = futures::join!(
        load_string(&vertex_path),
        load_string(&fragment_path),
        load_string(&info_path),
    );
    let source = ShaderSource {
        vertex: vertex.map_err(|e| ResourceError::load(&vertex_path, e))?,
        fragment: fragment.map_err(|e| ResourceError::load(&fragment_path, e))?,
    };
    let info = ShaderInfo::from_json(id, &info.map_err(|e| ResourceError::load(&info_path, e))?)?;
    Ok((source, info))
}
