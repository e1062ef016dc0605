//! Error types for parsing, resource management and frame submission.
//!
//! Parsers return [`ParseError`], the resource model returns [`ResourceError`],
//! a frame that cannot be planned or submitted yields [`RenderError`] and the
//! bootstrap readiness gate yields [`SetupError`]. Loaders and GPU glue use
//! `anyhow` and are wrapped into these at the boundary.

use std::fmt;

use instant::Duration;

/// A malformed line in an OBJ or MTL document. Lines are 1-based.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParseError {
    #[error("line {line}: `{keyword}` appears before any `newmtl` declaration")]
    MissingMaterialContext { line: usize, keyword: String },
    #[error("line {line}: `{keyword}` expects at least {expected} argument(s)")]
    MissingArgument {
        line: usize,
        keyword: String,
        expected: usize,
    },
    #[error("line {line}: `{token}` is not a valid number")]
    InvalidNumber { line: usize, token: String },
    #[error("line {line}: index {index} does not reference a declared {stream}")]
    IndexOutOfBounds {
        line: usize,
        index: i64,
        stream: &'static str,
    },
    #[error("line {line}: a face needs at least 3 vertices but has {found}")]
    DegenerateFace { line: usize, found: usize },
}

/// The category a named resource belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Shader,
    Texture,
    Material,
    Mesh,
    Drawable,
    SceneNode,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Shader => "shader",
            ResourceKind::Texture => "texture",
            ResourceKind::Material => "material",
            ResourceKind::Mesh => "mesh",
            ResourceKind::Drawable => "drawable",
            ResourceKind::SceneNode => "scene node",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("{kind} `{name}` is already registered")]
    Duplicate { kind: ResourceKind, name: String },
    #[error("no {kind} named `{name}` is registered")]
    Lookup { kind: ResourceKind, name: String },
    #[error("no active shader has been selected")]
    NoActiveShader,
    #[error("instance index {index} is out of range for {count} instance(s)")]
    IndexOutOfRange { index: usize, count: usize },
    #[error("shader `{name}` is unusable: {reason}")]
    InvalidShader { name: String, reason: String },
    #[error("failed to load `{path}`")]
    Load {
        path: String,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl ResourceError {
    pub(crate) fn invalid_shader(name: &str, reason: impl Into<String>) -> Self {
        ResourceError::InvalidShader {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn load(path: &str, source: anyhow::Error) -> Self {
        ResourceError::Load {
            path: path.to_string(),
            source,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("renderer is not ready: no active shader program is registered")]
    NotReady,
    #[error("frame submission failed")]
    Submit(#[from] anyhow::Error),
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SetupError {
    #[error("renderer was still not ready after {0:?}")]
    Timeout(Duration),
}
