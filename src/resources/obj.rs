//! Wavefront OBJ parsing.
//!
//! [`parse`] turns OBJ text into one [`Geometry`] per `g` group. The parser is
//! pure: creating drawables and resolving material libraries is left to
//! [`crate::renderer::Renderer::load_obj`].

use crate::{
    data_structures::mesh::Geometry,
    error::ParseError,
    render::DrawMode,
    resources::{Line, lines},
};

#[derive(Debug, Clone, PartialEq)]
pub struct ObjGroup {
    pub name: Option<String>,
    pub material: Option<String>,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjModel {
    /// Set by the `o` keyword.
    pub name: Option<String>,
    pub groups: Vec<ObjGroup>,
    /// `mtllib` files in order of first mention.
    pub material_libraries: Vec<String>,
    pub ignored: Vec<(usize, String)>,
}

#[derive(Debug, Clone, Copy)]
struct FaceVertex {
    position: usize,
    uv: Option<usize>,
    normal: Option<usize>,
}

/// Vertex references and indices of the group currently being read.
#[derive(Default)]
struct GroupBuilder {
    name: Option<String>,
    mode: DrawMode,
    vertices: Vec<FaceVertex>,
    indices: Vec<u32>,
}

impl GroupBuilder {
    fn push(&mut self, vertex: FaceVertex) -> u32 {
        self.vertices.push(vertex);
        (self.vertices.len() - 1) as u32
    }
}

#[derive(Default)]
struct Streams {
    positions: Vec<[f32; 4]>,
    uvs: Vec<[f32; 2]>,
    normals: Vec<[f32; 3]>,
}

pub fn parse(text: &str) -> Result<ObjModel, ParseError> {
    let mut model = ObjModel::default();
    let mut streams = Streams::default();
    let mut group = GroupBuilder::default();
    let mut material: Option<String> = None;

    for line in lines(text) {
        match line.keyword {
            "v" => {
                let [x, y, z] = line.floats::<3>()?;
                streams.positions.push([x, y, z, 1.0]);
            }
            "vt" => streams.uvs.push(line.floats::<2>()?),
            "vn" => streams.normals.push(line.floats::<3>()?),
            "f" => {
                if line.args.len() < 3 {
                    return Err(ParseError::DegenerateFace {
                        line: line.number,
                        found: line.args.len(),
                    });
                }
                group.mode = DrawMode::Triangles;
                let corners = line
                    .args
                    .iter()
                    .map(|token| face_vertex(&line, token, &streams))
                    .collect::<Result<Vec<_>, _>>()?;
                // fan around the first corner
                for i in 1..corners.len() - 1 {
                    for corner in [corners[0], corners[i], corners[i + 1]] {
                        let index = group.push(corner);
                        group.indices.push(index);
                    }
                }
            }
            "p" => {
                line.arg(0)?;
                group.mode = DrawMode::Points;
                for token in &line.args {
                    let index = group.push(face_vertex(&line, token, &streams)?);
                    group.indices.push(index);
                }
            }
            "l" => {
                line.arg(1)?;
                group.mode = DrawMode::Lines;
                let first = group.vertices.len() as u32;
                for token in &line.args {
                    group.push(face_vertex(&line, token, &streams)?);
                }
                for i in 0..line.args.len() as u32 - 1 {
                    group.indices.extend([first + i, first + i + 1]);
                }
            }
            "g" => {
                flush(&mut model, &mut group, &streams, &material);
                group.name = Some(line.rest()).filter(|name| !name.is_empty());
            }
            "o" => model.name = Some(line.rest()).filter(|name| !name.is_empty()),
            "usemtl" => material = Some(line.rest()).filter(|name| !name.is_empty()),
            "mtllib" => {
                line.arg(0)?;
                for file in &line.args {
                    if !model.material_libraries.iter().any(|known| known == file) {
                        model.material_libraries.push(file.to_string());
                    }
                }
            }
            other => {
                log::debug!("line {}: ignoring unsupported OBJ keyword `{}`", line.number, other);
                model.ignored.push((line.number, other.to_string()));
            }
        }
    }
    flush(&mut model, &mut group, &streams, &material);

    Ok(model)
}

/// Emits the current group if it has indices, then resets the builder.
///
/// The builder is cleared for every draw mode and the mode falls back to
/// triangles, so no state leaks into the next group.
fn flush(
    model: &mut ObjModel,
    group: &mut GroupBuilder,
    streams: &Streams,
    material: &Option<String>,
) {
    let builder = std::mem::take(group);
    if builder.indices.is_empty() {
        return;
    }

    let with_uvs = builder.vertices.iter().any(|vertex| vertex.uv.is_some());
    let with_normals = builder.vertices.iter().any(|vertex| vertex.normal.is_some());

    let mut positions = Vec::with_capacity(builder.vertices.len() * 4);
    let mut uvs = Vec::new();
    let mut normals = Vec::new();
    for vertex in &builder.vertices {
        positions.extend_from_slice(&streams.positions[vertex.position]);
        if with_uvs {
            let [u, v] = vertex.uv.map(|uv| streams.uvs[uv]).unwrap_or([0.0, 1.0]);
            uvs.extend_from_slice(&[u, 1.0 - v]);
        }
        if with_normals {
            let normal = vertex
                .normal
                .map(|normal| streams.normals[normal])
                .unwrap_or_default();
            normals.extend_from_slice(&normal);
        }
    }

    model.groups.push(ObjGroup {
        name: builder.name,
        material: material.clone(),
        geometry: Geometry::new(builder.mode, positions, uvs, normals, builder.indices),
    });
}

fn face_vertex(line: &Line<'_>, token: &str, streams: &Streams) -> Result<FaceVertex, ParseError> {
    let mut parts = token.split('/');
    let position = parts
        .next()
        .filter(|part| !part.is_empty())
        .ok_or_else(|| line.invalid(token))?;
    let uv = parts.next().filter(|part| !part.is_empty());
    let normal = parts.next().filter(|part| !part.is_empty());

    Ok(FaceVertex {
        position: resolve(line, position, streams.positions.len(), "vertex position")?,
        uv: uv
            .map(|uv| resolve(line, uv, streams.uvs.len(), "texture coordinate"))
            .transpose()?,
        normal: normal
            .map(|normal| resolve(line, normal, streams.normals.len(), "vertex normal"))
            .transpose()?,
    })
}

/// Maps a 1-based (or negative, relative) OBJ index onto a 0-based one.
fn resolve(
    line: &Line<'_>,
    token: &str,
    len: usize,
    stream: &'static str,
) -> Result<usize, ParseError> {
    let index = token.parse::<i64>().map_err(|_| line.invalid(token))?;
    let resolved = match index {
        i if i > 0 => i - 1,
        i if i < 0 => len as i64 + i,
        _ => -1,
    };
    if resolved < 0 || resolved >= len as i64 {
        return Err(ParseError::IndexOutOfBounds {
            line: line.number,
            index,
            stream,
        });
    }
    Ok(resolved as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\n";

    #[test]
    fn negative_indices_count_from_the_end() {
        let model = parse(&format!("{TRIANGLE}f -3 -2 -1\n")).unwrap();
        let geometry = &model.groups[0].geometry;
        assert_eq!(&geometry.positions[4..8], &[1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn zero_index_is_out_of_bounds() {
        let err = parse(&format!("{TRIANGLE}f 0 1 2\n")).unwrap_err();
        assert!(matches!(err, ParseError::IndexOutOfBounds { line: 4, index: 0, .. }));
    }

    #[test]
    fn two_vertex_face_is_degenerate() {
        let err = parse(&format!("{TRIANGLE}f 1 2\n")).unwrap_err();
        assert_eq!(err, ParseError::DegenerateFace { line: 4, found: 2 });
    }

    #[test]
    fn mode_resets_after_line_group() {
        let text = format!("{TRIANGLE}g edges\nl 1 2 3\ng faces\nf 1 2 3\n");
        let model = parse(&text).unwrap();
        assert_eq!(model.groups[0].geometry.mode, DrawMode::Lines);
        assert_eq!(model.groups[0].geometry.indices, vec![0, 1, 1, 2]);
        assert_eq!(model.groups[1].geometry.mode, DrawMode::Triangles);
        assert_eq!(model.groups[1].geometry.indices, vec![0, 1, 2]);
    }

    #[test]
    fn missing_uvs_are_zero_filled_when_some_exist() {
        let text = format!("{TRIANGLE}vt 0.5 0.25\nf 1/1 2 3\n");
        let geometry = &parse(&text).unwrap().groups[0].geometry;
        assert_eq!(geometry.uvs, vec![0.5, 0.75, 0.0, 0.0, 0.0, 0.0]);
    }
}
