use wayfarer::{
    ParseError,
    render::DrawMode,
    resources::{mtl, obj},
};

const TRIANGLE: &str = "\
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 0
vt 1 0
vt 0 1
vn 0 0 1
vn 0 0 1
vn 0 0 1
f 1/1/1 2/2/2 3/3/3
";

#[test]
fn single_triangle_produces_complete_streams() {
    let model = obj::parse(TRIANGLE).unwrap();
    assert_eq!(model.groups.len(), 1);

    let geometry = &model.groups[0].geometry;
    assert_eq!(geometry.mode, DrawMode::Triangles);
    assert_eq!(geometry.positions.len(), 3 * 4);
    assert_eq!(geometry.uvs.len(), 3 * 2);
    assert_eq!(geometry.normals.len(), 3 * 3);
    assert_eq!(geometry.indices.len(), 3);
    // w is always 1
    assert!(geometry.positions.chunks(4).all(|p| p[3] == 1.0));
    // v is flipped
    assert_eq!(geometry.uvs, vec![0.0, 1.0, 1.0, 1.0, 0.0, 0.0]);
}

#[test]
fn quad_is_fanned_into_two_triangles() {
    let text = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
    let geometry = &obj::parse(text).unwrap().groups[0].geometry;
    assert_eq!(geometry.indices, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(&geometry.positions[12..16], &[0.0, 0.0, 0.0, 1.0]);
    assert_eq!(&geometry.positions[20..24], &[0.0, 1.0, 0.0, 1.0]);
    assert!(!geometry.has_uvs());
    assert!(!geometry.has_normals());
}

#[test]
fn each_group_becomes_its_own_geometry() {
    let text = "\
o twins
v 0 0 0
v 1 0 0
v 0 1 0
g left
usemtl red
f 1 2 3
g right
usemtl blue
f 3 2 1
";
    let model = obj::parse(text).unwrap();
    assert_eq!(model.name.as_deref(), Some("twins"));
    assert_eq!(model.groups.len(), 2);
    for group in &model.groups {
        assert_eq!(group.geometry.index_range().count, 3);
    }
    assert_eq!(model.groups[0].name.as_deref(), Some("left"));
    assert_eq!(model.groups[0].material.as_deref(), Some("red"));
    assert_eq!(model.groups[1].name.as_deref(), Some("right"));
    assert_eq!(model.groups[1].material.as_deref(), Some("blue"));
}

#[test]
fn empty_groups_are_not_emitted() {
    let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\ng nothing\ng something\nf 1 2 3\n";
    let model = obj::parse(text).unwrap();
    assert_eq!(model.groups.len(), 1);
    assert_eq!(model.groups[0].name.as_deref(), Some("something"));
}

#[test]
fn comments_are_stripped_before_tokenizing() {
    let plain = obj::parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
    let commented = obj::parse(
        "# a triangle\nv 0 0 0 # origin\nv 1 0 0\nv 0 1 0\n\n   \nf 1 2 3 # the only face\n",
    )
    .unwrap();
    assert_eq!(plain, commented);
}

#[test]
fn material_libraries_are_listed_once() {
    let text = "mtllib a.mtl b.mtl\nmtllib a.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
    let model = obj::parse(text).unwrap();
    assert_eq!(model.material_libraries, vec!["a.mtl", "b.mtl"]);
}

#[test]
fn unsupported_keywords_are_skipped() {
    let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\ns off\nf 1 2 3\n";
    let model = obj::parse(text).unwrap();
    assert_eq!(model.ignored, vec![(4, "s".to_string())]);
    assert_eq!(model.groups.len(), 1);
}

#[test]
fn points_keep_their_own_mode() {
    let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\np 1 2 3\n";
    let geometry = &obj::parse(text).unwrap().groups[0].geometry;
    assert_eq!(geometry.mode, DrawMode::Points);
    assert_eq!(geometry.indices, vec![0, 1, 2]);
}

#[test]
fn reference_past_the_end_fails() {
    let err = obj::parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 4\n").unwrap_err();
    assert_eq!(
        err,
        ParseError::IndexOutOfBounds {
            line: 4,
            index: 4,
            stream: "vertex position",
        }
    );
}

#[test]
fn malformed_number_reports_its_line() {
    let err = obj::parse("v 0 0 0\nv 1 zero 0\n").unwrap_err();
    assert_eq!(
        err,
        ParseError::InvalidNumber {
            line: 2,
            token: "zero".to_string(),
        }
    );
}

#[test]
fn new_material_starts_from_defaults() {
    let library = mtl::parse("newmtl Foo\n").unwrap();
    let (name, material) = &library.materials[0];
    assert_eq!(name, "Foo");
    assert_eq!(material.illumination_model, 1);
    assert_eq!(material.dissolve_factor, 1.0);
    assert_eq!(material.specular_exponent, 1.0);
    assert_eq!(material.sharpness, 60.0);
    assert_eq!(material.refraction_index, 1.0);
    assert_eq!(material.ambient_color, [0.0; 3]);
    assert_eq!(material.diffuse_color, [0.0; 3]);
    assert_eq!(material.specular_color, [0.0; 3]);
    assert_eq!(material.transmission_filter, [0.0; 3]);
}

#[test]
fn trailing_comment_does_not_change_a_material() {
    let plain = mtl::parse("newmtl red\nKd 1.0 0.0 0.0\n").unwrap();
    let commented = mtl::parse("newmtl red\nKd 1.0 0.0 0.0 # red\n").unwrap();
    assert_eq!(plain, commented);
    assert_eq!(commented.materials[0].1.diffuse_color, [1.0, 0.0, 0.0]);
}

#[test]
fn properties_apply_to_the_latest_material() {
    let library = mtl::parse("newmtl a\nNs 5\nnewmtl b\nNs 7\nd 0.5\n").unwrap();
    assert_eq!(library.materials[0].1.specular_exponent, 5.0);
    assert_eq!(library.materials[0].1.dissolve_factor, 1.0);
    assert_eq!(library.materials[1].1.specular_exponent, 7.0);
    assert_eq!(library.materials[1].1.dissolve_factor, 0.5);
}

#[test]
fn property_before_newmtl_fails() {
    let err = mtl::parse("# header\nKd 1 1 1\nnewmtl late\n").unwrap_err();
    assert_eq!(
        err,
        ParseError::MissingMaterialContext {
            line: 2,
            keyword: "Kd".to_string(),
        }
    );
}
