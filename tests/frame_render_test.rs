use instant::Duration;
use wayfarer::{
    RenderError,
    data_structures::{
        instance::{IDENTITY, InstancedDrawable},
        material::{Material, MaterialUniform},
        mesh::Geometry,
    },
    render::{DrawMode, plan_frame},
};

use crate::common::test_utils::{Step, renderer, ready_renderer, translation, triangle};

mod common;

#[test]
fn rendering_before_a_shader_is_active_is_refused() {
    let mut renderer = renderer();
    let id = renderer.create_drawable("lonely", &triangle());
    let root = renderer.scene().root();
    renderer.scene_mut().place(root, id).unwrap();

    assert!(!renderer.is_ready());
    assert!(matches!(
        renderer.render(Duration::ZERO),
        Err(RenderError::NotReady)
    ));
    assert!(renderer.backend().frames.is_empty());
}

#[test]
fn frame_starts_with_clear_program_and_camera() {
    let mut renderer = ready_renderer();
    renderer.render(Duration::from_millis(16)).unwrap();

    assert_eq!(
        renderer.backend().last_frame(),
        &[
            Step::Clear,
            Step::UseProgram("color".to_string()),
            Step::CameraUniforms,
        ]
    );
}

#[test]
fn parents_are_drawn_before_children() {
    let mut renderer = ready_renderer();
    let root = renderer.scene().root();
    let child = renderer.scene_mut().add_node(root).unwrap();
    let grandchild = renderer.scene_mut().add_node(child).unwrap();

    // inserted deepest first so insertion order cannot explain the result
    let c = renderer.create_drawable("c", &triangle());
    let b = renderer.create_drawable("b", &triangle());
    let a = renderer.create_drawable("a", &triangle());
    renderer.scene_mut().place(grandchild, c).unwrap();
    renderer.scene_mut().place(child, b).unwrap();
    renderer.scene_mut().place(root, a).unwrap();

    renderer.render(Duration::ZERO).unwrap();
    renderer.render(Duration::ZERO).unwrap();

    assert_eq!(renderer.backend().frames.len(), 2);
    assert_eq!(renderer.backend().draw_order(), vec![a, b, c]);
}

#[test]
fn siblings_keep_insertion_order() {
    let mut renderer = ready_renderer();
    let root = renderer.scene().root();
    let left = renderer.scene_mut().add_node(root).unwrap();
    let right = renderer.scene_mut().add_node(root).unwrap();
    let deep = renderer.scene_mut().add_node(left).unwrap();

    let in_deep = renderer.create_drawable("deep", &triangle());
    let in_right = renderer.create_drawable("right", &triangle());
    let in_left = renderer.create_drawable("left", &triangle());
    renderer.scene_mut().place(deep, in_deep).unwrap();
    renderer.scene_mut().place(right, in_right).unwrap();
    renderer.scene_mut().place(left, in_left).unwrap();

    renderer.render(Duration::ZERO).unwrap();
    assert_eq!(
        renderer.backend().draw_order(),
        vec![in_left, in_right, in_deep]
    );
}

#[test]
fn unplaced_drawables_are_not_drawn() {
    let mut renderer = ready_renderer();
    let placed = renderer.create_drawable("placed", &triangle());
    renderer.create_drawable("floating", &triangle());
    let root = renderer.scene().root();
    renderer.scene_mut().place(root, placed).unwrap();

    renderer.render(Duration::ZERO).unwrap();
    assert_eq!(renderer.backend().draw_order(), vec![placed]);
}

#[test]
fn a_drawable_cannot_be_placed_twice() {
    let mut renderer = ready_renderer();
    let root = renderer.scene().root();
    let child = renderer.scene_mut().add_node(root).unwrap();
    let id = renderer.create_drawable("once", &triangle());

    renderer.scene_mut().place(root, id).unwrap();
    assert!(renderer.scene_mut().place(child, id).is_err());
    assert_eq!(renderer.scene().placement(id), Some(root));

    renderer.render(Duration::ZERO).unwrap();
    assert_eq!(renderer.backend().draw_order(), vec![id]);
}

#[test]
fn draw_uses_instance_count_and_index_range() {
    let mut renderer = ready_renderer();
    let id = renderer.create_drawable("tri", &triangle());
    let root = renderer.scene().root();
    renderer.scene_mut().place(root, id).unwrap();
    renderer.add_instance(id, None).unwrap();
    renderer.add_instance(id, Some(translation(1.0, 0.0, 0.0))).unwrap();

    renderer.render(Duration::ZERO).unwrap();
    let draw = renderer.backend().last_frame().last().cloned();
    assert_eq!(
        draw,
        Some(Step::Draw {
            mode: DrawMode::Triangles,
            index: triangle().index_range(),
            instances: 2,
        })
    );
}

#[test]
fn line_loops_are_closed() {
    let mut renderer = ready_renderer();
    let outline = Geometry::new(
        DrawMode::LineLoop,
        vec![0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0],
        Vec::new(),
        Vec::new(),
        vec![0, 1, 2],
    );
    assert_eq!(outline.indices, vec![0, 1, 2, 0]);

    let id = renderer.create_drawable("outline", &outline);
    let root = renderer.scene().root();
    renderer.scene_mut().place(root, id).unwrap();
    renderer.render(Duration::ZERO).unwrap();

    let Some(Step::Draw { mode, index, .. }) = renderer.backend().last_frame().last() else {
        panic!("no draw recorded");
    };
    assert_eq!(*mode, DrawMode::LineLoop);
    assert_eq!(index.count, 4);
}

#[test]
fn known_material_is_uploaded_and_unknown_is_skipped() {
    let mut renderer = ready_renderer();
    let red = Material {
        diffuse_color: [1.0, 0.0, 0.0],
        ..Default::default()
    };
    renderer
        .resources_mut()
        .register_material("red", red.clone())
        .unwrap();

    let root = renderer.scene().root();
    let known = renderer.create_drawable("known", &triangle());
    let unknown = renderer.create_drawable("unknown", &triangle());
    renderer
        .scene_mut()
        .drawable_mut(known)
        .unwrap()
        .set_material(Some("red".to_string()));
    renderer
        .scene_mut()
        .drawable_mut(unknown)
        .unwrap()
        .set_material(Some("missing".to_string()));
    renderer.scene_mut().place(root, known).unwrap();
    renderer.scene_mut().place(root, unknown).unwrap();

    renderer.render(Duration::ZERO).unwrap();
    let frame = renderer.backend().last_frame();
    let materials: Vec<_> = frame
        .iter()
        .filter(|step| matches!(step, Step::Material(_)))
        .collect();
    assert_eq!(materials, vec![&Step::Material(MaterialUniform::from(&red))]);

    // the skipped material does not stop the draw
    let draws = frame
        .iter()
        .filter(|step| matches!(step, Step::Draw { .. }))
        .count();
    assert_eq!(draws, 2);
}

#[test]
fn missing_textures_leave_their_unit_unbound() {
    let mut renderer = ready_renderer();
    renderer
        .load_texture("grass", image::RgbaImage::new(4, 4), None)
        .unwrap();

    let id = renderer.create_drawable("ground", &triangle());
    let drawable = renderer.scene_mut().drawable_mut(id).unwrap();
    drawable.add_texture("grass");
    drawable.add_texture("stone");
    let root = renderer.scene().root();
    renderer.scene_mut().place(root, id).unwrap();

    renderer.render(Duration::ZERO).unwrap();
    let textures: Vec<_> = renderer
        .backend()
        .last_frame()
        .iter()
        .filter(|step| matches!(step, Step::Texture { .. }))
        .cloned()
        .collect();
    assert_eq!(
        textures,
        vec![Step::Texture {
            unit: 0,
            name: "grass".to_string(),
        }]
    );
}

#[test]
fn planning_reads_the_scene_directly() {
    let renderer = ready_renderer();
    let backend = common::test_utils::HeadlessBackend::new();
    let mut scene = wayfarer::data_structures::scene_graph::SceneGraph::new();
    let mut drawable = InstancedDrawable::new(&backend, "tri", &triangle());
    drawable.add_instance(&backend, Some(IDENTITY));
    let id = scene.insert_drawable(drawable);
    scene.place(scene.root(), id).unwrap();

    let camera = wayfarer::camera::CameraUniform::new(&renderer.camera, &renderer.projection);
    let commands = plan_frame(renderer.resources(), &scene, camera).unwrap();
    // clear, program, camera, bind, draw
    assert_eq!(commands.len(), 5);
}
