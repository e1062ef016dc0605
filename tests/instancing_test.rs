use cgmath::{Deg, Quaternion, Rotation3, Vector3};
use wayfarer::{
    ResourceError,
    data_structures::instance::{IDENTITY, INSTANCE_STRIDE, Instance, InstancedDrawable},
};

use crate::common::test_utils::{HeadlessBackend, translation, triangle};

mod common;

#[test]
fn n_additions_give_n_instances() {
    let backend = HeadlessBackend::new();
    let mut drawable = InstancedDrawable::new(&backend, "tri", &triangle());
    assert_eq!(drawable.instance_count(), 0);

    for n in 1..=5 {
        let index = drawable.add_instance(&backend, Some(translation(n as f32, 0.0, 0.0)));
        assert_eq!(index, n - 1);
        assert_eq!(drawable.instance_count(), n);
        assert_eq!(drawable.instances().len(), INSTANCE_STRIDE * n);
    }
    assert_eq!(drawable.instance_buffer().data, drawable.instances());
    assert_eq!(drawable.instance_buffer().full_uploads, 5);
}

#[test]
fn missing_transform_defaults_to_identity() {
    let backend = HeadlessBackend::new();
    let mut drawable = InstancedDrawable::new(&backend, "tri", &triangle());
    drawable.add_instance(&backend, None);
    assert_eq!(drawable.instance_data(0).unwrap(), IDENTITY);
}

#[test]
fn modify_returns_exactly_what_was_written() {
    let backend = HeadlessBackend::new();
    let mut drawable = InstancedDrawable::new(&backend, "tri", &triangle());
    for _ in 0..3 {
        drawable.add_instance(&backend, None);
    }

    let moved = translation(4.0, 5.0, 6.0);
    drawable.modify_instance(&backend, 1, moved).unwrap();

    assert_eq!(drawable.instance_data(1).unwrap(), moved);
    assert_eq!(drawable.instance_data(0).unwrap(), IDENTITY);
    assert_eq!(drawable.instance_data(2).unwrap(), IDENTITY);
    assert_eq!(drawable.instance_count(), 3);
}

#[test]
fn modify_uploads_only_the_touched_instance() {
    let backend = HeadlessBackend::new();
    let mut drawable = InstancedDrawable::new(&backend, "tri", &triangle());
    drawable.add_instance(&backend, None);
    drawable.add_instance(&backend, None);

    drawable
        .modify_instance(&backend, 1, translation(0.0, 1.0, 0.0))
        .unwrap();

    let buffer = drawable.instance_buffer();
    assert_eq!(buffer.full_uploads, 2);
    assert_eq!(buffer.partial_updates, vec![(INSTANCE_STRIDE, INSTANCE_STRIDE)]);
    assert_eq!(buffer.data, drawable.instances());
}

#[test]
fn out_of_range_index_is_rejected_untouched() {
    let backend = HeadlessBackend::new();
    let mut drawable = InstancedDrawable::new(&backend, "tri", &triangle());
    drawable.add_instance(&backend, None);

    let err = drawable
        .modify_instance(&backend, 1, translation(1.0, 1.0, 1.0))
        .unwrap_err();
    assert!(matches!(
        err,
        ResourceError::IndexOutOfRange { index: 1, count: 1 }
    ));
    assert!(drawable.instance_data(7).is_err());
    assert_eq!(drawable.instances(), &IDENTITY);
    assert!(drawable.instance_buffer().partial_updates.is_empty());
}

#[test]
fn instance_transform_is_column_major() {
    let instance = Instance {
        position: Vector3::new(1.0, 2.0, 3.0),
        rotation: Quaternion::from_angle_y(Deg(0.0)),
        scale: Vector3::new(1.0, 1.0, 1.0),
    };
    let transform = instance.to_transform();
    assert_eq!(&transform[12..16], &[1.0, 2.0, 3.0, 1.0]);
    assert_eq!(transform[0], 1.0);
}
