use super::*;
use crate::resolve::graph::ObjectGraph;
use crate::scene::model::TimelineObject;

fn single(obj: TimelineObject) -> ResolvedObject {
    let graph = ObjectGraph::populate(&[obj]).unwrap();
    graph.objects.into_iter().next().unwrap()
}

fn base() -> TimelineObject {
    TimelineObject::new("a")
        .on_layer("L")
        .with_enable(Enable::start("#b.end").duration(10.0))
}

#[test]
fn instance_fingerprint_ignores_ids_and_provenance() {
    let a = [Instance::new("x", 0.0, Some(10.0))];
    let mut b = [Instance::new("y", 0.0, Some(10.0))];
    b[0].original_start = Some(-5.0);
    assert_eq!(fingerprint_instances(&a), fingerprint_instances(&b));
}

#[test]
fn instance_fingerprint_tracks_timing() {
    let a = [Instance::new("x", 0.0, Some(10.0))];
    let open = [Instance::new("x", 0.0, None)];
    let longer = [Instance::new("x", 0.0, Some(11.0))];
    assert_ne!(fingerprint_instances(&a), fingerprint_instances(&open));
    assert_ne!(fingerprint_instances(&a), fingerprint_instances(&longer));
    assert_ne!(fingerprint_instances(&a), fingerprint_instances(&[]));
}

#[test]
fn timing_fingerprint_ignores_content() {
    let plain = single(base());
    let with_content = single(base().with_content(serde_json::json!({"x": 1})));
    assert_eq!(fingerprint_timing(&plain), fingerprint_timing(&with_content));
}

#[test]
fn timing_fingerprint_tracks_timing_fields() {
    let reference = fingerprint_timing(&single(base()));
    let variants = [
        base().with_priority(2.0),
        base().on_layer("M"),
        base().with_class("c"),
        base().disabled(),
        base().seamless(),
        base().with_enable(Enable::start(1.0)),
        TimelineObject::new("a")
            .on_layer("L")
            .with_enable(Enable::start("#b.end").duration(11.0)),
    ];
    for v in variants {
        assert_ne!(fingerprint_timing(&single(v.clone())), reference, "{v:?}");
    }
}

#[test]
fn fingerprint_is_stable() {
    let a = fingerprint_instances(&[Instance::new("x", 1.5, None)]);
    let b = fingerprint_instances(&[Instance::new("x", 1.5, None)]);
    assert_eq!(a, b);
    assert_ne!((a.hi, a.lo), (0, 0));
}

#[test]
fn options_fingerprint_uses_effective_values() {
    use crate::scene::options::{DEFAULT_LIMIT_COUNT, ResolveOptions};

    let base = fingerprint_options(&ResolveOptions::default());
    let explicit = ResolveOptions::default().with_limit_count(DEFAULT_LIMIT_COUNT);
    assert_eq!(fingerprint_options(&explicit), base);
    let deeper = ResolveOptions::default().with_conflict_max_depth(20);
    assert_eq!(fingerprint_options(&deeper), base);

    let mut collisions = ResolveOptions::default();
    collisions.resolve_instance_collisions = true;
    for changed in [
        ResolveOptions::at(1.0),
        ResolveOptions::default().with_limit_count(3),
        ResolveOptions::default().with_limit_time(100.0),
        collisions,
    ] {
        assert_ne!(fingerprint_options(&changed), base, "{changed:?}");
    }
}
