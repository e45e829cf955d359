use super::*;
use crate::foundation::ids::InstanceIdGen;
use crate::scene::model::{Enable, TimelineObject};

fn self_referencing_chain() -> Vec<TimelineObject> {
    vec![
        TimelineObject::new("video2")
            .on_layer("0")
            .with_enable(Enable::start("$0.end + 1").duration(2.0)),
        TimelineObject::new("video0")
            .on_layer("0")
            .with_enable(Enable::start(0.0).end(8.0)),
        TimelineObject::new("video1")
            .on_layer("0")
            .with_enable(Enable::start("$0.end").duration(2.0)),
    ]
}

fn run(objects: &[TimelineObject], options: &ResolveOptions) -> (ObjectGraph, TimelineResult<()>) {
    let graph = ObjectGraph::populate(objects).unwrap();
    let dirty = graph.all();
    let mut c = Coordinator::new(options, graph, InstanceAlgebra::new(InstanceIdGen::new()));
    let result = c.run(dirty);
    (c.graph, result)
}

fn spans(graph: &ObjectGraph, id: &str) -> Vec<(f64, Option<f64>)> {
    graph
        .object(graph.index[id])
        .resolved
        .instances
        .iter()
        .map(|i| (i.start, i.end))
        .collect()
}

#[test]
fn conflicts_feed_back_into_dependents() {
    let (graph, result) = run(&self_referencing_chain(), &ResolveOptions::default());
    result.unwrap();
    assert_eq!(spans(&graph, "video0"), vec![(0.0, Some(8.0))]);
    assert_eq!(spans(&graph, "video1"), vec![(8.0, Some(9.0))]);
    assert_eq!(spans(&graph, "video2"), vec![(9.0, Some(11.0))]);
    for obj in &graph.objects {
        assert_eq!(obj.resolved.state, ResolveState::Resolved);
        assert!(obj.resolved.first_resolved);
        assert!(obj.resolved.resolved_conflicts);
    }
}

#[test]
fn depth_limit_reports_trail() {
    let options = ResolveOptions::default().with_conflict_max_depth(1);
    let (_, result) = run(&self_referencing_chain(), &options);
    match result {
        Err(TimelineError::MaxIterationsExceeded { iterations, trail }) => {
            assert!(iterations > 3);
            assert!(trail.iter().any(|t| t.starts_with("video1 -> [8, 9]")), "{trail:?}");
        }
        other => panic!("expected MaxIterationsExceeded, got {other:?}"),
    }
}

#[test]
fn circular_dependency_fails_after_the_run() {
    let objects = vec![
        TimelineObject::new("a").on_layer("A").with_enable(Enable::start("#b.end")),
        TimelineObject::new("b").on_layer("B").with_enable(Enable::start("#a.end")),
        TimelineObject::new("free").on_layer("C").with_enable(Enable::start(3.0)),
    ];
    let (graph, result) = run(&objects, &ResolveOptions::default());
    match result {
        Err(TimelineError::CircularDependency(id)) => assert_eq!(id, "a"),
        other => panic!("expected CircularDependency, got {other:?}"),
    }
    assert_eq!(spans(&graph, "free"), vec![(3.0, None)]);
}

#[test]
fn dependents_are_registered_by_reference() {
    let (graph, result) = run(&self_referencing_chain(), &ResolveOptions::default());
    result.unwrap();
    let v1 = graph.object(graph.index["video1"]);
    assert!(v1.resolved.direct_references.contains(&Reference::Layer("0".into())));
    assert!(v1.resolved.is_self_referencing);
    let v0 = graph.object(graph.index["video0"]);
    assert!(!v0.resolved.is_self_referencing);
}

#[test]
fn object_keys_cover_id_classes_and_layer() {
    let graph = ObjectGraph::populate(&[TimelineObject::new("a")
        .on_layer("L")
        .with_class("x")
        .with_enable(Enable::start(0.0))])
    .unwrap();
    assert_eq!(
        object_keys(graph.object(graph.index["a"])),
        vec![
            Reference::Object("a".into()),
            Reference::Class("x".into()),
            Reference::Layer("L".into()),
        ]
    );
}

#[test]
fn summary_formats_open_ends() {
    let list = [Instance::new("a", 1.0, Some(2.0)), Instance::new("b", 3.0, None)];
    assert_eq!(summarize(&list), "[1, 2] [3, inf]");
}
