use super::*;
use crate::foundation::ids::InstanceIdGen;
use crate::instance::InstanceAlgebra;
use crate::resolve::context::Diagnostics;
use crate::resolve::graph::ObjectGraph;
use crate::scene::model::{Enable, TimelineObject};
use crate::scene::options::ResolveOptions;

struct Fixture {
    graph: ObjectGraph,
    algebra: InstanceAlgebra,
    options: ResolveOptions,
    diagnostics: Diagnostics,
}

impl Fixture {
    fn new(objects: &[TimelineObject]) -> Self {
        Self::with_options(objects, ResolveOptions::default())
    }

    fn with_options(objects: &[TimelineObject], options: ResolveOptions) -> Self {
        Self {
            graph: ObjectGraph::populate(objects).unwrap(),
            algebra: InstanceAlgebra::new(InstanceIdGen::new()),
            options,
            diagnostics: Diagnostics::default(),
        }
    }

    fn resolve(&mut self, id: &str) -> Vec<(f64, Option<f64>)> {
        let idx = self.graph.index[id];
        let mut ctx = ResolveCtx {
            graph: &mut self.graph,
            algebra: &mut self.algebra,
            options: &self.options,
            diagnostics: &mut self.diagnostics,
        };
        ctx.resolve_object(idx);
        self.instances(id).iter().map(|i| (i.start, i.end)).collect()
    }

    fn instances(&self, id: &str) -> &[Instance] {
        &self.graph.object(self.graph.index[id]).resolved.instances
    }
}

fn obj(id: &str, enable: Enable) -> TimelineObject {
    TimelineObject::new(id).on_layer(id).with_enable(enable)
}

#[test]
fn constant_start_and_end() {
    let mut f = Fixture::new(&[obj("a", Enable::start(0.0).end(100.0))]);
    assert_eq!(f.resolve("a"), vec![(0.0, Some(100.0))]);
    let a = f.graph.object(f.graph.index["a"]);
    assert_eq!(a.resolved.state, ResolveState::Resolved);
    assert_eq!(f.graph.tentative[f.graph.index["a"].index()].len(), 1);
}

#[test]
fn start_without_end_is_open() {
    let mut f = Fixture::new(&[obj("a", Enable::start(5.0))]);
    assert_eq!(f.resolve("a"), vec![(5.0, None)]);
}

#[test]
fn referenced_start_and_duration() {
    let mut f = Fixture::new(&[
        obj("video", Enable::start(0.0).end(100.0)),
        obj("graphic0", Enable::start("#video.start + 10").duration(10.0)),
        obj("graphic1", Enable::start("#graphic0.end + 10").duration(15.0)),
    ]);
    assert_eq!(f.resolve("graphic1"), vec![(30.0, Some(45.0))]);
    assert_eq!(f.resolve("graphic0"), vec![(10.0, Some(20.0))]);
    let g1 = f.graph.object(f.graph.index["graphic1"]);
    assert!(
        g1.resolved
            .direct_references
            .contains(&Reference::Object("graphic0".into()))
    );
}

#[test]
fn end_expression_pairs_with_starts() {
    let mut f = Fixture::new(&[
        obj("a", Enable::start(0.0).end(20.0)),
        obj("b", Enable::start(5.0).end("#a.end")),
    ]);
    assert_eq!(f.resolve("b"), vec![(5.0, Some(20.0))]);
}

#[test]
fn while_constants_and_references() {
    let mut f = Fixture::new(&[
        obj("a", Enable::start(10.0).end(20.0)),
        obj("on", Enable::when(1.0)),
        obj("off", Enable::when(false)),
        obj("follow", Enable::when("#a")),
        obj("opposite", Enable::when("!#a")),
    ]);
    assert_eq!(f.resolve("on"), vec![(0.0, None)]);
    assert!(f.resolve("off").is_empty());
    assert_eq!(f.resolve("follow"), vec![(10.0, Some(20.0))]);
    assert_eq!(f.resolve("opposite"), vec![(0.0, Some(10.0)), (20.0, None)]);
    assert!(f.instances("opposite").iter().all(|i| !i.is_first));
}

#[test]
fn repeating_is_limited_by_count() {
    let options = ResolveOptions::at(0.0).with_limit_count(5);
    let mut f = Fixture::with_options(
        &[obj("a", Enable::start(0.0).duration(5.0).repeating(10.0))],
        options,
    );
    assert_eq!(
        f.resolve("a"),
        vec![
            (0.0, Some(5.0)),
            (10.0, Some(15.0)),
            (20.0, Some(25.0)),
            (30.0, Some(35.0)),
            (40.0, Some(45.0)),
        ]
    );
}

#[test]
fn duration_is_capped_to_the_period() {
    let mut f = Fixture::new(&[obj("a", Enable::start(0.0).duration(50.0).repeating(10.0))]);
    assert_eq!(f.resolve("a"), vec![(0.0, Some(10.0)), (10.0, Some(20.0))]);
}

#[test]
fn disabled_object_has_no_instances() {
    let mut f = Fixture::new(&[obj("a", Enable::start(0.0)).disabled()]);
    assert!(f.resolve("a").is_empty());
}

#[test]
fn end_before_start_is_normalized() {
    let mut f = Fixture::new(&[
        obj("a", Enable::start(10.0).end("#missing.end")),
        obj("b", Enable::start(10.0).duration(-5.0)),
    ]);
    assert_eq!(f.resolve("a"), vec![(10.0, None)]);
    assert_eq!(f.resolve("b"), vec![(10.0, Some(10.0))]);
}

#[test]
fn multiple_clauses_are_concatenated() {
    let mut f = Fixture::new(&[TimelineObject::new("a")
        .on_layer("L")
        .with_enable(Enable::start(0.0).end(10.0))
        .with_enable(Enable::start(20.0).end(30.0))]);
    assert_eq!(f.resolve("a"), vec![(0.0, Some(10.0)), (20.0, Some(30.0))]);
    let ids: Vec<&str> = f.instances("a").iter().map(|i| i.id.as_str()).collect();
    assert_ne!(ids[0], ids[1]);
}

#[test]
fn seamless_clauses_fuse() {
    let mut f = Fixture::new(&[TimelineObject::new("a")
        .on_layer("L")
        .seamless()
        .with_enable(Enable::start(0.0).end(10.0))
        .with_enable(Enable::start(10.0).end(30.0))]);
    assert_eq!(f.resolve("a"), vec![(0.0, Some(30.0))]);
}

#[test]
fn child_constant_start_is_relative_to_parent() {
    let group = TimelineObject::new("g")
        .on_layer("G")
        .with_enable(Enable::start(10.0).end(50.0))
        .with_children(vec![
            TimelineObject::new("c")
                .on_layer("C")
                .with_enable(Enable::start(5.0).duration(10.0)),
            TimelineObject::new("long")
                .on_layer("D")
                .with_enable(Enable::start(30.0).duration(100.0)),
        ]);
    let mut f = Fixture::new(&[group]);
    assert_eq!(f.resolve("c"), vec![(15.0, Some(25.0))]);
    let parent_instance = f.instances("g")[0].id.clone();
    assert!(f.instances("c")[0].caps.iter().any(|c| c.id == parent_instance));
    assert!(
        f.graph
            .object(f.graph.index["c"])
            .resolved
            .direct_references
            .contains(&Reference::Object("g".into()))
    );

    assert_eq!(f.resolve("long"), vec![(40.0, Some(50.0))]);
}

#[test]
fn child_of_repeating_parent_follows_each_occurrence() {
    let group = TimelineObject::new("g")
        .on_layer("G")
        .with_enable(Enable::start(0.0).duration(10.0).repeating(20.0))
        .with_children(vec![
            TimelineObject::new("c")
                .on_layer("C")
                .with_enable(Enable::start(2.0).duration(3.0)),
        ]);
    let mut f = Fixture::new(&[group]);
    assert_eq!(f.resolve("c"), vec![(2.0, Some(5.0)), (22.0, Some(25.0))]);
}

#[test]
fn circular_dependency_is_recorded() {
    let mut f = Fixture::new(&[
        obj("a", Enable::start("#b.end")),
        obj("b", Enable::start("#a.end")),
        obj("free", Enable::start(1.0)),
    ]);
    f.resolve("a");
    assert_eq!(f.diagnostics.circular.as_deref(), Some("a"));
    assert_eq!(f.resolve("free"), vec![(1.0, None)]);
}
