use super::*;
use crate::resolve::resolve_timeline_with_cache;
use crate::scene::model::{Enable, TimelineObject};
use crate::scene::options::{DEFAULT_LIMIT_COUNT, ResolveOptions};

fn timeline() -> Vec<TimelineObject> {
    vec![
        TimelineObject::new("video")
            .on_layer("0")
            .with_enable(Enable::start(0.0).end(100.0)),
        TimelineObject::new("graphic0")
            .on_layer("1")
            .with_enable(Enable::start("#video.start + 10").duration(10.0)),
        TimelineObject::new("graphic1")
            .on_layer("2")
            .with_enable(Enable::start("#graphic0.end + 10").duration(15.0)),
        TimelineObject::new("other")
            .on_layer("3")
            .with_enable(Enable::start(5.0)),
    ]
}

fn warm(objects: &[TimelineObject]) -> ResolverCache {
    let mut cache = ResolverCache::new();
    resolve_timeline_with_cache(objects, &ResolveOptions::default(), &mut cache).unwrap();
    cache
}

fn invalid_ids(cache: &ResolverCache, objects: &[TimelineObject]) -> Vec<String> {
    invalid_ids_with(cache, objects, &ResolveOptions::default())
}

fn invalid_ids_with(
    cache: &ResolverCache,
    objects: &[TimelineObject],
    options: &ResolveOptions,
) -> Vec<String> {
    let mut graph = ObjectGraph::populate(objects).unwrap();
    cache
        .restore(&mut graph, options)
        .into_iter()
        .map(|o| graph.object(o).id.clone())
        .collect()
}

#[test]
fn fresh_cache_restores_nothing() {
    let cache = ResolverCache::new();
    assert!(!cache.is_usable());
    assert_eq!(invalid_ids(&cache, &timeline()).len(), 4);
}

#[test]
fn unchanged_timeline_is_fully_restored() {
    let objects = timeline();
    let cache = warm(&objects);
    assert!(cache.is_usable());
    assert_eq!(cache.len(), 4);

    let mut graph = ObjectGraph::populate(&objects).unwrap();
    assert!(cache.restore(&mut graph, &ResolveOptions::default()).is_empty());
    let g1 = graph.object(graph.index["graphic1"]);
    assert_eq!(g1.resolved.state, ResolveState::Resolved);
    assert_eq!(
        (g1.resolved.instances[0].start, g1.resolved.instances[0].end),
        (30.0, Some(45.0))
    );
    assert_eq!(graph.tentative[graph.index["graphic1"].index()].len(), 1);
}

#[test]
fn edit_invalidates_transitive_readers() {
    let cache = warm(&timeline());
    let mut edited = timeline();
    edited[0].enable = vec![Enable::start(0.0).end(50.0)];
    assert_eq!(invalid_ids(&cache, &edited), vec!["graphic0", "graphic1", "video"]);
}

#[test]
fn content_edit_keeps_cache_valid() {
    let cache = warm(&timeline());
    let mut edited = timeline();
    edited[3].content = serde_json::json!({"title": "new"});
    assert!(invalid_ids(&cache, &edited).is_empty());
}

#[test]
fn removed_object_invalidates_readers() {
    let cache = warm(&timeline());
    let mut edited = timeline();
    edited.remove(1);
    assert_eq!(invalid_ids(&cache, &edited), vec!["graphic1"]);
}

#[test]
fn layer_mates_are_invalidated_together() {
    let cache = warm(&timeline());
    let mut edited = timeline();
    edited.push(
        TimelineObject::new("late")
            .on_layer("3")
            .with_enable(Enable::start(50.0)),
    );
    assert_eq!(invalid_ids(&cache, &edited), vec!["late", "other"]);
}

#[test]
fn leaving_a_layer_invalidates_former_mates() {
    let mut objects = timeline();
    objects.push(
        TimelineObject::new("late")
            .on_layer("3")
            .with_enable(Enable::start(50.0)),
    );
    let cache = warm(&objects);
    objects[4].layer = "4".into();
    assert_eq!(invalid_ids(&cache, &objects), vec!["late", "other"]);
}

#[test]
fn dropping_a_class_invalidates_its_readers() {
    let mut objects = vec![
        TimelineObject::new("a")
            .on_layer("1")
            .with_class("x")
            .with_enable(Enable::start(10.0).end(20.0)),
        TimelineObject::new("r")
            .on_layer("2")
            .with_enable(Enable::when(".x")),
        TimelineObject::new("z")
            .on_layer("3")
            .with_enable(Enable::start(0.0)),
    ];
    let cache = warm(&objects);
    objects[0].classes.clear();
    assert_eq!(invalid_ids(&cache, &objects), vec!["a", "r"]);
}

#[test]
fn changed_options_restore_nothing() {
    let cache = warm(&timeline());
    let more = ResolveOptions::default().with_limit_count(5);
    assert_eq!(invalid_ids_with(&cache, &timeline(), &more).len(), 4);
    let later = ResolveOptions::at(30.0);
    assert_eq!(invalid_ids_with(&cache, &timeline(), &later).len(), 4);

    let explicit_default = ResolveOptions::default().with_limit_count(DEFAULT_LIMIT_COUNT);
    assert!(invalid_ids_with(&cache, &timeline(), &explicit_default).is_empty());
    let deeper = ResolveOptions::default().with_conflict_max_depth(9);
    assert!(invalid_ids_with(&cache, &timeline(), &deeper).is_empty());
}

#[test]
fn reset_keeps_id_counter() {
    let mut cache = warm(&timeline());
    let next = cache.next_instance_id();
    assert!(next > 0);
    cache.reset();
    assert!(cache.is_empty());
    assert!(!cache.is_usable());
    assert_eq!(cache.next_instance_id(), next);
}

#[test]
fn cache_round_trips_through_json() {
    let cache = warm(&timeline());
    let json = serde_json::to_string(&cache).unwrap();
    let back: ResolverCache = serde_json::from_str(&json).unwrap();
    assert_eq!(back, cache);
}
