//! Timeline resolution: turn timeline objects into absolute, conflict-free instances.
//!
//! Objects are flattened into an arena, resolved on demand through their references, and then
//! layer conflicts are applied. Since conflicts can move instances other objects read from, the
//! coordinator repeats both steps for the affected objects until nothing moves.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::foundation::error::TimelineResult;
use crate::foundation::ids::InstanceIdGen;
use crate::instance::InstanceAlgebra;
use crate::scene::model::TimelineObject;
use crate::scene::options::ResolveOptions;
use crate::schema::validate_timeline;

pub(crate) mod cache;
pub(crate) mod context;
pub(crate) mod coordinator;
pub(crate) mod fingerprint;
pub(crate) mod graph;
pub(crate) mod layer;
pub(crate) mod object;
pub(crate) mod reference;

pub use cache::ResolverCache;
pub use graph::{ResolveState, ResolvedInfo, ResolvedObject};

use coordinator::Coordinator;
use graph::ObjectGraph;

/// Counters describing one resolve call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveStatistics {
    /// Objects that did not reach the resolved state.
    pub unresolved_count: usize,
    /// Objects in the resolved state.
    pub resolved_count: usize,
    /// Resolved plain objects (neither groups nor keyframes).
    pub resolved_object_count: usize,
    /// Resolved groups.
    pub resolved_group_count: usize,
    /// Resolved keyframes.
    pub resolved_keyframe_count: usize,
    /// Instances over all objects.
    pub resolved_instance_count: usize,
    /// Objects actually resolved by this call; lower than the total when a cache was reused.
    pub resolving_count: usize,
}

/// Every object of a timeline with its final instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTimeline {
    /// Options the timeline was resolved with.
    pub options: ResolveOptions,
    /// Objects by id, children and keyframes included.
    pub objects: BTreeMap<String, ResolvedObject>,
    /// Class name to member ids.
    pub classes: BTreeMap<String, Vec<String>>,
    /// Layer name to member ids.
    pub layers: BTreeMap<String, Vec<String>>,
    /// Counters.
    pub statistics: ResolveStatistics,
}

impl ResolvedTimeline {
    /// Resolved object by id.
    pub fn object(&self, id: &str) -> Option<&ResolvedObject> {
        self.objects.get(id)
    }

    fn from_graph(options: ResolveOptions, graph: ObjectGraph, resolving_count: usize) -> Self {
        let member_ids = |map: &BTreeMap<String, Vec<crate::foundation::ids::ObjIdx>>| {
            map.iter()
                .map(|(name, members)| {
                    let ids = members
                        .iter()
                        .map(|&m| graph.object(m).id.clone())
                        .collect();
                    (name.clone(), ids)
                })
                .collect::<BTreeMap<_, _>>()
        };
        let classes = member_ids(&graph.classes);
        let layers = member_ids(&graph.layers);

        let mut statistics = ResolveStatistics {
            resolving_count,
            ..ResolveStatistics::default()
        };
        for obj in &graph.objects {
            statistics.resolved_instance_count += obj.resolved.instances.len();
            if obj.resolved.state != ResolveState::Resolved {
                statistics.unresolved_count += 1;
                continue;
            }
            statistics.resolved_count += 1;
            if obj.resolved.is_keyframe {
                statistics.resolved_keyframe_count += 1;
            } else if obj.is_group {
                statistics.resolved_group_count += 1;
            } else {
                statistics.resolved_object_count += 1;
            }
        }

        let objects = graph
            .objects
            .into_iter()
            .map(|obj| (obj.id.clone(), obj))
            .collect();
        Self {
            options,
            objects,
            classes,
            layers,
            statistics,
        }
    }
}

/// Resolve a timeline from scratch.
///
/// The input is validated first. The result does not depend on the order of `objects`.
pub fn resolve_timeline(
    objects: &[TimelineObject],
    options: &ResolveOptions,
) -> TimelineResult<ResolvedTimeline> {
    resolve_inner(objects, options, None)
}

/// Resolve a timeline, reusing whatever `cache` still holds from the previous call.
///
/// The result equals what [`resolve_timeline`] returns apart from instance ids and
/// [`ResolveStatistics::resolving_count`]. On error the cache is reset.
pub fn resolve_timeline_with_cache(
    objects: &[TimelineObject],
    options: &ResolveOptions,
    cache: &mut ResolverCache,
) -> TimelineResult<ResolvedTimeline> {
    let result = resolve_inner(objects, options, Some(&mut *cache));
    if let Err(err) = &result {
        tracing::warn!(error = %err, "resolve failed, resetting cache");
        cache.reset();
    }
    result
}

#[tracing::instrument(skip_all, fields(objects = objects.len(), time = options.time))]
fn resolve_inner(
    objects: &[TimelineObject],
    options: &ResolveOptions,
    cache: Option<&mut ResolverCache>,
) -> TimelineResult<ResolvedTimeline> {
    validate_timeline(objects)?;
    let mut graph = ObjectGraph::populate(objects)?;

    let (ids, dirty) = match cache.as_deref() {
        Some(cache) => (
            InstanceIdGen::starting_at(cache.next_instance_id()),
            cache.restore(&mut graph, options),
        ),
        None => (InstanceIdGen::new(), graph.all()),
    };
    tracing::debug!(total = graph.len(), dirty = dirty.len(), "graph populated");

    let mut coordinator = Coordinator::new(options, graph, InstanceAlgebra::new(ids));
    coordinator.run(dirty)?;

    let Coordinator {
        graph,
        algebra,
        diagnostics,
        ..
    } = coordinator;
    if let Some(cache) = cache {
        cache.persist(&graph, options, algebra.ids().position());
    }
    Ok(ResolvedTimeline::from_graph(
        options.clone(),
        graph,
        diagnostics.resolved_now.len(),
    ))
}
