use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::foundation::core::{Instance, Reference, References};
use crate::foundation::ids::ObjIdx;
use crate::resolve::coordinator::object_keys;
use crate::resolve::fingerprint::{Fingerprint, fingerprint_options, fingerprint_timing};
use crate::resolve::graph::{ObjectGraph, ResolveState};
use crate::scene::options::ResolveOptions;

/// State carried between resolve calls so unchanged objects are not resolved again.
///
/// Pass the same cache to consecutive [`crate::resolve_timeline_with_cache`] calls. Any failed
/// call resets it, and a call with different options starts over. The cache is plain data and
/// can be persisted with serde.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverCache {
    usable: bool,
    next_instance_id: u64,
    #[serde(default)]
    options: Option<Fingerprint>,
    objects: BTreeMap<String, CachedObject>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedObject {
    timing: Fingerprint,
    instances: Vec<Instance>,
    tentative: Vec<Instance>,
    direct_references: References,
    keys: Vec<Reference>,
    is_self_referencing: bool,
}

impl ResolverCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the last call using this cache succeeded.
    pub fn is_usable(&self) -> bool {
        self.usable
    }

    /// Number of objects with cached results.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether no object is cached.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Forget all cached results. The instance id counter keeps running.
    pub fn reset(&mut self) {
        *self = Self {
            next_instance_id: self.next_instance_id,
            ..Self::default()
        };
    }

    pub(crate) fn next_instance_id(&self) -> u64 {
        self.next_instance_id
    }

    /// Copy still-valid results into `graph` and return the objects that must be resolved.
    ///
    /// An object is invalid when its timing inputs changed, when it is new, or when anything it
    /// read (directly or transitively, whole layers included) is invalid or gone. Readers of the
    /// layer and classes an object had before an edit are invalid too. Nothing is restored when
    /// `options` differ from the ones the cache was filled under.
    pub(crate) fn restore(
        &self,
        graph: &mut ObjectGraph,
        options: &ResolveOptions,
    ) -> BTreeSet<ObjIdx> {
        if !self.usable || self.options != Some(fingerprint_options(options)) {
            return graph.all();
        }

        let mut invalid = BTreeSet::new();
        let mut pending: Vec<Reference> = Vec::new();
        for (k, obj) in graph.objects.iter().enumerate() {
            let cached = self.objects.get(&obj.id);
            if cached.is_some_and(|c| c.timing == fingerprint_timing(obj)) {
                continue;
            }
            invalid.insert(ObjIdx(k as u32));
            pending.extend(object_keys(obj));
            if let Some(cached) = cached {
                pending.extend(cached.keys.iter().cloned());
            }
        }
        for (id, cached) in &self.objects {
            if !graph.index.contains_key(id) {
                pending.extend(cached.keys.iter().cloned());
            }
        }

        let mut readers: BTreeMap<Reference, Vec<ObjIdx>> = BTreeMap::new();
        for (k, obj) in graph.objects.iter().enumerate() {
            if let Some(cached) = self.objects.get(&obj.id) {
                for reference in &cached.direct_references {
                    readers
                        .entry(reference.clone())
                        .or_default()
                        .push(ObjIdx(k as u32));
                }
            }
        }

        let mut seen: HashSet<Reference> = HashSet::new();
        while let Some(key) = pending.pop() {
            if !seen.insert(key.clone()) {
                continue;
            }
            let mut hit = readers.get(&key).cloned().unwrap_or_default();
            if let Reference::Layer(layer) = &key
                && let Some(members) = graph.layers.get(layer)
            {
                hit.extend(members.iter().copied());
            }
            for o in hit {
                if invalid.insert(o) {
                    pending.extend(object_keys(graph.object(o)));
                }
            }
        }

        let ObjectGraph {
            objects, tentative, ..
        } = graph;
        for (k, obj) in objects.iter_mut().enumerate() {
            if invalid.contains(&ObjIdx(k as u32)) {
                continue;
            }
            let Some(cached) = self.objects.get(&obj.id) else {
                continue;
            };
            obj.resolved.instances = cached.instances.clone();
            obj.resolved.direct_references = cached.direct_references.clone();
            obj.resolved.is_self_referencing = cached.is_self_referencing;
            obj.resolved.state = ResolveState::Resolved;
            obj.resolved.resolved_conflicts = true;
            tentative[k] = cached.tentative.clone();
        }
        tracing::debug!(
            invalid = invalid.len(),
            restored = objects.len() - invalid.len(),
            "cache restored"
        );
        invalid
    }

    /// Remember the results of a successful call.
    pub(crate) fn persist(
        &mut self,
        graph: &ObjectGraph,
        options: &ResolveOptions,
        next_instance_id: u64,
    ) {
        self.objects = graph
            .objects
            .iter()
            .zip(&graph.tentative)
            .map(|(obj, tentative)| {
                let cached = CachedObject {
                    timing: fingerprint_timing(obj),
                    instances: obj.resolved.instances.clone(),
                    tentative: tentative.clone(),
                    direct_references: obj.resolved.direct_references.clone(),
                    keys: object_keys(obj),
                    is_self_referencing: obj.resolved.is_self_referencing,
                };
                (obj.id.clone(), cached)
            })
            .collect();
        self.next_instance_id = next_instance_id;
        self.options = Some(fingerprint_options(options));
        self.usable = true;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/resolve/cache.rs"]
mod tests;
