use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use crate::foundation::core::{Instance, Reference};
use crate::foundation::error::{TimelineError, TimelineResult};
use crate::foundation::ids::ObjIdx;
use crate::instance::InstanceAlgebra;
use crate::resolve::context::{Diagnostics, ResolveCtx};
use crate::resolve::fingerprint::{Fingerprint, fingerprint_instances};
use crate::resolve::graph::{ObjectGraph, ResolveState};
use crate::scene::options::ResolveOptions;

const TRAIL_LEN: usize = 10;

/// Drives object resolution and layer conflicts to a fixpoint.
pub(crate) struct Coordinator<'o> {
    options: &'o ResolveOptions,
    pub(crate) graph: ObjectGraph,
    pub(crate) algebra: InstanceAlgebra,
    pub(crate) diagnostics: Diagnostics,
    /// Reference key to the objects whose expressions read it.
    dependents: BTreeMap<Reference, BTreeSet<ObjIdx>>,
    trail: VecDeque<String>,
}

impl<'o> Coordinator<'o> {
    pub(crate) fn new(
        options: &'o ResolveOptions,
        graph: ObjectGraph,
        algebra: InstanceAlgebra,
    ) -> Self {
        Self {
            options,
            graph,
            algebra,
            diagnostics: Diagnostics::default(),
            dependents: BTreeMap::new(),
            trail: VecDeque::with_capacity(TRAIL_LEN),
        }
    }

    fn ctx(&mut self) -> ResolveCtx<'_> {
        ResolveCtx {
            graph: &mut self.graph,
            algebra: &mut self.algebra,
            options: self.options,
            diagnostics: &mut self.diagnostics,
        }
    }

    /// Resolve `dirty`, then keep re-resolving whatever depends on objects whose final instances
    /// moved, until nothing moves.
    ///
    /// Objects outside `dirty` must already be resolved.
    pub(crate) fn run(&mut self, dirty: BTreeSet<ObjIdx>) -> TimelineResult<()> {
        let limit = self.graph.len().max(1) * self.options.conflict_max_depth();
        self.register_dependencies();

        let mut dirty = dirty;
        let mut round = 0usize;
        while !dirty.is_empty() {
            round += 1;
            let layers = self.layers_of(&dirty);
            let touched = self.touched(&dirty, &layers);
            let mut before: HashMap<ObjIdx, Fingerprint> = touched
                .iter()
                .map(|&o| (o, fingerprint_instances(&self.graph.object(o).resolved.instances)))
                .collect();
            let before_tentative: HashMap<ObjIdx, Fingerprint> = dirty
                .iter()
                .map(|&o| (o, fingerprint_instances(&self.graph.tentative[o.index()])))
                .collect();

            for &o in &dirty {
                self.graph.object_mut(o).resolved.state = ResolveState::Unresolved;
            }
            {
                let mut ctx = self.ctx();
                for &o in &dirty {
                    ctx.resolve_object(o);
                }
            }
            if self.diagnostics.resolutions > limit {
                return Err(TimelineError::MaxIterationsExceeded {
                    iterations: self.diagnostics.resolutions,
                    trail: self.trail.iter().cloned().collect(),
                });
            }
            self.register_dependencies();

            let provisional: BTreeSet<ObjIdx> = if round == 1 {
                for &o in &dirty {
                    before.insert(o, fingerprint_instances(&self.graph.tentative[o.index()]));
                }
                BTreeSet::new()
            } else {
                let moved: Vec<ObjIdx> = dirty
                    .iter()
                    .copied()
                    .filter(|o| {
                        before_tentative.get(o)
                            != Some(&fingerprint_instances(&self.graph.tentative[o.index()]))
                    })
                    .collect();
                self.dependents_of(&moved)
            };

            let mut deferred = BTreeSet::new();
            {
                let mut ctx = self.ctx();
                for layer in &layers {
                    let members = ctx.graph.layers.get(layer).cloned().unwrap_or_default();
                    if round > 1 && members.iter().all(|m| provisional.contains(m)) {
                        deferred.extend(members);
                        continue;
                    }
                    ctx.resolve_layer_conflicts(layer);
                }
            }
            for &o in &dirty {
                let obj = self.graph.object_mut(o);
                if obj.layer.is_empty() {
                    obj.resolved.resolved_conflicts = true;
                }
            }

            let changed: Vec<ObjIdx> = touched
                .iter()
                .copied()
                .filter(|o| !deferred.contains(o))
                .filter(|o| {
                    before.get(o)
                        != Some(&fingerprint_instances(&self.graph.object(*o).resolved.instances))
                })
                .collect();
            for &o in &changed {
                self.record_change(o);
            }

            tracing::debug!(
                round,
                resolved = dirty.len(),
                changed = changed.len(),
                deferred = deferred.len(),
                "fixpoint round"
            );
            dirty = self.dependents_of(&changed);
            dirty.extend(deferred);
        }

        match self.diagnostics.circular.take() {
            Some(id) => Err(TimelineError::CircularDependency(id)),
            None => Ok(()),
        }
    }

    /// Index the direct references of every newly resolved object.
    fn register_dependencies(&mut self) {
        for (k, obj) in self.graph.objects.iter_mut().enumerate() {
            if obj.resolved.state != ResolveState::Resolved || obj.resolved.first_resolved {
                continue;
            }
            for reference in &obj.resolved.direct_references {
                self.dependents
                    .entry(reference.clone())
                    .or_default()
                    .insert(ObjIdx(k as u32));
            }
            obj.resolved.first_resolved = true;
        }
    }

    /// Objects reading the id, a class or the layer of any of `changed`.
    fn dependents_of(&self, changed: &[ObjIdx]) -> BTreeSet<ObjIdx> {
        let mut out = BTreeSet::new();
        for &c in changed {
            for key in object_keys(self.graph.object(c)) {
                if let Some(deps) = self.dependents.get(&key) {
                    out.extend(deps.iter().copied().filter(|&d| d != c));
                }
            }
        }
        out
    }

    fn layers_of(&self, objects: &BTreeSet<ObjIdx>) -> BTreeSet<String> {
        objects
            .iter()
            .map(|&o| &self.graph.object(o).layer)
            .filter(|l| !l.is_empty())
            .cloned()
            .collect()
    }

    fn touched(&self, dirty: &BTreeSet<ObjIdx>, layers: &BTreeSet<String>) -> BTreeSet<ObjIdx> {
        let mut out = dirty.clone();
        for layer in layers {
            if let Some(members) = self.graph.layers.get(layer) {
                out.extend(members.iter().copied());
            }
        }
        out
    }

    fn record_change(&mut self, o: ObjIdx) {
        let obj = self.graph.object(o);
        let entry = format!("{} -> {}", obj.id, summarize(&obj.resolved.instances));
        tracing::trace!(change = %entry, "instances moved");
        if self.trail.len() == TRAIL_LEN {
            self.trail.pop_front();
        }
        self.trail.push_back(entry);
    }
}

/// Reference keys under which other objects can read `obj`.
pub(crate) fn object_keys(obj: &crate::resolve::graph::ResolvedObject) -> Vec<Reference> {
    let mut keys = vec![Reference::Object(obj.id.clone())];
    keys.extend(obj.classes.iter().cloned().map(Reference::Class));
    if !obj.layer.is_empty() {
        keys.push(Reference::Layer(obj.layer.clone()));
    }
    keys
}

fn summarize(instances: &[Instance]) -> String {
    let parts: Vec<String> = instances
        .iter()
        .map(|i| match i.end {
            Some(end) => format!("[{}, {end}]", i.start),
            None => format!("[{}, inf]", i.start),
        })
        .collect();
    parts.join(" ")
}

#[cfg(test)]
#[path = "../../tests/unit/resolve/coordinator.rs"]
mod tests;
