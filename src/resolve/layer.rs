use std::cmp::Ordering;

use crate::foundation::core::{Instance, Time};
use crate::foundation::ids::ObjIdx;
use crate::instance::{Phase, dedupe_ids, instance_events};
use crate::resolve::context::ResolveCtx;

/// One start or end of a member's tentative instance.
#[derive(Debug, Clone, Copy)]
struct Point {
    time: Time,
    phase: Phase,
    member: usize,
    src: usize,
}

impl ResolveCtx<'_> {
    /// Give each instant of `layer` to at most one member.
    ///
    /// Members are swept from their tentative instances, so running this twice gives the same
    /// result. The winner at any instant has the highest priority, then the latest start, then the
    /// lowest object id. Children on the layer are clipped to their parent's final instances
    /// afterwards.
    #[tracing::instrument(level = "trace", skip(self))]
    pub(crate) fn resolve_layer_conflicts(&mut self, layer: &str) {
        let Some(members) = self.graph.layers.get(layer).cloned() else {
            return;
        };
        let mut order = members;
        order.sort_by_key(|&m| (self.graph.object(m).resolved.level_deep, m));

        let results = if let [only] = order.as_slice() {
            vec![self.graph.tentative[only.index()]
                .iter()
                .map(|inst| {
                    let mut kept = inst.clone();
                    kept.original_start.get_or_insert(inst.start);
                    kept.original_end.get_or_insert(inst.end);
                    kept
                })
                .collect()]
        } else {
            self.sweep(&order)
        };

        for (&member, instances) in order.iter().zip(results) {
            let obj = self.graph.object_mut(member);
            obj.resolved.instances = instances;
            obj.resolved.resolved_conflicts = true;
        }

        for &member in &order {
            let Some(parent) = self.graph.parent[member.index()] else {
                continue;
            };
            let parents = self.graph.object(parent).resolved.instances.clone();
            let own = std::mem::take(&mut self.graph.object_mut(member).resolved.instances);
            self.graph.object_mut(member).resolved.instances =
                self.algebra.cap_to_parent(&own, &parents);
        }
    }

    fn sweep(&self, order: &[ObjIdx]) -> Vec<Vec<Instance>> {
        let sources: Vec<&[Instance]> = order
            .iter()
            .map(|m| self.graph.tentative[m.index()].as_slice())
            .collect();
        let priorities: Vec<f64> = order.iter().map(|&m| self.graph.object(m).priority).collect();
        let ids: Vec<&str> = order
            .iter()
            .map(|&m| self.graph.object(m).id.as_str())
            .collect();

        let mut points: Vec<Point> = Vec::new();
        for (member, list) in sources.iter().enumerate() {
            points.extend(instance_events(list).into_iter().map(|e| Point {
                time: e.time,
                phase: e.phase,
                member,
                src: e.src,
            }));
        }
        points.sort_by(|a, b| {
            a.time
                .total_cmp(&b.time)
                .then(a.phase.cmp(&b.phase))
                .then(a.member.cmp(&b.member))
                .then(a.src.cmp(&b.src))
        });

        let rank = |a: &(usize, usize), b: &(usize, usize)| -> Ordering {
            priorities[b.0]
                .total_cmp(&priorities[a.0])
                .then(sources[b.0][b.1].start.total_cmp(&sources[a.0][a.1].start))
                .then(ids[a.0].cmp(ids[b.0]))
                .then(a.1.cmp(&b.1))
        };

        let mut out: Vec<Vec<Instance>> = vec![Vec::new(); order.len()];
        let mut origin: Vec<Vec<usize>> = vec![Vec::new(); order.len()];
        let mut aspirants: Vec<(usize, usize)> = Vec::new();
        let mut current: Option<(usize, usize)> = None;
        for p in points {
            match p.phase {
                Phase::Start => aspirants.push((p.member, p.src)),
                Phase::End | Phase::ZeroEnd => aspirants.retain(|&a| a != (p.member, p.src)),
            }
            aspirants.sort_by(rank);
            let winner = aspirants.first().copied();
            if winner == current {
                continue;
            }
            if let Some((member, _)) = current
                && let Some(last) = out[member].last_mut()
            {
                last.end = Some(p.time);
            }
            current = winner;
            if let Some((member, src)) = winner {
                let source = &sources[member][src];
                out[member].push(Instance {
                    id: source.id.clone(),
                    start: p.time,
                    end: None,
                    references: source.references.clone(),
                    caps: source.caps.clone(),
                    original_start: Some(source.original_start.unwrap_or(source.start)),
                    original_end: Some(source.original_end.unwrap_or(source.end)),
                    is_first: false,
                    from_instance_id: Some(source.id.clone()),
                });
                origin[member].push(src);
            }
        }

        for (member, segments) in out.iter_mut().enumerate() {
            let mut k = 0;
            segments.retain(|seg| {
                let src = origin[member][k];
                k += 1;
                !seg.is_zero_length() || sources[member][src].is_zero_length()
            });
            dedupe_ids(segments);
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/resolve/layer.rs"]
mod tests;
