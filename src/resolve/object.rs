use crate::expression::{Expression, Operator};
use crate::foundation::core::{Cap, Instance, Reference, References, ScalarValue, add_cap};
use crate::foundation::ids::ObjIdx;
use crate::instance::{Operand, dedupe_ids, truth_instances};
use crate::resolve::context::ResolveCtx;
use crate::resolve::graph::{ParsedEnable, ResolveState};
use crate::resolve::reference::Facet;

impl ResolveCtx<'_> {
    /// Compute the tentative instances of one object.
    ///
    /// Already resolved objects are left alone. Hitting an object that is still on the stack is
    /// recorded as a circular dependency and reads as empty.
    #[tracing::instrument(level = "trace", skip_all, fields(id = %self.graph.object(idx).id))]
    pub(crate) fn resolve_object(&mut self, idx: ObjIdx) {
        match self.graph.object(idx).resolved.state {
            ResolveState::Resolved => return,
            ResolveState::Resolving => {
                let id = self.graph.object(idx).id.clone();
                tracing::warn!(object = %id, "circular dependency");
                self.diagnostics.circular.get_or_insert(id);
                return;
            }
            ResolveState::Unresolved => {}
        }
        self.graph.object_mut(idx).resolved.state = ResolveState::Resolving;
        self.diagnostics.resolved_now.insert(idx);
        self.diagnostics.resolutions += 1;

        let mut direct = References::new();
        let instances = if self.graph.object(idx).disabled {
            Vec::new()
        } else {
            self.resolve_enables(idx, &mut direct)
        };
        tracing::trace!(instances = instances.len(), "tentative");

        let obj = self.graph.object_mut(idx);
        obj.resolved.instances = instances.clone();
        obj.resolved.direct_references = direct;
        obj.resolved.state = ResolveState::Resolved;
        obj.resolved.resolved_conflicts = false;
        self.graph.tentative[idx.index()] = instances;
    }

    fn resolve_enables(&mut self, idx: ObjIdx, direct: &mut References) -> Vec<Instance> {
        let parents = match self.graph.parent[idx.index()] {
            Some(p) => {
                let parent_ref = Expression::Text(format!("#{}", self.graph.object(p).id));
                let found = self.lookup(idx, &parent_ref, Facet::Start);
                direct.extend(found.references);
                Some(found.value.map(Operand::into_instances).unwrap_or_default())
            }
            None => None,
        };

        let clauses = self.graph.parsed[idx.index()].clone();
        let mut instances = Vec::new();
        for clause in &clauses {
            let repeating = match &clause.repeating {
                Some(expr) => {
                    let found = self.lookup(idx, expr, Facet::Duration);
                    direct.extend(found.references);
                    match found.value {
                        Some(Operand::Scalar(period)) => Some(period),
                        _ => None,
                    }
                }
                None => None,
            };
            let resolved =
                self.resolve_clause(idx, clause, parents.as_deref(), repeating.as_ref(), direct);
            match &repeating {
                Some(period) => instances.extend(self.algebra.repeat(
                    &resolved,
                    period,
                    &self.options.repeat_options(),
                )),
                None => instances.extend(resolved),
            }
        }
        dedupe_ids(&mut instances);

        if self.graph.object(idx).seamless {
            instances = self.algebra.clean(&instances, true, true);
        } else if clauses.len() > 1 || self.options.resolve_instance_collisions {
            instances = self.algebra.clean(&instances, false, false);
        }
        for inst in &mut instances {
            if let Some(end) = inst.end
                && end < inst.start
            {
                inst.end = Some(inst.start);
            }
        }
        match &parents {
            Some(parents) => self.algebra.cap_to_parent(&instances, parents),
            None => instances,
        }
    }

    fn resolve_clause(
        &mut self,
        idx: ObjIdx,
        clause: &ParsedEnable,
        parents: Option<&[Instance]>,
        repeating: Option<&ScalarValue>,
        direct: &mut References,
    ) -> Vec<Instance> {
        if let Some(condition) = &clause.while_ {
            let instances = match (condition.constant_value(), parents) {
                (Some(v), _) if v == 0.0 => Vec::new(),
                (Some(_), Some(parents)) => self.relative_to_parent(parents, ScalarValue::new(0.0)),
                (Some(_), None) => vec![Instance::new(self.algebra.next_id(), 0.0, None)],
                (None, _) => {
                    let found = self.lookup(idx, condition, Facet::Start);
                    direct.extend(found.references);
                    match found.value {
                        Some(Operand::Instances(list)) => list,
                        scalar => truth_instances(scalar.as_ref()),
                    }
                }
            };
            let mut instances = self.algebra.clean(&instances, false, false);
            for inst in &mut instances {
                inst.is_first = false;
            }
            return instances;
        }

        let Some(start) = &clause.start else {
            return Vec::new();
        };
        let starts = self.event_times(idx, start, Facet::Start, parents, direct);

        let instances = match (&clause.end, &clause.duration) {
            (Some(end), _) => match (start.constant_value(), end.constant_value()) {
                (Some(s), Some(e)) => {
                    self.instances_from_duration(&starts, Some(ScalarValue::new(e - s)), repeating)
                }
                _ => {
                    let ends = self.event_times(idx, end, Facet::End, parents, direct);
                    self.instances_from_ends(&starts, &ends)
                }
            },
            (None, Some(duration)) => {
                let found = self.lookup(idx, duration, Facet::Duration);
                direct.extend(found.references);
                let duration = match found.value {
                    Some(Operand::Scalar(d)) => Some(d),
                    Some(Operand::Instances(list)) => list.first().map(|i| ScalarValue {
                        value: i.start,
                        references: i.references.clone(),
                    }),
                    None => None,
                };
                self.instances_from_duration(&starts, duration, repeating)
            }
            (None, None) => self.instances_from_duration(&starts, None, repeating),
        };

        match parents {
            Some(parents) if start.is_constant() => self.cap_to_owning_parent(instances, parents),
            _ => instances,
        }
    }

    /// Sorted event instants an expression yields, leading gaps dropped.
    ///
    /// Constants inside a group are relative to each parent instance.
    fn event_times(
        &mut self,
        idx: ObjIdx,
        expr: &Expression,
        facet: Facet,
        parents: Option<&[Instance]>,
        direct: &mut References,
    ) -> Vec<Instance> {
        let found = self.lookup(idx, expr, facet);
        direct.extend(found.references);
        let mut events = match (found.value, parents) {
            (Some(Operand::Scalar(offset)), Some(parents)) if expr.is_constant() => {
                self.relative_to_parent(parents, offset)
            }
            (Some(value), _) => value.into_instances(),
            (None, _) => Vec::new(),
        };
        events.retain(|e| !e.is_first);
        events.sort_by(|a, b| a.start.total_cmp(&b.start));
        events
    }

    fn relative_to_parent(&mut self, parents: &[Instance], offset: ScalarValue) -> Vec<Instance> {
        self.algebra
            .combine(
                &Operand::Instances(parents.to_vec()),
                &Operand::Scalar(offset),
                Operator::Add,
            )
            .map(Operand::into_instances)
            .unwrap_or_default()
    }

    /// One instance per distinct start, lasting `duration` or until the next start.
    fn instances_from_duration(
        &mut self,
        starts: &[Instance],
        duration: Option<ScalarValue>,
        repeating: Option<&ScalarValue>,
    ) -> Vec<Instance> {
        let mut duration = duration;
        if let (Some(d), Some(period)) = (duration.as_mut(), repeating)
            && period.value > 0.0
            && d.value > period.value
        {
            d.value = period.value;
        }

        let mut distinct: Vec<Instance> = Vec::with_capacity(starts.len());
        for s in starts {
            match distinct.last_mut() {
                Some(last) if last.start == s.start => {
                    last.references.extend(s.references.iter().cloned());
                }
                _ => distinct.push(s.clone()),
            }
        }

        let mut out = Vec::with_capacity(distinct.len());
        for (k, s) in distinct.iter().enumerate() {
            let mut end = duration.as_ref().map(|d| s.start + d.value);
            if let Some(next) = distinct.get(k + 1)
                && end.is_none_or(|e| e > next.start)
            {
                end = Some(next.start);
            }
            let mut references = s.references.clone();
            if let Some(d) = &duration {
                references.extend(d.references.iter().cloned());
            }
            out.push(Instance {
                id: self.algebra.next_id(),
                start: s.start,
                end,
                references,
                caps: s.caps.clone(),
                ..Instance::default()
            });
        }
        out
    }

    /// Pair start events with end events in time order.
    ///
    /// At equal times ends are handled first. A start while open closes the running instance.
    fn instances_from_ends(&mut self, starts: &[Instance], ends: &[Instance]) -> Vec<Instance> {
        let mut events: Vec<(f64, bool, &Instance)> = starts
            .iter()
            .map(|s| (s.start, false, s))
            .chain(ends.iter().map(|e| (e.start, true, e)))
            .collect();
        events.sort_by(|a, b| a.0.total_cmp(&b.0).then(b.1.cmp(&a.1)));

        let mut out = Vec::new();
        let mut open: Option<Instance> = None;
        for (time, is_end, src) in events {
            if is_end {
                if let Some(mut running) = open.take() {
                    running.end = Some(time);
                    running.references.extend(src.references.iter().cloned());
                    out.push(running);
                }
                continue;
            }
            if let Some(mut running) = open.take() {
                running.end = Some(time);
                out.push(running);
            }
            open = Some(Instance {
                id: self.algebra.next_id(),
                start: time,
                end: None,
                references: src.references.clone(),
                caps: src.caps.clone(),
                ..Instance::default()
            });
        }
        out.extend(open);
        out
    }

    /// Clip parent-relative instances to the parent instance they were derived from.
    fn cap_to_owning_parent(
        &mut self,
        instances: Vec<Instance>,
        parents: &[Instance],
    ) -> Vec<Instance> {
        let mut out = Vec::with_capacity(instances.len());
        for inst in instances {
            let owner = inst.references.iter().rev().find_map(|r| match r {
                Reference::Instance(id) => parents.iter().find(|p| &p.id == id),
                _ => None,
            });
            let Some(owner) = owner else {
                out.push(inst);
                continue;
            };
            let cap = Cap {
                id: owner.id.clone(),
                start: owner.start,
                end: owner.end,
            };
            for mut capped in self
                .algebra
                .cap(std::slice::from_ref(&inst), std::slice::from_ref(owner))
            {
                add_cap(&mut capped.caps, &cap);
                out.push(capped);
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/resolve/object.rs"]
mod tests;
