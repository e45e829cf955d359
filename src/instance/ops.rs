use crate::expression::Operator;
use crate::foundation::core::{Instance, Reference, ScalarValue, join_caps, min_end};
use crate::instance::{InstanceAlgebra, Operand, RepeatOptions, dedupe_ids};

impl InstanceAlgebra {
    /// Temporal complement of `instances`, from 0 to infinity.
    ///
    /// A leading gap before the first instance is flagged `is_first`. Every gap references the
    /// instances bordering it.
    pub fn invert(&mut self, instances: &[Instance]) -> Vec<Instance> {
        let cleaned = self.clean(instances, true, true);
        let Some(first) = cleaned.first() else {
            return vec![Instance {
                id: self.next_id(),
                start: 0.0,
                end: None,
                is_first: true,
                ..Instance::default()
            }];
        };

        let mut out: Vec<Instance> = Vec::with_capacity(cleaned.len() + 1);
        if first.start > 0.0 {
            out.push(Instance {
                id: self.next_id(),
                start: 0.0,
                end: None,
                is_first: true,
                ..Instance::default()
            });
        }
        for inst in &cleaned {
            let border = Reference::Instance(inst.id.clone());
            if let Some(gap) = out.last_mut().filter(|g| g.end.is_none()) {
                gap.end = Some(inst.start);
                gap.references.insert(border.clone());
            }
            if let Some(end) = inst.end {
                let mut references = inst.references.clone();
                references.insert(border);
                out.push(Instance {
                    id: self.next_id(),
                    start: end,
                    end: None,
                    references,
                    caps: inst.caps.clone(),
                    ..Instance::default()
                });
            }
        }
        out
    }

    /// Clip every instance into every bound it overlaps, then merge.
    ///
    /// Truncation is recorded in `original_start` / `original_end` and the bound's references are
    /// added to the clipped instance. An instance touching a bound only at its edge leaves a
    /// zero-length result there, unless that instant is already covered.
    pub fn cap(&mut self, instances: &[Instance], bounds: &[Instance]) -> Vec<Instance> {
        let mut out: Vec<Instance> = Vec::new();
        for inst in instances {
            for bound in bounds {
                if inst.start > bound.end_or_inf() || inst.end_or_inf() < bound.start {
                    continue;
                }
                let mut capped = inst.clone();
                if bound.start > capped.start {
                    capped.set_start(bound.start);
                }
                if bound.end_or_inf() < capped.end_or_inf() {
                    capped.set_end(bound.end);
                }
                if capped.is_zero_length()
                    && out
                        .iter()
                        .any(|o| o.start <= capped.start && capped.start <= o.end_or_inf())
                {
                    continue;
                }
                capped
                    .references
                    .extend(bound.references.iter().cloned());
                out.push(capped);
            }
        }
        dedupe_ids(&mut out);
        self.clean(&out, true, true)
    }

    /// Expand every instance into repetitions of `period`.
    ///
    /// The first repetition is the one running at `options.time` (or the instance itself when it
    /// starts later). Each repetition is clipped to the instance's caps; empty ones are dropped. A
    /// non-positive period returns the input unchanged.
    pub fn repeat(
        &mut self,
        instances: &[Instance],
        period: &ScalarValue,
        options: &RepeatOptions,
    ) -> Vec<Instance> {
        let p = period.value;
        if !(p > 0.0) || !p.is_finite() {
            return instances.to_vec();
        }

        let mut out = Vec::new();
        for inst in instances {
            let mut start = (options.time - (options.time - inst.start) % p).max(inst.start);
            let mut end = inst.end.map(|e| e + (start - inst.start));
            for _ in 0..options.limit_count {
                if options.limit_time.is_some_and(|limit| start >= limit) {
                    break;
                }
                let (mut s, mut e) = (start, end);
                for cap in &inst.caps {
                    s = s.max(cap.start);
                    e = min_end(e, cap.end);
                }
                if e.is_none_or(|e| e > s) {
                    let mut references = inst.references.clone();
                    references.extend(period.references.iter().cloned());
                    out.push(Instance {
                        id: self.next_id(),
                        start: s,
                        end: e,
                        references,
                        caps: inst.caps.clone(),
                        ..Instance::default()
                    });
                }
                start += p;
                end = end.map(|e| e + p);
            }
        }
        self.clean(&out, false, false)
    }

    /// Elementwise arithmetic over two operands.
    ///
    /// The i-th instance of `a` is paired with the i-th of `b`; a scalar acts as the single
    /// instance `[v, v]` and pairs with every instance. `is_first` instances pass through
    /// untouched. A pair is skipped when its start or its end cannot be computed (division by
    /// zero); an unbounded end stays unbounded. Two scalars produce a scalar.
    pub fn combine(&mut self, a: &Operand, b: &Operand, op: Operator) -> Option<Operand> {
        if let (Operand::Scalar(x), Operand::Scalar(y)) = (a, b) {
            let value = op.apply(x.value, y.value)?;
            let mut references = x.references.clone();
            references.extend(y.references.iter().cloned());
            return Some(Operand::Scalar(ScalarValue { value, references }));
        }

        let len = operand_len(a).min(operand_len(b));
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            let (Some(ai), Some(bi)) = (operand_at(a, i), operand_at(b, i)) else {
                break;
            };
            let (start, end, is_first) = if ai.is_first {
                (ai.start, ai.end, true)
            } else if bi.is_first {
                (bi.start, bi.end, true)
            } else {
                let Some(start) = op.apply(ai.start, bi.start) else {
                    continue;
                };
                let end = match (ai.end, bi.end) {
                    (Some(x), Some(y)) => match op.apply(x, y) {
                        Some(end) => Some(end),
                        None => continue,
                    },
                    _ => None,
                };
                (start, end, false)
            };
            let mut references = ai.references.clone();
            references.extend(bi.references.iter().cloned());
            let mut caps = ai.caps.clone();
            join_caps(&mut caps, &bi.caps);
            out.push(Instance {
                id: self.next_id(),
                start,
                end,
                references,
                caps,
                is_first,
                ..Instance::default()
            });
        }
        Some(Operand::Instances(self.clean(&out, false, false)))
    }
}

fn operand_len(o: &Operand) -> usize {
    match o {
        Operand::Scalar(_) => usize::MAX,
        Operand::Instances(list) => list.len(),
    }
}

fn operand_at(o: &Operand, i: usize) -> Option<Instance> {
    match o {
        Operand::Scalar(s) => Some(Instance {
            start: s.value,
            end: Some(s.value),
            references: s.references.clone(),
            ..Instance::default()
        }),
        Operand::Instances(list) => list.get(i).cloned(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/instance/ops.rs"]
mod tests;
