use std::collections::HashSet;

use crate::foundation::core::{Instance, Time, join_caps};
use crate::instance::InstanceAlgebra;

/// Ordering of events sharing one instant.
///
/// Ends run before starts so touching instances do not overlap; a zero-length instance ends after
/// its own start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Phase {
    End,
    Start,
    ZeroEnd,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Event {
    pub(crate) time: Time,
    pub(crate) phase: Phase,
    /// Index of the source instance.
    pub(crate) src: usize,
}

/// Start and end events of `instances`, sorted by time, phase, then input position.
///
/// An inverted instance (`end < start`) is treated as zero-length at its start.
pub(crate) fn instance_events(instances: &[Instance]) -> Vec<Event> {
    let mut events = Vec::with_capacity(instances.len() * 2);
    for (src, inst) in instances.iter().enumerate() {
        events.push(Event {
            time: inst.start,
            phase: Phase::Start,
            src,
        });
        if let Some(end) = inst.end {
            let end = end.max(inst.start);
            let phase = if end == inst.start {
                Phase::ZeroEnd
            } else {
                Phase::End
            };
            events.push(Event {
                time: end,
                phase,
                src,
            });
        }
    }
    sort_events(&mut events);
    events
}

pub(crate) fn sort_events(events: &mut [Event]) {
    events.sort_by(|a, b| {
        a.time
            .total_cmp(&b.time)
            .then(a.phase.cmp(&b.phase))
            .then(a.src.cmp(&b.src))
    });
}

/// Union provenance of `src` into `dst`, keeping the earliest original start.
pub(crate) fn absorb(dst: &mut Instance, src: &Instance) {
    dst.references.extend(src.references.iter().cloned());
    join_caps(&mut dst.caps, &src.caps);
    dst.original_start = match (dst.original_start, src.original_start) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };
}

impl InstanceAlgebra {
    /// Rebuild a minimal, chronologically sorted instance list.
    ///
    /// With `allow_merge`, overlapping runs fuse into one instance carrying the union of their
    /// references. Without it, overlaps are split and the later-arriving instance stays on top; a
    /// segment revealed when the top instance ends gets a fresh id. `allow_zero_gaps` fuses (or,
    /// without merge, continues) instances that exactly touch.
    pub fn clean(
        &mut self,
        instances: &[Instance],
        allow_merge: bool,
        allow_zero_gaps: bool,
    ) -> Vec<Instance> {
        if allow_merge {
            self.clean_merge(instances, allow_zero_gaps)
        } else {
            self.clean_split(instances, allow_zero_gaps)
        }
    }

    fn clean_merge(&mut self, instances: &[Instance], allow_zero_gaps: bool) -> Vec<Instance> {
        let mut out: Vec<Instance> = Vec::new();
        let mut used = HashSet::new();
        let mut active = 0usize;

        for ev in instance_events(instances) {
            let inst = &instances[ev.src];
            match ev.phase {
                Phase::Start => {
                    if active > 0 {
                        if let Some(last) = out.last_mut() {
                            absorb(last, inst);
                        }
                    } else if let Some(last) = out
                        .last_mut()
                        .filter(|l| allow_zero_gaps && l.end == Some(ev.time))
                    {
                        last.end = None;
                        last.original_end = None;
                        absorb(last, inst);
                    } else {
                        let id = self.claim_id(&inst.id, &mut used);
                        out.push(Instance {
                            id,
                            start: ev.time,
                            end: None,
                            references: inst.references.clone(),
                            caps: inst.caps.clone(),
                            original_start: inst.original_start,
                            original_end: None,
                            is_first: inst.is_first,
                            from_instance_id: inst.from_instance_id.clone(),
                        });
                    }
                    active += 1;
                }
                Phase::End | Phase::ZeroEnd => {
                    active = active.saturating_sub(1);
                    if active == 0
                        && let Some(last) = out.last_mut()
                    {
                        last.end = Some(ev.time);
                        last.original_end = inst.original_end;
                    }
                }
            }
        }
        out
    }

    fn clean_split(&mut self, instances: &[Instance], allow_zero_gaps: bool) -> Vec<Instance> {
        let mut sweep = SplitSweep {
            instances,
            allow_zero_gaps,
            out: Vec::new(),
            origin: Vec::new(),
            used: HashSet::new(),
        };
        let mut stack: Vec<usize> = Vec::new();
        let mut open: Option<(usize, usize)> = None;

        for ev in instance_events(instances) {
            match ev.phase {
                Phase::Start => {
                    if let Some((src, o)) = open.take() {
                        sweep.close(o, src, ev.time);
                    }
                    stack.push(ev.src);
                    open = Some((ev.src, sweep.open(self, ev.src, ev.time)));
                }
                Phase::End | Phase::ZeroEnd => {
                    let Some(pos) = stack.iter().rposition(|&s| s == ev.src) else {
                        continue;
                    };
                    stack.remove(pos);
                    let Some((src, o)) = open else { continue };
                    if src != ev.src {
                        continue;
                    }
                    sweep.close(o, src, ev.time);
                    open = stack
                        .last()
                        .map(|&top| (top, sweep.open(self, top, ev.time)));
                }
            }
        }

        let SplitSweep { out, origin, .. } = sweep;
        out.into_iter()
            .zip(origin)
            .filter(|(seg, src)| !seg.is_zero_length() || is_zero_source(&instances[*src]))
            .map(|(seg, _)| seg)
            .collect()
    }
}

/// Output of a non-merging clean, with the source index of every segment.
struct SplitSweep<'a> {
    instances: &'a [Instance],
    allow_zero_gaps: bool,
    out: Vec<Instance>,
    origin: Vec<usize>,
    used: HashSet<String>,
}

impl SplitSweep<'_> {
    fn open(&mut self, algebra: &mut InstanceAlgebra, src: usize, time: Time) -> usize {
        if self.allow_zero_gaps
            && let (Some(last), Some(&last_src)) = (self.out.last_mut(), self.origin.last())
            && last_src == src
            && last.end == Some(time)
        {
            last.end = None;
            return self.out.len() - 1;
        }

        let inst = &self.instances[src];
        let revealed = time != inst.start;
        let id = algebra.claim_id(&inst.id, &mut self.used);
        self.out.push(Instance {
            id,
            start: time,
            end: None,
            references: inst.references.clone(),
            caps: inst.caps.clone(),
            original_start: if revealed {
                inst.original_start.or(Some(inst.start))
            } else {
                inst.original_start
            },
            original_end: inst.original_end,
            is_first: inst.is_first && !revealed,
            from_instance_id: inst.from_instance_id.clone(),
        });
        self.origin.push(src);
        self.out.len() - 1
    }

    /// Close segment `o`. A zero-length leftover of a longer source is dropped right away so its
    /// id can be reused by the segment that replaces it.
    fn close(&mut self, o: usize, src: usize, time: Time) {
        let source = &self.instances[src];
        close_segment(&mut self.out[o], source, time);
        if o + 1 == self.out.len() && self.out[o].is_zero_length() && !is_zero_source(source) {
            if let Some(dropped) = self.out.pop() {
                self.used.remove(&dropped.id);
            }
            self.origin.pop();
        }
    }
}

fn close_segment(seg: &mut Instance, src: &Instance, time: Time) {
    seg.end = Some(time);
    let natural_end = src.end.map(|e| e.max(src.start));
    if natural_end != Some(time) && seg.original_end.is_none() {
        seg.original_end = Some(src.end);
    }
}

fn is_zero_source(inst: &Instance) -> bool {
    inst.end.is_some_and(|e| e <= inst.start)
}

#[cfg(test)]
#[path = "../../tests/unit/instance/clean.rs"]
mod tests;
