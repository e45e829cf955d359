use crate::expression::Operator;
use crate::foundation::core::{Instance, join_caps};
use crate::instance::clean::{Event, Phase};
use crate::instance::{InstanceAlgebra, Operand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

impl InstanceAlgebra {
    /// `&` / `|` of two operands as one chronological sweep.
    ///
    /// A non-zero scalar is always active, a zero scalar and a missing operand never are. The
    /// result value is evaluated once per instant, after every event at that instant; each time
    /// it flips on, a new instance opens carrying the references and caps of everything active.
    pub fn boolean(
        &mut self,
        left: Option<&Operand>,
        right: Option<&Operand>,
        op: Operator,
    ) -> Vec<Instance> {
        let left = truth_instances(left);
        let right = truth_instances(right);

        let mut events: Vec<(Event, Side)> = Vec::new();
        for (side, list) in [(Side::Left, &left), (Side::Right, &right)] {
            for (src, inst) in list.iter().enumerate() {
                if inst.end.is_some_and(|e| e <= inst.start) {
                    continue;
                }
                events.push((
                    Event {
                        time: inst.start,
                        phase: Phase::Start,
                        src,
                    },
                    side,
                ));
                if let Some(end) = inst.end {
                    events.push((
                        Event {
                            time: end,
                            phase: Phase::End,
                            src,
                        },
                        side,
                    ));
                }
            }
        }
        events.sort_by(|(a, sa), (b, sb)| {
            a.time
                .total_cmp(&b.time)
                .then(a.phase.cmp(&b.phase))
                .then((*sa as u8).cmp(&(*sb as u8)))
                .then(a.src.cmp(&b.src))
        });

        let mut active_left: Vec<usize> = Vec::new();
        let mut active_right: Vec<usize> = Vec::new();
        let mut out: Vec<Instance> = Vec::new();
        let mut value = false;

        let mut i = 0;
        while i < events.len() {
            let time = events[i].0.time;
            while i < events.len() && events[i].0.time == time {
                let (ev, side) = events[i];
                let active = match side {
                    Side::Left => &mut active_left,
                    Side::Right => &mut active_right,
                };
                match ev.phase {
                    Phase::Start => active.push(ev.src),
                    Phase::End | Phase::ZeroEnd => active.retain(|&s| s != ev.src),
                }
                i += 1;
            }

            let next = match op {
                Operator::Or => !active_left.is_empty() || !active_right.is_empty(),
                _ => !active_left.is_empty() && !active_right.is_empty(),
            };
            if next && !value {
                let mut opened = Instance {
                    id: self.next_id(),
                    start: time,
                    end: None,
                    ..Instance::default()
                };
                for (&src, list) in active_left
                    .iter()
                    .map(|s| (s, &left))
                    .chain(active_right.iter().map(|s| (s, &right)))
                {
                    opened.references.extend(list[src].references.iter().cloned());
                    join_caps(&mut opened.caps, &list[src].caps);
                }
                out.push(opened);
            } else if !next
                && value
                && let Some(last) = out.last_mut()
            {
                last.end = Some(time);
            }
            value = next;
        }
        out
    }
}

pub(crate) fn truth_instances(operand: Option<&Operand>) -> Vec<Instance> {
    match operand {
        None => Vec::new(),
        Some(Operand::Scalar(s)) if s.value != 0.0 => vec![Instance {
            start: 0.0,
            end: None,
            references: s.references.clone(),
            ..Instance::default()
        }],
        Some(Operand::Scalar(_)) => Vec::new(),
        Some(Operand::Instances(list)) => list.clone(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/instance/boolean.rs"]
mod tests;
