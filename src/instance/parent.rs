use std::collections::HashSet;

use crate::foundation::core::{Cap, Instance, Reference, Time, add_cap};
use crate::instance::InstanceAlgebra;
use crate::instance::clean::Phase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Owner {
    Parent,
    Child,
}

#[derive(Debug, Clone, Copy)]
struct Point {
    time: Time,
    phase: Phase,
    owner: Owner,
    src: usize,
}

impl InstanceAlgebra {
    /// Keep each child instance alive only while a parent instance is active too.
    ///
    /// Unlike [`InstanceAlgebra::cap`], this tracks which parent occurrence is current: a child
    /// spanning two occurrences of a repeating parent is split at the boundary, and every piece
    /// gets that occurrence as a [`Cap`]. The first piece keeps the child's id.
    pub fn cap_to_parent(&mut self, children: &[Instance], parents: &[Instance]) -> Vec<Instance> {
        let mut points: Vec<Point> = Vec::with_capacity((children.len() + parents.len()) * 2);
        for (owner, list) in [(Owner::Parent, parents), (Owner::Child, children)] {
            for (src, inst) in list.iter().enumerate() {
                points.push(Point {
                    time: inst.start,
                    phase: Phase::Start,
                    owner,
                    src,
                });
                if let Some(end) = inst.end {
                    let end = end.max(inst.start);
                    let phase = if end == inst.start {
                        Phase::ZeroEnd
                    } else {
                        Phase::End
                    };
                    points.push(Point {
                        time: end,
                        phase,
                        owner,
                        src,
                    });
                }
            }
        }
        points.sort_by(|a, b| {
            a.time
                .total_cmp(&b.time)
                .then(a.phase.cmp(&b.phase))
                .then(a.owner.cmp(&b.owner))
                .then(a.src.cmp(&b.src))
        });

        let mut active_parents: Vec<usize> = Vec::new();
        let mut active_children: Vec<usize> = Vec::new();
        let mut out: Vec<Instance> = Vec::new();
        let mut origin: Vec<usize> = Vec::new();
        let mut used: HashSet<String> = HashSet::new();
        let mut current: Option<(usize, usize)> = None;

        for p in points {
            let active = match p.owner {
                Owner::Parent => &mut active_parents,
                Owner::Child => &mut active_children,
            };
            match p.phase {
                Phase::Start => active.push(p.src),
                Phase::End | Phase::ZeroEnd => {
                    if let Some(pos) = active.iter().rposition(|&s| s == p.src) {
                        active.remove(pos);
                    }
                }
            }

            let wanted = active_children.last().copied().zip(active_parents.last().copied());
            if wanted == current {
                continue;
            }
            if let Some((child, _)) = current {
                let seg = out.len() - 1;
                close_piece(&mut out[seg], &children[child], p.time);
            }
            current = wanted;
            if let Some((child, parent)) = wanted {
                let piece = self.open_piece(&children[child], &parents[parent], p.time, &mut used);
                out.push(piece);
                origin.push(child);
            }
        }

        out.into_iter()
            .zip(origin)
            .filter(|(seg, src)| !seg.is_zero_length() || children[*src].is_zero_length())
            .map(|(seg, _)| seg)
            .collect()
    }

    fn open_piece(
        &mut self,
        child: &Instance,
        parent: &Instance,
        time: Time,
        used: &mut HashSet<String>,
    ) -> Instance {
        let mut piece = child.clone();
        piece.id = self.claim_id(&child.id, used);
        piece.end = None;
        if time != child.start {
            piece.set_start(time);
        }
        piece
            .references
            .insert(Reference::Instance(parent.id.clone()));
        add_cap(
            &mut piece.caps,
            &Cap {
                id: parent.id.clone(),
                start: parent.start,
                end: parent.end,
            },
        );
        piece
    }
}

fn close_piece(piece: &mut Instance, child: &Instance, time: Time) {
    piece.end = Some(time);
    if child.end != Some(time) && piece.original_end.is_none() {
        piece.original_end = Some(child.end);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/instance/parent.rs"]
mod tests;
