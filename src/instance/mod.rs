//! Interval algebra over instance lists.
//!
//! Every operation takes its inputs by reference and returns a fresh list. The only state is the
//! id generator, so ids issued by one resolve call never collide.

use std::collections::HashSet;

use crate::foundation::core::{Instance, References, ScalarValue, Time};
use crate::foundation::ids::InstanceIdGen;

mod boolean;
mod clean;
mod ops;
mod parent;

pub(crate) use boolean::truth_instances;
pub(crate) use clean::{Phase, instance_events};

/// Value of a sub-expression: a plain number or a list of instances.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A number with provenance.
    Scalar(ScalarValue),
    /// Instances with provenance.
    Instances(Vec<Instance>),
}

impl Operand {
    /// References carried by the operand.
    pub fn references(&self) -> References {
        match self {
            Self::Scalar(s) => s.references.clone(),
            Self::Instances(list) => list
                .iter()
                .flat_map(|i| i.references.iter().cloned())
                .collect(),
        }
    }

    /// Instances, where a scalar becomes one open-ended instance starting at its value.
    pub fn into_instances(self) -> Vec<Instance> {
        match self {
            Self::Scalar(s) => vec![Instance {
                start: s.value,
                references: s.references,
                ..Instance::default()
            }],
            Self::Instances(list) => list,
        }
    }
}

/// Limits for [`InstanceAlgebra::repeat`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepeatOptions {
    /// First repetition is the one active at or after this time.
    pub time: Time,
    /// Number of repetitions emitted per instance.
    pub limit_count: usize,
    /// No repetition starts at or after this time.
    pub limit_time: Option<Time>,
}

impl Default for RepeatOptions {
    fn default() -> Self {
        Self {
            time: 0.0,
            limit_count: 2,
            limit_time: None,
        }
    }
}

/// Interval operations sharing one instance id generator.
#[derive(Debug, Clone, Default)]
pub struct InstanceAlgebra {
    ids: InstanceIdGen,
}

impl InstanceAlgebra {
    /// Algebra issuing ids from `ids`.
    pub fn new(ids: InstanceIdGen) -> Self {
        Self { ids }
    }

    /// Issue a fresh instance id.
    pub fn next_id(&mut self) -> String {
        self.ids.next_id()
    }

    /// Current id generator state.
    pub fn ids(&self) -> &InstanceIdGen {
        &self.ids
    }

    /// `candidate` if it is not taken yet, a fresh id otherwise.
    fn claim_id(&mut self, candidate: &str, used: &mut HashSet<String>) -> String {
        if !candidate.is_empty() && used.insert(candidate.to_owned()) {
            return candidate.to_owned();
        }
        loop {
            let id = self.ids.next_id();
            if used.insert(id.clone()) {
                return id;
            }
        }
    }
}

/// Give every instance a distinct id by suffixing repeats with `_<n>`.
pub(crate) fn dedupe_ids(instances: &mut [Instance]) {
    let mut seen: HashSet<String> = HashSet::new();
    for inst in instances.iter_mut() {
        if seen.insert(inst.id.clone()) {
            continue;
        }
        let mut n = 1usize;
        loop {
            let candidate = format!("{}_{n}", inst.id);
            if seen.insert(candidate.clone()) {
                inst.id = candidate;
                break;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/instance/mod.rs"]
mod tests;
