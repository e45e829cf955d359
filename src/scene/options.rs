use serde::{Deserialize, Serialize};

use crate::foundation::core::Time;
use crate::instance::RepeatOptions;

/// Default number of repetitions emitted for a repeating object.
pub const DEFAULT_LIMIT_COUNT: usize = 2;
/// Default fixpoint depth; the iteration bound is `object count * depth`.
pub const DEFAULT_CONFLICT_MAX_DEPTH: usize = 5;

/// Options of one resolve call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveOptions {
    /// Reference time; repeating objects expand from the cycle running at this time.
    pub time: Time,
    /// Repetitions per repeating instance (default 2).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_count: Option<usize>,
    /// No repetition starts at or after this time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_time: Option<Time>,
    /// Fixpoint depth (default 5).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict_max_depth: Option<usize>,
    /// Clean overlapping instances of the same object even for single-clause objects.
    #[serde(default)]
    pub resolve_instance_collisions: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self::at(0.0)
    }
}

impl ResolveOptions {
    /// Options with defaults, resolving around `time`.
    pub fn at(time: Time) -> Self {
        Self {
            time,
            limit_count: None,
            limit_time: None,
            conflict_max_depth: None,
            resolve_instance_collisions: false,
        }
    }

    /// Builder: set the repetition count.
    pub fn with_limit_count(mut self, limit_count: usize) -> Self {
        self.limit_count = Some(limit_count);
        self
    }

    /// Builder: set the repetition time limit.
    pub fn with_limit_time(mut self, limit_time: Time) -> Self {
        self.limit_time = Some(limit_time);
        self
    }

    /// Builder: set the fixpoint depth.
    pub fn with_conflict_max_depth(mut self, depth: usize) -> Self {
        self.conflict_max_depth = Some(depth);
        self
    }

    pub(crate) fn conflict_max_depth(&self) -> usize {
        self.conflict_max_depth
            .unwrap_or(DEFAULT_CONFLICT_MAX_DEPTH)
    }

    pub(crate) fn repeat_options(&self) -> RepeatOptions {
        RepeatOptions {
            time: self.time,
            limit_count: self.limit_count.unwrap_or(DEFAULT_LIMIT_COUNT),
            limit_time: self.limit_time,
        }
    }
}
