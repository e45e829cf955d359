//! Timeline resolver: turns declarative, expression-driven timeline objects into absolute,
//! per-layer, conflict-free time intervals.
//!
//! - Describe objects with [`TimelineObject`] and [`Enable`] clauses (`start`/`end`/`duration`,
//!   `while`, `repeating`), where values are numbers or expressions over other objects
//!   (`"#video.end + 10"`, `".graphics & !$overlay"`).
//! - Resolve with [`resolve_timeline`] (or [`resolve_timeline_with_cache`] across calls).
//! - Project the result at an instant with [`get_state`].
#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub(crate) mod expression;
pub(crate) mod foundation;
pub(crate) mod instance;
pub(crate) mod resolve;
pub(crate) mod scene;
pub(crate) mod schema;
pub(crate) mod state;

pub use crate::expression::{
    ExprError, Expression, ExpressionNode, Operator, clear_expression_cache, interpret_expression,
    parse_expression, simplify_expression, validate_expression,
};
pub use crate::foundation::core::{
    Cap, Caps, Instance, Reference, References, ScalarValue, Time,
};
pub use crate::foundation::error::{TimelineError, TimelineResult};
pub use crate::foundation::ids::InstanceIdGen;
pub use crate::instance::{InstanceAlgebra, Operand, RepeatOptions};
pub use crate::resolve::{
    ResolveState, ResolveStatistics, ResolvedInfo, ResolvedObject, ResolvedTimeline,
    ResolverCache, resolve_timeline, resolve_timeline_with_cache,
};
pub use crate::scene::model::{Enable, TimelineKeyframe, TimelineObject};
pub use crate::scene::options::{DEFAULT_CONFLICT_MAX_DEPTH, DEFAULT_LIMIT_COUNT, ResolveOptions};
pub use crate::schema::validate_timeline;
pub use crate::state::{EventType, NextEvent, StateEntry, TimelineState, get_state};
