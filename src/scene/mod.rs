//! Boundary model: what callers hand to the resolver.

pub(crate) mod model;
pub(crate) mod options;
