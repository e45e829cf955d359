/// Convenience result type used across the resolver.
pub type TimelineResult<T> = Result<T, TimelineError>;

/// Top-level error taxonomy used by resolver APIs.
#[derive(thiserror::Error, Debug)]
pub enum TimelineError {
    /// Malformed enable expression (unbalanced parentheses, dangling or unknown operator).
    #[error("syntax error: {0}")]
    Syntax(String),

    /// Invalid timeline input, rejected before resolution starts.
    #[error("validation error: {0}")]
    Validation(String),

    /// An object reached itself through the reference graph while still resolving.
    #[error("circular dependency when resolving \"{0}\"")]
    CircularDependency(String),

    /// The conflict-driven fixpoint did not converge.
    #[error(
        "max conflict iterations reached ({iterations}), latest changes: {}",
        .trail.join("; ")
    )]
    MaxIterationsExceeded {
        /// Number of object resolutions performed before giving up.
        iterations: usize,
        /// Most recent instance changes, oldest first.
        trail: Vec<String>,
    },

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TimelineError {
    /// Build a [`TimelineError::Syntax`] value.
    pub fn syntax(msg: impl Into<String>) -> Self {
        Self::Syntax(msg.into())
    }

    /// Build a [`TimelineError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`TimelineError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<crate::expression::ExprError> for TimelineError {
    fn from(err: crate::expression::ExprError) -> Self {
        Self::Syntax(err.to_string())
    }
}

impl From<serde_json::Error> for TimelineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
