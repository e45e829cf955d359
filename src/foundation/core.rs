use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Timeline time. Units are whatever the caller uses (typically milliseconds).
pub type Time = f64;

/// Provenance tag: what contributed to an instance, or what an object reads from.
///
/// Serialized as its string form: `#id`, `.class`, `$layer` or `@instance`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Reference {
    /// `#id`: a timeline object.
    Object(String),
    /// `.name`: every object carrying the class.
    Class(String),
    /// `$name`: every object on the layer.
    Layer(String),
    /// `@id`: one resolved instance.
    Instance(String),
}

impl Reference {
    /// Name without the prefix character.
    pub fn name(&self) -> &str {
        match self {
            Self::Object(s) | Self::Class(s) | Self::Layer(s) | Self::Instance(s) => s,
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object(id) => write!(f, "#{id}"),
            Self::Class(name) => write!(f, ".{name}"),
            Self::Layer(name) => write!(f, "${name}"),
            Self::Instance(id) => write!(f, "@{id}"),
        }
    }
}

impl FromStr for Reference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let prefix = chars.next();
        let name = chars.as_str().to_owned();
        if name.is_empty() {
            return Err(format!("empty reference name in {s:?}"));
        }
        match prefix {
            Some('#') => Ok(Self::Object(name)),
            Some('.') => Ok(Self::Class(name)),
            Some('$') => Ok(Self::Layer(name)),
            Some('@') => Ok(Self::Instance(name)),
            _ => Err(format!("unknown reference prefix in {s:?}")),
        }
    }
}

impl From<Reference> for String {
    fn from(r: Reference) -> Self {
        r.to_string()
    }
}

impl TryFrom<String> for Reference {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// De-duplicated, sorted reference set.
pub type References = BTreeSet<Reference>;

/// An ancestor group's bounding interval.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cap {
    /// Id of the bounding instance.
    pub id: String,
    /// Bound start.
    pub start: Time,
    /// Bound end, `None` for unbounded.
    pub end: Option<Time>,
}

/// Caps carried by an instance.
pub type Caps = SmallVec<[Cap; 2]>;

/// Add `cap` to `caps` unless a cap with the same id is already present.
pub(crate) fn add_cap(caps: &mut Caps, cap: &Cap) {
    if !caps.iter().any(|c| c.id == cap.id) {
        caps.push(cap.clone());
    }
}

pub(crate) fn join_caps(caps: &mut Caps, other: &Caps) {
    for c in other {
        add_cap(caps, c);
    }
}

fn caps_is_empty(caps: &Caps) -> bool {
    caps.is_empty()
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// A present `originalEnd` field, where `null` is an unbounded end.
fn present_end<'de, D>(deserializer: D) -> Result<Option<Option<Time>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<Time>::deserialize(deserializer).map(Some)
}

/// A resolved `[start, end)` interval with provenance.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    /// Instance id, unique within any instance list returned by the resolver.
    pub id: String,
    /// Start time.
    pub start: Time,
    /// End time, `None` for unbounded.
    pub end: Option<Time>,
    /// What contributed to this instance.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub references: References,
    /// Ancestor bounds that still constrain this instance.
    #[serde(default, skip_serializing_if = "caps_is_empty")]
    pub caps: Caps,
    /// Start before the first truncation, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_start: Option<Time>,
    /// End before the first truncation, if any. `Some(None)` records an unbounded original end.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_end"
    )]
    pub original_end: Option<Option<Time>>,
    /// Leading segment produced by inverting a list that does not start at 0.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_first: bool,
    /// Source instance this one was carved from during layer conflict resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_instance_id: Option<String>,
}

impl Instance {
    /// Plain instance without provenance.
    pub fn new(id: impl Into<String>, start: Time, end: Option<Time>) -> Self {
        Self {
            id: id.into(),
            start,
            end,
            ..Self::default()
        }
    }

    /// Builder: attach references.
    pub fn with_references(mut self, references: References) -> Self {
        self.references = references;
        self
    }

    /// End as a plain number, infinity when unbounded.
    pub fn end_or_inf(&self) -> Time {
        self.end.unwrap_or(f64::INFINITY)
    }

    /// `start == end`.
    pub fn is_zero_length(&self) -> bool {
        self.end == Some(self.start)
    }

    /// Length of the instance, infinity when unbounded.
    pub fn duration(&self) -> Time {
        self.end_or_inf() - self.start
    }

    /// Whether the instance is active at `time`.
    ///
    /// Zero-length instances are active exactly at their start.
    pub fn is_active_at(&self, time: Time) -> bool {
        if self.is_zero_length() {
            return self.start == time;
        }
        self.start <= time && time < self.end_or_inf()
    }

    /// Move the end, remembering the first pre-truncation end.
    pub(crate) fn set_end(&mut self, end: Option<Time>) {
        if self.original_end.is_none() && end != self.end {
            self.original_end = Some(self.end);
        }
        self.end = end;
    }

    /// Move the start, remembering the first pre-truncation start.
    pub(crate) fn set_start(&mut self, start: Time) {
        if self.original_start.is_none() && start != self.start {
            self.original_start = Some(self.start);
        }
        self.start = start;
    }
}

/// A plain number plus what it was derived from.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScalarValue {
    /// The number.
    pub value: f64,
    /// Provenance of the number.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub references: References,
}

impl ScalarValue {
    /// Scalar without provenance.
    pub fn new(value: f64) -> Self {
        Self {
            value,
            references: References::new(),
        }
    }
}

/// Minimum of two ends where `None` is infinity.
pub(crate) fn min_end(a: Option<Time>, b: Option<Time>) -> Option<Time> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
