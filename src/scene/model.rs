use serde::{Deserialize, Deserializer, Serialize};

use crate::expression::Expression;

/// One enable clause: `{while}` or `{start, end | duration}`, plus optional `repeating`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enable {
    /// Active whenever the expression is.
    #[serde(rename = "while", default, skip_serializing_if = "Option::is_none")]
    pub while_: Option<Expression>,
    /// Start time(s).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<Expression>,
    /// End time(s).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<Expression>,
    /// Length of each instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Expression>,
    /// Repetition period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeating: Option<Expression>,
}

impl Enable {
    /// `{start}` clause.
    pub fn start(start: impl Into<Expression>) -> Self {
        Self {
            start: Some(start.into()),
            ..Self::default()
        }
    }

    /// `{while}` clause.
    pub fn when(condition: impl Into<Expression>) -> Self {
        Self {
            while_: Some(condition.into()),
            ..Self::default()
        }
    }

    /// Builder: set `end`.
    pub fn end(mut self, end: impl Into<Expression>) -> Self {
        self.end = Some(end.into());
        self
    }

    /// Builder: set `duration`.
    pub fn duration(mut self, duration: impl Into<Expression>) -> Self {
        self.duration = Some(duration.into());
        self
    }

    /// Builder: set `repeating`.
    pub fn repeating(mut self, period: impl Into<Expression>) -> Self {
        self.repeating = Some(period.into());
        self
    }
}

/// Content override active for part of its parent's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineKeyframe {
    /// Unique id.
    pub id: String,
    /// When the keyframe applies.
    #[serde(default, deserialize_with = "one_or_many")]
    pub enable: Vec<Enable>,
    /// Classes the keyframe belongs to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    /// Disabled keyframes never apply.
    #[serde(default, skip_serializing_if = "is_false")]
    pub disabled: bool,
    /// Content merged over the parent's content while active.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub content: serde_json::Value,
}

/// Input object of a timeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineObject {
    /// Unique id.
    pub id: String,
    /// When the object is active.
    #[serde(default, deserialize_with = "one_or_many")]
    pub enable: Vec<Enable>,
    /// Layer; empty means ethereal (resolved but never on a layer).
    #[serde(default, deserialize_with = "layer_name")]
    pub layer: String,
    /// Nested objects (requires `is_group`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TimelineObject>,
    /// Content overrides.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keyframes: Vec<TimelineKeyframe>,
    /// Classes the object belongs to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    /// Disabled objects resolve to no instances.
    #[serde(default, skip_serializing_if = "is_false")]
    pub disabled: bool,
    /// Whether the object may have children.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_group: bool,
    /// Conflict priority on its layer; higher wins.
    #[serde(default)]
    pub priority: f64,
    /// Fuse adjacent or overlapping instances.
    #[serde(default, skip_serializing_if = "is_false")]
    pub seamless: bool,
    /// Opaque payload.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub content: serde_json::Value,
}

impl TimelineObject {
    /// Ethereal object without enable clauses.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Builder: put the object on `layer`.
    pub fn on_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = layer.into();
        self
    }

    /// Builder: add an enable clause.
    pub fn with_enable(mut self, enable: Enable) -> Self {
        self.enable.push(enable);
        self
    }

    /// Builder: add a class.
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Builder: set the priority.
    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = priority;
        self
    }

    /// Builder: make this a group holding `children`.
    pub fn with_children(mut self, children: Vec<TimelineObject>) -> Self {
        self.is_group = true;
        self.children = children;
        self
    }

    /// Builder: add a keyframe.
    pub fn with_keyframe(mut self, keyframe: TimelineKeyframe) -> Self {
        self.keyframes.push(keyframe);
        self
    }

    /// Builder: set the content payload.
    pub fn with_content(mut self, content: serde_json::Value) -> Self {
        self.content = content;
        self
    }

    /// Builder: fuse adjacent instances.
    pub fn seamless(mut self) -> Self {
        self.seamless = true;
        self
    }

    /// Builder: disable the object.
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

impl TimelineKeyframe {
    /// Keyframe with one enable clause.
    pub fn new(id: impl Into<String>, enable: Enable) -> Self {
        Self {
            id: id.into(),
            enable: vec![enable],
            ..Self::default()
        }
    }

    /// Builder: set the content payload.
    pub fn with_content(mut self, content: serde_json::Value) -> Self {
        self.content = content;
        self
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<Enable>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Many(Vec<Enable>),
        One(Enable),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Many(list) => Ok(list),
        Repr::One(one) => Ok(vec![one]),
    }
}

fn layer_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Int(i64),
        Float(f64),
        Null(()),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Text(s) => Ok(s),
        Repr::Int(v) => Ok(v.to_string()),
        Repr::Float(v) => Ok(v.to_string()),
        Repr::Null(()) => Ok(String::new()),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/model.rs"]
mod tests;
