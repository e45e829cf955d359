use std::collections::HashSet;
use std::fmt;

use crate::expression::lexer::RESERVED_CHARS;
use crate::expression::{Expression, Operator, validate_expression};
use crate::foundation::error::{TimelineError, TimelineResult};
use crate::scene::model::{Enable, TimelineKeyframe, TimelineObject};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SchemaPathElem {
    Field(&'static str),
    Index(usize),
}

#[derive(Debug, Clone)]
pub(crate) struct SchemaError {
    pub(crate) path: Vec<SchemaPathElem>,
    pub(crate) message: String,
}

impl SchemaError {
    fn at(path: &[SchemaPathElem], message: impl Into<String>) -> Self {
        Self {
            path: path.to_vec(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            return write!(f, "{}", self.message);
        }
        write!(f, "{}: {}", format_path(&self.path), self.message)
    }
}

fn format_path(path: &[SchemaPathElem]) -> String {
    let mut s = String::from("$");
    for p in path {
        match *p {
            SchemaPathElem::Field(name) => {
                s.push('.');
                s.push_str(name);
            }
            SchemaPathElem::Index(i) => {
                s.push('[');
                s.push_str(&i.to_string());
                s.push(']');
            }
        }
    }
    s
}

#[derive(Debug, Clone)]
pub(crate) struct SchemaErrors {
    pub(crate) errors: Vec<SchemaError>,
}

impl fmt::Display for SchemaErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaErrors {}

impl From<SchemaErrors> for TimelineError {
    fn from(errs: SchemaErrors) -> Self {
        TimelineError::validation(errs.to_string())
    }
}

/// Reject structurally invalid timelines before resolution.
pub fn validate_timeline(objects: &[TimelineObject]) -> TimelineResult<()> {
    collect_errors(objects).map_err(TimelineError::from)
}

pub(crate) fn collect_errors(objects: &[TimelineObject]) -> Result<(), SchemaErrors> {
    let mut errors = Vec::new();
    let mut ids = HashSet::<String>::new();
    let mut path = Vec::new();
    for (i, obj) in objects.iter().enumerate() {
        path.push(SchemaPathElem::Index(i));
        validate_object(obj, &mut path, &mut ids, &mut errors);
        path.pop();
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(SchemaErrors { errors })
    }
}

fn validate_object(
    obj: &TimelineObject,
    path: &mut Vec<SchemaPathElem>,
    ids: &mut HashSet<String>,
    errors: &mut Vec<SchemaError>,
) {
    validate_id(&obj.id, path, ids, errors);
    validate_enables(&obj.enable, path, errors);

    if !obj.layer.is_empty() && !is_valid_name(&obj.layer) {
        path.push(SchemaPathElem::Field("layer"));
        errors.push(SchemaError::at(
            path,
            format!("layer '{}' contains a reserved character", obj.layer),
        ));
        path.pop();
    }
    validate_classes(&obj.classes, path, errors);

    if !obj.priority.is_finite() {
        path.push(SchemaPathElem::Field("priority"));
        errors.push(SchemaError::at(path, "priority must be finite"));
        path.pop();
    }

    if !obj.children.is_empty() && !obj.is_group {
        path.push(SchemaPathElem::Field("children"));
        errors.push(SchemaError::at(
            path,
            format!("object '{}' has children but is not a group", obj.id),
        ));
        path.pop();
    }

    path.push(SchemaPathElem::Field("children"));
    for (i, child) in obj.children.iter().enumerate() {
        path.push(SchemaPathElem::Index(i));
        validate_object(child, path, ids, errors);
        path.pop();
    }
    path.pop();

    path.push(SchemaPathElem::Field("keyframes"));
    for (i, kf) in obj.keyframes.iter().enumerate() {
        path.push(SchemaPathElem::Index(i));
        validate_keyframe(kf, path, ids, errors);
        path.pop();
    }
    path.pop();
}

fn validate_keyframe(
    kf: &TimelineKeyframe,
    path: &mut Vec<SchemaPathElem>,
    ids: &mut HashSet<String>,
    errors: &mut Vec<SchemaError>,
) {
    validate_id(&kf.id, path, ids, errors);
    validate_enables(&kf.enable, path, errors);
    validate_classes(&kf.classes, path, errors);
}

fn validate_id(
    id: &str,
    path: &mut Vec<SchemaPathElem>,
    ids: &mut HashSet<String>,
    errors: &mut Vec<SchemaError>,
) {
    path.push(SchemaPathElem::Field("id"));
    if id.is_empty() {
        errors.push(SchemaError::at(path, "id must be non-empty"));
    } else if !is_valid_name(id) {
        errors.push(SchemaError::at(
            path,
            format!("id '{id}' contains a reserved character"),
        ));
    } else if !ids.insert(id.to_owned()) {
        errors.push(SchemaError::at(path, format!("duplicate id '{id}'")));
    }
    path.pop();
}

fn validate_classes(
    classes: &[String],
    path: &mut Vec<SchemaPathElem>,
    errors: &mut Vec<SchemaError>,
) {
    path.push(SchemaPathElem::Field("classes"));
    for (i, class) in classes.iter().enumerate() {
        if class.is_empty() || !is_valid_name(class) {
            path.push(SchemaPathElem::Index(i));
            errors.push(SchemaError::at(
                path,
                format!("class '{class}' is empty or contains a reserved character"),
            ));
            path.pop();
        }
    }
    path.pop();
}

fn validate_enables(
    enables: &[Enable],
    path: &mut Vec<SchemaPathElem>,
    errors: &mut Vec<SchemaError>,
) {
    path.push(SchemaPathElem::Field("enable"));
    if enables.is_empty() {
        errors.push(SchemaError::at(
            path,
            "at least one enable clause is required",
        ));
    }
    for (i, enable) in enables.iter().enumerate() {
        path.push(SchemaPathElem::Index(i));
        validate_enable(enable, path, errors);
        path.pop();
    }
    path.pop();
}

fn validate_enable(
    enable: &Enable,
    path: &mut Vec<SchemaPathElem>,
    errors: &mut Vec<SchemaError>,
) {
    match (&enable.while_, &enable.start) {
        (Some(_), Some(_)) => errors.push(SchemaError::at(
            path,
            "'while' cannot be combined with 'start'",
        )),
        (Some(_), None) if enable.end.is_some() || enable.duration.is_some() => {
            errors.push(SchemaError::at(
                path,
                "'while' cannot be combined with 'end' or 'duration'",
            ))
        }
        (None, None) => errors.push(SchemaError::at(
            path,
            "either 'while' or 'start' is required",
        )),
        _ => {}
    }
    if enable.end.is_some() && enable.duration.is_some() {
        errors.push(SchemaError::at(
            path,
            "'end' and 'duration' are mutually exclusive",
        ));
    }

    let fields: [(&'static str, &Option<Expression>); 5] = [
        ("while", &enable.while_),
        ("start", &enable.start),
        ("end", &enable.end),
        ("duration", &enable.duration),
        ("repeating", &enable.repeating),
    ];
    for (name, expr) in fields {
        if let Some(expr) = expr
            && let Err(e) = validate_expression(&Operator::ALL, expr)
        {
            path.push(SchemaPathElem::Field(name));
            errors.push(SchemaError::at(path, e.message));
            path.pop();
        }
    }
}

fn is_valid_name(name: &str) -> bool {
    !name
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '#' | '.' | '$') || RESERVED_CHARS.contains(&c))
}

#[cfg(test)]
#[path = "../../tests/unit/schema/validate.rs"]
mod tests;
