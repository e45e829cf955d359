use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::expression::{Expression, interpret_expression};
use crate::foundation::core::{Instance, References};
use crate::foundation::error::{TimelineError, TimelineResult};
use crate::foundation::ids::ObjIdx;
use crate::resolve::reference::parse_reference;
use crate::scene::model::{Enable, TimelineObject};

/// Resolution progress of one object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolveState {
    /// Not resolved yet, or marked for re-resolution.
    #[default]
    Unresolved,
    /// Currently on the resolution stack.
    Resolving,
    /// Instances are up to date.
    Resolved,
}

/// Mutable resolution state of an object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedInfo {
    /// Progress marker.
    pub state: ResolveState,
    /// Dependencies have been registered.
    pub first_resolved: bool,
    /// Layer conflicts have been applied to `instances`.
    pub resolved_conflicts: bool,
    /// Final instances.
    pub instances: Vec<Instance>,
    /// Enclosing group or keyframe owner.
    pub parent_id: Option<String>,
    /// Nesting depth, 0 for top-level objects.
    pub level_deep: u32,
    /// Whether this is a keyframe.
    pub is_keyframe: bool,
    /// Whether the object looked itself up through its id, a class or a layer.
    pub is_self_referencing: bool,
    /// What the object's enable expressions read from.
    pub direct_references: References,
}

/// Object of a resolved timeline. Children and keyframes are listed by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedObject {
    /// Unique id.
    pub id: String,
    /// Layer, empty when ethereal.
    pub layer: String,
    /// Classes.
    pub classes: Vec<String>,
    /// Enable clauses as given.
    pub enable: Vec<Enable>,
    /// Conflict priority.
    pub priority: f64,
    /// Disabled flag.
    pub disabled: bool,
    /// Seamless flag.
    pub seamless: bool,
    /// Group flag.
    pub is_group: bool,
    /// Opaque payload.
    pub content: serde_json::Value,
    /// Ids of direct children.
    pub children: Vec<String>,
    /// Ids of keyframes.
    pub keyframes: Vec<String>,
    /// Resolution state.
    pub resolved: ResolvedInfo,
}

/// Enable clause with every expression parsed and simplified.
#[derive(Debug, Clone, Default)]
pub(crate) struct ParsedEnable {
    pub(crate) while_: Option<Expression>,
    pub(crate) start: Option<Expression>,
    pub(crate) end: Option<Expression>,
    pub(crate) duration: Option<Expression>,
    pub(crate) repeating: Option<Expression>,
}

/// Arena of every object in a timeline, including children and keyframes.
///
/// Indices follow id order, so iterating an index set visits objects deterministically.
#[derive(Debug, Clone, Default)]
pub(crate) struct ObjectGraph {
    pub(crate) objects: Vec<ResolvedObject>,
    pub(crate) parsed: Vec<Vec<ParsedEnable>>,
    /// References named syntactically by each object's expressions.
    pub(crate) declared: Vec<References>,
    pub(crate) parent: Vec<Option<ObjIdx>>,
    /// Instances before layer conflicts.
    pub(crate) tentative: Vec<Vec<Instance>>,
    pub(crate) index: HashMap<String, ObjIdx>,
    pub(crate) classes: BTreeMap<String, Vec<ObjIdx>>,
    pub(crate) layers: BTreeMap<String, Vec<ObjIdx>>,
}

impl ObjectGraph {
    pub(crate) fn populate(timeline: &[TimelineObject]) -> TimelineResult<Self> {
        let mut objects = Vec::new();
        for obj in timeline {
            flatten(obj, None, 0, &mut objects);
        }
        objects.sort_by(|a, b| a.id.cmp(&b.id));

        let mut graph = Self::default();
        for (k, obj) in objects.iter().enumerate() {
            let idx = ObjIdx(k as u32);
            if graph.index.insert(obj.id.clone(), idx).is_some() {
                return Err(TimelineError::validation(format!(
                    "duplicate id '{}'",
                    obj.id
                )));
            }
            for class in &obj.classes {
                graph.classes.entry(class.clone()).or_default().push(idx);
            }
            if !obj.layer.is_empty() {
                graph.layers.entry(obj.layer.clone()).or_default().push(idx);
            }
        }

        for obj in &objects {
            let parsed = obj
                .enable
                .iter()
                .map(parse_enable)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| TimelineError::syntax(format!("object '{}': {e}", obj.id)))?;
            let mut declared = References::new();
            for clause in &parsed {
                for expr in clause.expressions() {
                    collect_references(expr, &mut declared);
                }
            }
            graph.parsed.push(parsed);
            graph.declared.push(declared);
            graph.parent.push(
                obj.resolved
                    .parent_id
                    .as_ref()
                    .and_then(|p| graph.index.get(p).copied()),
            );
        }
        graph.tentative = vec![Vec::new(); objects.len()];
        graph.objects = objects;
        Ok(graph)
    }

    pub(crate) fn len(&self) -> usize {
        self.objects.len()
    }

    pub(crate) fn all(&self) -> BTreeSet<ObjIdx> {
        (0..self.objects.len()).map(|k| ObjIdx(k as u32)).collect()
    }

    pub(crate) fn object(&self, idx: ObjIdx) -> &ResolvedObject {
        &self.objects[idx.index()]
    }

    pub(crate) fn object_mut(&mut self, idx: ObjIdx) -> &mut ResolvedObject {
        &mut self.objects[idx.index()]
    }
}

impl ParsedEnable {
    fn expressions(&self) -> impl Iterator<Item = &Expression> {
        [
            &self.while_,
            &self.start,
            &self.end,
            &self.duration,
            &self.repeating,
        ]
        .into_iter()
        .flatten()
    }
}

fn parse_enable(enable: &Enable) -> Result<ParsedEnable, crate::expression::ExprError> {
    let parse = |e: &Option<Expression>| e.as_ref().map(interpret_expression).transpose();
    Ok(ParsedEnable {
        while_: parse(&enable.while_)?,
        start: parse(&enable.start)?,
        end: parse(&enable.end)?,
        duration: parse(&enable.duration)?,
        repeating: parse(&enable.repeating)?,
    })
}

fn collect_references(expr: &Expression, out: &mut References) {
    match expr {
        Expression::Text(text) => {
            if let Some(target) = parse_reference(text) {
                out.insert(target.reference);
            }
        }
        Expression::Node(node) => {
            collect_references(&node.l, out);
            collect_references(&node.r, out);
        }
        _ => {}
    }
}

fn flatten(
    obj: &TimelineObject,
    parent_id: Option<&str>,
    level_deep: u32,
    out: &mut Vec<ResolvedObject>,
) {
    out.push(ResolvedObject {
        id: obj.id.clone(),
        layer: obj.layer.clone(),
        classes: obj.classes.clone(),
        enable: obj.enable.clone(),
        priority: obj.priority,
        disabled: obj.disabled,
        seamless: obj.seamless,
        is_group: obj.is_group,
        content: obj.content.clone(),
        children: obj.children.iter().map(|c| c.id.clone()).collect(),
        keyframes: obj.keyframes.iter().map(|k| k.id.clone()).collect(),
        resolved: ResolvedInfo {
            parent_id: parent_id.map(str::to_owned),
            level_deep,
            ..ResolvedInfo::default()
        },
    });
    for child in &obj.children {
        flatten(child, Some(&obj.id), level_deep + 1, out);
    }
    for kf in &obj.keyframes {
        out.push(ResolvedObject {
            id: kf.id.clone(),
            layer: String::new(),
            classes: kf.classes.clone(),
            enable: kf.enable.clone(),
            priority: 0.0,
            disabled: kf.disabled,
            seamless: false,
            is_group: false,
            content: kf.content.clone(),
            children: Vec::new(),
            keyframes: Vec::new(),
            resolved: ResolvedInfo {
                parent_id: Some(obj.id.clone()),
                level_deep: level_deep + 1,
                is_keyframe: true,
                ..ResolvedInfo::default()
            },
        });
    }
}

#[cfg(test)]
#[path = "../../tests/unit/resolve/graph.rs"]
mod tests;
