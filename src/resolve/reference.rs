use crate::expression::parser::parse_number;
use crate::expression::{Expression, ExpressionNode, Operator};
use crate::foundation::core::{Instance, Reference, References, ScalarValue};
use crate::foundation::ids::ObjIdx;
use crate::instance::Operand;
use crate::resolve::context::ResolveCtx;
use crate::resolve::graph::ResolveState;

/// Which part of a referenced object's instances an expression reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Facet {
    Start,
    End,
    Duration,
}

/// Reference text split into target and optional explicit facet.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ReferenceTarget {
    pub(crate) reference: Reference,
    pub(crate) facet: Option<Facet>,
}

/// Parse `#id`, `.class` or `$layer`, optionally followed by `.start`, `.end` or `.duration`.
///
/// Anything else is not a reference and evaluates to nothing.
pub(crate) fn parse_reference(text: &str) -> Option<ReferenceTarget> {
    let prefix = text.chars().next()?;
    if !matches!(prefix, '#' | '.' | '$') {
        return None;
    }
    let body = &text[1..];
    let (name, facet) = match body.rsplit_once('.') {
        Some((name, "start")) => (name, Some(Facet::Start)),
        Some((name, "end")) => (name, Some(Facet::End)),
        Some((name, "duration")) => (name, Some(Facet::Duration)),
        Some(_) => return None,
        None => (body, None),
    };
    if name.is_empty() {
        return None;
    }
    let name = name.to_owned();
    let reference = match prefix {
        '#' => Reference::Object(name),
        '.' => Reference::Class(name),
        _ => Reference::Layer(name),
    };
    Some(ReferenceTarget { reference, facet })
}

/// Value of an expression plus everything it read.
#[derive(Debug, Clone, Default)]
pub(crate) struct Lookup {
    pub(crate) value: Option<Operand>,
    pub(crate) references: References,
}

impl Lookup {
    fn scalar(value: f64) -> Self {
        Self {
            value: Some(Operand::Scalar(ScalarValue::new(value))),
            references: References::new(),
        }
    }
}

impl ResolveCtx<'_> {
    /// Evaluate `expr` on behalf of `obj`, resolving referenced objects on demand.
    pub(crate) fn lookup(&mut self, obj: ObjIdx, expr: &Expression, facet: Facet) -> Lookup {
        match expr {
            Expression::Null => Lookup::default(),
            Expression::Number(_) | Expression::Bool(_) => {
                Lookup::scalar(expr.constant_value().unwrap_or_default())
            }
            Expression::Text(text) => self.lookup_text(obj, text, facet),
            Expression::Node(node) => self.lookup_node(obj, node, facet),
        }
    }

    fn lookup_node(&mut self, obj: ObjIdx, node: &ExpressionNode, facet: Facet) -> Lookup {
        let right = self.lookup(obj, &node.r, facet);
        if node.o == Operator::Not {
            let value = match right.value {
                Some(Operand::Instances(list)) => {
                    Some(Operand::Instances(self.algebra.invert(&list)))
                }
                scalar @ Some(Operand::Scalar(_)) => scalar,
                None => Some(Operand::Instances(self.algebra.invert(&[]))),
            };
            return Lookup {
                value,
                references: right.references,
            };
        }

        let left = self.lookup(obj, &node.l, facet);
        let mut references = left.references;
        references.extend(right.references);
        let value = match node.o {
            Operator::And | Operator::Or => Some(Operand::Instances(self.algebra.boolean(
                left.value.as_ref(),
                right.value.as_ref(),
                node.o,
            ))),
            op => match (&left.value, &right.value) {
                (Some(a), Some(b)) => self.algebra.combine(a, b, op),
                _ => None,
            },
        };
        Lookup { value, references }
    }

    fn lookup_text(&mut self, obj: ObjIdx, text: &str, facet: Facet) -> Lookup {
        let Some(target) = parse_reference(text) else {
            return parse_number(text).map(Lookup::scalar).unwrap_or_default();
        };
        let facet = target.facet.unwrap_or(facet);
        let references = References::from([target.reference.clone()]);

        let mut instances: Vec<Instance> = Vec::new();
        let mut shortest: Option<f64> = None;
        for cand in self.candidates(obj, &target.reference) {
            self.resolve_object(cand);
            let other = self.graph.object(cand);
            if other.resolved.state != ResolveState::Resolved {
                continue;
            }
            if let Some(first) = other.resolved.instances.first() {
                let d = first.duration();
                shortest = Some(shortest.map_or(d, |s| s.min(d)));
            }
            for inst in &other.resolved.instances {
                let mut found = inst.clone();
                found.references.insert(target.reference.clone());
                found.references.insert(Reference::Object(other.id.clone()));
                found.references.insert(Reference::Instance(inst.id.clone()));
                instances.push(found);
            }
        }

        let value = match facet {
            Facet::Duration => shortest.map(|value| {
                Operand::Scalar(ScalarValue {
                    value,
                    references: references.clone(),
                })
            }),
            _ if instances.is_empty() => None,
            Facet::Start => Some(Operand::Instances(instances)),
            Facet::End => Some(Operand::Instances(self.algebra.invert(&instances))),
        };
        Lookup { value, references }
    }

    /// Objects a reference selects, as seen from `obj`.
    ///
    /// When `obj` is itself selected, it is left out together with every member whose own
    /// expressions name the same reference.
    fn candidates(&mut self, obj: ObjIdx, reference: &Reference) -> Vec<ObjIdx> {
        let members: Vec<ObjIdx> = match reference {
            Reference::Object(id) => self.graph.index.get(id).copied().into_iter().collect(),
            Reference::Class(name) => self.graph.classes.get(name).cloned().unwrap_or_default(),
            Reference::Layer(name) => self.graph.layers.get(name).cloned().unwrap_or_default(),
            Reference::Instance(_) => Vec::new(),
        };
        if !members.contains(&obj) {
            return members;
        }
        self.graph.object_mut(obj).resolved.is_self_referencing = true;
        members
            .into_iter()
            .filter(|&m| m != obj && !self.graph.declared[m.index()].contains(reference))
            .collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/resolve/reference.rs"]
mod tests;
