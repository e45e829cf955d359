use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::Xxh3;

use crate::expression::Expression;
use crate::foundation::core::{Instance, Time};
use crate::resolve::graph::ResolvedObject;
use crate::scene::model::Enable;
use crate::scene::options::ResolveOptions;

const XXH3_SEED: u64 = 0x8b5ad4a0c7d8e9f1;

/// Stable 128-bit fingerprint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub(crate) struct Fingerprint {
    pub(crate) hi: u64,
    pub(crate) lo: u64,
}

/// Fingerprint of the timing of an instance list. Ids and provenance are ignored.
pub(crate) fn fingerprint_instances(instances: &[Instance]) -> Fingerprint {
    let mut h = StableHasher::new();
    h.write_u32(instances.len() as u32);
    for inst in instances {
        h.write_f64(inst.start);
        write_end(&mut h, inst.end);
    }
    h.finish()
}

/// Fingerprint of every input field that affects an object's timing.
///
/// Content is not part of it: changing only the payload keeps cached instances valid.
pub(crate) fn fingerprint_timing(obj: &ResolvedObject) -> Fingerprint {
    let mut h = StableHasher::new();
    h.write_u32(obj.enable.len() as u32);
    for enable in &obj.enable {
        write_enable(&mut h, enable);
    }
    h.write_bool(obj.disabled);
    h.write_f64(obj.priority);
    h.write_str(obj.resolved.parent_id.as_deref().unwrap_or(""));
    h.write_bool(obj.resolved.parent_id.is_some());
    h.write_bool(obj.resolved.is_keyframe);
    h.write_u32(obj.classes.len() as u32);
    for class in &obj.classes {
        h.write_str(class);
    }
    h.write_str(&obj.layer);
    h.write_bool(obj.seamless);
    h.finish()
}

/// Fingerprint of the options that shape resolved instances.
///
/// Defaults are applied first, so an unset `limit_count` equals an explicit default. The conflict
/// depth only decides whether a call fails and is left out.
pub(crate) fn fingerprint_options(options: &ResolveOptions) -> Fingerprint {
    let repeat = options.repeat_options();
    let mut h = StableHasher::new();
    h.write_f64(repeat.time);
    h.write_u64(repeat.limit_count as u64);
    write_end(&mut h, repeat.limit_time);
    h.write_bool(options.resolve_instance_collisions);
    h.finish()
}

struct StableHasher {
    inner: Xxh3,
}

impl StableHasher {
    fn new() -> Self {
        Self {
            inner: Xxh3::with_seed(XXH3_SEED),
        }
    }

    fn write_bytes(&mut self, b: &[u8]) {
        self.inner.update(b);
    }

    fn write_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    fn write_str(&mut self, s: &str) {
        self.write_u32(s.len() as u32);
        self.write_bytes(s.as_bytes());
    }

    fn finish(self) -> Fingerprint {
        let v = self.inner.digest128();
        Fingerprint {
            hi: (v >> 64) as u64,
            lo: v as u64,
        }
    }
}

fn write_end(h: &mut StableHasher, end: Option<Time>) {
    match end {
        Some(e) => {
            h.write_u8(1);
            h.write_f64(e);
        }
        None => h.write_u8(0),
    }
}

fn write_enable(h: &mut StableHasher, enable: &Enable) {
    for field in [
        &enable.while_,
        &enable.start,
        &enable.end,
        &enable.duration,
        &enable.repeating,
    ] {
        match field {
            Some(expr) => {
                h.write_u8(1);
                write_expression(h, expr);
            }
            None => h.write_u8(0),
        }
    }
}

fn write_expression(h: &mut StableHasher, expr: &Expression) {
    match expr {
        Expression::Null => h.write_u8(0),
        Expression::Number(v) => {
            h.write_u8(1);
            h.write_f64(*v);
        }
        Expression::Bool(b) => {
            h.write_u8(2);
            h.write_bool(*b);
        }
        Expression::Text(s) => {
            h.write_u8(3);
            h.write_str(s);
        }
        Expression::Node(node) => {
            h.write_u8(4);
            write_expression(h, &node.l);
            h.write_u32(u32::from(node.o.symbol()));
            write_expression(h, &node.r);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/resolve/fingerprint.rs"]
mod tests;
