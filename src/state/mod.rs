//! State projection: what is on each layer at one instant, and what happens next.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::foundation::core::{Instance, Time};
use crate::resolve::{ResolvedObject, ResolvedTimeline};

/// Kind of an upcoming event. Sorted in this order at equal times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventType {
    /// An instance ends.
    End,
    /// An instance starts.
    Start,
    /// A keyframe starts or ends.
    Keyframe,
}

/// An upcoming start, end or keyframe change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextEvent {
    /// Event kind.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// When it happens.
    pub time: Time,
    /// Object (or keyframe) id.
    pub object_id: String,
}

/// The object active on a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateEntry {
    /// Object id.
    pub id: String,
    /// Layer name.
    pub layer: String,
    /// Instance active at the queried time.
    pub instance: Instance,
    /// Content with active keyframes merged in.
    pub content: serde_json::Value,
    /// Priority of the object.
    pub priority: f64,
    /// Whether the object is a group.
    pub is_group: bool,
    /// Enclosing group, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Keyframes merged into `content`, in merge order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keyframes: Vec<String>,
}

/// Snapshot of a resolved timeline at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineState {
    /// Queried time.
    pub time: Time,
    /// Active object per layer; layers with nothing active are absent.
    pub layers: BTreeMap<String, StateEntry>,
    /// Events after `time`, sorted.
    pub next_events: Vec<NextEvent>,
}

impl TimelineState {
    /// Active entry of `layer`.
    pub fn layer(&self, layer: &str) -> Option<&StateEntry> {
        self.layers.get(layer)
    }
}

/// Project `resolved` at `time`.
///
/// Each layer shows at most one object: the active one with the highest priority, then the latest
/// start, then the lowest id. `event_limit` caps the number of upcoming events returned.
pub fn get_state(
    resolved: &ResolvedTimeline,
    time: Time,
    event_limit: Option<usize>,
) -> TimelineState {
    let mut layers = BTreeMap::new();
    for (layer, members) in &resolved.layers {
        let active = members
            .iter()
            .filter_map(|id| resolved.object(id))
            .filter_map(|obj| active_instance(obj, time).map(|inst| (obj, inst)))
            .min_by(|(a, ai), (b, bi)| {
                b.priority
                    .total_cmp(&a.priority)
                    .then(bi.start.total_cmp(&ai.start))
                    .then(a.id.cmp(&b.id))
            });
        if let Some((obj, inst)) = active {
            layers.insert(layer.clone(), entry(resolved, obj, inst, time));
        }
    }

    let mut next_events = upcoming_events(resolved, time);
    if let Some(limit) = event_limit {
        next_events.truncate(limit);
    }
    TimelineState {
        time,
        layers,
        next_events,
    }
}

fn active_instance(obj: &ResolvedObject, time: Time) -> Option<&Instance> {
    obj.resolved.instances.iter().find(|i| i.is_active_at(time))
}

fn entry(
    resolved: &ResolvedTimeline,
    obj: &ResolvedObject,
    inst: &Instance,
    time: Time,
) -> StateEntry {
    let mut keyframes: Vec<(&ResolvedObject, &Instance)> = obj
        .keyframes
        .iter()
        .filter_map(|id| resolved.object(id))
        .filter_map(|kf| active_instance(kf, time).map(|i| (kf, i)))
        .collect();
    keyframes.sort_by(|(a, ai), (b, bi)| ai.start.total_cmp(&bi.start).then(a.id.cmp(&b.id)));

    let mut content = obj.content.clone();
    for (kf, _) in &keyframes {
        deep_merge(&mut content, &kf.content);
    }
    StateEntry {
        id: obj.id.clone(),
        layer: obj.layer.clone(),
        instance: inst.clone(),
        content,
        priority: obj.priority,
        is_group: obj.is_group,
        parent_id: obj.resolved.parent_id.clone(),
        keyframes: keyframes.iter().map(|(kf, _)| kf.id.clone()).collect(),
    }
}

fn upcoming_events(resolved: &ResolvedTimeline, time: Time) -> Vec<NextEvent> {
    let mut events = Vec::new();
    for obj in resolved.objects.values() {
        let (on_start, on_end) = if obj.resolved.is_keyframe {
            (EventType::Keyframe, EventType::Keyframe)
        } else if !obj.layer.is_empty() {
            (EventType::Start, EventType::End)
        } else {
            continue;
        };
        for inst in &obj.resolved.instances {
            if inst.start > time {
                events.push(NextEvent {
                    event_type: on_start,
                    time: inst.start,
                    object_id: obj.id.clone(),
                });
            }
            if let Some(end) = inst.end
                && end > time
            {
                events.push(NextEvent {
                    event_type: on_end,
                    time: end,
                    object_id: obj.id.clone(),
                });
            }
        }
    }
    events.sort_by(|a, b| {
        a.time
            .total_cmp(&b.time)
            .then(a.event_type.cmp(&b.event_type))
            .then(a.object_id.cmp(&b.object_id))
    });
    events
}

/// Merge `patch` into `target`: objects key by key, anything else replaces.
pub(crate) fn deep_merge(target: &mut serde_json::Value, patch: &serde_json::Value) {
    match (target, patch) {
        (serde_json::Value::Object(target), serde_json::Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/state/mod.rs"]
mod tests;
