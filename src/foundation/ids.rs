use serde::{Deserialize, Serialize};

/// Arena index of a resolved object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct ObjIdx(pub(crate) u32);

impl ObjIdx {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Issues instance ids for one resolve call.
///
/// Ids are short base-36 strings of a monotonically increasing counter. The counter position can
/// be persisted (see `ResolverCache`) so ids stay unique across calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceIdGen {
    next: u64,
}

impl InstanceIdGen {
    /// Generator starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generator resuming at `next`.
    pub fn starting_at(next: u64) -> Self {
        Self { next }
    }

    /// Counter value the next id will be derived from.
    pub fn position(&self) -> u64 {
        self.next
    }

    /// Issue a fresh id.
    pub fn next_id(&mut self) -> String {
        let id = to_base36(self.next);
        self.next += 1;
        id
    }
}

fn to_base36(mut v: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if v == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::with_capacity(13);
    while v > 0 {
        buf.push(DIGITS[(v % 36) as usize]);
        v /= 36;
    }
    buf.reverse();
    buf.into_iter().map(char::from).collect()
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/ids.rs"]
mod tests;
