//! Global replacement table - slot registrations keyed by variant
//!
//! Collections register the sprites that replace engine base-set slots (and
//! new sprite sets) under the variant key they apply to. At finalization the
//! table is turned into contiguous runs and an emission order in which more
//! specific keys come first.

use log::warn;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::sprite::SlotSprite;
use crate::variant::VariantKey;

/// Longest run a single replacement can cover.
pub const MAX_RUN: usize = 255;

/// Error raised while ordering the table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TableError {
    /// The covering relation between keys does not form an order
    #[error("Covering relation between variant keys has a cycle: {}", keys.join(", "))]
    CoveringCycle { keys: Vec<String> },
}

/// Sprites per slot, per variant key.
#[derive(Debug, Default)]
pub struct ReplacementTable {
    old: BTreeMap<VariantKey, BTreeMap<u32, SlotSprite>>,
    new: BTreeMap<VariantKey, BTreeMap<u8, BTreeMap<u32, SlotSprite>>>,
}

impl ReplacementTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace base-set slot `slot` under `key`.
    pub fn insert_old(&mut self, key: VariantKey, slot: u32, sprite: SlotSprite) {
        let slots = self.old.entry(key).or_default();
        if slots.insert(slot, sprite).is_some() {
            warn!("Slot {} registered twice, keeping the later sprite", slot);
        }
    }

    /// Set sprite `offset` of new sprite set `set_type` under `key`.
    pub fn insert_new(&mut self, key: VariantKey, set_type: u8, offset: u32, sprite: SlotSprite) {
        let offsets = self.new.entry(key).or_default().entry(set_type).or_default();
        if offsets.insert(offset, sprite).is_some() {
            warn!("Offset {} of sprite set 0x{:02X} registered twice, keeping the later sprite", offset, set_type);
        }
    }

    pub fn old_slots(&self, key: &VariantKey) -> Option<&BTreeMap<u32, SlotSprite>> {
        self.old.get(key)
    }

    pub fn new_sets(&self, key: &VariantKey) -> Option<&BTreeMap<u8, BTreeMap<u32, SlotSprite>>> {
        self.new.get(key)
    }

    /// Every key with at least one registration.
    pub fn keys(&self) -> BTreeSet<VariantKey> {
        self.old.keys().chain(self.new.keys()).cloned().collect()
    }

    /// Number of registered slots and offsets.
    pub fn len(&self) -> usize {
        let old: usize = self.old.values().map(BTreeMap::len).sum();
        let new: usize = self.new.values().flat_map(BTreeMap::values).map(BTreeMap::len).sum();
        old + new
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Group a sparse slot map into runs of consecutive slots.
///
/// Each run starts at its first slot and holds at most [`MAX_RUN`] items.
pub fn coalesce_runs<T: Clone>(slots: &BTreeMap<u32, T>) -> Vec<(u32, Vec<T>)> {
    let mut runs: Vec<(u32, Vec<T>)> = Vec::new();
    for (&slot, item) in slots {
        match runs.last_mut() {
            Some((start, items))
                if items.len() < MAX_RUN && u64::from(*start) + items.len() as u64 == u64::from(slot) =>
            {
                items.push(item.clone());
            }
            _ => runs.push((slot, vec![item.clone()])),
        }
    }
    runs
}

/// Order keys so that every key comes before all keys it is more specific
/// than.
///
/// Among keys free to go next, more attributes go first, then key order.
pub fn order_keys(keys: &BTreeSet<VariantKey>) -> Result<Vec<VariantKey>, TableError> {
    let keys: Vec<&VariantKey> = keys.iter().collect();
    order_by(&keys, |a, b| keys[a].is_strict_superset_of(keys[b]))
}

/// Kahn ordering of `keys` where `precedes(a, b)` means `keys[a]` must come
/// before `keys[b]`.
fn order_by<F>(keys: &[&VariantKey], precedes: F) -> Result<Vec<VariantKey>, TableError>
where
    F: Fn(usize, usize) -> bool,
{
    // pending[i]: how many keys must still precede keys[i]
    let mut pending: Vec<usize> =
        (0..keys.len()).map(|i| (0..keys.len()).filter(|&j| precedes(j, i)).count()).collect();

    let mut ready: BTreeSet<(Reverse<usize>, usize)> = pending
        .iter()
        .enumerate()
        .filter(|(_, &n)| n == 0)
        .map(|(i, _)| (Reverse(keys[i].len()), i))
        .collect();

    let mut ordered = Vec::with_capacity(keys.len());
    while let Some((_, i)) = ready.pop_first() {
        ordered.push(keys[i].clone());
        for j in 0..keys.len() {
            if precedes(i, j) {
                pending[j] -= 1;
                if pending[j] == 0 {
                    ready.insert((Reverse(keys[j].len()), j));
                }
            }
        }
    }

    if ordered.len() != keys.len() {
        let stuck = pending
            .iter()
            .enumerate()
            .filter(|(_, &n)| n > 0)
            .map(|(i, _)| keys[i].to_string())
            .collect();
        return Err(TableError::CoveringCycle { keys: stuck });
    }
    Ok(ordered)
}
