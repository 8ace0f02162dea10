//! In-memory sorted index of troves.

use super::{Hints, SortedIndex};
use crate::domain::{Address, Wad};
use std::collections::HashMap;

/// Troves ordered by non-increasing NICR from head to tail.
///
/// Each node keeps the NICR it was (re)inserted with. Equal keys keep insertion order.
#[derive(Debug, Clone, Default)]
pub struct InMemorySortedTroves {
    order: Vec<Address>,
    keys: HashMap<Address, Wad>,
    hinted_insertions: usize,
}

impl InMemorySortedTroves {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn first(&self) -> Option<&Address> {
        self.order.first()
    }

    pub fn last(&self) -> Option<&Address> {
        self.order.last()
    }

    pub fn key_of(&self, owner: &Address) -> Option<Wad> {
        self.keys.get(owner).copied()
    }

    /// Owners from head (highest NICR) to tail.
    pub fn owners(&self) -> Vec<Address> {
        self.order.clone()
    }

    /// Number of insertions placed directly at the hinted position.
    pub fn hinted_insertions(&self) -> usize {
        self.hinted_insertions
    }

    /// True when keys are non-increasing from head to tail.
    pub fn is_ordered(&self) -> bool {
        self.order
            .windows(2)
            .all(|pair| self.keys[&pair[0]] >= self.keys[&pair[1]])
    }

    fn index_of(&self, owner: &Address) -> Option<usize> {
        self.order.iter().position(|a| a == owner)
    }

    /// Slot implied by the hints, if they describe a valid position for `nicr`.
    fn hinted_slot(&self, nicr: Wad, hints: &Hints) -> Option<usize> {
        match (&hints.upper, &hints.lower) {
            (None, None) => self.order.is_empty().then_some(0),
            (None, Some(lower)) => {
                let head = self.order.first()?;
                (head == lower && nicr >= self.keys[lower]).then_some(0)
            }
            (Some(upper), None) => {
                let tail = self.order.last()?;
                (tail == upper && nicr <= self.keys[upper]).then_some(self.order.len())
            }
            (Some(upper), Some(lower)) => {
                let upper_idx = self.index_of(upper)?;
                let lower_idx = upper_idx + 1;
                let adjacent = self.order.get(lower_idx) == Some(lower);
                (adjacent && self.keys[upper] >= nicr && nicr >= self.keys[lower])
                    .then_some(lower_idx)
            }
        }
    }

    fn searched_slot(&self, nicr: Wad) -> usize {
        self.order.partition_point(|owner| self.keys[owner] >= nicr)
    }
}

impl SortedIndex for InMemorySortedTroves {
    fn contains(&self, owner: &Address) -> bool {
        self.keys.contains_key(owner)
    }

    fn insert(&mut self, owner: &Address, nicr: Wad, hints: &Hints) {
        assert!(!self.contains(owner), "sorted index already contains {}", owner);
        assert!(!nicr.is_zero(), "sorted index requires a positive NICR");

        let slot = match self.hinted_slot(nicr, hints) {
            Some(slot) => {
                self.hinted_insertions += 1;
                slot
            }
            None => self.searched_slot(nicr),
        };
        self.order.insert(slot, owner.clone());
        self.keys.insert(owner.clone(), nicr);
    }

    fn reinsert(&mut self, owner: &Address, nicr: Wad, hints: &Hints) {
        assert!(self.contains(owner), "sorted index does not contain {}", owner);
        self.remove(owner);
        self.insert(owner, nicr, hints);
    }

    fn remove(&mut self, owner: &Address) {
        let idx = self
            .index_of(owner)
            .unwrap_or_else(|| panic!("sorted index does not contain {}", owner));
        self.order.remove(idx);
        self.keys.remove(owner);
    }
}
