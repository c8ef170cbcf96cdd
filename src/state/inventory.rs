use std::ops::RangeInclusive;

use super::Item;

/// Player window layout: 0 craft output, 1-4 craft grid, 5-8 armour,
/// 9-35 main, 36-44 hotbar, 45 offhand.
pub const INVENTORY_SIZE: usize = 46;
pub const STORAGE_START: usize = 9;
pub const HOTBAR_START: usize = 36;
pub const HOTBAR_END: usize = 44;
pub const HOTBAR_SIZE: usize = 9;

/// Slots that can actually hold loose items (main + hotbar).
pub const STORAGE: RangeInclusive<usize> = STORAGE_START..=HOTBAR_END;
pub const HOTBAR: RangeInclusive<usize> = HOTBAR_START..=HOTBAR_END;

/// Persistent mirror of the player's inventory.
#[derive(Debug, Clone, PartialEq)]
pub struct Inventory {
    slots: Vec<Option<Item>>,
}

impl Default for Inventory {
    fn default() -> Self {
        Self {
            slots: vec![None; INVENTORY_SIZE],
        }
    }
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything from a full snapshot. Short snapshots are padded.
    pub fn replace(&mut self, mut slots: Vec<Option<Item>>) {
        slots.resize(INVENTORY_SIZE, None);
        self.slots = slots;
    }

    pub fn get(&self, slot: usize) -> Option<&Item> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Out of range writes are ignored.
    pub fn set(&mut self, slot: usize, item: Option<Item>) {
        if let Some(entry) = self.slots.get_mut(slot) {
            *entry = item;
        }
    }

    pub fn slots(&self) -> &[Option<Item>] {
        &self.slots
    }

    /// Total units of `kind` across all slots.
    pub fn count_of(&self, kind: &str) -> u32 {
        self.slots
            .iter()
            .flatten()
            .filter(|item| item.is(kind))
            .map(|item| item.count)
            .sum()
    }

    /// Slot indices holding `kind`, ascending, skipping `exclude` if given.
    pub fn find_slots(&self, kind: &str, exclude: Option<RangeInclusive<usize>>) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, item)| item.as_ref().is_some_and(|item| item.is(kind)))
            .map(|(index, _)| index)
            .filter(|index| !exclude.as_ref().is_some_and(|range| range.contains(index)))
            .collect()
    }

    /// First empty slot in main inventory or hotbar.
    pub fn first_empty(&self) -> Option<usize> {
        STORAGE.into_iter().find(|&slot| self.slots[slot].is_none())
    }
}

/// Inventory slot backing hotbar index 0..=8.
pub fn hotbar_slot(index: usize) -> usize {
    HOTBAR_START + index
}
