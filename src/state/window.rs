use super::inventory::STORAGE_START;
use super::Item;

/// Slots of the player's inventory that every container window appends
/// after its own region (27 main + 9 hotbar).
pub const MIRRORED_SLOTS: usize = 36;

/// A transient container. Exists between an open and a close event.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub id: i32,
    pub kind: String,
    pub title: Option<String>,
    pub slots: Vec<Option<Item>>,
}

impl Window {
    pub fn new(id: i32, kind: impl Into<String>, title: Option<String>, slots: Vec<Option<Item>>) -> Self {
        Self {
            id,
            kind: kind.into(),
            title,
            slots,
        }
    }

    /// Number of leading slots that belong to the container itself
    /// (marketplace listings); everything after is the player's inventory.
    pub fn container_size(&self) -> usize {
        container_size(&self.kind, self.slots.len())
    }

    pub fn slot(&self, index: usize) -> Option<&Item> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn set_slot(&mut self, index: usize, item: Option<Item>) {
        if index >= self.slots.len() {
            self.slots.resize(index + 1, None);
        }
        self.slots[index] = item;
    }

    /// Map a window slot in the mirrored region onto the persistent inventory.
    pub fn inventory_index(&self, window_slot: usize) -> Option<usize> {
        let container = self.container_size();
        if window_slot < container {
            return None;
        }
        let offset = window_slot - container;
        (offset < MIRRORED_SLOTS).then_some(STORAGE_START + offset)
    }
}

/// Container region size for a window kind.
///
/// Unknown kinds fall back to a slot-count heuristic.
pub fn container_size(kind: &str, slot_count: usize) -> usize {
    let kind = kind.strip_prefix("minecraft:").unwrap_or(kind);

    let known = match kind {
        "generic_9x1" => Some(9),
        "generic_9x2" => Some(18),
        "generic_9x3" | "shulker_box" => Some(27),
        "generic_9x4" => Some(36),
        "generic_9x5" => Some(45),
        "generic_9x6" | "chest" | "large_chest" => Some(54),
        "generic_3x3" | "crafter_3x3" => Some(9),
        "hopper" => Some(5),
        _ => None,
    };

    match known {
        Some(size) => size,
        None if slot_count >= 90 => 54,
        None if slot_count >= 63 => 27,
        None => slot_count,
    }
}
