use parking_lot::RwLock;

use super::{Inventory, SequenceTracker, Window};
use crate::events::{Event, CURSOR_SLOT, CURSOR_WINDOW, PLAYER_WINDOW};

/// Client-side mirror of what the server has told us: the state id, the
/// persistent inventory and the currently open window (if any).
///
/// Accessors hand out clones so no lock is ever held across an await.
#[derive(Debug, Default)]
pub struct World {
    sequence: SequenceTracker,
    inventory: RwLock<Inventory>,
    window: RwLock<Option<Window>>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one inbound event into the mirror.
    pub fn apply(&self, event: &Event) {
        match event {
            Event::WindowOpen {
                window_id,
                kind,
                title,
                slots,
            } => {
                let window = Window::new(*window_id, kind.clone(), title.clone(), slots.clone());
                self.mirror_window(&window);
                *self.window.write() = Some(window);
            }
            Event::WindowClose { window_id } => {
                let mut window = self.window.write();
                if window.as_ref().is_some_and(|w| w.id == *window_id) {
                    *window = None;
                }
            }
            Event::Slots {
                window_id,
                state_id,
                slots,
            } => {
                self.sequence.observe(*state_id);
                if *window_id == PLAYER_WINDOW {
                    self.inventory.write().replace(slots.clone());
                } else {
                    let mut guard = self.window.write();
                    if let Some(window) = guard.as_mut().filter(|w| w.id == *window_id) {
                        window.slots = slots.clone();
                        self.mirror_window(window);
                    }
                }
            }
            Event::Slot {
                window_id,
                state_id,
                slot,
                item,
            } => {
                self.sequence.observe(*state_id);
                if *window_id == CURSOR_WINDOW || *slot == CURSOR_SLOT || *slot < 0 {
                    return;
                }
                let slot = *slot as usize;
                if *window_id == PLAYER_WINDOW {
                    self.inventory.write().set(slot, item.clone());
                } else {
                    let mut guard = self.window.write();
                    if let Some(window) = guard.as_mut().filter(|w| w.id == *window_id) {
                        window.set_slot(slot, item.clone());
                        if let Some(index) = window.inventory_index(slot) {
                            self.inventory.write().set(index, item.clone());
                        }
                    }
                }
            }
            _ => {}
        }
    }

    /// Copy the player-inventory tail of a container window into the mirror.
    fn mirror_window(&self, window: &Window) {
        let container = window.container_size();
        if window.slots.len() <= container {
            return;
        }
        let mut inventory = self.inventory.write();
        for (window_slot, item) in window.slots.iter().enumerate().skip(container) {
            if let Some(index) = window.inventory_index(window_slot) {
                inventory.set(index, item.clone());
            }
        }
    }

    pub fn state_id(&self) -> i32 {
        self.sequence.current()
    }

    pub fn inventory(&self) -> Inventory {
        self.inventory.read().clone()
    }

    pub fn count_of(&self, kind: &str) -> u32 {
        self.inventory.read().count_of(kind)
    }

    pub fn window(&self) -> Option<Window> {
        self.window.read().clone()
    }

    pub fn window_id(&self) -> Option<i32> {
        self.window.read().as_ref().map(|w| w.id)
    }

    /// Forget the open window locally (after we asked the server to close it).
    pub fn clear_window(&self) {
        *self.window.write() = None;
    }
}
