mod cycle;
mod inventory;
mod item;
mod sequence;
mod window;
mod world;

pub use cycle::{CycleState, MaintenanceMark, RunGuard};
pub use inventory::{hotbar_slot, Inventory, HOTBAR, HOTBAR_SIZE, HOTBAR_START, STORAGE};
pub use item::{Display, Item, TextComponent};
pub use sequence::SequenceTracker;
pub use window::{container_size, Window};
pub use world::World;
