//! The trading engine: everything that talks to the server through windows.

mod afk;
mod cycle;
mod inventory;
mod listing;
mod maintenance;
mod purchase;

pub use afk::handle_afk;
pub use cycle::{CycleOrchestrator, CycleOutcome};
pub use inventory::InventoryManager;
pub use listing::{ListingExecutor, ListingReport};
pub use maintenance::{Maintenance, SellAllReport};
pub use purchase::{PurchaseExecutor, PurchaseOutcome, PurchaseState};
