mod hub;
mod window;

pub use hub::{EventHub, Subscription};
pub use window::WindowClient;

use crate::error::Result;
use crate::events::Outbound;

/// Outbound half of the game connection.
///
/// Sending only enqueues; delivery order is preserved. Fails with
/// `Error::Disconnected` once the connection is gone.
pub trait Transport: Send + Sync {
    fn send(&self, packet: Outbound) -> Result<()>;
}
