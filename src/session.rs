use std::sync::Arc;

use crate::api::{Notification, Notifier};
use crate::client::{EventHub, Transport};
use crate::config::Config;
use crate::error::Result;
use crate::events::Outbound;
use crate::state::{CycleState, World};

/// Everything one connection's worth of trading needs.
///
/// Built fresh on every (re)connect, so nothing survives a reconnect.
pub struct Session {
    pub config: Arc<Config>,
    pub transport: Arc<dyn Transport>,
    pub hub: Arc<EventHub>,
    pub notifier: Arc<dyn Notifier>,
    pub cycle: CycleState,
}

impl Session {
    pub fn new(
        config: Arc<Config>,
        transport: Arc<dyn Transport>,
        hub: Arc<EventHub>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            transport,
            hub,
            notifier,
            cycle: CycleState::new(),
        }
    }

    pub fn world(&self) -> &World {
        self.hub.world()
    }

    pub fn send(&self, packet: Outbound) -> Result<()> {
        self.transport.send(packet)
    }

    pub fn notify(&self, note: Notification) {
        self.notifier.notify(note);
    }

    /// Units of the traded item currently held.
    pub fn held_count(&self) -> u32 {
        self.world().count_of(&self.config.trade.item_kind)
    }
}
