use std::ops::RangeInclusive;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::client::WindowClient;
use crate::config::ms;
use crate::error::Result;
use crate::events::{Button, MODE_PICKUP, PLAYER_WINDOW};
use crate::session::Session;
use crate::strategy::RetryPolicy;

/// Counts and moves the traded item around the player inventory.
///
/// All clicks go to the player window, so callers close any container first.
pub struct InventoryManager<'a> {
    session: &'a Session,
    windows: WindowClient<'a>,
}

impl<'a> InventoryManager<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self {
            session,
            windows: WindowClient::new(session),
        }
    }

    fn kind(&self) -> &str {
        &self.session.config.trade.item_kind
    }

    pub fn count_of_type(&self) -> u32 {
        self.session.world().count_of(self.kind())
    }

    pub fn find_slots(&self, exclude: Option<RangeInclusive<usize>>) -> Vec<usize> {
        self.session.world().inventory().find_slots(self.kind(), exclude)
    }

    /// Split the stack in `slot` into singles. Returns how many units were
    /// moved out. Stops early (with a warning) when no empty slot is left.
    pub async fn unstack(&self, slot: usize) -> Result<u32> {
        let config = &self.session.config;
        let policy = RetryPolicy::fixed(config.retry.unstack_moves, ms(config.timing.unstack_delay_ms));
        let settle = policy.backoff(1);
        let mut moved = 0;

        for _ in policy.attempts() {
            let inventory = self.session.world().inventory();
            let count = match inventory.get(slot) {
                Some(item) if item.is(self.kind()) => item.count,
                _ => break,
            };
            if count <= 1 {
                break;
            }
            let Some(empty) = inventory.first_empty() else {
                warn!(slot, count, "no empty slot to unstack into, inventory full");
                break;
            };

            debug!(slot, empty, count, "splitting one off");
            // Pick up the stack, drop one in the empty slot, put the rest back
            self.windows.click(PLAYER_WINDOW, slot, Button::Left, MODE_PICKUP)?;
            sleep(settle).await;
            self.windows.click(PLAYER_WINDOW, empty, Button::Right, MODE_PICKUP)?;
            sleep(settle).await;
            self.windows.click(PLAYER_WINDOW, slot, Button::Left, MODE_PICKUP)?;
            sleep(settle).await;
            moved += 1;
        }

        Ok(moved)
    }

    /// Unstack every multi-unit stack of the traded item.
    pub async fn unstack_all(&self) -> Result<u32> {
        let stacked: Vec<usize> = {
            let inventory = self.session.world().inventory();
            inventory
                .find_slots(self.kind(), None)
                .into_iter()
                .filter(|&slot| inventory.get(slot).is_some_and(|item| item.count > 1))
                .collect()
        };
        if stacked.is_empty() {
            return Ok(0);
        }

        info!(slots = stacked.len(), "unstacking");
        let mut moved = 0;
        for slot in stacked {
            moved += self.unstack(slot).await?;
        }
        Ok(moved)
    }

    /// Move the stack in `source` to `dest`. If `dest` was occupied the
    /// displaced stack ends up in `source`.
    pub async fn relocate(&self, source: usize, dest: usize) -> Result<()> {
        if source == dest {
            return Ok(());
        }
        let settle = ms(self.session.config.timing.relocate_delay_ms);
        let occupied = self.session.world().inventory().get(dest).is_some();

        debug!(source, dest, occupied, "relocating");
        self.windows.click(PLAYER_WINDOW, source, Button::Left, MODE_PICKUP)?;
        sleep(settle).await;
        self.windows.click(PLAYER_WINDOW, dest, Button::Left, MODE_PICKUP)?;
        sleep(settle).await;
        if occupied {
            self.windows.click(PLAYER_WINDOW, source, Button::Left, MODE_PICKUP)?;
            sleep(settle).await;
        }
        Ok(())
    }
}
