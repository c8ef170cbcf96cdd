use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::api::{NoteKind, Notification};
use crate::client::WindowClient;
use crate::config::{ms, Config};
use crate::error::Result;
use crate::events::{Button, Event, Outbound, MODE_PICKUP};
use crate::session::Session;
use crate::state::{hotbar_slot, HOTBAR, HOTBAR_SIZE};
use crate::strategy::RetryPolicy;
use crate::trade::InventoryManager;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListingReport {
    pub listed: usize,
    pub failed: usize,
}

/// Puts held items up for sale and checks that the server took them.
pub struct ListingExecutor<'a> {
    session: &'a Session,
    windows: WindowClient<'a>,
    inventory: InventoryManager<'a>,
}

impl<'a> ListingExecutor<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self {
            session,
            windows: WindowClient::new(session),
            inventory: InventoryManager::new(session),
        }
    }

    /// List one unit from hotbar slot `index` (0..=8).
    ///
    /// Success is judged only by the held count dropping; the server gives
    /// no other reliable signal.
    pub async fn list_one(&self, index: usize) -> Result<bool> {
        let config = &self.session.config;
        let kind = &config.trade.item_kind;
        let slot = hotbar_slot(index);
        let command = config.market.list_command_for(&config.trade.sell_price);
        let policy = retry_policy(config);

        for attempt in policy.attempts() {
            let holds_item = self
                .session
                .world()
                .inventory()
                .get(slot)
                .is_some_and(|item| item.is(kind));
            if !holds_item {
                warn!(index, "hotbar slot no longer holds the item, skipping");
                return Ok(false);
            }

            let before = self.session.world().count_of(kind);
            debug!(index, attempt, before, "listing");

            self.session.send(Outbound::HeldSlot { slot: index as u8 })?;
            sleep(ms(config.timing.held_select_delay_ms)).await;

            match self.windows.open(&command, ms(config.timing.window_timeout_ms)).await {
                Ok(window_id) => {
                    let mut sub = self.session.hub.subscribe();
                    self.windows
                        .click(window_id, config.market.confirm_slot as usize, Button::Left, MODE_PICKUP)?;

                    let closed = sub
                        .next_matching(ms(config.timing.window_close_timeout_ms), |event| match event {
                            Event::WindowClose { window_id: id } if *id == window_id => Some(()),
                            _ => None,
                        })
                        .await;
                    if closed.is_none() {
                        // The listing may still have gone through; the count decides
                        debug!(window_id, "confirm window did not close, continuing");
                    }
                    drop(sub);

                    sleep(ms(config.timing.listing_settle_ms)).await;
                    let after = self.session.world().count_of(kind);
                    if after < before {
                        info!(index, before, after, "listed");
                        sleep(ms(config.timing.listing_cooldown_ms)).await;
                        return Ok(true);
                    }
                    warn!(index, attempt, before, after, "listing not taken, count unchanged");
                }
                Err(e) if e.is_transient() => {
                    warn!(index, attempt, "listing window never opened: {}", e);
                }
                Err(e) => return Err(e),
            }

            self.windows.close_stray().await;
            if !policy.is_last(attempt) {
                policy.wait(attempt).await;
            }
        }

        warn!(index, attempts = policy.max_attempts, "giving up on listing");
        Ok(false)
    }

    /// List up to `cap` units, staging them through the hotbar nine at a time.
    pub async fn list_batch(&self, cap: usize) -> Result<ListingReport> {
        let config = &self.session.config;
        let kind = &config.trade.item_kind;
        let mut report = ListingReport::default();

        self.windows.close_stray().await;

        for batch in 1..=cap.div_ceil(HOTBAR_SIZE) {
            if report.listed >= cap {
                break;
            }
            let staged = self.stage(cap - report.listed).await?;
            if staged.is_empty() {
                break;
            }
            debug!(batch, staged = staged.len(), "batch staged");

            for index in staged {
                if report.listed >= cap {
                    break;
                }
                if self.list_one(index).await? {
                    report.listed += 1;
                } else {
                    report.failed += 1;
                }
            }
        }

        let remaining = self.session.world().count_of(kind);
        if report.listed >= cap && remaining > 0 {
            info!(cap, remaining, "listing cap reached, rest waits for the next cycle");
        }
        info!(listed = report.listed, failed = report.failed, remaining, "listing batch done");

        if report.listed > 0 {
            self.session.notify(
                Notification::new(
                    NoteKind::Listing,
                    format!("Listed {} {}(s) for sale", report.listed, config.trade.item_label),
                )
                .field("Quantity", report.listed)
                .field("Price Each", &config.trade.sell_price),
            );
        }
        Ok(report)
    }

    /// Fill hotbar slots with up to `limit` units. Units already sitting in
    /// the hotbar count first; the rest are moved in from storage into empty
    /// hotbar slots. Returns the hotbar indices to list.
    async fn stage(&self, limit: usize) -> Result<Vec<usize>> {
        let kind = &self.session.config.trade.item_kind;
        let inventory = self.session.world().inventory();
        let limit = limit.min(HOTBAR_SIZE);

        let mut staged: Vec<usize> = (0..HOTBAR_SIZE)
            .filter(|&i| inventory.get(hotbar_slot(i)).is_some_and(|item| item.is(kind)))
            .take(limit)
            .collect();

        let outside = inventory.find_slots(kind, Some(HOTBAR));
        let free = (0..HOTBAR_SIZE).filter(|&i| inventory.get(hotbar_slot(i)).is_none());

        for (source, index) in outside.into_iter().zip(free) {
            if staged.len() >= limit {
                break;
            }
            self.inventory.relocate(source, hotbar_slot(index)).await?;
            staged.push(index);
        }

        if staged.is_empty() && self.session.world().count_of(kind) > 0 {
            warn!("items held but no hotbar slot free to stage them");
        }
        staged.sort_unstable();
        Ok(staged)
    }
}

/// Pause doubles after each failed listing, capped at `listing_retry_max_ms`.
fn retry_policy(config: &Config) -> RetryPolicy {
    RetryPolicy::exponential(
        config.retry.listing_attempts,
        ms(config.timing.listing_retry_ms),
        ms(config.timing.listing_retry_max_ms),
    )
}
