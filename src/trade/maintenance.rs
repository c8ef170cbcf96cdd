use tokio::time::Instant;
use tracing::{info, warn};

use crate::api::{NoteKind, Notification};
use crate::client::WindowClient;
use crate::config::ms;
use crate::error::Result;
use crate::session::Session;
use crate::state::hotbar_slot;
use crate::strategy::{maintenance_due, DueReason};
use crate::trade::{InventoryManager, ListingExecutor};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SellAllReport {
    pub listed: usize,
    pub failed: usize,
}

/// Keeps the held count at zero: full sell-all passes, on demand and on a
/// cycle/time schedule.
pub struct Maintenance<'a> {
    session: &'a Session,
    windows: WindowClient<'a>,
    inventory: InventoryManager<'a>,
    listing: ListingExecutor<'a>,
}

impl<'a> Maintenance<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self {
            session,
            windows: WindowClient::new(session),
            inventory: InventoryManager::new(session),
            listing: ListingExecutor::new(session),
        }
    }

    /// Unstack and list every held unit, one at a time through hotbar slot 0.
    pub async fn sell_all(&self) -> Result<SellAllReport> {
        let config = &self.session.config;
        let initial = self.inventory.count_of_type();
        if initial == 0 {
            return Ok(SellAllReport::default());
        }

        info!(held = initial, "sell-all starting");
        self.windows.close_stray().await;
        self.inventory.unstack_all().await?;

        let mut report = SellAllReport::default();
        let target = hotbar_slot(0);
        let mut iterations = 0;

        loop {
            if iterations >= config.retry.sell_all_iterations {
                warn!(iterations, "sell-all hit its iteration cap, items may remain");
                break;
            }
            iterations += 1;

            let Some(&slot) = self.inventory.find_slots(None).first() else {
                break;
            };
            if slot != target {
                self.inventory.relocate(slot, target).await?;
            }

            if self.listing.list_one(0).await? {
                report.listed += 1;
            } else {
                report.failed += 1;
            }
        }

        let remaining = self.inventory.count_of_type();
        info!(
            listed = report.listed,
            failed = report.failed,
            remaining,
            "sell-all finished"
        );
        self.session.notify(
            Notification::new(NoteKind::Listing, "Sell-all cleanup completed")
                .field("Listed", report.listed)
                .field("Failed", report.failed)
                .field("Remaining", remaining),
        );
        Ok(report)
    }

    /// Run `sell_all` if the cycle count or the clock says it's time.
    /// Bookkeeping is updated before the run so a failing pass isn't retried
    /// immediately.
    pub async fn maybe_run_periodic(&self, cycle: u64, now: Instant) -> Result<Option<SellAllReport>> {
        let config = &self.session.config.maintenance;
        let mark = self.session.cycle.maintenance_mark();

        let Some(reason) = maintenance_due(
            &mark,
            cycle,
            now,
            config.cycle_interval,
            ms(config.time_interval_ms),
        ) else {
            return Ok(None);
        };

        match reason {
            DueReason::Cycles(n) => info!(cycle = n, "periodic maintenance (cycle count)"),
            DueReason::Elapsed(elapsed) => {
                info!(elapsed_secs = elapsed.as_secs(), "periodic maintenance (time)")
            }
        }
        self.session.cycle.mark_maintenance(now, cycle);
        self.sell_all().await.map(Some)
    }

    /// Start the maintenance clock without running anything.
    pub fn start_clock(&self, now: Instant) {
        let cycle = self.session.cycle.buy_cycles();
        self.session.cycle.mark_maintenance(now, cycle);
    }
}
