use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::api::{NoteKind, Notification};
use crate::client::WindowClient;
use crate::config::{ms, Timing};
use crate::error::Result;
use crate::events::{Button, MODE_PICKUP};
use crate::session::Session;
use crate::strategy::{scan, Candidate};
use crate::trade::{
    InventoryManager, ListingExecutor, Maintenance, PurchaseExecutor, PurchaseOutcome,
};

/// How often a blocked loop checks whether it may run again.
const IDLE_POLL: Duration = Duration::from_millis(1_000);

/// How one pass of the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Another pass was in flight, or AFK recovery is running.
    Skipped,
    /// AFK recovery started mid-pass.
    Interrupted,
    /// Items were held at the start; sold instead of buying.
    Liquidated { remaining: u32 },
    /// The market never opened.
    WindowTimeout,
    /// Nothing under the price threshold, even after a refresh.
    NoCandidate,
    Purchased { listed: usize },
    PurchaseFailed,
    PurchaseUnknown,
    Errored,
}

impl CycleOutcome {
    /// Pause before the next pass.
    pub fn pause(&self, timing: &Timing) -> Duration {
        let reduced = ms(timing.reduced_cycle_delay_ms);
        match self {
            CycleOutcome::Skipped | CycleOutcome::Interrupted => IDLE_POLL,
            CycleOutcome::Liquidated { remaining: 0 } => Duration::ZERO,
            CycleOutcome::Liquidated { .. } => ms(timing.holding_backoff_ms),
            CycleOutcome::WindowTimeout
            | CycleOutcome::NoCandidate
            | CycleOutcome::PurchaseFailed
            | CycleOutcome::PurchaseUnknown => reduced,
            CycleOutcome::Purchased { .. } => Duration::ZERO,
            CycleOutcome::Errored => reduced.max(ms(timing.min_retry_delay_ms)),
        }
    }
}

/// The perpetual buy, list, maintain loop.
pub struct CycleOrchestrator<'a> {
    session: &'a Session,
    windows: WindowClient<'a>,
    inventory: InventoryManager<'a>,
    purchase: PurchaseExecutor<'a>,
    listing: ListingExecutor<'a>,
    maintenance: Maintenance<'a>,
}

impl<'a> CycleOrchestrator<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self {
            session,
            windows: WindowClient::new(session),
            inventory: InventoryManager::new(session),
            purchase: PurchaseExecutor::new(session),
            listing: ListingExecutor::new(session),
            maintenance: Maintenance::new(session),
        }
    }

    /// Loop forever. Only the surrounding task being dropped ends it.
    pub async fn run(&self) {
        info!("trading loop started");
        loop {
            let outcome = self.run_once().await;
            let pause = outcome.pause(&self.session.config.timing);
            debug!(?outcome, pause_ms = pause.as_millis() as u64, "pass finished");
            if pause.is_zero() {
                tokio::task::yield_now().await;
            } else {
                sleep(pause).await;
            }
        }
    }

    /// One guarded pass. Never returns an error: failures are logged,
    /// notified and reported as `Errored`.
    pub async fn run_once(&self) -> CycleOutcome {
        let Some(_guard) = self.session.cycle.try_begin() else {
            debug!("pass already running or suspended, skipping");
            return CycleOutcome::Skipped;
        };

        match self.iterate().await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("trading pass failed: {}", e);
                self.windows.close_stray().await;
                self.session.notify(
                    Notification::new(NoteKind::Error, "Error in main loop")
                        .field("Error", e.to_string()),
                );
                CycleOutcome::Errored
            }
        }
    }

    async fn iterate(&self) -> Result<CycleOutcome> {
        let config = &self.session.config;

        // Never buy while holding anything
        let held = self.inventory.count_of_type();
        if held > 0 {
            info!(held, "items held before buying, selling them first");
            self.windows.close_stray().await;
            self.maintenance.sell_all().await?;
            let remaining = self.inventory.count_of_type();
            if remaining > 0 {
                warn!(remaining, "still holding items after sell-all, backing off");
            }
            return Ok(CycleOutcome::Liquidated { remaining });
        }

        if self.session.cycle.is_suspended() {
            return Ok(CycleOutcome::Interrupted);
        }

        let window_id = match self
            .windows
            .open(&config.market.open_command, ms(config.timing.window_timeout_ms))
            .await
        {
            Ok(id) => id,
            Err(e) if e.is_transient() => {
                warn!("market did not open: {}", e);
                self.windows.close_stray().await;
                return Ok(CycleOutcome::WindowTimeout);
            }
            Err(e) => return Err(e),
        };

        let Some(candidate) = self.find_candidate(window_id).await? else {
            debug!("no listing under threshold");
            self.windows.close_stray().await;
            return Ok(CycleOutcome::NoCandidate);
        };

        if self.session.cycle.is_suspended() {
            self.windows.close_stray().await;
            return Ok(CycleOutcome::Interrupted);
        }

        match self.purchase.run(candidate).await? {
            PurchaseOutcome::Success => {}
            PurchaseOutcome::Failed => {
                self.windows.close_stray().await;
                return Ok(CycleOutcome::PurchaseFailed);
            }
            PurchaseOutcome::Unknown => {
                // Next pass recounts; a landed purchase gets sold then
                self.windows.close_stray().await;
                return Ok(CycleOutcome::PurchaseUnknown);
            }
        }

        sleep(ms(config.timing.post_purchase_ms)).await;
        self.windows.close_stray().await;
        self.inventory.unstack_all().await?;
        let report = self.listing.list_batch(config.trade.max_listings_per_cycle).await?;
        let cycles = self.session.cycle.record_buy_cycle();

        let residual = self.inventory.count_of_type();
        if residual > config.trade.warn_held_threshold {
            warn!(residual, "too many items left after listing, forcing sell-all");
            self.session.notify(
                Notification::new(
                    NoteKind::Error,
                    format!("Holding {} {}(s) after listing", residual, config.trade.item_label),
                )
                .field("Held", residual)
                .field("Threshold", config.trade.warn_held_threshold),
            );
            self.maintenance.sell_all().await?;
        }

        self.maintenance.maybe_run_periodic(cycles, Instant::now()).await?;
        Ok(CycleOutcome::Purchased {
            listed: report.listed,
        })
    }

    /// Scan the open market; on a miss, hit refresh and scan once more.
    async fn find_candidate(&self, window_id: i32) -> Result<Option<Candidate>> {
        let config = &self.session.config;
        let threshold = config.trade.max_buy_price;

        let first = self.session.world().window().and_then(|w| scan(&w, threshold));
        if first.is_some() {
            return Ok(first);
        }

        self.windows
            .click(window_id, config.market.refresh_slot as usize, Button::Left, MODE_PICKUP)?;
        sleep(ms(config.timing.refresh_wait_ms)).await;

        Ok(self.session.world().window().and_then(|w| scan(&w, threshold)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{EventHub, Transport};
    use crate::config::Config;
    use crate::error::Error;
    use crate::events::{Event, Outbound};
    use crate::testing::{listing_item, FakeServer, ListingBehavior, PurchaseBehavior, RecordingNotifier};
    use std::sync::Arc;

    /// Opens the market on request, then rejects every click.
    struct RejectingClicks {
        config: Config,
        hub: Arc<EventHub>,
    }

    impl Transport for RejectingClicks {
        fn send(&self, packet: Outbound) -> Result<()> {
            match packet {
                Outbound::Chat { message } if message == self.config.market.open_command => {
                    let mut slots = vec![None; 90];
                    slots[3] = Some(listing_item(&self.config, "900", "Steve"));
                    self.hub.dispatch(Event::WindowOpen {
                        window_id: 4,
                        kind: "generic_9x6".into(),
                        title: None,
                        slots,
                    });
                    Ok(())
                }
                Outbound::Click(_) => Err(Error::Bridge("click rejected".into())),
                _ => Ok(()),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_buy_and_list() {
        let server = FakeServer::new().with_listings(&[(3, "900", "Steve"), (20, "5K", "Alex")]);
        let session = server.session();

        let outcome = CycleOrchestrator::new(&session).run_once().await;
        assert_eq!(outcome, CycleOutcome::Purchased { listed: 1 });
        assert_eq!(session.held_count(), 0);
        assert_eq!(session.cycle.buy_cycles(), 1);
        assert_eq!(
            server.notifier.kinds(),
            vec![NoteKind::Purchase, NoteKind::Listing]
        );
        assert!(!session.cycle.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_held_items_are_sold_instead_of_buying() {
        let server = FakeServer::new()
            .with_listings(&[(3, "900", "Steve")])
            .with_inventory(&[(9, 1), (15, 1), (40, 1)]);
        let session = server.session();

        let outcome = CycleOrchestrator::new(&session).run_once().await;
        assert_eq!(outcome, CycleOutcome::Liquidated { remaining: 0 });
        assert_eq!(server.purchase_confirms(), 0);
        assert_eq!(server.list_commands(), 3);
        assert!(!server.chats().contains(&"/ah map".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_pass_is_skipped() {
        let server = FakeServer::new().with_listings(&[(3, "900", "Steve")]);
        let session = server.session();
        let orchestrator = CycleOrchestrator::new(&session);

        let (first, second) = tokio::join!(orchestrator.run_once(), orchestrator.run_once());
        assert_eq!(first, CycleOutcome::Purchased { listed: 1 });
        assert_eq!(second, CycleOutcome::Skipped);
        assert_eq!(server.purchase_confirms(), 1);
        assert_eq!(
            server.chats().iter().filter(|c| c.as_str() == "/ah map").count(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_then_buy() {
        let server = FakeServer::new()
            .with_listings(&[(3, "9K", "Steve")])
            .with_refresh_listings(&[(7, "1,100", "Alex")]);
        let session = server.session();

        let outcome = CycleOrchestrator::new(&session).run_once().await;
        assert_eq!(outcome, CycleOutcome::Purchased { listed: 1 });
        assert_eq!(server.clicks()[0].slot, 49);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_candidate_closes_market() {
        let server = FakeServer::new().with_listings(&[(3, "9K", "Steve")]);
        let session = server.session();

        let outcome = CycleOrchestrator::new(&session).run_once().await;
        assert_eq!(outcome, CycleOutcome::NoCandidate);
        assert!(session.world().window_id().is_none());
        assert_eq!(server.closed_windows().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_market_timeout() {
        let server = FakeServer::new().market_open(false);
        let session = server.session();

        let outcome = CycleOrchestrator::new(&session).run_once().await;
        assert_eq!(outcome, CycleOutcome::WindowTimeout);
        assert!(!session.cycle.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_purchase_closes_window_and_stops() {
        let server = FakeServer::new()
            .with_listings(&[(3, "900", "Steve"), (4, "950", "Alex")])
            .purchase(PurchaseBehavior::Silent);
        let session = server.session();

        let outcome = CycleOrchestrator::new(&session).run_once().await;
        assert_eq!(outcome, CycleOutcome::PurchaseUnknown);
        assert_eq!(server.purchase_confirms(), 1);
        assert!(session.world().window_id().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_suspended_pass_is_skipped() {
        let server = FakeServer::new().with_listings(&[(3, "900", "Steve")]);
        let session = server.session();
        session.cycle.suspend();

        let outcome = CycleOrchestrator::new(&session).run_once().await;
        assert_eq!(outcome, CycleOutcome::Skipped);
        assert!(server.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_closes_window_notifies_and_releases() {
        let config = Config::default();
        let hub = Arc::new(EventHub::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let session = Session::new(
            Arc::new(config.clone()),
            Arc::new(RejectingClicks {
                config,
                hub: hub.clone(),
            }),
            hub,
            notifier.clone(),
        );

        let outcome = CycleOrchestrator::new(&session).run_once().await;
        assert_eq!(outcome, CycleOutcome::Errored);
        assert_eq!(notifier.kinds(), vec![NoteKind::Error]);
        assert!(session.world().window_id().is_none());
        assert!(!session.cycle.is_running());
        assert!(session.cycle.try_begin().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_residual_after_listing_forces_sell_all() {
        let server = FakeServer::new()
            .configure(|c| {
                c.trade.warn_held_threshold = 0;
                c.retry.sell_all_iterations = 1;
            })
            .with_listings(&[(3, "900", "Steve")])
            .listing(ListingBehavior::Reject);
        let session = server.session();

        let outcome = CycleOrchestrator::new(&session).run_once().await;
        assert_eq!(outcome, CycleOutcome::Purchased { listed: 0 });
        assert_eq!(session.held_count(), 1);
        // Three tries from the batch, three more from the forced sell-all
        assert_eq!(server.list_commands(), 6);
        assert_eq!(
            server.notifier.kinds(),
            vec![NoteKind::Purchase, NoteKind::Error, NoteKind::Listing]
        );
    }

    #[test]
    fn test_pause_schedule() {
        let timing = Timing::default();
        assert_eq!(CycleOutcome::Purchased { listed: 3 }.pause(&timing), Duration::ZERO);
        assert_eq!(CycleOutcome::NoCandidate.pause(&timing), Duration::from_millis(2_500));
        assert_eq!(CycleOutcome::Errored.pause(&timing), Duration::from_millis(3_000));
        assert_eq!(
            CycleOutcome::Liquidated { remaining: 2 }.pause(&timing),
            Duration::from_millis(5_000)
        );
    }
}
