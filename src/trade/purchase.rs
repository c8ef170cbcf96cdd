use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::api::{NoteKind, Notification};
use crate::client::WindowClient;
use crate::config::ms;
use crate::error::Result;
use crate::events::{Button, Event, MODE_PICKUP};
use crate::session::Session;
use crate::strategy::{is_already_bought, scan, Candidate, RetryPolicy};

/// Where a single attempt is. Only used for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseState {
    Clicking,
    ConfirmSent,
    AwaitingOutcome,
    Settled(PurchaseOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseOutcome {
    /// Window closed and no "already bought" followed within the grace period.
    Success,
    /// The server told us someone else got it.
    Failed,
    /// Neither signal before the timeout. The item may or may not be ours;
    /// never counted as a purchase.
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    AlreadyBought,
    Closed,
}

/// Drives one listing from click to a settled outcome.
pub struct PurchaseExecutor<'a> {
    session: &'a Session,
    windows: WindowClient<'a>,
}

impl<'a> PurchaseExecutor<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self {
            session,
            windows: WindowClient::new(session),
        }
    }

    fn enter(&self, state: &mut PurchaseState, next: PurchaseState) {
        debug!(from = ?state, to = ?next, "purchase state");
        *state = next;
    }

    /// One buy attempt against `candidate` in the open market window.
    pub async fn attempt(&self, window_id: i32, candidate: &Candidate) -> Result<PurchaseOutcome> {
        let timing = &self.session.config.timing;
        let confirm_slot = self.session.config.market.confirm_slot as usize;
        let mut state = PurchaseState::Clicking;

        // Listener lives for the whole attempt and is dropped on every exit path
        let mut sub = self.session.hub.subscribe();

        self.windows.click(window_id, candidate.slot, Button::Left, MODE_PICKUP)?;
        sleep(ms(timing.click_confirm_delay_ms)).await;

        self.windows.click(window_id, confirm_slot, Button::Left, MODE_PICKUP)?;
        self.enter(&mut state, PurchaseState::ConfirmSent);

        let deadline = Instant::now() + ms(timing.purchase_timeout_ms);
        self.enter(&mut state, PurchaseState::AwaitingOutcome);

        let signal = sub
            .next_matching_until(deadline, |event| match event {
                Event::Chat { text } if is_already_bought(text) => Some(Signal::AlreadyBought),
                Event::WindowClose { .. } => Some(Signal::Closed),
                _ => None,
            })
            .await;

        let outcome = match signal {
            Some(Signal::AlreadyBought) => {
                info!(slot = candidate.slot, "listing already bought");
                PurchaseOutcome::Failed
            }
            Some(Signal::Closed) => {
                // "already bought" can land just after the close
                let late = sub
                    .next_matching(ms(timing.purchase_grace_ms), |event| match event {
                        Event::Chat { text } if is_already_bought(text) => Some(()),
                        _ => None,
                    })
                    .await;
                if late.is_some() {
                    info!(slot = candidate.slot, "window closed but listing was already bought");
                    PurchaseOutcome::Failed
                } else {
                    PurchaseOutcome::Success
                }
            }
            None => {
                warn!(
                    slot = candidate.slot,
                    "no close and no reply before timeout, purchase state unknown"
                );
                PurchaseOutcome::Unknown
            }
        };

        self.enter(&mut state, PurchaseState::Settled(outcome));
        Ok(outcome)
    }

    /// Buy `first`, retrying against fresh scans of the still-open window.
    ///
    /// Stops at the first success, at an unknown outcome (a retry could
    /// double-buy), when no window or candidate is left, or when attempts
    /// run out.
    pub async fn run(&self, first: Candidate) -> Result<PurchaseOutcome> {
        let config = &self.session.config;
        let policy = RetryPolicy::fixed(
            config.retry.purchase_attempts,
            ms(config.timing.purchase_retry_ms),
        );
        let mut candidate = first;

        for attempt in policy.attempts() {
            let Some(window_id) = self.session.world().window_id() else {
                debug!("market window gone, ending purchase phase");
                break;
            };

            info!(
                attempt,
                slot = candidate.slot,
                price = candidate.price,
                seller = candidate.seller.as_deref().unwrap_or("unknown"),
                "attempting purchase"
            );

            match self.attempt(window_id, &candidate).await? {
                PurchaseOutcome::Success => {
                    info!(price = candidate.price, "purchase succeeded");
                    self.session.notify(
                        Notification::new(
                            NoteKind::Purchase,
                            format!("Bought a {} for ${}", config.trade.item_label, candidate.price),
                        )
                        .field("Price", format!("${}", candidate.price))
                        .field("Seller", candidate.seller.as_deref().unwrap_or("Unknown")),
                    );
                    return Ok(PurchaseOutcome::Success);
                }
                PurchaseOutcome::Unknown => return Ok(PurchaseOutcome::Unknown),
                PurchaseOutcome::Failed => {
                    if policy.is_last(attempt) || self.session.cycle.is_suspended() {
                        break;
                    }
                    policy.wait(attempt).await;

                    let Some(window) = self.session.world().window() else {
                        break;
                    };
                    match scan(&window, config.trade.max_buy_price) {
                        Some(next) => candidate = next,
                        None => {
                            debug!("no other candidate after failed attempt");
                            break;
                        }
                    }
                }
            }
        }

        Ok(PurchaseOutcome::Failed)
    }
}
