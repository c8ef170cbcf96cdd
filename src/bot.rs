//! Connection supervisor: connect, start trading on spawn, react to chat,
//! reconnect after kicks and drops.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{sleep, Instant};
use tracing::{error, info, warn};

use crate::api::{NoteKind, Notification, Notifier};
use crate::client::EventHub;
use crate::config::{ms, Config, Mode};
use crate::events::{Event, Outbound};
use crate::feeds::bridge::Bridge;
use crate::session::Session;
use crate::strategy::{classify, ChatNotice};
use crate::trade::{handle_afk, CycleOrchestrator, Maintenance};

/// How long a final `quit` gets to reach the bridge.
const QUIT_FLUSH: Duration = Duration::from_secs(2);

/// How a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Kicked, dropped or the bridge went away.
    Reconnect,
    /// Liquidate-only run done; the process should end.
    Finished,
}

/// What a spawned session task reports when it ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Finished,
}

/// Run until a liquidate-only pass completes. Normal mode never returns.
pub async fn run(config: Arc<Config>, notifier: Arc<dyn Notifier>) -> anyhow::Result<()> {
    let reconnect_delay = ms(config.connection.reconnect_delay_ms);

    loop {
        match Bridge::connect(&config.connection.bridge_url, &config.connection.username).await {
            Ok(mut bridge) => {
                let session = Arc::new(Session::new(
                    config.clone(),
                    Arc::new(bridge.transport.clone()),
                    Arc::new(EventHub::new()),
                    notifier.clone(),
                ));

                let exit = Connection::new(session).serve(&mut bridge.events).await;
                if exit == Exit::Finished {
                    bridge.flush(QUIT_FLUSH).await;
                    info!("liquidation complete, exiting");
                    return Ok(());
                }
                warn!("connection lost");
            }
            Err(e) => error!("could not reach bridge: {}", e),
        }

        info!(delay_ms = reconnect_delay.as_millis() as u64, "reconnecting");
        sleep(reconnect_delay).await;
    }
}

/// One connection's worth of supervision. Dropping it aborts every task
/// it spawned, so nothing outlives the connection.
pub struct Connection {
    session: Arc<Session>,
    tasks: JoinSet<Flow>,
    started: bool,
}

impl Connection {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            tasks: JoinSet::new(),
            started: false,
        }
    }

    /// Pump events until the connection ends.
    pub async fn serve(mut self, events: &mut mpsc::UnboundedReceiver<Event>) -> Exit {
        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        return Exit::Reconnect;
                    };
                    if let Some(exit) = self.on_event(event) {
                        return exit;
                    }
                }
                Some(joined) = self.tasks.join_next() => {
                    match joined {
                        Ok(Flow::Finished) => return Exit::Finished,
                        Ok(Flow::Continue) => {}
                        Err(e) if e.is_cancelled() => {}
                        Err(e) => error!("session task panicked: {}", e),
                    }
                }
            }
        }
    }

    fn on_event(&mut self, event: Event) -> Option<Exit> {
        self.session.hub.dispatch(event.clone());

        match event {
            Event::Spawned { username } => {
                if self.started {
                    return None;
                }
                self.started = true;
                info!(%username, "spawned");
                self.tasks.spawn(startup(self.session.clone(), username));
            }
            Event::Chat { text } => {
                info!(target: "chat", "{}", text);
                match classify(&text) {
                    ChatNotice::AfkTeleport => {
                        let session = self.session.clone();
                        self.tasks.spawn(async move {
                            if let Err(e) = handle_afk(&session).await {
                                error!("AFK recovery failed: {}", e);
                            }
                            Flow::Continue
                        });
                    }
                    ChatNotice::Sale(sale) => {
                        info!(buyer = %sale.buyer, price = sale.price, "sold {}", sale.item);
                        self.session.notify(
                            Notification::new(
                                NoteKind::Sale,
                                format!("{} bought your {}", sale.buyer, sale.item),
                            )
                            .field("Buyer", &sale.buyer)
                            .field("Price", sale.price),
                        );
                    }
                    ChatNotice::AlreadyBought | ChatNotice::Other => {}
                }
            }
            Event::Kicked { reason } => {
                warn!("kicked: {}", reason);
                self.session.notify(
                    Notification::new(NoteKind::Error, "Bot was kicked").field("Reason", reason),
                );
                return Some(Exit::Reconnect);
            }
            Event::Disconnected => return Some(Exit::Reconnect),
            _ => {}
        }
        None
    }
}

/// Clear leftovers from the last session, then trade (or quit, when
/// liquidating).
async fn startup(session: Arc<Session>, username: String) -> Flow {
    let config = &session.config;
    session.notify(
        Notification::new(NoteKind::Startup, "Bot connected")
            .field("Bridge", &config.connection.bridge_url)
            .field("Username", username)
            .field("Mode", config.trade.mode),
    );

    sleep(ms(config.connection.delay_after_join_ms)).await;

    let maintenance = Maintenance::new(&session);
    let report = match maintenance.sell_all().await {
        Ok(report) => report,
        Err(e) => {
            error!("startup sell-all failed: {}", e);
            Default::default()
        }
    };
    maintenance.start_clock(Instant::now());

    match config.trade.mode {
        Mode::LiquidateOnly => {
            let remaining = session.held_count();
            info!(listed = report.listed, remaining, "liquidate-only pass done");
            session.notify(
                Notification::new(NoteKind::Startup, "Liquidate-only run finished")
                    .field("Listed", report.listed)
                    .field("Failed", report.failed)
                    .field("Remaining", remaining),
            );
            if let Err(e) = session.send(Outbound::Quit {
                reason: "liquidation complete".into(),
            }) {
                warn!("could not send quit: {}", e);
            }
            Flow::Finished
        }
        Mode::Normal => {
            CycleOrchestrator::new(&session).run().await;
            Flow::Continue
        }
    }
}
