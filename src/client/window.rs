use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::ms;
use crate::error::{Error, Result};
use crate::events::{Button, ClickAction, Event, Outbound};
use crate::session::Session;

/// Opens, clicks and closes server containers.
pub struct WindowClient<'a> {
    session: &'a Session,
}

impl<'a> WindowClient<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Send `command` and wait for the window it opens. Returns the window id.
    ///
    /// Any window still open is closed first. The listener is registered
    /// before the command goes out so a fast reply can't be missed.
    pub async fn open(&self, command: &str, limit: Duration) -> Result<i32> {
        let timing = &self.session.config.timing;

        if let Some(stale) = self.session.world().window_id() {
            debug!(window_id = stale, "closing window before opening another");
            self.close(stale);
            sleep(ms(timing.pre_open_settle_ms)).await;
        }

        let mut sub = self.session.hub.subscribe();
        self.session.send(Outbound::chat(command))?;

        let window_id = sub
            .next_matching(limit, |event| match event {
                Event::WindowOpen { window_id, .. } => Some(*window_id),
                _ => None,
            })
            .await
            .ok_or_else(|| Error::window_timeout(format!("window from '{}'", command)))?;

        debug!(window_id, command, "window opened");
        sleep(ms(timing.open_settle_ms)).await;
        Ok(window_id)
    }

    /// Click stamped with the latest state id. `mode` is the wire click
    /// mode; everything here uses `MODE_PICKUP`.
    pub fn click(&self, window_id: i32, slot: usize, button: Button, mode: u8) -> Result<()> {
        let slot = i16::try_from(slot).map_err(|_| Error::Bridge(format!("slot {} out of range", slot)))?;
        let state_id = self.session.world().state_id();
        debug!(window_id, slot, ?button, mode, state_id, "click");
        self.session.send(Outbound::Click(ClickAction::new(
            window_id, slot, button, mode, state_id,
        )))
    }

    /// Best effort: failures are logged, never returned.
    pub fn close(&self, window_id: i32) {
        if let Err(e) = self.session.send(Outbound::CloseWindow { window_id }) {
            warn!(window_id, "failed to close window: {}", e);
        }
        self.session.world().clear_window();
    }

    /// Close whatever is open, then give the server a moment.
    pub async fn close_stray(&self) {
        if let Some(window_id) = self.session.world().window_id() {
            debug!(window_id, "closing stray window");
            self.close(window_id);
            sleep(ms(self.session.config.timing.window_cleanup_ms)).await;
        }
    }
}
