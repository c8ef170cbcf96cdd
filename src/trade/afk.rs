use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::api::{NoteKind, Notification};
use crate::client::WindowClient;
use crate::config::ms;
use crate::error::Result;
use crate::events::{Button, MODE_PICKUP};
use crate::session::Session;

/// React to being moved to the AFK area: suspend the loop, walk back via
/// the hub menu, wait out the dwell period, resume.
///
/// Returns `false` if another AFK recovery is already running.
pub async fn handle_afk(session: &Session) -> Result<bool> {
    if !session.cycle.suspend() {
        debug!("AFK recovery already in progress");
        return Ok(false);
    }
    // Let the next loop pass start fresh once we're back
    session.cycle.release_running();

    warn!("AFK teleport detected, returning to hub");
    session.notify(Notification::new(
        NoteKind::Afk,
        "AFK teleport detected, returning to hub",
    ));

    let result = recover(session).await;
    session.cycle.resume();
    info!("AFK recovery finished, resuming");
    result.map(|_| true)
}

async fn recover(session: &Session) -> Result<()> {
    let config = &session.config;
    let windows = WindowClient::new(session);

    windows.close_stray().await;
    match windows
        .open(&config.market.hub_command, ms(config.timing.afk_menu_timeout_ms))
        .await
    {
        Ok(window_id) => {
            windows.click(window_id, config.market.hub_menu_slot as usize, Button::Left, MODE_PICKUP)?;
            sleep(ms(config.timing.window_cleanup_ms)).await;
        }
        Err(e) if e.is_transient() => {
            info!("no hub menu appeared, carrying on: {}", e);
        }
        Err(e) => return Err(e),
    }

    sleep(ms(config.timing.afk_dwell_ms)).await;
    Ok(())
}
