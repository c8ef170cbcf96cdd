use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tracing::{debug, info, trace, warn};

use crate::client::Transport;
use crate::error::{Error, Result};
use crate::events::{Event, Outbound};

/// Outbound half of a bridge connection. Cheap to clone.
#[derive(Clone)]
pub struct BridgeTransport {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl Transport for BridgeTransport {
    fn send(&self, packet: Outbound) -> Result<()> {
        self.tx.send(packet).map_err(|_| Error::Disconnected)
    }
}

/// A live connection to the game-protocol bridge.
///
/// Inbound frames arrive decoded on `events`; the stream always ends with
/// `Event::Disconnected`. Dropping the bridge tears both pump tasks down.
pub struct Bridge {
    pub transport: BridgeTransport,
    pub events: mpsc::UnboundedReceiver<Event>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Bridge {
    /// Connect once and ask the bridge to log in as `username`.
    /// Reconnecting is the supervisor's job.
    pub async fn connect(url: &str, username: &str) -> Result<Self> {
        info!("[bridge] Connecting to {}", url);
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| Error::Bridge(e.to_string()))?;
        info!("[bridge] Connected!");

        let (mut write, mut read) = ws_stream.split();

        let login = encode(&Outbound::Login {
            username: username.to_string(),
        })?;
        write
            .send(tungstenite::Message::Text(login))
            .await
            .map_err(|e| Error::Bridge(format!("login failed: {}", e)))?;
        info!("[bridge] Logging in as {}", username);
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Outbound>();
        let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();

        let writer = tokio::spawn(async move {
            while let Some(packet) = out_rx.recv().await {
                let quitting = matches!(packet, Outbound::Quit { .. });
                let text = match encode(&packet) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("[bridge] Dropping unencodable packet: {}", e);
                        continue;
                    }
                };
                trace!("[bridge] -> {}", text);
                if let Err(e) = write.send(tungstenite::Message::Text(text)).await {
                    warn!("[bridge] Send failed: {}", e);
                    break;
                }
                if quitting {
                    let _ = write.close().await;
                    break;
                }
            }
            debug!("[bridge] Writer stopped");
        });

        let reader = tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(tungstenite::Message::Text(text)) => match decode(&text) {
                        Ok(event) => {
                            let terminal = event.is_terminal();
                            if event_tx.send(event).is_err() || terminal {
                                return;
                            }
                        }
                        Err(e) => {
                            let preview: String = text.chars().take(200).collect();
                            debug!("[bridge] Skipping frame ({}): {}", e, preview);
                        }
                    },
                    Ok(tungstenite::Message::Close(frame)) => {
                        info!("[bridge] Closed by peer: {:?}", frame);
                        break;
                    }
                    Err(e) => {
                        warn!("[bridge] Error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
            let _ = event_tx.send(Event::Disconnected);
        });

        Ok(Self {
            transport: BridgeTransport { tx: out_tx },
            events: event_rx,
            reader,
            writer,
        })
    }

    /// Give queued packets (a final `quit`, usually) up to `limit` to reach
    /// the wire. The writer only stops on its own after sending `quit`.
    pub async fn flush(mut self, limit: Duration) {
        let writer = &mut self.writer;
        if tokio::time::timeout(limit, writer).await.is_err() {
            warn!("[bridge] Writer did not drain in time");
        }
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

pub fn decode(text: &str) -> Result<Event> {
    Ok(serde_json::from_str(text)?)
}

pub fn encode(packet: &Outbound) -> Result<String> {
    Ok(serde_json::to_string(packet)?)
}
