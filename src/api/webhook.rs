use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Webhook;

/// Event kinds that can be reported, each with its own on/off switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    Purchase,
    Listing,
    Sale,
    Afk,
    Error,
    Startup,
}

impl NoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteKind::Purchase => "purchase",
            NoteKind::Listing => "listing",
            NoteKind::Sale => "sale",
            NoteKind::Afk => "afk",
            NoteKind::Error => "error",
            NoteKind::Startup => "startup",
        }
    }

    /// Embed colour (0xRRGGBB)
    pub fn color(&self) -> u32 {
        match self {
            NoteKind::Purchase => 0x00ff00,
            NoteKind::Listing => 0x0099ff,
            NoteKind::Sale => 0xffd700,
            NoteKind::Afk => 0xff9900,
            NoteKind::Error => 0xff0000,
            NoteKind::Startup => 0x9b59b6,
        }
    }

    fn enabled_in(&self, config: &Webhook) -> bool {
        let events = &config.events;
        match self {
            NoteKind::Purchase => events.purchase,
            NoteKind::Listing => events.listing,
            NoteKind::Sale => events.sale,
            NoteKind::Afk => events.afk,
            NoteKind::Error => events.error,
            NoteKind::Startup => events.startup,
        }
    }
}

/// One thing worth telling the operator about.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub kind: NoteKind,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl Notification {
    pub fn new(kind: NoteKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.fields.push((name.into(), value.to_string()));
        self
    }
}

/// Fire-and-forget notification sink. Must never fail the caller.
pub trait Notifier: Send + Sync {
    fn notify(&self, note: Notification);
}

// Discord webhook payload
#[derive(Debug, Serialize)]
struct Payload<'a> {
    username: &'a str,
    embeds: Vec<Embed<'a>>,
}

#[derive(Debug, Serialize)]
struct Embed<'a> {
    title: String,
    description: &'a str,
    color: u32,
    timestamp: String,
    fields: Vec<EmbedField<'a>>,
}

#[derive(Debug, Serialize)]
struct EmbedField<'a> {
    name: &'a str,
    value: &'a str,
    inline: bool,
}

/// Posts notifications to a Discord-compatible webhook.
pub struct WebhookNotifier {
    config: Webhook,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(config: Webhook) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn should_send(&self, kind: NoteKind) -> bool {
        self.config.enabled && !self.config.url.is_empty() && kind.enabled_in(&self.config)
    }

    fn payload(&self, note: &Notification) -> serde_json::Result<serde_json::Value> {
        let payload = Payload {
            username: &self.config.display_name,
            embeds: vec![Embed {
                title: format!("{} Event", capitalize_first(note.kind.as_str())),
                description: &note.message,
                color: note.kind.color(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                fields: note
                    .fields
                    .iter()
                    .map(|(name, value)| EmbedField {
                        name,
                        value,
                        inline: true,
                    })
                    .collect(),
            }],
        };
        serde_json::to_value(payload)
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, note: Notification) {
        if !self.should_send(note.kind) {
            debug!(kind = note.kind.as_str(), "webhook skipped: {}", note.message);
            return;
        }

        let body = match self.payload(&note) {
            Ok(body) => body,
            Err(e) => {
                warn!("failed to build webhook payload: {}", e);
                return;
            }
        };

        let client = self.client.clone();
        let url = self.config.url.clone();
        let kind = note.kind.as_str();
        tokio::spawn(async move {
            match client.post(&url).json(&body).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(kind, "webhook delivered");
                }
                Ok(response) => {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    warn!(kind, %status, "webhook rejected: {}", text);
                }
                Err(e) => warn!(kind, "webhook failed: {}", e),
            }
        });
    }
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}
