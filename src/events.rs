use serde::{Deserialize, Serialize};

use crate::state::Item;

/// Window id the server uses for the player's own inventory.
pub const PLAYER_WINDOW: i32 = 0;

/// Window id / slot index the server uses for the cursor ("carried") stack.
pub const CURSOR_WINDOW: i32 = -1;
pub const CURSOR_SLOT: i16 = -1;

/// Everything the bridge pushes to us. One JSON object per frame, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    // Login finished, we're in the world
    Spawned {
        username: String,
    },

    // Server opened a container (marketplace, confirm dialog, hub menu...)
    WindowOpen {
        window_id: i32,
        kind: String,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        slots: Vec<Option<Item>>,
    },

    // Server closed a container (or acknowledged our close)
    WindowClose {
        window_id: i32,
    },

    // Full contents of a window. Carries a fresh state id.
    Slots {
        window_id: i32,
        state_id: i32,
        slots: Vec<Option<Item>>,
    },

    // Single slot changed. Carries a fresh state id.
    Slot {
        window_id: i32,
        state_id: i32,
        slot: i16,
        #[serde(default)]
        item: Option<Item>,
    },

    // One line of chat, already flattened to plain text (may still contain § codes)
    Chat {
        text: String,
    },

    Kicked {
        reason: String,
    },

    Disconnected,
}

impl Event {
    /// Short name for logs and the probe binary.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Spawned { .. } => "spawned",
            Event::WindowOpen { .. } => "window_open",
            Event::WindowClose { .. } => "window_close",
            Event::Slots { .. } => "slots",
            Event::Slot { .. } => "slot",
            Event::Chat { .. } => "chat",
            Event::Kicked { .. } => "kicked",
            Event::Disconnected => "disconnected",
        }
    }

    /// Kick / disconnect end the connection; the supervisor reconnects.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::Kicked { .. } | Event::Disconnected)
    }
}

/// Everything we send to the bridge.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    // First frame on a new connection: which account the bridge logs in as
    Login { username: String },

    // Chat line or slash command
    Chat { message: String },

    Click(ClickAction),

    // Select hotbar slot 0..=8 as the held item
    HeldSlot { slot: u8 },

    CloseWindow { window_id: i32 },

    Quit { reason: String },
}

impl Outbound {
    pub fn chat(message: impl Into<String>) -> Self {
        Outbound::Chat {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "u8")]
pub enum Button {
    Left,
    Right,
}

impl From<Button> for u8 {
    fn from(button: Button) -> u8 {
        match button {
            Button::Left => 0,
            Button::Right => 1,
        }
    }
}

/// Plain pick-up / place click. The only mode we use.
pub const MODE_PICKUP: u8 = 0;

/// A stamped container click.
///
/// `changed_slots` is always empty and `carried_item` always null: we never
/// predict the result client-side and wait for the server's next snapshot
/// instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClickAction {
    pub window_id: i32,
    pub slot: i16,
    pub button: Button,
    pub mode: u8,
    pub state_id: i32,
    pub changed_slots: Vec<SlotChange>,
    pub carried_item: Option<Item>,
}

impl ClickAction {
    pub fn new(window_id: i32, slot: i16, button: Button, mode: u8, state_id: i32) -> Self {
        Self {
            window_id,
            slot,
            button,
            mode,
            state_id,
            changed_slots: Vec::new(),
            carried_item: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotChange {
    pub slot: i16,
    pub item: Option<Item>,
}
