//! Scripted stand-in for the game server, used by the trade tests.
//!
//! `FakeServer` implements `Transport`: every outbound packet is recorded and
//! answered synchronously by dispatching events into the shared `EventHub`,
//! the way the real bridge would push them back.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use crate::api::{NoteKind, Notification, Notifier};
use crate::client::{EventHub, Transport};
use crate::config::Config;
use crate::error::Result;
use crate::events::{Button, ClickAction, Event, Outbound, CURSOR_SLOT, CURSOR_WINDOW};
use crate::session::Session;
use crate::state::{Item, STORAGE};

const MARKET_SIZE: usize = 54;
const DIALOG_SIZE: usize = 27;
const INVENTORY_SIZE: usize = 46;

/// How the server answers a purchase confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseBehavior {
    /// Close the dialog and hand over the item.
    Success,
    /// "already bought" right away, then the market view again.
    AlreadyBought,
    /// Close the dialog, then "already bought" after the given delay.
    AlreadyBoughtAfterClose(Duration),
    /// Never answer.
    Silent,
}

/// How the server answers a list command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingBehavior {
    /// Dialog opens, confirm takes one unit from the held slot.
    Accept,
    /// Dialog opens, confirm closes it but nothing is taken.
    Reject,
    /// No dialog at all.
    NoWindow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Purpose {
    Market,
    PurchaseDialog { listing: usize },
    ListingDialog { accept: bool },
    HubMenu,
}

struct ServerState {
    sent: Vec<Outbound>,
    state_id: i32,
    next_window: i32,
    open: Option<(i32, Purpose)>,
    listings: Vec<Option<Item>>,
    refresh_listings: Option<Vec<Option<Item>>>,
    inventory: Vec<Option<Item>>,
    cursor: Option<Item>,
    held: u8,
    purchase: PurchaseBehavior,
    listing: ListingBehavior,
    listing_script: VecDeque<ListingBehavior>,
    hub_menu: bool,
    market_open: bool,
    purchase_confirms: usize,
    list_commands: usize,
}

struct Inner {
    hub: Arc<EventHub>,
    config: Mutex<Config>,
    state: Mutex<ServerState>,
}

pub struct FakeServer {
    inner: Arc<Inner>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn map_item(config: &Config, count: u32) -> Item {
    Item::new(config.trade.item_kind.clone(), count)
}

pub fn listing_item(config: &Config, price: &str, seller: &str) -> Item {
    map_item(config, 1).with_lore([
        "§7Click to buy".to_string(),
        format!("§7Seller: §f{}", seller),
        format!("§7Price: §6${}", price),
    ])
}

impl FakeServer {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let state = ServerState {
            sent: Vec::new(),
            state_id: 100,
            next_window: 1,
            open: None,
            listings: vec![None; MARKET_SIZE],
            refresh_listings: None,
            inventory: vec![None; INVENTORY_SIZE],
            cursor: None,
            held: 0,
            purchase: PurchaseBehavior::Success,
            listing: ListingBehavior::Accept,
            listing_script: VecDeque::new(),
            hub_menu: true,
            market_open: true,
            purchase_confirms: 0,
            list_commands: 0,
        };
        Self {
            inner: Arc::new(Inner {
                hub: Arc::new(EventHub::new()),
                config: Mutex::new(config),
                state: Mutex::new(state),
            }),
            notifier: Arc::new(RecordingNotifier::default()),
        }
    }

    pub fn configure(self, f: impl FnOnce(&mut Config)) -> Self {
        f(&mut self.inner.config.lock());
        self
    }

    pub fn config(&self) -> Config {
        self.inner.config.lock().clone()
    }

    /// A fresh session wired to this server.
    pub fn session(&self) -> Session {
        Session::new(
            Arc::new(self.config()),
            Arc::new(FakeTransport {
                inner: self.inner.clone(),
            }),
            self.inner.hub.clone(),
            self.notifier.clone(),
        )
    }

    /// Market listings as `(slot, price, seller)`.
    pub fn with_listings(self, listings: &[(usize, &str, &str)]) -> Self {
        let config = self.config();
        {
            let mut state = self.inner.state.lock();
            state.listings = build_listings(&config, listings);
        }
        self
    }

    /// What the market shows after the refresh button is clicked.
    pub fn with_refresh_listings(self, listings: &[(usize, &str, &str)]) -> Self {
        let config = self.config();
        self.inner.state.lock().refresh_listings = Some(build_listings(&config, listings));
        self
    }

    /// Put `(slot, count)` stacks of the traded item in the player inventory
    /// and push the snapshot to the client.
    pub fn with_inventory(self, stacks: &[(usize, u32)]) -> Self {
        let config = self.config();
        {
            let mut state = self.inner.state.lock();
            for &(slot, count) in stacks {
                state.inventory[slot] = Some(map_item(&config, count));
            }
            let snapshot = state.inventory.clone();
            let state_id = state.bump();
            self.inner.hub.dispatch(Event::Slots {
                window_id: 0,
                state_id,
                slots: snapshot,
            });
        }
        self
    }

    pub fn purchase(self, behavior: PurchaseBehavior) -> Self {
        self.inner.state.lock().purchase = behavior;
        self
    }

    pub fn listing(self, behavior: ListingBehavior) -> Self {
        self.inner.state.lock().listing = behavior;
        self
    }

    /// Per-command listing answers, used before falling back to `listing`.
    pub fn listing_script(self, script: &[ListingBehavior]) -> Self {
        self.inner.state.lock().listing_script = script.iter().copied().collect();
        self
    }

    pub fn hub_menu(self, enabled: bool) -> Self {
        self.inner.state.lock().hub_menu = enabled;
        self
    }

    /// When false the market command is ignored.
    pub fn market_open(self, open: bool) -> Self {
        self.inner.state.lock().market_open = open;
        self
    }

    pub fn sent(&self) -> Vec<Outbound> {
        self.inner.state.lock().sent.clone()
    }

    pub fn chats(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|packet| match packet {
                Outbound::Chat { message } => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn clicks(&self) -> Vec<ClickAction> {
        self.sent()
            .into_iter()
            .filter_map(|packet| match packet {
                Outbound::Click(click) => Some(click),
                _ => None,
            })
            .collect()
    }

    pub fn closed_windows(&self) -> Vec<i32> {
        self.sent()
            .into_iter()
            .filter_map(|packet| match packet {
                Outbound::CloseWindow { window_id } => Some(window_id),
                _ => None,
            })
            .collect()
    }

    pub fn purchase_confirms(&self) -> usize {
        self.inner.state.lock().purchase_confirms
    }

    pub fn list_commands(&self) -> usize {
        self.inner.state.lock().list_commands
    }

    /// Units of the traded item the server thinks we hold.
    pub fn held(&self) -> u32 {
        let kind = self.config().trade.item_kind;
        self.inner
            .state
            .lock()
            .inventory
            .iter()
            .flatten()
            .filter(|item| item.is(&kind))
            .map(|item| item.count)
            .sum()
    }

    pub fn listings_left(&self) -> usize {
        self.inner.state.lock().listings.iter().flatten().count()
    }
}

fn build_listings(config: &Config, listings: &[(usize, &str, &str)]) -> Vec<Option<Item>> {
    let mut slots = vec![None; MARKET_SIZE];
    for &(slot, price, seller) in listings {
        slots[slot] = Some(listing_item(config, price, seller));
    }
    slots
}

impl ServerState {
    fn bump(&mut self) -> i32 {
        self.state_id += 1;
        self.state_id
    }

    fn next_listing_behavior(&mut self) -> ListingBehavior {
        self.listing_script.pop_front().unwrap_or(self.listing)
    }

    fn first_empty(&self) -> Option<usize> {
        STORAGE.into_iter().find(|&slot| self.inventory[slot].is_none())
    }
}

struct FakeTransport {
    inner: Arc<Inner>,
}

impl Transport for FakeTransport {
    fn send(&self, packet: Outbound) -> Result<()> {
        let config = self.inner.config.lock().clone();
        let mut state = self.inner.state.lock();
        state.sent.push(packet.clone());

        match packet {
            Outbound::Chat { message } => self.on_chat(&config, &mut state, &message),
            Outbound::Click(click) => self.on_click(&config, &mut state, &click),
            Outbound::HeldSlot { slot } => state.held = slot,
            Outbound::CloseWindow { window_id } => {
                if state.open.is_some_and(|(id, _)| id == window_id) {
                    state.open = None;
                }
            }
            Outbound::Login { .. } | Outbound::Quit { .. } => {}
        }
        Ok(())
    }
}

impl FakeTransport {
    fn dispatch(&self, event: Event) {
        self.inner.hub.dispatch(event);
    }

    /// Open a container with the player inventory mirrored after it.
    fn open_window(&self, state: &mut ServerState, kind: &str, container: Vec<Option<Item>>, purpose: Purpose) {
        let id = state.next_window;
        state.next_window += 1;
        state.open = Some((id, purpose));

        let mut slots = container;
        slots.extend(state.inventory[9..45].iter().cloned());
        self.dispatch(Event::WindowOpen {
            window_id: id,
            kind: kind.to_string(),
            title: None,
            slots,
        });
    }

    fn close_window(&self, state: &mut ServerState) {
        if let Some((id, _)) = state.open.take() {
            self.dispatch(Event::WindowClose { window_id: id });
        }
    }

    fn push_inventory_slot(&self, state: &mut ServerState, slot: usize) {
        let state_id = state.bump();
        let item = state.inventory[slot].clone();
        self.dispatch(Event::Slot {
            window_id: 0,
            state_id,
            slot: slot as i16,
            item,
        });
    }

    fn push_cursor(&self, state: &mut ServerState) {
        let state_id = state.bump();
        let item = state.cursor.clone();
        self.dispatch(Event::Slot {
            window_id: CURSOR_WINDOW,
            state_id,
            slot: CURSOR_SLOT,
            item,
        });
    }

    fn on_chat(&self, config: &Config, state: &mut ServerState, message: &str) {
        let list_prefix = config.market.list_command_for("");
        if message == config.market.open_command {
            if !state.market_open {
                return;
            }
            let listings = state.listings.clone();
            self.open_window(state, "minecraft:generic_9x6", listings, Purpose::Market);
        } else if message.starts_with(list_prefix.trim_end()) {
            state.list_commands += 1;
            let behavior = state.next_listing_behavior();
            let held = 36 + state.held as usize;
            // Server refuses to list an empty hand
            if behavior != ListingBehavior::NoWindow && state.inventory[held].is_some() {
                self.open_window(
                    state,
                    "minecraft:generic_9x3",
                    vec![None; DIALOG_SIZE],
                    Purpose::ListingDialog {
                        accept: behavior == ListingBehavior::Accept,
                    },
                );
            }
        } else if message == config.market.hub_command && state.hub_menu {
            self.open_window(state, "minecraft:generic_9x3", vec![None; DIALOG_SIZE], Purpose::HubMenu);
        }
    }

    fn on_click(&self, config: &Config, state: &mut ServerState, click: &ClickAction) {
        let slot = click.slot as usize;
        match state.open {
            Some((id, purpose)) if id == click.window_id => match purpose {
                Purpose::Market => self.on_market_click(config, state, slot),
                Purpose::PurchaseDialog { listing } => {
                    if slot == config.market.confirm_slot as usize {
                        self.on_purchase_confirm(state, listing);
                    }
                }
                Purpose::ListingDialog { accept } => {
                    if slot == config.market.confirm_slot as usize {
                        self.on_listing_confirm(state, accept);
                    }
                }
                Purpose::HubMenu => {
                    if slot == config.market.hub_menu_slot as usize {
                        self.close_window(state);
                    }
                }
            },
            _ if click.window_id == 0 => self.on_inventory_click(state, slot, click.button),
            _ => {}
        }
    }

    /// Re-render the open window in place (same id, new contents).
    fn redraw(&self, state: &mut ServerState, container: Vec<Option<Item>>) {
        let Some((id, _)) = state.open else { return };
        let mut slots = container;
        slots.extend(state.inventory[9..45].iter().cloned());
        let state_id = state.bump();
        self.dispatch(Event::Slots {
            window_id: id,
            state_id,
            slots,
        });
    }

    fn on_market_click(&self, config: &Config, state: &mut ServerState, slot: usize) {
        if slot == config.market.refresh_slot as usize {
            if let Some(fresh) = state.refresh_listings.take() {
                state.listings = fresh;
            }
            let listings = state.listings.clone();
            self.redraw(state, listings);
        } else if slot < MARKET_SIZE && state.listings[slot].is_some() {
            // The market window turns into the confirm view
            let mut dialog = vec![None; MARKET_SIZE];
            dialog[13] = state.listings[slot].clone();
            state.open = state
                .open
                .map(|(id, _)| (id, Purpose::PurchaseDialog { listing: slot }));
            self.redraw(state, dialog);
        }
    }

    fn on_purchase_confirm(&self, state: &mut ServerState, listing: usize) {
        state.purchase_confirms += 1;
        match state.purchase {
            PurchaseBehavior::Success => {
                let bought = state.listings[listing].take();
                self.close_window(state);
                if let (Some(mut item), Some(slot)) = (bought, state.first_empty()) {
                    item.display = None;
                    state.inventory[slot] = Some(item);
                    self.push_inventory_slot(state, slot);
                }
            }
            PurchaseBehavior::AlreadyBought => {
                state.listings[listing] = None;
                self.dispatch(Event::Chat {
                    text: "§cThis item was already bought by another player!".into(),
                });
                // Back to the market view, minus the sold listing
                state.open = state.open.map(|(id, _)| (id, Purpose::Market));
                let listings = state.listings.clone();
                self.redraw(state, listings);
            }
            PurchaseBehavior::AlreadyBoughtAfterClose(delay) => {
                state.listings[listing] = None;
                self.close_window(state);
                let hub = self.inner.hub.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    hub.dispatch(Event::Chat {
                        text: "§cThat listing was already bought!".into(),
                    });
                });
            }
            PurchaseBehavior::Silent => {}
        }
    }

    fn on_listing_confirm(&self, state: &mut ServerState, accept: bool) {
        if accept {
            let held = 36 + state.held as usize;
            if let Some(item) = state.inventory[held].as_mut() {
                item.count -= 1;
                if item.count == 0 {
                    state.inventory[held] = None;
                }
            }
            self.push_inventory_slot(state, held);
        }
        self.close_window(state);
    }

    /// Vanilla pick-up semantics for the player inventory.
    fn on_inventory_click(&self, state: &mut ServerState, slot: usize, button: Button) {
        if slot >= INVENTORY_SIZE {
            return;
        }
        let target = state.inventory[slot].take();
        let cursor = state.cursor.take();

        let (new_slot, new_cursor) = match (button, target, cursor) {
            (_, None, None) => (None, None),
            (Button::Left, Some(stack), None) => (None, Some(stack)),
            (Button::Right, Some(mut stack), None) => {
                let taken = stack.count.div_ceil(2);
                stack.count -= taken;
                let mut picked = stack.clone();
                picked.count = taken;
                ((stack.count > 0).then_some(stack), Some(picked))
            }
            (Button::Left, None, Some(held)) => (Some(held), None),
            (Button::Right, None, Some(mut held)) => {
                let mut placed = held.clone();
                placed.count = 1;
                held.count -= 1;
                (Some(placed), (held.count > 0).then_some(held))
            }
            (Button::Left, Some(mut stack), Some(held)) if stack.name == held.name => {
                stack.count += held.count;
                (Some(stack), None)
            }
            (Button::Right, Some(mut stack), Some(mut held)) if stack.name == held.name => {
                stack.count += 1;
                held.count -= 1;
                (Some(stack), (held.count > 0).then_some(held))
            }
            (_, Some(stack), Some(held)) => (Some(held), Some(stack)),
        };

        state.inventory[slot] = new_slot;
        state.cursor = new_cursor;
        self.push_inventory_slot(state, slot);
        self.push_cursor(state);
    }
}

/// Keeps every notification for assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    notes: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn notes(&self) -> Vec<Notification> {
        self.notes.lock().clone()
    }

    pub fn kinds(&self) -> Vec<NoteKind> {
        self.notes.lock().iter().map(|note| note.kind).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, note: Notification) {
        self.notes.lock().push(note);
    }
}
