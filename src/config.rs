use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: General,
    pub connection: Connection,
    pub trade: Trade,
    pub market: Market,
    pub timing: Timing,
    pub retry: Retry,
    pub maintenance: Maintenance,
    pub webhook: Webhook,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct General {
    pub log_level: String,
}

impl Default for General {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Connection {
    /// WebSocket endpoint of the game-protocol bridge
    pub bridge_url: String,
    pub username: String,
    pub reconnect_delay_ms: u64,
    pub delay_after_join_ms: u64,
}

impl Default for Connection {
    fn default() -> Self {
        Self {
            bridge_url: "ws://127.0.0.1:8765".to_string(),
            username: "BOT_USERNAME".to_string(),
            reconnect_delay_ms: 30_000,
            delay_after_join_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Buy, list, repeat.
    #[default]
    Normal,
    /// List everything held once, then quit.
    #[serde(alias = "sell-only", alias = "sell_only")]
    LiquidateOnly,
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Mode::Normal),
            "liquidate_only" | "liquidate-only" | "sell-only" | "sell_only" => {
                Ok(Mode::LiquidateOnly)
            }
            other => Err(format!("unknown mode '{}'", other)),
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Normal => write!(f, "normal"),
            Mode::LiquidateOnly => write!(f, "liquidate_only"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Trade {
    /// Item type identifier that is bought and resold
    pub item_kind: String,
    /// Human name the server uses for the item in chat
    pub item_label: String,
    /// Buy only listings strictly cheaper than this
    pub max_buy_price: u64,
    /// Passed verbatim to the list command (e.g. "9.9k")
    pub sell_price: String,
    pub max_listings_per_cycle: usize,
    /// Held count after listing above which a full sell-all is forced
    pub warn_held_threshold: u32,
    pub mode: Mode,
}

impl Default for Trade {
    fn default() -> Self {
        Self {
            item_kind: "minecraft:filled_map".to_string(),
            item_label: "Map".to_string(),
            max_buy_price: 2_500,
            sell_price: "9.9k".to_string(),
            max_listings_per_cycle: 20,
            warn_held_threshold: 5,
            mode: Mode::Normal,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Market {
    pub open_command: String,
    /// `{price}` is replaced with `trade.sell_price`
    pub list_command: String,
    pub hub_command: String,
    pub confirm_slot: u16,
    pub refresh_slot: u16,
    pub hub_menu_slot: u16,
}

impl Default for Market {
    fn default() -> Self {
        Self {
            open_command: "/ah map".to_string(),
            list_command: "/ah list {price}".to_string(),
            hub_command: "/hub".to_string(),
            confirm_slot: 15,
            refresh_slot: 49,
            hub_menu_slot: 5,
        }
    }
}

impl Market {
    pub fn list_command_for(&self, price: &str) -> String {
        self.list_command.replace("{price}", price)
    }
}

/// All delays and timeouts, in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub window_timeout_ms: u64,
    pub click_confirm_delay_ms: u64,
    pub refresh_wait_ms: u64,
    pub window_close_timeout_ms: u64,
    pub window_cleanup_ms: u64,
    pub pre_open_settle_ms: u64,
    pub open_settle_ms: u64,
    pub purchase_timeout_ms: u64,
    pub purchase_grace_ms: u64,
    pub post_purchase_ms: u64,
    pub reduced_cycle_delay_ms: u64,
    pub min_retry_delay_ms: u64,
    pub holding_backoff_ms: u64,
    pub unstack_delay_ms: u64,
    pub relocate_delay_ms: u64,
    pub held_select_delay_ms: u64,
    pub listing_settle_ms: u64,
    pub listing_cooldown_ms: u64,
    pub listing_retry_ms: u64,
    /// Listing retries double their pause up to this cap
    pub listing_retry_max_ms: u64,
    pub purchase_retry_ms: u64,
    pub afk_menu_timeout_ms: u64,
    pub afk_dwell_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            window_timeout_ms: 15_000,
            click_confirm_delay_ms: 400,
            refresh_wait_ms: 500,
            window_close_timeout_ms: 3_000,
            window_cleanup_ms: 300,
            pre_open_settle_ms: 500,
            open_settle_ms: 300,
            purchase_timeout_ms: 5_000,
            purchase_grace_ms: 2_000,
            post_purchase_ms: 500,
            reduced_cycle_delay_ms: 2_500,
            min_retry_delay_ms: 3_000,
            holding_backoff_ms: 5_000,
            unstack_delay_ms: 200,
            relocate_delay_ms: 200,
            held_select_delay_ms: 300,
            listing_settle_ms: 500,
            listing_cooldown_ms: 1_000,
            listing_retry_ms: 1_000,
            listing_retry_max_ms: 4_000,
            purchase_retry_ms: 500,
            afk_menu_timeout_ms: 3_000,
            afk_dwell_ms: 10_000,
        }
    }
}

/// Shorthand for turning a millisecond config value into a `Duration`.
pub fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Retry {
    pub purchase_attempts: u32,
    pub listing_attempts: u32,
    pub unstack_moves: u32,
    pub sell_all_iterations: u32,
}

impl Default for Retry {
    fn default() -> Self {
        Self {
            purchase_attempts: 5,
            listing_attempts: 3,
            unstack_moves: 64,
            sell_all_iterations: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Maintenance {
    /// Run sell-all every N successful buy cycles
    pub cycle_interval: u64,
    /// ...or when this much time has passed since the last run
    pub time_interval_ms: u64,
}

impl Default for Maintenance {
    fn default() -> Self {
        Self {
            cycle_interval: 10,
            time_interval_ms: 180_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Webhook {
    pub enabled: bool,
    pub url: String,
    pub display_name: String,
    pub events: WebhookEvents,
}

impl Default for Webhook {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            display_name: "Auction Flipper".to_string(),
            events: WebhookEvents::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebhookEvents {
    pub purchase: bool,
    pub listing: bool,
    pub sale: bool,
    pub afk: bool,
    pub error: bool,
    pub startup: bool,
}

impl Default for WebhookEvents {
    fn default() -> Self {
        Self {
            purchase: true,
            listing: true,
            sale: true,
            afk: true,
            error: true,
            startup: true,
        }
    }
}

impl Config {
    /// Load from a TOML file, falling back to defaults when the file is missing,
    /// then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let mut config: Config = if path.exists() {
            let contents = fs::read_to_string(path)?;
            toml::from_str(&contents)?
        } else {
            tracing::warn!("{} not found, using defaults", path.display());
            Config::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Override selected keys from the environment. `lookup` is injectable for tests.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), crate::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("BOT_USERNAME") {
            self.connection.username = v;
        }
        if let Some(v) = lookup("BRIDGE_URL") {
            self.connection.bridge_url = v;
        }
        if let Some(v) = lookup("MAX_BUY_PRICE") {
            self.trade.max_buy_price = v
                .parse()
                .map_err(|_| crate::Error::Config(format!("MAX_BUY_PRICE: invalid value '{}'", v)))?;
        }
        if let Some(v) = lookup("SELL_PRICE") {
            self.trade.sell_price = v;
        }
        if let Some(v) = lookup("MAX_LISTINGS_PER_CYCLE") {
            self.trade.max_listings_per_cycle = v.parse().map_err(|_| {
                crate::Error::Config(format!("MAX_LISTINGS_PER_CYCLE: invalid value '{}'", v))
            })?;
        }
        if let Some(v) = lookup("BOT_MODE") {
            self.trade.mode = v.parse().map_err(crate::Error::Config)?;
        }
        if let Some(v) = lookup("WEBHOOK_URL") {
            self.webhook.url = v;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), crate::Error> {
        if self.trade.max_listings_per_cycle == 0 {
            return Err(crate::Error::Config(
                "trade.max_listings_per_cycle must be at least 1".into(),
            ));
        }
        if self.maintenance.cycle_interval == 0 {
            return Err(crate::Error::Config(
                "maintenance.cycle_interval must be at least 1".into(),
            ));
        }
        if self.trade.sell_price.trim().is_empty() {
            return Err(crate::Error::Config("trade.sell_price is empty".into()));
        }
        Ok(())
    }
}
