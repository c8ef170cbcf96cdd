use std::sync::Arc;

use flipbot_rs::api::WebhookNotifier;
use flipbot_rs::bot;
use flipbot_rs::config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let cfg = Config::load(&path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.general.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(
        bridge = %cfg.connection.bridge_url,
        mode = %cfg.trade.mode,
        max_buy = cfg.trade.max_buy_price,
        sell_price = %cfg.trade.sell_price,
        "config loaded from {}",
        path
    );

    let notifier = Arc::new(WebhookNotifier::new(cfg.webhook.clone()));
    bot::run(Arc::new(cfg), notifier).await
}
