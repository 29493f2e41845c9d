use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use maxbot::{bot, handlers, Bot, Client, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,maxbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Listen address: {}", config.server.listen_addr);
    info!("  Webhook path: {}", config.server.webhook_path);

    let client = Client::new(config.max.bot_token.as_str())?;

    // A bad token should be visible at startup, but the webhook still serves.
    match client.get_me().await {
        Ok(me) => info!(
            "Authorized as {} (id {})",
            me.get("name").and_then(|v| v.as_str()).unwrap_or("?"),
            me.get("user_id").map(|v| v.to_string()).unwrap_or_default()
        ),
        Err(e) => warn!("Could not fetch bot info: {:#}", e),
    }

    let mut bot = Bot::new(client);
    handlers::register_defaults(&mut bot);

    info!("Bot is starting...");
    bot::run(Arc::new(bot), &config.server).await?;

    Ok(())
}
