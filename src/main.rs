mod bot;
mod config;
mod conversation;
mod delivery;
mod gemini;
mod health;
mod models;
mod prompts;
mod store;
mod telegram;

use std::sync::Arc;
use teloxide::prelude::Requester;
use teloxide::Bot;
use tracing_subscriber::{fmt, EnvFilter};

use crate::bot::ContentBot;
use crate::config::Config;
use crate::gemini::GeminiClient;
use crate::telegram::TelegramDelivery;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    let dotenv_loaded = dotenv::dotenv().is_ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    if !dotenv_loaded {
        tracing::info!("No .env file found, relying on environment variables.");
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };
    tracing::debug!(?config, "Loaded configuration");

    let gemini = GeminiClient::new(
        config.gemini_api_key.clone(),
        &config.gemini_base_url,
        config.gemini_model.clone(),
    )?;

    let tg = Bot::new(&config.telegram_token);
    let me = tg.get_me().await?;
    tracing::info!("Authorized on account {}", me.username());

    let app = Arc::new(ContentBot::new(
        Arc::new(TelegramDelivery::new(tg.clone())),
        Arc::new(gemini),
    ));

    let port = config.port;
    let health_task = tokio::spawn(async move {
        if let Err(e) = health::serve(port).await {
            tracing::error!("Health check server stopped: {:#}", e);
        }
    });

    telegram::run(tg, app).await;
    health_task.abort();
    tracing::info!("Shutting down");
    Ok(())
}
