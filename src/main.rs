// This is the entry point of the chat filter bot.
//
// **Architecture Overview:**
// - `core/` = The chat filter itself (platform-agnostic)
// - `infra/` = Config file and language bundle loading
// - `discord/` = Discord-specific adapters (message hook, commands)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize the filter (dependency injection)
// 3. Set up the Discord framework
// 4. Register commands and event handlers

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with several mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::discord::moderation::chat_filter_handler::handle_message_for_filter;
use crate::discord::{Data, Error};
use crate::infra::moderation::JsonFilterConfigStore;
use anyhow::Context as _;
use poise::serenity_prelude as serenity;

const DEFAULT_CONFIG_PATH: &str = "data/filter_config.json";
const DEFAULT_LANGUAGES_DIR: &str = "resources/languages";

/// Event handler for non-command Discord events.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    if let serenity::FullEvent::Message { new_message } = event {
        if let Err(e) = handle_message_for_filter(ctx, new_message, data).await {
            tracing::error!("Error filtering message: {}", e);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let token = std::env::var("DISCORD_TOKEN").context(
        "Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.",
    )?;
    let config_path =
        std::env::var("FILTER_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let languages_dir = std::env::var("FILTER_LANGUAGES_DIR")
        .unwrap_or_else(|_| DEFAULT_LANGUAGES_DIR.to_string());

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================

    let data = Data::load(JsonFilterConfigStore::new(&config_path), &languages_dir)
        .with_context(|| format!("Failed to load chat filter configuration from {}", config_path))?;

    let snapshot = data.snapshot();
    tracing::info!(
        config = %config_path,
        language = snapshot.catalog.language(),
        terms = snapshot.rules.blocked_terms().len(),
        "Chat filter configured"
    );

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | serenity::GatewayIntents::GUILDS;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![discord::moderation::commands::chatfilter()],
            // Every guild message goes through the filter here
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tracing::info!("Commands registered, chat filter is live");
                Ok(data)
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .context("Error creating client")?;

    client.start().await.context("Error running bot")?;
    Ok(())
}
