//! Discord bot with reaction-driven pagination
//!
//! Runs prefix commands against a Discord gateway connection. Long output is
//! sent through `discord-pager`, which turns one message into a page viewer
//! the invoking user drives with reactions.

mod bot;
mod checks;
mod commands;
mod config;
mod embed;
mod error_cache;
mod errors;
mod handlers;
mod health;
mod store;
mod surface;
mod text;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;
use discord_pager::Pager;
use serenity::model::gateway::GatewayIntents;
use serenity::prelude::*;
use tokio::sync::RwLock;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::BotState;
use crate::config::{Config, OperationalStatus};
use crate::error_cache::ErrorCache;
use crate::handlers::Handler;
use crate::health::AppState;
use crate::store::JsonStore;
use crate::surface::{DiscordSurface, ReactionRouter};

/// Discord pager bot CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/pager-bot.toml")]
    config: String,

    /// Discord bot token (overrides config file)
    #[arg(long, env = "DISCORD_BOT_TOKEN")]
    bot_token: Option<String>,

    /// PRODUCTION or TESTING (overrides config file)
    #[arg(long, env = "BOT_STATUS")]
    status: Option<OperationalStatus>,

    /// Health check server port
    #[arg(long, env = "HEALTH_CHECK_PORT", default_value = "3001")]
    health_port: u16,
}

/// Log to stdout and to an hourly rotated file under `log_dir`.
fn init_tracing(log_dir: &str) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::hourly(log_dir, "pager-bot.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pager_bot=debug,discord_pager=debug,serenity=info,info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration; the log directory comes from it
    let from_file = Path::new(&args.config).exists();
    let mut config = if from_file {
        Config::from_file(&args.config)?
    } else {
        Config::from_env()?
    };
    if let Some(bot_token) = args.bot_token {
        config.discord.bot_token = bot_token;
    }
    if let Some(status) = args.status {
        config.discord.status = status;
    }

    let _log_guard = init_tracing(&config.storage.log_dir);

    info!("Starting pager bot");
    if from_file {
        info!("Loaded config from file: {}", args.config);
    } else {
        info!("Config file not found, loaded from environment");
    }
    info!(
        "Status: {}, prefixes: {}",
        config.discord.status,
        config.discord.prefixes.join(" ")
    );

    let blacklist = Arc::new(JsonStore::open(&config.storage.blacklist_path).await?);
    info!(
        "Loaded {} blacklisted users from {}",
        blacklist.len().await,
        blacklist.path().display()
    );

    let errors = Arc::new(RwLock::new(
        ErrorCache::new(config.storage.error_cache_limit).context("Invalid error cache limit")?,
    ));

    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::GUILD_MESSAGE_REACTIONS
        | GatewayIntents::DIRECT_MESSAGE_REACTIONS
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILDS;

    let mut client = Client::builder(&config.discord.bot_token, intents)
        .event_handler(Handler)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Discord client: {}", e))?;

    let router = ReactionRouter::new();
    let surface = DiscordSurface::new(client.http.clone(), client.cache.clone(), router.clone());
    let pager = Pager::new(Arc::new(surface.clone()), config.pagination.clone());

    let sessions = pager.clone();
    let health_state = AppState::new(
        config.discord.status,
        errors.clone(),
        Arc::new(move || sessions.active_sessions()),
    );

    let health_port = args.health_port;
    let state = Arc::new(BotState {
        config,
        surface,
        pager,
        blacklist,
        errors,
        health: health_state.clone(),
    });

    {
        let mut data = client.data.write().await;
        data.insert::<BotState>(state);
    }

    // Start health check server
    tokio::spawn(async move {
        if let Err(e) = health::start_health_server(health_state, health_port).await {
            error!("Health server error: {}", e);
        }
    });

    // Graceful shutdown: end every session, then close all shards on
    // SIGTERM or Ctrl+C.
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = sigterm.recv() => {}
                    }
                }
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {}", e);
                    tokio::signal::ctrl_c().await.ok();
                }
            }
        }
        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await.ok();
        }
        info!(
            "Shutdown signal received, ending {} pagination routes and stopping Discord client...",
            router.len()
        );
        router.close();
        shard_manager.shutdown_all().await;
    });

    info!("Starting Discord gateway connection...");

    // Start the Discord client (blocks until all shards are stopped)
    client
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("Discord client error: {}", e))?;

    info!("Pager bot stopped");
    Ok(())
}
