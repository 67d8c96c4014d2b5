//! Serenity event handler implementation

use std::sync::Arc;
use std::time::Duration;

use discord_pager::{ArtifactRef, PagerError, ReactionEvent};
use serenity::async_trait;
use serenity::model::channel::{Message, Reaction, ReactionType};
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use tracing::{debug, error, info};

use crate::bot::{
    bot_state, channel_label, handle_command_error, paginate_wrapped, send, watch_session, BotState,
    Reply,
};
use crate::checks::in_home_guild;
use crate::commands::{execute, parse_invocation, Command, CommandContext, Invocation, Response};
use crate::errors::BotError;
use crate::surface::react_all;

pub struct Handler;

/// Drop emoji variation selectors so "▶️" and "▶" compare equal.
fn normalize_symbol(symbol: &str) -> String {
    symbol.chars().filter(|c| *c != '\u{FE0F}').collect()
}

/// Turn a gateway reaction into a pager event. Custom emoji never match a
/// navigation symbol and are skipped.
fn reaction_event(reaction: &Reaction) -> Option<ReactionEvent> {
    let ReactionType::Unicode(symbol) = &reaction.emoji else {
        return None;
    };
    Some(ReactionEvent {
        emitter_id: reaction.user_id?.get(),
        artifact: ArtifactRef {
            channel_id: reaction.channel_id.get(),
            message_id: reaction.message_id.get(),
        },
        symbol: normalize_symbol(symbol),
    })
}

fn invocation_line(
    author: &str,
    author_id: u64,
    channel: Option<&str>,
    channel_id: u64,
    content: &str,
) -> String {
    match channel {
        Some(name) => format!(
            "Command invoked by {} (ID: {}) in #{} (ID: {})\n{}",
            author, author_id, name, channel_id, content
        ),
        None => format!(
            "Command invoked by {} (ID: {}) in DMs (ID: {})\n{}",
            author, author_id, channel_id, content
        ),
    }
}

async fn run_command(
    ctx: &Context,
    state: &Arc<BotState>,
    msg: &Message,
    inv: &Invocation,
    cmd: Command,
) -> Result<(), BotError> {
    let command_ctx = CommandContext {
        prefix: &inv.prefix,
        author_id: msg.author.id.get(),
        pagination: &state.config.pagination,
        blacklist: &state.blacklist,
        errors: &state.errors,
        status: state.config.discord.status,
        active_sessions: state.pager.active_sessions(),
    };

    match execute(cmd, &command_ctx).await? {
        Response::Text(text) => {
            send(ctx, state, msg, Reply::Text(&text)).await?;
        }
        Response::Embed(spec) => {
            send(ctx, state, msg, Reply::Embed(&spec)).await?;
        }
        Response::Paginate { content, config } => {
            let owner_id = msg.author.id.get();
            let paginated =
                paginate_wrapped(&state.pager, config, msg.channel_id.get(), owner_id, &content).await?;
            watch_session(state.clone(), paginated, owner_id);
        }
        Response::React(symbol) => {
            let artifact = ArtifactRef {
                channel_id: msg.channel_id.get(),
                message_id: msg.id.get(),
            };
            react_all(&state.surface, &artifact, &[symbol], Duration::ZERO)
                .await
                .map_err(PagerError::from)?;
        }
    }
    Ok(())
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(
            "Discord bot connected as {}#{:04}",
            ready.user.name,
            ready.user.discriminator.map_or(0, |d| d.get())
        );
        if let Some(state) = bot_state(&ctx).await {
            state.health.set_bot_username(ready.user.name.clone()).await;
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        // Skip bot messages, our own included
        if msg.author.bot {
            return;
        }

        let Some(state) = bot_state(&ctx).await else {
            error!("BotState not found in context data");
            return;
        };

        if state.blacklist.contains(&msg.author.id.to_string()).await {
            return;
        }

        let Some(inv) = parse_invocation(&state.config.discord.prefixes, &msg.content) else {
            return;
        };

        let cmd = match Command::parse(&inv) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => return,
            Err(e) => {
                handle_command_error(&ctx, &state, &msg, &inv.name, e).await;
                return;
            }
        };

        // Failed checks are silent
        let guild_id = msg.guild_id.map(|g| g.get());
        if cmd.home_guild_only() && !in_home_guild(state.config.discord.home_guild_id, guild_id) {
            debug!("{} used outside the home guild by {}", cmd.name(), msg.author.id);
            return;
        }
        let member_roles: Vec<u64> = msg
            .member
            .as_ref()
            .map(|m| m.roles.iter().map(|r| r.get()).collect())
            .unwrap_or_default();
        if !cmd.level().allows(&state.config.roles, &member_roles) {
            debug!("{} denied to {} ({:?} required)", cmd.name(), msg.author.id, cmd.level());
            return;
        }

        let channel = match guild_id {
            Some(_) => Some(channel_label(&ctx, &msg).await),
            None => None,
        };
        info!(
            "{}",
            invocation_line(
                &msg.author.tag(),
                msg.author.id.get(),
                channel.as_deref(),
                msg.channel_id.get(),
                &msg.content
            )
        );

        let name = cmd.name();
        if let Err(e) = run_command(&ctx, &state, &msg, &inv, cmd).await {
            handle_command_error(&ctx, &state, &msg, name, e).await;
        }
    }

    async fn reaction_add(&self, ctx: Context, add_reaction: Reaction) {
        let Some(event) = reaction_event(&add_reaction) else {
            return;
        };

        let Some(state) = bot_state(&ctx).await else {
            return;
        };

        let delivered = state.surface.router().dispatch(&event);
        if delivered > 0 {
            debug!(
                "Routed {} from {} on message {} to {} session(s)",
                event.symbol, event.emitter_id, event.artifact.message_id, delivered
            );
        }
    }
}
