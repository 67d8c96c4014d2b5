//! Shared bot state and command failure reporting.

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use discord_pager::{ArtifactRef, Pager, PagerError, Paginated, PaginatorConfig, Surface};
use serenity::builder::{CreateMessage, ExecuteWebhook};
use serenity::http::Http;
use serenity::model::channel::Message;
use serenity::model::webhook::Webhook;
use serenity::prelude::*;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::config::{Config, OperationalStatus};
use crate::embed::{embed, EmbedSpec, EmbedTime, RED};
use crate::error_cache::{ErrorCache, ErrorRecord, Origin};
use crate::errors::{log_error, BotError, Disposition};
use crate::health::AppState;
use crate::store::JsonStore;
use crate::surface::{cleanup, DiscordSurface, SendPermissions};
use crate::text::wrap_long_lines;

/// How long usage hints stay in the channel.
const BRIEF_REPLY_TTL: Duration = Duration::from_secs(60);

/// Room left for the traceback in a report embed description.
const REPORT_EXCERPT_LEN: usize = 1800;

const EMBED_TITLE_LIMIT: usize = 256;

/// Everything the event handler needs, stored in the serenity `TypeMap`.
pub struct BotState {
    pub config: Config,
    pub surface: DiscordSurface,
    pub pager: Pager<DiscordSurface>,
    pub blacklist: Arc<JsonStore>,
    pub errors: Arc<RwLock<ErrorCache>>,
    pub health: AppState,
}

impl TypeMapKey for BotState {
    type Value = Arc<BotState>;
}

/// Fetch the [`BotState`] from the context data.
pub async fn bot_state(ctx: &Context) -> Option<Arc<BotState>> {
    let data = ctx.data.read().await;
    data.get::<BotState>().cloned()
}

/// Render an error and its sources, outermost first.
pub fn error_chain(err: &dyn StdError) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    if source.is_some() {
        out.push_str("\n\nCaused by:");
    }
    while let Some(cause) = source {
        out.push_str(&format!("\n    {}", cause));
        source = cause.source();
    }
    out
}

/// Page `content` with `config`, first wrapping any line that would not
/// fit on a page by itself.
pub async fn paginate_wrapped<S: Surface>(
    pager: &Pager<S>,
    config: PaginatorConfig,
    channel_id: u64,
    owner_id: u64,
    content: &str,
) -> Result<Paginated, PagerError> {
    let content = wrap_long_lines(content, config.page_size()?);
    pager
        .with_config(config)
        .paginate(channel_id, owner_id, &content)
        .await
}

/// A reply to an invocation.
#[derive(Debug, Clone, Copy)]
pub enum Reply<'a> {
    Text(&'a str),
    Embed(&'a EmbedSpec),
}

/// Where a reply can go given the bot's rights in the invoking channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Channel,
    DirectMessage,
}

pub fn delivery(permissions: SendPermissions, reply: Reply<'_>) -> Result<Delivery, BotError> {
    if matches!(reply, Reply::Embed(_)) && !permissions.embed_links {
        return Err(BotError::CannotEmbed);
    }
    if permissions.send_messages {
        Ok(Delivery::Channel)
    } else {
        Ok(Delivery::DirectMessage)
    }
}

/// Send `reply` to the channel `msg` came from. Without the right to post
/// there, the author gets it by DM instead, after a note saying why.
pub async fn send(
    ctx: &Context,
    state: &BotState,
    msg: &Message,
    reply: Reply<'_>,
) -> Result<Message, BotError> {
    let permissions = match state.surface.send_permissions(msg.channel_id.get()).await {
        Ok(permissions) => permissions,
        Err(e) => {
            debug!("Could not read permissions in channel {}: {}", msg.channel_id, e);
            SendPermissions::all()
        }
    };

    let builder = match reply {
        Reply::Text(text) => CreateMessage::new().content(text),
        Reply::Embed(spec) => CreateMessage::new().embed(embed(spec)),
    };

    match delivery(permissions, reply)? {
        Delivery::Channel => Ok(msg.channel_id.send_message(&ctx.http, builder).await?),
        Delivery::DirectMessage => {
            let note = format!(
                "I do not have permission to send messages in <#{}>.",
                msg.channel_id.get()
            );
            msg.author
                .direct_message(ctx, CreateMessage::new().content(note))
                .await?;
            Ok(msg.author.direct_message(ctx, builder).await?)
        }
    }
}

/// Where a failed command was invoked, for the report footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoker {
    pub guild: Option<String>,
    pub channel: String,
    pub author: String,
    pub avatar_url: Option<String>,
}

fn report_description(record: &ErrorRecord) -> String {
    format!(
        "```py\n{}```\n\nCheck error `{}` for full error",
        record.formatted_to(REPORT_EXCERPT_LEN),
        record.id
    )
}

/// The embed posted to the error webhook for `record`.
pub fn report_embed(record: &ErrorRecord, content: &str, invoker: &Invoker) -> EmbedSpec {
    let title: String = content.chars().take(EMBED_TITLE_LIMIT).collect();
    let mut spec = EmbedSpec::new()
        .title(title)
        .colour(RED)
        .timestamp(EmbedTime::At(record.time))
        .description(report_description(record))
        .author(invoker.author.clone())
        .footer(format!(
            "G: {} | C: {} | U: {}",
            invoker.guild.as_deref().unwrap_or("DM"),
            invoker.channel,
            invoker.author
        ));
    if let Some(url) = &invoker.avatar_url {
        spec = spec.author_icon_url(url.clone());
    }
    spec
}

/// The embed posted to the error webhook for a failure outside a command.
pub fn event_report_embed(record: &ErrorRecord) -> EmbedSpec {
    let name = match &record.origin {
        Origin::Command(name) | Origin::Event(name) => name,
    };
    EmbedSpec::new()
        .title(name.chars().take(EMBED_TITLE_LIMIT).collect::<String>())
        .colour(RED)
        .timestamp(EmbedTime::At(record.time))
        .description(report_description(record))
}

/// Name of the channel `msg` was sent in, falling back to its id.
pub async fn channel_label(ctx: &Context, msg: &Message) -> String {
    match msg.channel_id.name(ctx).await {
        Ok(name) => name,
        Err(_) => msg.channel_id.get().to_string(),
    }
}

async fn invoker(ctx: &Context, msg: &Message) -> Invoker {
    let guild = msg.guild(&ctx.cache).map(|g| g.name.clone());
    Invoker {
        guild,
        channel: channel_label(ctx, msg).await,
        author: msg.author.tag(),
        avatar_url: msg.author.avatar_url(),
    }
}

/// Deal with a failed command the way its [`Disposition`] asks.
pub async fn handle_command_error(
    ctx: &Context,
    state: &Arc<BotState>,
    msg: &Message,
    command: &str,
    err: BotError,
) {
    match err.disposition() {
        Disposition::Reply(text) => {
            if let Err(e) = send(ctx, state, msg, Reply::Text(&text)).await {
                warn!("Failed to reply with command error: {}", e);
            }
        }
        Disposition::ReplyBriefly(text) => match send(ctx, state, msg, Reply::Text(&text)).await {
            Ok(reply) => cleanup(
                ctx.http.clone(),
                vec![ArtifactRef {
                    channel_id: reply.channel_id.get(),
                    message_id: reply.id.get(),
                }],
                BRIEF_REPLY_TTL,
            ),
            Err(e) => warn!("Failed to reply with usage: {}", e),
        },
        Disposition::Ignore => {
            debug!("Ignoring error in command {}: {}", command, err);
        }
        Disposition::Report => {
            let record = ErrorRecord::command(command, error_chain(&err));
            let spec = report_embed(&record, &msg.content, &invoker(ctx, msg).await);
            report(state, record, spec, msg.channel_id.get(), msg.author.id.get()).await;
        }
    }
}

/// Where an error report is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportDestination<'a> {
    Webhook(&'a str),
    /// Paged into the channel the failure happened in.
    Channel,
}

pub fn report_destination(status: OperationalStatus, webhook_url: Option<&str>) -> ReportDestination<'_> {
    match (status, webhook_url) {
        (OperationalStatus::Production, Some(url)) => ReportDestination::Webhook(url),
        _ => ReportDestination::Channel,
    }
}

/// Record, log and deliver an error report. Without a webhook the formatted
/// error is paged to `owner_id` in `channel_id`.
async fn report(state: &Arc<BotState>, record: ErrorRecord, spec: EmbedSpec, channel_id: u64, owner_id: u64) {
    error!("{} (error id {})", record.formatted(), record.id);
    state.errors.write().await.push(record.clone());

    let status = state.config.discord.status;
    match report_destination(status, state.config.discord.error_webhook_url.as_deref()) {
        ReportDestination::Webhook(url) => {
            if let Err(e) = post_report(state.surface.http(), url, &spec).await {
                log_error("Failed to post error report", &e);
            }
        }
        ReportDestination::Channel => {
            if status == OperationalStatus::Production {
                warn!("No error webhook configured, reporting error {} in channel", record.id);
            }
            let config = state
                .config
                .pagination
                .clone()
                .with_prefix("```py")
                .with_max_pages(100);
            match paginate_wrapped(&state.pager, config, channel_id, owner_id, &record.formatted()).await {
                Ok(paginated) => watch_session(state.clone(), paginated, owner_id),
                Err(e) => warn!("Failed to page error {} into channel: {}", record.id, e),
            }
        }
    }
}

async fn post_report(http: &Http, url: &str, spec: &EmbedSpec) -> serenity::Result<()> {
    let webhook = Webhook::from_url(http, url).await?;
    webhook
        .execute(http, false, ExecuteWebhook::new().embed(embed(spec)))
        .await?;
    Ok(())
}

/// Follow a session to its end. A session task that panicked is reported
/// as an `event` error, in the session's channel when there is no webhook.
pub fn watch_session(state: Arc<BotState>, paginated: Paginated, owner_id: u64) {
    let Paginated::Interactive { artifact, handle } = paginated else {
        return;
    };
    tokio::spawn(async move {
        match handle.await {
            Ok(summary) => info!(
                "Pagination on message {} ended ({:?}): {} transitions, {} renders, {} dropped",
                artifact.message_id,
                summary.end,
                summary.transitions,
                summary.renders,
                summary.dropped_renders
            ),
            Err(e) => {
                let record = ErrorRecord::event("pagination", e.to_string());
                let spec = event_report_embed(&record);
                report(&state, record, spec, artifact.channel_id, owner_id).await;
            }
        }
    });
}
