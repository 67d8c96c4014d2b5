//! Prefix command parsing and execution.
//!
//! Execution never talks to Discord directly: each command resolves to a
//! [`Response`] that the message handler carries out.

#[path = "commands_tests.rs"]
mod commands_tests;

use chrono::Utc;
use discord_pager::PaginatorConfig;
use serde_json::json;
use tokio::sync::RwLock;

use crate::checks::Level;
use crate::config::OperationalStatus;
use crate::embed::{EmbedSpec, EmbedTime};
use crate::error_cache::{ErrorCache, ErrorRecord, Origin};
use crate::errors::BotError;
use crate::store::JsonStore;
use crate::text::{dedent, plural};

pub const CHECK: &str = "✅";

/// A message split into prefix, command name and the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub prefix: String,
    /// Lowercased; command names are case-insensitive.
    pub name: String,
    pub args: String,
}

/// Split `content` if it starts with one of `prefixes`, tried in order.
pub fn parse_invocation(prefixes: &[String], content: &str) -> Option<Invocation> {
    let prefix = prefixes.iter().find(|p| !p.is_empty() && content.starts_with(p.as_str()))?;
    let rest = &content[prefix.len()..];
    let mut parts = rest.splitn(2, char::is_whitespace);
    let name = parts.next().filter(|n| !n.is_empty())?.to_lowercase();
    let args = parts.next().unwrap_or("").trim().to_string();

    Some(Invocation {
        prefix: prefix.clone(),
        name,
        args,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlacklistAction {
    Add { user_id: u64, reason: Option<String> },
    Remove { user_id: u64 },
    List,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Ping,
    Paginate(String),
    Errors(Option<String>),
    /// Summaries of cached errors, optionally only those from one origin.
    ErrorList(Option<String>),
    Blacklist(BlacklistAction),
    Status,
}

impl Command {
    /// `Ok(None)` for names that are not commands.
    pub fn parse(inv: &Invocation) -> Result<Option<Command>, BotError> {
        let cmd = match inv.name.as_str() {
            "help" => Command::Help,
            "ping" => Command::Ping,
            "paginate" | "pages" => {
                if inv.args.is_empty() {
                    return Err(usage(inv, "paginate <text>"));
                }
                Command::Paginate(inv.args.clone())
            }
            "errors" | "error" => parse_errors(inv),
            "blacklist" | "bl" => Command::Blacklist(parse_blacklist(inv)?),
            "status" => Command::Status,
            _ => return Ok(None),
        };
        Ok(Some(cmd))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Help => "help",
            Command::Ping => "ping",
            Command::Paginate(_) => "paginate",
            Command::Errors(_) | Command::ErrorList(_) => "errors",
            Command::Blacklist(_) => "blacklist",
            Command::Status => "status",
        }
    }

    pub fn level(&self) -> Level {
        match self {
            Command::Help | Command::Ping | Command::Paginate(_) => Level::Everyone,
            Command::Errors(_) | Command::ErrorList(_) => Level::Engineer,
            Command::Blacklist(_) => Level::Moderator,
            Command::Status => Level::Admin,
        }
    }

    /// Whether the command only makes sense in the home guild.
    pub fn home_guild_only(&self) -> bool {
        matches!(
            self,
            Command::Errors(_) | Command::ErrorList(_) | Command::Blacklist(_)
        )
    }
}

fn usage(inv: &Invocation, signature: &str) -> BotError {
    BotError::Usage(format!("Usage: `{}{}`", inv.prefix, signature))
}

fn parse_user_id(inv: &Invocation, raw: Option<&str>, signature: &str) -> Result<u64, BotError> {
    raw.map(|s| s.trim_start_matches("<@").trim_start_matches('!').trim_end_matches('>'))
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| usage(inv, signature))
}

fn parse_errors(inv: &Invocation) -> Command {
    let mut parts = inv.args.splitn(2, char::is_whitespace);
    match parts.next() {
        Some(word) if word.eq_ignore_ascii_case("list") => Command::ErrorList(
            parts.next().map(str::trim).filter(|o| !o.is_empty()).map(String::from),
        ),
        Some(id) if !id.is_empty() => Command::Errors(Some(id.to_string())),
        _ => Command::Errors(None),
    }
}

fn parse_blacklist(inv: &Invocation) -> Result<BlacklistAction, BotError> {
    let mut parts = inv.args.splitn(3, char::is_whitespace);
    match parts.next().map(str::to_lowercase).as_deref() {
        Some("add") => {
            let user_id = parse_user_id(inv, parts.next(), "blacklist add <user> [reason]")?;
            let reason = parts.next().map(str::trim).filter(|r| !r.is_empty()).map(String::from);
            Ok(BlacklistAction::Add { user_id, reason })
        }
        Some("remove") | Some("rm") => {
            let user_id = parse_user_id(inv, parts.next(), "blacklist remove <user>")?;
            Ok(BlacklistAction::Remove { user_id })
        }
        Some("list") | Some("") | None => Ok(BlacklistAction::List),
        Some(_) => Err(usage(inv, "blacklist add|remove|list")),
    }
}

/// What the handler should do once a command has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Text(String),
    /// Page `content` through the pager with `config`.
    Paginate { content: String, config: PaginatorConfig },
    Embed(EmbedSpec),
    /// React to the invoking message.
    React(&'static str),
}

/// Everything a command may read or change.
pub struct CommandContext<'a> {
    pub prefix: &'a str,
    pub author_id: u64,
    pub pagination: &'a PaginatorConfig,
    pub blacklist: &'a JsonStore,
    pub errors: &'a RwLock<ErrorCache>,
    pub status: OperationalStatus,
    pub active_sessions: usize,
}

pub async fn execute(cmd: Command, ctx: &CommandContext<'_>) -> Result<Response, BotError> {
    match cmd {
        Command::Help => Ok(Response::Text(help_text(ctx.prefix))),
        Command::Ping => Ok(Response::Text("Pong!".to_string())),
        Command::Paginate(content) => Ok(Response::Paginate {
            content,
            config: ctx.pagination.clone(),
        }),
        Command::Errors(id) => show_error(ctx, id.as_deref()).await,
        Command::ErrorList(origin) => list_errors(ctx, origin.as_deref()).await,
        Command::Blacklist(action) => blacklist(ctx, action).await,
        Command::Status => Ok(Response::Embed(status(ctx).await)),
    }
}

fn help_text(prefix: &str) -> String {
    dedent(&format!(
        "Commands:
        `{p}help` shows this message
        `{p}ping` checks the bot is alive
        `{p}paginate <text>` pages long text with reactions
        `{p}errors [id]` shows a recorded error (engineers)
        `{p}errors list [command]` lists recorded errors (engineers)
        `{p}blacklist add|remove|list` manages ignored users (moderators)
        `{p}status` shows bot state (admins)",
        p = prefix
    ))
}

async fn show_error(ctx: &CommandContext<'_>, id: Option<&str>) -> Result<Response, BotError> {
    let errors = ctx.errors.read().await;
    let record = match id {
        Some(id) => errors
            .get(id)
            .ok_or_else(|| BotError::User(format!("No error with id `{}`.", id)))?,
        None => errors
            .latest()
            .ok_or_else(|| BotError::User("No errors recorded.".to_string()))?,
    };

    Ok(Response::Paginate {
        content: record.formatted(),
        config: ctx.pagination.clone().with_prefix("```py").with_max_pages(100),
    })
}

fn origin_name(origin: &Origin) -> &str {
    match origin {
        Origin::Command(name) | Origin::Event(name) => name,
    }
}

fn summary(record: &ErrorRecord) -> String {
    let (kind, name) = match &record.origin {
        Origin::Command(name) => ("command", name),
        Origin::Event(name) => ("event", name),
    };
    format!(
        "{} {} {} {}\n",
        record.id,
        record.time.format("%Y-%m-%d %H:%M:%S"),
        kind,
        name
    )
}

async fn list_errors(ctx: &CommandContext<'_>, origin: Option<&str>) -> Result<Response, BotError> {
    let errors = ctx.errors.read().await;
    if errors.is_empty() {
        return Err(BotError::User("No errors recorded.".to_string()));
    }

    let records: Vec<&ErrorRecord> = match origin {
        Some(wanted) => errors.filter(|r| origin_name(&r.origin).eq_ignore_ascii_case(wanted)),
        None => errors.all().iter().collect(),
    };
    if records.is_empty() {
        return Err(BotError::User(format!(
            "No errors recorded for `{}`.",
            origin.unwrap_or_default()
        )));
    }

    let mut content = format!("{} recorded\n", plural(records.len() as i64, "error"));
    for record in records {
        content.push_str(&summary(record));
    }
    Ok(Response::Paginate {
        content,
        config: ctx.pagination.clone(),
    })
}

async fn status(ctx: &CommandContext<'_>) -> EmbedSpec {
    let errors = ctx.errors.read().await;
    let cached = match errors.limit() {
        Some(limit) => format!("{} / {}", errors.len(), limit),
        None => errors.len().to_string(),
    };
    EmbedSpec::new()
        .title("Status")
        .timestamp(EmbedTime::Now)
        .field("Mode", ctx.status.to_string(), true)
        .field("Pagination sessions", ctx.active_sessions.to_string(), true)
        .field("Cached errors", cached, true)
        .field("Blacklisted users", ctx.blacklist.len().await.to_string(), true)
}

async fn blacklist(ctx: &CommandContext<'_>, action: BlacklistAction) -> Result<Response, BotError> {
    match action {
        BlacklistAction::Add { user_id, reason } => {
            if user_id == ctx.author_id {
                return Err(BotError::User("You cannot blacklist yourself.".to_string()));
            }
            if ctx.blacklist.get(&user_id.to_string()).await.is_some() {
                return Err(BotError::User(format!("User {} is already blacklisted.", user_id)));
            }
            ctx.blacklist
                .put(
                    user_id.to_string(),
                    json!({
                        "reason": reason,
                        "added_by": ctx.author_id,
                        "added_at": Utc::now().to_rfc3339(),
                    }),
                )
                .await?;
            Ok(Response::React(CHECK))
        }
        BlacklistAction::Remove { user_id } => match ctx.blacklist.remove(&user_id.to_string()).await? {
            Some(_) => Ok(Response::React(CHECK)),
            None => Err(BotError::User(format!("User {} is not blacklisted.", user_id))),
        },
        BlacklistAction::List => {
            let all = ctx.blacklist.all().await;
            let mut content = format!("{} blacklisted\n", plural(all.len() as i64, "user"));
            for (user_id, entry) in &all {
                let reason = entry.get("reason").and_then(|r| r.as_str()).unwrap_or("no reason");
                content.push_str(&format!("{}: {}\n", user_id, reason));
            }
            Ok(Response::Paginate {
                content,
                config: ctx.pagination.clone(),
            })
        }
    }
}
