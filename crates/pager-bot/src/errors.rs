//! Discord-specific error handling for the bot.
//!
//! Converts serenity errors into the transport-neutral [`SurfaceError`] the
//! pager understands, and provides a `log_error` helper that logs at the
//! level matching the error's class.

use discord_pager::{PagerError, SurfaceError, SurfaceErrorKind};
use serenity::http::HttpError;
use tracing::{debug, error, warn};

use crate::store::StoreError;

/// Outcome of a command that did not complete.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    /// Shown to the invoking user as-is.
    #[error("{0}")]
    User(String),

    /// Wrong arguments; the text shows the expected form.
    #[error("{0}")]
    Usage(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I do not have permission to send embeds in this channel.")]
    CannotEmbed,

    #[error(transparent)]
    Pager(#[from] PagerError),

    #[error("Discord error: {0}")]
    Discord(#[from] serenity::Error),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// What the command dispatcher should do with a [`BotError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Send this text back to the channel.
    Reply(String),
    /// Send this text back and delete it after a while.
    ReplyBriefly(String),
    /// Drop silently.
    Ignore,
    /// Record, log and report through the error channel.
    Report,
}

impl BotError {
    pub fn disposition(&self) -> Disposition {
        match self {
            BotError::User(msg) => Disposition::Reply(msg.clone()),
            BotError::Usage(msg) => Disposition::ReplyBriefly(msg.clone()),
            BotError::InvalidArgument(_) | BotError::CannotEmbed => {
                Disposition::Reply(self.to_string())
            }
            BotError::Pager(PagerError::PermissionDenied(msg)) => Disposition::Reply(msg.clone()),
            BotError::Pager(PagerError::InvalidArgument(msg)) => Disposition::Reply(msg.clone()),
            BotError::Pager(PagerError::Transport(e)) if e.is_permission_denied() => {
                Disposition::Ignore
            }
            BotError::Pager(PagerError::Transport(_)) => Disposition::Report,
            BotError::Discord(e) if classify(e).is_permission_denied() => Disposition::Ignore,
            BotError::Discord(_) | BotError::Store(_) => Disposition::Report,
        }
    }
}

/// Classify a serenity `Error` into a [`SurfaceError`].
pub fn classify(err: &serenity::Error) -> SurfaceError {
    match err {
        serenity::Error::Http(HttpError::UnsuccessfulRequest(resp)) => classify_response(
            resp.status_code.as_u16(),
            resp.error.code as u32,
            &resp.error.message,
        ),
        _ => {
            debug!("Non-API serenity error: {}", err);
            SurfaceError::transient(err.to_string())
        }
    }
}

/// Map an HTTP status and Discord JSON error code to a [`SurfaceError`].
///
/// 50001 (missing access) and 50013 (missing permissions) deny; 10003
/// (unknown channel) and 10008 (unknown message) are gone for good.
/// Everything else, rate limits included, is worth carrying on after.
pub fn classify_response(status: u16, code: u32, message: &str) -> SurfaceError {
    let kind = match (status, code) {
        (_, 50001 | 50013) | (403, _) => SurfaceErrorKind::PermissionDenied,
        (_, 10003 | 10008) | (404, _) => SurfaceErrorKind::NotFound,
        _ => SurfaceErrorKind::Transient,
    };
    SurfaceError::new(kind, format!("HTTP {} / code {}: {}", status, code, message))
}

/// Log a serenity error at the appropriate level.
///
/// - Permission and not-found errors → `error!`
/// - Everything else → `warn!`
pub fn log_error(context: &str, err: &serenity::Error) {
    log_surface_error(context, &classify(err));
}

pub fn log_surface_error(context: &str, err: &SurfaceError) {
    match err.kind {
        SurfaceErrorKind::PermissionDenied | SurfaceErrorKind::NotFound => {
            error!("{} [{:?}]: {}", context, err.kind, err.message);
        }
        SurfaceErrorKind::Transient => {
            warn!("{} [{:?}]: {}", context, err.kind, err.message);
        }
    }
}
