//! Error types for discord-pager

use std::fmt;

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PagerError>;

/// Errors surfaced to whoever asks for a pagination.
///
/// Once a session loop is running nothing is surfaced any more; these only
/// come out of construction and session start.
#[derive(Debug, Error)]
pub enum PagerError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("Transport error: {0}")]
    Transport(SurfaceError),
}

impl From<SurfaceError> for PagerError {
    fn from(err: SurfaceError) -> Self {
        match err.kind {
            SurfaceErrorKind::PermissionDenied => PagerError::PermissionDenied(err.message),
            _ => PagerError::Transport(err),
        }
    }
}

/// Coarse class of a failed transport call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceErrorKind {
    /// The bot lacks the permission for the call.
    PermissionDenied,
    /// The message (or channel) no longer exists.
    NotFound,
    /// Anything else: network, rate limit, server error.
    Transient,
}

/// Failure reported by a [`Surface`](crate::surface::Surface) call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceError {
    pub kind: SurfaceErrorKind,
    pub message: String,
}

impl SurfaceError {
    pub fn new(kind: SurfaceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(SurfaceErrorKind::PermissionDenied, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(SurfaceErrorKind::NotFound, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(SurfaceErrorKind::Transient, message)
    }

    pub fn is_permission_denied(&self) -> bool {
        self.kind == SurfaceErrorKind::PermissionDenied
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == SurfaceErrorKind::NotFound
    }
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for SurfaceError {}
