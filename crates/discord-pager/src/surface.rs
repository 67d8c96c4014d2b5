//! Transport contract the pagination loop runs against.
//!
//! The real implementation lives in the bot (serenity); tests use
//! [`MockSurface`](crate::mock::MockSurface).

use std::future::Future;
use std::time::Duration;

use crate::error::SurfaceError;

/// Identity of a rendered message on the remote surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArtifactRef {
    pub channel_id: u64,
    pub message_id: u64,
}

/// A user's selection of an affordance on an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEvent {
    pub emitter_id: u64,
    pub artifact: ArtifactRef,
    pub symbol: String,
}

/// Which reaction events a session cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionFilter {
    pub owner_id: u64,
    pub artifact: ArtifactRef,
    pub symbols: Vec<String>,
}

impl ReactionFilter {
    pub fn matches(&self, event: &ReactionEvent) -> bool {
        event.emitter_id == self.owner_id
            && event.artifact == self.artifact
            && self.symbols.iter().any(|s| *s == event.symbol)
    }
}

/// Result of waiting for the next matching event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    Event(ReactionEvent),
    TimedOut,
    /// The gateway connection went away; no more events will arrive.
    Closed,
}

/// Permissions the bot holds in a channel, as far as pagination cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelPermissions {
    pub add_reactions: bool,
    pub manage_messages: bool,
    pub direct_message: bool,
}

impl ChannelPermissions {
    pub fn all() -> Self {
        Self {
            add_reactions: true,
            manage_messages: true,
            direct_message: false,
        }
    }
}

/// A stream of reaction events scoped by a [`ReactionFilter`].
pub trait ReactionSubscription: Send + 'static {
    /// Wait up to `timeout` for the next matching event.
    fn next_event(&mut self, timeout: Duration) -> impl Future<Output = WaitOutcome> + Send;
}

/// Remote messaging operations used by a pagination session.
pub trait Surface: Send + Sync + 'static {
    type Subscription: ReactionSubscription;

    fn create_message(
        &self,
        channel_id: u64,
        body: &str,
    ) -> impl Future<Output = Result<ArtifactRef, SurfaceError>> + Send;

    fn edit_message(
        &self,
        artifact: &ArtifactRef,
        body: &str,
    ) -> impl Future<Output = Result<(), SurfaceError>> + Send;

    fn add_reaction(
        &self,
        artifact: &ArtifactRef,
        symbol: &str,
    ) -> impl Future<Output = Result<(), SurfaceError>> + Send;

    fn remove_reaction(
        &self,
        artifact: &ArtifactRef,
        symbol: &str,
        emitter_id: u64,
    ) -> impl Future<Output = Result<(), SurfaceError>> + Send;

    fn clear_reactions(
        &self,
        artifact: &ArtifactRef,
    ) -> impl Future<Output = Result<(), SurfaceError>> + Send;

    fn permissions(
        &self,
        channel_id: u64,
    ) -> impl Future<Output = Result<ChannelPermissions, SurfaceError>> + Send;

    /// Start listening for reactions. Events emitted after this call and
    /// accepted by `filter` are delivered by the returned subscription.
    fn subscribe(&self, filter: ReactionFilter) -> Self::Subscription;
}
