//! Serenity-backed [`Surface`] for the pager.
//!
//! Reactions reach sessions through a [`ReactionRouter`]: the gateway handler
//! hands every `reaction_add` to the router, which forwards it to each
//! subscription whose filter accepts it.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use discord_pager::{
    ArtifactRef, ChannelPermissions, ReactionEvent, ReactionFilter, ReactionSubscription, Surface,
    SurfaceError, WaitOutcome,
};
use serenity::builder::{CreateMessage, EditMessage};
use serenity::cache::Cache;
use serenity::http::Http;
use serenity::model::channel::{Channel, ReactionType};
use serenity::model::id::{ChannelId, MessageId, UserId};
use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::{classify, log_surface_error};

type Route = (ReactionFilter, mpsc::UnboundedSender<ReactionEvent>);

/// Fans gateway reactions out to live pagination sessions.
#[derive(Clone, Default)]
pub struct ReactionRouter {
    routes: Arc<Mutex<Vec<Route>>>,
}

impl ReactionRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, filter: ReactionFilter) -> RouterSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().push((filter, tx));
        RouterSubscription { rx }
    }

    /// Forward `event` to every matching subscription. Routes whose session
    /// has gone away are pruned on the way. Returns how many received it.
    pub fn dispatch(&self, event: &ReactionEvent) -> usize {
        let mut routes = self.lock();
        routes.retain(|(_, tx)| !tx.is_closed());
        routes
            .iter()
            .filter(|(filter, _)| filter.matches(event))
            .filter(|(_, tx)| tx.send(event.clone()).is_ok())
            .count()
    }

    /// Drop every route; their sessions observe a closed transport.
    pub fn close(&self) {
        let closed = std::mem::take(&mut *self.lock());
        debug!("Closed {} reaction routes", closed.len());
    }

    /// Live and not yet pruned routes.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Route>> {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct RouterSubscription {
    rx: mpsc::UnboundedReceiver<ReactionEvent>,
}

impl ReactionSubscription for RouterSubscription {
    async fn next_event(&mut self, timeout: Duration) -> WaitOutcome {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(event)) => WaitOutcome::Event(event),
            Ok(None) => WaitOutcome::Closed,
            Err(_) => WaitOutcome::TimedOut,
        }
    }
}

/// Discord implementation of the pager transport.
#[derive(Clone)]
pub struct DiscordSurface {
    http: Arc<Http>,
    cache: Arc<Cache>,
    router: ReactionRouter,
}

impl DiscordSurface {
    pub fn new(http: Arc<Http>, cache: Arc<Cache>, router: ReactionRouter) -> Self {
        Self {
            http,
            cache,
            router,
        }
    }

    pub fn router(&self) -> &ReactionRouter {
        &self.router
    }

    pub fn http(&self) -> &Arc<Http> {
        &self.http
    }

    /// What the bot may post in `channel_id`. Direct messages allow both.
    pub async fn send_permissions(&self, channel_id: u64) -> Result<SendPermissions, SurfaceError> {
        let channel = ChannelId::new(channel_id)
            .to_channel((&self.cache, &*self.http))
            .await
            .map_err(|e| classify(&e))?;

        match channel {
            Channel::Guild(guild_channel) => {
                let me = self.cache.current_user().id;
                let perms = guild_channel
                    .permissions_for_user(&self.cache, me)
                    .map_err(|e| classify(&e))?;
                Ok(SendPermissions {
                    send_messages: perms.send_messages(),
                    embed_links: perms.embed_links(),
                })
            }
            _ => Ok(SendPermissions::all()),
        }
    }
}

/// Posting rights in one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendPermissions {
    pub send_messages: bool,
    pub embed_links: bool,
}

impl SendPermissions {
    pub fn all() -> Self {
        Self {
            send_messages: true,
            embed_links: true,
        }
    }
}

fn ids(artifact: &ArtifactRef) -> (ChannelId, MessageId) {
    (
        ChannelId::new(artifact.channel_id),
        MessageId::new(artifact.message_id),
    )
}

fn unicode(symbol: &str) -> ReactionType {
    ReactionType::Unicode(symbol.to_string())
}

impl Surface for DiscordSurface {
    type Subscription = RouterSubscription;

    async fn create_message(&self, channel_id: u64, body: &str) -> Result<ArtifactRef, SurfaceError> {
        let msg = ChannelId::new(channel_id)
            .send_message(&*self.http, CreateMessage::new().content(body))
            .await
            .map_err(|e| classify(&e))?;
        Ok(ArtifactRef {
            channel_id,
            message_id: msg.id.get(),
        })
    }

    async fn edit_message(&self, artifact: &ArtifactRef, body: &str) -> Result<(), SurfaceError> {
        let (channel, message) = ids(artifact);
        channel
            .edit_message(&*self.http, message, EditMessage::new().content(body))
            .await
            .map(|_| ())
            .map_err(|e| classify(&e))
    }

    async fn add_reaction(&self, artifact: &ArtifactRef, symbol: &str) -> Result<(), SurfaceError> {
        let (channel, message) = ids(artifact);
        self.http
            .create_reaction(channel, message, &unicode(symbol))
            .await
            .map_err(|e| classify(&e))
    }

    async fn remove_reaction(
        &self,
        artifact: &ArtifactRef,
        symbol: &str,
        emitter_id: u64,
    ) -> Result<(), SurfaceError> {
        let (channel, message) = ids(artifact);
        self.http
            .delete_reaction(channel, message, UserId::new(emitter_id), &unicode(symbol))
            .await
            .map_err(|e| classify(&e))
    }

    async fn clear_reactions(&self, artifact: &ArtifactRef) -> Result<(), SurfaceError> {
        let (channel, message) = ids(artifact);
        self.http
            .delete_message_reactions(channel, message)
            .await
            .map_err(|e| classify(&e))
    }

    async fn permissions(&self, channel_id: u64) -> Result<ChannelPermissions, SurfaceError> {
        let channel = ChannelId::new(channel_id)
            .to_channel((&self.cache, &*self.http))
            .await
            .map_err(|e| classify(&e))?;

        match channel {
            Channel::Private(_) => Ok(ChannelPermissions {
                add_reactions: true,
                manage_messages: false,
                direct_message: true,
            }),
            Channel::Guild(guild_channel) => {
                let me = self.cache.current_user().id;
                let perms = guild_channel
                    .permissions_for_user(&self.cache, me)
                    .map_err(|e| classify(&e))?;
                Ok(ChannelPermissions {
                    add_reactions: perms.add_reactions(),
                    manage_messages: perms.manage_messages(),
                    direct_message: false,
                })
            }
            _ => Ok(ChannelPermissions::all()),
        }
    }

    fn subscribe(&self, filter: ReactionFilter) -> RouterSubscription {
        self.router.register(filter)
    }
}

/// Add `symbols` to `artifact` one at a time, `delay` apart.
pub async fn react_all<S: Surface>(
    surface: &S,
    artifact: &ArtifactRef,
    symbols: &[&str],
    delay: Duration,
) -> Result<(), SurfaceError> {
    for symbol in symbols {
        tokio::time::sleep(delay).await;
        surface.add_reaction(artifact, symbol).await?;
    }
    Ok(())
}

/// Delete `messages` after `delay` without waiting for it. Messages already
/// gone, or that the bot may not delete, are left alone.
pub fn cleanup(http: Arc<Http>, messages: Vec<ArtifactRef>, delay: Duration) {
    for artifact in messages {
        let http = http.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let (channel, message) = ids(&artifact);
            if let Err(e) = channel.delete_message(&http, message).await {
                let err = classify(&e);
                if !err.is_not_found() && !err.is_permission_denied() {
                    log_surface_error("Failed to clean up message", &err);
                }
            }
        });
    }
}
