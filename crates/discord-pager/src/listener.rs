//! Interactive pagination: the session loop driven by reaction events.
//!
//! Flow:
//! 1. [`Pager::paginate`] splits the content and sends page one.
//! 2. Content that fits on one page stops there.
//! 3. Otherwise the five navigation reactions are attached and a session
//!    task is spawned that waits for the owner's reactions until the
//!    deadline, applies each one to the [`Session`] and re-renders through
//!    the session's [`RenderGate`].
//!
//! Renders that find the gate saturated are not queued. The most recent one
//! is remembered and rendered as soon as a slot frees up, so the final page
//! is always shown even when intermediate pages are skipped.

#[path = "listener_tests.rs"]
mod listener_tests;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::PaginatorConfig;
use crate::error::{PagerError, Result, SurfaceError};
use crate::gate::{RenderGate, RenderPermit};
use crate::session::{Action, Session, Transition, SYMBOLS};
use crate::surface::{
    ArtifactRef, ReactionEvent, ReactionFilter, ReactionSubscription, Surface, WaitOutcome,
};

/// Why a session stopped. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Stopped,
    TimedOut,
    Closed,
    /// The artifact was deleted under the session.
    ArtifactGone,
}

/// Summary handed back when a session task finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub end: SessionEnd,
    /// Transitions that moved to another page.
    pub transitions: usize,
    /// Successful edits of the artifact.
    pub renders: usize,
    /// Render requests that found the gate saturated.
    pub dropped_renders: usize,
}

/// What [`Pager::paginate`] produced.
#[derive(Debug)]
pub enum Paginated {
    /// Content fit on one page; nothing to navigate.
    Single(ArtifactRef),
    Interactive {
        artifact: ArtifactRef,
        handle: JoinHandle<SessionReport>,
    },
}

impl Paginated {
    pub fn artifact(&self) -> ArtifactRef {
        match self {
            Paginated::Single(artifact) => *artifact,
            Paginated::Interactive { artifact, .. } => *artifact,
        }
    }
}

/// Starts pagination sessions against a [`Surface`].
pub struct Pager<S: Surface> {
    surface: Arc<S>,
    config: PaginatorConfig,
    active: Arc<AtomicUsize>,
}

impl<S: Surface> Clone for Pager<S> {
    fn clone(&self) -> Self {
        Self {
            surface: self.surface.clone(),
            config: self.config.clone(),
            active: self.active.clone(),
        }
    }
}

impl<S: Surface> Pager<S> {
    pub fn new(surface: Arc<S>, config: PaginatorConfig) -> Self {
        Self {
            surface,
            config,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Same surface and session counter, different settings.
    pub fn with_config(&self, config: PaginatorConfig) -> Self {
        Self {
            surface: self.surface.clone(),
            config,
            active: self.active.clone(),
        }
    }

    pub fn config(&self) -> &PaginatorConfig {
        &self.config
    }

    /// Sessions currently running.
    pub fn active_sessions(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Send `content` to `channel_id` as a paged message navigable by `owner_id`.
    ///
    /// Argument and permission problems are returned here; once the session
    /// task runs, failures only end the session.
    pub async fn paginate(&self, channel_id: u64, owner_id: u64, content: &str) -> Result<Paginated> {
        let policy = self.config.split_policy()?;
        let deadline = Instant::now() + self.config.timeout();
        let mut session = Session::new(
            content,
            policy,
            self.config.prefix.clone(),
            self.config.suffix.clone(),
            owner_id,
            deadline,
        )?;

        let artifact = self
            .surface
            .create_message(channel_id, &session.render())
            .await?;
        session.attach(artifact);

        if !session.is_interactive() {
            debug!("Content fits on one page, message {} is static", artifact.message_id);
            return Ok(Paginated::Single(artifact));
        }

        self.check_permissions(channel_id).await?;

        let subscription = self.surface.subscribe(ReactionFilter {
            owner_id,
            artifact,
            symbols: SYMBOLS.iter().map(|s| s.to_string()).collect(),
        });

        for symbol in SYMBOLS {
            if let Err(e) = self.surface.add_reaction(&artifact, symbol).await {
                if e.is_permission_denied() {
                    return Err(PagerError::PermissionDenied(format!(
                        "Failed to react to message - {}",
                        e.message
                    )));
                }
                warn!("Failed to add '{}' to message {}: {}", symbol, artifact.message_id, e);
            }
        }

        info!(
            "Started pagination of {} pages on message {} for user {}",
            session.page_count(),
            artifact.message_id,
            owner_id
        );

        let session_loop = SessionLoop {
            surface: self.surface.clone(),
            artifact,
            session,
            gate: RenderGate::new(self.config.concurrency),
            subscription,
            in_flight: JoinSet::new(),
            pending: None,
            generation: 0,
            shown: 0,
            transitions: 0,
            renders: 0,
            dropped_renders: 0,
        };

        let active = ActiveGuard::enter(self.active.clone());
        let handle = tokio::spawn(async move {
            let _active = active;
            session_loop.run().await
        });

        Ok(Paginated::Interactive { artifact, handle })
    }

    async fn check_permissions(&self, channel_id: u64) -> Result<()> {
        let perms = self.surface.permissions(channel_id).await?;
        if !perms.add_reactions {
            return Err(PagerError::PermissionDenied(
                "Failed to react to message - Missing ADD_REACTIONS permission".to_string(),
            ));
        }
        if !perms.direct_message && !perms.manage_messages {
            return Err(PagerError::PermissionDenied(
                "Failed to react to message - Missing MANAGE_MESSAGES permission".to_string(),
            ));
        }
        Ok(())
    }
}

struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn enter(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A render waiting for, or holding, a gate slot.
struct RenderJob {
    generation: u64,
    body: String,
    /// Reactions to take off the artifact once the edit lands.
    triggers: Vec<ReactionEvent>,
}

struct RenderDone {
    generation: u64,
    outcome: std::result::Result<(), SurfaceError>,
}

struct SessionLoop<S: Surface> {
    surface: Arc<S>,
    artifact: ArtifactRef,
    session: Session,
    gate: RenderGate,
    subscription: S::Subscription,
    in_flight: JoinSet<RenderDone>,
    pending: Option<RenderJob>,
    /// Bumped on every page move.
    generation: u64,
    /// Newest generation known to be on screen.
    shown: u64,
    transitions: usize,
    renders: usize,
    dropped_renders: usize,
}

impl<S: Surface> SessionLoop<S> {
    async fn run(mut self) -> SessionReport {
        let end = loop {
            let remaining = self.session.deadline().saturating_duration_since(Instant::now());

            tokio::select! {
                Some(done) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    if let Some(end) = self.record(done) {
                        break end;
                    }
                    self.dispatch_pending();
                }
                outcome = self.subscription.next_event(remaining) => match outcome {
                    WaitOutcome::Event(event) => {
                        if let Some(end) = self.on_event(event).await {
                            break end;
                        }
                    }
                    WaitOutcome::TimedOut => break SessionEnd::TimedOut,
                    WaitOutcome::Closed => break SessionEnd::Closed,
                },
            }
        };

        self.finish(end).await
    }

    async fn on_event(&mut self, event: ReactionEvent) -> Option<SessionEnd> {
        let action = Action::from_symbol(&event.symbol)?;

        match self.session.apply(action) {
            Transition::Stop => Some(SessionEnd::Stopped),
            Transition::Unchanged => {
                remove_trigger(&*self.surface, &self.artifact, &event).await;
                None
            }
            Transition::Moved => {
                self.transitions += 1;
                self.generation += 1;
                debug!(
                    "Message {} moved to page {} / {}",
                    self.artifact.message_id,
                    self.session.current() + 1,
                    self.session.page_count()
                );
                self.request_render(RenderJob {
                    generation: self.generation,
                    body: self.session.render(),
                    triggers: vec![event],
                });
                None
            }
        }
    }

    fn request_render(&mut self, mut job: RenderJob) {
        match self.gate.try_acquire() {
            Some(permit) => self.spawn_render(permit, job),
            None => {
                self.dropped_renders += 1;
                if let Some(mut older) = self.pending.take() {
                    older.triggers.append(&mut job.triggers);
                    job.triggers = older.triggers;
                }
                debug!(
                    "Render gate saturated on message {}, keeping generation {} for later",
                    self.artifact.message_id, job.generation
                );
                self.pending = Some(job);
            }
        }
    }

    fn dispatch_pending(&mut self) {
        if self.pending.is_none() || self.gate.would_block() {
            return;
        }
        if let Some(permit) = self.gate.try_acquire() {
            if let Some(job) = self.pending.take() {
                self.spawn_render(permit, job);
            }
        }
    }

    fn spawn_render(&mut self, permit: RenderPermit, job: RenderJob) {
        let surface = self.surface.clone();
        let artifact = self.artifact;

        self.in_flight.spawn(async move {
            let _permit = permit;
            let outcome = surface.edit_message(&artifact, &job.body).await;
            if outcome.is_ok() {
                for trigger in &job.triggers {
                    remove_trigger(&*surface, &artifact, trigger).await;
                }
            }
            RenderDone {
                generation: job.generation,
                outcome,
            }
        });
    }

    /// Account for a finished render. Returns an ending if the artifact is gone.
    fn record(&mut self, done: std::result::Result<RenderDone, JoinError>) -> Option<SessionEnd> {
        let done = match done {
            Ok(done) => done,
            Err(e) => {
                warn!("Render task for message {} failed: {}", self.artifact.message_id, e);
                return None;
            }
        };

        match done.outcome {
            Ok(()) => {
                self.renders += 1;
                if done.generation < self.shown {
                    // An older page landed after a newer one; show the current one again.
                    if self.pending.is_none() {
                        self.pending = Some(RenderJob {
                            generation: self.generation,
                            body: self.session.render(),
                            triggers: Vec::new(),
                        });
                    }
                } else {
                    self.shown = done.generation;
                }
                None
            }
            Err(e) if e.is_not_found() => {
                info!("Message {} is gone, ending pagination", self.artifact.message_id);
                Some(SessionEnd::ArtifactGone)
            }
            Err(e) => {
                warn!("Failed to render message {}: {}", self.artifact.message_id, e);
                None
            }
        }
    }

    async fn finish(mut self, mut end: SessionEnd) -> SessionReport {
        while let Some(done) = self.in_flight.join_next().await {
            if let Some(SessionEnd::ArtifactGone) = self.record(done) {
                end = SessionEnd::ArtifactGone;
            }
        }

        if matches!(end, SessionEnd::Stopped | SessionEnd::TimedOut) {
            if let Some(job) = self.pending.take() {
                let permit = self.gate.acquire().await;
                self.spawn_render(permit, job);
                while let Some(done) = self.in_flight.join_next().await {
                    if let Some(SessionEnd::ArtifactGone) = self.record(done) {
                        end = SessionEnd::ArtifactGone;
                    }
                }
            }
        }

        if matches!(end, SessionEnd::Stopped | SessionEnd::TimedOut) {
            if let Err(e) = self.surface.clear_reactions(&self.artifact).await {
                debug!(
                    "Could not clear reactions on message {}: {}",
                    self.artifact.message_id, e
                );
            }
        }

        info!(
            "Pagination on message {} ended ({:?}) after {} transitions",
            self.artifact.message_id, end, self.transitions
        );

        SessionReport {
            end,
            transitions: self.transitions,
            renders: self.renders,
            dropped_renders: self.dropped_renders,
        }
    }
}

/// Take the owner's reaction back off the artifact. Cosmetic only.
async fn remove_trigger<S: Surface>(surface: &S, artifact: &ArtifactRef, event: &ReactionEvent) {
    if let Err(e) = surface
        .remove_reaction(artifact, &event.symbol, event.emitter_id)
        .await
    {
        debug!(
            "Could not remove '{}' from message {}: {}",
            event.symbol, artifact.message_id, e
        );
    }
}
