//! In-memory surface for unit testing without a gateway connection.
//!
//! Enabled with `cfg(test)` or the `test-support` feature:
//!
//! ```toml
//! [dev-dependencies]
//! discord-pager = { path = "...", features = ["test-support"] }
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::SurfaceError;
use crate::surface::{
    ArtifactRef, ChannelPermissions, ReactionEvent, ReactionFilter, ReactionSubscription, Surface,
    WaitOutcome,
};

/// One recorded call against the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCall {
    Create { channel_id: u64, body: String },
    Edit { artifact: ArtifactRef, body: String },
    AddReaction { artifact: ArtifactRef, symbol: String },
    RemoveReaction { artifact: ArtifactRef, symbol: String, emitter_id: u64 },
    ClearReactions { artifact: ArtifactRef },
    Subscribe { filter: ReactionFilter },
}

#[derive(Default)]
struct MockState {
    calls: Vec<SurfaceCall>,
    next_message_id: u64,
    subscribers: Vec<(ReactionFilter, mpsc::UnboundedSender<ReactionEvent>)>,
    permissions: Option<ChannelPermissions>,
    fail_create: Option<SurfaceError>,
    fail_add_reaction: Option<SurfaceError>,
    fail_edits: Option<SurfaceError>,
    fail_clear: Option<SurfaceError>,
    edit_delay: Option<Duration>,
    edit_delays: VecDeque<Duration>,
}

/// Records every call and lets tests inject reactions and failures.
#[derive(Clone, Default)]
pub struct MockSurface {
    state: Arc<Mutex<MockState>>,
}

impl MockSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all calls in the order they were made.
    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Bodies of every edit, in order.
    pub fn edits(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SurfaceCall::Edit { body, .. } => Some(body),
                _ => None,
            })
            .collect()
    }

    pub fn reactions_added(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SurfaceCall::AddReaction { symbol, .. } => Some(symbol),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&SurfaceCall) -> bool) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|&c| pred(c)).count()
    }

    /// Deliver a reaction to every subscription whose filter accepts it.
    /// Returns how many subscriptions received it.
    pub fn emit(&self, event: ReactionEvent) -> usize {
        let state = self.state.lock().unwrap();
        state
            .subscribers
            .iter()
            .filter(|(filter, _)| filter.matches(&event))
            .filter(|(_, tx)| tx.send(event.clone()).is_ok())
            .count()
    }

    /// Simulate the gateway connection going away.
    pub fn close(&self) {
        self.state.lock().unwrap().subscribers.clear();
    }

    pub fn set_permissions(&self, permissions: ChannelPermissions) {
        self.state.lock().unwrap().permissions = Some(permissions);
    }

    pub fn fail_create(&self, err: SurfaceError) {
        self.state.lock().unwrap().fail_create = Some(err);
    }

    pub fn fail_add_reaction(&self, err: SurfaceError) {
        self.state.lock().unwrap().fail_add_reaction = Some(err);
    }

    /// Every subsequent edit fails with `err` (until cleared with `None`).
    pub fn fail_edits(&self, err: Option<SurfaceError>) {
        self.state.lock().unwrap().fail_edits = err;
    }

    pub fn fail_clear(&self, err: SurfaceError) {
        self.state.lock().unwrap().fail_clear = Some(err);
    }

    /// Make each edit take `delay` before it completes.
    pub fn set_edit_delay(&self, delay: Duration) {
        self.state.lock().unwrap().edit_delay = Some(delay);
    }

    /// Give the next edits these latencies, one per edit in call order.
    /// Once the schedule runs out, edits fall back to [`set_edit_delay`].
    ///
    /// [`set_edit_delay`]: MockSurface::set_edit_delay
    pub fn set_edit_delays(&self, delays: impl IntoIterator<Item = Duration>) {
        self.state.lock().unwrap().edit_delays = delays.into_iter().collect();
    }

    fn record(&self, call: SurfaceCall) {
        self.state.lock().unwrap().calls.push(call);
    }
}

/// Subscription handed out by [`MockSurface::subscribe`].
pub struct MockSubscription {
    rx: mpsc::UnboundedReceiver<ReactionEvent>,
}

impl ReactionSubscription for MockSubscription {
    async fn next_event(&mut self, timeout: Duration) -> WaitOutcome {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(event)) => WaitOutcome::Event(event),
            Ok(None) => WaitOutcome::Closed,
            Err(_) => WaitOutcome::TimedOut,
        }
    }
}

impl Surface for MockSurface {
    type Subscription = MockSubscription;

    async fn create_message(&self, channel_id: u64, body: &str) -> Result<ArtifactRef, SurfaceError> {
        if let Some(err) = self.state.lock().unwrap().fail_create.clone() {
            return Err(err);
        }
        self.record(SurfaceCall::Create {
            channel_id,
            body: body.to_string(),
        });
        let mut state = self.state.lock().unwrap();
        state.next_message_id += 1;
        Ok(ArtifactRef {
            channel_id,
            message_id: 1000 + state.next_message_id,
        })
    }

    async fn edit_message(&self, artifact: &ArtifactRef, body: &str) -> Result<(), SurfaceError> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.edit_delays.pop_front().or(state.edit_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.state.lock().unwrap().fail_edits.clone() {
            return Err(err);
        }
        self.record(SurfaceCall::Edit {
            artifact: *artifact,
            body: body.to_string(),
        });
        Ok(())
    }

    async fn add_reaction(&self, artifact: &ArtifactRef, symbol: &str) -> Result<(), SurfaceError> {
        if let Some(err) = self.state.lock().unwrap().fail_add_reaction.clone() {
            return Err(err);
        }
        self.record(SurfaceCall::AddReaction {
            artifact: *artifact,
            symbol: symbol.to_string(),
        });
        Ok(())
    }

    async fn remove_reaction(
        &self,
        artifact: &ArtifactRef,
        symbol: &str,
        emitter_id: u64,
    ) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::RemoveReaction {
            artifact: *artifact,
            symbol: symbol.to_string(),
            emitter_id,
        });
        Ok(())
    }

    async fn clear_reactions(&self, artifact: &ArtifactRef) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::ClearReactions {
            artifact: *artifact,
        });
        match self.state.lock().unwrap().fail_clear.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn permissions(&self, _channel_id: u64) -> Result<ChannelPermissions, SurfaceError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .permissions
            .unwrap_or_else(ChannelPermissions::all))
    }

    fn subscribe(&self, filter: ReactionFilter) -> MockSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.record(SurfaceCall::Subscribe {
            filter: filter.clone(),
        });
        self.state.lock().unwrap().subscribers.push((filter, tx));
        MockSubscription { rx }
    }
}
