//! Reaction-driven pagination of long text over a chat transport

pub mod config;
pub mod error;
pub mod gate;
pub mod listener;
#[cfg(any(test, feature = "test-support"))]
pub mod mock;
pub mod paginator;
pub mod session;
pub mod surface;

pub use config::PaginatorConfig;
pub use error::{PagerError, Result, SurfaceError, SurfaceErrorKind};
pub use gate::{RenderGate, RenderPermit};
pub use listener::{Paginated, Pager, SessionEnd, SessionReport};
#[cfg(any(test, feature = "test-support"))]
pub use mock::{MockSubscription, MockSurface, SurfaceCall};
pub use paginator::{split, Pages};
pub use session::{Action, Session, SplitPolicy, Transition, SYMBOLS};
pub use surface::{
    ArtifactRef, ChannelPermissions, ReactionEvent, ReactionFilter, ReactionSubscription, Surface,
    WaitOutcome,
};
