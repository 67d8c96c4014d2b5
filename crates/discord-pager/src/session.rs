//! Navigation state for one pagination.

use tokio::time::Instant;

use crate::error::Result;
use crate::paginator::Pages;
use crate::surface::ArtifactRef;

/// Reaction symbols in the order they are attached to the artifact.
pub const SYMBOLS: [&str; 5] = ["⏮", "◀", "⏹", "▶", "⏭"];

/// A navigation command decoded from a reaction symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    First,
    Previous,
    Stop,
    Next,
    Last,
}

impl Action {
    /// Decode a reaction symbol. Unknown symbols yield `None`.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "⏮" => Some(Self::First),
            "◀" => Some(Self::Previous),
            "⏹" => Some(Self::Stop),
            "▶" => Some(Self::Next),
            "⏭" => Some(Self::Last),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::First => "⏮",
            Self::Previous => "◀",
            Self::Stop => "⏹",
            Self::Next => "▶",
            Self::Last => "⏭",
        }
    }
}

/// Outcome of applying an [`Action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Moved,
    Unchanged,
    Stop,
}

/// How the session re-splits appended content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitPolicy {
    pub page_size: usize,
    pub by_lines: bool,
    pub max_pages: Option<usize>,
}

/// Live navigation state. Owned by exactly one session loop.
#[derive(Debug, Clone)]
pub struct Session {
    content: String,
    pages: Pages,
    policy: SplitPolicy,
    current: usize,
    prefix: String,
    suffix: String,
    artifact: Option<ArtifactRef>,
    owner_id: u64,
    deadline: Instant,
}

impl Session {
    pub fn new(
        content: impl Into<String>,
        policy: SplitPolicy,
        prefix: impl Into<String>,
        suffix: impl Into<String>,
        owner_id: u64,
        deadline: Instant,
    ) -> Result<Self> {
        let content = content.into();
        let pages = Pages::build(&content, policy.page_size, policy.by_lines, policy.max_pages)?;
        Ok(Self {
            content,
            pages,
            policy,
            current: 0,
            prefix: prefix.into(),
            suffix: suffix.into(),
            artifact: None,
            owner_id,
            deadline,
        })
    }

    /// Apply a navigation action. Out-of-range moves are no-ops.
    pub fn apply(&mut self, action: Action) -> Transition {
        let last = self.pages.len() - 1;
        let target = match action {
            Action::Stop => return Transition::Stop,
            Action::First => 0,
            Action::Previous => self.current.saturating_sub(1),
            Action::Next => (self.current + 1).min(last),
            Action::Last => last,
        };

        if target == self.current {
            Transition::Unchanged
        } else {
            self.current = target;
            Transition::Moved
        }
    }

    /// Body of the artifact for the current page.
    pub fn render(&self) -> String {
        format!(
            "{}{}\n\nPage {} / {}{}",
            self.prefix,
            self.pages.get(self.current).unwrap_or_default(),
            self.current + 1,
            self.pages.len(),
            self.suffix
        )
    }

    /// Append content and re-split it with the session's policy.
    pub fn append(&mut self, more: &str) -> Result<()> {
        self.content.push_str(more);
        self.pages = Pages::build(
            &self.content,
            self.policy.page_size,
            self.policy.by_lines,
            self.policy.max_pages,
        )?;
        self.current = self.current.min(self.pages.len() - 1);
        Ok(())
    }

    pub fn attach(&mut self, artifact: ArtifactRef) {
        self.artifact = Some(artifact);
    }

    pub fn artifact(&self) -> Option<ArtifactRef> {
        self.artifact
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &Pages {
        &self.pages
    }

    pub fn owner_id(&self) -> u64 {
        self.owner_id
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn is_interactive(&self) -> bool {
        self.pages.len() > 1
    }
}
