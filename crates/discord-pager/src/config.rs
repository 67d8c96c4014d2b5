//! Configuration types for pagination sessions

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PagerError, Result};
use crate::gate::DEFAULT_CONCURRENCY;
use crate::session::SplitPolicy;

/// Pagination settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginatorConfig {
    /// Maximum size of a rendered message, decoration included
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    /// Pages past this ceiling are dropped
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    /// Keep whole lines together instead of hard cuts
    #[serde(default = "default_by_lines")]
    pub by_lines: bool,
    #[serde(default = "default_fence")]
    pub prefix: String,
    #[serde(default = "default_fence")]
    pub suffix: String,
    /// Session lifetime in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Concurrent edits allowed per session
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_max_size() -> usize {
    1900
}

fn default_max_pages() -> usize {
    10
}

fn default_by_lines() -> bool {
    true
}

fn default_fence() -> String {
    "```".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

impl Default for PaginatorConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            max_pages: default_max_pages(),
            by_lines: default_by_lines(),
            prefix: default_fence(),
            suffix: default_fence(),
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
        }
    }
}

impl PaginatorConfig {
    /// Set the opening decoration
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Page size left once prefix and suffix are accounted for.
    pub fn page_size(&self) -> Result<usize> {
        let decoration = self.prefix.chars().count() + self.suffix.chars().count();
        match self.max_size.checked_sub(decoration) {
            Some(size) if size > 0 => Ok(size),
            _ => Err(PagerError::InvalidArgument(format!(
                "max_size {} leaves no room for content after {} characters of decoration",
                self.max_size, decoration
            ))),
        }
    }

    pub fn split_policy(&self) -> Result<SplitPolicy> {
        Ok(SplitPolicy {
            page_size: self.page_size()?,
            by_lines: self.by_lines,
            max_pages: Some(self.max_pages),
        })
    }
}
