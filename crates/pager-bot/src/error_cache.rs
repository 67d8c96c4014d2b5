//! Bounded cache of recent command and event failures.
//!
//! Engineers look records up by id with the `errors` command; the embed
//! posted to the error webhook only carries the first lines and the id.

use chrono::{DateTime, Utc};
use discord_pager::split;

use crate::errors::BotError;

/// Where a failure happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Command(String),
    Event(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    /// First eight hex digits of a v4 UUID.
    pub id: String,
    pub time: DateTime<Utc>,
    pub origin: Origin,
    pub detail: String,
}

impl ErrorRecord {
    pub fn new(origin: Origin, detail: impl Into<String>, time: DateTime<Utc>) -> Self {
        let mut id = uuid::Uuid::new_v4().simple().to_string();
        id.truncate(8);
        Self {
            id,
            time,
            origin,
            detail: detail.into(),
        }
    }

    pub fn command(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(Origin::Command(name.into()), detail, Utc::now())
    }

    pub fn event(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(Origin::Event(name.into()), detail, Utc::now())
    }

    pub fn formatted(&self) -> String {
        match &self.origin {
            Origin::Command(name) => format!("Ignored exception in command {}:\n{}", name, self.detail),
            Origin::Event(name) => format!("Ignored exception in event {}:\n{}", name, self.detail),
        }
    }

    /// The formatted record cut to its first `max_len` characters, on a line
    /// boundary where possible.
    pub fn formatted_to(&self, max_len: usize) -> String {
        split(&self.formatted(), max_len, true)
            .ok()
            .and_then(|pages| pages.into_iter().next())
            .unwrap_or_default()
    }
}

#[derive(Debug)]
pub struct ErrorCache {
    limit: Option<usize>,
    records: Vec<ErrorRecord>,
}

impl ErrorCache {
    /// `None` keeps every record. A zero limit is rejected.
    pub fn new(limit: Option<usize>) -> Result<Self, BotError> {
        if limit == Some(0) {
            return Err(BotError::InvalidArgument(
                "Cache limit must be positive, or unset for no limit.".to_string(),
            ));
        }
        Ok(Self {
            limit,
            records: Vec::new(),
        })
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Insert `record`, replacing any record with the same id, then evict the
    /// oldest records while over the limit.
    pub fn push(&mut self, record: ErrorRecord) {
        self.records.retain(|r| r.id != record.id);
        self.records.push(record);

        if let Some(limit) = self.limit {
            while self.records.len() > limit {
                let oldest = self
                    .records
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, r)| r.time)
                    .map(|(i, _)| i);
                match oldest {
                    Some(i) => {
                        self.records.remove(i);
                    }
                    None => break,
                }
            }
        }
    }

    /// Most recent record by time.
    pub fn latest(&self) -> Option<&ErrorRecord> {
        self.records.iter().max_by_key(|r| r.time)
    }

    pub fn get(&self, id: &str) -> Option<&ErrorRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn filter(&self, pred: impl Fn(&ErrorRecord) -> bool) -> Vec<&ErrorRecord> {
        self.records.iter().filter(|&r| pred(r)).collect()
    }

    pub fn all(&self) -> &[ErrorRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
