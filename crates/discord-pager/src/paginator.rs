//! Splitting long text into bounded pages.
//!
//! Sizes are counted in `char`s so a cut never lands inside a UTF-8
//! sequence. Two policies are supported:
//!
//! - **by lines**: whole lines (terminators included) are packed into a page
//!   until the next line would make it reach `max_size`. A line that is
//!   itself longer than `max_size` gets a page of its own and is *not*
//!   broken further.
//! - **by chars**: hard cut every `max_size` characters, left to right.

#[path = "paginator_tests.rs"]
mod paginator_tests;

use tracing::warn;

use crate::error::{PagerError, Result};

/// Split `content` into pages of at most `max_size` characters.
///
/// Empty content yields exactly one empty page.
pub fn split(content: &str, max_size: usize, by_lines: bool) -> Result<Vec<String>> {
    if max_size == 0 {
        return Err(PagerError::InvalidArgument(
            "max_size must be greater than 0".to_string(),
        ));
    }

    Ok(if by_lines {
        split_by_lines(content, max_size)
    } else {
        split_by_chars(content, max_size)
    })
}

fn split_by_chars(content: &str, max_size: usize) -> Vec<String> {
    let mut pages = Vec::new();
    let mut rest = content;

    while let Some((cut, _)) = rest.char_indices().nth(max_size) {
        pages.push(rest[..cut].to_string());
        rest = &rest[cut..];
    }
    pages.push(rest.to_string());

    pages
}

fn split_by_lines(content: &str, max_size: usize) -> Vec<String> {
    let mut pages = vec![String::new()];
    let mut page_len = 0usize;

    for line in content.split_inclusive('\n') {
        let line_len = line.chars().count();

        if page_len > 0 && page_len + line_len >= max_size {
            pages.push(String::new());
            page_len = 0;
        }

        if let Some(page) = pages.last_mut() {
            page.push_str(line);
        }
        page_len += line_len;
    }

    pages
}

/// Pages produced for one pagination, after the page ceiling was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pages {
    pages: Vec<String>,
    truncated: usize,
}

impl Pages {
    /// Split `content` and keep at most `max_pages` pages.
    ///
    /// Pages past the ceiling are dropped; how many were dropped is kept in
    /// [`Pages::truncated`].
    pub fn build(
        content: &str,
        max_size: usize,
        by_lines: bool,
        max_pages: Option<usize>,
    ) -> Result<Self> {
        let mut pages = split(content, max_size, by_lines)?;
        let mut truncated = 0;

        if let Some(limit) = max_pages {
            let limit = limit.max(1);
            if pages.len() > limit {
                truncated = pages.len() - limit;
                pages.truncate(limit);
                warn!(
                    "Pagination produced {} pages, dropping the last {} (max_pages = {})",
                    limit + truncated,
                    truncated,
                    limit
                );
            }
        }

        Ok(Self { pages, truncated })
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Always false: there is at least one (possibly empty) page.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.pages.get(index).map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.pages
    }

    /// Number of trailing pages dropped by the `max_pages` ceiling.
    pub fn truncated(&self) -> usize {
        self.truncated
    }

    pub fn into_inner(self) -> Vec<String> {
        self.pages
    }
}
