//! Cursor walk over the history endpoint.
//!
//! Paging stops on an empty page, on a missing/null cursor, or when the server
//! hands back a cursor that was already requested. A hard page ceiling turns a
//! server that never stops into a protocol error instead of an endless loop.

use log::{debug, warn};
use monizze_core::{Error, Result};
use monizze_ingest::RawPage;
use std::collections::HashSet;

pub const DEFAULT_MAX_PAGES: usize = 1000;

/// Something that can return one history page for a cursor.
#[allow(async_fn_in_trait)]
pub trait PageSource {
    async fn fetch_page(&mut self, cursor: Option<&str>) -> Result<RawPage>;
}

/// Lazy page sequence. Build a new one to restart from the first page.
pub struct HistoryPages<S> {
    source: S,
    cursor: Option<String>,
    requested: HashSet<String>,
    fetched: usize,
    max_pages: usize,
    done: bool,
}

impl<S: PageSource> HistoryPages<S> {
    pub fn new(source: S) -> Self {
        Self::with_max_pages(source, DEFAULT_MAX_PAGES)
    }

    pub fn with_max_pages(source: S, max_pages: usize) -> Self {
        Self {
            source,
            cursor: None,
            requested: HashSet::new(),
            fetched: 0,
            max_pages,
            done: false,
        }
    }

    /// Pages fetched so far
    pub fn fetched(&self) -> usize {
        self.fetched
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Fetch the next page, or `None` once the history is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<RawPage>> {
        if self.done {
            return Ok(None);
        }
        if self.fetched >= self.max_pages {
            return Err(Error::Protocol(format!(
                "history did not end after {} pages",
                self.max_pages
            )));
        }

        let page = self.source.fetch_page(self.cursor.as_deref()).await?;
        self.fetched += 1;
        debug!(
            "page {}: {} entries, next cursor {:?}",
            self.fetched,
            page.entries.len(),
            page.next_cursor
        );

        match &page.next_cursor {
            _ if page.is_empty() => self.done = true,
            None => self.done = true,
            Some(next) if !self.requested.insert(next.clone()) => {
                warn!("server repeated cursor {next:?}; treating the history as complete");
                self.done = true;
            }
            Some(next) => self.cursor = Some(next.clone()),
        }

        Ok(Some(page))
    }
}
