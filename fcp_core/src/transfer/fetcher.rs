//! Cursor-driven pagination over a hub collection.
//!
//! Pages are requested strictly one after another: the cursor returned by
//! call n is the input of call n+1. The sequence ends after the first page
//! with an empty cursor, or at the first remote error (no retries, so a lost
//! page can never be papered over). Overlapping pages from a hub that
//! paginates non-monotonically are passed through as is.

use futures_util::Stream;
use futures_util::stream;
use std::time::Duration;

use crate::hub::{HubClient, HubError, call};
use crate::record::{Batch, Category};

pub struct PageFetcher<'a, H> {
    hub: &'a H,
    category: Category,
    fid: u64,
    page_size: u32,
    timeout: Option<Duration>,
    /// `None` once the collection is exhausted or a call failed
    cursor: Option<Vec<u8>>,
    pages: u64,
    records: u64,
}

impl<'a, H: HubClient> PageFetcher<'a, H> {
    pub fn new(hub: &'a H, category: Category, fid: u64, page_size: u32) -> Self {
        Self::starting_at(hub, category, fid, page_size, Vec::new())
    }

    /// Resume a collection from a cursor saved by an earlier run
    pub fn starting_at(
        hub: &'a H,
        category: Category,
        fid: u64,
        page_size: u32,
        cursor: Vec<u8>,
    ) -> Self {
        Self {
            hub,
            category,
            fid,
            page_size,
            timeout: None,
            cursor: Some(cursor),
            pages: 0,
            records: 0,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch the next page. `Ok(None)` means the collection is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Batch>, HubError> {
        let Some(cursor) = self.cursor.take() else {
            return Ok(None);
        };

        let batch = call(
            self.timeout,
            self.hub
                .read_page(self.category, self.fid, &cursor, self.page_size),
        )
        .await?;

        self.pages += 1;
        self.records += batch.len() as u64;
        tracing::debug!(
            "Fetched page {} of {} for fid {}: {} records",
            self.pages,
            self.category,
            self.fid,
            batch.len()
        );

        if !batch.is_last() {
            self.cursor = Some(batch.next_cursor.clone());
        }
        Ok(Some(batch))
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn pages(&self) -> u64 {
        self.pages
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor.is_none()
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<Batch, HubError>> + 'a
    where
        H: 'a,
    {
        stream::try_unfold(self, |mut fetcher| async move {
            Ok(fetcher.next_page().await?.map(|batch| (batch, fetcher)))
        })
    }
}

/// Lazily fetch every page of one category's collection for `fid`.
pub fn fetch_all<'a, H: HubClient>(
    hub: &'a H,
    category: Category,
    fid: u64,
    page_size: u32,
) -> impl Stream<Item = Result<Batch, HubError>> + 'a {
    PageFetcher::new(hub, category, fid, page_size).into_stream()
}
