/// Paginated occurrence retrieval with partial-failure tolerance
use super::{OccurrenceRecord, RawOccurrence};
use crate::pipeline::SelectionSet;
use crate::taxonomy::TaxonId;
use crate::{HexrichError, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;

/// Seam over the external occurrence service. One call fetches one page
/// of coordinate-bearing records for one group.
#[async_trait]
pub trait OccurrenceSource: Send + Sync {
    async fn page(&self, group: TaxonId, limit: usize, offset: usize)
        -> Result<Vec<RawOccurrence>>;
}

/// Caps and tolerances for a group fetch.
#[derive(Debug, Clone)]
pub struct FetchLimits {
    /// Records requested per page.
    pub page_size: usize,
    /// Pagination stops once the offset reaches this many records.
    pub max_records: usize,
    /// Re-attempts per page on a recoverable failure, beyond the first try.
    pub max_retries: usize,
    /// Deadline for a single page request.
    pub request_timeout: Duration,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            page_size: 300,
            max_records: 2000,
            max_retries: 2,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Outcome of fetching one group: whatever was retrieved, plus the error
/// that ended pagination early, if any. Partial results are normal.
#[derive(Debug)]
pub struct GroupFetch {
    pub group: TaxonId,
    pub records: Vec<OccurrenceRecord>,
    pub error: Option<HexrichError>,
}

impl GroupFetch {
    /// True when nothing at all came back and the fetch ended in error.
    pub fn is_total_failure(&self) -> bool {
        self.error.is_some() && self.records.is_empty()
    }
}

/// Fetches occurrence records for selected groups with sequential
/// pagination per group and bounded-parallel fan-out across groups.
pub struct OccurrenceFetcher<S> {
    source: Arc<S>,
    limits: FetchLimits,
    parallelism: usize,
}

impl<S: OccurrenceSource> OccurrenceFetcher<S> {
    pub fn new(source: Arc<S>, limits: FetchLimits, parallelism: usize) -> Self {
        Self {
            source,
            limits,
            parallelism: parallelism.max(1),
        }
    }

    /// Fetch one group's records, page by page from offset 0.
    ///
    /// Stops at the first empty page or when the offset reaches
    /// `max_records`, whichever comes first. Records missing either
    /// coordinate are dropped. A page failure after retries ends
    /// pagination for this group only; accumulated records are kept.
    pub async fn fetch_group(&self, group: TaxonId) -> GroupFetch {
        let mut records = Vec::new();
        let mut offset = 0usize;
        let mut dropped = 0usize;

        let error = loop {
            if offset >= self.limits.max_records {
                break None;
            }
            let limit = self.limits.page_size.min(self.limits.max_records - offset);

            let page = match self.page_with_retry(group, limit, offset).await {
                Ok(page) => page,
                Err(err) => {
                    tracing::warn!(
                        group,
                        offset,
                        retrieved = records.len(),
                        %err,
                        "page fetch failed; keeping partial results"
                    );
                    break Some(err);
                }
            };
            if page.is_empty() {
                break None;
            }

            offset += page.len();
            for raw in page {
                match raw.validate(group) {
                    Some(record) => records.push(record),
                    None => dropped += 1,
                }
            }
        };

        if dropped > 0 {
            tracing::debug!(group, dropped, "dropped records without coordinates");
        }

        GroupFetch {
            group,
            records,
            error,
        }
    }

    /// Fan out over the selection with bounded parallelism and join all
    /// group fetches before returning.
    pub async fn fetch_all(&self, selection: &SelectionSet) -> Vec<GroupFetch> {
        let futures = selection.ids().into_iter().map(|group| self.fetch_group(group));
        stream::iter(futures)
            .buffer_unordered(self.parallelism)
            .collect()
            .await
    }

    async fn page_with_retry(
        &self,
        group: TaxonId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<RawOccurrence>> {
        let mut attempt = 0usize;
        loop {
            let request = self.source.page(group, limit, offset);
            let result = match tokio::time::timeout(self.limits.request_timeout, request).await {
                Ok(result) => result,
                Err(_) => Err(HexrichError::Occurrence(format!(
                    "page request for group {} timed out after {:?}",
                    group, self.limits.request_timeout
                ))),
            };
            match result {
                Ok(page) => return Ok(page),
                Err(err) if attempt < self.limits.max_retries => {
                    attempt += 1;
                    tracing::debug!(group, offset, attempt, %err, "retrying page");
                }
                Err(err) => return Err(err),
            }
        }
    }
}
