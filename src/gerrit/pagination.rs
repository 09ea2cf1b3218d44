//! Offset-based pagination over Gerrit query results.
//!
//! Gerrit returns a bounded page of changes per query and flags whether more
//! exist. [`Paginator`] keeps asking for the next offset until the flag drops,
//! then hands back the whole result set in creation order.

use super::error::QueryError;
use super::executor::QueryExecutor;
use super::models::RecordSet;
use crate::telemetry::{NoopTelemetrySink, TelemetryEvent, TelemetrySink};

/// Drives a [`QueryExecutor`] page by page until Gerrit reports no more
/// results.
pub struct Paginator<'a, Executor>
where
    Executor: QueryExecutor + ?Sized,
{
    executor: &'a Executor,
    telemetry: &'a dyn TelemetrySink,
}

impl<'a, Executor> Paginator<'a, Executor>
where
    Executor: QueryExecutor + ?Sized,
{
    /// Creates a paginator over `executor`.
    #[must_use]
    pub const fn new(executor: &'a Executor) -> Self {
        Self {
            executor,
            telemetry: &NoopTelemetrySink,
        }
    }

    /// Records a telemetry event for every page fetched.
    #[must_use]
    pub const fn with_telemetry(mut self, telemetry: &'a dyn TelemetrySink) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Fetches every page of `query` and returns the changes sorted by
    /// ascending creation time. Changes created at the same instant keep the
    /// order in which they were fetched.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::EmptyResult`] when the first page is empty,
    /// [`QueryError::Protocol`] when a later page is empty yet claims more
    /// results, and propagates any executor failure unchanged. Nothing is
    /// returned for a partially fetched query.
    pub fn fetch_all(&self, query: &str) -> Result<RecordSet, QueryError> {
        let mut records = RecordSet::new();
        let mut offset = 0_usize;

        loop {
            let page = self.executor.fetch_page(query, offset)?;
            let fetched = page.records.len();

            if fetched == 0 && records.is_empty() {
                return Err(QueryError::EmptyResult {
                    query: query.to_owned(),
                });
            }
            if fetched == 0 && page.has_more {
                return Err(QueryError::Protocol {
                    message: format!(
                        "page at offset {offset} was empty but Gerrit reported more results"
                    ),
                });
            }

            records.extend(page.records);
            tracing::debug!(
                "found metadata for {fetched} more patches, {} total so far",
                records.len()
            );
            self.telemetry.record(TelemetryEvent::PageFetched {
                offset,
                record_count: fetched,
                has_more: page.has_more,
            });

            if !page.has_more {
                break;
            }
            offset = offset.saturating_add(fetched);
        }

        records.sort_by_key(|change| change.created_on);
        Ok(records)
    }
}
