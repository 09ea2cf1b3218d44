//! High-level intake facade used by the CLI.

use super::error::QueryError;
use super::executor::QueryExecutor;
use super::models::RecordSet;
use super::pagination::Paginator;
use super::query::QueryKey;
use crate::persistence::ResultCache;
use crate::telemetry::{NoopTelemetrySink, TelemetryEvent, TelemetrySink};

/// Whether a load may be answered from the result cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Reuse a cached result set when one exists.
    #[default]
    UseCache,
    /// Always query Gerrit, then overwrite the cache entry.
    Refresh,
}

/// Loads the complete result set for a query, consulting the cache first.
pub struct ChangeIntake<'a, Executor, Cache>
where
    Executor: QueryExecutor + ?Sized,
    Cache: ResultCache + ?Sized,
{
    executor: &'a Executor,
    cache: &'a Cache,
    telemetry: &'a dyn TelemetrySink,
}

impl<'a, Executor, Cache> ChangeIntake<'a, Executor, Cache>
where
    Executor: QueryExecutor + ?Sized,
    Cache: ResultCache + ?Sized,
{
    /// Create a new intake facade using the provided executor and cache.
    #[must_use]
    pub const fn new(executor: &'a Executor, cache: &'a Cache) -> Self {
        Self {
            executor,
            cache,
            telemetry: &NoopTelemetrySink,
        }
    }

    /// Records cache and pagination events to `telemetry`.
    #[must_use]
    pub const fn with_telemetry(mut self, telemetry: &'a dyn TelemetrySink) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Load every change matching `query`.
    ///
    /// With [`CacheMode::UseCache`] a non-empty cached set is returned as is.
    /// Otherwise all pages are fetched and the complete set replaces the
    /// cache entry. A failed or empty fetch leaves the cache untouched.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::BlankQuery`] for a blank query,
    /// [`QueryError::Cache`] when the cache cannot be read or written, and
    /// propagates pagination failures such as [`QueryError::EmptyResult`].
    pub fn load(&self, query: &str, mode: CacheMode) -> Result<RecordSet, QueryError> {
        let key = QueryKey::from_query(query)?;

        if mode == CacheMode::UseCache {
            tracing::debug!("using cached data for key {key}");
            if let Some(records) = self.cache.load(&key)?.filter(|records| !records.is_empty()) {
                tracing::info!("loaded {} patches from cache", records.len());
                self.telemetry.record(TelemetryEvent::CacheHit {
                    query_key: key.as_str().to_owned(),
                    record_count: records.len(),
                });
                return Ok(records);
            }
        }

        tracing::debug!("fetching data from gerrit with query: {query}");
        let records = Paginator::new(self.executor)
            .with_telemetry(self.telemetry)
            .fetch_all(query)?;

        self.cache.store(&key, &records)?;
        tracing::info!("cached {} patches under key {key}", records.len());
        self.telemetry.record(TelemetryEvent::CacheStored {
            query_key: key.as_str().to_owned(),
            record_count: records.len(),
        });
        Ok(records)
    }
}
