//! End-to-end run: configuration in, aggregated report out.

use std::collections::BTreeMap;

use crate::analysis::{AggregateTable, aggregate_points, collect_points, job_duration_tables};
use crate::config::RechecksConfig;
use crate::gerrit::{ChangeIntake, QueryError, QueryExecutor};
use crate::persistence::ResultCache;

/// Result of one run.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    /// Average failed builds per change, per window.
    BuildFailures(AggregateTable),
    /// Average run time in seconds per window, keyed by job name.
    JobTimes(BTreeMap<String, AggregateTable>),
}

/// Loads the changes selected by `config` through `intake` and aggregates
/// them.
///
/// Every configuration value is validated before Gerrit or the cache is
/// touched.
///
/// # Errors
///
/// Returns [`QueryError::Configuration`] for invalid settings,
/// [`QueryError::EmptyResult`] when the query matches nothing,
/// [`QueryError::UnresolvablePoints`] when no change can be dated, and
/// propagates transport and cache failures.
pub fn build_report<Executor, Cache>(
    config: &RechecksConfig,
    intake: &ChangeIntake<'_, Executor, Cache>,
) -> Result<Report, QueryError>
where
    Executor: QueryExecutor + ?Sized,
    Cache: ResultCache + ?Sized,
{
    let query = config.review_query()?.to_string();
    let window = config.time_window()?;
    let extractor = config.outcome_extractor()?;
    let job_filter = config.job_filter()?;

    let records = intake.load(&query, config.cache_mode())?;
    tracing::info!("analysing {} patches matching {query}", records.len());

    if config.job_times {
        return Ok(Report::JobTimes(job_duration_tables(
            &records,
            &extractor,
            window,
            job_filter.as_ref(),
        )));
    }

    let points = collect_points(&records, &extractor)?;
    Ok(Report::BuildFailures(aggregate_points(&points, window)))
}
