//! Per-change data points fed to aggregation.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::outcome::{OutcomeExtractor, OutcomeGrammar};
use super::submission::resolve_submission;
use crate::gerrit::{Change, QueryError};

/// Build failures of one change, dated by its submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Point {
    /// Gerrit change identifier.
    pub change_id: String,
    /// When the change was submitted.
    pub submitted_at: DateTime<Utc>,
    /// Failed CI builds on the final patch set.
    pub build_failures: u32,
}

/// Derives one point per change, keeping the order of `records`.
///
/// Changes whose submission time cannot be represented as a date are
/// skipped with a warning.
///
/// # Errors
///
/// Returns [`QueryError::UnresolvablePoints`] when no change yields a point.
pub fn collect_points<Grammar>(
    records: &[Change],
    extractor: &OutcomeExtractor<Grammar>,
) -> Result<Vec<Point>, QueryError>
where
    Grammar: OutcomeGrammar,
{
    let points: Vec<Point> = records
        .iter()
        .filter_map(|change| {
            let submitted = resolve_submission(change);
            let Some(submitted_at) = DateTime::from_timestamp(submitted, 0) else {
                tracing::debug!(
                    "skipping patch {}: submission timestamp {submitted} is out of range",
                    change.id
                );
                return None;
            };
            Some(Point {
                change_id: change.id.clone(),
                submitted_at,
                build_failures: extractor.extract(change),
            })
        })
        .collect();

    if points.is_empty() {
        return Err(QueryError::UnresolvablePoints {
            record_count: records.len(),
        });
    }
    Ok(points)
}
