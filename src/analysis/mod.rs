//! Turns fetched changes into per-window statistics.
//!
//! The flow is: [`OutcomeExtractor`] counts CI build failures per change,
//! [`resolve_submission`] dates each change, [`collect_points`] pairs the
//! two, and [`aggregate_points`] averages the points per [`TimeWindow`].
//! [`job_duration_tables`] applies the same windowing to job run times.

pub mod aggregate;
pub mod job_timing;
pub mod outcome;
pub mod points;
pub mod submission;

pub use aggregate::{
    AggregateTable, BucketKey, TimeWindow, UnknownTimeWindow, aggregate, aggregate_points,
};
pub use job_timing::{
    JobResult, format_human_duration, job_duration_tables, latest_verdict_comment,
    parse_human_duration, parse_job_results,
};
pub use outcome::{DEFAULT_CI_IDENTITY, OutcomeExtractor, OutcomeGrammar, ZuulGrammar};
pub use points::{Point, collect_points};
pub use submission::resolve_submission;
