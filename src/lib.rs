//! Rechecks library crate measuring how often CI fails merged Gerrit changes.
//!
//! The library queries a Gerrit review server page by page, caches each
//! complete result set locally, counts the `Build failed` comments Zuul left
//! on every change's final patch set, and averages those counts per ISO
//! week, month or year of submission. The same windowing can report the mean
//! run time of individual CI jobs.

pub mod analysis;
pub mod config;
pub mod gerrit;
pub mod persistence;
pub mod pipeline;
pub mod telemetry;

pub use analysis::{
    AggregateTable, BucketKey, OutcomeExtractor, Point, TimeWindow, aggregate_points,
    collect_points, job_duration_tables,
};
pub use config::{RechecksConfig, ReportFormat};
pub use gerrit::{
    CacheMode, Change, ChangeIntake, QueryError, QueryExecutor, QueryKey, RecordSet, ReviewQuery,
    SshQueryExecutor,
};
pub use persistence::{FileResultCache, PersistenceError, ResultCache, SqliteResultCache};
pub use pipeline::{Report, build_report};
