//! Gerrit change intake.
//!
//! This module builds Gerrit search expressions, runs them page by page
//! through a [`QueryExecutor`], and assembles the complete, creation-ordered
//! result set, optionally answering from a [`crate::persistence::ResultCache`].
//! Failures are mapped into [`QueryError`] so callers can tell an unreachable
//! server from a query that matched nothing.

pub mod error;
pub mod executor;
pub mod intake;
pub mod models;
pub mod pagination;
pub mod query;

pub use error::QueryError;
pub use executor::{DEFAULT_SSH_PORT, QueryExecutor, QueryPage, SshQueryExecutor};
pub use intake::{CacheMode, ChangeIntake};
pub use models::{Approval, Change, RecordSet, ReviewerComment};
pub use pagination::Paginator;
pub use query::{QueryKey, ReviewQuery};

#[cfg(test)]
pub use executor::MockQueryExecutor;

#[cfg(test)]
mod tests;
