//! Executors that run one page of a Gerrit query.
//!
//! The [`QueryExecutor`] trait is the seam between the pagination logic and
//! the transport used to reach Gerrit, so tests can substitute a mock while
//! [`SshQueryExecutor`] shells out to `ssh ... gerrit query`.

mod ssh;

pub use ssh::{DEFAULT_SSH_PORT, SshQueryExecutor, parse_query_output};

use super::error::QueryError;
use super::models::Change;

/// One page of query results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPage {
    /// Changes on this page, in the order Gerrit returned them.
    pub records: Vec<Change>,
    /// Whether Gerrit reported further results after this page.
    pub has_more: bool,
}

/// Runs a single page of a query against the review service.
#[cfg_attr(test, mockall::automock)]
pub trait QueryExecutor: Send + Sync {
    /// Fetches the page of results for `query` starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Transport`] when the service cannot be reached
    /// and [`QueryError::Protocol`] when its answer cannot be understood.
    fn fetch_page(&self, query: &str, offset: usize) -> Result<QueryPage, QueryError>;
}

#[cfg(test)]
mod tests;
