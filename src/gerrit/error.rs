//! Error types exposed by the Gerrit query layer.

use thiserror::Error;

use crate::persistence::PersistenceError;

/// Exit status used for failures without a dedicated code.
pub const EXIT_GENERIC_FAILURE: u8 = 1;
/// Exit status used when a query matched no changes.
pub const EXIT_NO_RECORDS: u8 = 2;
/// Exit status used when no data point could be derived from the changes.
pub const EXIT_NO_POINTS: u8 = 3;

/// Errors surfaced while querying Gerrit or deriving statistics from the
/// fetched changes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    /// The query expression was empty once whitespace was removed.
    #[error("query expression must not be blank")]
    BlankQuery,

    /// Running the remote query failed at the process or network level.
    #[error("transport error talking to Gerrit: {message}")]
    Transport {
        /// Transport-level error detail, usually the remote stderr.
        message: String,
    },

    /// Gerrit answered, but the answer did not follow the expected format.
    #[error("unexpected response from Gerrit: {message}")]
    Protocol {
        /// What was wrong with the response.
        message: String,
    },

    /// The first page of a query came back empty.
    #[error("no patches found for query: {query}")]
    EmptyResult {
        /// The query expression that matched nothing.
        query: String,
    },

    /// Changes were fetched but none yielded a usable data point.
    #[error(
        "could not resolve any data points from {record_count} patches; \
         their timestamps are likely bogus"
    )]
    UnresolvablePoints {
        /// Number of changes that were inspected.
        record_count: usize,
    },

    /// The result cache could not be read or written.
    #[error("result cache error: {0}")]
    Cache(#[from] PersistenceError),

    /// Configuration could not be loaded or is inconsistent.
    #[error("configuration error: {message}")]
    Configuration {
        /// Details about the configuration failure.
        message: String,
    },

    /// Local I/O operation failed.
    #[error("I/O error: {message}")]
    Io {
        /// Error detail from the underlying I/O operation.
        message: String,
    },
}

impl QueryError {
    /// Process exit status that lets automation tell fatal conditions apart.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::EmptyResult { .. } => EXIT_NO_RECORDS,
            Self::UnresolvablePoints { .. } => EXIT_NO_POINTS,
            _ => EXIT_GENERIC_FAILURE,
        }
    }
}
