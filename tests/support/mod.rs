//! Shared test utilities.

use std::collections::VecDeque;
use std::sync::Mutex;

use rechecks::gerrit::{QueryError, QueryExecutor, QueryPage};
use tempfile::TempDir;

/// Creates a temporary directory for cache and database tests.
///
/// # Panics
///
/// Panics if the temporary directory cannot be created.
pub fn create_temp_dir() -> TempDir {
    TempDir::new().unwrap_or_else(|error| panic!("failed to create temporary directory: {error}"))
}

/// Executor replaying a fixed list of page responses.
///
/// Once the script is exhausted, every further call fails with a transport
/// error, so a test can assert that a run never reached Gerrit.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    responses: Mutex<VecDeque<Result<QueryPage, QueryError>>>,
    offsets: Mutex<Vec<usize>>,
}

impl ScriptedExecutor {
    /// Replays `responses` in order.
    pub fn new(responses: impl IntoIterator<Item = Result<QueryPage, QueryError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            offsets: Mutex::new(Vec::new()),
        }
    }

    /// Returns the offsets requested so far.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn offsets(&self) -> Vec<usize> {
        self.offsets
            .lock()
            .unwrap_or_else(|error| panic!("offsets lock poisoned: {error}"))
            .clone()
    }
}

impl QueryExecutor for ScriptedExecutor {
    fn fetch_page(&self, _query: &str, offset: usize) -> Result<QueryPage, QueryError> {
        self.offsets
            .lock()
            .unwrap_or_else(|error| panic!("offsets lock poisoned: {error}"))
            .push(offset);
        self.responses
            .lock()
            .unwrap_or_else(|error| panic!("responses lock poisoned: {error}"))
            .pop_front()
            .unwrap_or_else(|| {
                Err(QueryError::Transport {
                    message: "no scripted response left".to_owned(),
                })
            })
    }
}
