//! Result cache backed by `SQLite`.
//!
//! Each query's result set is stored as a single JSON payload row keyed by
//! its [`QueryKey`]. Writes are upserts, so the latest fetch always wins and
//! readers never observe a mix of two fetches.

use std::time::{SystemTime, UNIX_EPOCH};

use diesel::OptionalExtension;
use diesel::QueryableByName;
use diesel::RunQueryDsl;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Text};
use diesel::sqlite::SqliteConnection;

use crate::gerrit::{QueryKey, RecordSet};

use super::migrator::{connect, result_cache_table_exists};
use super::{PersistenceError, ResultCache};

/// SQLite-backed [`ResultCache`].
#[derive(Debug, Clone)]
pub struct SqliteResultCache {
    database_url: String,
}

impl SqliteResultCache {
    /// Create a cache wrapper targeting the configured `database_url`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::BlankDatabaseUrl`] when the URL is blank.
    pub fn new(database_url: impl Into<String>) -> Result<Self, PersistenceError> {
        let database_url_string = database_url.into();
        if database_url_string.trim().is_empty() {
            return Err(PersistenceError::BlankDatabaseUrl);
        }
        Ok(Self {
            database_url: database_url_string,
        })
    }

    /// Returns the current unix timestamp in seconds.
    #[must_use]
    pub fn now_unix_seconds() -> i64 {
        // A clock set before the epoch yields 0; overflow saturates.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .map_or(0, |duration| {
                i64::try_from(duration.as_secs()).unwrap_or(i64::MAX)
            })
    }

    fn establish_connection(&self) -> Result<SqliteConnection, PersistenceError> {
        connect(&self.database_url)
    }

    fn map_error_with_schema_check<F>(
        connection: &mut SqliteConnection,
        error: &diesel::result::Error,
        create_error: F,
    ) -> PersistenceError
    where
        F: Fn(String) -> PersistenceError,
    {
        match result_cache_table_exists(connection) {
            Ok(false) => PersistenceError::SchemaNotInitialised,
            Ok(true) => create_error(error.to_string()),
            Err(check_error) => create_error(format!(
                "schema presence check failed: {check_error}; original error: {error}"
            )),
        }
    }
}

impl ResultCache for SqliteResultCache {
    fn load(&self, key: &QueryKey) -> Result<Option<RecordSet>, PersistenceError> {
        #[derive(Debug, QueryableByName)]
        struct Row {
            #[diesel(sql_type = Text)]
            payload: String,
        }

        let mut connection = self.establish_connection()?;

        let result: Option<Row> =
            sql_query("SELECT payload FROM result_cache WHERE query_key = ? LIMIT 1;")
                .bind::<Text, _>(key.as_str())
                .get_result(&mut connection)
                .optional()
                .map_err(|error| {
                    Self::map_error_with_schema_check(&mut connection, &error, |message| {
                        PersistenceError::QueryFailed { message }
                    })
                })?;

        let Some(row) = result else {
            return Ok(None);
        };

        match serde_json::from_str::<RecordSet>(&row.payload) {
            Ok(records) => Ok(Some(records)),
            Err(error) => {
                tracing::warn!("ignoring unreadable cache row for key {key}: {error}");
                Ok(None)
            }
        }
    }

    fn store(&self, key: &QueryKey, records: &RecordSet) -> Result<(), PersistenceError> {
        let payload =
            serde_json::to_string(records).map_err(|error| PersistenceError::Serialisation {
                message: error.to_string(),
            })?;
        let record_count = i64::try_from(records.len()).unwrap_or(i64::MAX);

        let mut connection = self.establish_connection()?;

        sql_query(
            "INSERT INTO result_cache (query_key, payload, record_count, stored_at_unix) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT(query_key) DO UPDATE SET \
               payload = excluded.payload, \
               record_count = excluded.record_count, \
               stored_at_unix = excluded.stored_at_unix, \
               updated_at = CURRENT_TIMESTAMP;",
        )
        .bind::<Text, _>(key.as_str())
        .bind::<Text, _>(payload.as_str())
        .bind::<BigInt, _>(record_count)
        .bind::<BigInt, _>(Self::now_unix_seconds())
        .execute(&mut connection)
        .map(drop)
        .map_err(|error| {
            Self::map_error_with_schema_check(&mut connection, &error, |message| {
                PersistenceError::WriteFailed { message }
            })
        })
    }
}
