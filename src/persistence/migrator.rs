//! Schema management for the `SQLite` result cache.
//!
//! Migrations are embedded in the binary. After they run, the cache table is
//! checked for presence so a database that reports a version but lacks the
//! table is caught here rather than on the first cache read.

use diesel::Connection;
use diesel::OptionalExtension;
use diesel::QueryableByName;
use diesel::RunQueryDsl;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Text};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

use crate::telemetry::{TelemetryEvent, TelemetrySink};

use super::PersistenceError;

/// Embedded Diesel migrations shipped with the binary.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Schema version recorded by the migration creating the `result_cache` table.
pub const INITIAL_SCHEMA_VERSION: &str = "20261001000000";

/// Table holding one JSON payload per query key.
const RESULT_CACHE_TABLE: &str = "result_cache";

/// A Diesel migration version string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaVersion(String);

impl SchemaVersion {
    /// Returns the inner version string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Creates or upgrades the result cache schema at `database_url` and records
/// the resulting schema version in telemetry.
///
/// Running it against an up-to-date database applies nothing and reports the
/// current version again.
///
/// # Errors
///
/// Returns [`PersistenceError`] when the database cannot be opened, a
/// migration fails, the cache table is still missing afterwards, or no
/// schema version can be read.
pub fn migrate_database(
    database_url: &str,
    telemetry: &dyn TelemetrySink,
) -> Result<SchemaVersion, PersistenceError> {
    let mut connection = connect(database_url)?;

    let applied = connection
        .run_pending_migrations(MIGRATIONS)
        .map_err(|error| PersistenceError::MigrationFailed {
            message: error.to_string(),
        })?;
    tracing::debug!("applied {} pending migration(s)", applied.len());

    let table_present = result_cache_table_exists(&mut connection).map_err(|error| {
        PersistenceError::MigrationFailed {
            message: format!("cache table check failed: {error}"),
        }
    })?;
    if !table_present {
        return Err(PersistenceError::SchemaNotInitialised);
    }

    let schema_version = latest_schema_version(&mut connection)?;
    tracing::info!("result cache schema at version {}", schema_version.as_str());
    telemetry.record(TelemetryEvent::SchemaVersionRecorded {
        schema_version: schema_version.as_str().to_owned(),
    });

    Ok(schema_version)
}

/// Opens a connection to `database_url`, rejecting blank URLs.
pub(crate) fn connect(database_url: &str) -> Result<SqliteConnection, PersistenceError> {
    let trimmed = database_url.trim();
    if trimmed.is_empty() {
        return Err(PersistenceError::BlankDatabaseUrl);
    }

    SqliteConnection::establish(trimmed).map_err(|error| PersistenceError::ConnectionFailed {
        message: error.to_string(),
    })
}

/// Returns true when the `result_cache` table exists on `connection`.
pub(crate) fn result_cache_table_exists(
    connection: &mut SqliteConnection,
) -> Result<bool, diesel::result::Error> {
    #[derive(Debug, QueryableByName)]
    struct TableCount {
        #[diesel(sql_type = BigInt)]
        count: i64,
    }

    let row: TableCount = sql_query(
        "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = ?;",
    )
    .bind::<Text, _>(RESULT_CACHE_TABLE)
    .get_result(connection)?;

    Ok(row.count > 0)
}

fn latest_schema_version(
    connection: &mut SqliteConnection,
) -> Result<SchemaVersion, PersistenceError> {
    #[derive(Debug, QueryableByName)]
    struct VersionRow {
        #[diesel(sql_type = Text)]
        version: String,
    }

    sql_query("SELECT version FROM __diesel_schema_migrations ORDER BY version DESC LIMIT 1;")
        .get_result::<VersionRow>(connection)
        .optional()
        .map_err(|error| PersistenceError::SchemaVersionQueryFailed {
            message: error.to_string(),
        })?
        .map(|row| SchemaVersion(row.version))
        .ok_or(PersistenceError::MissingSchemaVersion)
}
