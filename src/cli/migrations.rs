//! Database migration operations.

use rechecks::persistence::{PersistenceError, migrate_database};
use rechecks::telemetry::StderrJsonlTelemetrySink;
use rechecks::{QueryError, RechecksConfig};

/// Runs database migrations.
///
/// # Errors
///
/// Returns [`QueryError::Configuration`] if the database URL is missing or blank.
/// Returns [`QueryError::Io`] for connection or migration failures.
pub fn run(config: &RechecksConfig) -> Result<(), QueryError> {
    let database_url = config.require_database_url()?;

    let telemetry = StderrJsonlTelemetrySink;
    migrate_database(database_url, &telemetry)
        .map(drop)
        .map_err(|error| map_persistence_error(&error))
}

/// Maps a persistence error to a query error.
///
/// A blank URL becomes [`QueryError::Configuration`], while runtime errors
/// (connection, migration, query failures) become [`QueryError::Io`].
fn map_persistence_error(error: &PersistenceError) -> QueryError {
    if is_configuration_error(error) {
        QueryError::Configuration {
            message: error.to_string(),
        }
    } else {
        QueryError::Io {
            message: error.to_string(),
        }
    }
}

/// Returns true if the persistence error is a configuration problem.
const fn is_configuration_error(error: &PersistenceError) -> bool {
    matches!(error, PersistenceError::BlankDatabaseUrl)
}
