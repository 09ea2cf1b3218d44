//! Error types for local persistence operations.

use thiserror::Error;

/// Errors returned while reading or writing the result cache, or while
/// initialising and migrating the local `SQLite` database.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    /// The database URL/path was present but blank.
    #[error("database URL must not be blank")]
    BlankDatabaseUrl,

    /// The cache directory path was blank.
    #[error("cache directory must not be blank")]
    BlankCacheDirectory,

    /// The cache directory could not be created or opened.
    #[error("cache directory '{path}' is unavailable: {message}")]
    CacheDirectory {
        /// Directory that was requested.
        path: String,
        /// Error detail from the filesystem.
        message: String,
    },

    /// Establishing a `SQLite` connection failed.
    #[error("failed to connect to SQLite database: {message}")]
    ConnectionFailed {
        /// Error detail from Diesel.
        message: String,
    },

    /// Running pending migrations failed.
    #[error("failed to run database migrations: {message}")]
    MigrationFailed {
        /// Error detail from Diesel migrations.
        message: String,
    },

    /// Reading the schema version from the migration table failed.
    #[error("failed to read schema version after migrations: {message}")]
    SchemaVersionQueryFailed {
        /// Error detail from Diesel query execution.
        message: String,
    },

    /// The migrations completed but no schema version could be found.
    #[error("no schema version recorded after migrations ran")]
    MissingSchemaVersion,

    /// The cache table does not exist yet.
    #[error("result cache schema is not initialised (run with --migrate-db first)")]
    SchemaNotInitialised,

    /// Reading a cache entry failed.
    #[error("failed to read cache entry: {message}")]
    QueryFailed {
        /// Error detail from the storage backend.
        message: String,
    },

    /// Writing a cache entry failed.
    #[error("failed to write cache entry: {message}")]
    WriteFailed {
        /// Error detail from the storage backend.
        message: String,
    },

    /// A result set could not be serialised for storage.
    #[error("failed to serialise result set: {message}")]
    Serialisation {
        /// Error detail from `serde_json`.
        message: String,
    },
}
