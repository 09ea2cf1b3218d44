//! Result caching and database migrations.
//!
//! A query's complete result set is cached under its [`QueryKey`] so repeated
//! runs against the same project and time range do not hit Gerrit again.
//! Entries never expire; they are replaced wholesale on a forced refresh.
//! Two interchangeable backends implement [`ResultCache`]: one JSON file per
//! query in a cache directory, or a row per query in a local `SQLite`
//! database whose schema is managed with Diesel migrations.

mod error;
mod file_cache;
mod migrator;
mod result_cache;

pub use error::PersistenceError;
pub use file_cache::FileResultCache;
pub use migrator::{INITIAL_SCHEMA_VERSION, SchemaVersion, migrate_database};
pub use result_cache::SqliteResultCache;

use crate::gerrit::{QueryKey, RecordSet};

/// Key-value store holding one complete result set per query.
pub trait ResultCache {
    /// Returns the cached result set for `key`, or `None` when there is no
    /// usable entry. An entry that cannot be decoded in full counts as
    /// absent; a partial set is never returned.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the storage itself is unavailable.
    fn load(&self, key: &QueryKey) -> Result<Option<RecordSet>, PersistenceError>;

    /// Replaces the entry for `key` with `records`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the entry cannot be written.
    fn store(&self, key: &QueryKey, records: &RecordSet) -> Result<(), PersistenceError>;
}
