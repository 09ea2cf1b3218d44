//! Result cache storing one JSON file per query.
//!
//! Files live in a single cache directory (created on first use) and are
//! named after the [`QueryKey`]. Writes go to a staging file that is then
//! renamed over the entry, so readers see either the previous set or the new
//! one in full.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use serde::{Deserialize, Serialize};

use crate::gerrit::{QueryKey, RecordSet};

use super::{PersistenceError, ResultCache};

/// On-disk layout of a cache entry.
#[derive(Debug, Deserialize)]
struct CacheEntry {
    query_key: QueryKey,
    records: RecordSet,
}

#[derive(Debug, Serialize)]
struct CacheEntryRef<'a> {
    query_key: &'a QueryKey,
    records: &'a RecordSet,
}

/// Filesystem-backed [`ResultCache`].
#[derive(Debug, Clone)]
pub struct FileResultCache {
    root: Utf8PathBuf,
}

impl FileResultCache {
    /// Create a cache rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::BlankCacheDirectory`] when `root` is blank.
    pub fn new(root: impl Into<Utf8PathBuf>) -> Result<Self, PersistenceError> {
        let root_dir = root.into();
        if root_dir.as_str().trim().is_empty() {
            return Err(PersistenceError::BlankCacheDirectory);
        }
        Ok(Self { root: root_dir })
    }

    /// Returns the cache directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn open_dir(&self) -> Result<Dir, PersistenceError> {
        let directory_error = |error: io::Error| PersistenceError::CacheDirectory {
            path: self.root.to_string(),
            message: error.to_string(),
        };
        Dir::create_ambient_dir_all(&self.root, ambient_authority()).map_err(directory_error)?;
        Dir::open_ambient_dir(&self.root, ambient_authority()).map_err(directory_error)
    }

    fn entry_name(key: &QueryKey) -> String {
        format!("{key}.json")
    }
}

impl ResultCache for FileResultCache {
    fn load(&self, key: &QueryKey) -> Result<Option<RecordSet>, PersistenceError> {
        let dir = self.open_dir()?;
        let name = Self::entry_name(key);

        let contents = match dir.read_to_string(&name) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(PersistenceError::QueryFailed {
                    message: format!("failed to read '{}/{name}': {error}", self.root),
                });
            }
        };

        match serde_json::from_str::<CacheEntry>(&contents) {
            Ok(entry) if entry.query_key == *key => Ok(Some(entry.records)),
            Ok(entry) => {
                tracing::warn!(
                    "cache file '{name}' belongs to key {}; ignoring it",
                    entry.query_key
                );
                Ok(None)
            }
            Err(error) => {
                tracing::warn!("ignoring unreadable cache file '{name}': {error}");
                Ok(None)
            }
        }
    }

    fn store(&self, key: &QueryKey, records: &RecordSet) -> Result<(), PersistenceError> {
        let dir = self.open_dir()?;
        let name = Self::entry_name(key);
        let staging = format!("{name}.partial");

        let entry = CacheEntryRef {
            query_key: key,
            records,
        };
        let payload =
            serde_json::to_vec(&entry).map_err(|error| PersistenceError::Serialisation {
                message: error.to_string(),
            })?;

        let write_error = |error: io::Error| PersistenceError::WriteFailed {
            message: format!("failed to write '{}/{name}': {error}", self.root),
        };
        dir.write(&staging, payload).map_err(write_error)?;
        dir.rename(&staging, &dir, &name).map_err(write_error)
    }
}
