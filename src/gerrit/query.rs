//! Query expressions and the cache keys derived from them.
//!
//! [`ReviewQuery`] assembles the Gerrit search expression used to select
//! changes (status, branch, project, and an age limit, joined with implicit
//! AND). [`QueryKey`] turns any query string into a filesystem-safe identity
//! for the result cache.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::QueryError;

/// Gerrit search expression selecting the changes to analyse.
///
/// # Example
///
/// ```
/// use rechecks::gerrit::ReviewQuery;
///
/// let query = ReviewQuery::new("master")
///     .with_project("openstack/neutron")
///     .newer_than_days(30);
/// assert_eq!(
///     query.to_string(),
///     "status:merged branch:master project:openstack/neutron -age:30d"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewQuery {
    status: String,
    branch: String,
    project: Option<String>,
    max_age_days: Option<u32>,
}

/// Review status searched when none is given.
pub const DEFAULT_STATUS: &str = "merged";

impl ReviewQuery {
    /// Creates a query for merged changes on `branch`.
    #[must_use]
    pub fn new(branch: impl Into<String>) -> Self {
        Self {
            status: DEFAULT_STATUS.to_owned(),
            branch: branch.into(),
            project: None,
            max_age_days: None,
        }
    }

    /// Overrides the review status (e.g. `open`, `abandoned`).
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// Restricts the query to a single project such as `openstack/neutron`.
    #[must_use]
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Only matches changes updated less than `days` days ago.
    #[must_use]
    pub const fn newer_than_days(mut self, days: u32) -> Self {
        self.max_age_days = Some(days);
        self
    }

    /// Returns the branch the query targets.
    #[must_use]
    pub fn branch(&self) -> &str {
        self.branch.as_str()
    }

    /// Returns the project filter, if any.
    #[must_use]
    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }
}

impl fmt::Display for ReviewQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status:{} branch:{}", self.status, self.branch)?;
        if let Some(project) = &self.project {
            write!(f, " project:{project}")?;
        }
        if let Some(days) = self.max_age_days {
            write!(f, " -age:{days}d")?;
        }
        Ok(())
    }
}

/// Filesystem-safe identity of a query, used to key the result cache.
///
/// Whitespace runs are collapsed so cosmetic differences map to the same key.
/// ASCII letters, digits, `-` and `_` are kept, a space becomes `+`, and
/// every other byte is percent-encoded. The encoding is reversible, so two
/// different queries never share a key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryKey(String);

impl QueryKey {
    /// Derives the cache key for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::BlankQuery`] when `query` holds only whitespace.
    pub fn from_query(query: &str) -> Result<Self, QueryError> {
        let words: Vec<&str> = query.split_whitespace().collect();
        if words.is_empty() {
            return Err(QueryError::BlankQuery);
        }

        let mut key = String::with_capacity(query.len());
        for (index, word) in words.iter().enumerate() {
            if index > 0 {
                key.push('+');
            }
            for byte in word.bytes() {
                push_escaped(&mut key, byte);
            }
        }
        Ok(Self(key))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn push_escaped(key: &mut String, byte: u8) {
    if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
        key.push(char::from(byte));
        return;
    }
    key.push('%');
    key.push(hex_digit(byte >> 4));
    key.push(hex_digit(byte & 0x0f));
}

fn hex_digit(nibble: u8) -> char {
    char::from_digit(u32::from(nibble), 16).map_or('0', |digit| digit.to_ascii_uppercase())
}
