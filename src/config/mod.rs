//! Application configuration loaded from CLI, environment, and files.
//!
//! This module provides a unified configuration struct that merges values
//! from command-line arguments, environment variables, and configuration
//! files using ortho-config's layered approach.
//!
//! # Precedence
//!
//! Configuration values are loaded with the following precedence (lowest to
//! highest):
//!
//! 1. **Defaults** – Built-in application defaults
//! 2. **Configuration file** – `.rechecks.toml` in current directory, home
//!    directory, or XDG config directory
//! 3. **Environment variables** – `RECHECKS_BRANCH`, `RECHECKS_PROJECT`, ...
//! 4. **Command-line arguments** – `--branch`/`-b`, `--project`/`-p`, ...
//!
//! # Configuration File
//!
//! ```toml
//! branch = "master"
//! project = "openstack/neutron"
//! newer_than = 90
//! time_window = "month"
//! report_format = "csv"
//! review_user = "jdoe"
//! ```

use std::fmt;
use std::str::FromStr;

use ortho_config::OrthoConfig;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::analysis::{
    DEFAULT_CI_IDENTITY, OutcomeExtractor, TimeWindow, UnknownTimeWindow, ZuulGrammar,
};
use crate::gerrit::query::DEFAULT_STATUS;
use crate::gerrit::{CacheMode, DEFAULT_SSH_PORT, QueryError, ReviewQuery};

/// Gerrit instance queried when none is configured.
pub const DEFAULT_REVIEW_HOST: &str = "review.opendev.org";
/// Branch analysed when none is configured.
pub const DEFAULT_BRANCH: &str = "master";
/// Directory holding file cache entries when no database is configured.
pub const DEFAULT_CACHE_DIR: &str = "cache";

/// How the final table is written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// Aligned, human-readable columns.
    #[default]
    Human,
    /// Comma-separated values with a header row.
    Csv,
}

impl FromStr for ReportFormat {
    type Err = QueryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "csv" => Ok(Self::Csv),
            _ => Err(QueryError::Configuration {
                message: format!("unknown report format '{value}'; expected human or csv"),
            }),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Human => f.write_str("human"),
            Self::Csv => f.write_str("csv"),
        }
    }
}

/// Application configuration supporting CLI, environment, and file sources.
///
/// # Example
///
/// ```no_run
/// use ortho_config::OrthoConfig;
/// use rechecks::RechecksConfig;
///
/// let config = RechecksConfig::load().expect("failed to load configuration");
/// let query = config.review_query().expect("query should build");
/// println!("{query}");
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(
    prefix = "RECHECKS",
    discovery(
        dotfile_name = ".rechecks.toml",
        config_file_name = "rechecks.toml",
        app_name = "rechecks"
    )
)]
pub struct RechecksConfig {
    /// Branch whose merged changes are analysed.
    ///
    /// Can be provided via:
    /// - CLI: `--branch <BRANCH>` or `-b <BRANCH>`
    /// - Environment: `RECHECKS_BRANCH`
    /// - Config file: `branch = "..."`
    #[ortho_config(cli_short = 'b')]
    pub branch: String,

    /// Restricts the query to one project, e.g. `openstack/neutron`.
    #[ortho_config(cli_short = 'p')]
    pub project: Option<String>,

    /// Review status to search for.
    #[ortho_config(cli_short = 's')]
    pub status: String,

    /// Only considers changes updated within this many days.
    #[ortho_config(cli_short = 'a')]
    pub newer_than: Option<u32>,

    /// Calendar window used to bucket results: `week`, `month` or `year`.
    #[ortho_config(cli_short = 'w')]
    pub time_window: String,

    /// Output format: `human` or `csv`.
    #[ortho_config(cli_short = 'f')]
    pub report_format: String,

    /// Ignores cached results and queries Gerrit again.
    ///
    /// The fresh result set still replaces the cache entry.
    #[ortho_config(cli_short = 'n')]
    pub no_cache: bool,

    /// Enables debug logging on stderr.
    #[ortho_config(cli_short = 'v')]
    pub verbose: bool,

    /// Writes telemetry events to stderr as JSON lines.
    #[ortho_config(cli_short = 'T')]
    pub telemetry: bool,

    /// Directory used by the file cache.
    #[ortho_config(cli_short = 'c')]
    pub cache_dir: String,

    /// Local `SQLite` database path. When set, results are cached there
    /// instead of in `cache_dir`.
    ///
    /// Can be provided via:
    /// - CLI: `--database-url <PATH>`
    /// - Environment: `RECHECKS_DATABASE_URL`
    /// - Config file: `database_url = "..."`
    #[ortho_config(cli_short = 'd')]
    pub database_url: Option<String>,

    /// Runs database migrations and exits.
    ///
    /// When set, Rechecks initialises the database at `database_url`, applies
    /// any pending Diesel migrations, records the schema version in telemetry,
    /// and exits without querying Gerrit.
    #[ortho_config(cli_short = 'm')]
    pub migrate_db: bool,

    /// Gerrit host reached over SSH.
    #[ortho_config(cli_short = 'H')]
    pub review_host: String,

    /// Gerrit SSH port.
    #[ortho_config(cli_short = 'P')]
    pub review_port: u16,

    /// SSH user name; the local SSH configuration decides when unset.
    #[ortho_config(cli_short = 'u')]
    pub review_user: Option<String>,

    /// Account name whose comments carry CI results.
    #[ortho_config(cli_short = 'i')]
    pub ci_identity: String,

    /// Reports average job run times instead of build failures.
    #[ortho_config(cli_short = 'j')]
    pub job_times: bool,

    /// With `job_times`, only reports jobs whose name matches this pattern
    /// from its first character.
    #[ortho_config(cli_short = 'J')]
    pub job_name_regex: Option<String>,
}

impl Default for RechecksConfig {
    fn default() -> Self {
        Self {
            branch: DEFAULT_BRANCH.to_owned(),
            project: None,
            status: DEFAULT_STATUS.to_owned(),
            newer_than: None,
            time_window: TimeWindow::default().to_string(),
            report_format: ReportFormat::default().to_string(),
            no_cache: false,
            verbose: false,
            telemetry: false,
            cache_dir: DEFAULT_CACHE_DIR.to_owned(),
            database_url: None,
            migrate_db: false,
            review_host: DEFAULT_REVIEW_HOST.to_owned(),
            review_port: DEFAULT_SSH_PORT,
            review_user: None,
            ci_identity: DEFAULT_CI_IDENTITY.to_owned(),
            job_times: false,
            job_name_regex: None,
        }
    }
}

impl RechecksConfig {
    /// Builds the Gerrit search expression from the query fields.
    ///
    /// A blank project is treated as unset.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Configuration`] when the branch or status is
    /// blank.
    pub fn review_query(&self) -> Result<ReviewQuery, QueryError> {
        let branch = require_non_blank("branch", &self.branch)?;
        let status = require_non_blank("status", &self.status)?;

        let mut query = ReviewQuery::new(branch).with_status(status);
        if let Some(project) = self
            .project
            .as_deref()
            .map(str::trim)
            .filter(|project| !project.is_empty())
        {
            query = query.with_project(project);
        }
        if let Some(days) = self.newer_than {
            query = query.newer_than_days(days);
        }
        Ok(query)
    }

    /// Parses the configured time window.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Configuration`] for names other than `week`,
    /// `month` or `year`.
    pub fn time_window(&self) -> Result<TimeWindow, QueryError> {
        self.time_window
            .parse()
            .map_err(|error: UnknownTimeWindow| QueryError::Configuration {
                message: error.to_string(),
            })
    }

    /// Parses the configured report format.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Configuration`] for formats other than `human`
    /// or `csv`.
    pub fn report_format(&self) -> Result<ReportFormat, QueryError> {
        self.report_format.parse()
    }

    /// Returns whether cached results may be reused.
    #[must_use]
    pub const fn cache_mode(&self) -> CacheMode {
        if self.no_cache {
            CacheMode::Refresh
        } else {
            CacheMode::UseCache
        }
    }

    /// Builds the extractor that counts failures posted by `ci_identity`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Configuration`] when the CI identity is blank.
    pub fn outcome_extractor(&self) -> Result<OutcomeExtractor, QueryError> {
        let identity = require_non_blank("ci_identity", &self.ci_identity)?;
        Ok(OutcomeExtractor::new(identity, ZuulGrammar))
    }

    /// Compiles the job name filter, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Configuration`] when the pattern is not a valid
    /// regular expression.
    pub fn job_filter(&self) -> Result<Option<Regex>, QueryError> {
        self.job_name_regex
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|error| QueryError::Configuration {
                    message: format!("invalid job name pattern '{pattern}': {error}"),
                })
            })
            .transpose()
    }

    /// Returns the database URL, or an error when migrations were requested
    /// without one.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Configuration`] when `database_url` is unset.
    pub fn require_database_url(&self) -> Result<&str, QueryError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| QueryError::Configuration {
                message: "database URL is required (use --database-url)".to_owned(),
            })
    }
}

fn require_non_blank<'value>(field: &str, value: &'value str) -> Result<&'value str, QueryError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(QueryError::Configuration {
            message: format!("{field} must not be blank"),
        });
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests;
