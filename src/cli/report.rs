//! Statistics report over merged Gerrit changes.

use rechecks::telemetry::{NoopTelemetrySink, StderrJsonlTelemetrySink, TelemetrySink};
use rechecks::{
    ChangeIntake, FileResultCache, QueryError, RechecksConfig, ResultCache, SqliteResultCache,
    SshQueryExecutor, build_report,
};

use super::output::write_report;

/// Queries Gerrit (or the cache), aggregates the results, and prints them.
///
/// # Errors
///
/// Returns [`QueryError`] for invalid configuration, unreachable services,
/// empty results, and output failures.
pub fn run(config: &RechecksConfig) -> Result<(), QueryError> {
    let format = config.report_format()?;
    let cache = open_cache(config)?;
    let telemetry = telemetry_sink(config);
    let executor = executor(config);

    let intake = ChangeIntake::new(&executor, cache.as_ref()).with_telemetry(telemetry.as_ref());
    let report = build_report(config, &intake)?;

    write_report(&report, format)
}

/// Selects the `SQLite` cache when a database is configured, otherwise the
/// file cache under `cache_dir`.
fn open_cache(config: &RechecksConfig) -> Result<Box<dyn ResultCache>, QueryError> {
    if let Some(database_url) = config.database_url.as_deref() {
        tracing::debug!("caching results in SQLite database {database_url}");
        return Ok(Box::new(SqliteResultCache::new(database_url)?));
    }
    tracing::debug!("caching results under {}", config.cache_dir);
    Ok(Box::new(FileResultCache::new(config.cache_dir.as_str())?))
}

fn telemetry_sink(config: &RechecksConfig) -> Box<dyn TelemetrySink> {
    if config.telemetry {
        Box::new(StderrJsonlTelemetrySink)
    } else {
        Box::new(NoopTelemetrySink)
    }
}

fn executor(config: &RechecksConfig) -> SshQueryExecutor {
    let executor = SshQueryExecutor::new(config.review_host.as_str(), config.review_port);
    match config.review_user.as_deref() {
        Some(user) => executor.with_user(user),
        None => executor,
    }
}

#[cfg(test)]
mod tests {
    use rechecks::{QueryError, RechecksConfig, SshQueryExecutor};
    use rstest::rstest;

    use super::{executor, open_cache, run};

    #[rstest]
    fn invalid_settings_fail_before_any_query() {
        let config = RechecksConfig {
            report_format: "png".to_owned(),
            review_host: "invalid.example".to_owned(),
            ..Default::default()
        };

        let result = run(&config);

        assert!(
            matches!(result, Err(QueryError::Configuration { .. })),
            "expected Configuration error, got {result:?}"
        );
    }

    #[rstest]
    fn blank_cache_directory_is_rejected() {
        let config = RechecksConfig {
            cache_dir: " ".to_owned(),
            ..Default::default()
        };

        assert!(
            matches!(open_cache(&config), Err(QueryError::Cache(_))),
            "blank cache directory should be rejected"
        );
    }

    #[rstest]
    #[case::default_account(None, SshQueryExecutor::new("review.example.org", 2222))]
    #[case::named_account(
        Some("ci-stats"),
        SshQueryExecutor::new("review.example.org", 2222).with_user("ci-stats")
    )]
    fn executor_targets_configured_account(
        #[case] review_user: Option<&str>,
        #[case] expected: SshQueryExecutor,
    ) {
        let config = RechecksConfig {
            review_host: "review.example.org".to_owned(),
            review_port: 2222,
            review_user: review_user.map(str::to_owned),
            ..Default::default()
        };

        assert_eq!(executor(&config), expected);
    }
}
