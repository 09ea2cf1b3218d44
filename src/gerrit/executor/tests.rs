//! Tests for parsing `gerrit query` output and building the SSH command.

use std::ffi::OsStr;

use rstest::rstest;

use super::{SshQueryExecutor, parse_query_output};
use crate::gerrit::QueryError;

const TWO_CHANGES: &str = concat!(
    r#"{"project":"openstack/neutron","id":"Ia","createdOn":200,"lastUpdated":300,"currentPatchSet":{"number":"2"},"comments":[]}"#,
    "\n",
    r#"{"project":"openstack/neutron","id":"Ib","createdOn":100,"lastUpdated":150,"currentPatchSet":{"number":1}}"#,
    "\n",
    r#"{"type":"stats","rowCount":2,"runTimeMilliseconds":12,"moreChanges":true}"#,
    "\n",
);

#[rstest]
fn parses_changes_and_continuation_flag() {
    let page = parse_query_output(TWO_CHANGES).expect("output should parse");

    let ids: Vec<&str> = page.records.iter().map(|change| change.id.as_str()).collect();
    assert_eq!(ids, vec!["Ia", "Ib"], "rows must keep service order");
    assert!(page.has_more, "stats row reported more changes");
}

#[rstest]
fn stats_row_without_flag_means_last_page() {
    let page = parse_query_output("{\"type\":\"stats\",\"rowCount\":0}\n")
        .expect("output should parse");
    assert!(page.records.is_empty());
    assert!(!page.has_more);
}

#[rstest]
#[case::missing_stats(r#"{"id":"Ia","createdOn":1,"lastUpdated":1,"currentPatchSet":{"number":1}}"#)]
#[case::gerrit_error(r#"{"type":"error","message":"permission denied"}"#)]
#[case::not_json("fatal: not a gerrit server")]
#[case::wrong_schema("{\"id\":42}\n{\"type\":\"stats\",\"moreChanges\":false}")]
fn malformed_output_is_a_protocol_error(#[case] output: &str) {
    let result = parse_query_output(output);
    assert!(
        matches!(result, Err(QueryError::Protocol { .. })),
        "expected Protocol error, got {result:?}"
    );
}

#[rstest]
fn command_targets_gerrit_query_with_offset() {
    let executor = SshQueryExecutor::new("review.example.org", 29418).with_user("bot");
    let command = executor.command("status:merged branch:master", 100);

    assert_eq!(command.get_program(), OsStr::new("ssh"));
    let args: Vec<&OsStr> = command.get_args().collect();
    let expected: Vec<&OsStr> = [
        "-p",
        "29418",
        "bot@review.example.org",
        "gerrit",
        "query",
        "--format=json",
        "--current-patch-set",
        "--comments",
        "--start",
        "100",
        "--",
        "status:merged branch:master",
    ]
    .iter()
    .map(OsStr::new)
    .collect();
    assert_eq!(args, expected);
}

#[rstest]
fn missing_program_is_a_transport_error() {
    use super::QueryExecutor;

    let executor = SshQueryExecutor::new("review.example.org", 29418)
        .with_program("/nonexistent/rechecks-test-ssh");

    let result = executor.fetch_page("status:merged", 0);
    assert!(
        matches!(result, Err(QueryError::Transport { .. })),
        "expected Transport error, got {result:?}"
    );
}
