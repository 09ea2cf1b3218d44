//! Query executor that runs `gerrit query` over SSH.

use std::process::{Command, Stdio};

use serde_json::Value;

use super::{QueryExecutor, QueryPage};
use crate::gerrit::error::QueryError;
use crate::gerrit::models::{ApiChange, Change};

/// Port Gerrit's SSH daemon listens on by default.
pub const DEFAULT_SSH_PORT: u16 = 29418;

/// Executor that invokes `ssh -p <port> <host> gerrit query ...` and parses
/// the JSON rows it prints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshQueryExecutor {
    program: String,
    host: String,
    port: u16,
    user: Option<String>,
}

impl SshQueryExecutor {
    /// Creates an executor targeting `host` on `port`.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            program: "ssh".to_owned(),
            host: host.into(),
            port,
            user: None,
        }
    }

    /// Logs in as `user` instead of the local SSH default.
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Overrides the SSH client binary.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn destination(&self) -> String {
        self.user.as_ref().map_or_else(
            || self.host.clone(),
            |user| format!("{user}@{host}", host = self.host),
        )
    }

    pub(crate) fn command(&self, query: &str, offset: usize) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("-p")
            .arg(self.port.to_string())
            .arg(self.destination())
            .args([
                "gerrit",
                "query",
                "--format=json",
                "--current-patch-set",
                "--comments",
                "--start",
            ])
            .arg(offset.to_string())
            .arg("--")
            .arg(query)
            .stdin(Stdio::null());
        command
    }
}

impl QueryExecutor for SshQueryExecutor {
    fn fetch_page(&self, query: &str, offset: usize) -> Result<QueryPage, QueryError> {
        tracing::debug!(host = %self.host, offset, "running gerrit query: {query}");

        let output = self
            .command(query, offset)
            .output()
            .map_err(|error| QueryError::Transport {
                message: format!("failed to run {}: {error}", self.program),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(QueryError::Transport {
                message: format!(
                    "gerrit query exited with {status}: {detail}",
                    status = output.status,
                    detail = stderr.trim()
                ),
            });
        }
        if !stderr.trim().is_empty() {
            tracing::warn!("gerrit query wrote to stderr: {}", stderr.trim());
        }

        let stdout = String::from_utf8(output.stdout).map_err(|error| QueryError::Protocol {
            message: format!("query output is not valid UTF-8: {error}"),
        })?;
        parse_query_output(&stdout)
    }
}

/// Parses the JSON rows printed by `gerrit query --format=json`.
///
/// Each change is one JSON object per line; the final `"type": "stats"` row
/// carries the `moreChanges` continuation flag.
///
/// # Errors
///
/// Returns [`QueryError::Protocol`] when a row is not valid JSON, a change
/// row does not match the expected schema, Gerrit reports an `error` row, or
/// the stats row is missing.
pub fn parse_query_output(output: &str) -> Result<QueryPage, QueryError> {
    let mut records = Vec::new();
    let mut has_more = None;

    for (line_number, line) in output.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let row: Value = serde_json::from_str(trimmed).map_err(|error| QueryError::Protocol {
            message: format!("line {} is not valid JSON: {error}", line_number + 1),
        })?;

        match row.get("type").and_then(Value::as_str) {
            Some("stats") => {
                has_more = Some(
                    row.get("moreChanges")
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                );
            }
            Some("error") => {
                let message = row
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error");
                return Err(QueryError::Protocol {
                    message: format!("Gerrit reported an error: {message}"),
                });
            }
            _ => records.push(parse_change_row(row, line_number + 1)?),
        }
    }

    let Some(more_changes) = has_more else {
        return Err(QueryError::Protocol {
            message: "query output did not include a stats row".to_owned(),
        });
    };

    Ok(QueryPage {
        records,
        has_more: more_changes,
    })
}

fn parse_change_row(row: Value, line_number: usize) -> Result<Change, QueryError> {
    let api: ApiChange = serde_json::from_value(row).map_err(|error| QueryError::Protocol {
        message: format!("line {line_number} is not a change record: {error}"),
    })?;
    Change::try_from(api)
}
