//! Job run times reported in CI verdict comments.
//!
//! Zuul ends each verdict comment with one line per job:
//!
//! ```text
//! - openstack-tox-py38 https://zuul.opendev.org/t/openstack/build/1a2b : SUCCESS in 8m 41s
//! - neutron-fullstack https://zuul.opendev.org/t/openstack/build/3c4d : FAILURE in 1h 02m 11s (non-voting)
//! ```
//!
//! This module reads those lines and averages each job's duration over
//! calendar windows.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::Regex;

use super::aggregate::{AggregateTable, TimeWindow, aggregate};
use super::outcome::{OutcomeExtractor, OutcomeGrammar};
use crate::gerrit::{Change, ReviewerComment};

const VERDICT_MARKERS: [&str; 4] = ["Verified+1", "Verified-1", "Verified+2", "Verified-2"];

/// One job line from a verdict comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    /// Job name.
    pub name: String,
    /// Link to the build logs.
    pub url: String,
    /// Result keyword such as `SUCCESS`, `FAILURE` or `TIMED_OUT`.
    pub status: String,
    /// Wall-clock run time.
    pub duration: Duration,
    /// Voting marker without parentheses, e.g. `non-voting`.
    pub voting: Option<String>,
}

/// Parses a Zuul duration such as `1h 2m 3s`.
///
/// Pieces with an unknown suffix or a non-numeric amount are logged and
/// ignored.
#[must_use]
pub fn parse_human_duration(text: &str) -> Duration {
    let mut seconds = 0_u64;

    for piece in text.split_whitespace() {
        let Some((index, suffix)) = piece.char_indices().last() else {
            continue;
        };
        let Some(amount) = piece
            .get(..index)
            .and_then(|amount_text| amount_text.parse::<u64>().ok())
        else {
            tracing::debug!("unparseable duration piece {piece} in {text}");
            continue;
        };
        let multiplier = match suffix {
            's' => 1,
            'm' => 60,
            'h' => 3_600,
            _ => {
                tracing::debug!("unhandled suffix {suffix} in {piece}");
                continue;
            }
        };
        seconds = seconds.saturating_add(amount.saturating_mul(multiplier));
    }

    Duration::from_secs(seconds)
}

/// Formats a duration the way Zuul prints it, e.g. `1h 2m 3s`.
///
/// Hours appear only above one hour and minutes only when more than a
/// minute remains; seconds are always present.
#[must_use]
#[expect(
    clippy::integer_division,
    clippy::integer_division_remainder_used,
    reason = "splitting seconds into whole hours and minutes"
)]
pub fn format_human_duration(duration: Duration) -> String {
    let mut seconds = duration.as_secs();
    let mut pieces = Vec::with_capacity(3);

    if seconds > 3_600 {
        pieces.push(format!("{}h", seconds / 3_600));
        seconds %= 3_600;
    }
    if seconds > 60 {
        pieces.push(format!("{}m", seconds / 60));
        seconds %= 60;
    }
    pieces.push(format!("{seconds}s"));

    pieces.join(" ")
}

/// Extracts the job lines from a verdict comment.
///
/// Lines starting with `-` that do not follow the
/// `- <job> <url> : <STATUS> in <duration>` layout are logged and skipped.
#[must_use]
pub fn parse_job_results(message: &str) -> Vec<JobResult> {
    message
        .lines()
        .filter(|line| line.starts_with('-'))
        .filter_map(parse_job_line)
        .collect()
}

fn parse_job_line(line: &str) -> Option<JobResult> {
    let mut fields = line.splitn(7, ' ');
    let (Some("-"), Some(name), Some(url), Some(":"), Some(status), Some("in"), Some(time)) = (
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
    ) else {
        tracing::debug!("skipping malformed job line: {line}");
        return None;
    };

    let (time_text, voting) = match time.rsplit_once(' ') {
        Some((duration_text, marker)) if marker.starts_with('(') => (
            duration_text,
            Some(marker.trim_matches(|c| c == '(' || c == ')').to_owned()),
        ),
        _ => (time, None),
    };

    Some(JobResult {
        name: name.to_owned(),
        url: url.to_owned(),
        status: status.to_owned(),
        duration: parse_human_duration(time_text),
        voting,
    })
}

/// Returns the most recent CI comment on `change` that carries a `Verified`
/// vote.
#[must_use]
pub fn latest_verdict_comment<'change, Grammar>(
    change: &'change Change,
    extractor: &OutcomeExtractor<Grammar>,
) -> Option<&'change ReviewerComment>
where
    Grammar: OutcomeGrammar,
{
    change.comments.iter().rev().find(|comment| {
        extractor.is_ci_author(&comment.author)
            && VERDICT_MARKERS
                .iter()
                .any(|marker| comment.message.contains(marker))
    })
}

/// Averages each job's run time, in seconds, over calendar windows.
///
/// Each change contributes the jobs of its latest verdict comment, dated by
/// that comment. When `job_filter` is given, only jobs whose name matches it
/// from the first character are kept.
#[must_use]
pub fn job_duration_tables<Grammar>(
    records: &[Change],
    extractor: &OutcomeExtractor<Grammar>,
    window: TimeWindow,
    job_filter: Option<&Regex>,
) -> BTreeMap<String, AggregateTable>
where
    Grammar: OutcomeGrammar,
{
    let mut observations: BTreeMap<String, Vec<(DateTime<Utc>, u32)>> = BTreeMap::new();

    for change in records {
        let Some(comment) = latest_verdict_comment(change, extractor) else {
            tracing::debug!("no CI verdict found for change {}; skipping it", change.id);
            continue;
        };
        let Some(posted_at) = DateTime::from_timestamp(comment.timestamp, 0) else {
            tracing::debug!(
                "skipping change {}: comment timestamp {} is out of range",
                change.id,
                comment.timestamp
            );
            continue;
        };

        for job in parse_job_results(&comment.message) {
            if !job_filter.is_none_or(|filter| matches_from_start(filter, &job.name)) {
                continue;
            }
            let seconds = u32::try_from(job.duration.as_secs()).unwrap_or(u32::MAX);
            observations
                .entry(job.name)
                .or_default()
                .push((posted_at, seconds));
        }
    }

    observations
        .into_iter()
        .map(|(name, samples)| (name, aggregate(samples, window)))
        .collect()
}

fn matches_from_start(filter: &Regex, name: &str) -> bool {
    filter.find(name).is_some_and(|found| found.start() == 0)
}
