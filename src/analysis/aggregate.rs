//! Calendar-window averaging of per-change values.
//!
//! Values are grouped by the calendar window their timestamp falls in (ISO
//! week, month, or year, always in UTC) and each window is reduced to the
//! arithmetic mean of its values. Aggregation is a pure function: every call
//! builds a fresh table, so one run can aggregate the same points under
//! several windows.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::points::Point;

/// Calendar granularity used to bucket values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    /// ISO 8601 week (`{iso year}-{iso week}`).
    #[default]
    Week,
    /// Calendar month (`{year}-{month}`).
    Month,
    /// Calendar year (`{year}`).
    Year,
}

impl TimeWindow {
    /// Returns the lower-case name of the window.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a time window name is not recognised.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown time window '{0}'; expected week, month or year")]
pub struct UnknownTimeWindow(pub String);

impl FromStr for TimeWindow {
    type Err = UnknownTimeWindow;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            _ => Err(UnknownTimeWindow(value.to_owned())),
        }
    }
}

/// Identifies one calendar window.
///
/// Keys order chronologically, so week `2021-9` sorts before `2021-23` even
/// though the rendered text does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BucketKey {
    year: i32,
    period: Option<u32>,
}

impl BucketKey {
    /// Key of ISO week `week` in ISO year `iso_year`.
    #[must_use]
    pub const fn week(iso_year: i32, week: u32) -> Self {
        Self {
            year: iso_year,
            period: Some(week),
        }
    }

    /// Key of calendar month `month` (1-based) in `year`.
    #[must_use]
    pub const fn month(year: i32, month: u32) -> Self {
        Self {
            year,
            period: Some(month),
        }
    }

    /// Key of calendar year `year`.
    #[must_use]
    pub const fn year(year: i32) -> Self {
        Self { year, period: None }
    }

    /// Returns the key of the `window` containing `timestamp`.
    #[must_use]
    pub fn for_timestamp(timestamp: DateTime<Utc>, window: TimeWindow) -> Self {
        match window {
            TimeWindow::Week => {
                let iso_week = timestamp.iso_week();
                Self::week(iso_week.year(), iso_week.week())
            }
            TimeWindow::Month => Self::month(timestamp.year(), timestamp.month()),
            TimeWindow::Year => Self::year(timestamp.year()),
        }
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.period {
            Some(period) => write!(f, "{}-{period}", self.year),
            None => write!(f, "{}", self.year),
        }
    }
}

/// Mean value per calendar window, iterated in chronological order.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateTable {
    window: TimeWindow,
    averages: BTreeMap<BucketKey, f64>,
}

impl AggregateTable {
    /// Returns the window granularity the table was built with.
    #[must_use]
    pub const fn window(&self) -> TimeWindow {
        self.window
    }

    /// Returns the average for `key`, if any value fell in that window.
    #[must_use]
    pub fn get(&self, key: &BucketKey) -> Option<f64> {
        self.averages.get(key).copied()
    }

    /// Iterates over `(key, average)` pairs in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = (&BucketKey, f64)> + '_ {
        self.averages.iter().map(|(key, average)| (key, *average))
    }

    /// Returns the number of non-empty windows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.averages.len()
    }

    /// Returns true when no value was aggregated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.averages.is_empty()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    total: f64,
    count: u32,
}

impl Accumulator {
    #[expect(clippy::float_arithmetic, reason = "sums feed a fractional mean")]
    fn push(&mut self, value: u32) {
        self.total += f64::from(value);
        self.count = self.count.saturating_add(1);
    }

    #[expect(clippy::float_arithmetic, reason = "averages are fractional")]
    fn mean(self) -> f64 {
        self.total / f64::from(self.count.max(1))
    }
}

/// Groups `observations` by the `window` their timestamp falls in and
/// averages each group. Windows without observations are absent.
#[must_use]
pub fn aggregate<I>(observations: I, window: TimeWindow) -> AggregateTable
where
    I: IntoIterator<Item = (DateTime<Utc>, u32)>,
{
    let mut groups: BTreeMap<BucketKey, Accumulator> = BTreeMap::new();
    for (timestamp, value) in observations {
        groups
            .entry(BucketKey::for_timestamp(timestamp, window))
            .or_default()
            .push(value);
    }

    AggregateTable {
        window,
        averages: groups
            .into_iter()
            .map(|(key, accumulator)| (key, accumulator.mean()))
            .collect(),
    }
}

/// Averages build failures per change over each `window`.
#[must_use]
pub fn aggregate_points(points: &[Point], window: TimeWindow) -> AggregateTable {
    aggregate(
        points.iter().map(|point| {
            tracing::debug!(
                "patch {} merged {} ({window} {})",
                point.change_id,
                point.submitted_at.date_naive(),
                BucketKey::for_timestamp(point.submitted_at, window)
            );
            (point.submitted_at, point.build_failures)
        }),
        window,
    )
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use rstest::rstest;

    use super::{BucketKey, TimeWindow, UnknownTimeWindow, aggregate, aggregate_points};
    use crate::analysis::points::Point;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
            .single()
            .expect("test timestamp must be valid")
    }

    fn point(id: &str, submitted_at: DateTime<Utc>, build_failures: u32) -> Point {
        Point {
            change_id: id.to_owned(),
            submitted_at,
            build_failures,
        }
    }

    #[rstest]
    fn averages_failures_within_an_iso_week() {
        // 2021-06-07 (Mon) to 2021-06-13 (Sun) is ISO week 2021-23.
        let points = vec![
            point("I1", at(2021, 6, 7), 1),
            point("I2", at(2021, 6, 10), 3),
            point("I3", at(2021, 6, 13), 2),
        ];

        let table = aggregate_points(&points, TimeWindow::Week);

        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&BucketKey::week(2021, 23)), Some(2.0));
    }

    #[rstest]
    #[case::week(TimeWindow::Week, BucketKey::week(2020, 53), "2020-53")]
    #[case::month(TimeWindow::Month, BucketKey::month(2021, 1), "2021-1")]
    #[case::year(TimeWindow::Year, BucketKey::year(2021), "2021")]
    fn keys_follow_the_window(
        #[case] window: TimeWindow,
        #[case] expected: BucketKey,
        #[case] label: &str,
    ) {
        // 2021-01-02 still belongs to ISO week 53 of 2020.
        let key = BucketKey::for_timestamp(at(2021, 1, 2), window);
        assert_eq!(key, expected);
        assert_eq!(key.to_string(), label);
    }

    #[rstest]
    fn keys_sort_chronologically() {
        let points = vec![
            point("I1", at(2021, 6, 10), 4),
            point("I2", at(2021, 3, 3), 0),
            point("I3", at(2020, 12, 1), 1),
        ];

        let table = aggregate_points(&points, TimeWindow::Week);
        let labels: Vec<String> = table.iter().map(|(key, _)| key.to_string()).collect();

        assert_eq!(labels, vec!["2020-49", "2021-9", "2021-23"]);
    }

    #[rstest]
    fn empty_windows_are_absent() {
        let points = vec![point("I1", at(2021, 1, 15), 2), point("I2", at(2021, 3, 15), 4)];

        let table = aggregate_points(&points, TimeWindow::Month);

        assert_eq!(table.get(&BucketKey::month(2021, 2)), None);
        assert_eq!(table.len(), 2);
    }

    #[rstest]
    fn aggregation_is_repeatable_across_windows() {
        let points = vec![
            point("I1", at(2021, 1, 15), 2),
            point("I2", at(2021, 1, 20), 1),
            point("I3", at(2022, 3, 15), 4),
        ];

        let first_week = aggregate_points(&points, TimeWindow::Week);
        let year = aggregate_points(&points, TimeWindow::Year);
        let second_week = aggregate_points(&points, TimeWindow::Week);

        assert_eq!(first_week, second_week);
        assert_eq!(year.get(&BucketKey::year(2021)), Some(1.5));
        assert_eq!(year.get(&BucketKey::year(2022)), Some(4.0));
        assert_eq!(year.window(), TimeWindow::Year);
    }

    #[rstest]
    fn no_observations_give_an_empty_table() {
        let table = aggregate(Vec::<(DateTime<Utc>, u32)>::new(), TimeWindow::Year);
        assert!(table.is_empty());
    }

    #[rstest]
    #[case("week", TimeWindow::Week)]
    #[case("Month", TimeWindow::Month)]
    #[case(" year ", TimeWindow::Year)]
    fn parses_window_names(#[case] name: &str, #[case] expected: TimeWindow) {
        assert_eq!(name.parse::<TimeWindow>(), Ok(expected));
    }

    #[rstest]
    fn rejects_unknown_window() {
        assert_eq!(
            "fortnight".parse::<TimeWindow>(),
            Err(UnknownTimeWindow("fortnight".to_owned()))
        );
    }
}
