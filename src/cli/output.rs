//! Output formatting utilities for CLI operations.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::time::Duration;

use rechecks::analysis::format_human_duration;
use rechecks::{AggregateTable, QueryError, Report, ReportFormat};

/// Column header of the build failure average.
pub const FAILURES_HEADER: &str = "Average number of failed builds";
/// Column header of the job duration average.
pub const DURATION_HEADER: &str = "Average duration";
/// Column header of the job duration average in CSV, in seconds.
pub const DURATION_SECONDS_HEADER: &str = "Average duration (seconds)";

/// Writes `report` to stdout in `format`.
pub fn write_report(report: &Report, format: ReportFormat) -> Result<(), QueryError> {
    let mut stdout = io::stdout().lock();
    write_report_to(&mut stdout, report, format)
}

/// Writes `report` to the given writer in `format`.
pub fn write_report_to<W: Write>(
    writer: &mut W,
    report: &Report,
    format: ReportFormat,
) -> Result<(), QueryError> {
    match (report, format) {
        (Report::BuildFailures(table), ReportFormat::Human) => write_failures_table(writer, table),
        (Report::BuildFailures(table), ReportFormat::Csv) => write_failures_csv(writer, table),
        (Report::JobTimes(tables), ReportFormat::Human) => write_job_tables(writer, tables),
        (Report::JobTimes(tables), ReportFormat::Csv) => write_job_csv(writer, tables),
    }
}

fn write_failures_table<W: Write>(writer: &mut W, table: &AggregateTable) -> Result<(), QueryError> {
    let rows: Vec<(String, String)> = table
        .iter()
        .map(|(key, average)| (key.to_string(), format!("{average:.2}")))
        .collect();
    write_columns(writer, table.window().as_str(), FAILURES_HEADER, &rows)
}

fn write_job_tables<W: Write>(
    writer: &mut W,
    tables: &BTreeMap<String, AggregateTable>,
) -> Result<(), QueryError> {
    if tables.is_empty() {
        writeln!(writer, "No job results found.").map_err(|e| io_error(&e))?;
        return Ok(());
    }

    for (index, (job, table)) in tables.iter().enumerate() {
        if index > 0 {
            writeln!(writer).map_err(|e| io_error(&e))?;
        }
        writeln!(writer, "{job}").map_err(|e| io_error(&e))?;
        let rows: Vec<(String, String)> = table
            .iter()
            .map(|(key, average)| (key.to_string(), human_seconds(average)))
            .collect();
        write_columns(writer, table.window().as_str(), DURATION_HEADER, &rows)?;
    }
    Ok(())
}

/// Writes two left-aligned columns separated by two spaces.
fn write_columns<W: Write>(
    writer: &mut W,
    key_header: &str,
    value_header: &str,
    rows: &[(String, String)],
) -> Result<(), QueryError> {
    let width = rows
        .iter()
        .map(|(key, _)| key.len())
        .chain([key_header.len()])
        .max()
        .unwrap_or_default();

    writeln!(writer, "{key_header:<width$}  {value_header}").map_err(|e| io_error(&e))?;
    for (key, value) in rows {
        writeln!(writer, "{key:<width$}  {value}").map_err(|e| io_error(&e))?;
    }
    Ok(())
}

fn write_failures_csv<W: Write>(writer: &mut W, table: &AggregateTable) -> Result<(), QueryError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer
        .write_record([table.window().as_str(), FAILURES_HEADER])
        .map_err(|e| csv_error(&e))?;
    for (key, average) in table.iter() {
        csv_writer
            .write_record([key.to_string(), format!("{average:?}")])
            .map_err(|e| csv_error(&e))?;
    }
    csv_writer.flush().map_err(|e| io_error(&e))
}

fn write_job_csv<W: Write>(
    writer: &mut W,
    tables: &BTreeMap<String, AggregateTable>,
) -> Result<(), QueryError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let window = tables
        .values()
        .next()
        .map_or("window", |table| table.window().as_str());
    csv_writer
        .write_record(["job", window, DURATION_SECONDS_HEADER])
        .map_err(|e| csv_error(&e))?;
    for (job, table) in tables {
        for (key, average) in table.iter() {
            csv_writer
                .write_record([job.clone(), key.to_string(), format!("{average:.2}")])
                .map_err(|e| csv_error(&e))?;
        }
    }
    csv_writer.flush().map_err(|e| io_error(&e))
}

fn human_seconds(seconds: f64) -> String {
    format_human_duration(Duration::try_from_secs_f64(seconds).unwrap_or_default())
}

/// Converts an I/O error to a [`QueryError::Io`].
pub(crate) fn io_error(error: &io::Error) -> QueryError {
    QueryError::Io {
        message: error.to_string(),
    }
}

fn csv_error(error: &csv::Error) -> QueryError {
    QueryError::Io {
        message: error.to_string(),
    }
}
