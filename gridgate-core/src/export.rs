//! CSV export of derived views.
//!
//! The export always covers the whole filtered and sorted set, never just the
//! current page. Every field is double-quoted so embedded commas, quotes, and
//! newlines survive a round trip through spreadsheet tools.

use chrono::{NaiveDate, Utc};
use std::io;
use thiserror::Error;

use crate::column::Column;

/// Error type for export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The CSV writer failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Flushing the underlying writer failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The in-memory export was not valid UTF-8.
    #[error("export is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// File name for an export taken on `date`: `data-YYYY-MM-DD.csv`.
pub fn export_filename(date: NaiveDate) -> String {
    format!("data-{}.csv", date.format("%Y-%m-%d"))
}

/// File name for an export taken today (UTC).
pub fn default_export_filename() -> String {
    export_filename(Utc::now().date_naive())
}

/// Write `rows` as CSV: a header row of column titles, then one row per record.
///
/// Returns the number of data rows written.
pub fn write_csv<'a, R, W, I>(writer: W, columns: &[Column<R>], rows: I) -> Result<usize, ExportError>
where
    R: 'a,
    W: io::Write,
    I: IntoIterator<Item = &'a R>,
{
    let mut csv_writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    csv_writer.write_record(columns.iter().map(Column::title))?;

    let mut count = 0;
    for record in rows {
        csv_writer.write_record(columns.iter().map(|c| c.value(record).export_text()))?;
        count += 1;
    }
    csv_writer.flush()?;

    tracing::debug!(rows = count, columns = columns.len(), "wrote CSV export");
    Ok(count)
}

/// Render `rows` as a CSV string.
pub fn export_csv_string<'a, R, I>(columns: &[Column<R>], rows: I) -> Result<String, ExportError>
where
    R: 'a,
    I: IntoIterator<Item = &'a R>,
{
    let mut buffer = Vec::new();
    write_csv(&mut buffer, columns, rows)?;
    Ok(String::from_utf8(buffer)?)
}
