//! CSV projection helpers shared by the reference loader and the day-file
//! scanner.
//!
//! Columns are matched by header name; columns the row type does not declare
//! are ignored, and a missing declared column fails the whole file.

use std::path::Path;

use anyhow::{Context, Result};
use fmr_calendar::parse_tdate;
use fmr_schemas::DailyRow;
use serde::de::DeserializeOwned;

/// Read every row of the CSV at `path` into `T`.
pub fn read_csv_file<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("open csv failed: {}", path.display()))?;
    collect_rows(&mut rdr).with_context(|| format!("parse csv failed: {}", path.display()))
}

/// Parse CSV text into `T` (tests and in-memory fixtures).
pub fn read_csv_str<T: DeserializeOwned>(src: &str) -> Result<Vec<T>> {
    let mut rdr = csv::Reader::from_reader(src.as_bytes());
    collect_rows(&mut rdr)
}

fn collect_rows<T: DeserializeOwned, R: std::io::Read>(rdr: &mut csv::Reader<R>) -> Result<Vec<T>> {
    let mut out = Vec::new();
    for (i, rec) in rdr.deserialize().enumerate() {
        // 1-based data row; header is row 0.
        let row: T = rec.with_context(|| format!("row {}", i + 1))?;
        out.push(row);
    }
    Ok(out)
}

/// Normalise each row's `trade_day` to a tdate and convert to its record type.
///
/// A malformed or blank date is fatal.
pub fn normalize_daily<R: DailyRow>(rows: Vec<R>) -> Result<Vec<R::Record>> {
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| {
            let tdate = parse_tdate(row.trade_day())
                .with_context(|| format!("row {}: bad trade_day '{}'", i + 1, row.trade_day()))?;
            Ok(row.into_record(tdate))
        })
        .collect()
}
