//! fmr-filedb
//!
//! Daily file scanner over the year/date-partitioned account exports:
//!
//! ```text
//! <root>/filedb/ftr_pos/{year}/{tdate}/{tdate}.ftr_pos.csv
//! <root>/filedb/ftr_balance/{year}/{tdate}/{tdate}.ftr_balance.csv
//! <root>/filedb/daily_pnl/{year}/{tdate}/{tdate}.daily_pnl.csv
//! ```
//!
//! For each qualifying trading day the scanner loads the day's file if it
//! exists and skips the day otherwise. A missing day is not an error; it is
//! counted in the [`ScanReport`]. Reads only, no writes.

mod scan;

pub use scan::{DayFile, DayFileRow, DayScan, FileDb, RecordKind, ScanReport};
