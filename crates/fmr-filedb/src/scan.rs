use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fmr_md::{normalize_daily, read_csv_file};
use fmr_schemas::{BalanceRow, DailyRow, DayStamped, PnlRow, PositionRow};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Record kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Position,
    Balance,
    Pnl,
}

impl RecordKind {
    /// Directory name under `filedb/`, also the file-name infix.
    pub fn dir_name(&self) -> &'static str {
        match self {
            RecordKind::Position => "ftr_pos",
            RecordKind::Balance => "ftr_balance",
            RecordKind::Pnl => "daily_pnl",
        }
    }
}

/// Ties a CSV row type to the kind of day file it is read from.
pub trait DayFileRow: DailyRow + DeserializeOwned {
    const KIND: RecordKind;
}

impl DayFileRow for PositionRow {
    const KIND: RecordKind = RecordKind::Position;
}

impl DayFileRow for BalanceRow {
    const KIND: RecordKind = RecordKind::Balance;
}

impl DayFileRow for PnlRow {
    const KIND: RecordKind = RecordKind::Pnl;
}

// ---------------------------------------------------------------------------
// FileDb
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FileDb {
    root: PathBuf,
}

impl FileDb {
    /// `root` is the data root; day files live under `root/filedb/`.
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.join("filedb"),
        }
    }

    pub fn path_for(&self, kind: RecordKind, tdate: u32) -> PathBuf {
        let year = tdate / 10_000;
        let dir = kind.dir_name();
        self.root
            .join(dir)
            .join(year.to_string())
            .join(tdate.to_string())
            .join(format!("{tdate}.{dir}.csv"))
    }

    /// Lazy, single-pass scan over `days`.
    pub fn scan<'a, R: DayFileRow>(&'a self, days: &'a [u32]) -> DayScan<'a, R> {
        DayScan {
            db: self,
            days: days.iter(),
            report: ScanReport::new(R::KIND),
            _row: PhantomData,
        }
    }

    /// Drive a full scan and concatenate every loaded day.
    pub fn load_all<R: DayFileRow>(&self, days: &[u32]) -> Result<(Vec<R::Record>, ScanReport)> {
        let mut scan = self.scan::<R>(days);
        let mut out = Vec::new();
        for day in scan.by_ref() {
            out.extend(day?.records);
        }
        let report = scan.into_report();

        info!(
            kind = report.kind.dir_name(),
            days_requested = report.days_requested,
            days_loaded = report.days_loaded,
            days_missing = report.days_missing.len(),
            rows = report.rows_loaded,
            "day files scanned"
        );

        Ok((out, report))
    }
}

// ---------------------------------------------------------------------------
// Scan
// ---------------------------------------------------------------------------

/// One loaded day file.
#[derive(Debug, Clone)]
pub struct DayFile<T> {
    pub tdate: u32,
    pub path: PathBuf,
    pub records: Vec<T>,
}

/// What a scan saw, for the run manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub kind: RecordKind,
    pub days_requested: usize,
    pub days_loaded: usize,
    /// Days with no file, in scan order.
    pub days_missing: Vec<u32>,
    pub rows_loaded: usize,
    /// Rows dropped because their `trade_day` is not the file's day.
    pub rows_off_day: usize,
}

impl ScanReport {
    fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            days_requested: 0,
            days_loaded: 0,
            days_missing: Vec::new(),
            rows_loaded: 0,
            rows_off_day: 0,
        }
    }
}

/// Iterator over the day files of one kind. Yields at most one [`DayFile`]
/// per requested day; missing days are skipped.
pub struct DayScan<'a, R: DayFileRow> {
    db: &'a FileDb,
    days: std::slice::Iter<'a, u32>,
    report: ScanReport,
    _row: PhantomData<R>,
}

impl<'a, R: DayFileRow> DayScan<'a, R> {
    pub fn report(&self) -> &ScanReport {
        &self.report
    }

    pub fn into_report(self) -> ScanReport {
        self.report
    }

    fn load_day(&mut self, tdate: u32, path: PathBuf) -> Result<DayFile<R::Record>> {
        let rows: Vec<R> = read_csv_file(&path)?;
        let records = normalize_daily(rows)
            .with_context(|| format!("normalise trade_day: {}", path.display()))?;

        let before = records.len();
        let records: Vec<R::Record> = records.into_iter().filter(|r| r.tdate() == tdate).collect();
        let off_day = before - records.len();
        if off_day > 0 {
            warn!(
                kind = R::KIND.dir_name(),
                tdate,
                rows = off_day,
                "rows dated outside their day file dropped"
            );
            self.report.rows_off_day += off_day;
        }

        self.report.days_loaded += 1;
        self.report.rows_loaded += records.len();
        Ok(DayFile {
            tdate,
            path,
            records,
        })
    }
}

impl<'a, R: DayFileRow> Iterator for DayScan<'a, R> {
    type Item = Result<DayFile<R::Record>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let tdate = *self.days.next()?;
            self.report.days_requested += 1;

            let path = self.db.path_for(R::KIND, tdate);
            if !path.is_file() {
                debug!(kind = R::KIND.dir_name(), tdate, "no day file, skipping");
                self.report.days_missing.push(tdate);
                continue;
            }

            return Some(self.load_day(tdate, path));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmr_schemas::Balance;
    use std::fs;

    fn write_day(db: &FileDb, kind: RecordKind, tdate: u32, body: &str) {
        let path = db.path_for(kind, tdate);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[test]
    fn path_is_year_and_date_partitioned() {
        let db = FileDb::new(Path::new("/data"));
        assert_eq!(
            db.path_for(RecordKind::Position, 20180305),
            PathBuf::from("/data/filedb/ftr_pos/2018/20180305/20180305.ftr_pos.csv")
        );
        assert_eq!(
            db.path_for(RecordKind::Pnl, 20161010),
            PathBuf::from("/data/filedb/daily_pnl/2016/20161010/20161010.daily_pnl.csv")
        );
    }

    #[test]
    fn missing_days_are_skipped_and_counted() {
        let dir = tempfile::tempdir().unwrap();
        let db = FileDb::new(dir.path());
        write_day(
            &db,
            RecordKind::Balance,
            20180102,
            "trade_day,pid,balance,occupied\n2018-01-02,acc1,1000,100\n",
        );
        write_day(
            &db,
            RecordKind::Balance,
            20180104,
            "trade_day,pid,balance,occupied\n2018-01-04,acc1,1010,90\n",
        );

        let days = [20180102, 20180103, 20180104];
        let mut scan = db.scan::<BalanceRow>(&days);
        let loaded: Vec<u32> = scan.by_ref().map(|d| d.unwrap().tdate).collect();
        assert_eq!(loaded, vec![20180102, 20180104]);
        assert_eq!(scan.report().days_missing, vec![20180103]);
        assert_eq!(scan.report().days_requested, 3);
    }

    #[test]
    fn off_day_rows_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let db = FileDb::new(dir.path());
        write_day(
            &db,
            RecordKind::Balance,
            20180102,
            "trade_day,pid,balance,occupied\n2018-01-02,acc1,1000,100\n2017-12-29,acc1,990,100\n",
        );

        let (rows, report): (Vec<Balance>, _) = db.load_all::<BalanceRow>(&[20180102]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(report.rows_off_day, 1);
        assert_eq!(report.rows_loaded, 1);
    }

    #[test]
    fn unreadable_day_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let db = FileDb::new(dir.path());
        write_day(&db, RecordKind::Balance, 20180102, "trade_day,pid\n2018-01-02,acc1\n");

        assert!(db.load_all::<BalanceRow>(&[20180102]).is_err());
    }

    #[test]
    fn empty_day_list_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let db = FileDb::new(dir.path());
        let (rows, report) = db.load_all::<PositionRow>(&[]).unwrap();
        assert!(rows.is_empty());
        assert_eq!(report.days_requested, 0);
    }
}
