//! fmr-testkit
//!
//! Synthetic data roots for scenario tests: a `market/` directory with the
//! reference tables and a `filedb/` tree of per-day files, laid out exactly
//! as the pipeline reads them.

use anyhow::{Context, Result};
use fmr_filedb::{FileDb, RecordKind};
use fmr_md::MarketPaths;
use fmr_schemas::{Direction, ReportMode};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const SESSION: &str = "busyhour";
pub const EXCHANGE: &str = "SESH";

/// Day files render `trade_day` as `YYYY-MM-DD`.
pub fn iso(tdate: u32) -> String {
    format!("{:04}-{:02}-{:02}", tdate / 10_000, tdate / 100 % 100, tdate % 100)
}

/// A data root in a temporary directory, removed on drop.
pub struct DataRoot {
    dir: TempDir,
}

impl DataRoot {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir().context("create fixture tempdir")?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where scenario reports should be written.
    pub fn out_path(&self, file: &str) -> PathBuf {
        self.path().join("out").join(file)
    }

    fn market(&self) -> MarketPaths {
        MarketPaths::new(self.path())
    }

    fn filedb(&self) -> FileDb {
        FileDb::new(self.path())
    }

    /// Calendar rows as (tdate, session, exchange).
    pub fn calendar(&self, rows: &[(u32, &str, &str)]) -> Result<()> {
        write_csv(
            &self.market().tradeday(),
            &["trade_day", "product", "exchange"],
            rows.iter()
                .map(|(d, s, e)| vec![d.to_string(), s.to_string(), e.to_string()]),
        )
    }

    pub fn symbol_info(&self, rows: &[(&str, f64)]) -> Result<()> {
        write_csv(
            &self.market().symbol_info(),
            &["code", "name", "multiple"],
            rows.iter()
                .map(|(c, m)| vec![c.to_string(), c.to_uppercase(), m.to_string()]),
        )
    }

    pub fn product_infos(&self, rows: &[(&str, f64)]) -> Result<()> {
        write_csv(
            &self.market().product_infos(),
            &["product", "margin_ratio"],
            rows.iter().map(|(p, r)| vec![p.to_string(), r.to_string()]),
        )
    }

    /// Bars as (tdate, code, close).
    pub fn daily_bars(&self, year: i32, rows: &[(u32, &str, f64)]) -> Result<()> {
        write_csv(
            &self.market().daily_bars(year),
            &["trade_day", "code", "open", "close"],
            rows.iter().map(|(d, c, close)| {
                vec![iso(*d), c.to_string(), close.to_string(), close.to_string()]
            }),
        )
    }

    /// Positions as (pid, code, dir, prev_pos, cur_pos).
    pub fn positions(&self, tdate: u32, rows: &[(&str, &str, Direction, i64, i64)]) -> Result<()> {
        write_csv(
            &self.filedb().path_for(RecordKind::Position, tdate),
            &["trade_day", "pid", "code", "dir", "prev_pos", "cur_pos"],
            rows.iter().map(|(pid, code, dir, prev, cur)| {
                vec![
                    iso(tdate),
                    pid.to_string(),
                    code.to_string(),
                    dir.as_str().to_string(),
                    prev.to_string(),
                    cur.to_string(),
                ]
            }),
        )
    }

    /// Balances as (pid, balance, occupied).
    pub fn balances(&self, tdate: u32, rows: &[(&str, f64, f64)]) -> Result<()> {
        write_csv(
            &self.filedb().path_for(RecordKind::Balance, tdate),
            &["trade_day", "pid", "balance", "occupied"],
            rows.iter().map(|(pid, b, o)| {
                vec![iso(tdate), pid.to_string(), b.to_string(), o.to_string()]
            }),
        )
    }

    /// P&L as (pid, code, profit, fee).
    pub fn pnl(&self, tdate: u32, rows: &[(&str, &str, f64, f64)]) -> Result<()> {
        write_csv(
            &self.filedb().path_for(RecordKind::Pnl, tdate),
            &["trade_day", "pid", "code", "profit", "fee"],
            rows.iter().map(|(pid, code, p, f)| {
                vec![
                    iso(tdate),
                    pid.to_string(),
                    code.to_string(),
                    p.to_string(),
                    f.to_string(),
                ]
            }),
        )
    }

    /// Config pointing at this root for 2018 data, writing to `out/<file>`.
    pub fn config_yaml(&self, mode: ReportMode, file: &str) -> String {
        format!(
            "data:\n  root: '{root}'\n  years:\n    start: 2018\n    end: 2018\n\
             calendar:\n  after_tdate: 20180101\n\
             report:\n  mode: {mode}\n  output: '{out}'\n",
            root = self.path().display(),
            mode = mode.as_str(),
            out = self.out_path(file).display(),
        )
    }
}

fn write_csv<I>(path: &Path, header: &[&str], rows: I) -> Result<()>
where
    I: IntoIterator<Item = Vec<String>>,
{
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create fixture dir: {}", dir.display()))?;
    }
    let mut w = csv::Writer::from_path(path)
        .with_context(|| format!("create fixture csv: {}", path.display()))?;
    w.write_record(header)?;
    for row in rows {
        w.write_record(&row)?;
    }
    w.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Standard scenario
// ---------------------------------------------------------------------------

pub const DAY1: u32 = 20180102;
pub const DAY2: u32 = 20180103;
pub const DAY3: u32 = 20180104;

/// Three qualifying trading days with the day-2 position file missing.
///
/// Accounts:
/// - `acc1`: index future held both ways plus a two-sided `rb` book
/// - `acc2`: long `rb` only (no short commodity leg, no index future)
/// - `acc3`: zero balance
/// - `test_1`, `xve2`: excluded by the stock account pattern
///
/// The calendar also carries rows that must not qualify: a day on the
/// lower bound, a night session, and another exchange.
pub fn standard() -> Result<DataRoot> {
    let root = DataRoot::new()?;

    root.calendar(&[
        (20180101, SESSION, EXCHANGE),
        (DAY1, SESSION, EXCHANGE),
        (DAY2, SESSION, EXCHANGE),
        (DAY3, SESSION, EXCHANGE),
        (DAY2, "night", EXCHANGE),
        (20180105, SESSION, "DCE"),
    ])?;
    root.symbol_info(&[("if1801", 300.0), ("rb1805", 10.0)])?;
    root.product_infos(&[("if", 0.15), ("rb", 0.1)])?;

    let mut bars = Vec::new();
    for d in [DAY1, DAY2, DAY3] {
        bars.push((d, "if1801", 4000.0));
        bars.push((d, "rb1805", 3500.0));
    }
    root.daily_bars(2018, &bars)?;

    for d in [DAY1, DAY3] {
        root.positions(
            d,
            &[
                ("acc1", "if1801", Direction::Long, 1, 0),
                ("acc1", "if1801", Direction::Short, 0, 1),
                ("acc1", "rb1805", Direction::Long, 1, 1),
                ("acc1", "rb1805", Direction::Short, 1, 0),
                ("acc2", "rb1805", Direction::Long, 1, 0),
                ("test_1", "rb1805", Direction::Short, 5, 0),
                ("xve2", "if1801", Direction::Long, 5, 0),
            ],
        )?;
    }

    for d in [DAY1, DAY2, DAY3] {
        root.balances(
            d,
            &[
                ("acc1", 2_000_000.0, 187_000.0),
                ("acc2", 1000.0, 100.0),
                ("acc3", 0.0, 0.0),
                ("test_1", 500.0, 0.0),
                ("xve2", 500.0, 0.0),
            ],
        )?;
        root.pnl(
            d,
            &[
                ("acc1", "rb1805", 600_000.0, 100_000.0),
                ("acc2", "rb1805", 30.0, 4.0),
                ("acc2", "rb1805", 20.0, 6.0),
                ("acc3", "rb1805", 1.0, 0.0),
                ("test_1", "rb1805", 5.0, 0.0),
                ("", "rb1805", 9.0, 0.0),
            ],
        )?;
    }

    Ok(root)
}
