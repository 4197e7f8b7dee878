//! fmr-artifacts
//!
//! Run outputs:
//! - the report CSV (overwritten on each run)
//! - `<report>.manifest.json` describing how the report was produced

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fmr_calendar::tdate_to_date;
use fmr_filedb::ScanReport;
use fmr_portfolio::JoinAudit;
use fmr_risk::{Cell, ReportTable};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const MANIFEST_SCHEMA_VERSION: i32 = 1;

// ---------------------------------------------------------------------------
// Report CSV
// ---------------------------------------------------------------------------

/// Write `table` to `path`, replacing any existing file.
///
/// With `write_index` the first column has an empty header and holds the
/// 0-based row number. Trading days render as `YYYY-MM-DD`; non-finite
/// floats render as empty cells.
pub fn write_report_csv(path: &Path, table: &ReportTable, write_index: bool) -> Result<()> {
    ensure_parent_dir(path)?;
    let mut w = csv::Writer::from_path(path)
        .with_context(|| format!("create report failed: {}", path.display()))?;

    let mut header: Vec<&str> = Vec::with_capacity(table.columns.len() + 1);
    if write_index {
        header.push("");
    }
    header.extend(table.columns.iter().map(String::as_str));
    w.write_record(&header)
        .with_context(|| format!("write report header failed: {}", path.display()))?;

    for (i, row) in table.rows.iter().enumerate() {
        let mut record: Vec<String> = Vec::with_capacity(row.len() + 1);
        if write_index {
            record.push(i.to_string());
        }
        for cell in row {
            record.push(render_cell(cell).with_context(|| format!("report row {i}"))?);
        }
        w.write_record(&record)
            .with_context(|| format!("write report row {i} failed: {}", path.display()))?;
    }

    w.flush()
        .with_context(|| format!("flush report failed: {}", path.display()))?;
    Ok(())
}

fn render_cell(cell: &Cell) -> Result<String> {
    Ok(match cell {
        Cell::Date(tdate) => tdate_to_date(*tdate)?.format("%Y-%m-%d").to_string(),
        Cell::Text(s) => s.clone(),
        Cell::Int(v) => v.to_string(),
        Cell::Float(v) if v.is_finite() => render_float(*v),
        Cell::Float(_) => String::new(),
    })
}

/// Shortest round-trip form, with `.0` kept on whole numbers (`1000.0`) so
/// float columns read the same as the pandas-written reports they replace.
fn render_float(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{v:.1}")
    } else {
        v.to_string()
    }
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: i32,
    pub run_id: Uuid,
    pub mode: String,
    pub config_hash: String,
    pub report: String,
    pub rows: usize,
    pub trade_days: usize,
    pub created_at_utc: DateTime<Utc>,
    pub scans: Vec<ScanReport>,
    pub audits: Vec<JoinAudit>,
}

pub struct RunManifestArgs<'a> {
    pub run_id: Uuid,
    pub mode: &'a str,
    pub config_hash: &'a str,
    pub report_path: &'a Path,
    pub table: &'a ReportTable,
    pub scans: Vec<ScanReport>,
    pub audits: Vec<JoinAudit>,
}

impl RunManifest {
    pub fn new(args: RunManifestArgs<'_>) -> Self {
        Self {
            schema_version: MANIFEST_SCHEMA_VERSION,
            run_id: args.run_id,
            mode: args.mode.to_string(),
            config_hash: args.config_hash.to_string(),
            report: args.report_path.display().to_string(),
            rows: args.table.len(),
            trade_days: args.table.trade_days().len(),
            created_at_utc: Utc::now(),
            scans: args.scans,
            audits: args.audits,
        }
    }
}

/// `balances.csv` -> `balances.csv.manifest.json`
pub fn manifest_path_for(report_path: &Path) -> PathBuf {
    let mut name = report_path.as_os_str().to_os_string();
    name.push(".manifest.json");
    PathBuf::from(name)
}

pub fn write_manifest(path: &Path, manifest: &RunManifest) -> Result<()> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(manifest).context("serialize manifest failed")?;
    fs::write(path, format!("{json}\n"))
        .with_context(|| format!("write manifest failed: {}", path.display()))?;
    Ok(())
}

pub fn read_manifest(path: &Path) -> Result<RunManifest> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read manifest failed: {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse manifest failed: {}", path.display()))
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)
            .with_context(|| format!("create output dir failed: {}", dir.display())),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ReportTable {
        let mut t = ReportTable::new(["trade_day", "pid", "balance", "net_profit"]);
        t.rows.push(vec![
            Cell::Date(20180102),
            Cell::Text("acc1".to_string()),
            Cell::Float(1000.0),
            Cell::Float(1.04),
        ]);
        t.rows.push(vec![
            Cell::Date(20180103),
            Cell::Text("acc1".to_string()),
            Cell::Float(1010.5),
            Cell::Float(f64::NAN),
        ]);
        t
    }

    #[test]
    fn csv_with_index_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("balances.csv");
        write_report_csv(&path, &table(), true).unwrap();

        let body = fs::read_to_string(&path).unwrap();
        assert_eq!(
            body,
            ",trade_day,pid,balance,net_profit\n\
             0,2018-01-02,acc1,1000.0,1.04\n\
             1,2018-01-03,acc1,1010.5,\n"
        );
    }

    #[test]
    fn whole_floats_keep_a_decimal_point() {
        assert_eq!(render_float(2_000_000.0), "2000000.0");
        assert_eq!(render_float(-1500.0), "-1500.0");
        assert_eq!(render_float(0.0), "0.0");
        assert_eq!(render_float(1.25), "1.25");
        assert_eq!(render_float(1e20), "100000000000000000000");
    }

    #[test]
    fn csv_without_index_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("balances.csv");
        fs::write(&path, "stale\nstale\nstale\nstale\n").unwrap();

        write_report_csv(&path, &table(), false).unwrap();
        let body = fs::read_to_string(&path).unwrap();
        assert!(body.starts_with("trade_day,pid,balance,net_profit\n2018-01-02,"));
        assert!(!body.contains("stale"));
    }

    #[test]
    fn manifest_sits_next_to_report() {
        let dir = tempfile::tempdir().unwrap();
        let report = dir.path().join("balances.csv");
        let manifest_path = manifest_path_for(&report);
        assert_eq!(manifest_path, dir.path().join("balances.csv.manifest.json"));

        let t = table();
        let m = RunManifest::new(RunManifestArgs {
            run_id: Uuid::new_v4(),
            mode: "nav",
            config_hash: "abc",
            report_path: &report,
            table: &t,
            scans: Vec::new(),
            audits: vec![JoinAudit::new("profit", 3, 2)],
        });
        write_manifest(&manifest_path, &m).unwrap();

        let back = read_manifest(&manifest_path).unwrap();
        assert_eq!(back.run_id, m.run_id);
        assert_eq!(back.rows, 2);
        assert_eq!(back.trade_days, 2);
        assert_eq!(back.audits[0].dropped(), 1);
    }
}
