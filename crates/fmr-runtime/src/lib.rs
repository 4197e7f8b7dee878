//! fmr-runtime
//!
//! Runs the report pipeline end to end, strictly in order:
//! 1. load reference data (calendar, symbol/product info, daily bars)
//! 2. filter the trading calendar
//! 3. scan the per-day position / balance / P&L files
//! 4. drop excluded accounts
//! 5. enrich and value positions
//! 6. aggregate for the configured report mode
//! 7. write the report and its manifest
//!
//! Any error before step 7 aborts the run without touching the output file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use fmr_artifacts::{manifest_path_for, write_manifest, write_report_csv, RunManifest, RunManifestArgs};
use fmr_calendar::{filter_trading_days, TradingDayFilter};
use fmr_config::ReportConfig;
use fmr_filedb::{DayFileRow, FileDb, ScanReport};
use fmr_md::load_reference_data;
use fmr_portfolio::{enrich_positions, AccountFilter, AccountScoped, JoinAudit, ReferenceIndex};
use fmr_risk::{
    category_report, if_margin_report, nav_report, positions_report, Aggregation, CategorySpec,
};
use fmr_schemas::{BalanceRow, PnlRow, PositionRow, ReportMode};
use tracing::info;
use uuid::Uuid;

/// Everything the pipeline produced before anything was written.
#[derive(Debug, Clone)]
pub struct BuiltReport {
    pub mode: ReportMode,
    pub trade_days: Vec<u32>,
    pub aggregation: Aggregation,
    pub scans: Vec<ScanReport>,
    /// Account exclusion, enrichment and aggregation stages, in run order.
    pub audits: Vec<JoinAudit>,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub mode: ReportMode,
    pub output: PathBuf,
    pub manifest_path: PathBuf,
    pub rows: usize,
    pub trade_days: usize,
    pub dropped_rows: usize,
}

/// Steps 1-6. Pure with respect to the output location.
pub fn build_report(cfg: &ReportConfig) -> Result<BuiltReport> {
    let root = cfg.data.root.as_path();
    let mode = cfg.report.mode;
    info!(root = %root.display(), mode = %mode, "report run starting");

    let reference = load_reference_data(root, cfg.data.years.years())
        .with_context(|| format!("reference data under {}", root.display()))?;

    let filter = trading_day_filter(cfg)?;
    let trade_days =
        filter_trading_days(&reference.calendar, &filter).context("filter trading calendar")?;
    info!(trade_days = trade_days.len(), "trading calendar filtered");

    let accounts = AccountFilter::new(&cfg.accounts.exclude_pattern).with_context(|| {
        format!("accounts.exclude_pattern: '{}'", cfg.accounts.exclude_pattern)
    })?;
    let db = FileDb::new(root);
    let mut scans = Vec::new();
    let mut audits = Vec::new();

    let needs_positions = mode != ReportMode::Nav;
    let needs_balances = mode != ReportMode::Positions;
    let needs_pnl = mode == ReportMode::Nav;

    let positions = if needs_positions {
        let rows = scan_accounts::<PositionRow>(&db, &trade_days, &accounts, &mut scans, &mut audits)?;
        let index = ReferenceIndex::build(&reference.symbols, &reference.products, &reference.bars);
        let enrichment = enrich_positions(rows, &index);
        audits.extend(enrichment.audits);
        enrichment.positions
    } else {
        Vec::new()
    };
    let balances = if needs_balances {
        scan_accounts::<BalanceRow>(&db, &trade_days, &accounts, &mut scans, &mut audits)?
    } else {
        Vec::new()
    };
    let pnl = if needs_pnl {
        scan_accounts::<PnlRow>(&db, &trade_days, &accounts, &mut scans, &mut audits)?
    } else {
        Vec::new()
    };

    let policy = cfg.report.join_policy;
    let aggregation = match mode {
        ReportMode::Nav => nav_report(&balances, &pnl, policy),
        ReportMode::Category => {
            let categories = CategorySpec {
                stock_index: cfg.categories.stock_index.clone(),
                net_value_products: cfg.categories.net_value_products.clone(),
            };
            category_report(&balances, &positions, &categories, policy)
        }
        ReportMode::IfMargin => {
            if_margin_report(&balances, &positions, &cfg.categories.if_products, policy)
        }
        ReportMode::Positions => positions_report(&positions),
    };
    audits.extend(aggregation.audits.iter().cloned());

    Ok(BuiltReport {
        mode,
        trade_days,
        aggregation,
        scans,
        audits,
    })
}

/// Build the report, then write it and its manifest.
pub fn run_report(cfg: &ReportConfig, config_hash: &str) -> Result<RunOutcome> {
    let built = build_report(cfg)?;
    let run_id = Uuid::new_v4();
    let output = cfg.output_path();
    let table = &built.aggregation.table;

    write_report_csv(&output, table, cfg.report.write_index)?;

    let manifest_path = manifest_path_for(&output);
    let dropped_rows: usize = built.audits.iter().map(JoinAudit::dropped).sum();
    let manifest = RunManifest::new(RunManifestArgs {
        run_id,
        mode: built.mode.as_str(),
        config_hash,
        report_path: &output,
        table,
        scans: built.scans,
        audits: built.audits,
    });
    write_manifest(&manifest_path, &manifest)?;

    info!(
        run_id = %run_id,
        output = %output.display(),
        rows = manifest.rows,
        trade_days = manifest.trade_days,
        dropped_rows,
        "report written"
    );

    Ok(RunOutcome {
        run_id,
        mode: built.mode,
        output,
        manifest_path,
        rows: manifest.rows,
        trade_days: manifest.trade_days,
        dropped_rows,
    })
}

fn trading_day_filter(cfg: &ReportConfig) -> Result<TradingDayFilter> {
    let after_tdate = cfg
        .calendar
        .after_tdate
        .tdate()
        .context("calendar.after_tdate")?;
    let until_tdate = match &cfg.calendar.until_tdate {
        Some(d) => Some(d.tdate().context("calendar.until_tdate")?),
        None => None,
    };
    Ok(TradingDayFilter {
        session: cfg.calendar.session.clone(),
        exchange: cfg.calendar.exchange.clone(),
        after_tdate,
        until_tdate,
    })
}

/// Scan one record kind and drop excluded accounts, recording both steps.
fn scan_accounts<R>(
    db: &FileDb,
    days: &[u32],
    accounts: &AccountFilter,
    scans: &mut Vec<ScanReport>,
    audits: &mut Vec<JoinAudit>,
) -> Result<Vec<R::Record>>
where
    R: DayFileRow,
    R::Record: AccountScoped,
{
    let (rows, report) = db
        .load_all::<R>(days)
        .with_context(|| format!("scan {}", R::KIND.dir_name()))?;
    scans.push(report);

    let rows_in = rows.len();
    let (kept, _) = accounts.retain(rows);
    let audit = JoinAudit::new(format!("exclude_accounts:{}", R::KIND.dir_name()), rows_in, kept.len());
    audit.log();
    audits.push(audit);
    Ok(kept)
}
