//! Command handler modules for fmr-cli.
//!
//! Shared utilities used by multiple command paths live here.

pub mod report;

use anyhow::{Context, Result};
use fmr_calendar::{to_tdate, DateInput};
use fmr_schemas::ReportMode;

/// Environment fallback for the data root.
pub const ENV_DATA_ROOT: &str = "FMR_DATA_ROOT";

/// Parse a CLI `--mode` string into a [`ReportMode`].
pub fn parse_report_mode(mode: &str) -> Result<ReportMode> {
    ReportMode::parse(mode).with_context(|| {
        format!("invalid --mode '{mode}'. expected one of: nav | category | if_margin | positions")
    })
}

/// Integers go through the integer path so `20180305` and `2018-03-05` agree.
pub fn parse_date_arg(value: &str) -> Result<u32> {
    let trimmed = value.trim();
    let input = match trimmed.parse::<i64>() {
        Ok(v) => DateInput::Int(v),
        Err(_) => DateInput::from(trimmed),
    };
    to_tdate(&input).with_context(|| format!("invalid date value: '{value}'"))
}
