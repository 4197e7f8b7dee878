//! Typed report configuration.
//!
//! Defaults reproduce the stock run: Shanghai busy-hour calendar after
//! 2018-01-01, daily bars for 2016..=2018, NAV report to `balances.csv`.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use fmr_calendar::{to_tdate, DateInput};
use fmr_schemas::{JoinPolicy, ReportMode};
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub data: DataConfig,
    pub calendar: CalendarConfig,
    pub accounts: AccountsConfig,
    pub report: ReportSection,
    pub categories: CategoryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Root holding `market/` and `filedb/`.
    pub root: PathBuf,
    /// Years whose `{year}.dbar_ftr.csv` are loaded.
    pub years: YearRange,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            years: YearRange::default(),
        }
    }
}

/// Inclusive year range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl Default for YearRange {
    fn default() -> Self {
        Self {
            start: 2016,
            end: 2018,
        }
    }
}

impl YearRange {
    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.start..=self.end
    }
}

/// A date in config: integer YYYYMMDD or any text layout the calendar accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateSetting {
    Int(i64),
    Text(String),
}

impl DateSetting {
    pub fn tdate(&self) -> Result<u32> {
        let input = match self {
            DateSetting::Int(v) => DateInput::Int(*v),
            DateSetting::Text(s) => DateInput::Text(s.clone()),
        };
        to_tdate(&input).with_context(|| format!("invalid date setting: {self:?}"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// Session type (`product` column of the calendar).
    pub session: String,
    pub exchange: String,
    /// Strict lower bound.
    pub after_tdate: DateSetting,
    /// Inclusive upper bound.
    pub until_tdate: Option<DateSetting>,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            session: "busyhour".to_string(),
            exchange: "SESH".to_string(),
            after_tdate: DateSetting::Int(20180101),
            until_tdate: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountsConfig {
    /// Regex; account ids containing a match are test/virtual accounts.
    pub exclude_pattern: String,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            exclude_pattern: "_|-|ve".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSection {
    pub mode: ReportMode,
    /// Defaults to [`ReportMode::default_output`].
    pub output: Option<PathBuf>,
    pub write_index: bool,
    pub join_policy: JoinPolicy,
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            mode: ReportMode::Nav,
            output: None,
            write_index: true,
            join_policy: JoinPolicy::Inner,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    /// Products counted as stock-index futures; everything else is commodity.
    pub stock_index: Vec<String>,
    /// Products in the `if_margin` report.
    pub if_products: Vec<String>,
    /// Products that get `{product}_long_value`, `{product}_short_value` and
    /// `{product}_value` columns in the category report.
    pub net_value_products: Vec<String>,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            stock_index: vec!["if".to_string(), "ih".to_string(), "ic".to_string()],
            if_products: vec!["if".to_string()],
            net_value_products: vec!["if".to_string(), "ih".to_string(), "ic".to_string()],
        }
    }
}

impl ReportConfig {
    pub fn validate(&self) -> Result<()> {
        if self.data.years.start > self.data.years.end {
            bail!(
                "data.years.start ({}) must be <= data.years.end ({})",
                self.data.years.start,
                self.data.years.end
            );
        }

        let after = self.calendar.after_tdate.tdate()?;
        if let Some(until) = &self.calendar.until_tdate {
            let until = until.tdate()?;
            if until <= after {
                bail!("calendar.until_tdate ({until}) must be after calendar.after_tdate ({after})");
            }
        }

        Regex::new(&self.accounts.exclude_pattern).with_context(|| {
            format!(
                "accounts.exclude_pattern is not a valid regex: '{}'",
                self.accounts.exclude_pattern
            )
        })?;

        if let Some(out) = &self.report.output {
            if out.as_os_str().is_empty() {
                bail!("report.output must not be empty");
            }
        }

        if self.report.mode == ReportMode::IfMargin && self.categories.if_products.is_empty() {
            bail!("categories.if_products must name at least one product for if_margin");
        }

        Ok(())
    }

    pub fn output_path(&self) -> PathBuf {
        self.report
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.report.mode.default_output()))
    }
}
