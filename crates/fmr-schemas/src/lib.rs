//! fmr-schemas
//!
//! Row types shared by every stage of the margin report pipeline.
//!
//! Two layers:
//! - `*Row` types mirror the CSV exports column-for-column (only the projected
//!   columns; serde ignores the rest). `trade_day` stays as raw text.
//! - Record types (`Position`, `Balance`, ...) carry the normalised integer
//!   trading date (`tdate`, YYYYMMDD) and are what the rest of the pipeline sees.
//!
//! Conversion from row to record happens in the loaders, which own date
//! normalisation. No IO here.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Raw -> record conversion
// ---------------------------------------------------------------------------

/// A CSV row stamped with a raw `trade_day` value.
///
/// Loaders normalise `trade_day()` to a tdate and then call `into_record`.
pub trait DailyRow {
    type Record: DayStamped;

    fn trade_day(&self) -> &str;

    fn into_record(self, tdate: u32) -> Self::Record;
}

/// A record that belongs to one trading day.
pub trait DayStamped {
    fn tdate(&self) -> u32;
}

// ---------------------------------------------------------------------------
// Reference data
// ---------------------------------------------------------------------------

/// One row of `market/tradeday.csv`.
///
/// `product` is the session type (e.g. `busyhour`), not a futures product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeDayRow {
    pub trade_day: String,
    pub product: String,
    pub exchange: String,
}

/// One row of `market/symbol_info.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub code: String,
    /// Contract multiplier.
    pub multiple: f64,
}

/// One row of `market/product_infos.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub product: String,
    pub margin_ratio: f64,
}

/// One row of `market/{year}.dbar_ftr.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBarRow {
    pub trade_day: String,
    pub code: String,
    pub close: f64,
}

/// Closing price of a contract on a trading day.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBar {
    pub tdate: u32,
    pub code: String,
    pub close: f64,
}

impl DailyRow for DailyBarRow {
    type Record = DailyBar;

    fn trade_day(&self) -> &str {
        &self.trade_day
    }

    fn into_record(self, tdate: u32) -> DailyBar {
        DailyBar {
            tdate,
            code: self.code,
            close: self.close,
        }
    }
}

impl DayStamped for DailyBar {
    fn tdate(&self) -> u32 {
        self.tdate
    }
}

// ---------------------------------------------------------------------------
// Per-day account data
// ---------------------------------------------------------------------------

/// Position direction as exported (`Long` / `Short`).
///
/// Ordering is `Long < Short`, matching a lexical sort on the exported text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "Long",
            Direction::Short => "Short",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of `{tdate}.ftr_pos.csv`.
///
/// Lot counts may be written as floats (`2.0`) and must be whole. `dir` is
/// strict: a direction other than `Long`/`Short` fails the row, since it
/// would otherwise be valued but counted on neither side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRow {
    pub trade_day: String,
    pub pid: String,
    pub code: String,
    pub dir: Direction,
    #[serde(deserialize_with = "whole_lots")]
    pub prev_pos: i64,
    #[serde(deserialize_with = "whole_lots")]
    pub cur_pos: i64,
}

fn whole_lots<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let v = f64::deserialize(deserializer)?;
    if !v.is_finite() || v.fract() != 0.0 || v.abs() > i64::MAX as f64 {
        return Err(serde::de::Error::custom(format!("lot count must be a whole number, got {v}")));
    }
    Ok(v as i64)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub tdate: u32,
    pub pid: String,
    pub code: String,
    pub dir: Direction,
    pub prev_pos: i64,
    pub cur_pos: i64,
}

impl DailyRow for PositionRow {
    type Record = Position;

    fn trade_day(&self) -> &str {
        &self.trade_day
    }

    fn into_record(self, tdate: u32) -> Position {
        Position {
            tdate,
            pid: self.pid,
            code: self.code,
            dir: self.dir,
            prev_pos: self.prev_pos,
            cur_pos: self.cur_pos,
        }
    }
}

impl DayStamped for Position {
    fn tdate(&self) -> u32 {
        self.tdate
    }
}

/// One row of `{tdate}.ftr_balance.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceRow {
    pub trade_day: String,
    pub pid: String,
    pub balance: f64,
    pub occupied: f64,
}

/// Account balance for a day. `margin` is the exported `occupied` column.
#[derive(Debug, Clone, PartialEq)]
pub struct Balance {
    pub tdate: u32,
    pub pid: String,
    pub balance: f64,
    pub margin: f64,
}

impl DailyRow for BalanceRow {
    type Record = Balance;

    fn trade_day(&self) -> &str {
        &self.trade_day
    }

    fn into_record(self, tdate: u32) -> Balance {
        Balance {
            tdate,
            pid: self.pid,
            balance: self.balance,
            margin: self.occupied,
        }
    }
}

impl DayStamped for Balance {
    fn tdate(&self) -> u32 {
        self.tdate
    }
}

/// One row of `{tdate}.daily_pnl.csv`.
///
/// `profit` / `fee` may be blank in the export; blanks sum as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnlRow {
    pub trade_day: String,
    #[serde(default)]
    pub pid: String,
    pub code: String,
    pub profit: Option<f64>,
    pub fee: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pnl {
    pub tdate: u32,
    pub pid: String,
    pub code: String,
    pub profit: f64,
    pub fee: f64,
}

impl DailyRow for PnlRow {
    type Record = Pnl;

    fn trade_day(&self) -> &str {
        &self.trade_day
    }

    fn into_record(self, tdate: u32) -> Pnl {
        Pnl {
            tdate,
            pid: self.pid,
            code: self.code,
            profit: self.profit.unwrap_or(0.0),
            fee: self.fee.unwrap_or(0.0),
        }
    }
}

impl DayStamped for Pnl {
    fn tdate(&self) -> u32 {
        self.tdate
    }
}

// ---------------------------------------------------------------------------
// Enriched position
// ---------------------------------------------------------------------------

/// A position joined with its reference data and valued at the day's close.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedPosition {
    pub tdate: u32,
    pub pid: String,
    pub code: String,
    pub dir: Direction,
    pub prev_pos: i64,
    pub cur_pos: i64,
    /// Leading alphabetic run of `code`.
    pub product: String,
    pub multiple: f64,
    pub margin_ratio: f64,
    pub close: f64,
    /// `prev_pos + cur_pos`
    pub total_pos: i64,
    /// `total_pos * multiple * close`
    pub value: f64,
    /// `value * margin_ratio`
    pub margin: f64,
}

impl DayStamped for EnrichedPosition {
    fn tdate(&self) -> u32 {
        self.tdate
    }
}

// ---------------------------------------------------------------------------
// Report vocabulary
// ---------------------------------------------------------------------------

/// Which summary table a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    /// Balance + summed P&L, net profit ratio and running NAV.
    #[default]
    Nav,
    /// Stock-index / commodity margin and value breakdown.
    Category,
    /// Index-future margin ratio only.
    IfMargin,
    /// The enriched position table itself.
    Positions,
}

impl ReportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportMode::Nav => "nav",
            ReportMode::Category => "category",
            ReportMode::IfMargin => "if_margin",
            ReportMode::Positions => "positions",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "nav" => Some(ReportMode::Nav),
            "category" => Some(ReportMode::Category),
            "if_margin" => Some(ReportMode::IfMargin),
            "positions" => Some(ReportMode::Positions),
            _ => None,
        }
    }

    /// Output file name used when the config does not name one.
    pub fn default_output(&self) -> &'static str {
        match self {
            ReportMode::Positions => "positions.csv",
            _ => "balances.csv",
        }
    }
}

impl fmt::Display for ReportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a per-account metric is merged onto the balance table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinPolicy {
    /// Drop balance rows that have no value for the metric.
    #[default]
    Inner,
    /// Keep the balance row and use 0 for the missing metric.
    FillZero,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_sorts_long_before_short() {
        let mut v = vec![Direction::Short, Direction::Long];
        v.sort();
        assert_eq!(v, vec![Direction::Long, Direction::Short]);
        assert_eq!(Direction::Short.to_string(), "Short");
    }

    #[test]
    fn position_row_ignores_unprojected_columns() {
        let csv = "trade_day,pid,code,dir,prev_pos,cur_pos,extra\n\
                   2018-01-02,acc1,rb1805,Long,2,3,zzz\n";
        let mut rdr = csv::Reader::from_reader(csv.as_bytes());
        let rows: Vec<PositionRow> = rdr.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].dir, Direction::Long);
        assert_eq!(rows[0].prev_pos + rows[0].cur_pos, 5);
    }

    #[test]
    fn position_lots_accept_whole_floats() {
        let csv = "trade_day,pid,code,dir,prev_pos,cur_pos\n\
                   2018-01-02,acc1,rb1805,Short,2.0,3\n";
        let mut rdr = csv::Reader::from_reader(csv.as_bytes());
        let row: PositionRow = rdr.deserialize().next().unwrap().unwrap();
        assert_eq!((row.prev_pos, row.cur_pos), (2, 3));

        let csv = "trade_day,pid,code,dir,prev_pos,cur_pos\n\
                   2018-01-02,acc1,rb1805,Short,2.5,3\n";
        let mut rdr = csv::Reader::from_reader(csv.as_bytes());
        let err = rdr.deserialize::<PositionRow>().next().unwrap().unwrap_err();
        assert!(err.to_string().contains("whole number"), "{err}");
    }

    #[test]
    fn pnl_blank_values_become_zero() {
        let csv = "trade_day,pid,code,profit,fee\n20180102,acc1,rb1805,,1.5\n";
        let mut rdr = csv::Reader::from_reader(csv.as_bytes());
        let row: PnlRow = rdr.deserialize().next().unwrap().unwrap();
        let rec = row.into_record(20180102);
        assert_eq!(rec.profit, 0.0);
        assert_eq!(rec.fee, 1.5);
        assert_eq!(rec.tdate(), 20180102);
    }

    #[test]
    fn report_mode_parses_cli_spellings() {
        assert_eq!(ReportMode::parse("NAV"), Some(ReportMode::Nav));
        assert_eq!(ReportMode::parse("if-margin"), Some(ReportMode::IfMargin));
        assert_eq!(ReportMode::parse("bogus"), None);
        assert_eq!(ReportMode::Positions.default_output(), "positions.csv");
        assert_eq!(ReportMode::Category.default_output(), "balances.csv");
    }

    #[test]
    fn balance_occupied_maps_to_margin() {
        let row = BalanceRow {
            trade_day: "2018-01-02".to_string(),
            pid: "acc1".to_string(),
            balance: 1000.0,
            occupied: 250.0,
        };
        let rec = row.into_record(20180102);
        assert_eq!(rec.margin, 250.0);
        assert_eq!(rec.balance, 1000.0);
    }
}
