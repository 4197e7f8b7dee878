//! Trading-day filter.
//!
//! The exchange calendar lists one row per (date, exchange, session). The
//! report only runs over one session/exchange pair and a date window.

use fmr_schemas::TradeDayRow;
use tracing::debug;

use crate::date::{parse_tdate, DateError};

/// Which calendar rows qualify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradingDayFilter {
    /// Session type, matched against the calendar's `product` column.
    pub session: String,
    pub exchange: String,
    /// Strict lower bound: only tdates `> after_tdate` qualify.
    pub after_tdate: u32,
    /// Inclusive upper bound, if any.
    pub until_tdate: Option<u32>,
}

impl TradingDayFilter {
    pub fn admits(&self, tdate: u32) -> bool {
        tdate > self.after_tdate && self.until_tdate.map_or(true, |u| tdate <= u)
    }
}

/// Apply `filter` to the raw calendar and return qualifying tdates, ascending
/// and unique.
///
/// Only rows matching the session/exchange pair are normalised, so malformed
/// dates on other exchanges do not abort the run. Zero matches yields an empty
/// vector.
pub fn filter_trading_days(
    calendar: &[TradeDayRow],
    filter: &TradingDayFilter,
) -> Result<Vec<u32>, DateError> {
    let mut out = Vec::new();

    for row in calendar
        .iter()
        .filter(|r| r.product == filter.session && r.exchange == filter.exchange)
    {
        let tdate = parse_tdate(&row.trade_day)?;
        if filter.admits(tdate) {
            out.push(tdate);
        }
    }

    out.sort_unstable();
    out.dedup();

    debug!(
        session = %filter.session,
        exchange = %filter.exchange,
        after_tdate = filter.after_tdate,
        qualifying = out.len(),
        "trading days filtered"
    );

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(day: &str, session: &str, exchange: &str) -> TradeDayRow {
        TradeDayRow {
            trade_day: day.to_string(),
            product: session.to_string(),
            exchange: exchange.to_string(),
        }
    }

    fn sesh_after(after: u32) -> TradingDayFilter {
        TradingDayFilter {
            session: "busyhour".to_string(),
            exchange: "SESH".to_string(),
            after_tdate: after,
            until_tdate: None,
        }
    }

    #[test]
    fn keeps_only_matching_pair_after_threshold() {
        let cal = vec![
            row("2018-01-01", "busyhour", "SESH"),
            row("2018-01-03", "busyhour", "SESH"),
            row("2018-01-02", "busyhour", "SESH"),
            row("2018-01-02", "night", "SESH"),
            row("2018-01-04", "busyhour", "SZSE"),
        ];
        let days = filter_trading_days(&cal, &sesh_after(20180101)).unwrap();
        assert_eq!(days, vec![20180102, 20180103]);
    }

    #[test]
    fn threshold_is_strict() {
        let cal = vec![row("20161001", "busyhour", "SESH"), row("20161010", "busyhour", "SESH")];
        let days = filter_trading_days(&cal, &sesh_after(20161001)).unwrap();
        assert_eq!(days, vec![20161010]);
    }

    #[test]
    fn until_bound_is_inclusive() {
        let cal = vec![
            row("20180102", "busyhour", "SESH"),
            row("20180103", "busyhour", "SESH"),
            row("20180104", "busyhour", "SESH"),
        ];
        let mut f = sesh_after(20180101);
        f.until_tdate = Some(20180103);
        assert_eq!(filter_trading_days(&cal, &f).unwrap(), vec![20180102, 20180103]);
    }

    #[test]
    fn no_matching_pair_is_empty_not_error() {
        let cal = vec![row("2018-01-02", "night", "DCE")];
        assert!(filter_trading_days(&cal, &sesh_after(0)).unwrap().is_empty());
    }

    #[test]
    fn malformed_date_in_matching_pair_is_fatal() {
        let cal = vec![row("not-a-day", "busyhour", "SESH")];
        assert!(filter_trading_days(&cal, &sesh_after(0)).is_err());
    }

    #[test]
    fn malformed_date_elsewhere_is_ignored() {
        let cal = vec![row("not-a-day", "night", "DCE"), row("20180102", "busyhour", "SESH")];
        assert_eq!(filter_trading_days(&cal, &sesh_after(0)).unwrap(), vec![20180102]);
    }

    #[test]
    fn duplicate_rows_collapse() {
        let cal = vec![row("20180102", "busyhour", "SESH"), row("2018-01-02", "busyhour", "SESH")];
        assert_eq!(filter_trading_days(&cal, &sesh_after(0)).unwrap(), vec![20180102]);
    }
}
