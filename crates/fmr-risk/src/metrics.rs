//! Per (trading day, account) metrics over enriched positions and P&L.
//!
//! A [`Metric`] only holds keys that had at least one contributing row; an
//! absent key means "no data", which the merge step treats per its policy.

use std::collections::BTreeMap;

use fmr_schemas::{Direction, EnrichedPosition, Pnl};

/// (tdate, pid)
pub type AccountDay = (u32, String);

pub type Metric = BTreeMap<AccountDay, f64>;

/// Category margin: the largest margin per (day, account, code), summed over
/// the codes of the category.
///
/// Long and short legs on the same contract are not added together; only
/// the larger requirement counts.
pub fn category_margin<F>(positions: &[EnrichedPosition], in_category: F) -> Metric
where
    F: Fn(&EnrichedPosition) -> bool,
{
    let mut per_code: BTreeMap<(u32, &str, &str), f64> = BTreeMap::new();
    for p in positions {
        if !in_category(p) {
            continue;
        }
        per_code
            .entry((p.tdate, p.pid.as_str(), p.code.as_str()))
            .and_modify(|m| *m = m.max(p.margin))
            .or_insert(p.margin);
    }

    let mut out = Metric::new();
    for ((tdate, pid, _code), margin) in per_code {
        *out.entry((tdate, pid.to_string())).or_insert(0.0) += margin;
    }
    out
}

/// Sum of contract value over positions of one direction.
pub fn direction_value<F>(positions: &[EnrichedPosition], in_category: F, dir: Direction) -> Metric
where
    F: Fn(&EnrichedPosition) -> bool,
{
    gross_value(positions, |p| p.dir == dir && in_category(p))
}

/// Sum of contract value regardless of direction (not netted).
pub fn gross_value<F>(positions: &[EnrichedPosition], in_category: F) -> Metric
where
    F: Fn(&EnrichedPosition) -> bool,
{
    let mut out = Metric::new();
    for p in positions {
        if !in_category(p) {
            continue;
        }
        *out.entry((p.tdate, p.pid.clone())).or_insert(0.0) += p.value;
    }
    out
}

/// Summed P&L per (day, account).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PnlTotals {
    pub profit: Metric,
    pub fee: Metric,
    /// Rows with a blank account id; they cannot be attributed.
    pub unattributed: usize,
}

pub fn pnl_totals(pnl: &[Pnl]) -> PnlTotals {
    let mut totals = PnlTotals::default();
    for row in pnl {
        if row.pid.trim().is_empty() {
            totals.unattributed += 1;
            continue;
        }
        let key = (row.tdate, row.pid.clone());
        *totals.profit.entry(key.clone()).or_insert(0.0) += row.profit;
        *totals.fee.entry(key).or_insert(0.0) += row.fee;
    }
    totals
}

/// `1 + (profit - fee) / balance`; `None` for a zero balance.
pub fn net_profit_ratio(profit: f64, fee: f64, balance: f64) -> Option<f64> {
    if balance == 0.0 {
        return None;
    }
    Some(1.0 + (profit - fee) / balance)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ep(
        tdate: u32,
        pid: &str,
        code: &str,
        dir: Direction,
        value: f64,
        margin: f64,
    ) -> EnrichedPosition {
        let product = code
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect::<String>();
        EnrichedPosition {
            tdate,
            pid: pid.to_string(),
            code: code.to_string(),
            dir,
            prev_pos: 0,
            cur_pos: 1,
            product,
            multiple: 1.0,
            margin_ratio: 0.1,
            close: value,
            total_pos: 1,
            value,
            margin,
        }
    }

    fn key(tdate: u32, pid: &str) -> AccountDay {
        (tdate, pid.to_string())
    }

    #[test]
    fn opposing_legs_count_max_margin_not_sum() {
        let ps = vec![
            ep(20180102, "a", "if1801", Direction::Long, 3000.0, 300.0),
            ep(20180102, "a", "if1801", Direction::Short, 4500.0, 450.0),
        ];
        let m = category_margin(&ps, |_| true);
        assert_eq!(m[&key(20180102, "a")], 450.0);
    }

    #[test]
    fn category_margin_sums_across_codes() {
        let ps = vec![
            ep(20180102, "a", "if1801", Direction::Long, 0.0, 300.0),
            ep(20180102, "a", "if1802", Direction::Short, 0.0, 200.0),
            ep(20180102, "a", "rb1805", Direction::Short, 0.0, 999.0),
        ];
        let m = category_margin(&ps, |p| p.product == "if");
        assert_eq!(m[&key(20180102, "a")], 500.0);
    }

    #[test]
    fn gross_and_direction_values() {
        let ps = vec![
            ep(20180102, "a", "rb1805", Direction::Long, 1000.0, 0.0),
            ep(20180102, "a", "cu1805", Direction::Short, 400.0, 0.0),
        ];
        assert_eq!(gross_value(&ps, |_| true)[&key(20180102, "a")], 1400.0);
        assert_eq!(
            direction_value(&ps, |_| true, Direction::Short)[&key(20180102, "a")],
            400.0
        );
    }

    #[test]
    fn direction_value_has_no_key_without_that_side() {
        let ps = vec![ep(20180102, "a", "rb1805", Direction::Long, 1000.0, 0.0)];
        assert!(direction_value(&ps, |_| true, Direction::Short).is_empty());
        assert_eq!(
            direction_value(&ps, |_| true, Direction::Long)[&key(20180102, "a")],
            1000.0
        );
    }

    #[test]
    fn pnl_sums_per_account_day() {
        let row = |pid: &str, profit: f64, fee: f64| Pnl {
            tdate: 20180102,
            pid: pid.to_string(),
            code: "rb1805".to_string(),
            profit,
            fee,
        };
        let t = pnl_totals(&[row("a", 30.0, 4.0), row("a", 20.0, 6.0), row("", 1.0, 1.0)]);
        assert_eq!(t.profit[&key(20180102, "a")], 50.0);
        assert_eq!(t.fee[&key(20180102, "a")], 10.0);
        assert_eq!(t.unattributed, 1);
    }

    #[test]
    fn net_profit_ratio_example() {
        let r = net_profit_ratio(50.0, 10.0, 1000.0).unwrap();
        assert!((r - 1.04).abs() < 1e-12);
        assert_eq!(net_profit_ratio(50.0, 10.0, 0.0), None);
    }
}
