use fmr_portfolio::JoinAudit;
use fmr_schemas::{Balance, JoinPolicy};
use tracing::warn;

use crate::metrics::{AccountDay, Metric};
use crate::table::{Cell, ReportTable};

const BALANCE: usize = 0;

/// The balance table with metric columns merged onto it.
///
/// Rows are keyed by (tdate, pid) and kept sorted by that key. Every column
/// is numeric; the first two are always `balance` and `margin`.
#[derive(Debug, Clone)]
pub struct BalanceFrame {
    keys: Vec<AccountDay>,
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl BalanceFrame {
    pub fn from_balances(balances: &[Balance]) -> Self {
        let mut sorted: Vec<&Balance> = balances.iter().collect();
        sorted.sort_by(|a, b| (a.tdate, &a.pid).cmp(&(b.tdate, &b.pid)));

        Self {
            keys: sorted.iter().map(|b| (b.tdate, b.pid.clone())).collect(),
            columns: vec!["balance".to_string(), "margin".to_string()],
            rows: sorted.iter().map(|b| vec![b.balance, b.margin]).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[AccountDay] {
        &self.keys
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Value of `column` in row `row`.
    pub fn value(&self, row: usize, column: &str) -> Option<f64> {
        let idx = self.column(column)?;
        self.rows.get(row).map(|r| r[idx])
    }

    /// Merge `metric` as column `name` on (tdate, pid).
    ///
    /// `Inner` drops rows without a metric value; `FillZero` keeps them with 0.
    /// Merging an existing column name overwrites it.
    pub fn merge(&mut self, name: &str, metric: &Metric, policy: JoinPolicy) -> JoinAudit {
        let rows_in = self.len();
        let keys = std::mem::take(&mut self.keys);
        let rows = std::mem::take(&mut self.rows);
        let existing = self.column(name);
        if existing.is_none() {
            self.columns.push(name.to_string());
        }

        for (key, mut row) in keys.into_iter().zip(rows) {
            let v = match (metric.get(&key), policy) {
                (Some(v), _) => *v,
                (None, JoinPolicy::FillZero) => 0.0,
                (None, JoinPolicy::Inner) => continue,
            };
            match existing {
                Some(idx) => row[idx] = v,
                None => row.push(v),
            }
            self.keys.push(key);
            self.rows.push(row);
        }

        let audit = JoinAudit::new(name, rows_in, self.len());
        audit.log();
        audit
    }

    /// Drop rows whose balance is exactly zero, so no ratio divides by it.
    pub fn exclude_zero_balance(&mut self) -> JoinAudit {
        let rows_in = self.len();
        let keys = std::mem::take(&mut self.keys);
        let rows = std::mem::take(&mut self.rows);
        for (key, row) in keys.into_iter().zip(rows) {
            if row[BALANCE] == 0.0 {
                warn!(tdate = key.0, pid = %key.1, "zero balance, row excluded");
                continue;
            }
            self.keys.push(key);
            self.rows.push(row);
        }

        let audit = JoinAudit::new("zero_balance", rows_in, self.len());
        audit.log();
        audit
    }

    /// Add a column computed from each row's current values.
    ///
    /// `f` sees the row through a lookup by column name; a missing column
    /// reads as NaN.
    pub fn derive<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&RowView<'_>) -> f64,
    {
        let values: Vec<f64> = self
            .rows
            .iter()
            .map(|row| {
                f(&RowView {
                    columns: &self.columns,
                    row,
                })
            })
            .collect();
        self.set_column(name, values);
    }

    /// Add (or overwrite) a column from precomputed values, one per row.
    pub fn set_column(&mut self, name: &str, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.len());
        let existing = self.column(name);
        if existing.is_none() {
            self.columns.push(name.to_string());
        }
        for (row, v) in self.rows.iter_mut().zip(values) {
            match existing {
                Some(idx) => row[idx] = v,
                None => row.push(v),
            }
        }
    }

    /// `column / balance` as a new column.
    pub fn ratio_to_balance(&mut self, name: &str, column: &str) {
        self.derive(name, |r| r.get(column) / r.get("balance"));
    }

    /// Emit `trade_day, pid` followed by `order`. Names not in the frame are
    /// skipped.
    pub fn to_table<S: AsRef<str>>(&self, order: &[S]) -> ReportTable {
        let selected: Vec<(&str, usize)> = order
            .iter()
            .filter_map(|name| {
                let name = name.as_ref();
                self.column(name).map(|idx| (name, idx))
            })
            .collect();

        let mut table = ReportTable::new(
            ["trade_day", "pid"]
                .into_iter()
                .chain(selected.iter().map(|(name, _)| *name)),
        );
        for ((tdate, pid), row) in self.keys.iter().zip(&self.rows) {
            let mut cells = Vec::with_capacity(selected.len() + 2);
            cells.push(Cell::Date(*tdate));
            cells.push(Cell::Text(pid.clone()));
            cells.extend(selected.iter().map(|(_, idx)| Cell::Float(row[*idx])));
            table.rows.push(cells);
        }
        table
    }
}

/// Read-only view of one frame row, addressed by column name.
pub struct RowView<'a> {
    columns: &'a [String],
    row: &'a [f64],
}

impl RowView<'_> {
    pub fn get(&self, column: &str) -> f64 {
        self.columns
            .iter()
            .position(|c| c == column)
            .map_or(f64::NAN, |idx| self.row[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bal(tdate: u32, pid: &str, balance: f64) -> Balance {
        Balance {
            tdate,
            pid: pid.to_string(),
            balance,
            margin: balance / 10.0,
        }
    }

    fn metric(entries: &[(u32, &str, f64)]) -> Metric {
        entries
            .iter()
            .map(|(d, p, v)| ((*d, p.to_string()), *v))
            .collect()
    }

    #[test]
    fn rows_sorted_by_day_then_account() {
        let f = BalanceFrame::from_balances(&[
            bal(20180103, "a", 1.0),
            bal(20180102, "b", 1.0),
            bal(20180102, "a", 1.0),
        ]);
        let keys: Vec<(u32, &str)> = f.keys().iter().map(|(d, p)| (*d, p.as_str())).collect();
        assert_eq!(keys, vec![(20180102, "a"), (20180102, "b"), (20180103, "a")]);
    }

    #[test]
    fn inner_merge_drops_and_audits() {
        let mut f = BalanceFrame::from_balances(&[bal(20180102, "a", 100.0), bal(20180102, "b", 100.0)]);
        let audit = f.merge("x", &metric(&[(20180102, "a", 5.0)]), JoinPolicy::Inner);
        assert_eq!(audit.stage, "x");
        assert_eq!(audit.dropped(), 1);
        assert_eq!(f.len(), 1);
        assert_eq!(f.value(0, "x"), Some(5.0));
    }

    #[test]
    fn fill_zero_merge_keeps_rows() {
        let mut f = BalanceFrame::from_balances(&[bal(20180102, "a", 100.0), bal(20180102, "b", 100.0)]);
        let audit = f.merge("x", &metric(&[(20180102, "a", 5.0)]), JoinPolicy::FillZero);
        assert_eq!(audit.dropped(), 0);
        assert_eq!(f.value(1, "x"), Some(0.0));
    }

    #[test]
    fn zero_balance_rows_excluded() {
        let mut f = BalanceFrame::from_balances(&[bal(20180102, "a", 0.0), bal(20180102, "b", 100.0)]);
        let audit = f.exclude_zero_balance();
        assert_eq!(audit.dropped(), 1);
        assert_eq!(f.keys()[0].1, "b");
    }

    #[test]
    fn derived_ratio_and_column_order() {
        let mut f = BalanceFrame::from_balances(&[bal(20180102, "a", 200.0)]);
        f.ratio_to_balance("margin_proportion", "margin");
        assert_eq!(f.value(0, "margin_proportion"), Some(0.1));

        let t = f.to_table(&["margin_proportion", "missing", "balance"]);
        assert_eq!(t.columns, vec!["trade_day", "pid", "margin_proportion", "balance"]);
        assert_eq!(t.float(0, "balance"), Some(200.0));
    }
}
