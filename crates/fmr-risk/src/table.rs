/// One output value. `Date` holds a YYYYMMDD trading day and is rendered as
/// a calendar date by the writer.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Date(u32),
    Text(String),
    Int(i64),
    Float(f64),
}

impl Cell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Float(v) => Some(*v),
            Cell::Int(v) => Some(*v as f64),
            _ => None,
        }
    }
}

/// Column-named rows, ready for the report writer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl ReportTable {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)
    }

    /// Numeric value of `column` in `row`.
    pub fn float(&self, row: usize, column: &str) -> Option<f64> {
        self.cell(row, column)?.as_f64()
    }

    /// Distinct trading days present in the `trade_day` column, ascending.
    pub fn trade_days(&self) -> Vec<u32> {
        let Some(idx) = self.column_index("trade_day") else {
            return Vec::new();
        };
        let mut days: Vec<u32> = self
            .rows
            .iter()
            .filter_map(|r| match r.get(idx) {
                Some(Cell::Date(d)) => Some(*d),
                _ => None,
            })
            .collect();
        days.sort_unstable();
        days.dedup();
        days
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_column_name() {
        let mut t = ReportTable::new(["trade_day", "pid", "balance"]);
        t.rows.push(vec![
            Cell::Date(20180103),
            Cell::Text("a".to_string()),
            Cell::Float(1000.0),
        ]);
        t.rows.push(vec![
            Cell::Date(20180102),
            Cell::Text("a".to_string()),
            Cell::Int(7),
        ]);
        assert_eq!(t.float(0, "balance"), Some(1000.0));
        assert_eq!(t.float(1, "balance"), Some(7.0));
        assert_eq!(t.float(0, "pid"), None);
        assert_eq!(t.float(0, "nope"), None);
        assert_eq!(t.trade_days(), vec![20180102, 20180103]);
    }
}
