use fmr_schemas::{Balance, EnrichedPosition, Pnl, Position};
use regex::Regex;

/// Rows that belong to a trading account.
pub trait AccountScoped {
    fn pid(&self) -> &str;
}

impl AccountScoped for Position {
    fn pid(&self) -> &str {
        &self.pid
    }
}

impl AccountScoped for Balance {
    fn pid(&self) -> &str {
        &self.pid
    }
}

impl AccountScoped for Pnl {
    fn pid(&self) -> &str {
        &self.pid
    }
}

impl AccountScoped for EnrichedPosition {
    fn pid(&self) -> &str {
        &self.pid
    }
}

/// Excludes test/virtual accounts.
///
/// An account is excluded when the pattern matches anywhere in its id
/// (case-sensitive). The stock pattern `_|-|ve` drops `abc_1`, `x-2` and
/// `xve2` but keeps `abc1` and `XVE2`.
#[derive(Debug, Clone)]
pub struct AccountFilter {
    re: Regex,
}

impl AccountFilter {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            re: Regex::new(pattern)?,
        })
    }

    pub fn is_excluded(&self, pid: &str) -> bool {
        self.re.is_match(pid)
    }

    /// Keep rows of non-excluded accounts; returns the kept rows and the
    /// number dropped.
    pub fn retain<T: AccountScoped>(&self, rows: Vec<T>) -> (Vec<T>, usize) {
        let before = rows.len();
        let kept: Vec<T> = rows
            .into_iter()
            .filter(|r| !self.is_excluded(r.pid()))
            .collect();
        let dropped = before - kept.len();
        (kept, dropped)
    }
}
