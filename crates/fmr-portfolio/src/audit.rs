use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Row counts across one filter or join stage.
///
/// Inner joins silently drop unmatched rows; the audit makes each drop visible
/// in the log and in the run manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinAudit {
    pub stage: String,
    pub rows_in: usize,
    pub rows_out: usize,
}

impl JoinAudit {
    pub fn new(stage: impl Into<String>, rows_in: usize, rows_out: usize) -> Self {
        debug_assert!(rows_out <= rows_in, "a filter/join stage cannot add rows");
        Self {
            stage: stage.into(),
            rows_in,
            rows_out,
        }
    }

    pub fn dropped(&self) -> usize {
        self.rows_in.saturating_sub(self.rows_out)
    }

    /// Emit the audit; `warn` when rows were dropped.
    pub fn log(&self) {
        if self.dropped() > 0 {
            warn!(
                stage = %self.stage,
                rows_in = self.rows_in,
                rows_out = self.rows_out,
                dropped = self.dropped(),
                "rows dropped"
            );
        } else {
            info!(
                stage = %self.stage,
                rows_in = self.rows_in,
                rows_out = self.rows_out,
                "stage complete"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropped_is_the_difference() {
        let a = JoinAudit::new("symbol_info", 10, 7);
        assert_eq!(a.dropped(), 3);
        assert_eq!(JoinAudit::new("x", 4, 4).dropped(), 0);
    }
}
