//! fmr-risk
//!
//! Aggregation engine: per (trading day, account) margin and value metrics
//! merged onto the balance table.
//!
//! - Category margin: max margin per (day, account, code), summed per
//!   (day, account). Opposing legs on one contract are margined once.
//! - Category value: long minus short contract value (net) or plain sum (gross).
//! - NAV growth: summed P&L merged onto balances, `1 + (profit - fee) / balance`.
//! - Each merge follows a [`JoinPolicy`] and is audited.
//! - Rows with zero balance never reach a division.
//!
//! Deterministic, pure logic. No IO.

mod frame;
mod metrics;
mod reports;
mod table;

pub use fmr_schemas::JoinPolicy;
pub use frame::{BalanceFrame, RowView};
pub use metrics::{
    category_margin, direction_value, gross_value, net_profit_ratio, pnl_totals, AccountDay,
    Metric, PnlTotals,
};
pub use reports::{
    category_report, if_margin_report, nav_report, positions_report, Aggregation, CategorySpec,
    CATEGORY_COLUMNS, IF_MARGIN_COLUMNS, NAV_COLUMNS, POSITION_COLUMNS,
};
pub use table::{Cell, ReportTable};
