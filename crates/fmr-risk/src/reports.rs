use std::collections::HashMap;

use fmr_portfolio::JoinAudit;
use fmr_schemas::{Balance, Direction, EnrichedPosition, JoinPolicy, Pnl};
use tracing::info;

use crate::frame::BalanceFrame;
use crate::metrics::{category_margin, direction_value, gross_value, net_profit_ratio, pnl_totals};
use crate::table::{Cell, ReportTable};

/// Product groupings for the category report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySpec {
    /// Products counted as stock-index futures; everything else is commodity.
    pub stock_index: Vec<String>,
    /// Products that get `{product}_long_value`, `{product}_short_value`
    /// and `{product}_value` columns.
    pub net_value_products: Vec<String>,
}

impl Default for CategorySpec {
    fn default() -> Self {
        let index = vec!["if".to_string(), "ih".to_string(), "ic".to_string()];
        Self {
            stock_index: index.clone(),
            net_value_products: index,
        }
    }
}

impl CategorySpec {
    fn is_stock_index(&self, p: &EnrichedPosition) -> bool {
        self.stock_index.iter().any(|s| *s == p.product)
    }
}

/// A finished report table plus the audit of every merge/filter stage that
/// produced it, in order.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub table: ReportTable,
    pub audits: Vec<JoinAudit>,
}

// ---------------------------------------------------------------------------
// nav
// ---------------------------------------------------------------------------

pub const NAV_COLUMNS: [&str; 6] = ["balance", "margin", "profit", "fee", "net_profit", "nav"];

/// Balance merged with summed P&L.
///
/// `net_profit = 1 + (profit - fee) / balance`; `nav` is the running product
/// of `net_profit` per account in day order. Zero-balance rows are excluded
/// before the division.
pub fn nav_report(balances: &[Balance], pnl: &[Pnl], policy: JoinPolicy) -> Aggregation {
    let totals = pnl_totals(pnl);
    let mut audits = vec![JoinAudit::new("pnl_pid", pnl.len(), pnl.len() - totals.unattributed)];
    audits[0].log();

    let mut frame = BalanceFrame::from_balances(balances);
    audits.push(frame.merge("profit", &totals.profit, policy));
    audits.push(frame.merge("fee", &totals.fee, policy));
    audits.push(frame.exclude_zero_balance());

    frame.derive("net_profit", |r| {
        net_profit_ratio(r.get("profit"), r.get("fee"), r.get("balance")).unwrap_or(f64::NAN)
    });

    // Rows are in (tdate, pid) order, so each account's days arrive ascending.
    let mut running: HashMap<String, f64> = HashMap::new();
    let navs: Vec<f64> = frame
        .keys()
        .iter()
        .enumerate()
        .map(|(i, (_, pid))| {
            let step = frame.value(i, "net_profit").unwrap_or(f64::NAN);
            let nav = running.entry(pid.clone()).or_insert(1.0);
            *nav *= step;
            *nav
        })
        .collect();
    frame.set_column("nav", navs);

    finish("nav", frame.to_table(&NAV_COLUMNS), audits)
}

// ---------------------------------------------------------------------------
// category
// ---------------------------------------------------------------------------

pub const CATEGORY_COLUMNS: [&str; 11] = [
    "balance",
    "margin",
    "margin_proportion",
    "stock_index_margin",
    "stock_index_proportion",
    "commodity_margin",
    "commodity_proportion",
    "commodity_nn_value",
    "commodity_long_value",
    "commodity_short_value",
    "commodity_net_value",
];

/// Stock-index / commodity margin and value breakdown per account-day.
///
/// Metrics are merged in this order, each under `policy`:
/// `stock_index_margin`, `commodity_margin`, `commodity_nn_value`,
/// `commodity_long_value`, `commodity_short_value`, then
/// `{product}_long_value` and `{product}_short_value` per configured product.
/// An account-day without one side of a product is dropped under `Inner`.
pub fn category_report(
    balances: &[Balance],
    positions: &[EnrichedPosition],
    categories: &CategorySpec,
    policy: JoinPolicy,
) -> Aggregation {
    let stock = |p: &EnrichedPosition| categories.is_stock_index(p);
    let commodity = |p: &EnrichedPosition| !categories.is_stock_index(p);

    let mut frame = BalanceFrame::from_balances(balances);
    let mut audits = Vec::new();

    audits.push(frame.merge("stock_index_margin", &category_margin(positions, stock), policy));
    audits.push(frame.merge("commodity_margin", &category_margin(positions, commodity), policy));
    audits.push(frame.merge("commodity_nn_value", &gross_value(positions, commodity), policy));
    audits.push(frame.merge(
        "commodity_long_value",
        &direction_value(positions, commodity, Direction::Long),
        policy,
    ));
    audits.push(frame.merge(
        "commodity_short_value",
        &direction_value(positions, commodity, Direction::Short),
        policy,
    ));

    let mut products: Vec<&str> = Vec::new();
    for product in &categories.net_value_products {
        if products.contains(&product.as_str()) {
            continue;
        }
        products.push(product);
        let in_product = |p: &EnrichedPosition| p.product == *product;
        for (dir, side) in [(Direction::Long, "long"), (Direction::Short, "short")] {
            audits.push(frame.merge(
                &format!("{product}_{side}_value"),
                &direction_value(positions, in_product, dir),
                policy,
            ));
        }
    }

    audits.push(frame.exclude_zero_balance());

    frame.ratio_to_balance("margin_proportion", "margin");
    frame.ratio_to_balance("stock_index_proportion", "stock_index_margin");
    frame.ratio_to_balance("commodity_proportion", "commodity_margin");
    frame.derive("commodity_net_value", |r| {
        r.get("commodity_long_value") - r.get("commodity_short_value")
    });

    let mut product_columns: Vec<String> = Vec::new();
    for product in &products {
        let long = format!("{product}_long_value");
        let short = format!("{product}_short_value");
        frame.derive(&format!("{product}_value"), |r| r.get(&long) - r.get(&short));
        product_columns.extend([long, short, format!("{product}_value")]);
    }

    let order: Vec<&str> = CATEGORY_COLUMNS
        .iter()
        .copied()
        .chain(product_columns.iter().map(String::as_str))
        .collect();
    finish("category", frame.to_table(order.as_slice()), audits)
}

// ---------------------------------------------------------------------------
// if_margin
// ---------------------------------------------------------------------------

pub const IF_MARGIN_COLUMNS: [&str; 5] =
    ["balance", "margin", "margin_proportion", "if_margin", "if_proportion"];

/// Margin share of index futures (`if_products`) per account-day.
pub fn if_margin_report(
    balances: &[Balance],
    positions: &[EnrichedPosition],
    if_products: &[String],
    policy: JoinPolicy,
) -> Aggregation {
    let metric = category_margin(positions, |p| if_products.iter().any(|s| *s == p.product));

    let mut frame = BalanceFrame::from_balances(balances);
    let audits = vec![
        frame.merge("if_margin", &metric, policy),
        frame.exclude_zero_balance(),
    ];

    frame.ratio_to_balance("margin_proportion", "margin");
    frame.ratio_to_balance("if_proportion", "if_margin");

    finish("if_margin", frame.to_table(&IF_MARGIN_COLUMNS), audits)
}

// ---------------------------------------------------------------------------
// positions
// ---------------------------------------------------------------------------

pub const POSITION_COLUMNS: [&str; 13] = [
    "trade_day",
    "pid",
    "code",
    "dir",
    "prev_pos",
    "cur_pos",
    "product",
    "multiple",
    "margin_ratio",
    "close",
    "total_pos",
    "value",
    "margin",
];

/// The enriched position table, one row per position, in input order.
pub fn positions_report(positions: &[EnrichedPosition]) -> Aggregation {
    let mut table = ReportTable::new(POSITION_COLUMNS);
    for p in positions {
        table.rows.push(vec![
            Cell::Date(p.tdate),
            Cell::Text(p.pid.clone()),
            Cell::Text(p.code.clone()),
            Cell::Text(p.dir.as_str().to_string()),
            Cell::Int(p.prev_pos),
            Cell::Int(p.cur_pos),
            Cell::Text(p.product.clone()),
            Cell::Float(p.multiple),
            Cell::Float(p.margin_ratio),
            Cell::Float(p.close),
            Cell::Int(p.total_pos),
            Cell::Float(p.value),
            Cell::Float(p.margin),
        ]);
    }
    finish("positions", table, Vec::new())
}

fn finish(mode: &str, table: ReportTable, audits: Vec<JoinAudit>) -> Aggregation {
    info!(
        mode,
        rows = table.len(),
        days = table.trade_days().len(),
        "report aggregated"
    );
    Aggregation { table, audits }
}
