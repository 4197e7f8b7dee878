use std::collections::HashMap;

use fmr_schemas::{DailyBar, EnrichedPosition, Position, ProductInfo, SymbolInfo};
use tracing::warn;

use crate::audit::JoinAudit;

// ---------------------------------------------------------------------------
// Reference lookups
// ---------------------------------------------------------------------------

/// Keyed views over the reference tables.
///
/// Keys are expected to be unique; on duplicates the first row wins and the
/// duplicate count is logged.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    multiples: HashMap<String, f64>,
    margin_ratios: HashMap<String, f64>,
    closes: HashMap<(u32, String), f64>,
}

impl ReferenceIndex {
    pub fn build(symbols: &[SymbolInfo], products: &[ProductInfo], bars: &[DailyBar]) -> Self {
        let multiples = first_wins(
            "symbol_info",
            symbols.iter().map(|s| (s.code.clone(), s.multiple)),
        );
        let margin_ratios = first_wins(
            "product_infos",
            products.iter().map(|p| (p.product.clone(), p.margin_ratio)),
        );
        let closes = first_wins(
            "daily_bars",
            bars.iter().map(|b| ((b.tdate, b.code.clone()), b.close)),
        );
        Self {
            multiples,
            margin_ratios,
            closes,
        }
    }

    pub fn multiple(&self, code: &str) -> Option<f64> {
        self.multiples.get(code).copied()
    }

    pub fn margin_ratio(&self, product: &str) -> Option<f64> {
        self.margin_ratios.get(product).copied()
    }

    pub fn close(&self, tdate: u32, code: &str) -> Option<f64> {
        self.closes.get(&(tdate, code.to_string())).copied()
    }
}

fn first_wins<K, I>(table: &str, entries: I) -> HashMap<K, f64>
where
    K: std::hash::Hash + Eq,
    I: IntoIterator<Item = (K, f64)>,
{
    let mut map = HashMap::new();
    let mut duplicates = 0usize;
    for (k, v) in entries {
        if map.contains_key(&k) {
            duplicates += 1;
            continue;
        }
        map.insert(k, v);
    }
    if duplicates > 0 {
        warn!(table, duplicates, "duplicate reference keys, first row kept");
    }
    map
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

/// Leading alphabetic run of a contract code (`rb1805` -> `rb`).
///
/// `None` when the code has no ASCII letters.
pub fn product_of(code: &str) -> Option<&str> {
    let start = code.find(|c: char| c.is_ascii_alphabetic())?;
    let rest = &code[start..];
    let len = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    Some(&rest[..len])
}

/// Contract value and margin: `(total_pos * multiple * close, value * margin_ratio)`.
pub fn valuation(total_pos: i64, multiple: f64, close: f64, margin_ratio: f64) -> (f64, f64) {
    let value = total_pos as f64 * multiple * close;
    (value, value * margin_ratio)
}

// ---------------------------------------------------------------------------
// Enrichment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Enrichment {
    /// Sorted by (tdate, pid, code, dir).
    pub positions: Vec<EnrichedPosition>,
    /// One entry per stage, in pipeline order.
    pub audits: Vec<JoinAudit>,
}

/// Join positions with reference data and value them.
///
/// Stages, each an inner join whose misses are dropped and audited:
/// 1. `product`        derive the product from the code
/// 2. `symbol_info`    multiplier by code
/// 3. `product_infos`  margin ratio by product
/// 4. `daily_bars`     close by (tdate, code)
///
/// Account exclusion is expected to have run already.
pub fn enrich_positions(positions: Vec<Position>, index: &ReferenceIndex) -> Enrichment {
    let mut audits = Vec::with_capacity(4);

    let n = positions.len();
    let with_product: Vec<(Position, String)> = positions
        .into_iter()
        .filter_map(|p| {
            let product = product_of(&p.code)?.to_string();
            Some((p, product))
        })
        .collect();
    audits.push(JoinAudit::new("product", n, with_product.len()));

    let n = with_product.len();
    let with_multiple: Vec<(Position, String, f64)> = with_product
        .into_iter()
        .filter_map(|(p, product)| {
            let multiple = index.multiple(&p.code)?;
            Some((p, product, multiple))
        })
        .collect();
    audits.push(JoinAudit::new("symbol_info", n, with_multiple.len()));

    let n = with_multiple.len();
    let with_ratio: Vec<(Position, String, f64, f64)> = with_multiple
        .into_iter()
        .filter_map(|(p, product, multiple)| {
            let ratio = index.margin_ratio(&product)?;
            Some((p, product, multiple, ratio))
        })
        .collect();
    audits.push(JoinAudit::new("product_infos", n, with_ratio.len()));

    let n = with_ratio.len();
    let mut enriched: Vec<EnrichedPosition> = with_ratio
        .into_iter()
        .filter_map(|(p, product, multiple, margin_ratio)| {
            let close = index.close(p.tdate, &p.code)?;
            let total_pos = p.prev_pos + p.cur_pos;
            let (value, margin) = valuation(total_pos, multiple, close, margin_ratio);
            Some(EnrichedPosition {
                tdate: p.tdate,
                pid: p.pid,
                code: p.code,
                dir: p.dir,
                prev_pos: p.prev_pos,
                cur_pos: p.cur_pos,
                product,
                multiple,
                margin_ratio,
                close,
                total_pos,
                value,
                margin,
            })
        })
        .collect();
    audits.push(JoinAudit::new("daily_bars", n, enriched.len()));

    enriched.sort_by(|a, b| {
        (a.tdate, &a.pid, &a.code, a.dir).cmp(&(b.tdate, &b.pid, &b.code, b.dir))
    });

    for a in &audits {
        a.log();
    }

    Enrichment {
        positions: enriched,
        audits,
    }
}
