//! fmr-portfolio
//!
//! Position enrichment and valuation.
//! - Test/virtual account exclusion (regex substring match on the account id)
//! - Product derivation from the contract code
//! - Joins: Position ⋈ SymbolInfo ⋈ ProductInfo ⋈ DailyBar (all inner)
//! - Contract value and margin per position
//! - Every join is audited: rows in, rows out
//!
//! Pure deterministic logic. No IO.

mod accounts;
mod audit;
mod enrich;

pub use accounts::{AccountFilter, AccountScoped};
pub use audit::JoinAudit;
pub use enrich::{enrich_positions, product_of, valuation, Enrichment, ReferenceIndex};
