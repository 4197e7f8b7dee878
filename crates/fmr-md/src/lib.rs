//! fmr-md
//!
//! Reference (master) data for the margin report.
//!
//! Loads the static tables under `<root>/market/`:
//! - `tradeday.csv`        trading-day calendar
//! - `symbol_info.csv`     contract multipliers
//! - `product_infos.csv`   product margin ratios
//! - `{year}.dbar_ftr.csv` daily closing prices, one file per year
//!
//! Each load is a direct read with a fixed column projection. Every file is
//! required: a missing one aborts the run. No filtering happens here.

pub mod csv_io;
mod reference;

pub use csv_io::{normalize_daily, read_csv_file, read_csv_str};
pub use reference::{load_reference_data, MarketPaths, ReferenceData};
