use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fmr_schemas::{DailyBar, DailyBarRow, ProductInfo, SymbolInfo, TradeDayRow};
use tracing::info;

use crate::csv_io::{normalize_daily, read_csv_file};

/// Fixed layout of `<root>/market/`.
#[derive(Debug, Clone)]
pub struct MarketPaths {
    dir: PathBuf,
}

impl MarketPaths {
    pub fn new(root: &Path) -> Self {
        Self {
            dir: root.join("market"),
        }
    }

    pub fn tradeday(&self) -> PathBuf {
        self.dir.join("tradeday.csv")
    }

    pub fn symbol_info(&self) -> PathBuf {
        self.dir.join("symbol_info.csv")
    }

    pub fn product_infos(&self) -> PathBuf {
        self.dir.join("product_infos.csv")
    }

    pub fn daily_bars(&self, year: i32) -> PathBuf {
        self.dir.join(format!("{year}.dbar_ftr.csv"))
    }
}

/// The four static tables, read-only for the rest of the run.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub calendar: Vec<TradeDayRow>,
    pub symbols: Vec<SymbolInfo>,
    pub products: Vec<ProductInfo>,
    /// Daily bars of every configured year, concatenated in year order.
    pub bars: Vec<DailyBar>,
}

/// Load all reference tables under `root`.
///
/// Fails if any file (including any year's bar file) is missing or malformed.
pub fn load_reference_data<I>(root: &Path, years: I) -> Result<ReferenceData>
where
    I: IntoIterator<Item = i32>,
{
    let paths = MarketPaths::new(root);

    let calendar: Vec<TradeDayRow> =
        read_csv_file(&paths.tradeday()).context("load trading-day calendar")?;
    let symbols: Vec<SymbolInfo> =
        read_csv_file(&paths.symbol_info()).context("load symbol info")?;
    let products: Vec<ProductInfo> =
        read_csv_file(&paths.product_infos()).context("load product info")?;

    let mut bars: Vec<DailyBar> = Vec::new();
    let mut years_loaded = 0usize;
    for year in years {
        let path = paths.daily_bars(year);
        let rows: Vec<DailyBarRow> =
            read_csv_file(&path).with_context(|| format!("load daily bars for {year}"))?;
        let mut year_bars = normalize_daily(rows)
            .with_context(|| format!("normalise daily bars: {}", path.display()))?;
        bars.append(&mut year_bars);
        years_loaded += 1;
    }

    info!(
        calendar_rows = calendar.len(),
        symbols = symbols.len(),
        products = products.len(),
        bars = bars.len(),
        years = years_loaded,
        "reference data loaded"
    );

    Ok(ReferenceData {
        calendar,
        symbols,
        products,
        bars,
    })
}
