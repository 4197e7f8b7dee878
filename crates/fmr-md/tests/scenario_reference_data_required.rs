//! Reference data is master data: every file must exist, years concatenate
//! in order, and extra columns are ignored.

use std::fs;
use std::path::Path;

use fmr_md::{load_reference_data, MarketPaths};

fn write_market(root: &Path, years: &[i32]) {
    let paths = MarketPaths::new(root);
    fs::create_dir_all(root.join("market")).unwrap();
    fs::write(
        paths.tradeday(),
        "trade_day,product,exchange,weekday\n2018-01-02,busyhour,SESH,2\n2018-01-03,busyhour,SESH,3\n",
    )
    .unwrap();
    fs::write(paths.symbol_info(), "code,multiple,name\nrb1805,10,rebar\n").unwrap();
    fs::write(paths.product_infos(), "product,margin_ratio,exchange\nrb,0.09,SHFE\n").unwrap();
    for y in years {
        fs::write(
            paths.daily_bars(*y),
            format!("trade_day,code,open,close\n{y}-01-02,rb1805,1,3900\n"),
        )
        .unwrap();
    }
}

#[test]
fn loads_all_tables_and_concatenates_years() {
    let dir = tempfile::tempdir().unwrap();
    write_market(dir.path(), &[2017, 2018]);

    let data = load_reference_data(dir.path(), 2017..=2018).unwrap();
    assert_eq!(data.calendar.len(), 2);
    assert_eq!(data.symbols[0].multiple, 10.0);
    assert_eq!(data.products[0].margin_ratio, 0.09);
    let days: Vec<u32> = data.bars.iter().map(|b| b.tdate).collect();
    assert_eq!(days, vec![20170102, 20180102]);
}

#[test]
fn missing_year_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_market(dir.path(), &[2018]);

    let err = load_reference_data(dir.path(), 2016..=2018).unwrap_err();
    assert!(format!("{err:#}").contains("2016"), "got: {err:#}");
}

#[test]
fn missing_calendar_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_market(dir.path(), &[2018]);
    fs::remove_file(MarketPaths::new(dir.path()).tradeday()).unwrap();

    let err = load_reference_data(dir.path(), 2018..=2018).unwrap_err();
    assert!(format!("{err:#}").contains("tradeday.csv"));
}
