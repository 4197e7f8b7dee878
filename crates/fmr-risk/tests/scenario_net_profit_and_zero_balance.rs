use fmr_risk::*;
use fmr_schemas::{Balance, Pnl};

fn balance(tdate: u32, pid: &str, balance: f64) -> Balance {
    Balance {
        tdate,
        pid: pid.to_string(),
        balance,
        margin: 0.0,
    }
}

fn pnl(tdate: u32, pid: &str, profit: f64, fee: f64) -> Pnl {
    Pnl {
        tdate,
        pid: pid.to_string(),
        code: "rb1805".to_string(),
        profit,
        fee,
    }
}

#[test]
fn scenario_net_profit_ratio_and_zero_balance_exclusion() {
    let balances = [balance(20180102, "acc1", 1000.0), balance(20180102, "acc2", 0.0)];
    let rows = [
        pnl(20180102, "acc1", 30.0, 4.0),
        pnl(20180102, "acc1", 20.0, 6.0),
        pnl(20180102, "acc2", 5.0, 1.0),
        pnl(20180102, "", 7.0, 0.0),
    ];

    let agg = nav_report(&balances, &rows, JoinPolicy::Inner);
    let t = &agg.table;

    assert_eq!(t.len(), 1, "zero-balance account must not appear");
    assert_eq!(t.cell(0, "pid"), Some(&Cell::Text("acc1".to_string())));
    assert_eq!(t.float(0, "profit"), Some(50.0));
    assert_eq!(t.float(0, "fee"), Some(10.0));
    let net = t.float(0, "net_profit").unwrap();
    assert!((net - 1.04).abs() < 1e-12);
    assert!(t.rows.iter().flatten().all(|c| match c {
        Cell::Float(v) => v.is_finite(),
        _ => true,
    }));

    let stages: Vec<(&str, usize)> = agg
        .audits
        .iter()
        .map(|a| (a.stage.as_str(), a.dropped()))
        .collect();
    assert_eq!(
        stages,
        vec![("pnl_pid", 1), ("profit", 0), ("fee", 0), ("zero_balance", 1)]
    );
}
