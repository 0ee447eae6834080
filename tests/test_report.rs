mod common;

use common::create_coinbase_csv;
use crypto_taxes::commands::holdings::holdings;
use crypto_taxes::commands::report::{report, ReportSummary};
use crypto_taxes::models::CostBasis;
use crypto_taxes::{OutputFormat, ReportConfig};
use rust_decimal_macros::dec;

fn history() -> tempfile::NamedTempFile {
    create_coinbase_csv(&[
        ("2020-01-01T00:00:00Z", "Buy", "BTC", "100", "1"),
        ("2021-01-01T00:00:00Z", "Buy", "BTC", "100", "2"),
        ("2021-01-15T00:00:00Z", "Buy", "ETH", "4", "1000"),
        ("2021-02-01T00:00:00Z", "Sell", "BTC", "200", "3"),
        ("2021-03-01T00:00:00Z", "Send", "ETH", "1", "1500"),
        ("2021-04-01T00:00:00Z", "Convert", "DOGE", "10", "0.05"),
    ])
}

#[test]
fn test_report_from_file() {
    let csv = history();
    let mut out = Vec::new();
    let summary = report(csv.path(), &ReportConfig::default(), &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert_eq!(summary, ReportSummary { sales: 3, rejected: 1 });
    let expected = "\
2021-02-01: Sold 100 of BTC with P&L of $200.00 purchased on 2020-01-01
2021-02-01: Sold 300 of BTC with P&L of $100.00 purchased on 2021-01-01
2021-03-01: Sold 1 of ETH with P&L of $500.00 purchased on 2021-01-15
Error processing 2021-04-01 sale of 10 DOGE

---------------
Account Summary
---------------
BTC: 0
DOGE: 0
ETH: 3
";
    assert_eq!(text.trim_end(), expected.trim_end());
}

#[test]
fn test_report_average_cost_csv() {
    let csv = history();
    let config = ReportConfig {
        cost_basis: CostBasis::Average,
        format: OutputFormat::Csv,
        channel_capacity: 1,
    };
    let mut out = Vec::new();
    report(csv.path(), &config, &mut out).unwrap();

    let mut rdr = csv::Reader::from_reader(out.as_slice());
    let gains: Vec<String> = rdr
        .records()
        .map(|r| r.unwrap().get(8).unwrap().to_string())
        .collect();
    assert_eq!(gains, vec!["150.00", "100.00", "500.00"]);
}

#[test]
fn test_holdings_from_file() {
    let csv = history();
    let mut out = Vec::new();
    let holdings = holdings(csv.path(), &mut out).unwrap();

    let eth = holdings.iter().find(|h| h.asset == "ETH").unwrap();
    assert_eq!(eth.quantity, dec!(3));
    assert_eq!(eth.usd_basis, dec!(3000));
    assert_eq!(eth.average_cost, dec!(1000));
}
