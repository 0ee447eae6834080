use std::io::Write;

use chrono::NaiveDateTime;
use crypto_taxes::models::{parse_date_str, Action, Transaction};
use rust_decimal::Decimal;
use tempfile::NamedTempFile;

pub const HEADER: &str = "Timestamp,Transaction Type,Asset,Quantity Transacted,USD Spot Price at Transaction,USD Subtotal,USD Total (inclusive of fees),USD Fees,Notes";

pub fn preamble() -> Vec<&'static str> {
    vec![
        "\"You can use this transaction report to inform your likely tax obligations.\"",
        "",
        "Transactions",
        "User,Satoshi Nakamoto,5f3e",
        "",
        "\"Account generated on 2021-12-31\"",
        "",
    ]
}

pub fn create_coinbase_csv(records: &[(&str, &str, &str, &str, &str)]) -> NamedTempFile {
    create_coinbase_csv_with_header(HEADER, records)
}

pub fn create_coinbase_csv_with_header(header: &str, records: &[(&str, &str, &str, &str, &str)]) -> NamedTempFile {
    let mut file = create_raw_coinbase_csv(header, &[]);
    {
        let mut wtr = csv::Writer::from_writer(&mut file);
        for (timestamp, kind, asset, quantity, spot) in records {
            let notes = format!("{} {} {}, notes", kind, quantity, asset);
            wtr.write_record([*timestamp, *kind, *asset, *quantity, *spot, "", "", "", notes.as_str()])
                .unwrap();
        }
        wtr.flush().unwrap();
    }
    file
}

/// Writes `lines` verbatim after the preamble and header.
pub fn create_raw_coinbase_csv(header: &str, lines: &[&str]) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .expect("Failed to create temp CSV file");
    for line in preamble() {
        writeln!(file, "{}", line).unwrap();
    }
    writeln!(file, "{}", header).unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file.flush().unwrap();
    file
}

pub fn date(s: &str) -> NaiveDateTime {
    parse_date_str(s).unwrap()
}

pub fn buy(d: &str, asset: &str, quantity: Decimal, price: Decimal) -> Transaction {
    Transaction::new(date(d), Action::Buy, asset, quantity, price)
}

pub fn sell(d: &str, asset: &str, quantity: Decimal, price: Decimal) -> Transaction {
    Transaction::new(date(d), Action::Sell, asset, quantity, price)
}
