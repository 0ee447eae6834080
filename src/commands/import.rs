use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, Context};
use csv::StringRecord;
use tracing::{debug, warn};

use crate::models::{Action, CoinbaseRecord, Transaction};

/// Lines of account information Coinbase writes above the CSV header.
const PREAMBLE_LINES: usize = 7;

pub const EXPECTED_HEADERS: [&str; 9] = [
    "Timestamp",
    "Transaction Type",
    "Asset",
    "Quantity Transacted",
    "USD Spot Price at Transaction",
    "USD Subtotal",
    "USD Total (inclusive of fees)",
    "USD Fees",
    "Notes",
];

/// Reads a transaction history exported from a Coinbase standard account,
/// returning its transactions in chronological order.
pub fn read_coinbase_file(file: &Path) -> anyhow::Result<Vec<Transaction>> {
    let f = File::open(file).with_context(|| format!("Error reading file {:?}", file))?;
    read_coinbase(BufReader::new(f))
}

pub fn read_coinbase<R: BufRead>(mut reader: R) -> anyhow::Result<Vec<Transaction>> {
    let mut line = String::new();
    for n in 1..=PREAMBLE_LINES {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            bail!("File ended at line {} of the {}-line preamble", n, PREAMBLE_LINES);
        }
    }

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    validate_headers(rdr.headers()?)?;

    let mut transactions = Vec::new();
    for (row, result) in rdr.deserialize::<CoinbaseRecord>().enumerate() {
        let record = result.with_context(|| format!("Error parsing transaction row {}", row + 1))?;
        debug!(?record);

        match Action::from_coinbase(&record.transaction_type) {
            Some(action) => transactions.push(Transaction::new(
                record.timestamp,
                action,
                record.asset,
                record.quantity,
                record.spot_price,
            )),
            None => warn!(
                row = row + 1,
                transaction_type = %record.transaction_type,
                "skipping unsupported transaction type"
            ),
        }
    }

    sort_chronologically(&mut transactions);
    Ok(transactions)
}

pub fn validate_headers(headers: &StringRecord) -> anyhow::Result<()> {
    for (i, expected) in EXPECTED_HEADERS.iter().enumerate() {
        let found = headers.get(i).unwrap_or("");
        if found.trim() != *expected {
            bail!(
                "Invalid heading in position {}: Found '{}' but expected '{}'",
                i + 1,
                found,
                expected
            );
        }
    }
    Ok(())
}

/// Stable, so same-timestamp transactions keep their file order.
pub fn sort_chronologically(transactions: &mut [Transaction]) {
    transactions.sort_by_key(|t| t.timestamp);
}
