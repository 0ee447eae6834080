use std::io::Write;
use std::path::Path;

use anyhow::anyhow;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use tracing::warn;

use crate::accounting::Ledger;
use crate::commands::import::read_coinbase_file;
use crate::models::{Holding, Transaction};

pub fn holdings<W: Write>(file: &Path, out: &mut W) -> anyhow::Result<Vec<Holding>> {
    let transactions = read_coinbase_file(file)?;
    write_holdings(&transactions, out)
}

/// Replays `transactions` without reporting sales and writes what is left
/// per asset, followed by a USD basis total.
pub fn write_holdings<W: Write>(transactions: &[Transaction], out: &mut W) -> anyhow::Result<Vec<Holding>> {
    let mut ledger = Ledger::new();
    let mut sales = Vec::new();
    for transaction in transactions {
        if let Err(error) = ledger.process(transaction, &mut sales) {
            warn!(asset = %transaction.asset, date = %transaction.timestamp, %error, "skipping transaction");
        }
        sales.clear();
    }

    let mut wtr = csv::Writer::from_writer(out);
    let mut total_basis = dec!(0);
    let mut holdings = Vec::new();
    for holding in ledger.holdings() {
        let holding = Holding {
            usd_basis: holding
                .usd_basis
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            average_cost: holding
                .average_cost
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            ..holding
        };
        total_basis = total_basis
            .checked_add(holding.usd_basis)
            .ok_or_else(|| anyhow!("USD basis total across assets exceeds the supported decimal range"))?;
        wtr.serialize(&holding)?;
        holdings.push(holding);
    }

    if total_basis != Decimal::ZERO {
        wtr.write_record(&[
            String::from(""),
            String::from(""),
            total_basis.to_string(),
            String::from(""),
        ])?;
    }
    wtr.flush()?;

    Ok(holdings)
}
