use std::io::Write;
use std::path::Path;

use chrono::NaiveDateTime;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::accounting::{LedgerError, Replay, ReplayEvent};
use crate::commands::import::read_coinbase_file;
use crate::models::{CostBasis, Sale, Transaction};
use crate::{OutputFormat, ReportConfig};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReportSummary {
    pub sales: usize,
    pub rejected: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SaleRow<'a> {
    sale_date: NaiveDateTime,
    purchase_date: NaiveDateTime,
    asset: &'a str,
    quantity: Decimal,
    consumed: Decimal,
    proceeds: Decimal,
    fifo_cost: Decimal,
    avg_cost: Decimal,
    gain: Decimal,
}

impl<'a> SaleRow<'a> {
    fn new(sale: &'a Sale, basis: CostBasis) -> Self {
        Self {
            sale_date: sale.sale_date,
            purchase_date: sale.purchase_date,
            asset: &sale.asset,
            quantity: sale.quantity,
            consumed: sale.consumed,
            proceeds: sale.proceeds,
            fifo_cost: sale.fifo_cost,
            avg_cost: sale.avg_cost,
            gain: round_cents(sale.gain(basis)),
        }
    }
}

fn round_cents(value: Decimal) -> Decimal {
    let mut cents = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    cents.rescale(2);
    cents
}

enum SaleWriter<'a, W: Write> {
    Text(&'a mut W),
    Csv(csv::Writer<&'a mut W>),
    Json(&'a mut W),
}

impl<'a, W: Write> SaleWriter<'a, W> {
    fn new(format: OutputFormat, out: &'a mut W) -> Self {
        match format {
            OutputFormat::Text => SaleWriter::Text(out),
            OutputFormat::Csv => SaleWriter::Csv(csv::Writer::from_writer(out)),
            OutputFormat::Json => SaleWriter::Json(out),
        }
    }

    fn sale(&mut self, sale: &Sale, basis: CostBasis) -> anyhow::Result<()> {
        match self {
            SaleWriter::Text(out) => writeln!(
                out,
                "{}: Sold {} of {} with P&L of ${:.2} purchased on {}",
                sale.sale_date.format("%Y-%m-%d"),
                sale.quantity,
                sale.asset,
                round_cents(sale.gain(basis)),
                sale.purchase_date.format("%Y-%m-%d")
            )?,
            SaleWriter::Csv(wtr) => wtr.serialize(SaleRow::new(sale, basis))?,
            SaleWriter::Json(out) => {
                serde_json::to_writer(&mut **out, &SaleRow::new(sale, basis))?;
                writeln!(out)?;
            }
        }
        Ok(())
    }

    /// Only the text report carries rejections inline; the structured formats
    /// leave them to the log so their output stays parseable.
    fn rejected(&mut self, transaction: &Transaction, _error: &LedgerError) -> anyhow::Result<()> {
        if let SaleWriter::Text(out) = self {
            writeln!(
                out,
                "Error processing {} sale of {} {}",
                transaction.timestamp.format("%Y-%m-%d"),
                transaction.quantity,
                transaction.asset
            )?;
        }
        Ok(())
    }

    fn finish(self) -> anyhow::Result<()> {
        match self {
            SaleWriter::Csv(mut wtr) => wtr.flush()?,
            SaleWriter::Text(out) | SaleWriter::Json(out) => out.flush()?,
        }
        Ok(())
    }
}

pub fn report<W: Write>(file: &Path, config: &ReportConfig, out: &mut W) -> anyhow::Result<ReportSummary> {
    let transactions = read_coinbase_file(file)?;
    write_report(transactions, config, out)
}

/// Replays `transactions` and writes each sale as soon as the ledger emits
/// it. Rejected transactions are counted and skipped.
pub fn write_report<W: Write>(
    transactions: Vec<Transaction>,
    config: &ReportConfig,
    out: &mut W,
) -> anyhow::Result<ReportSummary> {
    let replay = Replay::start(transactions, config.channel_capacity);
    let mut summary = ReportSummary::default();

    let mut writer = SaleWriter::new(config.format, out);
    for event in replay.events() {
        match event {
            ReplayEvent::Sale(sale) => {
                summary.sales += 1;
                writer.sale(&sale, config.cost_basis)?;
            }
            ReplayEvent::Rejected { transaction, error } => {
                summary.rejected += 1;
                writer.rejected(&transaction, &error)?;
            }
        }
    }
    writer.finish()?;

    let ledger = replay.finish()?;
    if config.format == OutputFormat::Text {
        writeln!(out, "\n{}", ledger.report())?;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{parse_date_str, Action};
    use rust_decimal_macros::dec;

    fn tx(date: &str, action: Action, quantity: Decimal, price: Decimal) -> Transaction {
        Transaction::new(parse_date_str(date).unwrap(), action, "BTC", quantity, price)
    }

    fn sample() -> Vec<Transaction> {
        vec![
            tx("2020-01-01", Action::Buy, dec!(100), dec!(1)),
            tx("2021-01-01", Action::Buy, dec!(100), dec!(2)),
            tx("2021-02-01", Action::Sell, dec!(200), dec!(3)),
        ]
    }

    #[test]
    fn test_text_report_fifo() {
        let mut out = Vec::new();
        let summary = write_report(sample(), &ReportConfig::default(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(summary, ReportSummary { sales: 2, rejected: 0 });
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "2021-02-01: Sold 100 of BTC with P&L of $200.00 purchased on 2020-01-01");
        assert_eq!(lines[1], "2021-02-01: Sold 300 of BTC with P&L of $100.00 purchased on 2021-01-01");
        assert!(text.contains("Account Summary"));
        assert!(text.contains("BTC: 0"));
    }

    #[test]
    fn test_text_report_average_cost() {
        let config = ReportConfig {
            cost_basis: CostBasis::Average,
            ..ReportConfig::default()
        };
        let mut out = Vec::new();
        write_report(sample(), &config, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("2021-02-01: Sold 100 of BTC with P&L of $150.00 purchased on 2020-01-01\n"));
    }

    #[test]
    fn test_text_report_lists_rejections() {
        let mut transactions = sample();
        transactions.push(tx("2021-03-01", Action::Sell, dec!(1), dec!(3)));
        let mut out = Vec::new();
        let summary = write_report(transactions, &ReportConfig::default(), &mut out).unwrap();

        assert_eq!(summary.rejected, 1);
        assert!(String::from_utf8(out)
            .unwrap()
            .contains("Error processing 2021-03-01 sale of 1 BTC"));
    }

    #[test]
    fn test_csv_report() {
        let config = ReportConfig {
            format: OutputFormat::Csv,
            ..ReportConfig::default()
        };
        let mut out = Vec::new();
        write_report(sample(), &config, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "SaleDate,PurchaseDate,Asset,Quantity,Consumed,Proceeds,FifoCost,AvgCost,Gain"
        );
        assert!(lines[1].starts_with("2021-02-01T00:00:00,2020-01-01T00:00:00,BTC,100,100,300,100,"));
        assert!(!text.contains("Account Summary"));
    }

    #[test]
    fn test_json_report() {
        let config = ReportConfig {
            format: OutputFormat::Json,
            ..ReportConfig::default()
        };
        let mut out = Vec::new();
        write_report(sample(), &config, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let rows: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Asset"], "BTC");
        assert_eq!(rows[1]["FifoCost"], "200");
    }
}
