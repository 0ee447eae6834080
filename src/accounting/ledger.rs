use std::collections::BTreeMap;

use tracing::{debug, instrument};

use crate::accounting::{LedgerError, LotQueue, SaleSink};
use crate::models::{Action, Holding, Sale, Transaction};

/// Per-asset lot queues for one account. The caller owns the ledger and
/// replays transactions into it in timestamp order.
#[derive(Debug, Default)]
pub struct Ledger {
    holdings: BTreeMap<String, LotQueue>,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            holdings: BTreeMap::new(),
        }
    }

    /// Applies one transaction, streaming any resulting sales into `sink`.
    ///
    /// The asset's queue is created on first sight, even when the
    /// transaction itself is then rejected.
    #[instrument(skip_all, level = "debug", fields(asset = %transaction.asset, action = ?transaction.action))]
    pub fn process<S: SaleSink + ?Sized>(
        &mut self,
        transaction: &Transaction,
        sink: &mut S,
    ) -> Result<(), LedgerError> {
        let holding = self
            .holdings
            .entry(transaction.asset.clone())
            .or_insert_with(|| {
                debug!("opening lot queue");
                LotQueue::new(transaction.asset.clone())
            });

        match transaction.action {
            Action::Buy => holding.buy(transaction.to_lot()),
            Action::Sell => holding.sell(
                transaction.quantity,
                transaction.unit_price,
                transaction.timestamp,
                sink,
            ),
        }
    }

    pub fn process_collect(&mut self, transaction: &Transaction) -> Result<Vec<Sale>, LedgerError> {
        let mut sales = Vec::new();
        self.process(transaction, &mut sales)?;
        Ok(sales)
    }

    pub fn queue(&self, asset: &str) -> Option<&LotQueue> {
        self.holdings.get(asset)
    }

    pub fn assets(&self) -> impl Iterator<Item = &str> {
        self.holdings.keys().map(String::as_str)
    }

    pub fn holdings(&self) -> Vec<Holding> {
        self.holdings
            .values()
            .map(|queue| Holding {
                asset: queue.asset().to_string(),
                quantity: queue.total_quantity(),
                usd_basis: queue.total_cost(),
                average_cost: queue.average_cost(),
            })
            .collect()
    }

    pub fn report(&self) -> String {
        let header = "Account Summary";
        let rule = "-".repeat(header.len());
        let mut report = format!("{}\n{}\n{}\n", rule, header, rule);
        for queue in self.holdings.values() {
            report.push_str(&format!("{}: {}\n", queue.asset(), queue.total_quantity()));
        }
        report
    }
}
