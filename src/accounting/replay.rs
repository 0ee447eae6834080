use std::thread::{self, JoinHandle};

use anyhow::anyhow;
use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, warn};

use crate::accounting::{Ledger, LedgerError, SaleSink};
use crate::models::{Sale, Transaction};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayEvent {
    Sale(Sale),
    /// The transaction was skipped; replay carried on with the next one.
    Rejected {
        transaction: Transaction,
        error: LedgerError,
    },
}

struct ChannelSink<'a>(&'a Sender<ReplayEvent>);

impl SaleSink for ChannelSink<'_> {
    fn emit(&mut self, sale: Sale) -> Result<(), LedgerError> {
        self.0
            .send(ReplayEvent::Sale(sale))
            .map_err(|_| LedgerError::ConsumerClosed)
    }
}

/// Replays transactions into a ledger on a producer thread while the caller
/// drains the resulting events.
///
/// Events travel over a bounded channel, so a slow consumer holds the
/// producer back instead of letting sales pile up in memory.
pub struct Replay {
    events: Receiver<ReplayEvent>,
    producer: JoinHandle<Ledger>,
}

impl Replay {
    pub fn start(transactions: Vec<Transaction>, capacity: usize) -> Self {
        Self::start_with(Ledger::new(), transactions, capacity)
    }

    pub fn start_with(mut ledger: Ledger, transactions: Vec<Transaction>, capacity: usize) -> Self {
        let (sender, events) = bounded(capacity);

        let producer = thread::spawn(move || {
            let mut sink = ChannelSink(&sender);
            for transaction in transactions {
                match ledger.process(&transaction, &mut sink) {
                    Ok(()) => {}
                    Err(LedgerError::ConsumerClosed) => {
                        debug!("consumer gone, stopping replay");
                        break;
                    }
                    Err(error) => {
                        warn!(
                            date = %transaction.timestamp,
                            asset = %transaction.asset,
                            quantity = %transaction.quantity,
                            %error,
                            "skipping transaction"
                        );
                        if sender
                            .send(ReplayEvent::Rejected { transaction, error })
                            .is_err()
                        {
                            break;
                        }
                    }
                }
            }
            ledger
        });

        Self { events, producer }
    }

    /// Blocks for each event in replay order; ends once every transaction
    /// has been processed.
    pub fn events(&self) -> crossbeam_channel::Iter<'_, ReplayEvent> {
        self.events.iter()
    }

    /// Waits for the producer and hands back its ledger. Called before the
    /// events are drained, this stops the replay at its next emission and
    /// the ledger reflects only what was processed up to then.
    pub fn finish(self) -> anyhow::Result<Ledger> {
        drop(self.events);
        self.producer
            .join()
            .map_err(|_| anyhow!("Replay producer thread panicked"))
    }
}
