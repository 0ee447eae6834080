pub mod emitter;
pub mod error;
pub mod ledger;
pub mod lot_queue;
pub mod replay;

pub use emitter::SaleSink;
pub use error::LedgerError;
pub use ledger::Ledger;
pub use lot_queue::LotQueue;
pub use replay::{Replay, ReplayEvent};
