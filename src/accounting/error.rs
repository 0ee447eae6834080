use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Quantity must be > 0, got {0}")]
    InvalidQuantity(Decimal),

    #[error("Spot price must be > 0, got {0}")]
    InvalidPrice(Decimal),

    #[error("Transactions must be in chronological order. BUY on {date} is prior to most recent BUY dated {latest}")]
    OutOfOrder {
        date: NaiveDateTime,
        latest: NaiveDateTime,
    },

    #[error("No more {asset} lots available. Sold more than bought, {remaining} remaining")]
    InsufficientLots { asset: String, remaining: Decimal },

    #[error("{asset} amounts exceed the supported decimal range")]
    Overflow { asset: String },

    #[error("Sale consumer disconnected")]
    ConsumerClosed,
}
