use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize};

/// Direction of a transaction as seen by the lot ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Buy,
    /// Any disposal: a sale, a conversion into another asset, a send or paying for an order.
    Sell,
}

impl Action {
    /// Maps a Coinbase "Transaction Type" column value onto a ledger action.
    pub fn from_coinbase(transaction_type: &str) -> Option<Action> {
        match transaction_type.trim() {
            "Buy" | "Coinbase Earn" => Some(Action::Buy),
            "Sell" | "Paid for an order" | "Send" | "Convert" => Some(Action::Sell),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub timestamp: NaiveDateTime,
    pub action: Action,
    pub asset: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

impl Transaction {
    pub fn new(
        timestamp: NaiveDateTime,
        action: Action,
        asset: impl Into<String>,
        quantity: Decimal,
        unit_price: Decimal,
    ) -> Self {
        Self {
            timestamp,
            action,
            asset: asset.into(),
            quantity,
            unit_price,
        }
    }

    pub fn to_lot(&self) -> Lot {
        Lot::new(self.timestamp, self.quantity, self.unit_price)
    }
}

/// An amount of an asset purchased in a single event. Only `quantity` ever
/// changes, and only downwards while a sale partially consumes the lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lot {
    pub purchase_date: NaiveDateTime,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

impl Lot {
    pub fn new(purchase_date: NaiveDateTime, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            purchase_date,
            quantity,
            unit_price,
        }
    }

    /// USD cost of what is left in the lot, `None` if it does not fit a `Decimal`.
    pub fn total_cost(&self) -> Option<Decimal> {
        self.quantity.checked_mul(self.unit_price)
    }
}

/// One taxable disposal, produced per lot touched by a sell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Sale {
    pub asset: String,
    pub sale_date: NaiveDateTime,
    pub purchase_date: NaiveDateTime,
    /// Sell quantity attributed so far, i.e. the sell quantity minus what was
    /// still outstanding after this lot. Kept for compatibility with existing
    /// reports; see `consumed` for the amount taken from this lot.
    pub quantity: Decimal,
    pub consumed: Decimal,
    pub fifo_cost: Decimal,
    pub avg_cost: Decimal,
    pub proceeds: Decimal,
}

impl Sale {
    pub fn cost(&self, basis: CostBasis) -> Decimal {
        match basis {
            CostBasis::Fifo => self.fifo_cost,
            CostBasis::Average => self.avg_cost,
        }
    }

    pub fn gain(&self, basis: CostBasis) -> Decimal {
        self.proceeds - self.cost(basis)
    }
}

/// Which of the two costs carried by every [`Sale`] a report uses for P&L.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CostBasis {
    #[default]
    Fifo,
    Average,
}

impl std::str::FromStr for CostBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fifo" => Ok(CostBasis::Fifo),
            "avg" | "average" => Ok(CostBasis::Average),
            other => Err(format!("Unsupported cost basis '{}'. Must be 'fifo' or 'avg'.", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Holding {
    pub asset: String,
    pub quantity: Decimal,
    pub usd_basis: Decimal,
    pub average_cost: Decimal,
}

/// A data row of a Coinbase standard-account transaction history export.
/// Columns past the spot price are validated as headers but otherwise ignored.
#[derive(Debug, Deserialize)]
pub struct CoinbaseRecord {
    #[serde(rename = "Timestamp", deserialize_with = "deserialize_date")]
    pub timestamp: NaiveDateTime,
    #[serde(rename = "Transaction Type")]
    pub transaction_type: String,
    #[serde(rename = "Asset")]
    pub asset: String,
    #[serde(rename = "Quantity Transacted", deserialize_with = "deserialize_decimal")]
    pub quantity: Decimal,
    #[serde(
        rename = "USD Spot Price at Transaction",
        deserialize_with = "deserialize_decimal"
    )]
    pub spot_price: Decimal,
}

pub fn parse_date_str(s: &str) -> Result<NaiveDateTime, String> {
    let date_formats = [
        "%Y-%m-%dT%H:%M:%SZ",
        "%Y-%m-%d %H:%M:%S",
        "%m/%d/%y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%y",
        "%m/%d/%Y",
        "%Y-%m-%d",
    ];

    for format in &date_formats {
        if let Ok(parsed_date) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(parsed_date);
        }
        if let Ok(parsed_date) = NaiveDate::parse_from_str(s, format) {
            return Ok(parsed_date.and_time(NaiveTime::MIN));
        }
    }

    Err(format!("Invalid date format: {}", s))
}

pub fn parse_decimal_str(s: &str) -> Result<Decimal, String> {
    let cleaned = s.trim().replace('$', "").replace(',', "");
    Decimal::from_str_exact(&cleaned)
        .map_err(|e| format!("Invalid decimal format: {}\nError: {}", s, e))
}

pub fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let date_str = String::deserialize(deserializer)?;
    parse_date_str(date_str.trim()).map_err(de::Error::custom)
}

pub fn deserialize_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let decimal_str = String::deserialize(deserializer)?;
    parse_decimal_str(&decimal_str).map_err(de::Error::custom)
}
