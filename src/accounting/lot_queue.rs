use std::collections::VecDeque;
use std::iter;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use tracing::debug;

use crate::accounting::{LedgerError, SaleSink};
use crate::models::{Lot, Sale};

/// Open lots of a single asset, consumed oldest first.
#[derive(Debug, Clone, Default)]
pub struct LotQueue {
    asset: String,
    lots: VecDeque<Lot>,
    latest_purchase: Option<NaiveDateTime>,
}

fn validate(quantity: Decimal, unit_price: Decimal) -> Result<(), LedgerError> {
    if quantity <= Decimal::ZERO {
        return Err(LedgerError::InvalidQuantity(quantity));
    }
    if unit_price <= Decimal::ZERO {
        return Err(LedgerError::InvalidPrice(unit_price));
    }
    Ok(())
}

/// Quantity and USD cost summed over `lots`, `None` on overflow.
fn checked_totals<'a>(mut lots: impl Iterator<Item = &'a Lot>) -> Option<(Decimal, Decimal)> {
    lots.try_fold((Decimal::ZERO, Decimal::ZERO), |(quantity, cost), lot| {
        Some((quantity.checked_add(lot.quantity)?, cost.checked_add(lot.total_cost()?)?))
    })
}

fn checked_average<'a>(lots: impl Iterator<Item = &'a Lot>) -> Option<Decimal> {
    let (quantity, cost) = checked_totals(lots)?;
    if quantity.is_zero() {
        return Some(Decimal::ZERO);
    }
    cost.checked_div(quantity)
}

/// One lot's worth of a sell.
struct Step {
    consumed: Decimal,
    attributed: Decimal,
    remaining: Decimal,
    whole_lot: bool,
    fifo_cost: Decimal,
    avg_cost: Decimal,
    proceeds: Decimal,
}

fn step(head: &Lot, average_cost: Decimal, quantity: Decimal, remaining: Decimal, unit_price: Decimal) -> Option<Step> {
    let (consumed, fifo_cost, remaining, whole_lot) = if remaining < head.quantity {
        (remaining, remaining.checked_mul(head.unit_price)?, Decimal::ZERO, false)
    } else {
        // outstanding amount drops by the lot's dollar cost, not its quantity
        let cost = head.total_cost()?;
        (head.quantity, cost, remaining.checked_sub(cost)?, true)
    };

    Some(Step {
        consumed,
        attributed: quantity.checked_sub(remaining)?,
        remaining,
        whole_lot,
        fifo_cost,
        avg_cost: consumed.checked_mul(average_cost)?,
        proceeds: consumed.checked_mul(unit_price)?,
    })
}

impl LotQueue {
    pub fn new(asset: impl Into<String>) -> Self {
        Self {
            asset: asset.into(),
            lots: VecDeque::new(),
            latest_purchase: None,
        }
    }

    pub fn asset(&self) -> &str {
        &self.asset
    }

    pub fn lots(&self) -> impl Iterator<Item = &Lot> {
        self.lots.iter()
    }

    pub fn len(&self) -> usize {
        self.lots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }

    fn overflow(&self) -> LedgerError {
        LedgerError::Overflow {
            asset: self.asset.clone(),
        }
    }

    /// Appends `lot` as the newest lot. Purchases must arrive in date order;
    /// the check is against the latest lot ever appended, so a fully sold
    /// queue still remembers where it left off.
    ///
    /// A lot that would push the queue's total quantity or cost out of
    /// `Decimal` range is rejected, which keeps the aggregates below exact.
    pub fn buy(&mut self, lot: Lot) -> Result<(), LedgerError> {
        validate(lot.quantity, lot.unit_price)?;

        if let Some(latest) = self.latest_purchase {
            if lot.purchase_date < latest {
                return Err(LedgerError::OutOfOrder {
                    date: lot.purchase_date,
                    latest,
                });
            }
        }

        if checked_totals(self.lots.iter().chain(iter::once(&lot))).is_none() {
            return Err(self.overflow());
        }

        debug!(asset = %self.asset, quantity = %lot.quantity, unit_price = %lot.unit_price, "buy");
        self.latest_purchase = Some(lot.purchase_date);
        self.lots.push_back(lot);
        Ok(())
    }

    /// Disposes of `quantity` units from the head of the queue, emitting one
    /// [`Sale`] per lot touched as soon as that lot is consumed.
    ///
    /// `Overflow` is returned before any lot changes. On `InsufficientLots`
    /// the lots consumed before the queue ran dry stay consumed.
    pub fn sell<S: SaleSink + ?Sized>(
        &mut self,
        quantity: Decimal,
        unit_price: Decimal,
        sale_date: NaiveDateTime,
        sink: &mut S,
    ) -> Result<(), LedgerError> {
        validate(quantity, unit_price)?;
        self.check_sell(quantity, unit_price)?;
        debug!(asset = %self.asset, %quantity, %unit_price, "sell");

        let mut remaining = quantity;
        loop {
            let average_cost = checked_average(self.lots.iter()).ok_or_else(|| self.overflow())?;
            let Some(head) = self.lots.front_mut() else {
                return Err(LedgerError::InsufficientLots {
                    asset: self.asset.clone(),
                    remaining,
                });
            };

            let step = step(head, average_cost, quantity, remaining, unit_price).ok_or_else(|| {
                LedgerError::Overflow {
                    asset: self.asset.clone(),
                }
            })?;
            let purchase_date = head.purchase_date;
            if step.whole_lot {
                self.lots.pop_front();
            } else {
                head.quantity -= step.consumed;
            }
            remaining = step.remaining;

            sink.emit(Sale {
                asset: self.asset.clone(),
                sale_date,
                purchase_date,
                quantity: step.attributed,
                consumed: step.consumed,
                fifo_cost: step.fifo_cost,
                avg_cost: step.avg_cost,
                proceeds: step.proceeds,
            })?;

            if remaining <= Decimal::ZERO {
                return Ok(());
            }
        }
    }

    /// Walks the lots a sell would touch without changing them. Every step
    /// but the last consumes a whole lot, so the state before step `i` is
    /// just the lots from `i` on.
    fn check_sell(&self, quantity: Decimal, unit_price: Decimal) -> Result<(), LedgerError> {
        let mut remaining = quantity;
        for (i, head) in self.lots.iter().enumerate() {
            let average_cost = checked_average(self.lots.range(i..)).ok_or_else(|| self.overflow())?;
            let step = step(head, average_cost, quantity, remaining, unit_price)
                .ok_or_else(|| self.overflow())?;
            remaining = step.remaining;
            if remaining <= Decimal::ZERO {
                break;
            }
        }
        Ok(())
    }

    /// Convenience wrapper around [`LotQueue::sell`] collecting the sales.
    pub fn sell_collect(
        &mut self,
        quantity: Decimal,
        unit_price: Decimal,
        sale_date: NaiveDateTime,
    ) -> Result<Vec<Sale>, LedgerError> {
        let mut sales = Vec::new();
        self.sell(quantity, unit_price, sale_date, &mut sales)?;
        Ok(sales)
    }

    // buy() keeps both sums in range and sells only shrink them
    pub fn total_quantity(&self) -> Decimal {
        self.lots.iter().map(|l| l.quantity).sum()
    }

    pub fn total_cost(&self) -> Decimal {
        self.lots.iter().map(|l| l.quantity * l.unit_price).sum()
    }

    pub fn average_cost(&self) -> Decimal {
        checked_average(self.lots.iter()).unwrap_or(Decimal::ZERO)
    }
}
