use crate::accounting::LedgerError;
use crate::models::Sale;

/// Receives sales one at a time, as the ledger produces them.
///
/// A sink that can no longer accept records returns
/// [`LedgerError::ConsumerClosed`], which stops the sell in progress.
pub trait SaleSink {
    fn emit(&mut self, sale: Sale) -> Result<(), LedgerError>;
}

impl SaleSink for Vec<Sale> {
    fn emit(&mut self, sale: Sale) -> Result<(), LedgerError> {
        self.push(sale);
        Ok(())
    }
}

impl<S: SaleSink + ?Sized> SaleSink for &mut S {
    fn emit(&mut self, sale: Sale) -> Result<(), LedgerError> {
        (**self).emit(sale)
    }
}
