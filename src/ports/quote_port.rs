//! Quote supply port trait.

use crate::domain::error::SimError;
use crate::domain::historical_quotes::HistoricalQuotes;

pub trait QuotePort {
    /// Resolves instrument names to one merged timeline. Unknown names are an
    /// error.
    fn fetch(&self, names: &[String]) -> Result<HistoricalQuotes, SimError>;
}
