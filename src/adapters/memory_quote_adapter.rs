//! Quote supply from a timeline already held in memory.

use crate::domain::error::SimError;
use crate::domain::historical_quotes::HistoricalQuotes;
use crate::domain::quote::InstantQuotes;
use crate::ports::quote_port::QuotePort;

#[derive(Debug, Clone, Default)]
pub struct MemoryQuoteAdapter {
    quotes: HistoricalQuotes,
}

impl MemoryQuoteAdapter {
    pub fn new(quotes: HistoricalQuotes) -> Self {
        Self { quotes }
    }
}

impl QuotePort for MemoryQuoteAdapter {
    /// Timeline restricted to `names`; instants quoting none of them are left
    /// out.
    fn fetch(&self, names: &[String]) -> Result<HistoricalQuotes, SimError> {
        if let Some(missing) = names
            .iter()
            .find(|name| self.quotes.series(name).next().is_none())
        {
            return Err(SimError::NoData {
                name: missing.clone(),
            });
        }

        let instants = self.quotes.iter().filter_map(|iq| {
            let quotes = names.iter().filter_map(|name| iq.quote(name).cloned());
            let subset = InstantQuotes::with_quotes(iq.instant, quotes);
            (!subset.is_empty()).then_some(subset)
        });
        Ok(HistoricalQuotes::from_instants(instants))
    }
}
