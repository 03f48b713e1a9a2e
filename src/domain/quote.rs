//! Instrument quotes and the snapshot of all quotes at one instant.

use chrono::NaiveDate;
use std::collections::HashMap;

use super::candlestick::Candlestick;

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub name: String,
    pub candle: Candlestick,
    pub volume: f64,
    /// Bid/ask gap as a fraction of price.
    pub spread: f64,
    /// Dividend paid per part on this instant.
    pub dividend: f64,
    pub alert: Option<String>,
    pub adjusted_close: Option<f64>,
}

impl Quote {
    pub fn new(name: impl Into<String>, candle: Candlestick) -> Self {
        Quote {
            name: name.into(),
            candle,
            volume: 0.0,
            spread: 0.0,
            dividend: 0.0,
            alert: None,
            adjusted_close: None,
        }
    }

    pub fn from_close(name: impl Into<String>, close: f64) -> Self {
        Self::new(name, Candlestick::from_close(close))
    }

    pub fn with_spread(mut self, spread: f64) -> Self {
        self.spread = spread;
        self
    }

    pub fn with_dividend(mut self, dividend: f64) -> Self {
        self.dividend = dividend;
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_adjusted_close(mut self, adjusted_close: f64) -> Self {
        self.adjusted_close = Some(adjusted_close);
        self
    }

    pub fn open(&self) -> f64 {
        self.candle.open
    }

    pub fn high(&self) -> f64 {
        self.candle.high
    }

    pub fn low(&self) -> f64 {
        self.candle.low
    }

    pub fn close(&self) -> f64 {
        self.candle.close
    }
}

/// All quotes known at one instant, unique by name.
#[derive(Debug, Clone, PartialEq)]
pub struct InstantQuotes {
    pub instant: NaiveDate,
    quotes: Vec<Quote>,
    index: HashMap<String, usize>,
}

impl InstantQuotes {
    pub fn new(instant: NaiveDate) -> Self {
        InstantQuotes {
            instant,
            quotes: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn with_quotes(instant: NaiveDate, quotes: impl IntoIterator<Item = Quote>) -> Self {
        let mut iq = Self::new(instant);
        for quote in quotes {
            iq.add(quote);
        }
        iq
    }

    /// Adds a quote; a quote with the same name is replaced.
    pub fn add(&mut self, quote: Quote) {
        match self.index.get(&quote.name) {
            Some(&i) => self.quotes[i] = quote,
            None => {
                self.index.insert(quote.name.clone(), self.quotes.len());
                self.quotes.push(quote);
            }
        }
    }

    pub fn quote(&self, name: &str) -> Option<&Quote> {
        self.index.get(name).map(|&i| &self.quotes[i])
    }

    pub fn quote_mut(&mut self, name: &str) -> Option<&mut Quote> {
        self.index.get(name).map(|&i| &mut self.quotes[i])
    }

    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.quotes.iter().map(|q| q.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Adds every quote of `other`, overwriting same-named quotes.
    pub fn absorb(&mut self, other: InstantQuotes) {
        for quote in other.quotes {
            self.add(quote);
        }
    }
}
