//! Quote supply from one CSV file per instrument.
//!
//! `<base>/<NAME>.csv` with the columns
//! `date,open,high,low,close,volume[,dividend[,adjusted_close]]`.
//! Open, high, low and volume may be blank.
//!
//! Explicit dividend payments come from a separate `instrument,date,amount`
//! file.

use chrono::NaiveDate;
use csv::StringRecord;
use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::domain::candlestick::Candlestick;
use crate::domain::dividends::Dividend;
use crate::domain::error::SimError;
use crate::domain::historical_quotes::HistoricalQuotes;
use crate::domain::quote::Quote;
use crate::ports::quote_port::QuotePort;

pub struct CsvQuoteAdapter {
    base_path: PathBuf,
    /// Bid/ask spread applied to every quote read.
    spread: f64,
}

fn quote_error(name: &str, line: usize, reason: impl std::fmt::Display) -> SimError {
    SimError::QuoteData {
        reason: format!("{name} line {line}: {reason}"),
    }
}

fn optional_field(record: &StringRecord, index: usize) -> Result<Option<f64>, String> {
    match record.get(index).map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| format!("invalid value '{raw}' in column {}: {e}", index + 1)),
    }
}

impl CsvQuoteAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            spread: 0.0,
        }
    }

    pub fn with_spread(mut self, spread: f64) -> Self {
        self.spread = spread;
        self
    }

    fn csv_path(&self, name: &str) -> PathBuf {
        self.base_path.join(format!("{name}.csv"))
    }

    /// Reads all quotes of one instrument, in file order.
    pub fn read_instrument(&self, name: &str) -> Result<Vec<(NaiveDate, Quote)>, SimError> {
        let path = self.csv_path(name);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SimError::NoData {
                    name: name.to_string(),
                });
            }
            Err(e) => return Err(SimError::Io(e)),
        };

        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());
        let mut quotes = Vec::new();

        for (i, result) in rdr.records().enumerate() {
            let line = i + 2;
            let record = result.map_err(|e| quote_error(name, line, e))?;

            let date_str = record
                .get(0)
                .ok_or_else(|| quote_error(name, line, "missing date column"))?;
            let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
                .map_err(|e| quote_error(name, line, format!("invalid date: {e}")))?;

            let field = |index| optional_field(&record, index).map_err(|e| quote_error(name, line, e));
            let close = field(4)?.ok_or_else(|| quote_error(name, line, "missing close"))?;
            let candle = Candlestick::new(field(1)?, field(2)?, field(3)?, close);

            let mut quote = Quote::new(name, candle)
                .with_volume(field(5)?.unwrap_or(0.0))
                .with_dividend(field(6)?.unwrap_or(0.0))
                .with_spread(self.spread);
            if let Some(adjusted) = field(7)? {
                quote = quote.with_adjusted_close(adjusted);
            }
            quotes.push((date, quote));
        }

        debug!("read {} quotes for {} from {}", quotes.len(), name, path.display());
        Ok(quotes)
    }

    /// Reads `instrument,date,amount` rows. A relative path is resolved
    /// against the base directory.
    pub fn read_dividends(&self, path: &Path) -> Result<Vec<(String, Dividend)>, SimError> {
        let path = self.base_path.join(path);
        let source = path.display().to_string();
        let content = fs::read_to_string(&path)?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut payments = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let line = i + 2;
            let record = result.map_err(|e| quote_error(&source, line, e))?;
            let name = record
                .get(0)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| quote_error(&source, line, "missing instrument"))?;
            let instant = record
                .get(1)
                .ok_or_else(|| quote_error(&source, line, "missing date column"))
                .and_then(|raw| {
                    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                        .map_err(|e| quote_error(&source, line, format!("invalid date: {e}")))
                })?;
            let amount = optional_field(&record, 2)
                .map_err(|e| quote_error(&source, line, e))?
                .ok_or_else(|| quote_error(&source, line, "missing amount"))?;
            payments.push((name.to_string(), Dividend { instant, amount }));
        }

        debug!("read {} dividend payment(s) from {}", payments.len(), source);
        Ok(payments)
    }

    /// Instruments with a CSV file in the base directory, sorted.
    pub fn list_instruments(&self) -> Result<Vec<String>, SimError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem() {
                    names.push(stem.to_string_lossy().into_owned());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

impl QuotePort for CsvQuoteAdapter {
    fn fetch(&self, names: &[String]) -> Result<HistoricalQuotes, SimError> {
        let mut timeline = HistoricalQuotes::new();
        for name in names {
            let quotes = self.read_instrument(name)?;
            if quotes.is_empty() {
                return Err(SimError::NoData { name: name.clone() });
            }
            timeline = timeline.merge(&HistoricalQuotes::from_quotes(quotes));
        }
        Ok(timeline)
    }
}
