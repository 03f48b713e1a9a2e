#![allow(dead_code)]

use chrono::NaiveDate;
use std::fs;
use std::io::Write;
use std::path::Path;
use tradesim::domain::candlestick::Candlestick;
use tradesim::domain::historical_quotes::HistoricalQuotes;
use tradesim::domain::portfolio::{Portfolio, PortfolioConfig};
use tradesim::domain::position::Position;
pub use tradesim::domain::quote::{InstantQuotes, Quote};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn instant(day: NaiveDate, quotes: &[(&str, f64)]) -> InstantQuotes {
    InstantQuotes::with_quotes(
        day,
        quotes.iter().map(|(name, close)| Quote::from_close(*name, *close)),
    )
}

/// One instrument quoted on consecutive days starting 2024-01-01.
pub fn daily_series(name: &str, closes: &[f64]) -> HistoricalQuotes {
    let start = date(2024, 1, 1);
    HistoricalQuotes::from_quotes(closes.iter().enumerate().map(|(i, close)| {
        (
            start + chrono::Duration::days(i as i64),
            Quote::from_close(name, *close),
        )
    }))
}

pub fn portfolio(cash: f64, settlement_days: u32) -> Portfolio {
    Portfolio::new(PortfolioConfig {
        cash,
        settlement_days,
        ..Default::default()
    })
}

pub fn hold(portfolio: &mut Portfolio, name: &str, parts: f64, price: f64) {
    let mut position = Position::new(name, Candlestick::from_close(price));
    position.parts = parts;
    portfolio.positions.insert(name.to_string(), position);
}

/// NAV recomputed from scratch: cash plus parts at their last close.
pub fn manual_nav(portfolio: &Portfolio) -> f64 {
    portfolio.cash
        + portfolio
            .positions
            .values()
            .map(|p| p.parts * p.part_value.close)
            .sum::<f64>()
}

/// Writes `<dir>/<name>.csv` with one `date,,,,close,` row per entry.
pub fn write_quotes_csv(dir: &Path, name: &str, rows: &[(&str, f64)]) {
    let mut content = String::from("date,open,high,low,close,volume\n");
    for (day, close) in rows {
        content.push_str(&format!("{day},{close},{close},{close},{close},1000\n"));
    }
    fs::write(dir.join(format!("{name}.csv")), content).unwrap();
}

pub fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
