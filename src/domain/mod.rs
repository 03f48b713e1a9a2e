//! Core simulation domain: quotes, indicators, timing, ledger and strategies.

pub mod candlestick;
pub mod quote;
pub mod historical_quotes;
pub mod dividends;
pub mod periodicity;
pub mod indicator;
pub mod market_timing;
pub mod assessor;
pub mod universe;
pub mod position;
pub mod execution;
pub mod portfolio;
pub mod metrics;
pub mod report;
pub mod account;
pub mod strategy;
pub mod simulation;
pub mod config_validation;
pub mod error;
