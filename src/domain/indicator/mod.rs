//! Streaming technical indicators.
//!
//! Every indicator consumes one sample at a time and keeps O(1) state, apart
//! from the fixed windows some algorithms need (SMA, linear regression).
//! Until enough samples have been seen an indicator reports `None`; it
//! never panics on missing history. Ratios are not guarded against division
//! by zero and may yield non-finite values.

pub mod atr;
pub mod ema;
pub mod regression;
pub mod rsi;
pub mod sma;
pub mod smma;

pub use atr::{Atr, TrueRange};
pub use ema::Ema;
pub use regression::{MovingLinearRegression, RegressionLine};
pub use rsi::Rsi;
pub use sma::Sma;
pub use smma::Smma;

/// A calculator fed one sample per call.
pub trait Indicator {
    type Input: ?Sized;

    /// Consumes a sample and returns the updated value, if any.
    fn update(&mut self, input: &Self::Input) -> Option<f64>;

    /// Latest value without consuming anything.
    fn value(&self) -> Option<f64>;
}
