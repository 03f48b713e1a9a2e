//! Trading strategies applied to an account once per instant.

pub mod buy_and_hold;
pub mod fixed_allocation;
pub mod rebalancing;

pub use buy_and_hold::{BuyAndHoldConfig, BuyAndHoldStrategy, PeriodicTransfer};
pub use fixed_allocation::{
    Allocation, FixedAllocationConfig, FixedAllocationStrategy, RebalanceMode,
};
pub use rebalancing::{RebalancingConfig, RebalancingStrategy};

use std::fmt;

use super::portfolio::Portfolio;
use super::quote::InstantQuotes;

/// Decides orders for one account. Runs after the account has revalued its
/// positions and executed due orders for the instant.
pub trait Strategy {
    fn name(&self) -> &str;

    fn apply_strategy(&mut self, portfolio: &mut Portfolio, quotes: &InstantQuotes);
}

impl fmt::Debug for dyn Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Strategy({})", self.name())
    }
}

/// Holds cash and never trades.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStrategy;

impl Strategy for NullStrategy {
    fn name(&self) -> &str {
        "Null"
    }

    fn apply_strategy(&mut self, _portfolio: &mut Portfolio, _quotes: &InstantQuotes) {}
}
