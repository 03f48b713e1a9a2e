//! Fully invested in one instrument while the market timing is BULL.
//!
//! On BEAR the position is liquidated and, when configured, the cash parked
//! in a safe instrument. Dividends are reinvested implicitly: they land in
//! cash before the strategy runs and the next purchase sweeps them up.

use chrono::NaiveDate;
use log::{debug, info};

use crate::domain::execution::affordable_parts;
use crate::domain::market_timing::{MarketTiming, NullMarketTiming};
use crate::domain::periodicity::{PeriodTracker, Periodicity};
use crate::domain::portfolio::Portfolio;
use crate::domain::quote::InstantQuotes;

use super::Strategy;

/// Cash taken out of the account at the start of every period.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodicTransfer {
    pub periodicity: Periodicity,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BuyAndHoldConfig {
    pub instrument: String,
    pub safe_instrument: Option<String>,
    /// Instrument feeding the market timing; `instrument` when unset.
    pub timing_instrument: Option<String>,
    pub transfer: Option<PeriodicTransfer>,
}

#[derive(Debug)]
pub struct BuyAndHoldStrategy {
    config: BuyAndHoldConfig,
    timing: Box<dyn MarketTiming>,
    transfers: Option<PeriodTracker>,
    owed: f64,
}

impl BuyAndHoldStrategy {
    pub fn new(config: BuyAndHoldConfig) -> Self {
        Self::with_timing(config, Box::new(NullMarketTiming))
    }

    pub fn with_timing(config: BuyAndHoldConfig, timing: Box<dyn MarketTiming>) -> Self {
        let transfers = config
            .transfer
            .as_ref()
            .map(|t| PeriodTracker::new(t.periodicity));
        BuyAndHoldStrategy {
            config,
            timing,
            transfers,
            owed: 0.0,
        }
    }

    pub fn config(&self) -> &BuyAndHoldConfig {
        &self.config
    }

    /// Transfers due but not yet paid out.
    pub fn owed(&self) -> f64 {
        self.owed
    }

    /// Accrues the periodic transfer and pays what is owed, selling just
    /// enough of the held instrument to cover a shortfall.
    fn transfer_out(&mut self, portfolio: &mut Portfolio, instant: NaiveDate) {
        if let (Some(tracker), Some(transfer)) = (self.transfers.as_mut(), self.config.transfer.as_ref()) {
            let first = tracker.last().is_none();
            if tracker.advance(instant) && !first {
                self.owed += transfer.amount;
            }
        }
        if self.owed <= 0.0 {
            return;
        }

        if portfolio.cash < self.owed {
            let shortfall = self.owed - portfolio.cash;
            let held = [Some(&self.config.instrument), self.config.safe_instrument.as_ref()]
                .into_iter()
                .flatten()
                .find(|name| portfolio.parts(name) > 0.0 && !portfolio.has_pending_order(name))
                .cloned();
            if let Some(name) = held {
                if let Some(close) = portfolio.current_quote(&name).map(|q| q.close()) {
                    let parts = (shortfall / close).ceil();
                    debug!("selling {} {} to cover transfer of {}", parts, name, self.owed);
                    portfolio.order(&name, -parts);
                }
            }
        }

        if portfolio.withdraw(self.owed) {
            info!("transferred {} out on {}", self.owed, instant);
            self.owed = 0.0;
        }
    }

    /// Buys as many parts of `name` as the free cash pays for.
    fn invest(&self, portfolio: &mut Portfolio, name: &str) {
        if portfolio.has_pending_order(name) {
            return;
        }
        let Some(quote) = portfolio.current_quote(name) else {
            return;
        };
        let parts = affordable_parts(portfolio.cash - self.owed, quote, quote.close());
        if parts > 0.0 {
            portfolio.order(name, parts);
        }
    }
}

impl Strategy for BuyAndHoldStrategy {
    fn name(&self) -> &str {
        "BuyAndHold"
    }

    fn apply_strategy(&mut self, portfolio: &mut Portfolio, quotes: &InstantQuotes) {
        let timed = self
            .config
            .timing_instrument
            .as_deref()
            .unwrap_or(&self.config.instrument);
        if let Some(quote) = quotes.quote(timed) {
            self.timing.record(quotes.instant, quote);
        }
        for event in self.timing.take_events() {
            info!(
                "{}: combined timing turned {} on {}",
                self.config.instrument, event.status, event.instant
            );
        }

        self.transfer_out(portfolio, quotes.instant);

        let instrument = self.config.instrument.clone();
        if self.timing.bear_bull().is_bull() {
            if let Some(safe) = self.config.safe_instrument.clone() {
                if !portfolio.has_pending_order(&safe) {
                    portfolio.close_position(&safe);
                }
            }
            self.invest(portfolio, &instrument);
        } else {
            if !portfolio.has_pending_order(&instrument) {
                portfolio.close_position(&instrument);
            }
            if let Some(safe) = self.config.safe_instrument.clone() {
                self.invest(portfolio, &safe);
            }
        }
    }
}
