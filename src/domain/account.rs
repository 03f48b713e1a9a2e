//! An account: a ledger driven by one strategy.

use chrono::NaiveDate;

use super::metrics::{EquityPoint, Metrics};
use super::portfolio::{Portfolio, PortfolioConfig};
use super::quote::InstantQuotes;
use super::report::Emitter;
use super::strategy::{NullStrategy, Strategy};

#[derive(Debug)]
pub struct Account {
    pub id: String,
    pub portfolio: Portfolio,
    strategy: Box<dyn Strategy>,
    emitter: Emitter,
    equity_curve: Vec<EquityPoint>,
    /// `accumulated_costs` at the previous record.
    reported_costs: f64,
}

impl Account {
    pub fn new(id: impl Into<String>, config: PortfolioConfig, strategy: Box<dyn Strategy>) -> Self {
        Account {
            id: id.into(),
            portfolio: Portfolio::new(config),
            strategy,
            emitter: Emitter::disabled(),
            equity_curve: Vec::new(),
            reported_costs: 0.0,
        }
    }

    /// An account holding cash only.
    pub fn passive(id: impl Into<String>, config: PortfolioConfig) -> Self {
        Self::new(id, config, Box::new(NullStrategy))
    }

    /// Emits `<id>.NAV`, `<id>.CASH`, `<id>.COSTS` and `<id>.<name>.POS`.
    /// COSTS covers the current reporting cycle only.
    pub fn with_emitter(mut self, emitter: Emitter) -> Self {
        self.emitter = emitter;
        self
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    pub fn cash(&self) -> f64 {
        self.portfolio.cash
    }

    pub fn nav(&self) -> f64 {
        self.portfolio.nav()
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    pub fn metrics(&self) -> Metrics {
        Metrics::compute(&self.equity_curve)
    }

    /// Runs one instant: revalue and settle, then let the strategy trade.
    pub fn process(&mut self, quotes: &InstantQuotes) {
        self.portfolio.process_quotes(quotes);
        self.strategy.apply_strategy(&mut self.portfolio, quotes);
        self.record(quotes.instant);
    }

    fn record(&mut self, instant: NaiveDate) {
        let nav = self.portfolio.nav();
        self.equity_curve.push(EquityPoint { date: instant, nav });
        let cycle_costs = self.portfolio.accumulated_costs - self.reported_costs;
        self.reported_costs = self.portfolio.accumulated_costs;

        if !self.emitter.is_enabled() {
            return;
        }
        self.emitter.emit("NAV", nav);
        self.emitter.emit("CASH", self.portfolio.cash);
        self.emitter.emit("COSTS", cycle_costs);
        for position in self.portfolio.positions.values() {
            self.emitter.emit(&format!("{}.POS", position.name), position.parts);
        }
    }

    /// Moves cash to `other` when this account can cover `amount`.
    pub fn transfer(&mut self, other: &mut Account, amount: f64) -> bool {
        self.portfolio.transfer_to(&mut other.portfolio, amount)
    }

    pub fn withdraw(&mut self, amount: f64) -> bool {
        self.portfolio.withdraw(amount)
    }
}
