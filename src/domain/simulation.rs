//! Simulation driver: walks the quote timeline once, in order.

use chrono::NaiveDate;
use log::info;

use super::account::Account;
use super::historical_quotes::HistoricalQuotes;
use super::metrics::{EquityPoint, Metrics};
use super::report::SharedSink;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationConfig {
    /// Inclusive. A date without quotes starts at the nearest prior instant.
    pub start: Option<NaiveDate>,
    /// Inclusive.
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountResult {
    pub id: String,
    pub strategy: String,
    pub final_nav: f64,
    pub cash: f64,
    pub total_costs: f64,
    pub total_withdrawn: f64,
    pub equity_curve: Vec<EquityPoint>,
    pub metrics: Metrics,
}

impl AccountResult {
    fn from_account(account: &Account) -> Self {
        AccountResult {
            id: account.id.clone(),
            strategy: account.strategy_name().to_string(),
            final_nav: account.nav(),
            cash: account.cash(),
            total_costs: account.portfolio.accumulated_costs,
            total_withdrawn: account.portfolio.total_withdrawn,
            equity_curve: account.equity_curve().to_vec(),
            metrics: account.metrics(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub first_instant: Option<NaiveDate>,
    pub last_instant: Option<NaiveDate>,
    pub instants: usize,
    pub accounts: Vec<AccountResult>,
}

impl SimulationResult {
    pub fn account(&self, id: &str) -> Option<&AccountResult> {
        self.accounts.iter().find(|a| a.id == id)
    }
}

pub struct Simulation {
    config: SimulationConfig,
    quotes: HistoricalQuotes,
    accounts: Vec<Account>,
    sink: Option<SharedSink>,
}

impl Simulation {
    pub fn new(config: SimulationConfig, quotes: HistoricalQuotes) -> Self {
        Simulation {
            config,
            quotes,
            accounts: Vec::new(),
            sink: None,
        }
    }

    /// Sink whose reporting cycle brackets every instant. Accounts and
    /// timings emit into it through their own `Emitter`.
    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn add_account(&mut self, account: Account) {
        self.accounts.push(account);
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn account(&self, id: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }

    pub fn quotes(&self) -> &HistoricalQuotes {
        &self.quotes
    }

    fn effective_start(&self) -> Option<NaiveDate> {
        let start = self.config.start?;
        Some(self.quotes.get(start).map_or(start, |iq| iq.instant))
    }

    /// Processes every instant in range for every account, in account order.
    pub fn run(&mut self) -> SimulationResult {
        let start = self.effective_start();
        info!(
            "simulating {} account(s) from {:?} to {:?}",
            self.accounts.len(),
            start,
            self.config.end
        );

        let mut first_instant = None;
        let mut last_instant = None;
        let mut instants = 0usize;

        for iq in self.quotes.range(start, self.config.end) {
            if let Some(sink) = &self.sink {
                sink.borrow_mut().start_reporting_cycle(iq.instant);
            }
            for account in &mut self.accounts {
                account.process(iq);
            }
            if let Some(sink) = &self.sink {
                sink.borrow_mut().collect_reports();
            }

            first_instant.get_or_insert(iq.instant);
            last_instant = Some(iq.instant);
            instants += 1;
        }

        info!("simulation finished after {} instants", instants);
        SimulationResult {
            first_instant,
            last_instant,
            instants,
            accounts: self.accounts.iter().map(AccountResult::from_account).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_report::MemoryReport;
    use crate::domain::portfolio::PortfolioConfig;
    use crate::domain::quote::Quote;
    use crate::domain::report::Emitter;
    use crate::domain::strategy::{BuyAndHoldConfig, BuyAndHoldStrategy};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn quotes() -> HistoricalQuotes {
        HistoricalQuotes::from_quotes(
            [2, 3, 5, 8]
                .into_iter()
                .map(|d| (day(d), Quote::from_close("XX", 10.0 + d as f64))),
        )
    }

    fn buy_and_hold(id: &str) -> Account {
        let strategy = BuyAndHoldStrategy::new(BuyAndHoldConfig {
            instrument: "XX".into(),
            ..Default::default()
        });
        Account::new(
            id,
            PortfolioConfig {
                cash: 1200.0,
                ..Default::default()
            },
            Box::new(strategy),
        )
    }

    #[test]
    fn runs_every_instant_in_range() {
        let mut sim = Simulation::new(
            SimulationConfig {
                start: Some(day(3)),
                end: Some(day(5)),
            },
            quotes(),
        );
        sim.add_account(buy_and_hold("a"));
        let result = sim.run();
        assert_eq!(result.instants, 2);
        assert_eq!(result.first_instant, Some(day(3)));
        assert_eq!(result.last_instant, Some(day(5)));
        assert_eq!(result.account("a").unwrap().equity_curve.len(), 2);
    }

    #[test]
    fn misaligned_start_uses_nearest_prior_instant() {
        let mut sim = Simulation::new(
            SimulationConfig {
                start: Some(day(4)),
                end: None,
            },
            quotes(),
        );
        sim.add_account(buy_and_hold("a"));
        let result = sim.run();
        assert_eq!(result.first_instant, Some(day(3)));
        assert_eq!(result.instants, 3);
    }

    #[test]
    fn reporting_cycle_brackets_each_instant() {
        let report = Rc::new(RefCell::new(MemoryReport::new()));
        let sink: SharedSink = report.clone();
        let mut sim = Simulation::new(SimulationConfig::default(), quotes()).with_sink(sink.clone());
        sim.add_account(buy_and_hold("a").with_emitter(Emitter::new(sink, "a")));
        let result = sim.run();

        let report = report.borrow();
        assert_eq!(report.instants().len(), 4);
        assert_eq!(report.series("a.NAV").len(), 4);
        let final_nav = result.account("a").unwrap().final_nav;
        assert_eq!(report.value(day(8), "a.NAV"), Some(final_nav));
    }

    #[test]
    fn accounts_see_the_same_instants() {
        let mut sim = Simulation::new(SimulationConfig::default(), quotes());
        sim.add_account(buy_and_hold("a"));
        sim.add_account(Account::passive("cash", PortfolioConfig::default()));
        let result = sim.run();
        assert_eq!(result.accounts.len(), 2);
        assert_eq!(
            result.account("a").unwrap().equity_curve.len(),
            result.account("cash").unwrap().equity_curve.len()
        );
        assert_eq!(sim.account("a").unwrap().portfolio.parts("XX"), 100.0);
    }
}
