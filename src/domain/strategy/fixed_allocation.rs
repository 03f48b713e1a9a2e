//! Holds fixed percentages of NAV in a set of instruments.

use std::collections::HashSet;

use chrono::NaiveDate;
use log::debug;

use crate::domain::error::StrategyConfigError;
use crate::domain::periodicity::{PeriodTracker, Periodicity};
use crate::domain::portfolio::Portfolio;
use crate::domain::quote::InstantQuotes;

use super::Strategy;

/// One target weight. Either field may be missing in raw configuration;
/// construction rejects such entries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Allocation {
    pub name: Option<String>,
    /// Percentage of NAV, 0..=100.
    pub percentage: Option<f64>,
}

impl Allocation {
    pub fn new(name: impl Into<String>, percentage: f64) -> Self {
        Allocation {
            name: Some(name.into()),
            percentage: Some(percentage),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RebalanceMode {
    /// Rebalance at the start of every period.
    #[default]
    Periodic,
    /// Rebalance once any weight drifts further than the threshold.
    Drift,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixedAllocationConfig {
    pub allocations: Vec<Allocation>,
    pub mode: RebalanceMode,
    pub periodicity: Option<Periodicity>,
    /// Percentage points of NAV.
    pub drift_threshold: f64,
}

impl Default for FixedAllocationConfig {
    fn default() -> Self {
        FixedAllocationConfig {
            allocations: Vec::new(),
            mode: RebalanceMode::Periodic,
            periodicity: Some(Periodicity::Monthly),
            drift_threshold: 5.0,
        }
    }
}

#[derive(Debug, Clone)]
struct Target {
    name: String,
    percentage: f64,
}

#[derive(Debug)]
pub struct FixedAllocationStrategy {
    targets: Vec<Target>,
    mode: RebalanceMode,
    tracker: Option<PeriodTracker>,
    drift_threshold: f64,
    invested: bool,
}

fn validate(config: &FixedAllocationConfig) -> Result<Vec<Target>, StrategyConfigError> {
    let mut seen = HashSet::new();
    let mut targets = Vec::with_capacity(config.allocations.len());

    for (index, allocation) in config.allocations.iter().enumerate() {
        let percentage = allocation
            .percentage
            .ok_or(StrategyConfigError::NullAllocation { index })?;
        let name = allocation
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or(StrategyConfigError::MissingAssetName { index })?;
        if !seen.insert(name) {
            return Err(StrategyConfigError::DuplicateAssetName(name.to_string()));
        }
        targets.push(Target {
            name: name.to_string(),
            percentage,
        });
    }

    let total: f64 = targets.iter().map(|t| t.percentage).sum();
    if total > 100.0 {
        return Err(StrategyConfigError::AllocationExceeded { total });
    }
    if config.mode == RebalanceMode::Periodic && config.periodicity.is_none() {
        return Err(StrategyConfigError::MissingPeriodicity);
    }
    Ok(targets)
}

impl FixedAllocationStrategy {
    pub fn new(config: FixedAllocationConfig) -> Result<Self, StrategyConfigError> {
        let targets = validate(&config)?;
        Ok(FixedAllocationStrategy {
            targets,
            mode: config.mode,
            tracker: match config.mode {
                RebalanceMode::Periodic => config.periodicity.map(PeriodTracker::new),
                RebalanceMode::Drift => None,
            },
            drift_threshold: config.drift_threshold,
            invested: false,
        })
    }

    /// Largest gap, in percentage points, between actual and target weight.
    pub fn drift(&self, portfolio: &Portfolio) -> f64 {
        let nav = portfolio.nav();
        if nav <= 0.0 {
            return 0.0;
        }
        self.targets
            .iter()
            .map(|t| {
                let actual = portfolio.position(&t.name).map_or(0.0, |p| p.nav()) / nav * 100.0;
                (actual - t.percentage).abs()
            })
            .fold(0.0, f64::max)
    }

    fn is_due(&mut self, portfolio: &Portfolio, instant: NaiveDate) -> bool {
        match self.mode {
            RebalanceMode::Periodic => self.tracker.as_mut().is_some_and(|t| t.advance(instant)),
            RebalanceMode::Drift => !self.invested || self.drift(portfolio) > self.drift_threshold,
        }
    }

    fn rebalance(&self, portfolio: &mut Portfolio, quotes: &InstantQuotes) {
        let nav = portfolio.nav();
        let mut wanted = Vec::with_capacity(self.targets.len());
        for target in &self.targets {
            if portfolio.has_pending_order(&target.name) {
                continue;
            }
            let Some(quote) = quotes.quote(&target.name) else {
                continue;
            };
            let parts = (nav * target.percentage / 100.0 / quote.close()).floor();
            wanted.push((target.name.as_str(), parts - portfolio.parts(&target.name)));
        }

        // Sells first; buys only spend cash that is already free.
        for &(name, delta) in wanted.iter().filter(|(_, d)| *d < 0.0) {
            portfolio.order(name, delta);
        }
        for &(name, delta) in wanted.iter().filter(|(_, d)| *d > 0.0) {
            portfolio.order(name, delta);
        }
    }
}

impl Strategy for FixedAllocationStrategy {
    fn name(&self) -> &str {
        "FixedAllocation"
    }

    fn apply_strategy(&mut self, portfolio: &mut Portfolio, quotes: &InstantQuotes) {
        if !self.is_due(portfolio, quotes.instant) {
            return;
        }
        debug!("fixed allocation rebalance on {}", quotes.instant);
        self.rebalance(portfolio, quotes);
        self.invested = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::portfolio::PortfolioConfig;
    use crate::domain::quote::Quote;

    fn config(allocations: Vec<Allocation>) -> FixedAllocationConfig {
        FixedAllocationConfig {
            allocations,
            ..Default::default()
        }
    }

    fn quotes(m: u32, d: u32, xx: f64, yy: f64) -> InstantQuotes {
        InstantQuotes::with_quotes(
            NaiveDate::from_ymd_opt(2024, m, d).unwrap(),
            [Quote::from_close("XX", xx), Quote::from_close("YY", yy)],
        )
    }

    fn step(s: &mut FixedAllocationStrategy, p: &mut Portfolio, q: InstantQuotes) {
        p.process_quotes(&q);
        s.apply_strategy(p, &q);
    }

    #[test]
    fn rejects_null_allocation() {
        let err = FixedAllocationStrategy::new(config(vec![Allocation {
            name: Some("XX".into()),
            percentage: None,
        }]))
        .unwrap_err();
        assert_eq!(err, StrategyConfigError::NullAllocation { index: 0 });
    }

    #[test]
    fn rejects_missing_asset_name() {
        let err = FixedAllocationStrategy::new(config(vec![
            Allocation::new("XX", 10.0),
            Allocation {
                name: None,
                percentage: Some(10.0),
            },
        ]))
        .unwrap_err();
        assert_eq!(err, StrategyConfigError::MissingAssetName { index: 1 });
    }

    #[test]
    fn rejects_total_above_hundred() {
        let err = FixedAllocationStrategy::new(config(vec![
            Allocation::new("XX", 60.0),
            Allocation::new("YY", 50.0),
        ]))
        .unwrap_err();
        assert_eq!(err, StrategyConfigError::AllocationExceeded { total: 110.0 });
    }

    #[test]
    fn rejects_duplicate_asset() {
        let err = FixedAllocationStrategy::new(config(vec![
            Allocation::new("XX", 30.0),
            Allocation::new("XX", 30.0),
        ]))
        .unwrap_err();
        assert_eq!(err, StrategyConfigError::DuplicateAssetName("XX".into()));
    }

    #[test]
    fn periodic_mode_requires_periodicity() {
        let err = FixedAllocationStrategy::new(FixedAllocationConfig {
            allocations: vec![Allocation::new("XX", 50.0)],
            periodicity: None,
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, StrategyConfigError::MissingPeriodicity);

        assert!(FixedAllocationStrategy::new(FixedAllocationConfig {
            allocations: vec![Allocation::new("XX", 50.0)],
            mode: RebalanceMode::Drift,
            periodicity: None,
            ..Default::default()
        })
        .is_ok());
    }

    #[test]
    fn initial_investment_follows_weights() {
        let mut s = FixedAllocationStrategy::new(config(vec![
            Allocation::new("XX", 60.0),
            Allocation::new("YY", 40.0),
        ]))
        .unwrap();
        let mut p = Portfolio::new(PortfolioConfig {
            cash: 1000.0,
            ..Default::default()
        });
        step(&mut s, &mut p, quotes(1, 2, 10.0, 20.0));
        assert_eq!(p.parts("XX"), 60.0);
        assert_eq!(p.parts("YY"), 20.0);
        assert_eq!(p.cash, 0.0);
    }

    #[test]
    fn periodic_rebalance_sells_winner_buys_loser() {
        let mut s = FixedAllocationStrategy::new(config(vec![
            Allocation::new("XX", 50.0),
            Allocation::new("YY", 50.0),
        ]))
        .unwrap();
        let mut p = Portfolio::new(PortfolioConfig {
            cash: 1000.0,
            ..Default::default()
        });
        step(&mut s, &mut p, quotes(1, 2, 10.0, 10.0));
        assert_eq!(p.parts("XX"), 50.0);

        // Same month: no rebalance although weights moved.
        step(&mut s, &mut p, quotes(1, 20, 20.0, 10.0));
        assert_eq!(p.parts("XX"), 50.0);

        // New month: nav 1500, 750 each.
        step(&mut s, &mut p, quotes(2, 1, 20.0, 10.0));
        assert_eq!(p.parts("XX"), 37.0);
        assert_eq!(p.parts("YY"), 75.0);
        assert!(p.cash >= 0.0);
    }

    #[test]
    fn drift_mode_waits_for_threshold() {
        let mut s = FixedAllocationStrategy::new(FixedAllocationConfig {
            allocations: vec![Allocation::new("XX", 50.0), Allocation::new("YY", 50.0)],
            mode: RebalanceMode::Drift,
            periodicity: None,
            drift_threshold: 10.0,
        })
        .unwrap();
        let mut p = Portfolio::new(PortfolioConfig {
            cash: 1000.0,
            ..Default::default()
        });
        step(&mut s, &mut p, quotes(1, 2, 10.0, 10.0));
        assert_eq!(p.parts("XX"), 50.0);

        // XX weight 550/1050 = 52.4%: inside the band.
        step(&mut s, &mut p, quotes(1, 3, 11.0, 10.0));
        assert_eq!(p.parts("XX"), 50.0);

        // XX weight 1000/1500 = 66.7%: rebalance to 750 each.
        step(&mut s, &mut p, quotes(1, 4, 20.0, 10.0));
        assert_eq!(p.parts("XX"), 37.0);
        assert_eq!(p.parts("YY"), 75.0);
    }
}
