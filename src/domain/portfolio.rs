//! Cash, positions and the settlement queue of one account.

use chrono::NaiveDate;
use log::{debug, info};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::execution::{self, Fill, Order, OrderState};
use super::position::Position;
use super::quote::{InstantQuotes, Quote};

/// How `Quote::dividend` is credited to a holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DividendMode {
    /// `dividend` is a percentage of the position value.
    #[default]
    Percentage,
    /// `dividend` is an absolute amount per part held.
    PerPart,
}

impl fmt::Display for DividendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DividendMode::Percentage => write!(f, "percentage"),
            DividendMode::PerPart => write!(f, "per_part"),
        }
    }
}

impl FromStr for DividendMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "percentage" | "percent" => Ok(DividendMode::Percentage),
            "per_part" | "perpart" | "absolute" => Ok(DividendMode::PerPart),
            other => Err(format!("unknown dividend mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioConfig {
    pub cash: f64,
    /// Instants between placing an order and its execution.
    pub settlement_days: u32,
    /// Deducted from every transfer between accounts.
    pub transfer_cost: f64,
    pub dividend_mode: DividendMode,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        PortfolioConfig {
            cash: 0.0,
            settlement_days: 0,
            transfer_cost: 0.0,
            dividend_mode: DividendMode::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_cash: f64,
    pub positions: BTreeMap<String, Position>,
    pub accumulated_costs: f64,
    pub total_withdrawn: f64,
    pub(crate) fills: Vec<Fill>,
    orders: Vec<Order>,
    config: PortfolioConfig,
    current: InstantQuotes,
}

impl Portfolio {
    pub fn new(config: PortfolioConfig) -> Self {
        Portfolio {
            cash: config.cash,
            initial_cash: config.cash,
            positions: BTreeMap::new(),
            accumulated_costs: 0.0,
            total_withdrawn: 0.0,
            fills: Vec::new(),
            orders: Vec::new(),
            current: InstantQuotes::new(NaiveDate::MIN),
            config,
        }
    }

    pub fn config(&self) -> &PortfolioConfig {
        &self.config
    }

    /// Instant of the quotes last processed.
    pub fn instant(&self) -> Option<NaiveDate> {
        (self.current.instant != NaiveDate::MIN).then_some(self.current.instant)
    }

    pub fn current_quote(&self, name: &str) -> Option<&Quote> {
        self.current.quote(name)
    }

    pub fn position(&self, name: &str) -> Option<&Position> {
        self.positions.get(name)
    }

    pub fn parts(&self, name: &str) -> f64 {
        self.positions.get(name).map_or(0.0, |p| p.parts)
    }

    pub fn nav(&self) -> f64 {
        self.cash + self.positions.values().map(Position::nav).sum::<f64>()
    }

    pub fn pending_orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn has_pending_order(&self, name: &str) -> bool {
        self.orders.iter().any(|o| o.name == name)
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    /// Revalues positions, credits dividends and executes due orders.
    pub fn process_quotes(&mut self, quotes: &InstantQuotes) {
        self.current = quotes.clone();

        for quote in quotes.quotes() {
            let Some(position) = self.positions.get_mut(&quote.name) else {
                continue;
            };
            position.update_value(quote.candle);
            if quote.dividend > 0.0 {
                let credit = match self.config.dividend_mode {
                    DividendMode::Percentage => position.nav() * quote.dividend / 100.0,
                    DividendMode::PerPart => position.parts * quote.dividend,
                };
                debug!("{}: dividend {} credited on {}", quote.name, credit, quotes.instant);
                self.cash += credit;
            }
        }

        self.execute_due_orders(quotes);
    }

    fn execute_due_orders(&mut self, quotes: &InstantQuotes) {
        for order in &mut self.orders {
            order.tick();
        }

        let (mut due, waiting): (Vec<Order>, Vec<Order>) =
            std::mem::take(&mut self.orders).into_iter().partition(Order::is_due);
        self.orders = waiting;

        // Sells first so their proceeds fund the buys.
        due.sort_by_key(|o| !o.is_sell());
        for mut order in due {
            match quotes.quote(&order.name) {
                Some(quote) => {
                    execution::execute_order(self, quotes.instant, quote, order.parts, quote.open());
                    order.mark(OrderState::Applied);
                }
                None => {
                    debug!(
                        "dropping order for {} {} on {}: no quote",
                        order.parts, order.name, quotes.instant
                    );
                    order.mark(OrderState::Dropped);
                }
            }
        }
    }

    /// Places an order for whole `parts` (negative to sell). Sells beyond the
    /// parts held are clipped. Without settlement delay the order fills at the
    /// current close, otherwise it queues until due.
    pub fn order(&mut self, name: &str, parts: f64) {
        let mut parts = execution::truncate_parts(parts);
        if parts < 0.0 {
            parts = parts.max(-self.parts(name));
        }
        if parts == 0.0 {
            return;
        }

        let instant = self.instant();
        if self.config.settlement_days == 0 {
            if let (Some(instant), Some(quote)) = (instant, self.current.quote(name).cloned()) {
                execution::execute_order(self, instant, &quote, parts, quote.close());
                return;
            }
        }
        self.orders.push(Order::new(name, parts, self.config.settlement_days, instant));
    }

    /// Liquidates the whole position in `name`.
    pub fn close_position(&mut self, name: &str) {
        let parts = self.parts(name);
        if parts > 0.0 {
            self.order(name, -parts);
        }
    }

    /// Spread cost of trading `parts` of `quote`.
    pub fn order_cost(&self, quote: &Quote, parts: f64) -> f64 {
        execution::order_cost(quote, parts)
    }

    /// Takes `amount` out of the simulation. Skipped when cash is short.
    pub fn withdraw(&mut self, amount: f64) -> bool {
        if amount <= 0.0 || self.cash < amount {
            debug!("withdrawal of {} skipped: cash {}", amount, self.cash);
            return false;
        }
        self.cash -= amount;
        self.total_withdrawn += amount;
        true
    }

    /// Moves `amount` to `other`, less the transfer cost. Skipped entirely
    /// when cash is short.
    pub fn transfer_to(&mut self, other: &mut Portfolio, amount: f64) -> bool {
        if amount <= 0.0 || self.cash < amount {
            info!("transfer of {} skipped: cash {}", amount, self.cash);
            return false;
        }
        let cost = self.config.transfer_cost.min(amount);
        self.cash -= amount;
        self.accumulated_costs += cost;
        other.cash += amount - cost;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candlestick::Candlestick;
    use approx::assert_relative_eq;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn instant(d: u32, quotes: Vec<Quote>) -> InstantQuotes {
        InstantQuotes::with_quotes(day(d), quotes)
    }

    fn make_portfolio(cash: f64, settlement_days: u32) -> Portfolio {
        Portfolio::new(PortfolioConfig {
            cash,
            settlement_days,
            ..Default::default()
        })
    }

    #[test]
    fn new_portfolio() {
        let portfolio = make_portfolio(1000.0, 0);
        assert_eq!(portfolio.cash, 1000.0);
        assert_eq!(portfolio.nav(), 1000.0);
        assert!(portfolio.positions.is_empty());
        assert!(portfolio.instant().is_none());
    }

    #[test]
    fn immediate_order_fills_at_close() {
        let mut portfolio = make_portfolio(1000.0, 0);
        portfolio.process_quotes(&instant(1, vec![Quote::from_close("XX", 10.0)]));
        portfolio.order("XX", 100.0);
        assert_eq!(portfolio.parts("XX"), 100.0);
        assert_eq!(portfolio.cash, 0.0);
        assert_eq!(portfolio.nav(), 1000.0);
    }

    #[test]
    fn order_without_quote_queues_until_next_instant() {
        let mut portfolio = make_portfolio(1000.0, 0);
        portfolio.process_quotes(&instant(1, vec![]));
        portfolio.order("XX", 10.0);
        assert!(portfolio.has_pending_order("XX"));

        let quote = Quote::new("XX", Candlestick::new(Some(9.0), None, None, 10.0));
        portfolio.process_quotes(&instant(2, vec![quote]));
        assert!(!portfolio.has_pending_order("XX"));
        assert_eq!(portfolio.parts("XX"), 10.0);
        assert_relative_eq!(portfolio.cash, 910.0);
    }

    #[test]
    fn settled_buy_is_clipped_to_cash_and_remainder_discarded() {
        let mut portfolio = make_portfolio(100.0, 2);
        portfolio.process_quotes(&instant(1, vec![Quote::from_close("XX", 10.0)]));
        portfolio.order("XX", 25.0);
        assert!(portfolio.has_pending_order("XX"));

        portfolio.process_quotes(&instant(2, vec![Quote::from_close("XX", 10.0)]));
        assert_eq!(portfolio.parts("XX"), 0.0);

        let quote = Quote::new("XX", Candlestick::new(Some(20.0), None, None, 10.0));
        portfolio.process_quotes(&instant(3, vec![quote]));
        // 100 cash covers 5 parts at the 20 open; the other 20 are not retried.
        assert_eq!(portfolio.parts("XX"), 5.0);
        assert_relative_eq!(portfolio.cash, 0.0);
        assert!(!portfolio.has_pending_order("XX"));
        assert_eq!(portfolio.fills().len(), 1);
        assert_eq!(portfolio.fills()[0].parts, 5.0);

        portfolio.process_quotes(&instant(4, vec![Quote::from_close("XX", 1.0)]));
        assert_eq!(portfolio.parts("XX"), 5.0);
        assert_eq!(portfolio.fills().len(), 1);
    }

    #[test]
    fn due_order_without_quote_is_dropped() {
        let mut portfolio = make_portfolio(1000.0, 1);
        portfolio.process_quotes(&instant(1, vec![Quote::from_close("XX", 10.0)]));
        portfolio.order("XX", 10.0);
        portfolio.process_quotes(&instant(2, vec![Quote::from_close("YY", 10.0)]));
        assert!(portfolio.pending_orders().is_empty());
        assert_eq!(portfolio.parts("XX"), 0.0);
        assert_eq!(portfolio.cash, 1000.0);
    }

    #[test]
    fn sell_order_clipped_at_placement() {
        let mut portfolio = make_portfolio(100.0, 0);
        portfolio.process_quotes(&instant(1, vec![Quote::from_close("XX", 10.0)]));
        portfolio.order("XX", -5.0);
        assert!(portfolio.fills().is_empty());
        assert!(portfolio.pending_orders().is_empty());
    }

    #[test]
    fn percentage_dividend_credits_share_of_value() {
        let mut portfolio = make_portfolio(1000.0, 0);
        portfolio.process_quotes(&instant(1, vec![Quote::from_close("XX", 10.0)]));
        portfolio.order("XX", 50.0);
        portfolio.process_quotes(&instant(2, vec![Quote::from_close("XX", 10.0).with_dividend(2.0)]));
        // 2% of 500
        assert_relative_eq!(portfolio.cash, 510.0);
    }

    #[test]
    fn per_part_dividend_credits_amount_per_part() {
        let mut portfolio = Portfolio::new(PortfolioConfig {
            cash: 1000.0,
            dividend_mode: DividendMode::PerPart,
            ..Default::default()
        });
        portfolio.process_quotes(&instant(1, vec![Quote::from_close("XX", 10.0)]));
        portfolio.order("XX", 50.0);
        portfolio.process_quotes(&instant(2, vec![Quote::from_close("XX", 10.0).with_dividend(0.5)]));
        assert_relative_eq!(portfolio.cash, 525.0);
    }

    #[test]
    fn sells_execute_before_buys() {
        let mut portfolio = make_portfolio(0.0, 1);
        let mut pos = Position::new("XX", Candlestick::from_close(10.0));
        pos.parts = 10.0;
        portfolio.positions.insert("XX".into(), pos);

        portfolio.process_quotes(&instant(1, vec![]));
        portfolio.order("YY", 5.0);
        portfolio.order("XX", -10.0);
        portfolio.process_quotes(&instant(
            2,
            vec![Quote::from_close("XX", 10.0), Quote::from_close("YY", 20.0)],
        ));
        assert_eq!(portfolio.parts("XX"), 0.0);
        assert_eq!(portfolio.parts("YY"), 5.0);
        assert_relative_eq!(portfolio.cash, 0.0);
    }

    #[test]
    fn withdraw_requires_cash() {
        let mut portfolio = make_portfolio(100.0, 0);
        assert!(!portfolio.withdraw(150.0));
        assert!(portfolio.withdraw(40.0));
        assert_eq!(portfolio.cash, 60.0);
        assert_eq!(portfolio.total_withdrawn, 40.0);
    }

    #[test]
    fn transfer_deducts_cost_or_skips() {
        let mut from = Portfolio::new(PortfolioConfig {
            cash: 100.0,
            transfer_cost: 2.0,
            ..Default::default()
        });
        let mut to = make_portfolio(0.0, 0);
        assert!(from.transfer_to(&mut to, 50.0));
        assert_eq!(from.cash, 50.0);
        assert_eq!(to.cash, 48.0);
        assert!(!from.transfer_to(&mut to, 60.0));
        assert_eq!(from.cash, 50.0);
        assert_eq!(to.cash, 48.0);
    }

    #[test]
    fn dividend_mode_parses() {
        assert_eq!("percentage".parse::<DividendMode>(), Ok(DividendMode::Percentage));
        assert_eq!("per_part".parse::<DividendMode>(), Ok(DividendMode::PerPart));
        assert!("bogus".parse::<DividendMode>().is_err());
    }
}
