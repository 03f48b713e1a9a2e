//! Order lifecycle and fills.
//!
//! An order is queued as `Pending`, counts down through `Settling` one
//! instant at a time, and is then either `Applied` against the open price of
//! its instrument or `Dropped` when that instant has no quote for it.

use chrono::NaiveDate;
use log::debug;

use super::portfolio::Portfolio;
use super::position::Position;
use super::quote::Quote;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderState {
    /// Placed on the current instant.
    Pending,
    /// Instants left before the order may execute.
    Settling(u32),
    Applied,
    Dropped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub name: String,
    /// Positive buys, negative sells. Always whole parts.
    pub parts: f64,
    pub placed: Option<NaiveDate>,
    settlement_days: u32,
    state: OrderState,
}

impl Order {
    pub fn new(name: impl Into<String>, parts: f64, settlement_days: u32, placed: Option<NaiveDate>) -> Self {
        Order {
            name: name.into(),
            parts: truncate_parts(parts),
            placed,
            settlement_days,
            state: OrderState::Pending,
        }
    }

    pub fn state(&self) -> OrderState {
        self.state
    }

    pub fn is_sell(&self) -> bool {
        self.parts < 0.0
    }

    /// Moves the order one instant closer to execution.
    pub fn tick(&mut self) {
        self.state = match self.state {
            OrderState::Pending => OrderState::Settling(self.settlement_days.saturating_sub(1)),
            OrderState::Settling(n) => OrderState::Settling(n.saturating_sub(1)),
            done => done,
        };
    }

    pub fn is_due(&self) -> bool {
        self.state == OrderState::Settling(0)
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, OrderState::Pending | OrderState::Settling(_))
    }

    pub(crate) fn mark(&mut self, state: OrderState) {
        self.state = state;
    }
}

/// A completed trade.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub instant: NaiveDate,
    pub name: String,
    pub parts: f64,
    pub price: f64,
    pub cost: f64,
}

/// Whole parts, rounded toward zero.
pub fn truncate_parts(parts: f64) -> f64 {
    if parts.is_finite() { parts.trunc() } else { 0.0 }
}

/// Spread cost of trading `parts` of `quote`: |parts * close * spread / 2|.
pub fn order_cost(quote: &Quote, parts: f64) -> f64 {
    (parts * quote.close() * quote.spread / 2.0).abs()
}

/// Most whole parts of `quote` that `cash` pays for at `price`, spread cost
/// included.
pub fn affordable_parts(cash: f64, quote: &Quote, price: f64) -> f64 {
    let unit = price + order_cost(quote, 1.0);
    if unit <= 0.0 || cash <= 0.0 {
        return 0.0;
    }
    (cash / unit).floor()
}

/// Applies `parts` of `quote` at `price` to the portfolio.
///
/// Sells are clipped to the parts held and buys to the parts the cash covers.
/// Returns `None` when nothing is left to trade after clipping.
pub fn execute_order(
    portfolio: &mut Portfolio,
    instant: NaiveDate,
    quote: &Quote,
    parts: f64,
    price: f64,
) -> Option<Fill> {
    let requested = parts;
    let parts = if requested < 0.0 {
        requested.max(-portfolio.parts(&quote.name))
    } else {
        requested.min(affordable_parts(portfolio.cash, quote, price))
    };
    if parts == 0.0 {
        debug!("{}: {} parts clipped to nothing on {}", quote.name, requested, instant);
        return None;
    }

    let cost = order_cost(quote, parts);
    portfolio.cash -= parts * price + cost;
    portfolio.accumulated_costs += cost;

    let position = portfolio
        .positions
        .entry(quote.name.clone())
        .or_insert_with(|| Position::new(quote.name.clone(), quote.candle));
    position.parts += parts;
    position.update_value(quote.candle);
    if position.is_empty() {
        portfolio.positions.remove(&quote.name);
    }

    let fill = Fill {
        instant,
        name: quote.name.clone(),
        parts,
        price,
        cost,
    };
    debug!("filled {} {} at {} (cost {})", fill.parts, fill.name, fill.price, fill.cost);
    portfolio.fills.push(fill.clone());
    Some(fill)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candlestick::Candlestick;
    use crate::domain::portfolio::PortfolioConfig;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn make_portfolio(cash: f64) -> Portfolio {
        Portfolio::new(PortfolioConfig {
            cash,
            ..Default::default()
        })
    }

    #[test]
    fn truncate_parts_toward_zero() {
        assert_eq!(truncate_parts(2.7), 2.0);
        assert_eq!(truncate_parts(-2.7), -2.0);
        assert_eq!(truncate_parts(f64::NAN), 0.0);
    }

    #[test]
    fn order_cost_is_half_spread_of_traded_value() {
        let quote = Quote::from_close("XX", 10.0).with_spread(0.02);
        assert!((order_cost(&quote, 100.0) - 10.0).abs() < 1e-12);
        assert!((order_cost(&quote, -100.0) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn order_lifecycle_counts_down() {
        let mut order = Order::new("XX", 5.9, 2, Some(date()));
        assert_eq!(order.parts, 5.0);
        assert_eq!(order.state(), OrderState::Pending);
        order.tick();
        assert_eq!(order.state(), OrderState::Settling(1));
        assert!(!order.is_due());
        order.tick();
        assert!(order.is_due());
        order.mark(OrderState::Applied);
        order.tick();
        assert_eq!(order.state(), OrderState::Applied);
        assert!(!order.is_open());
    }

    #[test]
    fn zero_settlement_is_due_on_first_tick() {
        let mut order = Order::new("XX", 1.0, 0, None);
        order.tick();
        assert!(order.is_due());
    }

    #[test]
    fn buy_debits_price_and_cost() {
        let mut portfolio = make_portfolio(1000.0);
        let quote = Quote::from_close("XX", 10.0).with_spread(0.02);
        let fill = execute_order(&mut portfolio, date(), &quote, 50.0, 10.0).unwrap();
        assert_eq!(fill.parts, 50.0);
        assert!((portfolio.cash - (1000.0 - 500.0 - 5.0)).abs() < 1e-9);
        assert!((portfolio.accumulated_costs - 5.0).abs() < 1e-9);
        assert_eq!(portfolio.parts("XX"), 50.0);
    }

    #[test]
    fn buy_clipped_to_cash() {
        let mut portfolio = make_portfolio(1000.0);
        let quote = Quote::from_close("XX", 10.0);
        let fill = execute_order(&mut portfolio, date(), &quote, 500.0, 10.0).unwrap();
        assert_eq!(fill.parts, 100.0);
        assert_eq!(portfolio.cash, 0.0);
    }

    #[test]
    fn sell_clipped_to_holdings_and_position_removed() {
        let mut portfolio = make_portfolio(0.0);
        let quote = Quote::new("XX", Candlestick::new(Some(9.0), None, None, 10.0));
        let mut pos = Position::new("XX", quote.candle);
        pos.parts = 3.0;
        portfolio.positions.insert("XX".into(), pos);

        let fill = execute_order(&mut portfolio, date(), &quote, -10.0, 9.0).unwrap();
        assert_eq!(fill.parts, -3.0);
        assert!((portfolio.cash - 27.0).abs() < 1e-12);
        assert!(portfolio.position("XX").is_none());
    }

    #[test]
    fn sell_without_holdings_is_noop() {
        let mut portfolio = make_portfolio(100.0);
        let quote = Quote::from_close("XX", 10.0);
        assert!(execute_order(&mut portfolio, date(), &quote, -1.0, 10.0).is_none());
        assert_eq!(portfolio.cash, 100.0);
        assert!(portfolio.fills().is_empty());
    }
}
