//! Performance figures computed from a NAV curve.

use chrono::NaiveDate;

const DAYS_PER_YEAR: f64 = 365.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub nav: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub start_nav: f64,
    pub final_nav: f64,
    pub total_return: f64,
    /// Compound annual growth rate over the calendar span of the curve.
    pub annualized_return: f64,
    /// Largest peak-to-trough fall as a fraction of the peak.
    pub max_drawdown: f64,
    /// Longest run of consecutive points below the running peak.
    pub max_drawdown_duration: usize,
}

impl Metrics {
    pub fn compute(curve: &[EquityPoint]) -> Self {
        let (Some(first), Some(last)) = (curve.first(), curve.last()) else {
            return Metrics {
                start_nav: 0.0,
                final_nav: 0.0,
                total_return: 0.0,
                annualized_return: 0.0,
                max_drawdown: 0.0,
                max_drawdown_duration: 0,
            };
        };

        let total_return = if first.nav > 0.0 {
            last.nav / first.nav - 1.0
        } else {
            0.0
        };

        let days = (last.date - first.date).num_days();
        let annualized_return = if days > 0 && total_return > -1.0 {
            (1.0 + total_return).powf(DAYS_PER_YEAR / days as f64) - 1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = drawdown(curve);

        Metrics {
            start_nav: first.nav,
            final_nav: last.nav,
            total_return,
            annualized_return,
            max_drawdown,
            max_drawdown_duration,
        }
    }
}

fn drawdown(curve: &[EquityPoint]) -> (f64, usize) {
    let mut peak = f64::NEG_INFINITY;
    let mut deepest = 0.0_f64;
    let mut underwater = 0usize;
    let mut longest = 0usize;

    for point in curve {
        if point.nav >= peak {
            peak = point.nav;
            underwater = 0;
            continue;
        }
        underwater += 1;
        longest = longest.max(underwater);
        if peak > 0.0 {
            deepest = deepest.max((peak - point.nav) / peak);
        }
    }

    (deepest, longest)
}
