//! Dividend enrichment of a quote timeline.
//!
//! Three sources are supported: an explicit list of payments, an adjusted
//! close series, and a total-return series. All of them write the absolute
//! amount per part into `Quote::dividend` of the instrument they enrich.

use chrono::NaiveDate;
use log::info;
use std::collections::BTreeMap;

use super::historical_quotes::HistoricalQuotes;

/// Fractions of price at or below 0.2% after rounding are treated as
/// floating noise in adjusted close data.
const ADJUSTED_NOISE_PER_MILLE: f64 = 2.0;

/// Precision kept on cumulative total-return dividends.
const TOTAL_RETURN_SCALE: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dividend {
    pub instant: NaiveDate,
    pub amount: f64,
}

/// Dividend enrichment configured for a run, applied once after loading.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DividendSources {
    /// Instruments whose dividends come from their adjusted close column.
    pub adjusted_close: Vec<String>,
    /// `(price instrument, total-return instrument)` pairs.
    pub total_return: Vec<(String, String)>,
    /// Explicit payments per instrument.
    pub payments: BTreeMap<String, Vec<Dividend>>,
}

impl DividendSources {
    pub fn is_empty(&self) -> bool {
        self.adjusted_close.is_empty() && self.total_return.is_empty() && self.payments.is_empty()
    }

    /// Total-return series that must be loaded next to the priced instruments.
    pub fn companion_instruments(&self) -> impl Iterator<Item = &String> {
        self.total_return.iter().map(|(_, tr)| tr)
    }

    pub fn add_payment(&mut self, name: impl Into<String>, dividend: Dividend) {
        self.payments.entry(name.into()).or_default().push(dividend);
    }

    /// Derived series first, then explicit payments on top.
    pub fn apply(&self, quotes: &mut HistoricalQuotes) {
        for name in &self.adjusted_close {
            info!("{name}: dividends derived from adjusted close");
            dividends_from_adjusted_close(quotes, name);
        }
        for (name, total_return) in &self.total_return {
            info!("{name}: dividends derived from total return {total_return}");
            dividends_from_total_return(quotes, name, total_return);
        }
        for (name, dividends) in &self.payments {
            let attributed = inject_dividends(quotes, name, dividends);
            info!("{name}: {attributed} of {} dividend payment(s) attributed", dividends.len());
        }
    }
}

/// Attributes each payment to the first quote of `name` at or after the
/// payment instant. Payments after the last quote are ignored. Returns the
/// number of payments attributed.
pub fn inject_dividends(quotes: &mut HistoricalQuotes, name: &str, dividends: &[Dividend]) -> usize {
    let mut sorted = dividends.to_vec();
    sorted.sort_by_key(|d| d.instant);

    let mut pending = sorted.iter().peekable();
    let mut attributed = 0;
    for iq in quotes.iter_mut() {
        let instant = iq.instant;
        let Some(quote) = iq.quote_mut(name) else {
            continue;
        };
        while let Some(d) = pending.next_if(|d| d.instant <= instant) {
            quote.dividend += d.amount;
            attributed += 1;
        }
        if pending.peek().is_none() {
            break;
        }
    }
    attributed
}

/// Derives dividends from the gap between unadjusted and adjusted closes of
/// consecutive quotes of `name`. Quotes without an adjusted close are left
/// untouched.
pub fn dividends_from_adjusted_close(quotes: &mut HistoricalQuotes, name: &str) {
    let mut previous: Option<(f64, f64)> = None;
    for iq in quotes.iter_mut() {
        let Some(quote) = iq.quote_mut(name) else {
            continue;
        };
        let Some(adjusted) = quote.adjusted_close else {
            continue;
        };
        let close = quote.close();
        if let Some((prev_close, prev_adjusted)) = previous {
            // A payment drops the unadjusted close further than the adjusted one.
            let dividend = (prev_close - close) - (prev_adjusted - adjusted);
            quote.dividend = if dividend <= 0.0
                || (1000.0 * dividend / close).round() <= ADJUSTED_NOISE_PER_MILLE
            {
                0.0
            } else {
                dividend
            };
        }
        previous = Some((close, adjusted));
    }
}

/// Derives dividends of `price_name` from a total-return index quoted under
/// `total_return_name`, using TR(n)/TR(n-1) = (PR(n) + D(n)) / PR(n-1).
///
/// The cumulative dividend since inception is rounded and the increment
/// against what was already distributed is booked, so rounding never
/// compounds across a long series.
pub fn dividends_from_total_return(
    quotes: &mut HistoricalQuotes,
    price_name: &str,
    total_return_name: &str,
) {
    let mut previous: Option<(f64, f64)> = None;
    let mut cumulative = 0.0;
    let mut distributed = 0.0;

    for iq in quotes.iter_mut() {
        let tr = iq.quote(total_return_name).map(|q| q.close());
        let Some(quote) = iq.quote_mut(price_name) else {
            continue;
        };
        let Some(tr) = tr else {
            continue;
        };
        let price = quote.close();
        if let Some((prev_price, prev_tr)) = previous {
            cumulative += prev_price * tr / prev_tr - price;
            let rounded = (cumulative * TOTAL_RETURN_SCALE).round() / TOTAL_RETURN_SCALE;
            let increment = rounded - distributed;
            if increment > 0.0 {
                quote.dividend = increment;
                distributed = rounded;
            } else {
                quote.dividend = 0.0;
            }
        }
        previous = Some((price, tr));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::quote::{InstantQuotes, Quote};
    use chrono::Datelike;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn dividends_of(hq: &HistoricalQuotes, name: &str) -> Vec<f64> {
        hq.series(name).map(|(_, q)| q.dividend).collect()
    }

    #[test]
    fn injection_attributes_to_next_quote() {
        let mut hq = HistoricalQuotes::from_quotes([
            (day(1, 2), Quote::from_close("XX", 10.0)),
            (day(1, 5), Quote::from_close("XX", 10.0)),
            (day(1, 9), Quote::from_close("XX", 10.0)),
        ]);
        let count = inject_dividends(
            &mut hq,
            "XX",
            &[
                Dividend { instant: day(1, 3), amount: 0.5 },
                Dividend { instant: day(1, 2), amount: 0.25 },
                Dividend { instant: day(2, 1), amount: 9.0 },
            ],
        );
        assert_eq!(count, 2);
        assert_eq!(dividends_of(&hq, "XX"), vec![0.25, 0.5, 0.0]);
    }

    #[test]
    fn injection_skips_snapshots_without_the_instrument() {
        let mut hq = HistoricalQuotes::from_quotes([
            (day(1, 2), Quote::from_close("YY", 1.0)),
            (day(1, 4), Quote::from_close("XX", 10.0)),
        ]);
        inject_dividends(&mut hq, "XX", &[Dividend { instant: day(1, 1), amount: 1.0 }]);
        assert_eq!(dividends_of(&hq, "XX"), vec![1.0]);
        assert_eq!(dividends_of(&hq, "YY"), vec![0.0]);
    }

    #[test]
    fn adjusted_close_detects_payment() {
        // 1.0 paid on the second day: adjusted history is scaled by 0.99.
        let mut hq = HistoricalQuotes::from_quotes([
            (day(1, 1), Quote::from_close("XX", 100.0).with_adjusted_close(99.0)),
            (day(1, 2), Quote::from_close("XX", 99.0).with_adjusted_close(99.0)),
            (day(1, 3), Quote::from_close("XX", 100.0).with_adjusted_close(100.0)),
        ]);
        dividends_from_adjusted_close(&mut hq, "XX");
        let divs = dividends_of(&hq, "XX");
        assert_eq!(divs[0], 0.0);
        assert!((divs[1] - 1.0).abs() < 1e-9);
        assert_eq!(divs[2], 0.0);
    }

    #[test]
    fn adjusted_close_survives_later_adjustments() {
        // 1.0 paid on day two and 0.99 on day three; earlier adjusted closes
        // carry both factors.
        let mut hq = HistoricalQuotes::from_quotes([
            (day(1, 1), Quote::from_close("XX", 100.0).with_adjusted_close(98.01)),
            (day(1, 2), Quote::from_close("XX", 99.0).with_adjusted_close(98.01)),
            (day(1, 3), Quote::from_close("XX", 98.01).with_adjusted_close(98.01)),
        ]);
        dividends_from_adjusted_close(&mut hq, "XX");
        let divs = dividends_of(&hq, "XX");
        assert_eq!(divs[0], 0.0);
        assert!((divs[1] - 1.0).abs() < 1e-9, "day two {}", divs[1]);
        assert!((divs[2] - 0.99).abs() < 1e-9, "day three {}", divs[2]);
    }

    #[test]
    fn adjusted_close_ignores_rounding_noise() {
        let mut hq = HistoricalQuotes::from_quotes([
            (day(1, 1), Quote::from_close("XX", 100.0).with_adjusted_close(99.85)),
            (day(1, 2), Quote::from_close("XX", 100.0).with_adjusted_close(100.0)),
        ]);
        dividends_from_adjusted_close(&mut hq, "XX");
        assert_eq!(dividends_of(&hq, "XX"), vec![0.0, 0.0]);
    }

    #[test]
    fn sources_apply_every_configured_enrichment() {
        let mut hq = HistoricalQuotes::from_instants([
            InstantQuotes::with_quotes(
                day(1, 1),
                [
                    Quote::from_close("AC", 100.0).with_adjusted_close(99.0),
                    Quote::from_close("PR", 100.0),
                    Quote::from_close("TR", 1000.0),
                    Quote::from_close("PAY", 10.0),
                ],
            ),
            InstantQuotes::with_quotes(
                day(1, 2),
                [
                    Quote::from_close("AC", 99.0).with_adjusted_close(99.0),
                    Quote::from_close("PR", 100.0),
                    Quote::from_close("TR", 1005.0),
                    Quote::from_close("PAY", 10.0),
                ],
            ),
        ]);
        let mut sources = DividendSources {
            adjusted_close: vec!["AC".into()],
            total_return: vec![("PR".into(), "TR".into())],
            ..Default::default()
        };
        sources.add_payment("PAY", Dividend { instant: day(1, 2), amount: 0.3 });
        assert!(!sources.is_empty());
        assert_eq!(sources.companion_instruments().collect::<Vec<_>>(), vec!["TR"]);

        sources.apply(&mut hq);

        assert!((dividends_of(&hq, "AC")[1] - 1.0).abs() < 1e-9);
        assert!((dividends_of(&hq, "PR")[1] - 0.5).abs() < 1e-9);
        assert_eq!(dividends_of(&hq, "PAY"), vec![0.0, 0.3]);
        assert!(DividendSources::default().is_empty());
    }

    #[test]
    fn total_return_accumulates_exactly_over_a_year() {
        // Flat price of 100, 0.37 paid on the first trading day of each quarter,
        // with tiny daily wiggles in between.
        let mut instants = Vec::new();
        let mut tr = 1000.0;
        let mut prev_price = 100.0;
        let mut date = day(1, 1);
        let end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let mut paid = 0;
        let mut last_quarter = 0;
        let mut n = 0;
        while date <= end {
            let quarter = (date.month() - 1) / 3;
            let price = 100.0 + if n % 2 == 0 { 0.0 } else { 0.5 };
            let dividend = if n > 0 && quarter != last_quarter {
                paid += 1;
                0.37
            } else {
                0.0
            };
            if n > 0 {
                tr *= (price + dividend) / prev_price;
            }
            instants.push(InstantQuotes::with_quotes(
                date,
                [Quote::from_close("PR", price), Quote::from_close("TR", tr)],
            ));
            last_quarter = quarter;
            prev_price = price;
            date = date.succ_opt().unwrap();
            n += 1;
        }
        let mut hq = HistoricalQuotes::from_instants(instants);

        dividends_from_total_return(&mut hq, "PR", "TR");

        let total: f64 = dividends_of(&hq, "PR").iter().sum();
        assert_eq!(paid, 3);
        assert!((total - 1.11).abs() < 1e-9, "total {total}");
        assert!(dividends_of(&hq, "TR").iter().all(|&d| d == 0.0));
    }
}
