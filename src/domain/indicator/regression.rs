//! Moving least-squares linear regression over a trailing window of calendar
//! periods.
//!
//! Samples may be unevenly spaced; a period ends when the calendar rolls
//! over (day/week/month...), not after a fixed sample count. The line is
//! refitted on every rollover over the last `periods` completed periods and
//! only exists once that many periods have been seen.

use chrono::NaiveDate;
use std::collections::VecDeque;

use crate::domain::periodicity::Periodicity;

use super::Indicator;

/// y = intercept + slope * (days since `origin`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionLine {
    pub origin: NaiveDate,
    pub slope: f64,
    pub intercept: f64,
}

impl RegressionLine {
    pub fn at(&self, date: NaiveDate) -> f64 {
        let x = (date - self.origin).num_days() as f64;
        self.intercept + self.slope * x
    }
}

#[derive(Debug, Clone)]
struct PeriodSamples {
    key: (i32, u32),
    samples: Vec<(NaiveDate, f64)>,
}

#[derive(Debug, Clone)]
pub struct MovingLinearRegression {
    periodicity: Periodicity,
    periods: usize,
    completed: VecDeque<PeriodSamples>,
    current: Option<PeriodSamples>,
    line: Option<RegressionLine>,
    last_date: Option<NaiveDate>,
}

impl MovingLinearRegression {
    pub fn new(periodicity: Periodicity, periods: usize) -> Self {
        MovingLinearRegression {
            periodicity,
            periods: periods.max(1),
            completed: VecDeque::new(),
            current: None,
            line: None,
            last_date: None,
        }
    }

    pub fn line(&self) -> Option<RegressionLine> {
        self.line
    }

    fn roll(&mut self, key: (i32, u32)) {
        if let Some(done) = self.current.take() {
            self.completed.push_back(done);
            while self.completed.len() > self.periods {
                self.completed.pop_front();
            }
            if self.completed.len() == self.periods {
                self.line = fit(self.completed.iter().flat_map(|p| p.samples.iter()));
            }
        }
        self.current = Some(PeriodSamples {
            key,
            samples: Vec::new(),
        });
    }
}

fn fit<'a>(samples: impl Iterator<Item = &'a (NaiveDate, f64)> + Clone) -> Option<RegressionLine> {
    let origin = samples.clone().next()?.0;
    let (mut n, mut sx, mut sy, mut sxx, mut sxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for (date, y) in samples {
        let x = (*date - origin).num_days() as f64;
        n += 1.0;
        sx += x;
        sy += y;
        sxx += x * x;
        sxy += x * y;
    }
    let denominator = n * sxx - sx * sx;
    let slope = if denominator == 0.0 {
        0.0
    } else {
        (n * sxy - sx * sy) / denominator
    };
    Some(RegressionLine {
        origin,
        slope,
        intercept: (sy - slope * sx) / n,
    })
}

impl Indicator for MovingLinearRegression {
    type Input = (NaiveDate, f64);

    fn update(&mut self, input: &(NaiveDate, f64)) -> Option<f64> {
        let (date, value) = *input;
        let key = self.periodicity.period_key(date);
        if self.current.as_ref().is_none_or(|p| p.key != key) {
            self.roll(key);
        }
        if let Some(current) = self.current.as_mut() {
            current.samples.push((date, value));
        }
        self.last_date = Some(date);
        self.value()
    }

    /// Fitted value at the latest sample date.
    fn value(&self) -> Option<f64> {
        let line = self.line?;
        Some(line.at(self.last_date?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    #[test]
    fn no_line_until_window_of_periods_completes() {
        let mut reg = MovingLinearRegression::new(Periodicity::Monthly, 2);
        assert!(reg.update(&(d(1, 5), 1.0)).is_none());
        assert!(reg.update(&(d(1, 20), 2.0)).is_none());
        assert!(reg.update(&(d(2, 3), 3.0)).is_none());
        // March opens: January and February are complete.
        assert!(reg.update(&(d(3, 1), 4.0)).is_some());
    }

    #[test]
    fn perfect_line_is_recovered() {
        let mut reg = MovingLinearRegression::new(Periodicity::Daily, 5);
        for day in 1..=6 {
            reg.update(&(d(1, day), 10.0 + 2.0 * day as f64));
        }
        let line = reg.line().unwrap();
        assert_relative_eq!(line.slope, 2.0, epsilon = 1e-9);
        assert_relative_eq!(line.at(d(1, 6)), 22.0, epsilon = 1e-9);
    }

    #[test]
    fn uneven_spacing_uses_calendar_days() {
        let mut reg = MovingLinearRegression::new(Periodicity::Weekly, 2);
        // Mon/Wed of week 1 and Tue of week 2, y = day of month.
        reg.update(&(d(1, 1), 1.0));
        reg.update(&(d(1, 3), 3.0));
        reg.update(&(d(1, 9), 9.0));
        reg.update(&(d(1, 15), 15.0));
        let line = reg.line().unwrap();
        assert_relative_eq!(line.slope, 1.0, epsilon = 1e-9);
        assert_eq!(line.origin, d(1, 1));
    }

    #[test]
    fn window_drops_old_periods() {
        let mut reg = MovingLinearRegression::new(Periodicity::Daily, 2);
        reg.update(&(d(1, 1), 100.0));
        reg.update(&(d(1, 2), 0.0));
        reg.update(&(d(1, 3), 1.0));
        reg.update(&(d(1, 4), 2.0));
        let line = reg.line().unwrap();
        assert_eq!(line.origin, d(1, 2));
        assert_relative_eq!(line.slope, 1.0, epsilon = 1e-9);
    }
}
