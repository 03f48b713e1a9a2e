//! Calendar period boundaries (day/week/month/quarter/year rollover).

use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Periodicity {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Periodicity {
    /// Key identifying the period `date` falls in; equal keys mean same period.
    pub fn period_key(&self, date: NaiveDate) -> (i32, u32) {
        match self {
            Periodicity::Daily => (date.year(), date.ordinal()),
            Periodicity::Weekly => {
                let week = date.iso_week();
                (week.year(), week.week())
            }
            Periodicity::Monthly => (date.year(), date.month()),
            Periodicity::Quarterly => (date.year(), (date.month() - 1) / 3),
            Periodicity::Yearly => (date.year(), 0),
        }
    }

    /// True when `current` lies in a later period than `previous`.
    pub fn is_new_period(&self, previous: NaiveDate, current: NaiveDate) -> bool {
        self.period_key(previous) != self.period_key(current)
    }

    /// Approximate number of periods per year, used to annualise.
    pub fn per_year(&self) -> f64 {
        match self {
            Periodicity::Daily => 252.0,
            Periodicity::Weekly => 52.0,
            Periodicity::Monthly => 12.0,
            Periodicity::Quarterly => 4.0,
            Periodicity::Yearly => 1.0,
        }
    }
}

impl fmt::Display for Periodicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Periodicity::Daily => "daily",
            Periodicity::Weekly => "weekly",
            Periodicity::Monthly => "monthly",
            Periodicity::Quarterly => "quarterly",
            Periodicity::Yearly => "yearly",
        };
        f.write_str(s)
    }
}

impl FromStr for Periodicity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "day" => Ok(Periodicity::Daily),
            "weekly" | "week" => Ok(Periodicity::Weekly),
            "monthly" | "month" => Ok(Periodicity::Monthly),
            "quarterly" | "quarter" => Ok(Periodicity::Quarterly),
            "yearly" | "year" | "annual" => Ok(Periodicity::Yearly),
            other => Err(format!("unknown periodicity '{other}'")),
        }
    }
}

/// Remembers the last instant seen and reports period rollovers.
#[derive(Debug, Clone)]
pub struct PeriodTracker {
    periodicity: Periodicity,
    last: Option<NaiveDate>,
}

impl PeriodTracker {
    pub fn new(periodicity: Periodicity) -> Self {
        PeriodTracker {
            periodicity,
            last: None,
        }
    }

    pub fn periodicity(&self) -> Periodicity {
        self.periodicity
    }

    /// Records `instant`; true when it opens a new period. The first instant
    /// ever seen opens a period.
    pub fn advance(&mut self, instant: NaiveDate) -> bool {
        let rolled = match self.last {
            None => true,
            Some(prev) => self.periodicity.is_new_period(prev, instant),
        };
        self.last = Some(instant);
        rolled
    }

    pub fn last(&self) -> Option<NaiveDate> {
        self.last
    }
}
