//! Time-ordered store of instant snapshots.

use chrono::NaiveDate;
use std::cmp::Ordering;

use super::quote::{InstantQuotes, Quote};

/// Snapshots strictly ascending by instant, never two for the same instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoricalQuotes {
    instants: Vec<InstantQuotes>,
}

impl HistoricalQuotes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from snapshots in any order; snapshots sharing an
    /// instant are unioned, later ones overwriting earlier same-named quotes.
    pub fn from_instants(instants: impl IntoIterator<Item = InstantQuotes>) -> Self {
        let mut hq = Self::new();
        for iq in instants {
            hq.insert(iq);
        }
        hq
    }

    /// Builds a store from loose quotes tagged with their instant.
    pub fn from_quotes(quotes: impl IntoIterator<Item = (NaiveDate, Quote)>) -> Self {
        let mut hq = Self::new();
        for (instant, quote) in quotes {
            hq.insert(InstantQuotes::with_quotes(instant, [quote]));
        }
        hq
    }

    pub fn insert(&mut self, iq: InstantQuotes) {
        match self.position(iq.instant) {
            Ok(i) => self.instants[i].absorb(iq),
            Err(i) => self.instants.insert(i, iq),
        }
    }

    fn position(&self, instant: NaiveDate) -> Result<usize, usize> {
        self.instants.binary_search_by(|iq| iq.instant.cmp(&instant))
    }

    pub fn len(&self) -> usize {
        self.instants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instants.is_empty()
    }

    pub fn first_instant(&self) -> Option<NaiveDate> {
        self.instants.first().map(|iq| iq.instant)
    }

    pub fn last_instant(&self) -> Option<NaiveDate> {
        self.instants.last().map(|iq| iq.instant)
    }

    /// Entry at `instant`, or the nearest prior one. `None` before the first
    /// entry.
    pub fn get(&self, instant: NaiveDate) -> Option<&InstantQuotes> {
        let after = self.instants.partition_point(|iq| iq.instant <= instant);
        after.checked_sub(1).map(|i| &self.instants[i])
    }

    /// Quote for `name` as of `instant` (nearest prior snapshot).
    pub fn quote(&self, instant: NaiveDate, name: &str) -> Option<&Quote> {
        self.get(instant).and_then(|iq| iq.quote(name))
    }

    /// Lazy traversal of the entries within `[start, end]`, both inclusive.
    /// Calling again restarts the traversal.
    pub fn range(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> impl Iterator<Item = &InstantQuotes> {
        let from = start.map_or(0, |s| self.instants.partition_point(|iq| iq.instant < s));
        let to = end.map_or(self.instants.len(), |e| {
            self.instants.partition_point(|iq| iq.instant <= e)
        });
        self.instants[from..to.max(from)].iter()
    }

    pub fn for_each_date<F>(&self, mut f: F, start: Option<NaiveDate>, end: Option<NaiveDate>)
    where
        F: FnMut(&InstantQuotes),
    {
        for iq in self.range(start, end) {
            f(iq);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstantQuotes> {
        self.instants.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut InstantQuotes> {
        self.instants.iter_mut()
    }

    /// Stable two-pointer merge. Equal instants are unioned with `other`'s
    /// quotes winning on name clashes.
    pub fn merge(&self, other: &HistoricalQuotes) -> HistoricalQuotes {
        let mut merged = Vec::with_capacity(self.instants.len() + other.instants.len());
        let mut left = self.instants.iter().peekable();
        let mut right = other.instants.iter().peekable();

        loop {
            let order = match (left.peek(), right.peek()) {
                (Some(l), Some(r)) => l.instant.cmp(&r.instant),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => break,
            };
            match order {
                Ordering::Less => merged.extend(left.next().cloned()),
                Ordering::Greater => merged.extend(right.next().cloned()),
                Ordering::Equal => {
                    if let (Some(l), Some(r)) = (left.next(), right.next()) {
                        let mut both = l.clone();
                        both.absorb(r.clone());
                        merged.push(both);
                    }
                }
            }
        }

        HistoricalQuotes { instants: merged }
    }

    /// All quotes for one instrument, in time order.
    pub fn series<'a>(&'a self, name: &'a str) -> impl Iterator<Item = (NaiveDate, &'a Quote)> {
        self.instants
            .iter()
            .filter_map(move |iq| iq.quote(name).map(|q| (iq.instant, q)))
    }
}
