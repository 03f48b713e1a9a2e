//! Investible universe, fan-out assessment and target positions.
//!
//! The `QuotesAssessor` owns one `QuoteAssessor` per instrument, created
//! lazily by a factory the first time the instrument is quoted.

use std::collections::{HashMap, HashSet};
use std::fmt;

use super::assessor::QuoteAssessor;
use super::quote::InstantQuotes;

/// Set of instrument names a ranking strategy may invest in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Universe {
    names: Vec<String>,
    members: HashSet<String>,
}

impl Universe {
    pub fn new(names: Vec<String>) -> Self {
        let members = names.iter().cloned().collect();
        Universe { names, members }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.members.contains(name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn count(&self) -> usize {
        self.names.len()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in name list")]
    EmptyToken,

    #[error("duplicate name: {0}")]
    DuplicateName(String),
}

/// Parses a comma separated list of instrument names.
pub fn parse_names(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut names = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let name = token.trim();
        if name.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        if !seen.insert(name.to_string()) {
            return Err(UniverseError::DuplicateName(name.to_string()));
        }
        names.push(name.to_string());
    }

    Ok(names)
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetPosition {
    pub name: String,
    /// 0 is the most desirable.
    pub rank: usize,
    pub parts: f64,
}

/// Ranked positions to hold plus a name index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetPositions {
    ranked: Vec<TargetPosition>,
    index: HashMap<String, usize>,
}

impl TargetPositions {
    pub fn new(ranked: Vec<TargetPosition>) -> Self {
        let index = ranked
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.clone(), i))
            .collect();
        TargetPositions { ranked, index }
    }

    pub fn get(&self, name: &str) -> Option<&TargetPosition> {
        self.index.get(name).map(|&i| &self.ranked[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TargetPosition> {
        self.ranked.iter()
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}

pub type AssessorFactory = Box<dyn Fn(&str) -> Box<dyn QuoteAssessor>>;

pub struct QuotesAssessor {
    universe: Option<Universe>,
    factory: AssessorFactory,
    assessors: HashMap<String, Box<dyn QuoteAssessor>>,
    top_of_index: usize,
}

impl QuotesAssessor {
    /// Without a universe every quoted instrument is assessed.
    pub fn new(factory: AssessorFactory, universe: Option<Universe>, top_of_index: usize) -> Self {
        QuotesAssessor {
            universe,
            factory,
            assessors: HashMap::new(),
            top_of_index,
        }
    }

    pub fn top_of_index(&self) -> usize {
        self.top_of_index
    }

    pub fn assess_quotes(&mut self, quotes: &InstantQuotes) {
        for quote in quotes.quotes() {
            if self
                .universe
                .as_ref()
                .is_some_and(|u| !u.contains(&quote.name))
            {
                continue;
            }
            let factory = &self.factory;
            self.assessors
                .entry(quote.name.clone())
                .or_insert_with(|| factory(&quote.name))
                .assess(quotes.instant, quote);
        }
    }

    pub fn assessor(&self, name: &str) -> Option<&dyn QuoteAssessor> {
        self.assessors.get(name).map(|a| a.as_ref())
    }

    pub fn assessed_count(&self) -> usize {
        self.assessors.len()
    }

    /// Ranks assessed, eligible instruments and fills `top_of_index` slots
    /// from the top, skipping candidates sized to zero parts.
    pub fn target_positions(&self, nav: f64) -> TargetPositions {
        let mut candidates: Vec<&dyn QuoteAssessor> = self
            .assessors
            .values()
            .map(|a| a.as_ref())
            .filter(|a| a.is_assessed() && a.is_eligible())
            .collect();
        candidates.sort_by(|a, b| a.compare(*b));

        let ranked = candidates
            .into_iter()
            .filter_map(|a| {
                let parts = a.parts_to_buy(nav);
                (parts > 0.0).then(|| (a.name().to_string(), parts))
            })
            .take(self.top_of_index)
            .enumerate()
            .map(|(rank, (name, parts))| TargetPosition { name, rank, parts })
            .collect();

        TargetPositions::new(ranked)
    }
}

impl fmt::Debug for QuotesAssessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuotesAssessor")
            .field("universe", &self.universe)
            .field("assessors", &self.assessors.len())
            .field("top_of_index", &self.top_of_index)
            .finish()
    }
}
