use std::collections::BTreeMap;

use crate::models::YearContribution;

/// Fetched contribution data keyed by year.
///
/// Entries are only ever added: once a year is present it is never replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContributionCache {
    years: BTreeMap<i32, YearContribution>,
}

impl ContributionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, year: i32) -> Option<&YearContribution> {
        self.years.get(&year)
    }

    pub fn contains(&self, year: i32) -> bool {
        self.years.contains_key(&year)
    }

    /// Insert a year unless one is already cached. Returns whether it was inserted.
    pub fn insert(&mut self, contribution: YearContribution) -> bool {
        if self.years.contains_key(&contribution.year) {
            return false;
        }
        self.years.insert(contribution.year, contribution);
        true
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.years.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }
}
