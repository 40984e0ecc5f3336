//! Population statistics tracking.

use crate::Species;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle counters for a single species
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesCounters {
    /// Agents placed during seeding
    pub seeded: u64,
    /// Offspring successfully added to a cell
    pub births: u64,
    /// Deaths from hunger
    pub starvations: u64,
    /// Deaths from being eaten
    pub predations: u64,
    /// Successful moves to another cell
    pub moves: u64,
    /// Successful grazes
    pub grazes: u64,
    /// Successful hunts
    pub kills: u64,
}

impl SpeciesCounters {
    pub fn deaths(&self) -> u64 {
        self.starvations + self.predations
    }

    /// Agents ever added minus agents that died
    pub fn net_population(&self) -> i64 {
        (self.seeded + self.births) as i64 - self.deaths() as i64
    }

    pub fn merge(&mut self, other: &SpeciesCounters) {
        self.seeded += other.seeded;
        self.births += other.births;
        self.starvations += other.starvations;
        self.predations += other.predations;
        self.moves += other.moves;
        self.grazes += other.grazes;
        self.kills += other.kills;
    }
}

/// Counters for every species seen during a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PopulationStats {
    pub species: BTreeMap<Species, SpeciesCounters>,
}

impl PopulationStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, species: Species) -> SpeciesCounters {
        self.species.get(&species).copied().unwrap_or_default()
    }

    pub fn entry(&mut self, species: Species) -> &mut SpeciesCounters {
        self.species.entry(species).or_default()
    }

    /// Sum of every species' counters
    pub fn totals(&self) -> SpeciesCounters {
        let mut totals = SpeciesCounters::default();
        for counters in self.species.values() {
            totals.merge(counters);
        }
        totals
    }
}
