//! Concurrent per-species event counters.

use dashmap::DashMap;
use island_core::{PopulationStats, Species, SpeciesCounters};
use std::collections::BTreeMap;

/// Something that happened to one agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeEvent {
    Seeded,
    Born,
    Starved,
    Eaten,
    Moved,
    Grazed,
    Killed,
}

/// Counters shared by every worker task
#[derive(Debug, Default)]
pub struct PopulationLedger {
    counters: DashMap<Species, SpeciesCounters>,
}

impl PopulationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, species: Species, event: LifeEvent) {
        self.record_many(species, event, 1);
    }

    pub fn record_many(&self, species: Species, event: LifeEvent, count: u64) {
        if count == 0 {
            return;
        }
        let mut counters = self.counters.entry(species).or_default();
        let slot = match event {
            LifeEvent::Seeded => &mut counters.seeded,
            LifeEvent::Born => &mut counters.births,
            LifeEvent::Starved => &mut counters.starvations,
            LifeEvent::Eaten => &mut counters.predations,
            LifeEvent::Moved => &mut counters.moves,
            LifeEvent::Grazed => &mut counters.grazes,
            LifeEvent::Killed => &mut counters.kills,
        };
        *slot += count;
    }

    pub fn counters(&self, species: Species) -> SpeciesCounters {
        self.counters
            .get(&species)
            .map(|entry| *entry.value())
            .unwrap_or_default()
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> PopulationStats {
        let mut stats = PopulationStats::new();
        for entry in self.counters.iter() {
            *stats.entry(*entry.key()) = *entry.value();
        }
        stats
    }
}

/// Exact number of living agents per species on the grid.
///
/// Shared by every cell and updated under the cell lock when an agent enters
/// the grid or is removed from it. Moves between cells leave it untouched,
/// so unlike a cell-by-cell scan it never misses an agent in transit.
#[derive(Debug, Default)]
pub struct Headcount {
    living: DashMap<Species, usize>,
}

impl Headcount {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn admit(&self, species: Species) {
        *self.living.entry(species).or_default() += 1;
    }

    pub(crate) fn release(&self, species: Species) {
        if let Some(mut count) = self.living.get_mut(&species) {
            *count = count.saturating_sub(1);
        }
    }

    pub fn get(&self, species: Species) -> usize {
        self.living.get(&species).map(|count| *count).unwrap_or(0)
    }

    /// Species with at least one living member
    pub fn snapshot(&self) -> BTreeMap<Species, usize> {
        self.living
            .iter()
            .filter(|entry| *entry.value() > 0)
            .map(|entry| (*entry.key(), *entry.value()))
            .collect()
    }
}
