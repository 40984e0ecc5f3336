//! Read-only snapshots of the island and where they go.

use crate::grid::Grid;
use island_core::Species;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Shown for a cell with no animals but a living plant
pub const PLANT_GLYPH: &str = "🌿";
/// Shown for a cell with neither animals nor plant
pub const EMPTY_GLYPH: &str = "⬜";

/// State of the island at the end of one reporting tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub turn: u64,
    pub census: BTreeMap<Species, usize>,
    pub total_agents: usize,
    pub total_biomass: f64,
    /// One glyph per cell, row by row
    pub rows: Vec<Vec<String>>,
}

impl Snapshot {
    /// Read the grid without mutating it.
    ///
    /// Each cell is surveyed under its own lock, so the result is a
    /// consistent view per cell but not across the whole grid.
    pub fn capture(grid: &Grid, turn: u64) -> Self {
        let mut census = BTreeMap::new();
        let mut total_biomass = 0.0;
        let mut rows = Vec::with_capacity(grid.height().max(0) as usize);

        for row in grid.rows() {
            let mut glyphs = Vec::with_capacity(row.len());
            for cell in row {
                let survey = cell.survey();
                for species in &survey.species {
                    *census.entry(*species).or_insert(0) += 1;
                }
                total_biomass += survey.biomass;

                let glyph = match survey.first_glyph {
                    Some(glyph) => glyph,
                    None if survey.has_plant => PLANT_GLYPH.to_string(),
                    None => EMPTY_GLYPH.to_string(),
                };
                glyphs.push(glyph);
            }
            rows.push(glyphs);
        }

        Self {
            turn,
            total_agents: census.values().sum(),
            census,
            total_biomass,
            rows,
        }
    }

    /// The glyph grid as text, one line per row
    pub fn render(&self) -> String {
        self.rows
            .iter()
            .map(|row| row.concat())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Receives one snapshot per reporting tick
pub trait Reporter: Send + Sync {
    fn report(&self, snapshot: &Snapshot);
}

/// Logs the census at `info` and the glyph grid at `debug`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, snapshot: &Snapshot) {
        let census = snapshot
            .census
            .iter()
            .map(|(species, count)| format!("{}={}", species, count))
            .collect::<Vec<_>>()
            .join(" ");
        info!(
            turn = snapshot.turn,
            agents = snapshot.total_agents,
            biomass = snapshot.total_biomass,
            "Census: {}",
            census
        );
        debug!(turn = snapshot.turn, "\n{}", snapshot.render());
    }
}

/// Keeps every snapshot in memory
#[derive(Debug, Default)]
pub struct CollectingReporter {
    snapshots: Mutex<Vec<Snapshot>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.snapshots.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.snapshots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.lock().is_empty()
    }

}

impl Reporter for CollectingReporter {
    fn report(&self, snapshot: &Snapshot) {
        self.snapshots.lock().push(snapshot.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentFactory;
    use island_core::{GridConfig, PlantConfig, Position, SpeciesTable};

    #[test]
    fn test_capture_census_and_glyphs() {
        let grid = Grid::new(&GridConfig { width: 3, height: 2 }, &PlantConfig::default());
        let factory = AgentFactory::from_table(&SpeciesTable::default());

        let wolf = factory.spawn(Species::Wolf, Position::new(0, 0)).unwrap();
        assert!(wolf.settle_into(grid.location_at(0, 0).unwrap()));
        let duck = factory.spawn(Species::Duck, Position::new(0, 0)).unwrap();
        assert!(duck.settle_into(grid.location_at(0, 0).unwrap()));
        grid.location_at(2, 1).unwrap().consume_plant(100.0);

        let snapshot = Snapshot::capture(&grid, 7);
        assert_eq!(snapshot.turn, 7);
        assert_eq!(snapshot.total_agents, 2);
        assert_eq!(snapshot.census.get(&Species::Wolf), Some(&1));
        assert_eq!(snapshot.census.get(&Species::Duck), Some(&1));
        assert_eq!(snapshot.census, grid.census());
        assert_eq!(snapshot.total_biomass, 25.0);

        assert_eq!(snapshot.rows.len(), 2);
        assert_eq!(snapshot.rows[0][0], "🐺");
        assert_eq!(snapshot.rows[0][1], PLANT_GLYPH);
        assert_eq!(snapshot.rows[1][2], EMPTY_GLYPH);
        assert_eq!(snapshot.render().lines().count(), 2);
    }

    #[test]
    fn test_capture_does_not_mutate() {
        let grid = Grid::new(&GridConfig { width: 4, height: 4 }, &PlantConfig::default());
        let factory = AgentFactory::from_table(&SpeciesTable::default());
        let goat = factory.spawn(Species::Goat, Position::new(1, 1)).unwrap();
        assert!(goat.settle_into(grid.location_at(1, 1).unwrap()));

        let before = Snapshot::capture(&grid, 0);
        let again = Snapshot::capture(&grid, 0);
        assert_eq!(before, again);
        assert!(goat.is_alive());
        assert_eq!(goat.hunger(), 0.0);
    }

    #[test]
    fn test_collecting_reporter_keeps_order() {
        let grid = Grid::new(&GridConfig { width: 2, height: 2 }, &PlantConfig::default());
        let reporter = CollectingReporter::new();
        assert!(reporter.is_empty());

        for turn in 0..3 {
            reporter.report(&Snapshot::capture(&grid, turn));
        }
        TracingReporter.report(&Snapshot::capture(&grid, 3));

        let turns: Vec<_> = reporter.snapshots().iter().map(|s| s.turn).collect();
        assert_eq!(turns, vec![0, 1, 2]);
        assert_eq!(reporter.len(), 3);
    }
}
