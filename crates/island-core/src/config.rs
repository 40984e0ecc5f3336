//! Configuration types for the simulation.

use crate::{Error, Result, Species, SpeciesTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Grid dimensions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Width of the island grid
    pub width: i32,
    /// Height of the island grid
    pub height: i32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: 10,
            height: 10,
        }
    }
}

/// Plant biomass parameters shared by every cell
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantConfig {
    /// Biomass each cell starts with
    pub initial_biomass: f64,
    /// Biomass added per growth tick
    pub growth_rate: f64,
    /// Upper bound on biomass per cell
    pub max_biomass: f64,
    /// When set, a plant grazed down to zero never grows back
    pub depletion_latch: bool,
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            initial_biomass: 5.0,
            growth_rate: 0.5,
            max_biomass: 200.0,
            depletion_latch: false,
        }
    }
}

/// What the action phase does when the previous firing is still draining
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverlapPolicy {
    /// Submit the new batch anyway; batches from consecutive ticks may interleave
    #[default]
    Allow,
    /// Skip this firing entirely
    Skip,
}

/// Scheduler and worker pool parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fixed number of workers executing agent actions
    pub worker_count: usize,
    /// Period of every phase (milliseconds)
    pub tick_period_ms: u64,
    /// Turn at which the run stops
    pub max_turns: u64,
    /// Stop early once any seeded species has no living members
    pub stop_on_extinction: bool,
    /// Hunger added to every living agent once per turn
    pub hunger_increment: f64,
    /// Chance per turn that an agent looks for a mate
    pub reproduction_chance: f64,
    pub overlap_policy: OverlapPolicy,
    /// Random placement attempts before falling back to a full scan.
    /// Defaults to the number of cells.
    pub placement_attempts: Option<usize>,
    /// Seed for every random stream in the run
    pub seed: u64,
}

impl EngineConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_count: 10,
            tick_period_ms: 1000,
            max_turns: 100,
            stop_on_extinction: false,
            hunger_increment: 0.1,
            reproduction_chance: 0.5,
            overlap_policy: OverlapPolicy::Allow,
            placement_attempts: None,
            seed: 0,
        }
    }
}

/// Full configuration for one run. Built once, then shared read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub grid: GridConfig,
    pub plants: PlantConfig,
    pub engine: EngineConfig,
    pub species: SpeciesTable,
    /// Number of agents seeded per species
    pub initial_population: BTreeMap<Species, usize>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let initial_population = [
            (Species::Wolf, 2),
            (Species::Rabbit, 4),
            (Species::Fox, 2),
            (Species::Bear, 2),
            (Species::Eagle, 2),
            (Species::Horse, 3),
            (Species::Deer, 3),
            (Species::Mouse, 5),
            (Species::Goat, 3),
            (Species::Sheep, 3),
            (Species::Boar, 2),
            (Species::Buffalo, 2),
            (Species::Duck, 4),
            (Species::Caterpillar, 6),
            (Species::Boa, 2),
        ]
        .into_iter()
        .collect();

        Self {
            grid: GridConfig::default(),
            plants: PlantConfig::default(),
            engine: EngineConfig::default(),
            species: SpeciesTable::default(),
            initial_population,
        }
    }
}

impl SimulationConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.grid.width <= 0 || self.grid.height <= 0 {
            return Err(Error::InvalidConfig(format!(
                "grid must be non-empty, got {}x{}",
                self.grid.width, self.grid.height
            )));
        }

        let plants = &self.plants;
        if plants.max_biomass < 0.0 || plants.initial_biomass < 0.0 || plants.growth_rate < 0.0 {
            return Err(Error::InvalidConfig(
                "plant biomass parameters must be non-negative".to_string(),
            ));
        }

        let engine = &self.engine;
        if engine.worker_count == 0 {
            return Err(Error::InvalidConfig("worker_count must be at least 1".to_string()));
        }
        if engine.tick_period_ms == 0 {
            return Err(Error::InvalidConfig("tick_period_ms must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&engine.reproduction_chance) {
            return Err(Error::InvalidConfig(format!(
                "reproduction_chance {} outside [0, 1]",
                engine.reproduction_chance
            )));
        }
        if engine.hunger_increment < 0.0 {
            return Err(Error::InvalidConfig("hunger_increment must be non-negative".to_string()));
        }

        self.species.validate()?;
        for species in self.initial_population.keys() {
            self.species.get(*species)?;
        }

        Ok(())
    }

    pub fn cell_count(&self) -> usize {
        (self.grid.width.max(0) as usize) * (self.grid.height.max(0) as usize)
    }
}
