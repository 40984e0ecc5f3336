//! Agent state and behavior.
//!
//! One `Agent` type covers every species. The species only contributes a
//! [`SpeciesProfile`]; the feeding shape is picked from its
//! [`FeedingStrategy`].
//!
//! Lock order: an agent may lock itself and then a cell, never the reverse,
//! and never two agents at once.

use crate::cell::Cell;
use crate::grid::Grid;
use island_core::{
    AgentId, Direction, FeedingStrategy, Position, Result, Species, SpeciesProfile, SpeciesTable,
};
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;

/// Mutable part of an agent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentState {
    pub position: Position,
    pub hunger: f64,
    pub alive: bool,
}

/// What a single `feed` call achieved
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedOutcome {
    /// Plant biomass eaten
    pub grazed: f64,
    /// Species of every prey killed
    pub kills: Vec<Species>,
}

impl FeedOutcome {
    pub fn ate(&self) -> bool {
        self.grazed > 0.0 || !self.kills.is_empty()
    }
}

/// A single animal on the island
#[derive(Debug)]
pub struct Agent {
    id: AgentId,
    species: Species,
    profile: Arc<SpeciesProfile>,
    state: Mutex<AgentState>,
}

impl Agent {
    pub fn new(species: Species, profile: Arc<SpeciesProfile>, position: Position) -> Arc<Self> {
        Arc::new(Self {
            id: AgentId::new(),
            species,
            profile,
            state: Mutex::new(AgentState {
                position,
                hunger: 0.0,
                alive: true,
            }),
        })
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn species(&self) -> Species {
        self.species
    }

    pub fn profile(&self) -> &SpeciesProfile {
        &self.profile
    }

    pub fn state(&self) -> AgentState {
        *self.state.lock()
    }

    pub fn position(&self) -> Position {
        self.state.lock().position
    }

    pub fn hunger(&self) -> f64 {
        self.state.lock().hunger
    }

    pub fn set_hunger(&self, hunger: f64) {
        self.state.lock().hunger = hunger.max(0.0);
    }

    pub fn is_alive(&self) -> bool {
        self.state.lock().alive
    }

    /// Place a fresh agent into `cell`, adopting its position on success.
    pub fn settle_into(self: &Arc<Self>, cell: &Cell) -> bool {
        let mut state = self.state.lock();
        if !state.alive || !cell.add_agent(self) {
            return false;
        }
        state.position = cell.position();
        true
    }

    /// Kill this agent and take it off the grid.
    ///
    /// Returns true only for the call that actually performed the kill, so
    /// starvation and predation racing on the same agent are both safe.
    pub fn die(&self, grid: &Grid) -> bool {
        let mut state = self.state.lock();
        self.die_locked(&mut state, grid)
    }

    /// Kill this agent only if it is still standing in `cell`.
    ///
    /// Used by hunters working from an earlier copy of the cell's occupants.
    /// While this agent's lock is held, its position names the cell that
    /// holds it.
    pub fn die_in(&self, cell: &Cell) -> bool {
        let mut state = self.state.lock();
        if !state.alive || state.position != cell.position() {
            return false;
        }
        if !cell.remove_agent(self) {
            return false;
        }
        state.alive = false;
        true
    }

    fn die_locked(&self, state: &mut AgentState, grid: &Grid) -> bool {
        if !state.alive {
            return false;
        }
        state.alive = false;
        if let Some(cell) = grid.cell_at(state.position) {
            cell.remove_agent(self);
        }
        true
    }

    /// Jump `speed` cells in a random cardinal direction.
    pub fn move_randomly<R: Rng + ?Sized>(
        self: &Arc<Self>,
        grid: &Grid,
        rng: &mut R,
    ) -> Option<Position> {
        let direction = Direction::random(rng);
        self.move_toward(grid, direction)
    }

    /// Jump `speed` cells toward `direction`, clamped at the grid edge.
    ///
    /// Returns the new position, or `None` when the agent stayed put (dead,
    /// clamped back onto its own cell, or destination full).
    pub fn move_toward(self: &Arc<Self>, grid: &Grid, direction: Direction) -> Option<Position> {
        let mut state = self.state.lock();
        if !state.alive {
            return None;
        }

        let (dx, dy) = direction.scaled(self.profile.speed);
        let target = grid.clamp(state.position.add(dx, dy));
        if target == state.position {
            return None;
        }

        if grid.transfer(self, state.position, target) {
            state.position = target;
            Some(target)
        } else {
            None
        }
    }

    /// Try to eat in `cell`. Does nothing while sated or dead.
    pub fn feed<R: Rng + ?Sized>(&self, cell: &Cell, rng: &mut R) -> FeedOutcome {
        let mut outcome = FeedOutcome::default();

        match &self.profile.feeding {
            FeedingStrategy::Herbivore => {
                outcome.grazed = self.graze(cell, rng);
            }
            FeedingStrategy::Carnivore => {
                outcome.kills = self.hunt(cell, rng, None);
            }
            FeedingStrategy::Omnivore { prey } => {
                outcome.grazed = self.graze(cell, rng);
                outcome.kills = self.hunt(cell, rng, Some(prey.as_slice()));
            }
        }

        outcome
    }

    fn hunger_factor(&self, hunger: f64) -> f64 {
        if self.profile.max_hunger > 0.0 {
            hunger / self.profile.max_hunger
        } else {
            1.0
        }
    }

    fn graze<R: Rng + ?Sized>(&self, cell: &Cell, rng: &mut R) -> f64 {
        let mut state = self.state.lock();
        if !state.alive || state.hunger <= 0.0 || !cell.has_plant() {
            return 0.0;
        }

        // hungrier animals try harder and eat more
        let boost = 1.0 + self.hunger_factor(state.hunger);
        let probability = (self.profile.diet.plant_probability() * boost).min(1.0);
        if rng.gen::<f64>() >= probability {
            return 0.0;
        }

        let eaten = cell.consume_plant(self.profile.needed_food * boost);
        state.hunger = (state.hunger - eaten).max(0.0);
        eaten
    }

    fn hunt<R: Rng + ?Sized>(
        &self,
        cell: &Cell,
        rng: &mut R,
        allowed: Option<&[Species]>,
    ) -> Vec<Species> {
        let mut kills = Vec::new();
        {
            let state = self.state.lock();
            if !state.alive || state.hunger <= 0.0 {
                return kills;
            }
        }

        for prey in cell.agents() {
            if prey.id == self.id || prey.species == self.species {
                continue;
            }
            if allowed.is_some_and(|allowed| !allowed.contains(&prey.species)) {
                continue;
            }

            let probability = self.profile.diet.probability_for(prey.species);
            if probability <= 0.0 || rng.gen::<f64>() >= probability {
                continue;
            }

            // our own lock is released here; killing takes the prey's lock
            if !prey.die_in(cell) {
                continue;
            }
            kills.push(prey.species);

            let mut state = self.state.lock();
            state.hunger = (state.hunger - self.profile.needed_food).max(0.0);
            if state.hunger <= 0.0 || !state.alive {
                break;
            }
        }

        kills
    }

    /// Produce one offspring in `cell` with a partner of the same species.
    ///
    /// The capacity check is advisory; if the slot is taken before the insert
    /// the offspring is discarded.
    pub fn reproduce(&self, partner: &Agent, cell: &Cell) -> Option<Arc<Agent>> {
        if partner.species != self.species || partner.id == self.id {
            return None;
        }
        if !self.is_alive() || !cell.has_space_for(self) {
            return None;
        }

        let offspring = Agent::new(self.species, Arc::clone(&self.profile), cell.position());
        if cell.add_agent(&offspring) {
            Some(offspring)
        } else {
            None
        }
    }

    /// Add one turn of hunger and starve if it reaches the species maximum.
    ///
    /// Returns true if the agent died of hunger in this call.
    pub fn metabolize(&self, grid: &Grid, increment: f64) -> bool {
        let mut state = self.state.lock();
        if !state.alive {
            return false;
        }
        state.hunger += increment;
        if state.hunger >= self.profile.max_hunger {
            return self.die_locked(&mut state, grid);
        }
        false
    }
}

/// Builds agents from shared, immutable profiles
#[derive(Debug, Clone)]
pub struct AgentFactory {
    profiles: HashMap<Species, Arc<SpeciesProfile>>,
}

impl AgentFactory {
    pub fn from_table(table: &SpeciesTable) -> Self {
        let profiles = table
            .iter()
            .map(|(species, profile)| (species, Arc::new(profile.clone())))
            .collect();
        Self { profiles }
    }

    pub fn profile(&self, species: Species) -> Result<Arc<SpeciesProfile>> {
        self.profiles
            .get(&species)
            .cloned()
            .ok_or(island_core::Error::MissingProfile(species))
    }

    /// Create a living agent of `species`. Fails for species without a profile.
    pub fn spawn(&self, species: Species, position: Position) -> Result<Arc<Agent>> {
        Ok(Agent::new(species, self.profile(species)?, position))
    }
}
