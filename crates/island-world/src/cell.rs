//! A single grid square: the unit of mutual exclusion.
//!
//! Everything that can change about a square (who stands on it and how much
//! plant is left) sits behind one lock per cell. Cell methods never take an
//! agent's lock; agents lock themselves first and then the cell, which keeps
//! the lock order acyclic.

use crate::agent::Agent;
use crate::ledger::Headcount;
use crate::plant::Plant;
use island_core::{AgentId, PlantConfig, Position, Species};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Contents of a cell, only reachable while holding its lock
#[derive(Debug)]
pub(crate) struct CellState {
    agents: Vec<Arc<Agent>>,
    plant: Plant,
}

impl CellState {
    pub(crate) fn count_of(&self, species: Species) -> usize {
        self.agents.iter().filter(|a| a.species() == species).count()
    }

    pub(crate) fn has_room_for(&self, agent: &Agent) -> bool {
        self.count_of(agent.species()) < agent.profile().capacity
    }

    pub(crate) fn contains(&self, id: AgentId) -> bool {
        self.agents.iter().any(|a| a.id() == id)
    }

    /// Insert if the species cap allows it and the agent is not already here.
    pub(crate) fn insert(&mut self, agent: &Arc<Agent>) -> bool {
        if self.contains(agent.id()) || !self.has_room_for(agent) {
            return false;
        }
        self.agents.push(Arc::clone(agent));
        true
    }

    pub(crate) fn remove(&mut self, id: AgentId) -> bool {
        match self.agents.iter().position(|a| a.id() == id) {
            Some(index) => {
                self.agents.remove(index);
                true
            }
            None => false,
        }
    }
}

/// Read-only view of a cell taken under a single lock acquisition
#[derive(Debug, Clone)]
pub struct CellSurvey {
    pub position: Position,
    pub species: Vec<Species>,
    pub first_glyph: Option<String>,
    pub biomass: f64,
    pub has_plant: bool,
}

/// One square of the island
#[derive(Debug)]
pub struct Cell {
    position: Position,
    state: Mutex<CellState>,
    headcount: Arc<Headcount>,
}

impl Cell {
    /// Cells of one grid share `headcount`; it changes only when an agent
    /// enters or leaves the grid through this cell.
    pub fn new(position: Position, plants: &PlantConfig, headcount: Arc<Headcount>) -> Self {
        Self {
            position,
            state: Mutex::new(CellState {
                agents: Vec::new(),
                plant: Plant::new(plants),
            }),
            headcount,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, CellState> {
        self.state.lock()
    }

    /// Add `agent` if its species is below the per-cell cap.
    ///
    /// Returns false and leaves the cell untouched when the cap is reached or
    /// the agent is already here.
    pub fn add_agent(&self, agent: &Arc<Agent>) -> bool {
        let mut state = self.state.lock();
        if !state.insert(agent) {
            return false;
        }
        self.headcount.admit(agent.species());
        true
    }

    /// Remove `agent` if present. Removing an absent agent is a no-op.
    pub fn remove_agent(&self, agent: &Agent) -> bool {
        let mut state = self.state.lock();
        if !state.remove(agent.id()) {
            return false;
        }
        self.headcount.release(agent.species());
        true
    }

    pub fn contains(&self, agent: &Agent) -> bool {
        self.state.lock().contains(agent.id())
    }

    pub fn count_of_species(&self, species: Species) -> usize {
        self.state.lock().count_of(species)
    }

    pub fn total_agents(&self) -> usize {
        self.state.lock().agents.len()
    }

    /// Advisory: a later `add_agent` can still lose the slot to another actor.
    pub fn has_space_for(&self, agent: &Agent) -> bool {
        self.state.lock().has_room_for(agent)
    }

    pub fn has_plant(&self) -> bool {
        self.state.lock().plant.is_present()
    }

    pub fn plant_biomass(&self) -> f64 {
        self.state.lock().plant.biomass()
    }

    pub fn plant(&self) -> Plant {
        self.state.lock().plant.clone()
    }

    pub fn grow_plant(&self) -> f64 {
        self.state.lock().plant.grow()
    }

    /// Graze up to `amount`; returns what was actually removed.
    pub fn consume_plant(&self, amount: f64) -> f64 {
        self.state.lock().plant.consume(amount)
    }

    /// Oldest occupant, for display
    pub fn first_agent(&self) -> Option<Arc<Agent>> {
        self.state.lock().agents.first().cloned()
    }

    /// Copy of the current occupants in insertion order
    pub fn agents(&self) -> Vec<Arc<Agent>> {
        self.state.lock().agents.clone()
    }

    /// Other occupants of the same species as `agent`
    pub fn mates_of(&self, agent: &Agent) -> Vec<Arc<Agent>> {
        self.state
            .lock()
            .agents
            .iter()
            .filter(|a| a.species() == agent.species() && a.id() != agent.id())
            .cloned()
            .collect()
    }

    pub fn survey(&self) -> CellSurvey {
        let state = self.state.lock();
        CellSurvey {
            position: self.position,
            species: state.agents.iter().map(|a| a.species()).collect(),
            first_glyph: state.agents.first().map(|a| a.profile().glyph.clone()),
            biomass: state.plant.biomass(),
            has_plant: state.plant.is_present(),
        }
    }
}
