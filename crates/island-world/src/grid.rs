//! Rectangular island grid.

use crate::agent::Agent;
use crate::cell::Cell;
use crate::ledger::Headcount;
use island_core::{GridConfig, PlantConfig, Position, SimulationConfig, Species};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A fixed `width x height` grid with hard edges
#[derive(Debug)]
pub struct Grid {
    width: i32,
    height: i32,
    cells: Vec<Cell>,
    headcount: Arc<Headcount>,
}

impl Grid {
    pub fn new(grid: &GridConfig, plants: &PlantConfig) -> Self {
        let width = grid.width.max(0);
        let height = grid.height.max(0);
        let headcount = Arc::new(Headcount::new());
        let cells = (0..height)
            .flat_map(|y| (0..width).map(move |x| Position::new(x, y)))
            .map(|position| Cell::new(position, plants, Arc::clone(&headcount)))
            .collect();

        Self {
            width,
            height,
            cells,
            headcount,
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(&config.grid, &config.plants)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, position: Position) -> bool {
        (0..self.width).contains(&position.x) && (0..self.height).contains(&position.y)
    }

    /// Pull `position` back onto the grid
    pub fn clamp(&self, position: Position) -> Position {
        position.clamp(self.width, self.height)
    }

    pub fn index_of(&self, position: Position) -> Option<usize> {
        if !self.contains(position) {
            return None;
        }
        Some((position.y * self.width + position.x) as usize)
    }

    /// Cell at `position`, or `None` when it lies off the grid
    pub fn cell_at(&self, position: Position) -> Option<&Cell> {
        self.index_of(position).map(|index| &self.cells[index])
    }

    pub fn location_at(&self, x: i32, y: i32) -> Option<&Cell> {
        self.cell_at(Position::new(x, y))
    }

    /// Cells in row-major order
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> + '_ {
        self.cells.chunks(self.width.max(1) as usize)
    }

    /// Move `agent` from one cell to another as a single step.
    ///
    /// Both cells are locked in ascending index order, so concurrent transfers
    /// cannot deadlock and no observer ever sees the agent in zero or two
    /// cells. Fails without side effects when the destination is full, the
    /// agent is not in `from`, or either position is off the grid.
    pub fn transfer(&self, agent: &Arc<Agent>, from: Position, to: Position) -> bool {
        let (Some(src), Some(dst)) = (self.index_of(from), self.index_of(to)) else {
            return false;
        };
        if src == dst {
            return self.cells[src].contains(agent);
        }

        let (low, high) = if src < dst { (src, dst) } else { (dst, src) };
        let mut low_state = self.cells[low].lock_state();
        let mut high_state = self.cells[high].lock_state();
        let (source, destination) = if src < dst {
            (&mut low_state, &mut high_state)
        } else {
            (&mut high_state, &mut low_state)
        };

        if !source.contains(agent.id()) || !destination.has_room_for(agent) {
            return false;
        }
        source.remove(agent.id());
        destination.insert(agent)
    }

    /// One growth tick for every plant. Returns the total biomass added.
    pub fn grow_plants(&self) -> f64 {
        self.cells.iter().map(Cell::grow_plant).sum()
    }

    pub fn total_biomass(&self) -> f64 {
        self.cells.iter().map(Cell::plant_biomass).sum()
    }

    /// Occupants summed cell by cell. Exact only while nothing is moving;
    /// use [`Grid::population`] for counts that must hold during a turn.
    pub fn total_agents(&self) -> usize {
        self.cells.iter().map(Cell::total_agents).sum()
    }

    /// Occupants of every cell, row by row
    pub fn agents(&self) -> Vec<Arc<Agent>> {
        self.cells.iter().flat_map(Cell::agents).collect()
    }

    /// Living members of `species` on the grid.
    ///
    /// Read from the shared headcount rather than the cells, so an agent in
    /// the middle of a transfer is still counted.
    pub fn population(&self, species: Species) -> usize {
        self.headcount.get(species)
    }

    /// Living population of every species with at least one member
    pub fn census(&self) -> BTreeMap<Species, usize> {
        self.headcount.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentFactory;
    use island_core::{Direction, SpeciesTable};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;
    use std::thread;

    fn grid(width: i32, height: i32) -> Grid {
        Grid::new(&GridConfig { width, height }, &PlantConfig::default())
    }

    fn factory() -> AgentFactory {
        AgentFactory::from_table(&SpeciesTable::default())
    }

    #[test]
    fn test_grid_creation() {
        let grid = grid(10, 10);
        assert_eq!(grid.width(), 10);
        assert_eq!(grid.height(), 10);
        assert_eq!(grid.len(), 100);
        assert_eq!(grid.total_agents(), 0);
        assert_eq!(grid.total_biomass(), 500.0);
        assert_eq!(grid.rows().count(), 10);
    }

    #[test]
    fn test_cells_know_their_position() {
        let grid = grid(4, 3);
        for (index, cell) in grid.cells().iter().enumerate() {
            assert_eq!(grid.index_of(cell.position()), Some(index));
        }
        let corner = grid.location_at(3, 2).unwrap();
        assert_eq!(corner.position(), Position::new(3, 2));
    }

    #[test]
    fn test_out_of_bounds_is_absent() {
        let grid = grid(10, 10);
        assert!(grid.cell_at(Position::new(-1, 0)).is_none());
        assert!(grid.cell_at(Position::new(0, 10)).is_none());
        assert!(grid.location_at(10, 3).is_none());
        assert_eq!(grid.clamp(Position::new(12, -3)), Position::new(9, 0));
    }

    #[test]
    fn test_grow_plants_touches_every_cell() {
        let grid = grid(3, 3);
        let added = grid.grow_plants();
        assert_eq!(added, 4.5);
        assert!(grid.cells().iter().all(|c| c.plant_biomass() == 5.5));
    }

    #[test]
    fn test_transfer_moves_exactly_once() {
        let grid = grid(5, 5);
        let wolf = factory().spawn(Species::Wolf, Position::new(4, 4)).unwrap();
        assert!(wolf.settle_into(grid.cell_at(Position::new(4, 4)).unwrap()));

        let (from, to) = (Position::new(4, 4), Position::new(1, 4));
        assert!(grid.transfer(&wolf, from, to));
        assert!(!grid.location_at(4, 4).unwrap().contains(&wolf));
        assert!(grid.location_at(1, 4).unwrap().contains(&wolf));

        // the agent is no longer in the source, so a stale transfer fails
        assert!(!grid.transfer(&wolf, from, Position::new(0, 0)));
        assert_eq!(grid.total_agents(), 1);
    }

    #[test]
    fn test_transfer_into_full_cell_fails() {
        let grid = grid(3, 1);
        let factory = factory();
        for _ in 0..2 {
            let eagle = factory.spawn(Species::Eagle, Position::new(0, 0)).unwrap();
            assert!(eagle.settle_into(grid.location_at(0, 0).unwrap()));
        }
        let eagle = factory.spawn(Species::Eagle, Position::new(2, 0)).unwrap();
        assert!(eagle.settle_into(grid.location_at(2, 0).unwrap()));

        let (from, to) = (Position::new(2, 0), Position::new(0, 0));
        assert!(!grid.transfer(&eagle, from, to));
        assert!(grid.location_at(2, 0).unwrap().contains(&eagle));
        let crowded = grid.location_at(0, 0).unwrap();
        assert_eq!(crowded.count_of_species(Species::Eagle), 2);
    }

    #[test]
    fn test_census_counts_species() {
        let grid = grid(4, 4);
        let factory = factory();
        for (species, x) in [(Species::Wolf, 0), (Species::Wolf, 1), (Species::Duck, 2)] {
            let agent = factory.spawn(species, Position::new(x, 0)).unwrap();
            assert!(agent.settle_into(grid.location_at(x, 0).unwrap()));
        }

        let census = grid.census();
        assert_eq!(census.get(&Species::Wolf), Some(&2));
        assert_eq!(census.get(&Species::Duck), Some(&1));
        assert_eq!(census.get(&Species::Bear), None);
        assert_eq!(grid.population(Species::Wolf), 2);

        let duck = grid.location_at(2, 0).unwrap().first_agent().unwrap();
        assert!(duck.die(&grid));
        assert_eq!(grid.population(Species::Duck), 0);
        assert!(!grid.census().contains_key(&Species::Duck));
    }

    #[test]
    fn test_population_counts_a_lone_agent_while_it_moves() {
        let grid = Arc::new(grid(4, 1));
        let wolf = factory().spawn(Species::Wolf, Position::new(0, 0)).unwrap();
        assert!(wolf.settle_into(grid.location_at(0, 0).unwrap()));

        let mover = {
            let grid = Arc::clone(&grid);
            let wolf = Arc::clone(&wolf);
            thread::spawn(move || {
                // speed 3 on a 4-wide grid: every jump crosses the whole row
                let jumps = [Direction::East, Direction::West].into_iter().cycle();
                for direction in jumps.take(50_000) {
                    assert!(wolf.move_toward(&grid, direction).is_some());
                }
            })
        };

        loop {
            let done = mover.is_finished();
            assert_eq!(grid.population(Species::Wolf), 1);
            assert_eq!(grid.census().get(&Species::Wolf), Some(&1));
            if done {
                break;
            }
        }
        mover.join().unwrap();

        assert_eq!(grid.total_agents(), 1);
        assert!(grid.cell_at(wolf.position()).unwrap().contains(&wolf));
    }

    #[test]
    fn test_concurrent_moves_never_duplicate_or_lose_agents() {
        let grid = Arc::new(grid(6, 6));
        let factory = factory();
        let mut agents = Vec::new();
        for (i, species) in [Species::Rabbit, Species::Fox, Species::Wolf, Species::Goat]
            .into_iter()
            .cycle()
            .take(24)
            .enumerate()
        {
            let position = Position::new((i % 6) as i32, (i / 6) as i32);
            let agent = factory.spawn(species, position).unwrap();
            if agent.settle_into(grid.cell_at(position).unwrap()) {
                agents.push(agent);
            }
        }
        let placed = agents.len();

        let handles: Vec<_> = agents
            .iter()
            .cloned()
            .enumerate()
            .map(|(seed, agent)| {
                let grid = Arc::clone(&grid);
                thread::spawn(move || {
                    let mut rng = ChaCha8Rng::seed_from_u64(seed as u64);
                    for _ in 0..200 {
                        agent.move_randomly(&grid, &mut rng);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(grid.total_agents(), placed);
        let mut seen = HashSet::new();
        for cell in grid.cells() {
            for agent in cell.agents() {
                assert!(seen.insert(agent.id()), "agent {} found twice", agent.id());
                assert_eq!(agent.position(), cell.position());
            }
        }
        for agent in &agents {
            assert!(grid.cell_at(agent.position()).unwrap().contains(agent));
        }
    }

    #[test]
    fn test_move_toward_each_direction_stays_on_grid() {
        let grid = grid(3, 3);
        let rabbit = factory().spawn(Species::Rabbit, Position::new(1, 1)).unwrap();
        assert!(rabbit.settle_into(grid.location_at(1, 1).unwrap()));

        for direction in Direction::all() {
            rabbit.move_toward(&grid, direction);
            assert!(grid.contains(rabbit.position()));
            assert_eq!(grid.total_agents(), 1);
        }
    }
}
