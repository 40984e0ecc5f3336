//! Turn scheduler: seeding, the three periodic phases, and the run loop.

use crate::agent::{Agent, AgentFactory};
use crate::grid::Grid;
use crate::ledger::{LifeEvent, PopulationLedger};
use crate::pool::WorkerPool;
use crate::report::{Reporter, Snapshot};
use futures::future::join_all;
use island_core::{
    Error, OverlapPolicy, PopulationStats, Position, Result, SimulationConfig, Species,
};
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Lifecycle of one engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineState {
    Seeding,
    Running,
    Stopped,
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    MaxTurns,
    Extinction(Species),
    Cancelled,
}

/// Outcome of a finished run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub turns: u64,
    pub reason: StopReason,
    pub census: BTreeMap<Species, usize>,
    pub stats: PopulationStats,
    pub elapsed_ms: u64,
}

/// What one firing of the action phase did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionPhaseReport {
    /// Jobs handed to the pool
    pub submitted: usize,
    /// Whether every job finished within the tick period
    pub drained: bool,
    /// Set when the overlap policy skipped this firing
    pub skipped: bool,
}

/// Everything a per-agent job needs, cloned into each job
#[derive(Clone)]
struct TurnContext {
    grid: Arc<Grid>,
    ledger: Arc<PopulationLedger>,
    hunger_increment: f64,
    reproduction_chance: f64,
}

pub struct TurnEngine {
    config: Arc<SimulationConfig>,
    grid: Arc<Grid>,
    factory: AgentFactory,
    pool: WorkerPool,
    ledger: Arc<PopulationLedger>,
    reporter: Arc<dyn Reporter>,
    turn: AtomicU64,
    task_seq: AtomicU64,
    seeded: AtomicBool,
    state: Mutex<EngineState>,
}

impl TurnEngine {
    /// Validate `config`, build the grid and start the worker pool.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(config: Arc<SimulationConfig>, reporter: Arc<dyn Reporter>) -> Result<Self> {
        config.validate()?;

        let grid = Arc::new(Grid::from_config(&config));
        let factory = AgentFactory::from_table(&config.species);
        let pool = WorkerPool::new(config.engine.worker_count)?;

        info!(
            width = config.grid.width,
            height = config.grid.height,
            workers = config.engine.worker_count,
            "Engine created"
        );

        Ok(Self {
            config,
            grid,
            factory,
            pool,
            ledger: Arc::new(PopulationLedger::new()),
            reporter,
            turn: AtomicU64::new(0),
            task_seq: AtomicU64::new(0),
            seeded: AtomicBool::new(false),
            state: Mutex::new(EngineState::Seeding),
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn grid(&self) -> &Arc<Grid> {
        &self.grid
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn ledger(&self) -> &PopulationLedger {
        &self.ledger
    }

    pub fn state(&self) -> EngineState {
        *self.state.lock()
    }

    /// Reporting ticks completed so far
    pub fn turn(&self) -> u64 {
        self.turn.load(Ordering::SeqCst)
    }

    /// Place the configured initial population. Returns how many agents were placed.
    ///
    /// Each agent gets a bounded number of random placement attempts, then an
    /// exhaustive scan of the grid, so seeding terminates even on a nearly
    /// full island. Agents that fit nowhere are dropped with a warning.
    #[instrument(skip(self))]
    pub fn seed(&self) -> Result<usize> {
        if self.state() != EngineState::Seeding || self.seeded.swap(true, Ordering::SeqCst) {
            return Err(Error::InvalidState("engine has already been seeded".into()));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.engine.seed);
        let attempts = self
            .config
            .engine
            .placement_attempts
            .unwrap_or_else(|| self.config.cell_count());
        let mut placed = 0;

        for (&species, &count) in &self.config.initial_population {
            let mut placed_here = 0;
            for _ in 0..count {
                let agent = self.factory.spawn(species, Position::new(0, 0))?;
                if self.place(&agent, attempts, &mut rng) {
                    placed_here += 1;
                } else {
                    warn!(%species, "No free cell left, dropping agent");
                }
            }
            self.ledger
                .record_many(species, LifeEvent::Seeded, placed_here as u64);
            debug!(
                %species,
                requested = count,
                placed = placed_here,
                "Seeded species"
            );
            placed += placed_here;
        }

        info!(placed, "Seeding complete");
        Ok(placed)
    }

    fn place(&self, agent: &Arc<Agent>, attempts: usize, rng: &mut ChaCha8Rng) -> bool {
        for _ in 0..attempts {
            let position = Position::new(
                rng.gen_range(0..self.grid.width()),
                rng.gen_range(0..self.grid.height()),
            );
            if let Some(cell) = self.grid.cell_at(position) {
                if agent.settle_into(cell) {
                    return true;
                }
            }
        }

        self.grid
            .cells()
            .iter()
            .any(|cell| agent.settle_into(cell))
    }

    /// Growth phase: one growth step on every cell.
    pub fn grow_plants(&self) -> f64 {
        let started = Instant::now();
        let added = self.grid.grow_plants();
        debug!(
            added,
            elapsed_us = started.elapsed().as_micros() as u64,
            "Growth phase"
        );
        added
    }

    /// Action phase: one job per agent present at phase start.
    ///
    /// Waits up to one tick period for the jobs to drain. Jobs still running
    /// afterwards keep running and may overlap the next firing.
    #[instrument(skip(self), fields(turn = self.turn()))]
    pub async fn run_action_phase(&self) -> ActionPhaseReport {
        let mut report = ActionPhaseReport::default();

        if self.config.engine.overlap_policy == OverlapPolicy::Skip && !self.pool.is_idle() {
            warn!(
                pending = self.pool.in_flight(),
                "Previous action phase still draining, skipping"
            );
            report.skipped = true;
            return report;
        }

        let started = Instant::now();
        let context = TurnContext {
            grid: Arc::clone(&self.grid),
            ledger: Arc::clone(&self.ledger),
            hunger_increment: self.config.engine.hunger_increment,
            reproduction_chance: self.config.engine.reproduction_chance,
        };

        let mut seen = HashSet::new();
        let agents: Vec<_> = self
            .grid
            .agents()
            .into_iter()
            .filter(|agent| seen.insert(agent.id()))
            .collect();

        for agent in agents {
            let context = context.clone();
            let seed = self.task_seed();
            let submitted = self.pool.submit(move || {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                run_agent_turn(&context, &agent, &mut rng);
            });
            if let Err(e) = submitted {
                warn!("Could not submit agent job: {}", e);
                break;
            }
            report.submitted += 1;
        }

        match self.pool.wait_idle(self.config.engine.tick_period()).await {
            Ok(()) => report.drained = true,
            Err(e) => warn!("Action phase did not drain: {}", e),
        }

        debug!(
            submitted = report.submitted,
            drained = report.drained,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Action phase"
        );
        report
    }

    fn task_seed(&self) -> u64 {
        let seq = self.task_seq.fetch_add(1, Ordering::Relaxed);
        self.config
            .engine
            .seed
            .wrapping_add(seq.wrapping_add(1).wrapping_mul(SEED_STRIDE))
    }

    /// Reporting phase: capture the grid, hand it to the reporter and advance the turn.
    pub fn report(&self) -> Snapshot {
        let turn = self.turn.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = Snapshot::capture(&self.grid, turn);
        self.reporter.report(&snapshot);
        snapshot
    }

    /// First seeded species that has died out, if any.
    ///
    /// Reads the grid headcount, which stays exact while agents are moving.
    fn extinct_species(&self) -> Option<Species> {
        self.config
            .initial_population
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(&species, _)| species)
            .find(|&species| self.grid.population(species) == 0)
    }

    /// Species whose ledger balance disagrees with the living headcount.
    /// Only meaningful once no job is running.
    fn unbalanced_species(&self) -> Vec<Species> {
        let stats = self.ledger.snapshot();
        Species::all()
            .into_iter()
            .filter(|&species| {
                stats.get(species).net_population() != self.grid.population(species) as i64
            })
            .collect()
    }

    /// Seed if needed, then drive the three phases until a stop condition.
    ///
    /// Stops once the turn counter reaches `max_turns`, when `cancel` fires,
    /// or, with `stop_on_extinction`, when a seeded species is gone.
    #[instrument(skip(self, cancel), fields(max_turns = self.config.engine.max_turns))]
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) -> Result<RunSummary> {
        if !self.seeded.load(Ordering::SeqCst) {
            self.seed()?;
        }
        {
            let mut state = self.state.lock();
            if *state != EngineState::Seeding {
                return Err(Error::InvalidState(format!("cannot run from {:?}", *state)));
            }
            *state = EngineState::Running;
        }

        let started = Instant::now();
        let period = self.config.engine.tick_period();
        let max_turns = self.config.engine.max_turns;
        let phases = cancel.child_token();
        info!(?period, "Simulation running");

        let growth = {
            let engine = Arc::clone(&self);
            let token = phases.clone();
            tokio::spawn(async move {
                let mut ticker = interval(period);
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = ticker.tick() => {
                            engine.grow_plants();
                        }
                    }
                }
            })
        };

        let actions = {
            let engine = Arc::clone(&self);
            let token = phases.clone();
            tokio::spawn(async move {
                let mut ticker = interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = ticker.tick() => {
                            engine.run_action_phase().await;
                        }
                    }
                }
            })
        };

        let reporting = {
            let engine = Arc::clone(&self);
            let token = phases.clone();
            tokio::spawn(async move {
                let mut ticker = interval(period);
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = ticker.tick() => {
                            if engine.turn() < max_turns {
                                engine.report();
                            }
                        }
                    }
                }
            })
        };

        let mut ticker = interval(period);
        let reason = loop {
            tokio::select! {
                _ = cancel.cancelled() => break StopReason::Cancelled,
                _ = ticker.tick() => {
                    if self.turn() >= max_turns {
                        break StopReason::MaxTurns;
                    }
                    if self.config.engine.stop_on_extinction {
                        if let Some(species) = self.extinct_species() {
                            info!(%species, "Species extinct, stopping early");
                            break StopReason::Extinction(species);
                        }
                    }
                }
            }
        };

        phases.cancel();
        for result in join_all([growth, actions, reporting]).await {
            if let Err(e) = result {
                warn!("Phase task failed: {}", e);
            }
        }
        if let Err(e) = self.pool.wait_idle(period).await {
            warn!("Jobs still running at shutdown: {}", e);
        }
        self.pool.join().await;
        *self.state.lock() = EngineState::Stopped;

        for species in self.unbalanced_species() {
            warn!(
                %species,
                recorded = self.ledger.counters(species).net_population(),
                living = self.grid.population(species),
                "Ledger disagrees with living population"
            );
        }

        let summary = RunSummary {
            turns: self.turn(),
            reason,
            census: self.grid.census(),
            stats: self.ledger.snapshot(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        let totals = summary.stats.totals();
        info!(
            turns = summary.turns,
            reason = ?summary.reason,
            survivors = summary.census.values().sum::<usize>(),
            births = totals.births,
            deaths = totals.deaths(),
            "Simulation stopped"
        );
        Ok(summary)
    }
}

/// One agent's turn: feed, move, maybe reproduce, then get hungrier.
///
/// Every step is a no-op for an agent that died earlier in the phase.
fn run_agent_turn<R: Rng + ?Sized>(context: &TurnContext, agent: &Arc<Agent>, rng: &mut R) {
    if !agent.is_alive() {
        return;
    }
    let grid = &context.grid;
    let species = agent.species();

    if let Some(cell) = grid.cell_at(agent.position()) {
        let outcome = agent.feed(cell, rng);
        if outcome.grazed > 0.0 {
            context.ledger.record(species, LifeEvent::Grazed);
        }
        for prey in outcome.kills {
            context.ledger.record(species, LifeEvent::Killed);
            context.ledger.record(prey, LifeEvent::Eaten);
            debug!(predator = %species, %prey, "Predation");
        }
    }

    if let Some(to) = agent.move_randomly(grid, rng) {
        context.ledger.record(species, LifeEvent::Moved);
        trace!(agent = %agent.id(), %species, %to, "Moved");
    }

    if rng.gen::<f64>() < context.reproduction_chance {
        // the cell after moving, which other jobs may already have changed
        if let Some(cell) = grid.cell_at(agent.position()) {
            let mates = cell.mates_of(agent);
            if let Some(partner) = mates.choose(rng) {
                if let Some(child) = agent.reproduce(partner, cell) {
                    context.ledger.record(species, LifeEvent::Born);
                    debug!(%species, position = %child.position(), "Birth");
                }
            }
        }
    }

    if agent.metabolize(grid, context.hunger_increment) {
        context.ledger.record(species, LifeEvent::Starved);
        debug!(%species, "Starved");
    }
}

impl std::fmt::Debug for TurnEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnEngine")
            .field("state", &self.state())
            .field("turn", &self.turn())
            .field("pool", &self.pool)
            .finish()
    }
}
