//! Concurrent island engine.
//!
//! A grid of independently locked cells, agents that move, eat, breed and
//! starve across them, and a turn engine that fans each turn out onto a
//! fixed-size worker pool.

pub mod agent;
pub mod cell;
pub mod engine;
pub mod grid;
pub mod ledger;
pub mod plant;
pub mod pool;
pub mod report;

pub use agent::{Agent, AgentFactory, AgentState, FeedOutcome};
pub use cell::{Cell, CellSurvey};
pub use engine::{ActionPhaseReport, EngineState, RunSummary, StopReason, TurnEngine};
pub use grid::Grid;
pub use ledger::{Headcount, LifeEvent, PopulationLedger};
pub use plant::{Plant, PLANT_PRESENCE_THRESHOLD};
pub use pool::{Job, WorkerPool};
pub use report::{CollectingReporter, Reporter, Snapshot, TracingReporter, EMPTY_GLYPH, PLANT_GLYPH};
