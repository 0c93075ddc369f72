//! Rally Engine - Multi-stage race simulation
//!
//! Cars race a sequence of stages under a per-tick speed, damage and tire
//! model. Stage wins accumulate on a leaderboard and the car with the most
//! wins takes the race. Hosts drive the engine tick by tick and follow the
//! race through [`RaceListener`] callbacks.

pub mod engine;

pub use engine::{
    Car, Difficulty, EngineConfig, EnginePhase, RaceEngine, RaceError, RaceEvent, RaceListener,
    RaceSnapshot, RaceSummary, SaveState, Stage, StageResult, TickStatus,
};
