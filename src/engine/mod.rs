//! Race Engine Module
//!
//! Simulates multi-stage car races tick by tick. Rendering, audio and
//! commentary live outside and follow the race through listeners.

pub mod car;
pub mod error;
pub mod events;
pub mod physics;
pub mod presets;
pub mod race;
pub mod save;
pub mod simulation;
pub mod stage;

pub use car::{Car, CarSnapshot, CarStanding};
pub use error::RaceError;
pub use events::{EventBus, EventRecorder, LogListener, RaceEvent, RaceListener, TickSample};
pub use physics::Physics;
pub use presets::Difficulty;
pub use race::{Leaderboard, RaceState, RaceSummary, StageResult};
pub use save::{SaveState, SAVE_VERSION};
pub use simulation::{EngineConfig, EnginePhase, EngineStats, RaceEngine, RaceSnapshot, TickStatus};
pub use stage::{Stage, StageRunner, StageStatus};
