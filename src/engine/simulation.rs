//! Simulation - Race engine and the host-driven tick loop
//!
//! The engine owns all race state. A host either calls [`RaceEngine::tick`]
//! at its own pace (one frame, one tick) or runs whole stages and races with
//! [`RaceEngine::run_stage`] and [`RaceEngine::run`]. Collaborators only see
//! the race through listeners and snapshots.

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::engine::car::{Car, CarSnapshot};
use crate::engine::error::RaceError;
use crate::engine::events::{EventBus, RaceListener};
use crate::engine::presets::Difficulty;
use crate::engine::race::{Leaderboard, RaceState, RaceSummary, StageResult};
use crate::engine::save::SaveState;
use crate::engine::stage::{Stage, StageRunner, StageStatus};

/// Engine lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnginePhase {
    Idle,
    Ready,
    Racing,
    Finished,
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Ticks after which a stage without a winner is abandoned
    pub max_ticks_per_stage: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_ticks_per_stage: 1_000_000,
        }
    }
}

/// Engine statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    pub phase: EnginePhase,
    pub ticks_simulated: u64,
    pub stages_completed: usize,
    pub listener_count: usize,
    pub listener_failures: u64,
}

/// Compact race view for a UI frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceSnapshot {
    pub phase: EnginePhase,
    pub stage_index: usize,
    pub stage_name: Option<String>,
    /// Ticks into the active stage, 0 between stages
    pub tick: u64,
    pub cars: Vec<CarSnapshot>,
    pub leader: Option<String>,
}

/// What a call to [`RaceEngine::tick`] did
#[derive(Debug, Clone, PartialEq)]
pub enum TickStatus {
    StageRunning { stage_index: usize, tick: u64 },
    StageFinished(StageResult),
    RaceFinished(RaceSummary),
}

/// Main race engine
pub struct RaceEngine<R = StdRng> {
    config: EngineConfig,
    phase: EnginePhase,
    race: Option<RaceState>,
    /// Preset the race was built from, if any
    difficulty: Option<Difficulty>,
    /// Stage in progress
    runner: Option<StageRunner>,
    events: EventBus,
    rng: R,
    ticks_simulated: u64,
}

impl RaceEngine<StdRng> {
    /// Engine with a reproducible random source
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> RaceEngine<R> {
    pub fn new(rng: R) -> Self {
        Self::with_config(EngineConfig::default(), rng)
    }

    pub fn with_config(config: EngineConfig, rng: R) -> Self {
        Self {
            config,
            phase: EnginePhase::Idle,
            race: None,
            difficulty: None,
            runner: None,
            events: EventBus::new(),
            rng,
            ticks_simulated: 0,
        }
    }

    /// Rebuild an engine from a save, ready to resume
    pub fn from_save(save: SaveState, rng: R) -> Result<Self, RaceError> {
        Self::from_save_with_config(EngineConfig::default(), save, rng)
    }

    pub fn from_save_with_config(
        config: EngineConfig,
        save: SaveState,
        rng: R,
    ) -> Result<Self, RaceError> {
        let mut engine = Self::with_config(config, rng);
        engine.load_state(save)?;
        Ok(engine)
    }

    pub fn subscribe<L: RaceListener + 'static>(&mut self, listener: L) {
        self.events.subscribe(Box::new(listener));
    }

    /// Set up a new race: zeroed leaderboard, no results, stage 0 next
    pub fn start(&mut self, cars: Vec<Car>, stages: Vec<Stage>) -> Result<(), RaceError> {
        let race = RaceState::new(cars, stages)?;
        info!(
            "Race started with {} cars over {} stages",
            race.cars.len(),
            race.stages.len()
        );

        self.race = Some(race);
        self.difficulty = None;
        self.runner = None;
        self.phase = EnginePhase::Ready;
        Ok(())
    }

    pub fn start_preset(&mut self, difficulty: Difficulty) -> Result<(), RaceError> {
        self.start(difficulty.roster(), difficulty.stages())?;
        self.difficulty = Some(difficulty);
        info!("Using {} preset", difficulty);
        Ok(())
    }

    /// Advance the race by one tick.
    ///
    /// Begins the stage at the current index if none is active. Once every
    /// stage is recorded, the next call completes the race and notifies
    /// listeners; later calls keep returning the summary.
    pub fn tick(&mut self) -> Result<TickStatus, RaceError> {
        if self.runner.is_none() {
            let race = self.race.as_ref().ok_or(RaceError::NotStarted)?;
            if race.is_complete() {
                return self.finish_race().map(TickStatus::RaceFinished);
            }
            let stage_index = race.current_stage_index;
            self.begin_stage(stage_index)?;
        }
        self.step_stage()
    }

    /// Race `stages[stage_index]` to completion and record its result.
    ///
    /// Stages are raced in order: `stage_index` must be the current stage
    /// index, so no stage is raced twice or skipped.
    pub fn run_stage(&mut self, stage_index: usize) -> Result<StageResult, RaceError> {
        let race = self.race.as_ref().ok_or(RaceError::NotStarted)?;
        RaceState::validate(&race.cars, &race.stages)?;
        if stage_index >= race.stages.len() {
            return Err(RaceError::StageOutOfRange {
                index: stage_index,
                stage_count: race.stages.len(),
            });
        }
        if stage_index != race.current_stage_index {
            return Err(RaceError::StageOutOfOrder {
                index: stage_index,
                expected: race.current_stage_index,
            });
        }

        if let Some(active) = &self.runner {
            warn!(
                "Restarting stage {} after {} ticks",
                active.stage_index() + 1,
                active.ticks()
            );
        }
        self.begin_stage(stage_index)?;

        loop {
            if let TickStatus::StageFinished(result) = self.step_stage()? {
                return Ok(result);
            }
        }
    }

    /// Race every remaining stage and return the final summary.
    ///
    /// At stage index 0 this starts over with a clean leaderboard; otherwise
    /// it resumes where the race left off. A race that is already complete
    /// returns its summary without simulating anything.
    pub fn run(&mut self) -> Result<RaceSummary, RaceError> {
        let race = self.race.as_mut().ok_or(RaceError::NotStarted)?;

        if race.current_stage_index == 0 {
            race.reset_standings();
            self.runner = None;
        } else if race.is_complete() && self.runner.is_none() {
            debug!("All stages recorded, returning the summary");
            return self.finish_race();
        } else {
            info!("Resuming race at stage {}", race.current_stage_index + 1);
        }

        loop {
            if let TickStatus::RaceFinished(summary) = self.tick()? {
                return Ok(summary);
            }
        }
    }

    /// Snapshot of the race for saving
    pub fn save_state(&self) -> Result<SaveState, RaceError> {
        let race = self.race.as_ref().ok_or(RaceError::NotStarted)?;
        Ok(SaveState::capture(race, self.difficulty))
    }

    /// Replace the current race with a saved one. Any stage in progress is
    /// dropped; the saved stage index is raced next.
    pub fn load_state(&mut self, save: SaveState) -> Result<(), RaceError> {
        let difficulty = save.difficulty;
        let race = save.restore()?;
        info!(
            "Loaded race at stage {}/{} ({} stage results)",
            race.current_stage_index,
            race.stages.len(),
            race.stage_results.len()
        );

        self.race = Some(race);
        self.difficulty = difficulty;
        self.runner = None;
        self.phase = EnginePhase::Ready;
        Ok(())
    }

    /// Get current race snapshot
    pub fn snapshot(&self) -> Option<RaceSnapshot> {
        let race = self.race.as_ref()?;
        let runner = self.runner.as_ref();
        let stage_index = runner.map_or(race.current_stage_index, StageRunner::stage_index);

        Some(RaceSnapshot {
            phase: self.phase,
            stage_index,
            stage_name: race.stages.get(stage_index).map(|stage| stage.name.clone()),
            tick: runner.map_or(0, StageRunner::ticks),
            cars: race.cars.iter().map(CarSnapshot::from).collect(),
            leader: runner
                .and_then(StageRunner::leader)
                .and_then(|index| race.cars.get(index))
                .map(|car| car.name.clone()),
        })
    }

    /// Get engine statistics
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            phase: self.phase,
            ticks_simulated: self.ticks_simulated,
            stages_completed: self.race.as_ref().map_or(0, |race| race.stage_results.len()),
            listener_count: self.events.listener_count(),
            listener_failures: self.events.failures(),
        }
    }

    /// Drop the race and return to idle. Listeners stay subscribed.
    pub fn reset(&mut self) {
        self.phase = EnginePhase::Idle;
        self.race = None;
        self.difficulty = None;
        self.runner = None;
        self.ticks_simulated = 0;
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn difficulty(&self) -> Option<Difficulty> {
        self.difficulty
    }

    pub fn race(&self) -> Option<&RaceState> {
        self.race.as_ref()
    }

    pub fn leaderboard(&self) -> Option<&Leaderboard> {
        self.race.as_ref().map(|race| &race.leaderboard)
    }

    pub fn stage_results(&self) -> &[StageResult] {
        self.race
            .as_ref()
            .map(|race| race.stage_results.as_slice())
            .unwrap_or(&[])
    }

    pub fn current_stage_index(&self) -> usize {
        self.race.as_ref().map_or(0, |race| race.current_stage_index)
    }

    pub fn cars(&self) -> &[Car] {
        self.race
            .as_ref()
            .map(|race| race.cars.as_slice())
            .unwrap_or(&[])
    }

    pub fn stages(&self) -> &[Stage] {
        self.race
            .as_ref()
            .map(|race| race.stages.as_slice())
            .unwrap_or(&[])
    }

    /// Reset the cars and start a runner for `stage_index`
    fn begin_stage(&mut self, stage_index: usize) -> Result<(), RaceError> {
        let race = self.race.as_mut().ok_or(RaceError::NotStarted)?;
        let stage_count = race.stages.len();
        let stage = race
            .stages
            .get(stage_index)
            .ok_or(RaceError::StageOutOfRange {
                index: stage_index,
                stage_count,
            })?;
        stage.validate()?;

        let mut runner = StageRunner::new(stage_index, self.config.max_ticks_per_stage);
        runner.begin(stage, &mut race.cars, &mut self.events);
        self.runner = Some(runner);
        self.phase = EnginePhase::Racing;
        Ok(())
    }

    /// Tick the active stage once, recording it if it finished
    fn step_stage(&mut self) -> Result<TickStatus, RaceError> {
        let race = self.race.as_mut().ok_or(RaceError::NotStarted)?;
        let Some(runner) = self.runner.as_mut() else {
            return Err(RaceError::NotStarted);
        };

        let stage_index = runner.stage_index();
        let status = runner.tick(
            &race.stages[stage_index],
            &mut race.cars,
            &mut self.rng,
            &mut self.events,
        );
        self.ticks_simulated += 1;

        if status != StageStatus::Finished {
            return Ok(TickStatus::StageRunning {
                stage_index,
                tick: runner.ticks(),
            });
        }

        let (winner, ticks) = (runner.winner(), runner.ticks());
        self.runner = None;
        let result = race.record_stage(stage_index, winner, ticks);
        info!(
            "Stage {}/{} '{}' finished in {} ticks, winner: {}",
            stage_index + 1,
            race.stages.len(),
            result.stage_name,
            result.ticks,
            result.winner_label()
        );
        Ok(TickStatus::StageFinished(result))
    }

    /// Mark the race finished, notifying listeners the first time only
    fn finish_race(&mut self) -> Result<RaceSummary, RaceError> {
        let summary = self.race.as_ref().ok_or(RaceError::NotStarted)?.summary();
        if self.phase != EnginePhase::Finished {
            self.phase = EnginePhase::Finished;
            info!("Race finished, champion: {}", summary.winner_label());
            self.events
                .emit("race_finished", |listener| listener.on_race_finished(&summary));
        }
        Ok(summary)
    }
}

impl Default for RaceEngine<StdRng> {
    fn default() -> Self {
        Self::from_entropy()
    }
}
