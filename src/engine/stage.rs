//! Stage - Stage descriptor and the runner that races it
//!
//! The runner ticks every active car, wraps laps, declares the first car
//! past the final lap as winner and watches for lead changes.

use log::{debug, trace, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::engine::car::Car;
use crate::engine::error::RaceError;
use crate::engine::events::{EventBus, TickSample};
use crate::engine::physics::Physics;

/// One race segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    /// Lap length in meters
    pub length: f64,
    /// Laps needed to finish
    pub laps: u32,
}

impl Stage {
    pub fn new(name: impl Into<String>, length: f64, laps: u32) -> Self {
        Self {
            name: name.into(),
            length,
            laps,
        }
    }

    /// Full stage distance in meters
    pub fn total_distance(&self) -> f64 {
        self.length * f64::from(self.laps)
    }

    pub fn validate(&self) -> Result<(), RaceError> {
        if !self.length.is_finite() || self.length <= 0.0 {
            return Err(RaceError::Config(format!(
                "stage '{}' has invalid length {}",
                self.name, self.length
            )));
        }
        if self.laps == 0 {
            return Err(RaceError::Config(format!("stage '{}' has zero laps", self.name)));
        }
        Ok(())
    }
}

/// Stage runner status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageStatus {
    NotStarted,
    Running,
    Finished,
}

/// Drives one stage tick by tick.
///
/// Cars are processed in roster order, which also breaks ties: when two cars
/// complete the final lap in the same tick, the one earlier in the roster
/// wins.
#[derive(Debug, Clone)]
pub struct StageRunner {
    stage_index: usize,
    status: StageStatus,
    tick: u64,
    max_ticks: u64,
    leader: Option<usize>,
    winner: Option<usize>,
}

impl StageRunner {
    pub fn new(stage_index: usize, max_ticks: u64) -> Self {
        Self {
            stage_index,
            status: StageStatus::NotStarted,
            tick: 0,
            max_ticks,
            leader: None,
            winner: None,
        }
    }

    /// Reset every car to the start line and enter `Running`
    pub fn begin(&mut self, stage: &Stage, cars: &mut [Car], events: &mut EventBus) {
        for car in cars.iter_mut() {
            car.reset();
        }
        self.status = StageStatus::Running;
        self.tick = 0;
        self.leader = None;
        self.winner = None;

        debug!(
            "Stage {} '{}' started with {} cars ({:.0}m)",
            self.stage_index + 1,
            stage.name,
            cars.len(),
            stage.total_distance()
        );
        events.emit("stage_started", |listener| listener.on_stage_started(stage));
    }

    /// Simulate one tick. Does nothing unless the runner is `Running`.
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        stage: &Stage,
        cars: &mut [Car],
        rng: &mut R,
        events: &mut EventBus,
    ) -> StageStatus {
        if self.status != StageStatus::Running {
            return self.status;
        }
        self.tick += 1;

        let mut samples = Vec::with_capacity(cars.len());
        for index in 0..cars.len() {
            let car = &mut cars[index];
            let Some(distance) = Physics::step(car, stage, rng) else {
                continue;
            };
            // Never fall back behind the start of the current lap
            if car.position < 0.0 {
                car.position = 0.0;
            }
            samples.push(TickSample {
                name: car.name.clone(),
                distance,
            });

            if car.position < stage.length {
                continue;
            }
            car.position %= stage.length;
            car.current_lap += 1;

            let car = &cars[index];
            debug!(
                "{} completed lap {}/{} of '{}'",
                car.name,
                car.current_lap - 1,
                stage.laps,
                stage.name
            );
            events.emit("lap_completed", |listener| listener.on_lap_completed(car));

            if self.winner.is_none() && car.has_finished(stage) {
                self.winner = Some(index);
                self.status = StageStatus::Finished;
                debug!(
                    "{} won stage '{}' after {} ticks",
                    car.name, stage.name, self.tick
                );
                events.emit("stage_won", |listener| listener.on_stage_won(car, stage));
            }
        }

        if self.status == StageStatus::Running {
            self.track_leader(stage, cars, events);

            if self.tick >= self.max_ticks {
                warn!(
                    "Stage '{}' hit the {} tick limit without a winner",
                    stage.name, self.max_ticks
                );
                self.status = StageStatus::Finished;
            }
        }

        trace!("Tick {} of '{}': {:?}", self.tick, stage.name, samples);
        events.emit("tick", |listener| listener.on_tick(stage, &samples));

        self.status
    }

    fn track_leader(&mut self, stage: &Stage, cars: &[Car], events: &mut EventBus) {
        let leader = Self::leader_of(stage, cars);
        if let (Some(previous), Some(current)) = (self.leader, leader) {
            if previous != current {
                let (new_leader, old_leader) = (&cars[current], &cars[previous]);
                debug!("{} takes the lead from {}", new_leader.name, old_leader.name);
                events.emit("overtake", |listener| {
                    listener.on_overtake(new_leader, old_leader)
                });
            }
        }
        if leader.is_some() {
            self.leader = leader;
        }
    }

    /// Index of the unfinished car with the most cumulative progress.
    /// Equal progress goes to the car earlier in the roster.
    pub fn leader_of(stage: &Stage, cars: &[Car]) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (index, car) in cars.iter().enumerate() {
            if car.has_finished(stage) {
                continue;
            }
            let progress = car.progress(stage);
            match best {
                Some((_, best_progress)) if progress <= best_progress => {}
                _ => best = Some((index, progress)),
            }
        }
        best.map(|(index, _)| index)
    }

    pub fn stage_index(&self) -> usize {
        self.stage_index
    }

    pub fn status(&self) -> StageStatus {
        self.status
    }

    /// Ticks simulated so far
    pub fn ticks(&self) -> u64 {
        self.tick
    }

    /// Leader after the most recent tick
    pub fn leader(&self) -> Option<usize> {
        self.leader
    }

    pub fn winner(&self) -> Option<usize> {
        self.winner
    }
}
