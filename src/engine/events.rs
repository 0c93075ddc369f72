//! Events - Notifications for collaborators outside the simulation
//!
//! Audio, UI and commentary subscribe a [`RaceListener`]. Every callback runs
//! synchronously inside the tick, so a listener that blocks stalls the race.
//! A listener that panics is isolated and the tick carries on.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::engine::car::Car;
use crate::engine::race::RaceSummary;
use crate::engine::stage::Stage;

/// Distance one car covered during a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickSample {
    pub name: String,
    pub distance: f64,
}

/// Callbacks fired by the engine. All methods default to doing nothing.
pub trait RaceListener: Send {
    fn on_stage_started(&mut self, _stage: &Stage) {}

    fn on_tick(&mut self, _stage: &Stage, _samples: &[TickSample]) {}

    fn on_lap_completed(&mut self, _car: &Car) {}

    fn on_overtake(&mut self, _new_leader: &Car, _old_leader: &Car) {}

    fn on_stage_won(&mut self, _car: &Car, _stage: &Stage) {}

    fn on_race_finished(&mut self, _summary: &RaceSummary) {}
}

/// Owned copy of a notification, as stored by [`EventRecorder`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RaceEvent {
    StageStarted { stage: String },
    Tick { stage: String, samples: Vec<TickSample> },
    /// `lap` is the lap just completed
    LapCompleted { car: String, lap: u32 },
    Overtake { new_leader: String, old_leader: String },
    StageWon { car: String, stage: String },
    RaceFinished(RaceSummary),
}

/// Listener that keeps every event in a shared buffer.
///
/// Clones share the buffer: subscribe one clone and read from another.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<RaceEvent>>>,
    record_ticks: bool,
}

impl EventRecorder {
    /// Recorder that skips per-tick samples
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorder that also keeps a `Tick` event for every tick
    pub fn with_ticks() -> Self {
        Self {
            record_ticks: true,
            ..Self::default()
        }
    }

    /// Copy of everything recorded so far
    pub fn events(&self) -> Vec<RaceEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Drain the buffer
    pub fn take(&self) -> Vec<RaceEvent> {
        self.events
            .lock()
            .map(|mut events| std::mem::take(&mut *events))
            .unwrap_or_default()
    }

    fn push(&self, event: RaceEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl RaceListener for EventRecorder {
    fn on_stage_started(&mut self, stage: &Stage) {
        self.push(RaceEvent::StageStarted {
            stage: stage.name.clone(),
        });
    }

    fn on_tick(&mut self, stage: &Stage, samples: &[TickSample]) {
        if self.record_ticks {
            self.push(RaceEvent::Tick {
                stage: stage.name.clone(),
                samples: samples.to_vec(),
            });
        }
    }

    fn on_lap_completed(&mut self, car: &Car) {
        self.push(RaceEvent::LapCompleted {
            car: car.name.clone(),
            lap: car.current_lap.saturating_sub(1),
        });
    }

    fn on_overtake(&mut self, new_leader: &Car, old_leader: &Car) {
        self.push(RaceEvent::Overtake {
            new_leader: new_leader.name.clone(),
            old_leader: old_leader.name.clone(),
        });
    }

    fn on_stage_won(&mut self, car: &Car, stage: &Stage) {
        self.push(RaceEvent::StageWon {
            car: car.name.clone(),
            stage: stage.name.clone(),
        });
    }

    fn on_race_finished(&mut self, summary: &RaceSummary) {
        self.push(RaceEvent::RaceFinished(summary.clone()));
    }
}

/// Listener that narrates the race through the `log` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct LogListener;

impl RaceListener for LogListener {
    fn on_stage_started(&mut self, stage: &Stage) {
        log::info!(
            "Stage '{}' started: {} laps of {:.0}m",
            stage.name,
            stage.laps,
            stage.length
        );
    }

    fn on_lap_completed(&mut self, car: &Car) {
        log::info!(
            "{} completed lap {} (damage {:.1}, tires {:.1})",
            car.name,
            car.current_lap.saturating_sub(1),
            car.damage,
            car.tire_wear
        );
    }

    fn on_overtake(&mut self, new_leader: &Car, old_leader: &Car) {
        log::info!("{} overtakes {} for the lead", new_leader.name, old_leader.name);
    }

    fn on_stage_won(&mut self, car: &Car, stage: &Stage) {
        log::info!("{} wins stage '{}'", car.name, stage.name);
    }

    fn on_race_finished(&mut self, summary: &RaceSummary) {
        log::info!("Race finished, champion: {}", summary.winner_label());
    }
}

/// Subscribed listeners plus dispatch bookkeeping
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Box<dyn RaceListener>>,
    failures: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Box<dyn RaceListener>) {
        self.listeners.push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Number of callbacks that panicked
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Call `dispatch` once per listener. A panicking listener is logged and
    /// skipped; the remaining listeners still run.
    pub fn emit<F>(&mut self, event: &str, mut dispatch: F)
    where
        F: FnMut(&mut dyn RaceListener),
    {
        for (index, listener) in self.listeners.iter_mut().enumerate() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| dispatch(listener.as_mut())));
            if let Err(payload) = outcome {
                self.failures += 1;
                log::warn!(
                    "Listener {} failed while handling {}: {}",
                    index,
                    event,
                    panic_message(payload.as_ref())
                );
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Exploding;

    impl RaceListener for Exploding {
        fn on_lap_completed(&mut self, _car: &Car) {
            panic!("speaker unplugged");
        }
    }

    #[test]
    fn panicking_listener_does_not_block_others() {
        let recorder = EventRecorder::new();
        let mut bus = EventBus::new();
        bus.subscribe(Box::new(Exploding));
        bus.subscribe(Box::new(recorder.clone()));

        let mut car = Car::new("Comet", 200.0, 7.0, "red");
        car.current_lap = 2;
        bus.emit("lap_completed", |listener| listener.on_lap_completed(&car));
        bus.emit("lap_completed", |listener| listener.on_lap_completed(&car));

        assert_eq!(bus.failures(), 2);
        assert_eq!(
            recorder.events(),
            vec![
                RaceEvent::LapCompleted {
                    car: "Comet".to_string(),
                    lap: 1
                };
                2
            ]
        );
    }

    #[test]
    fn recorder_skips_ticks_unless_asked() {
        let stage = Stage::new("Loop", 1000.0, 3);
        let samples = vec![TickSample {
            name: "Comet".to_string(),
            distance: 42.0,
        }];

        let mut quiet = EventRecorder::new();
        quiet.on_tick(&stage, &samples);
        assert!(quiet.events().is_empty());

        let mut verbose = EventRecorder::with_ticks();
        verbose.on_tick(&stage, &samples);
        assert_eq!(verbose.take().len(), 1);
        assert!(verbose.events().is_empty());
    }
}
