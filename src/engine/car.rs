//! Car - Individual car attributes and per-stage race state
//!
//! Each car has fixed performance attributes plus the state the physics
//! step mutates every tick. The same cars are reused for every stage.

use serde::{Deserialize, Serialize};

use crate::engine::error::RaceError;
use crate::engine::stage::Stage;

/// Complete state for a single car
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Car {
    /// Car name, unique within a race
    pub name: String,
    /// Display color, only meaningful to the UI
    pub color: String,
    /// Top speed (km/h)
    pub speed: f64,
    /// Handling rating (roughly 0-10)
    pub handling: f64,
    /// Distance into the current lap (meters)
    pub position: f64,
    /// Current lap, 1-based
    pub current_lap: u32,
    /// Accumulated damage (0 = pristine, 100 = wrecked)
    pub damage: f64,
    /// Remaining tire life (100 = fresh, 0 = worn out)
    pub tire_wear: f64,
}

impl Car {
    pub const MAX_DAMAGE: f64 = 100.0;
    pub const FRESH_TIRES: f64 = 100.0;

    /// Create a car on the start line with fresh tires
    pub fn new(
        name: impl Into<String>,
        speed: f64,
        handling: f64,
        color: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
            speed,
            handling,
            position: 0.0,
            current_lap: 1,
            damage: 0.0,
            tire_wear: Self::FRESH_TIRES,
        }
    }

    /// Reset race state for the start of a stage
    pub fn reset(&mut self) {
        self.position = 0.0;
        self.current_lap = 1;
        self.damage = 0.0;
        self.tire_wear = Self::FRESH_TIRES;
    }

    /// Whether the car has completed every lap of `stage`
    pub fn has_finished(&self, stage: &Stage) -> bool {
        self.current_lap > stage.laps
    }

    /// Cumulative distance covered in `stage` (meters)
    pub fn progress(&self, stage: &Stage) -> f64 {
        f64::from(self.current_lap.saturating_sub(1)) * stage.length + self.position
    }

    /// Check that the performance attributes can be simulated
    pub fn validate(&self) -> Result<(), RaceError> {
        if self.name.trim().is_empty() {
            return Err(RaceError::Config("car with empty name".to_string()));
        }
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(RaceError::Config(format!(
                "car '{}' has invalid speed {}",
                self.name, self.speed
            )));
        }
        if !self.handling.is_finite() {
            return Err(RaceError::Config(format!(
                "car '{}' has invalid handling {}",
                self.name, self.handling
            )));
        }
        Ok(())
    }
}

/// Final damage and tire state of one car at the end of a stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarStanding {
    pub name: String,
    pub damage: f64,
    pub tire_wear: f64,
}

impl From<&Car> for CarStanding {
    fn from(car: &Car) -> Self {
        Self {
            name: car.name.clone(),
            damage: car.damage,
            tire_wear: car.tire_wear,
        }
    }
}

/// Compact car state for UI polling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarSnapshot {
    pub name: String,
    pub color: String,
    pub position: f64,
    pub current_lap: u32,
    pub damage: f64,
    pub tire_wear: f64,
}

impl From<&Car> for CarSnapshot {
    fn from(car: &Car) -> Self {
        Self {
            name: car.name.clone(),
            color: car.color.clone(),
            position: car.position,
            current_lap: car.current_lap,
            damage: car.damage,
            tire_wear: car.tire_wear,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_restores_stage_start_state() {
        let mut car = Car::new("Comet", 200.0, 7.0, "#e63946");
        car.position = 512.0;
        car.current_lap = 3;
        car.damage = 41.5;
        car.tire_wear = 12.0;

        car.reset();

        assert_eq!(car.position, 0.0);
        assert_eq!(car.current_lap, 1);
        assert_eq!(car.damage, 0.0);
        assert_eq!(car.tire_wear, Car::FRESH_TIRES);
        assert_eq!(car.speed, 200.0);
        assert_eq!(car.handling, 7.0);
    }

    #[test]
    fn progress_counts_completed_laps() {
        let stage = Stage::new("Loop", 1000.0, 3);
        let mut car = Car::new("Comet", 200.0, 7.0, "#e63946");
        car.current_lap = 3;
        car.position = 250.0;

        assert_eq!(car.progress(&stage), 2250.0);
        assert!(!car.has_finished(&stage));

        car.current_lap = 4;
        assert!(car.has_finished(&stage));
    }

    #[test]
    fn validate_rejects_unusable_attributes() {
        assert!(Car::new("Comet", 0.0, 7.0, "red").validate().is_err());
        assert!(Car::new("Comet", f64::NAN, 7.0, "red").validate().is_err());
        assert!(Car::new("Comet", 150.0, f64::INFINITY, "red").validate().is_err());
        assert!(Car::new("  ", 150.0, 7.0, "red").validate().is_err());
        assert!(Car::new("Comet", 150.0, 7.0, "red").validate().is_ok());
    }
}
