//! Save - Serializable race snapshot for pausing and resuming
//!
//! Written between stages. A stage that was in progress when the snapshot
//! was taken is raced again from its start after loading.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::car::Car;
use crate::engine::error::RaceError;
use crate::engine::presets::Difficulty;
use crate::engine::race::{Leaderboard, RaceState, StageResult};
use crate::engine::stage::Stage;

/// Bump when the layout changes
pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveState {
    pub version: u32,
    /// `None` for custom rosters
    pub difficulty: Option<Difficulty>,
    pub cars: Vec<Car>,
    pub stages: Vec<Stage>,
    pub leaderboard: Leaderboard,
    pub stage_results: Vec<StageResult>,
    pub current_stage_index: usize,
}

impl SaveState {
    pub fn capture(race: &RaceState, difficulty: Option<Difficulty>) -> Self {
        Self {
            version: SAVE_VERSION,
            difficulty,
            cars: race.cars.clone(),
            stages: race.stages.clone(),
            leaderboard: race.leaderboard.clone(),
            stage_results: race.stage_results.clone(),
            current_stage_index: race.current_stage_index,
        }
    }

    /// Rebuild the race this snapshot describes, checking it can be resumed
    pub fn restore(self) -> Result<RaceState, RaceError> {
        if self.version != SAVE_VERSION {
            return Err(RaceError::InvalidSave(format!(
                "unsupported version {} (expected {})",
                self.version, SAVE_VERSION
            )));
        }
        RaceState::validate(&self.cars, &self.stages)?;

        if self.current_stage_index > self.stages.len() {
            return Err(RaceError::InvalidSave(format!(
                "stage index {} is past the {} configured stages",
                self.current_stage_index,
                self.stages.len()
            )));
        }
        if self.stage_results.len() != self.current_stage_index {
            return Err(RaceError::InvalidSave(format!(
                "{} stage results recorded but stage index is {}",
                self.stage_results.len(),
                self.current_stage_index
            )));
        }

        let mut leaderboard = Leaderboard::new();
        for car in &self.cars {
            let wins = self.leaderboard.get(&car.name).copied().unwrap_or(0);
            leaderboard.insert(car.name.clone(), wins);
        }
        if let Some(unknown) = self
            .leaderboard
            .keys()
            .find(|name| !leaderboard.contains_key(name.as_str()))
        {
            return Err(RaceError::InvalidSave(format!(
                "leaderboard entry '{}' is not in the roster",
                unknown
            )));
        }

        Ok(RaceState {
            cars: self.cars,
            stages: self.stages,
            leaderboard,
            stage_results: self.stage_results,
            current_stage_index: self.current_stage_index,
        })
    }

    pub fn to_json(&self, pretty: bool) -> Result<String, RaceError> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    pub fn from_json(json: &str) -> Result<Self, RaceError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn write_to(&self, path: &Path) -> Result<(), RaceError> {
        fs::write(path, self.to_json(true)?)?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self, RaceError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
