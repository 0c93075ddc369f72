//! Race - Roster, stages, leaderboard and stage results
//!
//! Owns everything that persists across stages and computes the overall
//! champion once the last stage is done.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::engine::car::{Car, CarStanding};
use crate::engine::error::RaceError;
use crate::engine::stage::Stage;

/// Stage wins per car name
pub type Leaderboard = BTreeMap<String, u32>;

/// Outcome of one completed stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub stage_index: usize,
    pub stage_name: String,
    /// `None` if the stage hit its tick limit
    pub winner: Option<String>,
    pub ticks: u64,
    /// Final car state, least damaged first
    pub standings: Vec<CarStanding>,
}

impl StageResult {
    pub fn winner_label(&self) -> &str {
        self.winner.as_deref().unwrap_or("none")
    }
}

/// Final (or current) race outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceSummary {
    /// Cars sharing the highest win count, in roster order
    pub winners: Vec<String>,
    pub leaderboard: Leaderboard,
    pub stage_results: Vec<StageResult>,
}

impl RaceSummary {
    /// Winner designation, e.g. `"Comet"` or `"Comet & Arrow"` on a tie
    pub fn winner_label(&self) -> String {
        if self.winners.is_empty() {
            "none".to_string()
        } else {
            self.winners.join(" & ")
        }
    }
}

/// Complete race state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceState {
    /// Cars in roster order
    pub cars: Vec<Car>,
    pub stages: Vec<Stage>,
    pub leaderboard: Leaderboard,
    pub stage_results: Vec<StageResult>,
    /// Next stage to race
    pub current_stage_index: usize,
}

impl RaceState {
    /// Create a race at stage 0 with an all-zero leaderboard
    pub fn new(cars: Vec<Car>, stages: Vec<Stage>) -> Result<Self, RaceError> {
        Self::validate(&cars, &stages)?;
        let mut race = Self {
            cars,
            stages,
            leaderboard: Leaderboard::new(),
            stage_results: Vec::new(),
            current_stage_index: 0,
        };
        race.reset_standings();
        Ok(race)
    }

    /// Reject rosters and stage lists that cannot be raced
    pub fn validate(cars: &[Car], stages: &[Stage]) -> Result<(), RaceError> {
        if cars.is_empty() {
            return Err(RaceError::Config("car roster is empty".to_string()));
        }
        if stages.is_empty() {
            return Err(RaceError::Config("stage list is empty".to_string()));
        }

        let mut names = HashSet::with_capacity(cars.len());
        for car in cars {
            car.validate()?;
            if !names.insert(car.name.as_str()) {
                return Err(RaceError::Config(format!(
                    "car name '{}' appears more than once",
                    car.name
                )));
            }
        }
        for stage in stages {
            stage.validate()?;
        }
        Ok(())
    }

    /// Zero the leaderboard, drop stage results and rewind to stage 0
    pub fn reset_standings(&mut self) {
        self.leaderboard = self.cars.iter().map(|car| (car.name.clone(), 0)).collect();
        self.stage_results.clear();
        self.current_stage_index = 0;
    }

    /// Store the outcome of `stage_index` and advance the stage cursor.
    /// The winner, if any, gains exactly one leaderboard point.
    pub fn record_stage(
        &mut self,
        stage_index: usize,
        winner: Option<usize>,
        ticks: u64,
    ) -> StageResult {
        let winner = winner.and_then(|index| self.cars.get(index)).map(|car| car.name.clone());
        if let Some(name) = &winner {
            *self.leaderboard.entry(name.clone()).or_insert(0) += 1;
        }

        let mut standings: Vec<CarStanding> = self.cars.iter().map(CarStanding::from).collect();
        standings.sort_by(|a, b| a.damage.total_cmp(&b.damage));

        let result = StageResult {
            stage_index,
            stage_name: self.stages[stage_index].name.clone(),
            winner,
            ticks,
            standings,
        };
        self.stage_results.push(result.clone());
        self.current_stage_index += 1;
        result
    }

    /// Whether every stage has been raced
    pub fn is_complete(&self) -> bool {
        self.current_stage_index >= self.stages.len()
    }

    pub fn wins(&self, name: &str) -> u32 {
        self.leaderboard.get(name).copied().unwrap_or(0)
    }

    /// Cars with the highest win count, in roster order. Empty if nobody has
    /// won a stage.
    pub fn champions(&self) -> Vec<String> {
        let best = self.leaderboard.values().copied().max().unwrap_or(0);
        if best == 0 {
            return Vec::new();
        }
        self.cars
            .iter()
            .filter(|car| self.wins(&car.name) == best)
            .map(|car| car.name.clone())
            .collect()
    }

    pub fn summary(&self) -> RaceSummary {
        RaceSummary {
            winners: self.champions(),
            leaderboard: self.leaderboard.clone(),
            stage_results: self.stage_results.clone(),
        }
    }

    pub fn get_car(&self, name: &str) -> Option<&Car> {
        self.cars.iter().find(|car| car.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_stage_race() -> RaceState {
        RaceState::new(
            vec![
                Car::new("A", 200.0, 7.0, "red"),
                Car::new("B", 210.0, 6.0, "blue"),
                Car::new("C", 190.0, 8.0, "green"),
                Car::new("D", 180.0, 9.0, "gold"),
            ],
            vec![
                Stage::new("One", 1000.0, 3),
                Stage::new("Two", 1200.0, 2),
                Stage::new("Three", 800.0, 4),
            ],
        )
        .unwrap()
    }

    #[test]
    fn new_race_starts_with_zeroed_leaderboard() {
        let race = three_stage_race();
        assert_eq!(race.leaderboard.len(), 4);
        assert!(race.leaderboard.values().all(|wins| *wins == 0));
        assert_eq!(race.current_stage_index, 0);
        assert!(race.champions().is_empty());
    }

    #[test]
    fn invalid_configurations_fail_fast() {
        let car = || Car::new("A", 200.0, 7.0, "red");
        let stage = || Stage::new("One", 1000.0, 3);

        assert!(matches!(
            RaceState::new(vec![], vec![stage()]),
            Err(RaceError::Config(_))
        ));
        assert!(matches!(
            RaceState::new(vec![car()], vec![]),
            Err(RaceError::Config(_))
        ));
        assert!(matches!(
            RaceState::new(vec![car()], vec![Stage::new("Zero", 0.0, 3)]),
            Err(RaceError::Config(_))
        ));
        assert!(matches!(
            RaceState::new(vec![car()], vec![Stage::new("None", 1000.0, 0)]),
            Err(RaceError::Config(_))
        ));
        assert!(matches!(
            RaceState::new(vec![car(), car()], vec![stage()]),
            Err(RaceError::Config(_))
        ));
    }

    #[test]
    fn recording_a_stage_credits_only_the_winner() {
        let mut race = three_stage_race();
        race.cars[0].damage = 30.0;
        race.cars[1].damage = 5.0;
        race.cars[2].damage = 60.0;
        race.cars[3].damage = 12.5;

        let result = race.record_stage(0, Some(1), 120);

        assert_eq!(result.winner.as_deref(), Some("B"));
        assert_eq!(race.wins("B"), 1);
        assert_eq!(race.leaderboard.values().sum::<u32>(), 1);
        assert_eq!(race.current_stage_index, 1);
        let order: Vec<_> = result.standings.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(order, ["B", "D", "A", "C"]);
        assert_eq!(race.stage_results, vec![result]);
    }

    #[test]
    fn stage_without_winner_changes_no_entry() {
        let mut race = three_stage_race();
        let result = race.record_stage(0, None, 1_000);

        assert_eq!(result.winner_label(), "none");
        assert!(race.leaderboard.values().all(|wins| *wins == 0));
        assert_eq!(race.current_stage_index, 1);
    }

    #[test]
    fn most_stage_wins_takes_the_race() {
        let mut race = three_stage_race();
        race.record_stage(0, Some(0), 100);
        race.record_stage(1, Some(0), 100);
        race.record_stage(2, Some(1), 100);

        assert!(race.is_complete());
        let summary = race.summary();
        assert_eq!(summary.winners, vec!["A".to_string()]);
        assert_eq!(summary.winner_label(), "A");
        let expected: Leaderboard = [("A", 2), ("B", 1), ("C", 0), ("D", 0)]
            .into_iter()
            .map(|(name, wins)| (name.to_string(), wins))
            .collect();
        assert_eq!(summary.leaderboard, expected);
        assert_eq!(summary.stage_results.len(), 3);
    }

    #[test]
    fn tied_win_counts_share_the_title() {
        let mut race = three_stage_race();
        race.stages.truncate(2);
        race.record_stage(0, Some(3), 100);
        race.record_stage(1, Some(1), 100);

        let summary = race.summary();
        assert_eq!(summary.winners, vec!["B".to_string(), "D".to_string()]);
        assert_eq!(summary.winner_label(), "B & D");
    }
}
