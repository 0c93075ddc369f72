//! Presets - Canonical rosters and stage lists per difficulty

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::car::Car;
use crate::engine::error::RaceError;
use crate::engine::stage::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Easy
    }
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Cars for this difficulty, in roster order
    pub fn roster(&self) -> Vec<Car> {
        // (name, top speed km/h, handling, color)
        let specs: [(&str, f64, f64, &str); 4] = match self {
            Difficulty::Easy => [
                ("Crimson Comet", 180.0, 7.0, "#e63946"),
                ("Azure Arrow", 175.0, 8.0, "#457b9d"),
                ("Golden Gale", 190.0, 5.5, "#f4a261"),
                ("Emerald Edge", 170.0, 9.0, "#2a9d8f"),
            ],
            Difficulty::Medium => [
                ("Crimson Comet", 210.0, 6.5, "#e63946"),
                ("Azure Arrow", 205.0, 7.5, "#457b9d"),
                ("Golden Gale", 220.0, 5.0, "#f4a261"),
                ("Emerald Edge", 200.0, 8.5, "#2a9d8f"),
            ],
            Difficulty::Hard => [
                ("Crimson Comet", 250.0, 6.0, "#e63946"),
                ("Azure Arrow", 240.0, 7.0, "#457b9d"),
                ("Golden Gale", 265.0, 4.0, "#f4a261"),
                ("Emerald Edge", 235.0, 8.0, "#2a9d8f"),
            ],
        };
        specs
            .iter()
            .map(|&(name, speed, handling, color)| Car::new(name, speed, handling, color))
            .collect()
    }

    /// Stages for this difficulty, in race order
    pub fn stages(&self) -> Vec<Stage> {
        match self {
            Difficulty::Easy => vec![Stage::new("Sunset Circuit", 1000.0, 3)],
            Difficulty::Medium => vec![
                Stage::new("Coastal Run", 1500.0, 3),
                Stage::new("Mountain Pass", 1200.0, 4),
            ],
            Difficulty::Hard => vec![
                Stage::new("Desert Dash", 2000.0, 3),
                Stage::new("Forest Hairpins", 1500.0, 5),
                Stage::new("Night City", 1800.0, 4),
            ],
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = RaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .into_iter()
            .find(|difficulty| difficulty.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RaceError::UnknownDifficulty(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::race::RaceState;

    #[test]
    fn presets_match_canonical_shapes() {
        let easy = Difficulty::Easy.stages();
        assert_eq!(easy, vec![Stage::new("Sunset Circuit", 1000.0, 3)]);
        assert_eq!(Difficulty::Medium.stages().len(), 2);
        assert_eq!(Difficulty::Hard.stages().len(), 3);

        for difficulty in Difficulty::ALL {
            assert_eq!(difficulty.roster().len(), 4);
            assert!(RaceState::validate(&difficulty.roster(), &difficulty.stages()).is_ok());
        }
    }

    #[test]
    fn labels_round_trip_through_from_str() {
        for difficulty in Difficulty::ALL {
            assert_eq!(difficulty.to_string().parse::<Difficulty>().ok(), Some(difficulty));
        }
        assert_eq!("HARD".parse::<Difficulty>().ok(), Some(Difficulty::Hard));
        assert!(matches!(
            "insane".parse::<Difficulty>(),
            Err(RaceError::UnknownDifficulty(_))
        ));
    }
}
