//! Error - Crate-wide error type

use std::fmt;
use std::io;

/// Errors raised by the race engine
#[derive(Debug)]
pub enum RaceError {
    /// Roster or stage list cannot be raced
    Config(String),
    /// An operation needs a race but `start()` was never called
    NotStarted,
    /// Stage index outside the configured stage list
    StageOutOfRange { index: usize, stage_count: usize },
    /// Stage raced before the stages ahead of it, or raced twice
    StageOutOfOrder { index: usize, expected: usize },
    UnknownDifficulty(String),
    /// Save file parsed but does not describe a resumable race
    InvalidSave(String),
    Io(io::Error),
    Serde(serde_json::Error),
}

impl fmt::Display for RaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RaceError::Config(reason) => write!(f, "invalid race configuration: {}", reason),
            RaceError::NotStarted => write!(f, "no race has been started"),
            RaceError::StageOutOfRange { index, stage_count } => write!(
                f,
                "stage index {} out of range (race has {} stages)",
                index, stage_count
            ),
            RaceError::StageOutOfOrder { index, expected } => write!(
                f,
                "stage index {} cannot be raced now (next stage is {})",
                index, expected
            ),
            RaceError::UnknownDifficulty(label) => {
                write!(f, "unknown difficulty '{}' (expected easy, medium or hard)", label)
            }
            RaceError::InvalidSave(reason) => write!(f, "invalid save state: {}", reason),
            RaceError::Io(error) => write!(f, "i/o error: {}", error),
            RaceError::Serde(error) => write!(f, "serialization error: {}", error),
        }
    }
}

impl std::error::Error for RaceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RaceError::Io(error) => Some(error),
            RaceError::Serde(error) => Some(error),
            _ => None,
        }
    }
}

impl From<io::Error> for RaceError {
    fn from(error: io::Error) -> RaceError {
        RaceError::Io(error)
    }
}

impl From<serde_json::Error> for RaceError {
    fn from(error: serde_json::Error) -> RaceError {
        RaceError::Serde(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_describe_the_problem() {
        let error = RaceError::Config("stage 'Loop' has zero laps".to_string());
        assert_eq!(
            error.to_string(),
            "invalid race configuration: stage 'Loop' has zero laps"
        );
    }

    #[test]
    fn io_errors_keep_their_source() {
        use std::error::Error;

        let error = RaceError::from(io::Error::new(io::ErrorKind::NotFound, "missing"));
        assert!(error.source().is_some());
    }
}
