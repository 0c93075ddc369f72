//! Rally - Command-line host for the race engine
//!
//! Drives the engine one tick at a time, narrates through the log and
//! writes a save file after every stage so a race can be resumed later.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

use rally_engine::engine::LogListener;
use rally_engine::{Difficulty, RaceEngine, RaceSummary, SaveState, TickStatus};

#[derive(Parser, Debug)]
#[command(name = "rally", version, about = "Simulate a multi-stage car race")]
struct Opts {
    /// Preset to race: easy, medium or hard (a resumed race keeps its own)
    #[arg(long, default_value = "easy", conflicts_with = "resume")]
    difficulty: Difficulty,

    /// Seed for a reproducible race
    #[arg(long)]
    seed: Option<u64>,

    /// Resume the race stored in this save file instead of starting a new one
    #[arg(long)]
    resume: Option<PathBuf>,

    /// Write a save file here after every stage
    #[arg(long)]
    save: Option<PathBuf>,

    /// Stop after this many stages (resume later with --resume)
    #[arg(long)]
    max_stages: Option<usize>,

    /// Pause between ticks, in milliseconds
    #[arg(long, default_value_t = 0)]
    tick_ms: u64,

    /// Print the final summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let opt = Opts::parse();

    let rng = match opt.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut engine = RaceEngine::new(rng);
    engine.subscribe(LogListener);

    if let Some(path) = &opt.resume {
        let save = SaveState::read_from(path)
            .with_context(|| format!("failed to read save file {}", path.display()))?;
        engine.load_state(save)?;
        log::info!("Resumed race from {}", path.display());
    } else {
        engine.start_preset(opt.difficulty)?;
    }

    let pace = Duration::from_millis(opt.tick_ms);
    let mut stages_run = 0;
    loop {
        match engine.tick()? {
            TickStatus::StageRunning { .. } => {
                if !pace.is_zero() {
                    thread::sleep(pace);
                }
            }
            TickStatus::StageFinished(result) => {
                stages_run += 1;
                for (place, standing) in result.standings.iter().enumerate() {
                    log::info!(
                        "  {}. {} (damage {:.1}, tires {:.1})",
                        place + 1,
                        standing.name,
                        standing.damage,
                        standing.tire_wear
                    );
                }
                if let Some(path) = &opt.save {
                    write_save(&engine, path)?;
                }
                if opt.max_stages.is_some_and(|limit| stages_run >= limit) {
                    let stats = engine.stats();
                    log::info!(
                        "Stopping after {} stages ({} ticks), {} of {} stages done",
                        stages_run,
                        stats.ticks_simulated,
                        engine.current_stage_index(),
                        engine.stages().len()
                    );
                    return Ok(());
                }
            }
            TickStatus::RaceFinished(summary) => {
                if let Some(path) = &opt.save {
                    write_save(&engine, path)?;
                }
                print_summary(&summary, opt.json)?;
                return Ok(());
            }
        }
    }
}

fn write_save(engine: &RaceEngine, path: &Path) -> Result<()> {
    engine
        .save_state()?
        .write_to(path)
        .with_context(|| format!("failed to write save file {}", path.display()))?;
    log::debug!("Saved race to {}", path.display());
    Ok(())
}

fn print_summary(summary: &RaceSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    println!("Champion: {}", summary.winner_label());
    for (name, wins) in &summary.leaderboard {
        println!("  {:<16} {} stage wins", name, wins);
    }
    for result in &summary.stage_results {
        println!(
            "Stage {} '{}': {} ({} ticks)",
            result.stage_index + 1,
            result.stage_name,
            result.winner_label(),
            result.ticks
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resume_does_not_take_a_difficulty() {
        let result = Opts::try_parse_from(["rally", "--difficulty", "hard", "--resume", "race.json"]);
        assert!(result.is_err());

        let opt = Opts::try_parse_from(["rally", "--resume", "race.json"]).unwrap();
        assert_eq!(opt.resume, Some(PathBuf::from("race.json")));
        assert_eq!(opt.difficulty, Difficulty::Easy);
    }
}
