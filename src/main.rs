//! Beat Stealth - headless replay runner
//!
//! Loads a mission config, drives a recorded (or stationary) player through
//! the simulation, and prints the outcome.

use std::path::PathBuf;

use beat_stealth::core::config::load_config;
use beat_stealth::core::error::Result;
use beat_stealth::core::types::Vec2;
use beat_stealth::rhythm::judge::Difficulty;
use beat_stealth::simulation::replay::{load_trace, run_replay, ReplayOutcome, ReplayTrace};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Headless runner for rhythm stealth missions
#[derive(Parser, Debug)]
#[command(name = "beat-stealth")]
#[command(about = "Replay a player trace against a mission and report the outcome")]
struct Args {
    /// Mission config (TOML)
    #[arg(long, default_value = "data/missions/warehouse.toml")]
    config: PathBuf,

    /// Replay trace (JSON); without one the player stands still
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Override the config seed
    #[arg(long)]
    seed: Option<u64>,

    /// Judgment difficulty: easy, normal or hard
    #[arg(long)]
    difficulty: Option<Difficulty>,

    /// Output format: json or text
    #[arg(long, default_value = "text")]
    format: String,

    /// Seconds to simulate when no trace is given
    #[arg(long, default_value_t = 30.0)]
    seconds: f64,

    /// Include the full event log in the output
    #[arg(long)]
    events: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("beat_stealth=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = load_config(&args.config)?;
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let mut trace = match &args.trace {
        Some(path) => load_trace(path)?,
        None => {
            tracing::info!(seconds = args.seconds, "No trace given; running stationary demo");
            ReplayTrace::stationary(Vec2::ZERO, args.seconds, 1.0 / 60.0)
        }
    };
    if args.difficulty.is_some() {
        trace.difficulty = args.difficulty;
    }

    let mut outcome = run_replay(config, &trace)?;
    if !args.events {
        outcome.events.clear();
    }

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&outcome)?),
        "text" => print_text(&outcome),
        other => {
            eprintln!("Unknown format '{}', defaulting to text", other);
            print_text(&outcome);
        }
    }
    Ok(())
}

fn print_text(outcome: &ReplayOutcome) {
    println!("Mission Result");
    println!("==============");
    println!(
        "Outcome: {}",
        if outcome.mission_failed { "FAILED" } else { "undetected" }
    );
    println!("Ticks: {}  Beats: {}", outcome.ticks, outcome.final_beat);
    println!("Alert level: {:.2}", outcome.alert_level);
    println!(
        "Inputs: {} perfect, {} good, {} miss ({:.0}% accuracy)",
        outcome.judgments.perfect,
        outcome.judgments.good,
        outcome.judgments.miss,
        outcome.judgments.accuracy() * 100.0
    );
    println!();
    for guard in &outcome.guards {
        println!(
            "  {} '{}' {:?} at ({:.1}, {:.1}) detection={:.2}{}",
            guard.id,
            guard.name,
            guard.state,
            guard.position.x,
            guard.position.y,
            guard.detection_progress,
            if guard.enabled { "" } else { " [disabled]" }
        );
    }
    for timed in &outcome.events {
        println!("  [{:>7.3}] {:?}", timed.time, timed.event);
    }
}
