//! Per-frame orchestration and headless replays

pub mod replay;
pub mod tick;

pub use replay::{load_trace, run_replay, ReplayOutcome, ReplayTrace};
pub use tick::{InputEvent, Simulation, SimulationEvent, TickReport};
