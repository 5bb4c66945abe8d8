//! Simulation core for Trickstep: a tile platformer where the level is out to
//! get you.
//!
//! A [`level::LevelPack`] is parsed into [`parser::LevelGeometry`] once per
//! level load. Each frame, [`simulation::SimulationState::step`] runs the
//! physics stepper, the spike trigger engine and the gravity zone machine in
//! that order. [`game::Game`] wraps it in the menu/fade/level-complete flow and
//! records progress.

pub mod collision;
pub mod config;
pub mod error;
pub mod flow;
pub mod game;
pub mod level;
pub mod parser;
pub mod physics;
pub mod simulation;
pub mod spikes;
pub mod zones;

pub use config::SimConfig;
pub use error::LevelError;
pub use flow::GameState;
pub use game::Game;
pub use level::LevelPack;
pub use physics::FrameInput;
pub use simulation::{SimulationState, StepOutcome};
