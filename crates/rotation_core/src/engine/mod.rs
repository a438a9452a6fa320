//! The rotation engine: Lineup Generator, Plan Builder, Deviation-Aware
//! Optimizer and the Game Engine state machine built on top of them.

pub mod confirmation;
pub mod emergency;
pub mod game_engine;
pub mod lineup_generator;
pub mod optimizer;
pub mod plan_builder;
pub mod snapshot_io;
pub mod visibility;

pub use game_engine::{EngineState, GameEngine};
pub use optimizer::Optimizer;
