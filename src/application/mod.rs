//! Application layer: assembles the engine from configuration and ports.

pub mod engine;

pub use engine::{AutoOpsEngine, EngineDependencies, EngineHandle};
