//! dreamcore-engine - the autonomous cycle engine
//!
//! - `pipeline`: fixed-order stages turning a signal bundle into an artifact
//! - `resolver`: memoizing conflict resolution with cascade escalation
//! - `evaluator`: score and coefficient gates for manifestation
//! - `manifest`: effect planning for artifacts that clear both gates
//! - `memory`: bounded artifact store and pattern index
//! - `state`: the engine's gauges, phase and consciousness
//! - `engine`: the scheduling loop tying them together

pub mod config;
pub mod engine;
pub mod evaluator;
pub mod manifest;
pub mod memory;
pub mod pipeline;
pub mod resolver;
pub mod state;

pub use config::EngineConfig;
pub use engine::{CycleEngine, CycleReport, EngineHandle};
pub use evaluator::{Evaluator, Verdict};
pub use memory::ArtifactMemory;
pub use pipeline::{Draft, Pipeline, PipelineOutput, Stage};
pub use resolver::{CascadeReport, ConflictResolver, ResolutionContext, ResolutionStrategy, SweepSummary};
pub use state::EngineState;
