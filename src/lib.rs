//! eventscape - Culture-aware event scene orchestration
//!
//! Turns a structured event description into a coherent 3D scene by
//! coordinating twelve independent template generators (structure,
//! tables, chairs, lighting and so on).
//!
//! # Architecture
//!
//! A run moves through nine phases:
//! - Cultural analysis and master planning decide the shape of the event
//! - Strategy selection and parameter synthesis pick and configure templates
//! - Generators run in dependency waves, then integration reconciles them
//! - Validation corrects low scores, assembly builds the scene, QA reports
//!
//! Every phase transition is journaled as an event; the run state is a
//! fold over that journal.
//!
//! # Modules
//!
//! - `adapters`: Generator and cultural knowledge interfaces
//! - `core`: Orchestration logic (Planner, Scheduler, Integrator, Validator)
//! - `domain`: Data structures (Params, Fragments, Plan, Result, Events)
//! - `cli`: Command-line interface
//! - `config`: Limits, thresholds and compatibility overrides
//!
//! # Usage
//!
//! ```bash
//! # Generate a scene
//! eventscape generate --input wedding.yaml --pretty
//!
//! # Preview zones and budget without generating
//! eventscape plan --input wedding.yaml
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{CulturalKnowledgeBase, GenerationError, StaticKnowledgeBase, TemplateGenerator};
pub use core::{OrchestrationError, Orchestrator, OrchestratorSettings};
pub use domain::{
    Event, EventOrchestrationParameters, EventType, OrchestrationResult, OrchestrationRun,
    RunState, SceneFragment, TemplateId,
};
