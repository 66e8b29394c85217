//! Core orchestration logic.
//!
//! This module contains:
//! - Culture / Planner / Strategy / Synthesis: decisions made before generation
//! - Registry / Relationships / Scheduler: generators and their ordering
//! - Integration / Validation / Assembly / Report: turning output into a scene
//! - Limits / Error: run bounds and the failure taxonomy
//! - Orchestrator: Main execution engine

pub mod assembly;
pub mod culture;
pub mod error;
pub mod integration;
pub mod limits;
pub mod orchestrator;
pub mod planner;
pub mod registry;
pub mod relationships;
pub mod report;
pub mod scheduler;
pub mod strategy;
pub mod synthesis;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use assembly::SceneAssembler;
pub use culture::{CompatibilityOverride, CompatibilityTable, CulturalFrameworkBuilder};
pub use error::{
    BudgetAllocationError, FailureCause, IntegrationError, OrchestrationError,
    TemplateGenerationError, ValidationError,
};
pub use integration::{EcosystemIntegrator, IntegrationReport};
pub use limits::{CancellationFlag, LimitViolation, OrchestrationLimits, RetryPolicy, RunTracker};
pub use orchestrator::{input_fingerprint, validate_input, Orchestrator, OrchestratorSettings, PlanPreview};
pub use planner::MasterPlanner;
pub use registry::TemplateRegistry;
pub use relationships::{
    RelationshipError, RelationshipGraph, RelationshipKind, SpatialConstraint, TemplateRelationship,
};
pub use report::{QualityAssuranceReporter, QualityReport};
pub use scheduler::{Instantiation, InstantiationScheduler, TemplateReport};
pub use strategy::TemplateStrategySelector;
pub use synthesis::{cultural_chair_height, cultural_table_height, required_chairs, ParameterSynthesizer};
pub use validation::{ExperienceValidator, ScoringThresholds, ValidationScores};
