//! Domain types for the eventscape orchestrator.
//!
//! This module contains the core data structures:
//! - Params: the caller's event description
//! - Template / Fragment: generator identities and their output
//! - Framework / Plan / Strategy: run-scoped derived state
//! - Result: the final scene and report
//! - Events / Run: the run journal

pub mod events;
pub mod fragment;
pub mod framework;
pub mod params;
pub mod plan;
pub mod result;
pub mod run;
pub mod strategy;
pub mod template;
pub mod template_params;

// Re-export commonly used types
pub use events::{Event, EventType, Phase, PhaseStatus};
pub use fragment::{
    tags, MaterialSpec, Rgb, SceneFragment, TemplateInstance, TemplateInstances, Transform, Vec3,
};
pub use framework::{
    AuthenticityGuidelines, CeremonyProtocol, ColorHarmony, CulturalElement, CulturalFramework,
    FusionAssessment, FusionCompatibility, MaterialCoherence, SpatialPrinciples, Symmetry,
};
pub use params::{
    event_scale, AccessibilityLevel, Atmosphere, BudgetProfile, ClimateProfile, Culture,
    CulturalFoundation, CulturalSensitivity, EventFoundation, EventKind,
    EventOrchestrationParameters, EventScale, EventTiming, ExperienceGoals, GuestDemographics,
    InteractionStyle, MemorabilityGoal, PlanningTimeline, Season, SecurityLevel, SecurityProfile,
    SustainabilityLevel, TechnologyFlags, VenueDimensions, VenueProfile, VenueRestriction,
    VenueType,
};
pub use plan::{
    AccessibilityPlan, AcousticProfile, Bounds, CategoryBudget, CirculationPath, ClimatePlan,
    MasterPlan, NetworkPlan, PathKind, PowerPlan, Privacy, SecurityPlan, Sightline, SpatialZone,
    SustainabilityPlan, ZonePurpose, SUSTAINABLE_MATERIALS, UNSUSTAINABLE_MATERIALS,
};
pub use result::{
    Effort, OrchestrationResult, QualityScores, Recommendation, RecommendationKind,
    RecommendationPriority, ResultMetadata,
};
pub use run::{OrchestrationRun, RunState};
pub use strategy::TemplateStrategy;
pub use template::{BudgetCategory, TemplateId};
pub use template_params::{
    AudiovisualSpec, CelebratorySpec, ChairSpec, ClimateSpec, FloralSpec, InteractiveSpec,
    LandscapeSpec, LightingSpec, SecuritySpec, StageSpec, StructureKind, StructureSpec, TableShape,
    TableSpec, TemplateParams, TemplateSpec,
};
