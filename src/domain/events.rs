//! Run journal events.
//!
//! Every orchestration run records what happened as an ordered list of
//! immutable events. The journal lives in memory and is returned with the
//! result; the state of a run can be rebuilt from it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::template::TemplateId;

/// A single entry in a run journal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier for this event
    pub id: Uuid,

    /// When this event occurred
    pub timestamp: DateTime<Utc>,

    /// The run this event belongs to
    pub run_id: Uuid,

    /// Phase the event was raised in
    pub phase: Phase,

    /// Template concerned (if applicable)
    pub template: Option<TemplateId>,

    /// Type of event
    pub event_type: EventType,

    /// Human-readable summary
    pub summary: String,

    /// Status of the phase or template after this event
    pub status: PhaseStatus,

    /// Time taken in milliseconds (for completed work)
    pub duration_ms: Option<u64>,

    /// Error message if something failed
    pub error: Option<String>,
}

impl Event {
    /// Create a new event with the current timestamp
    pub fn new(
        run_id: Uuid,
        phase: Phase,
        template: Option<TemplateId>,
        event_type: EventType,
        summary: String,
        status: PhaseStatus,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            run_id,
            phase,
            template,
            event_type,
            summary,
            status,
            duration_ms: None,
            error: None,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self
    }

    /// Whether this event records a recovered degradation
    pub fn is_degradation(&self) -> bool {
        matches!(
            self.event_type,
            EventType::TemplateSkipped | EventType::AdjustmentSkipped | EventType::FallbackUsed
        )
    }
}

/// The nine sequential phases of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    CulturalFramework,
    MasterPlanning,
    StrategySelection,
    ParameterSynthesis,
    Instantiation,
    EcosystemIntegration,
    ExperienceValidation,
    SceneAssembly,
    QualityAssurance,
}

impl Phase {
    pub const ALL: [Phase; 9] = [
        Phase::CulturalFramework,
        Phase::MasterPlanning,
        Phase::StrategySelection,
        Phase::ParameterSynthesis,
        Phase::Instantiation,
        Phase::EcosystemIntegration,
        Phase::ExperienceValidation,
        Phase::SceneAssembly,
        Phase::QualityAssurance,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::CulturalFramework => "cultural-framework",
            Phase::MasterPlanning => "master-planning",
            Phase::StrategySelection => "strategy-selection",
            Phase::ParameterSynthesis => "parameter-synthesis",
            Phase::Instantiation => "instantiation",
            Phase::EcosystemIntegration => "ecosystem-integration",
            Phase::ExperienceValidation => "experience-validation",
            Phase::SceneAssembly => "scene-assembly",
            Phase::QualityAssurance => "quality-assurance",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Types of events that can occur during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    RunStarted,
    RunCompleted,
    RunFailed,
    PhaseStarted,
    PhaseCompleted,
    TemplateGenerated,
    /// A generator attempt failed and will be retried
    TemplateRetrying,
    /// A template was dropped from the scene
    TemplateSkipped,
    FallbackUsed,
    /// An integration adjustment could not be applied
    AdjustmentSkipped,
    CorrectionApplied,
    Cancelled,
}

/// Status of a phase or template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = Event::new(
            Uuid::new_v4(),
            Phase::Instantiation,
            Some(TemplateId::Chair),
            EventType::TemplateGenerated,
            "chair generated".to_string(),
            PhaseStatus::Completed,
        )
        .with_duration(12);

        let json = serde_json::to_string(&event).unwrap();
        let parsed: Event = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.event_type, EventType::TemplateGenerated);
        assert_eq!(parsed.template, Some(TemplateId::Chair));
        assert_eq!(parsed.duration_ms, Some(12));
        assert!(!parsed.is_degradation());
    }

    #[test]
    fn test_skip_is_degradation() {
        let event = Event::new(
            Uuid::new_v4(),
            Phase::Instantiation,
            Some(TemplateId::Floral),
            EventType::TemplateSkipped,
            "floral skipped".to_string(),
            PhaseStatus::Skipped,
        )
        .with_error("boom".to_string());

        assert!(event.is_degradation());
        assert_eq!(event.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_phase_order() {
        assert!(Phase::StrategySelection < Phase::Instantiation);
        assert_eq!(Phase::ALL.len(), 9);
        assert_eq!(Phase::SceneAssembly.to_string(), "scene-assembly");
    }
}
