//! Run state and reconstruction from a journal.
//!
//! An `OrchestrationRun` summarizes one end-to-end execution of the pipeline.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::{Event, EventType, Phase, PhaseStatus};
use super::template::TemplateId;

/// Summary of an orchestration run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationRun {
    /// Unique identifier for this run
    pub id: Uuid,

    /// Current state of the run
    pub state: RunState,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run finished (if applicable)
    pub completed_at: Option<DateTime<Utc>>,

    /// Phase currently (or last) executing
    pub current_phase: Option<Phase>,

    /// Status of each phase reached so far
    pub phase_statuses: IndexMap<Phase, PhaseStatus>,

    /// Status of each template that was attempted
    pub template_statuses: IndexMap<TemplateId, PhaseStatus>,

    /// Number of recovered degradations
    pub degradations: usize,
}

impl OrchestrationRun {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            state: RunState::Running,
            started_at: Utc::now(),
            completed_at: None,
            current_phase: None,
            phase_statuses: IndexMap::new(),
            template_statuses: IndexMap::new(),
            degradations: 0,
        }
    }

    /// Reconstruct run state from a sequence of events
    pub fn from_events(events: &[Event]) -> Option<Self> {
        let first_event = events.first()?;

        let mut run = Self::new(first_event.run_id);
        run.started_at = first_event.timestamp;

        for event in events {
            run.apply_event(event);
        }

        Some(run)
    }

    /// Apply a single event to update run state
    pub fn apply_event(&mut self, event: &Event) {
        if event.is_degradation() {
            self.degradations += 1;
        }

        match event.event_type {
            EventType::RunStarted => {
                self.state = RunState::Running;
                self.started_at = event.timestamp;
            }
            EventType::RunCompleted => {
                self.state = RunState::Completed;
                self.completed_at = Some(event.timestamp);
            }
            EventType::RunFailed => {
                self.state = RunState::Failed {
                    phase: event.phase,
                    error: event.error.clone().unwrap_or_default(),
                };
                self.completed_at = Some(event.timestamp);
                self.phase_statuses.insert(event.phase, PhaseStatus::Failed);
            }
            EventType::Cancelled => {
                self.state = RunState::Cancelled { phase: event.phase };
                self.completed_at = Some(event.timestamp);
            }
            EventType::PhaseStarted => {
                self.current_phase = Some(event.phase);
                self.phase_statuses.insert(event.phase, PhaseStatus::Running);
            }
            EventType::PhaseCompleted => {
                self.phase_statuses
                    .insert(event.phase, PhaseStatus::Completed);
            }
            EventType::TemplateGenerated | EventType::FallbackUsed => {
                if let Some(template) = event.template {
                    self.template_statuses
                        .insert(template, PhaseStatus::Completed);
                }
            }
            EventType::TemplateRetrying => {
                if let Some(template) = event.template {
                    self.template_statuses
                        .insert(template, PhaseStatus::Running);
                }
            }
            EventType::TemplateSkipped => {
                if let Some(template) = event.template {
                    self.template_statuses
                        .insert(template, PhaseStatus::Skipped);
                }
            }
            EventType::AdjustmentSkipped | EventType::CorrectionApplied => {}
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, RunState::Running)
    }

    pub fn is_finished(&self) -> bool {
        !self.is_running()
    }

    /// Templates dropped from the scene
    pub fn skipped_templates(&self) -> Vec<TemplateId> {
        self.template_statuses
            .iter()
            .filter(|(_, s)| **s == PhaseStatus::Skipped)
            .map(|(t, _)| *t)
            .collect()
    }
}

/// State of an orchestration run
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum RunState {
    #[default]
    Running,
    Completed,
    Failed { phase: Phase, error: String },
    Cancelled { phase: Phase },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(run_id: Uuid, phase: Phase, template: Option<TemplateId>, event_type: EventType) -> Event {
        Event::new(
            run_id,
            phase,
            template,
            event_type,
            String::new(),
            PhaseStatus::Running,
        )
    }

    #[test]
    fn test_run_from_events() {
        let run_id = Uuid::new_v4();
        let events = vec![
            event(run_id, Phase::CulturalFramework, None, EventType::RunStarted),
            event(run_id, Phase::Instantiation, None, EventType::PhaseStarted),
            event(
                run_id,
                Phase::Instantiation,
                Some(TemplateId::Table),
                EventType::TemplateGenerated,
            ),
            event(
                run_id,
                Phase::Instantiation,
                Some(TemplateId::Floral),
                EventType::TemplateSkipped,
            ),
            event(run_id, Phase::Instantiation, None, EventType::PhaseCompleted),
            event(run_id, Phase::QualityAssurance, None, EventType::RunCompleted),
        ];

        let run = OrchestrationRun::from_events(&events).unwrap();

        assert_eq!(run.id, run_id);
        assert_eq!(run.state, RunState::Completed);
        assert_eq!(run.current_phase, Some(Phase::Instantiation));
        assert_eq!(run.phase_statuses[&Phase::Instantiation], PhaseStatus::Completed);
        assert_eq!(run.skipped_templates(), vec![TemplateId::Floral]);
        assert_eq!(run.degradations, 1);
        assert!(run.is_finished());
    }

    #[test]
    fn test_failed_run_records_phase() {
        let run_id = Uuid::new_v4();
        let events = vec![
            event(run_id, Phase::CulturalFramework, None, EventType::RunStarted),
            event(run_id, Phase::CulturalFramework, None, EventType::RunFailed)
                .with_error("forbidden fusion".to_string()),
        ];

        let run = OrchestrationRun::from_events(&events).unwrap();
        assert_eq!(
            run.state,
            RunState::Failed {
                phase: Phase::CulturalFramework,
                error: "forbidden fusion".to_string()
            }
        );
        assert!(OrchestrationRun::from_events(&[]).is_none());
    }
}
