//! Error taxonomy for orchestration runs.
//!
//! Every fatal failure surfaces as a single [`OrchestrationError`] carrying the
//! phase it happened in. Recoverable failures (skipped templates, skipped
//! adjustments) never reach the caller as errors; they become notes.

use thiserror::Error;

use crate::adapters::GenerationError;
use crate::domain::{Culture, Event, Phase, TemplateId};

use super::limits::LimitViolation;

/// Fatal failure of a run
#[derive(Debug, Error)]
#[error("orchestration failed during {phase}: {cause}")]
pub struct OrchestrationError {
    pub phase: Phase,
    #[source]
    pub cause: FailureCause,
    /// Journal up to and including the terminal event; empty outside a run
    pub events: Vec<Event>,
}

impl OrchestrationError {
    pub fn new(phase: Phase, cause: impl Into<FailureCause>) -> Self {
        Self {
            phase,
            cause: cause.into(),
            events: Vec::new(),
        }
    }

    /// True when the run failed before any generator was invoked
    pub fn before_generation(&self) -> bool {
        self.phase < Phase::Instantiation
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self.cause,
            FailureCause::Limit(LimitViolation::Cancelled { .. })
        )
    }
}

#[derive(Debug, Error)]
pub enum FailureCause {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Generation(#[from] TemplateGenerationError),

    #[error(transparent)]
    Budget(#[from] BudgetAllocationError),

    #[error(transparent)]
    Limit(#[from] LimitViolation),

    #[error("invalid orchestrator setup: {0}")]
    Configuration(String),
}

/// Input rejected before generation
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("culture fusion {primary} + {secondary} is forbidden")]
    ForbiddenFusion { primary: Culture, secondary: Culture },

    #[error("guest count must be positive")]
    NoGuests,

    #[error("venue dimensions must be positive, got {width} x {depth} x {height}")]
    InvalidVenue { width: f64, depth: f64, height: f64 },

    #[error("budget must be positive, got {0}")]
    InvalidBudget(f64),
}

/// A generator failed after all attempts and fallbacks
#[derive(Debug, Error)]
#[error("template {template} failed after {attempts} attempt(s): {source}")]
pub struct TemplateGenerationError {
    pub template: TemplateId,
    pub attempts: u32,
    #[source]
    pub source: GenerationError,
}

/// Required minimums exceed the total budget
#[derive(Debug, Clone, Error, PartialEq)]
#[error(
    "budget {available:.2} cannot cover required minimums {required_minimum:.2} (short by {:.2})",
    .required_minimum - .available
)]
pub struct BudgetAllocationError {
    pub available: f64,
    pub required_minimum: f64,
    /// How far each required template falls short of its minimum
    pub shortfall: Vec<(TemplateId, f64)>,
}

/// An adjustment could not be applied; recovered by skipping it
#[derive(Debug, Clone, Error, PartialEq)]
pub enum IntegrationError {
    #[error("{pass} pass: {primary} -> {secondary} references missing component {missing}")]
    MissingComponent {
        pass: &'static str,
        primary: TemplateId,
        secondary: TemplateId,
        missing: TemplateId,
    },

    #[error("{pass} pass: anchor {anchor} out of range for {template}")]
    DanglingAnchor {
        pass: &'static str,
        template: TemplateId,
        anchor: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_before_generation() {
        let err = OrchestrationError::new(
            Phase::CulturalFramework,
            ValidationError::ForbiddenFusion {
                primary: Culture::Japanese,
                secondary: Culture::Italian,
            },
        );
        assert!(err.before_generation());
        assert!(err.to_string().contains("cultural-framework"));

        let err = OrchestrationError::new(
            Phase::EcosystemIntegration,
            LimitViolation::Cancelled {
                before: Phase::EcosystemIntegration,
            },
        );
        assert!(!err.before_generation());
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_budget_error_message() {
        let err = BudgetAllocationError {
            available: 900.0,
            required_minimum: 1200.0,
            shortfall: vec![(TemplateId::Chair, 700.0), (TemplateId::Table, 500.0)],
        };
        assert!(err.to_string().contains("short by 300.00"));
    }
}
