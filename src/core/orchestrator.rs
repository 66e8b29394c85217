//! Main orchestrator for event scene generation.
//!
//! Runs the nine phases in strict sequence, checks limits and cancellation
//! at every boundary between them, and journals what happened.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{CulturalKnowledgeBase, StaticKnowledgeBase};
use crate::domain::{
    CulturalFramework, Event, EventOrchestrationParameters, EventType, MasterPlan,
    OrchestrationResult, Phase, PhaseStatus, ResultMetadata, TemplateId, TemplateParams,
    TemplateStrategy,
};

use super::assembly::SceneAssembler;
use super::culture::{CompatibilityTable, CulturalFrameworkBuilder};
use super::error::{FailureCause, OrchestrationError, ValidationError};
use super::integration::EcosystemIntegrator;
use super::limits::{CancellationFlag, LimitViolation, OrchestrationLimits, RetryPolicy, RunTracker};
use super::planner::MasterPlanner;
use super::registry::TemplateRegistry;
use super::relationships::{RelationshipError, RelationshipGraph};
use super::report::{QualityAssuranceReporter, ReportInputs};
use super::scheduler::InstantiationScheduler;
use super::strategy::TemplateStrategySelector;
use super::synthesis::ParameterSynthesizer;
use super::validation::{ExperienceValidator, ScoringThresholds};

/// Tunables handed to every run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorSettings {
    #[serde(default)]
    pub limits: OrchestrationLimits,
    #[serde(default)]
    pub scoring: ScoringThresholds,
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Required templates whose failure is skipped instead of fatal
    #[serde(default)]
    pub non_critical: Vec<TemplateId>,
}

/// Phases 1–4 of a run: everything decided before any generator is called
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanPreview {
    pub framework: CulturalFramework,
    pub plan: MasterPlan,
    pub strategy: TemplateStrategy,
    pub records: IndexMap<TemplateId, TemplateParams>,
}

/// Main event orchestrator
pub struct Orchestrator {
    registry: Arc<TemplateRegistry>,
    graph: Arc<RelationshipGraph>,
    frameworks: CulturalFrameworkBuilder,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    /// Create an orchestrator; every graph edge must name a registered template
    pub fn new(
        registry: Arc<TemplateRegistry>,
        graph: Arc<RelationshipGraph>,
        knowledge: Arc<dyn CulturalKnowledgeBase>,
        compatibility: Arc<CompatibilityTable>,
        settings: OrchestratorSettings,
    ) -> Result<Self, RelationshipError> {
        graph.validate_against(&registry)?;
        Ok(Self {
            registry,
            graph,
            frameworks: CulturalFrameworkBuilder::new(knowledge, compatibility),
            settings,
        })
    }

    /// Reference generators, the built-in graph and knowledge base
    pub fn with_reference_generators(
        settings: OrchestratorSettings,
        compatibility: CompatibilityTable,
    ) -> Result<Self, RelationshipError> {
        Self::new(
            Arc::new(TemplateRegistry::with_reference_generators()),
            Arc::new(RelationshipGraph::default()),
            Arc::new(StaticKnowledgeBase::new()),
            Arc::new(compatibility),
            settings,
        )
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    pub fn graph(&self) -> &RelationshipGraph {
        &self.graph
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Run the full pipeline
    pub async fn run(
        &self,
        params: &EventOrchestrationParameters,
    ) -> Result<OrchestrationResult, OrchestrationError> {
        self.run_with_cancel(params, CancellationFlag::new()).await
    }

    /// Run the full pipeline; `cancel` is honoured at phase boundaries and
    /// between generator attempts
    #[instrument(skip_all, fields(event = %params.event.event_type, culture = %params.culture.primary))]
    pub async fn run_with_cancel(
        &self,
        params: &EventOrchestrationParameters,
        cancel: CancellationFlag,
    ) -> Result<OrchestrationResult, OrchestrationError> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let mut journal = Journal::new(run_id);
        let mut tracker = RunTracker::new(cancel.clone());
        info!(%run_id, guests = params.guests.total, "Starting orchestration");

        journal.push(
            Phase::CulturalFramework,
            EventType::RunStarted,
            format!("{} for {} guests", params.event.event_type, params.guests.total),
            PhaseStatus::Running,
        );

        let result = self
            .run_phases(run_id, params, &cancel, &mut tracker, &mut journal)
            .await;

        match result {
            Ok(mut result) => {
                result.metadata.generation_time_ms = started.elapsed().as_millis() as u64;
                journal.push(
                    Phase::QualityAssurance,
                    EventType::RunCompleted,
                    format!("{} component(s) assembled", result.components.len()),
                    PhaseStatus::Completed,
                );
                result.events = journal.into_events();
                info!(
                    %run_id,
                    components = result.components.len(),
                    duration_ms = result.metadata.generation_time_ms,
                    "Orchestration completed"
                );
                Ok(result)
            }
            Err(mut e) => {
                if e.is_cancelled() {
                    warn!(%run_id, phase = %e.phase, "Orchestration cancelled");
                } else {
                    error!(%run_id, phase = %e.phase, error = %e, "Orchestration failed");
                }
                if !journal.is_terminated() {
                    journal.fail(e.phase, EventType::RunFailed, e.to_string());
                }
                e.events = journal.into_events();
                Err(e)
            }
        }
    }

    /// Phases 1–4 only; no generator is invoked
    #[instrument(skip_all, fields(event = %params.event.event_type))]
    pub fn preview(&self, params: &EventOrchestrationParameters) -> Result<PlanPreview, OrchestrationError> {
        validate_input(params).map_err(|e| OrchestrationError::new(Phase::CulturalFramework, e))?;
        let framework = self
            .frameworks
            .build(&params.culture)
            .map_err(|e| OrchestrationError::new(Phase::CulturalFramework, e))?;
        let plan = self.planner().plan(params, &framework);
        let strategy = self
            .selector()
            .select(params, &framework, &plan, &self.graph)
            .map_err(|e| OrchestrationError::new(Phase::StrategySelection, e))?;
        let records = ParameterSynthesizer::new().synthesize_all(params, &plan, &framework, &strategy);
        Ok(PlanPreview {
            framework,
            plan,
            strategy,
            records,
        })
    }

    fn planner(&self) -> MasterPlanner {
        MasterPlanner::new(self.settings.limits.contingency_share())
    }

    fn selector(&self) -> TemplateStrategySelector {
        TemplateStrategySelector::new(self.settings.limits.contingency_share())
    }

    fn boundary(
        &self,
        tracker: &mut RunTracker,
        journal: &mut Journal,
        finished: Phase,
        next: Phase,
    ) -> Result<(), OrchestrationError> {
        journal.push(finished, EventType::PhaseCompleted, finished.to_string(), PhaseStatus::Completed);
        tracker.record_checkpoint();
        if let Err(violation) = self.settings.limits.check(tracker, next) {
            let event_type = if matches!(violation, LimitViolation::Cancelled { .. }) {
                EventType::Cancelled
            } else {
                EventType::RunFailed
            };
            journal.fail(next, event_type, violation.to_string());
            return Err(OrchestrationError::new(next, violation));
        }
        journal.push(next, EventType::PhaseStarted, next.to_string(), PhaseStatus::Running);
        debug!(phase = %next, elapsed_ms = tracker.elapsed_ms(), "Phase started");
        Ok(())
    }

    async fn run_phases(
        &self,
        run_id: Uuid,
        params: &EventOrchestrationParameters,
        cancel: &CancellationFlag,
        tracker: &mut RunTracker,
        journal: &mut Journal,
    ) -> Result<OrchestrationResult, OrchestrationError> {
        // 1. cultural framework
        journal.push(
            Phase::CulturalFramework,
            EventType::PhaseStarted,
            Phase::CulturalFramework.to_string(),
            PhaseStatus::Running,
        );
        let fingerprint = input_fingerprint(params)
            .map_err(|e| OrchestrationError::new(Phase::CulturalFramework, FailureCause::Configuration(e)))?;
        validate_input(params).map_err(|e| OrchestrationError::new(Phase::CulturalFramework, e))?;
        let framework = Arc::new(
            self.frameworks
                .build(&params.culture)
                .map_err(|e| OrchestrationError::new(Phase::CulturalFramework, e))?,
        );
        debug!(
            fusion = %framework.fusion.compatibility,
            multiplier = framework.fusion.multiplier,
            "Framework built"
        );

        // 2. master plan
        self.boundary(tracker, journal, Phase::CulturalFramework, Phase::MasterPlanning)?;
        let plan = self.planner().plan(params, &framework);

        // 3. strategy
        self.boundary(tracker, journal, Phase::MasterPlanning, Phase::StrategySelection)?;
        let strategy = self
            .selector()
            .select(params, &framework, &plan, &self.graph)
            .map_err(|e| OrchestrationError::new(Phase::StrategySelection, e))?;
        info!(
            required = strategy.required.len(),
            optional = strategy.optional.len(),
            contingency = strategy.contingency,
            "Strategy selected"
        );

        // 4. parameter synthesis
        self.boundary(tracker, journal, Phase::StrategySelection, Phase::ParameterSynthesis)?;
        let records = ParameterSynthesizer::new().synthesize_all(params, &plan, &framework, &strategy);

        // 5. instantiation
        self.boundary(tracker, journal, Phase::ParameterSynthesis, Phase::Instantiation)?;
        let scheduler = InstantiationScheduler::new(
            Arc::clone(&self.registry),
            &self.settings.limits,
            self.settings.retry.clone(),
        )
        .with_non_critical(self.settings.non_critical.iter().copied());
        let instantiation = scheduler
            .instantiate(run_id, &strategy, &records, cancel)
            .await
            .map_err(|e| OrchestrationError::new(Phase::Instantiation, e))?;
        tracker.generator_attempts += instantiation.reports.iter().map(|r| r.attempts).sum::<u32>();
        journal.extend(instantiation.events);
        let mut notes = instantiation.notes;
        let template_reports = instantiation.reports;
        let mut instances = instantiation.instances;

        // 6. integration
        self.boundary(tracker, journal, Phase::Instantiation, Phase::EcosystemIntegration)?;
        let integration = EcosystemIntegrator::new(
            Arc::clone(&self.graph),
            self.settings.limits.min_edge_strength,
        )
        .integrate(&mut instances, &framework, &plan, &strategy);
        for skipped in &integration.skipped {
            journal.push(
                Phase::EcosystemIntegration,
                EventType::AdjustmentSkipped,
                skipped.to_string(),
                PhaseStatus::Skipped,
            );
        }
        notes.extend(integration.notes.iter().cloned());

        // 7. validation
        self.boundary(tracker, journal, Phase::EcosystemIntegration, Phase::ExperienceValidation)?;
        let validation = ExperienceValidator::new(self.settings.scoring.clone())
            .validate(run_id, &mut instances, &framework, &plan);
        journal.extend(validation.events.iter().cloned());
        notes.extend(validation.notes.iter().cloned());

        // 8. assembly
        self.boundary(tracker, journal, Phase::ExperienceValidation, Phase::SceneAssembly)?;
        let scene = SceneAssembler::new().assemble(instances, params, &validation.scores, Utc::now());

        // 9. quality assurance
        self.boundary(tracker, journal, Phase::SceneAssembly, Phase::QualityAssurance)?;
        let report = QualityAssuranceReporter::new(
            Arc::clone(&self.graph),
            self.settings.limits.min_edge_strength,
            self.settings.scoring.clone(),
        )
        .report(&ReportInputs {
            scene: &scene,
            params,
            framework: &framework,
            plan: &plan,
            strategy: &strategy,
            validation: &validation.scores,
            integration: &integration,
            templates: &template_reports,
        });
        journal.push(
            Phase::QualityAssurance,
            EventType::PhaseCompleted,
            Phase::QualityAssurance.to_string(),
            PhaseStatus::Completed,
        );

        Ok(OrchestrationResult {
            run_id,
            scene,
            metadata: ResultMetadata {
                template_count: report.components.len(),
                scores: report.scores,
                budget_utilization: report.budget_utilization,
                generation_time_ms: 0,
            },
            components: report.components,
            recommendations: report.recommendations,
            cultural_notes: report.cultural_notes,
            notes,
            events: Vec::new(),
            input_fingerprint: fingerprint,
        })
    }
}

/// Reject inputs no plan can be made for
pub fn validate_input(params: &EventOrchestrationParameters) -> Result<(), ValidationError> {
    if params.guests.total == 0 {
        return Err(ValidationError::NoGuests);
    }
    let d = &params.venue.dimensions;
    if !(d.width > 0.0 && d.depth > 0.0 && d.height > 0.0) {
        return Err(ValidationError::InvalidVenue {
            width: d.width,
            depth: d.depth,
            height: d.height,
        });
    }
    if !(params.budget.total.is_finite() && params.budget.total > 0.0) {
        return Err(ValidationError::InvalidBudget(params.budget.total));
    }
    Ok(())
}

/// SHA-256 over the canonical JSON of the input, hex encoded
pub fn input_fingerprint(params: &EventOrchestrationParameters) -> Result<String, String> {
    let json = serde_json::to_vec(params).map_err(|e| e.to_string())?;
    let mut hasher = Sha256::new();
    hasher.update(&json);
    Ok(hex::encode(hasher.finalize()))
}

/// In-memory run journal
struct Journal {
    run_id: Uuid,
    events: Vec<Event>,
}

impl Journal {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            events: Vec::new(),
        }
    }

    fn push(&mut self, phase: Phase, event_type: EventType, summary: String, status: PhaseStatus) {
        self.events
            .push(Event::new(self.run_id, phase, None, event_type, summary, status));
    }

    fn fail(&mut self, phase: Phase, event_type: EventType, error: String) {
        let event = Event::new(self.run_id, phase, None, event_type, error.clone(), PhaseStatus::Failed);
        self.events.push(event.with_error(error));
    }

    fn is_terminated(&self) -> bool {
        self.events
            .last()
            .is_some_and(|e| matches!(e.event_type, EventType::RunFailed | EventType::Cancelled))
    }

    fn extend(&mut self, events: impl IntoIterator<Item = Event>) {
        self.events.extend(events);
    }

    fn into_events(self) -> Vec<Event> {
        self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::japanese_wedding;
    use crate::domain::{Culture, OrchestrationRun, RunState};

    fn orchestrator() -> Orchestrator {
        Orchestrator::with_reference_generators(OrchestratorSettings::default(), CompatibilityTable::default())
            .unwrap()
    }

    #[tokio::test]
    async fn test_full_run() {
        let result = orchestrator().run(&japanese_wedding()).await.unwrap();

        assert!(result.metadata.template_count >= 5);
        assert_eq!(result.components.len(), result.scene.children.len());
        let ranks: Vec<usize> = result.components.keys().map(|t| t.assembly_rank()).collect();
        assert!(ranks.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(result.input_fingerprint.len(), 64);
        assert!(result.metadata.budget_utilization > 0.0);

        let run = OrchestrationRun::from_events(&result.events).unwrap();
        assert_eq!(run.state, RunState::Completed);
        assert_eq!(run.phase_statuses.len(), Phase::ALL.len());
    }

    #[tokio::test]
    async fn test_forbidden_fusion_fails_before_generation() {
        let mut table = CompatibilityTable::default();
        table.set(
            Culture::Japanese,
            Culture::Italian,
            crate::domain::FusionCompatibility::Forbidden,
        );
        let orchestrator =
            Orchestrator::with_reference_generators(OrchestratorSettings::default(), table).unwrap();
        let params = japanese_wedding().with_fusion(vec![Culture::Italian]);

        let err = orchestrator.run(&params).await.unwrap_err();
        assert!(err.before_generation());
        assert!(matches!(
            err.cause,
            FailureCause::Validation(ValidationError::ForbiddenFusion { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancelled_run_stops_at_boundary() {
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let err = orchestrator()
            .run_with_cancel(&japanese_wedding(), cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(err.phase, Phase::MasterPlanning);
    }

    #[tokio::test]
    async fn test_cancelled_run_keeps_its_journal() {
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let err = orchestrator()
            .run_with_cancel(&japanese_wedding(), cancel)
            .await
            .unwrap_err();

        assert_eq!(err.events.first().map(|e| e.event_type), Some(EventType::RunStarted));
        let run = OrchestrationRun::from_events(&err.events).unwrap();
        assert_eq!(
            run.state,
            RunState::Cancelled {
                phase: Phase::MasterPlanning
            }
        );
        assert_eq!(run.phase_statuses.get(&Phase::CulturalFramework), Some(&PhaseStatus::Completed));
    }

    #[tokio::test]
    async fn test_failed_run_journal_folds_to_failure() {
        let mut params = japanese_wedding();
        params.guests.total = 0;
        let err = orchestrator().run(&params).await.unwrap_err();

        let run = OrchestrationRun::from_events(&err.events).unwrap();
        match run.state {
            RunState::Failed { phase, error } => {
                assert_eq!(phase, Phase::CulturalFramework);
                assert!(error.contains("guest count"));
            }
            other => panic!("unexpected state: {other:?}"),
        }
    }

    #[test]
    fn test_input_validation() {
        let mut params = japanese_wedding();
        params.guests.total = 0;
        assert_eq!(validate_input(&params), Err(ValidationError::NoGuests));

        let params = japanese_wedding().with_venue(crate::domain::VenueType::Indoor, 0.0, 10.0, 4.0);
        assert!(matches!(validate_input(&params), Err(ValidationError::InvalidVenue { .. })));

        let mut params = japanese_wedding();
        params.budget.total = f64::NAN;
        assert!(matches!(validate_input(&params), Err(ValidationError::InvalidBudget(_))));
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = input_fingerprint(&japanese_wedding()).unwrap();
        let b = input_fingerprint(&japanese_wedding()).unwrap();
        assert_eq!(a, b);

        let mut other = japanese_wedding();
        other.guests.total += 1;
        assert_ne!(a, input_fingerprint(&other).unwrap());
    }

    #[test]
    fn test_preview_invokes_no_generator() {
        let preview = orchestrator().preview(&japanese_wedding()).unwrap();
        assert_eq!(preview.records.len(), preview.strategy.selected().len());
    }

    #[test]
    fn test_unregistered_edge_is_rejected() {
        let result = Orchestrator::new(
            Arc::new(TemplateRegistry::new()),
            Arc::new(RelationshipGraph::default()),
            Arc::new(StaticKnowledgeBase::new()),
            Arc::new(CompatibilityTable::default()),
            OrchestratorSettings::default(),
        );
        assert!(matches!(result, Err(RelationshipError::Unregistered { .. })));
    }
}
