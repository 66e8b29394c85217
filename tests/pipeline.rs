//! Pipeline Integration Tests
//!
//! End-to-end runs through the public orchestrator API, including generator
//! failures and fallbacks.

use std::sync::Arc;

use async_trait::async_trait;
use eventscape::adapters::{GenerationError, ReferenceGenerator, StaticKnowledgeBase, TemplateGenerator};
use eventscape::core::{
    CompatibilityTable, FailureCause, Orchestrator, OrchestratorSettings, RelationshipGraph,
    RetryPolicy, TemplateRegistry,
};
use eventscape::domain::{
    tags, Culture, EventKind, EventOrchestrationParameters, EventType, OrchestrationRun, Phase,
    RecommendationPriority, RunState, TemplateId, TemplateInstance, TemplateParams,
};

struct Unavailable(TemplateId);

#[async_trait]
impl TemplateGenerator for Unavailable {
    fn template(&self) -> TemplateId {
        self.0
    }

    async fn generate(&self, _params: &TemplateParams) -> Result<TemplateInstance, GenerationError> {
        Err(GenerationError::Failed("supplier unavailable".to_string()))
    }
}

fn wedding() -> EventOrchestrationParameters {
    EventOrchestrationParameters::new(EventKind::Wedding, Culture::Italian, 64, 45_000.0)
}

fn fast_settings(non_critical: Vec<TemplateId>) -> OrchestratorSettings {
    OrchestratorSettings {
        retry: RetryPolicy::none(),
        non_critical,
        ..Default::default()
    }
}

fn orchestrator_with(registry: TemplateRegistry, settings: OrchestratorSettings) -> Orchestrator {
    Orchestrator::new(
        Arc::new(registry),
        Arc::new(RelationshipGraph::default()),
        Arc::new(StaticKnowledgeBase::new()),
        Arc::new(CompatibilityTable::default()),
        settings,
    )
    .unwrap()
}

fn registry_failing(template: TemplateId) -> TemplateRegistry {
    let mut registry = TemplateRegistry::with_reference_generators();
    registry.register(Arc::new(Unavailable(template)));
    registry
}

#[tokio::test]
async fn test_full_run_produces_scene() {
    let orchestrator =
        Orchestrator::with_reference_generators(OrchestratorSettings::default(), CompatibilityTable::default())
            .unwrap();
    let result = tokio_test::assert_ok!(orchestrator.run(&wedding()).await);

    assert_eq!(result.scene.tag_str(tags::TYPE), Some("scene"));
    assert_eq!(result.scene.tag_str("eventType"), Some("wedding"));
    assert_eq!(result.scene.tag_u64("guestCount"), Some(64));
    for template in [
        TemplateId::Chair,
        TemplateId::Table,
        TemplateId::Floral,
        TemplateId::Lighting,
        TemplateId::Stage,
    ] {
        assert!(result.components.contains_key(&template), "{template}");
    }

    let scores = &result.metadata.scores;
    for score in [
        scores.cultural_authenticity,
        scores.accessibility,
        scores.sustainability,
        scores.experience,
        scores.spatial_efficiency,
        scores.technical_integration,
    ] {
        assert!((0.0..=100.0).contains(&score));
    }

    let run = OrchestrationRun::from_events(&result.events).unwrap();
    assert_eq!(run.state, RunState::Completed);
    assert!(run.skipped_templates().is_empty());
}

#[tokio::test]
async fn test_non_critical_failure_is_skipped() {
    let orchestrator = orchestrator_with(
        registry_failing(TemplateId::Floral),
        fast_settings(vec![TemplateId::Floral]),
    );
    let result = tokio_test::assert_ok!(orchestrator.run(&wedding()).await);

    assert!(!result.components.contains_key(&TemplateId::Floral));
    assert!(result.components.contains_key(&TemplateId::Chair));
    assert!(result.notes.iter().any(|n| n.contains("floral")));
    assert_eq!(
        result.recommendations.first().map(|r| r.priority),
        Some(RecommendationPriority::High)
    );

    let run = OrchestrationRun::from_events(&result.events).unwrap();
    assert_eq!(run.state, RunState::Completed);
    assert_eq!(run.skipped_templates(), vec![TemplateId::Floral]);
    assert!(run.degradations >= 1);
}

#[tokio::test]
async fn test_critical_failure_fails_the_run() {
    let orchestrator = orchestrator_with(registry_failing(TemplateId::Table), fast_settings(Vec::new()));
    let err = orchestrator.run(&wedding()).await.unwrap_err();

    assert_eq!(err.phase, Phase::Instantiation);
    assert!(!err.before_generation());
    match err.cause {
        FailureCause::Generation(e) => {
            assert_eq!(e.template, TemplateId::Table);
            assert_eq!(e.attempts, 1);
        }
        other => panic!("unexpected cause: {other}"),
    }
}

#[tokio::test]
async fn test_fallback_generator_rescues_template() {
    let mut registry = registry_failing(TemplateId::Lighting);
    registry.register_fallback(Arc::new(ReferenceGenerator::new(TemplateId::Lighting)));
    let orchestrator = orchestrator_with(registry, fast_settings(Vec::new()));

    let result = tokio_test::assert_ok!(orchestrator.run(&wedding()).await);
    assert!(result.components.contains_key(&TemplateId::Lighting));
    assert!(result
        .events
        .iter()
        .any(|e| e.event_type == EventType::FallbackUsed && e.template == Some(TemplateId::Lighting)));
    assert!(result
        .recommendations
        .iter()
        .any(|r| r.priority == RecommendationPriority::Medium && r.title.contains("lighting")));
}

#[tokio::test]
async fn test_result_serializes_as_camel_case() {
    let orchestrator =
        Orchestrator::with_reference_generators(OrchestratorSettings::default(), CompatibilityTable::default())
            .unwrap();
    let result = orchestrator.run(&wedding()).await.unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert!(json["runId"].is_string());
    assert!(json["metadata"]["scores"]["culturalAuthenticity"].is_number());
    assert!(json["inputFingerprint"].as_str().is_some_and(|s| s.len() == 64));
    assert_eq!(
        json["components"].as_object().map(|c| c.len()),
        Some(result.metadata.template_count)
    );
}
