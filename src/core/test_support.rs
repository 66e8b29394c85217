//! Shared fixtures for pipeline unit tests.

use std::sync::Arc;

use indexmap::IndexMap;
use uuid::Uuid;

use crate::adapters::StaticKnowledgeBase;
use crate::domain::{
    CulturalFramework, Culture, EventKind, EventOrchestrationParameters, MasterPlan, TemplateId,
    TemplateInstances, TemplateParams, TemplateStrategy,
};

use super::culture::{CompatibilityTable, CulturalFrameworkBuilder};
use super::limits::{CancellationFlag, OrchestrationLimits, RetryPolicy};
use super::planner::MasterPlanner;
use super::registry::TemplateRegistry;
use super::relationships::RelationshipGraph;
use super::scheduler::InstantiationScheduler;
use super::strategy::TemplateStrategySelector;
use super::synthesis::ParameterSynthesizer;

pub struct Fixture {
    pub params: EventOrchestrationParameters,
    pub framework: CulturalFramework,
    pub plan: MasterPlan,
    pub strategy: TemplateStrategy,
    pub records: IndexMap<TemplateId, TemplateParams>,
}

pub fn japanese_wedding() -> EventOrchestrationParameters {
    EventOrchestrationParameters::new(EventKind::Wedding, Culture::Japanese, 48, 40_000.0)
}

pub fn fixture(params: EventOrchestrationParameters) -> Fixture {
    let framework = CulturalFrameworkBuilder::new(
        Arc::new(StaticKnowledgeBase::new()),
        Arc::new(CompatibilityTable::default()),
    )
    .build(&params.culture)
    .unwrap();
    let plan = MasterPlanner::new(0.1).plan(&params, &framework);
    let strategy = TemplateStrategySelector::new(0.1)
        .select(&params, &framework, &plan, &RelationshipGraph::default())
        .unwrap();
    let records = ParameterSynthesizer::new().synthesize_all(&params, &plan, &framework, &strategy);
    Fixture {
        params,
        framework,
        plan,
        strategy,
        records,
    }
}

/// Run the reference generators over a fixture
pub async fn generate(fixture: &Fixture) -> TemplateInstances {
    InstantiationScheduler::new(
        Arc::new(TemplateRegistry::with_reference_generators()),
        &OrchestrationLimits::default(),
        RetryPolicy::none(),
    )
    .instantiate(
        Uuid::new_v4(),
        &fixture.strategy,
        &fixture.records,
        &CancellationFlag::new(),
    )
    .await
    .unwrap()
    .instances
}
