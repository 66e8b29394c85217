//! Quality assurance report.
//!
//! Turns the assembled scene and everything learned along the way into the
//! final scores, ranked recommendations and cultural notes.

use std::collections::BTreeSet;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::domain::{
    tags, CulturalFramework, Effort, EventOrchestrationParameters, MasterPlan, QualityScores,
    Recommendation, RecommendationKind, RecommendationPriority, SceneFragment, TemplateId,
    TemplateStrategy,
};

use super::assembly::component_template;
use super::integration::{IntegrationReport, EXPERIENCE_ARC};
use super::planner::MAX_ZONE_SHARE;
use super::relationships::{RelationshipGraph, RelationshipKind};
use super::scheduler::TemplateReport;
use super::strategy::{minimum_cost, serves_goals};
use super::validation::{ScoringThresholds, ValidationScores};

/// Points lost per fixed element intruding on the egress spine
const EGRESS_PENALTY: f64 = 5.0;

/// Utilization under which leftover budget is worth a recommendation
const UNDERSPEND_RATIO: f64 = 0.7;

/// Everything the reporter reads
pub struct ReportInputs<'a> {
    pub scene: &'a SceneFragment,
    pub params: &'a EventOrchestrationParameters,
    pub framework: &'a CulturalFramework,
    pub plan: &'a MasterPlan,
    pub strategy: &'a TemplateStrategy,
    pub validation: &'a ValidationScores,
    pub integration: &'a IntegrationReport,
    pub templates: &'a [TemplateReport],
}

#[derive(Debug, Clone)]
pub struct QualityReport {
    pub components: IndexMap<TemplateId, SceneFragment>,
    pub scores: QualityScores,
    pub budget_utilization: f64,
    pub recommendations: Vec<Recommendation>,
    pub cultural_notes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct QualityAssuranceReporter {
    graph: Arc<RelationshipGraph>,
    min_edge_strength: f64,
    thresholds: ScoringThresholds,
}

impl QualityAssuranceReporter {
    pub fn new(graph: Arc<RelationshipGraph>, min_edge_strength: f64, thresholds: ScoringThresholds) -> Self {
        Self {
            graph,
            min_edge_strength,
            thresholds,
        }
    }

    pub fn report(&self, inputs: &ReportInputs<'_>) -> QualityReport {
        let components = extract_components(inputs.scene);
        let present: BTreeSet<TemplateId> = components.keys().copied().collect();

        let scores = QualityScores {
            cultural_authenticity: inputs.validation.cultural_authenticity,
            accessibility: inputs.validation.accessibility,
            sustainability: inputs.validation.sustainability,
            experience: experience_score(inputs.scene, inputs.params, &present),
            spatial_efficiency: spatial_efficiency(inputs.plan, inputs.integration),
            technical_integration: self.technical_integration(inputs.scene, inputs.strategy),
        };

        let allocated = inputs.strategy.total_allocated();
        let spent = spent(inputs.scene);
        let budget_utilization = if allocated > 0.0 { spent / allocated } else { 0.0 };

        let mut recommendations = self.recommendations(inputs, &scores, spent, allocated);
        // stable: equal priorities keep the order they were raised in
        recommendations.sort_by_key(|r| r.priority);

        let cultural_notes = cultural_notes(inputs.framework);

        debug!(
            components = components.len(),
            recommendations = recommendations.len(),
            utilization = budget_utilization,
            "Quality report ready"
        );

        QualityReport {
            components,
            scores,
            budget_utilization,
            recommendations,
            cultural_notes,
        }
    }

    /// Share of selected integrates-with edges whose control link landed
    pub fn technical_integration(&self, scene: &SceneFragment, strategy: &TemplateStrategy) -> f64 {
        let edges: Vec<_> = self
            .graph
            .edges_of(RelationshipKind::IntegratesWith, self.min_edge_strength)
            .filter(|e| strategy.is_selected(e.primary) && strategy.is_selected(e.secondary))
            .collect();
        if edges.is_empty() {
            return 100.0;
        }

        let satisfied = edges
            .iter()
            .filter(|e| {
                let channel = e.control_channel.as_deref().unwrap_or("control");
                let link = format!("{}:{}", e.secondary, channel);
                scene.children.iter().any(|component| {
                    component_template(component) == Some(e.primary)
                        && component
                            .children
                            .iter()
                            .any(|f| f.tag_strings(tags::CONTROL_LINKS).contains(&link))
                })
            })
            .count();
        100.0 * satisfied as f64 / edges.len() as f64
    }

    fn recommendations(
        &self,
        inputs: &ReportInputs<'_>,
        scores: &QualityScores,
        spent: f64,
        allocated: f64,
    ) -> Vec<Recommendation> {
        let mut out = Vec::new();
        let guests = inputs.params.guests.total;

        for report in inputs.templates {
            if let Some(error) = &report.error {
                out.push(Recommendation {
                    priority: RecommendationPriority::High,
                    kind: kind_for(report.template),
                    title: format!("Restore the {} component", report.template),
                    benefit: format!("{} was left out of the scene: {}", report.template, error),
                    effort: Effort::Medium,
                    estimated_cost: inputs
                        .strategy
                        .allocation_of(report.template)
                        .unwrap_or_else(|| minimum_cost(report.template, guests)),
                });
            } else if report.used_fallback {
                out.push(Recommendation {
                    priority: RecommendationPriority::Medium,
                    kind: kind_for(report.template),
                    title: format!("Review the fallback {} layout", report.template),
                    benefit: "the primary generator failed; a simpler layout was used".to_string(),
                    effort: Effort::Low,
                    estimated_cost: 0.0,
                });
            }
        }

        if inputs.integration.egress_conflicts > 0 {
            out.push(Recommendation {
                priority: RecommendationPriority::High,
                kind: RecommendationKind::Accessibility,
                title: "Clear the main egress route".to_string(),
                benefit: format!(
                    "{} fixed element(s) narrow the primary spine",
                    inputs.integration.egress_conflicts
                ),
                effort: Effort::Medium,
                estimated_cost: 0.0,
            });
        }

        if scores.cultural_authenticity < 90.0 {
            let missing: Vec<&str> = inputs
                .framework
                .authenticity
                .must_have
                .iter()
                .filter(|e| !scene_carries(inputs.scene, &e.name))
                .map(|e| e.name.as_str())
                .collect();
            out.push(Recommendation {
                priority: threshold_priority(scores.cultural_authenticity, self.thresholds.cultural),
                kind: RecommendationKind::Cultural,
                title: "Strengthen cultural authenticity".to_string(),
                benefit: if missing.is_empty() {
                    "guests recognise the traditions being honoured".to_string()
                } else {
                    format!("add {}", missing.join(", "))
                },
                effort: Effort::Medium,
                estimated_cost: 250.0 * missing.len().max(1) as f64,
            });
        }

        if !inputs.framework.fusion.issues.is_empty() {
            out.push(Recommendation {
                priority: RecommendationPriority::Medium,
                kind: RecommendationKind::Cultural,
                title: "Bridge the fused traditions".to_string(),
                benefit: if inputs.framework.fusion.bridging_elements.is_empty() {
                    inputs.framework.fusion.issues.join("; ")
                } else {
                    format!("use {}", inputs.framework.fusion.bridging_elements.join(", "))
                },
                effort: Effort::Medium,
                estimated_cost: 500.0,
            });
        }

        if scores.accessibility < 90.0 {
            out.push(Recommendation {
                priority: threshold_priority(scores.accessibility, self.thresholds.accessibility),
                kind: RecommendationKind::Accessibility,
                title: "Improve step-free access".to_string(),
                benefit: "accessible routes and seating for every guest".to_string(),
                effort: Effort::Low,
                estimated_cost: 150.0 * inputs.plan.accessibility.wheelchair_positions as f64,
            });
        }

        if scores.sustainability < 80.0 {
            out.push(Recommendation {
                priority: threshold_priority(scores.sustainability, self.thresholds.sustainability),
                kind: RecommendationKind::Sustainability,
                title: "Source sustainable materials".to_string(),
                benefit: format!(
                    "prefer {}",
                    inputs.plan.sustainability.preferred_materials.join(", ")
                ),
                effort: Effort::Medium,
                estimated_cost: 0.05 * allocated,
            });
        }

        for advisory in &inputs.plan.advisories {
            out.push(Recommendation {
                priority: RecommendationPriority::Medium,
                kind: RecommendationKind::Enhancement,
                title: "Resolve a planning advisory".to_string(),
                benefit: advisory.clone(),
                effort: Effort::Medium,
                estimated_cost: 0.0,
            });
        }

        if scores.experience < 75.0 {
            out.push(Recommendation {
                priority: RecommendationPriority::Low,
                kind: RecommendationKind::Enhancement,
                title: "Round out the guest journey".to_string(),
                benefit: "cover every stage from arrival to celebration".to_string(),
                effort: Effort::Medium,
                estimated_cost: 0.0,
            });
        }

        if allocated > 0.0 && spent / allocated < UNDERSPEND_RATIO {
            out.push(Recommendation {
                priority: RecommendationPriority::Low,
                kind: RecommendationKind::Enhancement,
                title: "Put the unspent allocation to work".to_string(),
                benefit: format!("{:.0} of the allocation is unused", allocated - spent),
                effort: Effort::Low,
                estimated_cost: allocated - spent,
            });
        }

        out
    }
}

/// Component sub-fragments of an assembled scene, in draw order
pub fn extract_components(scene: &SceneFragment) -> IndexMap<TemplateId, SceneFragment> {
    scene
        .children
        .iter()
        .filter_map(|c| component_template(c).map(|t| (t, c.clone())))
        .collect()
}

/// 60 for arc coverage, 40 for templates that serve the event's goals
pub fn experience_score(
    scene: &SceneFragment,
    params: &EventOrchestrationParameters,
    present: &BTreeSet<TemplateId>,
) -> f64 {
    let mut stages = BTreeSet::new();
    scene.walk(&mut |fragment| {
        if let Some(stage) = fragment.tag_str(tags::EXPERIENCE_STAGE) {
            stages.insert(stage.to_string());
        }
    });
    let covered = EXPERIENCE_ARC
        .iter()
        .filter(|(stage, _)| stages.contains(*stage))
        .count();
    let coverage = covered as f64 / EXPERIENCE_ARC.len() as f64;

    let goals: Vec<TemplateId> = TemplateId::ASSEMBLY_ORDER
        .iter()
        .copied()
        .filter(|t| serves_goals(params, *t))
        .collect();
    let fulfilment = if goals.is_empty() {
        1.0
    } else {
        goals.iter().filter(|t| present.contains(t)).count() as f64 / goals.len() as f64
    };

    60.0 * coverage + 40.0 * fulfilment
}

/// Zoned share of the usable floor against the zoning cap, less egress penalties
pub fn spatial_efficiency(plan: &MasterPlan, integration: &IntegrationReport) -> f64 {
    if plan.usable_area_m2 <= 0.0 {
        return 0.0;
    }
    let share = plan.allocated_area_m2 / plan.usable_area_m2;
    let base = 100.0 * (share / MAX_ZONE_SHARE).min(1.0);
    (base - EGRESS_PENALTY * integration.egress_conflicts as f64).clamp(0.0, 100.0)
}

/// Sum of item costs across the top-level fragments of every component
pub fn spent(scene: &SceneFragment) -> f64 {
    scene
        .children
        .iter()
        .flat_map(|component| component.children.iter())
        .filter_map(|f| f.tag_f64(tags::ESTIMATED_COST))
        .sum()
}

pub fn cultural_notes(framework: &CulturalFramework) -> Vec<String> {
    let mut notes: Vec<String> = framework
        .ceremony_protocols
        .iter()
        .map(|p| format!("{} ({}): {}", p.name, p.culture, p.description))
        .collect();
    notes.extend(framework.fusion.issues.iter().map(|i| format!("fusion: {}", i)));
    notes.extend(
        framework
            .fusion
            .bridging_elements
            .iter()
            .map(|b| format!("bridging element: {}", b)),
    );
    notes
}

fn scene_carries(scene: &SceneFragment, name: &str) -> bool {
    let mut found = false;
    scene.walk(&mut |fragment| {
        if !found {
            found = fragment.tag_strings(tags::CULTURAL_ELEMENTS).iter().any(|e| e == name);
        }
    });
    found
}

fn threshold_priority(score: f64, threshold: f64) -> RecommendationPriority {
    if score < threshold {
        RecommendationPriority::High
    } else {
        RecommendationPriority::Medium
    }
}

fn kind_for(template: TemplateId) -> RecommendationKind {
    match template {
        TemplateId::Security | TemplateId::Climate => RecommendationKind::Accessibility,
        TemplateId::Landscape => RecommendationKind::Sustainability,
        TemplateId::Floral => RecommendationKind::Cultural,
        _ => RecommendationKind::Enhancement,
    }
}
