//! Template selection, priorities and budget allocation.

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::domain::{
    Atmosphere, CulturalFramework, EventKind, EventOrchestrationParameters, MasterPlan,
    MemorabilityGoal, Season, SecurityLevel, TemplateId, TemplateStrategy, VenueType,
};

use super::error::BudgetAllocationError;
use super::relationships::RelationshipGraph;

const REQUIRED_BASE_PRIORITY: u32 = 60;
const OPTIONAL_BASE_PRIORITY: u32 = 30;

/// Budget per guest, bucketed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetTier {
    Economy,
    Standard,
    Premium,
}

impl BudgetTier {
    pub fn of(params: &EventOrchestrationParameters) -> Self {
        let per_guest = params.budget.total / f64::from(params.guests.total.max(1));
        if per_guest < 150.0 {
            BudgetTier::Economy
        } else if per_guest < 400.0 {
            BudgetTier::Standard
        } else {
            BudgetTier::Premium
        }
    }
}

/// Cheapest acceptable spend on a template for a guest count
pub fn minimum_cost(template: TemplateId, guests: u32) -> f64 {
    let guests = f64::from(guests);
    match template {
        TemplateId::Chair => 8.0 * guests,
        TemplateId::Table => 30.0 * (guests / 8.0).ceil(),
        TemplateId::Lighting => 400.0,
        TemplateId::Floral => 250.0,
        TemplateId::Stage => 800.0,
        TemplateId::Audiovisual => 600.0,
        TemplateId::Climate => 500.0,
        TemplateId::Security => 200.0 + 2.0 * guests,
        TemplateId::Landscape => 300.0,
        TemplateId::Structure => 1500.0 + 5.0 * guests,
        TemplateId::Interactive => 500.0,
        TemplateId::Celebratory => 200.0,
    }
}

/// Templates every run of this kind needs, in declaration order
pub fn required_templates(params: &EventOrchestrationParameters) -> Vec<TemplateId> {
    use TemplateId::*;

    let mut required: IndexSet<TemplateId> = [Chair, Table].into_iter().collect();
    let by_event: &[TemplateId] = match params.event.event_type {
        EventKind::Wedding => &[Floral, Lighting, Stage],
        EventKind::Corporate => &[Lighting, Audiovisual, Stage],
        EventKind::Conference => &[Audiovisual, Lighting, Stage],
        EventKind::Birthday => &[Lighting],
        EventKind::Gala => &[Lighting, Floral, Stage, Audiovisual],
        EventKind::Cultural => &[Floral, Lighting, Stage],
    };
    required.extend(by_event.iter().copied());

    match params.venue.venue_type {
        VenueType::Outdoor => required.extend([Climate, Structure]),
        VenueType::Hybrid => {
            required.insert(Climate);
        }
        VenueType::Indoor => {}
    }
    if params.guests.total > 100
        || matches!(
            params.security.level,
            SecurityLevel::Elevated | SecurityLevel::Maximum
        )
    {
        required.insert(Security);
    }

    required.into_iter().collect()
}

/// Templates worth adding when budget and goals allow, never repeating a
/// required one
pub fn optional_templates(
    params: &EventOrchestrationParameters,
    required: &[TemplateId],
) -> Vec<TemplateId> {
    use TemplateId::*;

    let mut optional = IndexSet::new();
    if params.budget.total > 50_000.0 {
        optional.extend([Interactive, Landscape]);
    }
    if params.experience.memorability == Some(MemorabilityGoal::ImmersiveExperience) {
        optional.insert(Interactive);
    }
    if params.experience.atmosphere == Atmosphere::Celebratory {
        optional.insert(Celebratory);
    }
    if params.venue.venue_type == VenueType::Outdoor && params.venue.climate.season != Season::Winter
    {
        optional.insert(Landscape);
    }
    if params.technology.audiovisual {
        optional.insert(Audiovisual);
    }

    optional.retain(|t| !required.contains(t));
    optional.into_iter().collect()
}

/// Whether the event's goals call for a template
pub fn serves_goals(params: &EventOrchestrationParameters, template: TemplateId) -> bool {
    use TemplateId::*;

    let by_atmosphere: &[TemplateId] = match params.experience.atmosphere {
        Atmosphere::Ceremonial => &[Floral, Stage],
        Atmosphere::Celebratory | Atmosphere::Festive => &[Celebratory, Lighting],
        Atmosphere::Intimate => &[Lighting, Table],
        Atmosphere::Professional => &[Audiovisual, Stage],
    };
    let by_memorability: &[TemplateId] = match params.experience.memorability {
        Some(MemorabilityGoal::Elegant) => &[Floral, Table],
        Some(MemorabilityGoal::Photogenic) => &[Lighting, Floral],
        Some(MemorabilityGoal::ImmersiveExperience) => &[Interactive, Audiovisual],
        None => &[],
    };
    by_atmosphere.contains(&template) || by_memorability.contains(&template)
}

fn tier_bonus(tier: BudgetTier, template: TemplateId) -> u32 {
    use crate::domain::BudgetCategory::*;
    let favoured = match tier {
        BudgetTier::Economy => matches!(template.category(), Furniture | Safety),
        BudgetTier::Standard => false,
        BudgetTier::Premium => matches!(template.category(), Decor | Lighting | Technology),
    };
    if favoured {
        10
    } else {
        0
    }
}

/// Deterministic priority of a selected template
pub fn priority(
    params: &EventOrchestrationParameters,
    framework: &CulturalFramework,
    template: TemplateId,
    required: bool,
) -> u32 {
    let base = if required {
        REQUIRED_BASE_PRIORITY
    } else {
        OPTIONAL_BASE_PRIORITY
    };
    let significance = (framework.significance(template) * 20.0).round() as u32;
    let goals = if serves_goals(params, template) { 10 } else { 0 };
    base + significance + goals + tier_bonus(BudgetTier::of(params), template)
}

fn cents(amount: f64) -> f64 {
    (amount * 100.0).floor() / 100.0
}

/// Decides which templates a run uses and what each may spend
#[derive(Debug, Clone)]
pub struct TemplateStrategySelector {
    contingency_share: f64,
}

impl TemplateStrategySelector {
    pub fn new(contingency_share: f64) -> Self {
        Self {
            contingency_share: contingency_share.clamp(0.0, 0.5),
        }
    }

    pub fn select(
        &self,
        params: &EventOrchestrationParameters,
        framework: &CulturalFramework,
        plan: &MasterPlan,
        graph: &RelationshipGraph,
    ) -> Result<TemplateStrategy, BudgetAllocationError> {
        let required = required_templates(params);
        let optional = optional_templates(params, &required);

        let mut strategy = TemplateStrategy {
            required,
            optional,
            ..Default::default()
        };
        let selected = strategy.selected();

        for template in &selected {
            let is_required = strategy.is_required(*template);
            strategy
                .priority
                .insert(*template, priority(params, framework, *template, is_required));
        }
        strategy.dependencies = graph.dependencies_among(&selected);

        let (allocation, contingency) = self.allocate(params, plan, &strategy)?;
        strategy.budget_allocation = allocation;
        strategy.contingency = contingency;

        debug!(
            required = strategy.required.len(),
            optional = strategy.optional.len(),
            allocated = strategy.total_allocated(),
            "Strategy selected"
        );
        Ok(strategy)
    }

    /// Minimums to required templates first, the rest by category share ×
    /// priority. The contingency shrinks before minimums go unmet.
    fn allocate(
        &self,
        params: &EventOrchestrationParameters,
        plan: &MasterPlan,
        strategy: &TemplateStrategy,
    ) -> Result<(IndexMap<TemplateId, f64>, f64), BudgetAllocationError> {
        let total = params.budget.total.max(0.0);
        let guests = params.guests.total;

        let minimums: Vec<(TemplateId, f64)> = strategy
            .required
            .iter()
            .map(|t| (*t, minimum_cost(*t, guests)))
            .collect();
        let required_minimum: f64 = minimums.iter().map(|(_, m)| m).sum();

        if required_minimum > total {
            let covered = if required_minimum > 0.0 {
                total / required_minimum
            } else {
                0.0
            };
            return Err(BudgetAllocationError {
                available: total,
                required_minimum,
                shortfall: minimums
                    .iter()
                    .map(|(t, m)| (*t, m * (1.0 - covered)))
                    .collect(),
            });
        }

        let contingency = (total * self.contingency_share).min(total - required_minimum);
        let remainder = (total - contingency - required_minimum).max(0.0);

        let selected = strategy.selected();
        let weight = |template: TemplateId| -> f64 {
            let siblings = selected
                .iter()
                .filter(|t| t.category() == template.category())
                .count()
                .max(1) as f64;
            plan.budget.share(template.category()) / siblings * f64::from(strategy.priority_of(template))
        };
        let mut weights: Vec<(TemplateId, f64)> = selected.iter().map(|t| (*t, weight(*t))).collect();
        let mut weight_sum: f64 = weights.iter().map(|(_, w)| w).sum();
        if weight_sum <= 0.0 {
            weights = selected
                .iter()
                .map(|t| (*t, f64::from(strategy.priority_of(*t))))
                .collect();
            weight_sum = weights.iter().map(|(_, w)| w).sum();
        }

        let mut allocation = IndexMap::with_capacity(selected.len());
        for (template, w) in weights {
            let minimum = if strategy.is_required(template) {
                minimum_cost(template, guests)
            } else {
                0.0
            };
            let share = if weight_sum > 0.0 {
                remainder * w / weight_sum
            } else {
                0.0
            };
            allocation.insert(template, cents(minimum + share));
        }

        Ok((allocation, contingency))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::StaticKnowledgeBase;
    use crate::core::culture::{CompatibilityTable, CulturalFrameworkBuilder};
    use crate::core::planner::MasterPlanner;
    use crate::domain::{Culture, VenueType};
    use proptest::prelude::*;
    use std::sync::Arc;

    fn select(params: &EventOrchestrationParameters) -> Result<TemplateStrategy, BudgetAllocationError> {
        let framework = CulturalFrameworkBuilder::new(
            Arc::new(StaticKnowledgeBase::new()),
            Arc::new(CompatibilityTable::default()),
        )
        .build(&params.culture)
        .unwrap();
        let plan = MasterPlanner::new(0.1).plan(params, &framework);
        TemplateStrategySelector::new(0.1).select(params, &framework, &plan, &RelationshipGraph::default())
    }

    #[test]
    fn test_wedding_requirements() {
        let params = EventOrchestrationParameters::new(EventKind::Wedding, Culture::Japanese, 80, 40_000.0);
        let required = required_templates(&params);
        for t in [
            TemplateId::Chair,
            TemplateId::Table,
            TemplateId::Floral,
            TemplateId::Lighting,
            TemplateId::Stage,
        ] {
            assert!(required.contains(&t), "{t}");
        }
        assert!(!required.contains(&TemplateId::Security));
    }

    #[test]
    fn test_venue_and_scale_additions() {
        let params = EventOrchestrationParameters::new(EventKind::Birthday, Culture::Modern, 150, 30_000.0)
            .with_venue(VenueType::Outdoor, 40.0, 30.0, 0.0);
        let required = required_templates(&params);
        assert_eq!(
            required,
            vec![
                TemplateId::Chair,
                TemplateId::Table,
                TemplateId::Lighting,
                TemplateId::Climate,
                TemplateId::Structure,
                TemplateId::Security
            ]
        );
        // outdoor in summer
        assert_eq!(optional_templates(&params, &required), vec![TemplateId::Landscape]);
    }

    #[test]
    fn test_optional_never_repeats_required() {
        let mut params = EventOrchestrationParameters::new(EventKind::Corporate, Culture::Modern, 60, 80_000.0);
        params.technology.audiovisual = true;
        params.experience.memorability = Some(MemorabilityGoal::ImmersiveExperience);
        let required = required_templates(&params);
        let optional = optional_templates(&params, &required);
        assert_eq!(optional, vec![TemplateId::Interactive, TemplateId::Landscape]);
        assert!(optional.iter().all(|t| !required.contains(t)));
    }

    #[test]
    fn test_required_outrank_optional() {
        let params = EventOrchestrationParameters::new(EventKind::Wedding, Culture::Japanese, 80, 90_000.0)
            .with_atmosphere(Atmosphere::Celebratory);
        let strategy = select(&params).unwrap();
        let lowest_required = strategy
            .required
            .iter()
            .map(|t| strategy.priority_of(*t))
            .min()
            .unwrap();
        for t in &strategy.optional {
            assert!(strategy.priority_of(*t) < lowest_required, "{t}");
        }
        // chairs only run after their tables
        assert_eq!(strategy.dependencies_of(TemplateId::Chair), &[TemplateId::Table]);
    }

    #[test]
    fn test_minimums_and_cents() {
        let params = EventOrchestrationParameters::new(EventKind::Wedding, Culture::Italian, 80, 12_345.67);
        let strategy = select(&params).unwrap();
        for t in &strategy.required {
            let amount = strategy.allocation_of(*t).unwrap();
            assert!(amount >= minimum_cost(*t, 80) - 0.01, "{t}");
            assert_eq!((amount * 100.0).round() / 100.0, amount);
        }
        assert!(strategy.total_allocated() + strategy.contingency <= 12_345.67 + 1e-6);
    }

    #[test]
    fn test_shortfall_is_fatal() {
        let params = EventOrchestrationParameters::new(EventKind::Gala, Culture::French, 200, 1_000.0);
        let err = select(&params).unwrap_err();
        assert_eq!(err.available, 1_000.0);
        assert!(err.required_minimum > 1_000.0);
        assert_eq!(err.shortfall.len(), required_templates(&params).len());
        let total_short: f64 = err.shortfall.iter().map(|(_, s)| s).sum();
        assert!((total_short - (err.required_minimum - 1_000.0)).abs() < 1e-6);
    }

    #[test]
    fn test_contingency_absorbs_tight_budgets() {
        let params = EventOrchestrationParameters::new(EventKind::Birthday, Culture::Modern, 10, 500.0);
        // chair 80 + table 60 + lighting 400 = 540 > 500
        assert!(select(&params).is_err());

        let params = EventOrchestrationParameters::new(EventKind::Birthday, Culture::Modern, 10, 560.0);
        let strategy = select(&params).unwrap();
        assert!(strategy.contingency <= 20.0 + 1e-9);
        assert!(strategy.total_allocated() <= 560.0);
    }

    proptest! {
        #[test]
        fn prop_allocation_never_exceeds_total(
            total in 1_000.0f64..500_000.0,
            guests in 1u32..400,
            kind in prop::sample::select(vec![
                EventKind::Wedding,
                EventKind::Corporate,
                EventKind::Conference,
                EventKind::Birthday,
                EventKind::Gala,
                EventKind::Cultural,
            ]),
            culture in prop::sample::select(Culture::ALL.to_vec()),
        ) {
            let params = EventOrchestrationParameters::new(kind, culture, guests, total);
            if let Ok(strategy) = select(&params) {
                prop_assert!(strategy.total_allocated() <= total);
            }
        }
    }
}
