//! Experience validation with bounded corrections.
//!
//! Scores the integrated scene for cultural authenticity, accessibility and
//! sustainability. A score under its threshold triggers exactly one
//! corrective pass, after which the score is taken as final.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{
    tags, CulturalFramework, Event, EventType, MasterPlan, Phase, PhaseStatus, SceneFragment,
    TemplateId, TemplateInstances, SUSTAINABLE_MATERIALS, UNSUSTAINABLE_MATERIALS,
};

use super::integration::{mark_wheelchair_positions, COMPANION_SEAT, WHEELCHAIR_POSITION};

/// Points lost per forbidden element found in the scene
const FORBIDDEN_PENALTY: f64 = 15.0;

/// Weight of a material that is neither listed sustainable nor unsustainable
const NEUTRAL_MATERIAL_WEIGHT: f64 = 0.6;

/// Score thresholds below which a corrective pass runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringThresholds {
    /// Cultural authenticity (default: 80)
    #[serde(default = "default_cultural")]
    pub cultural: f64,

    /// Accessibility (default: 80)
    #[serde(default = "default_accessibility")]
    pub accessibility: f64,

    /// Sustainability (default: 60)
    #[serde(default = "default_sustainability")]
    pub sustainability: f64,
}

fn default_cultural() -> f64 {
    80.0
}
fn default_accessibility() -> f64 {
    80.0
}
fn default_sustainability() -> f64 {
    60.0
}

impl Default for ScoringThresholds {
    fn default() -> Self {
        Self {
            cultural: default_cultural(),
            accessibility: default_accessibility(),
            sustainability: default_sustainability(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationScores {
    pub cultural_authenticity: f64,
    pub accessibility: f64,
    pub sustainability: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    pub scores: ValidationScores,
    /// Scores before any correction ran
    pub initial: ValidationScores,
    pub corrections: Vec<String>,
    pub notes: Vec<String>,
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Default)]
pub struct ExperienceValidator {
    thresholds: ScoringThresholds,
}

impl ExperienceValidator {
    pub fn new(thresholds: ScoringThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ScoringThresholds {
        &self.thresholds
    }

    pub fn validate(
        &self,
        run_id: Uuid,
        instances: &mut TemplateInstances,
        framework: &CulturalFramework,
        plan: &MasterPlan,
    ) -> ValidationOutcome {
        let mut outcome = ValidationOutcome {
            initial: ValidationScores {
                cultural_authenticity: cultural_score(instances, framework),
                accessibility: accessibility_score(instances, plan),
                sustainability: sustainability_score(instances),
            },
            ..Default::default()
        };
        outcome.scores = outcome.initial;

        if outcome.scores.cultural_authenticity < self.thresholds.cultural {
            let applied = correct_cultural(instances, framework, &mut outcome.notes);
            outcome.scores.cultural_authenticity = cultural_score(instances, framework);
            record(&mut outcome, run_id, "cultural", applied);
        }

        if outcome.scores.accessibility < self.thresholds.accessibility {
            let before = wheelchair_chairs(instances).len();
            let marked = mark_wheelchair_positions(
                instances,
                plan.entrance(),
                plan.accessibility.wheelchair_positions,
            );
            let applied = marked.saturating_sub(before) + mark_companion_seats(instances);
            outcome.scores.accessibility = accessibility_score(instances, plan);
            record(&mut outcome, run_id, "accessibility", applied);
        }

        if outcome.scores.sustainability < self.thresholds.sustainability {
            let replacement = plan
                .sustainability
                .preferred_materials
                .first()
                .map(String::as_str)
                .unwrap_or(SUSTAINABLE_MATERIALS[0]);
            let applied = swap_unsustainable(instances, replacement);
            outcome.scores.sustainability = sustainability_score(instances);
            record(&mut outcome, run_id, "sustainability", applied);
        }

        debug!(
            cultural = outcome.scores.cultural_authenticity,
            accessibility = outcome.scores.accessibility,
            sustainability = outcome.scores.sustainability,
            corrections = outcome.corrections.len(),
            "Experience validated"
        );
        outcome
    }
}

fn record(outcome: &mut ValidationOutcome, run_id: Uuid, area: &str, applied: usize) {
    if applied == 0 {
        outcome
            .notes
            .push(format!("{} correction found nothing it could change", area));
        return;
    }
    let summary = format!("{} correction touched {} fragment(s)", area, applied);
    info!(area, applied, "Correction applied");
    outcome.events.push(Event::new(
        run_id,
        Phase::ExperienceValidation,
        None,
        EventType::CorrectionApplied,
        summary.clone(),
        PhaseStatus::Completed,
    ));
    outcome.corrections.push(summary);
}

fn carries(instances: &TemplateInstances, name: &str) -> bool {
    let mut found = false;
    instances.walk(&mut |_, fragment| {
        if !found {
            found = fragment.tag_strings(tags::CULTURAL_ELEMENTS).iter().any(|e| e == name)
                || fragment.material.as_ref().is_some_and(|m| m.name == name);
        }
    });
    found
}

/// 100 × present / required, minus a penalty per forbidden element
pub fn cultural_score(instances: &TemplateInstances, framework: &CulturalFramework) -> f64 {
    let must_have = &framework.authenticity.must_have;
    let presence = if must_have.is_empty() {
        1.0
    } else {
        let present = must_have.iter().filter(|e| carries(instances, &e.name)).count();
        present as f64 / must_have.len() as f64
    };
    let forbidden = framework
        .authenticity
        .forbidden
        .iter()
        .filter(|f| carries(instances, f))
        .count();
    (100.0 * presence - FORBIDDEN_PENALTY * forbidden as f64).clamp(0.0, 100.0)
}

/// Attach missing elements to their carriers and strip forbidden ones
fn correct_cultural(
    instances: &mut TemplateInstances,
    framework: &CulturalFramework,
    notes: &mut Vec<String>,
) -> usize {
    let mut touched = 0;

    for element in &framework.authenticity.must_have {
        if carries(instances, &element.name) {
            continue;
        }
        let carrier = instances
            .get_mut(element.carrier)
            .and_then(|i| i.fragments_mut().first_mut());
        match carrier {
            Some(fragment) => {
                fragment.insert_tag_member(tags::CULTURAL_ELEMENTS, &element.name);
                touched += 1;
            }
            None => notes.push(format!(
                "{} could not be added: no {} in the scene",
                element.name, element.carrier
            )),
        }
    }

    for item in &framework.authenticity.forbidden {
        let replacement = forbidden_material_replacement(framework, item);
        for (_, instance) in instances.iter_mut() {
            instance.walk_mut(&mut |fragment| {
                if fragment.remove_tag_member(tags::CULTURAL_ELEMENTS, item) {
                    touched += 1;
                }
                if fragment.material.as_ref().is_some_and(|m| &m.name == item) {
                    replace_material(fragment, replacement);
                    touched += 1;
                }
            });
        }
    }
    touched
}

/// Substitution, else the first preferred material that is not itself forbidden
fn forbidden_material_replacement<'a>(framework: &'a CulturalFramework, item: &str) -> &'a str {
    let forbidden = &framework.authenticity.forbidden;
    let coherence = &framework.material_coherence;
    coherence
        .substitutions
        .get(item)
        .into_iter()
        .chain(coherence.preferred.iter())
        .map(String::as_str)
        .find(|m| !forbidden.iter().any(|f| f == m))
        .unwrap_or(SUSTAINABLE_MATERIALS[0])
}

/// Swap a fragment's material, remembering the first original
fn replace_material(fragment: &mut SceneFragment, replacement: &str) {
    let Some(material) = fragment.material.as_mut() else {
        return;
    };
    let original = std::mem::replace(&mut material.name, replacement.to_string());
    if fragment.tag("originalMaterial").is_none() {
        fragment.set_tag("originalMaterial", original);
    }
}

fn has_feature(fragment: &SceneFragment, feature: &str) -> bool {
    fragment
        .tag_strings(tags::ACCESSIBILITY_FEATURES)
        .iter()
        .any(|f| f == feature)
}

fn wheelchair_chairs(instances: &TemplateInstances) -> Vec<usize> {
    instances
        .get(TemplateId::Chair)
        .map(|chairs| {
            chairs
                .fragments()
                .iter()
                .enumerate()
                .filter(|(_, f)| has_feature(f, WHEELCHAIR_POSITION))
                .map(|(i, _)| i)
                .collect()
        })
        .unwrap_or_default()
}

/// Give every wheelchair position the nearest free chair as a companion
/// seat. Returns how many chairs were newly tagged.
pub fn mark_companion_seats(instances: &mut TemplateInstances) -> usize {
    let positions = wheelchair_chairs(instances);
    let Some(chairs) = instances.get_mut(TemplateId::Chair) else {
        return 0;
    };
    let fragments = chairs.fragments_mut();
    let companions = fragments.iter().filter(|f| has_feature(f, COMPANION_SEAT)).count();
    let mut added = 0;

    for index in positions.into_iter().skip(companions) {
        let origin = fragments[index].position();
        let nearest = fragments
            .iter()
            .enumerate()
            .filter(|(_, f)| !has_feature(f, WHEELCHAIR_POSITION) && !has_feature(f, COMPANION_SEAT))
            .map(|(i, f)| (i, f.position().planar_distance(&origin)))
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        let Some((companion, _)) = nearest else {
            break;
        };
        fragments[companion].insert_tag_member(tags::ACCESSIBILITY_FEATURES, COMPANION_SEAT);
        added += 1;
    }
    added
}

/// Marked wheelchair positions, accessible paths and companion seating
pub fn accessibility_score(instances: &TemplateInstances, plan: &MasterPlan) -> f64 {
    let wanted = plan.accessibility.wheelchair_positions;
    let (chairs, marked, companions) = instances
        .get(TemplateId::Chair)
        .map(|instance| {
            let fragments = instance.fragments();
            (
                fragments.len(),
                fragments.iter().filter(|f| has_feature(f, WHEELCHAIR_POSITION)).count(),
                fragments.iter().filter(|f| has_feature(f, COMPANION_SEAT)).count(),
            )
        })
        .unwrap_or((0, 0, 0));

    if chairs == 0 || wanted == 0 {
        return 100.0 * path_share(plan);
    }
    let positions = (marked as f64 / f64::from(wanted)).min(1.0);
    let seating = if marked == 0 {
        0.0
    } else {
        (companions as f64 / marked as f64).min(1.0)
    };

    (50.0 * positions + 30.0 * path_share(plan) + 20.0 * seating).clamp(0.0, 100.0)
}

fn path_share(plan: &MasterPlan) -> f64 {
    if plan.circulation.is_empty() {
        1.0
    } else {
        plan.circulation.iter().filter(|p| p.accessible).count() as f64 / plan.circulation.len() as f64
    }
}

fn material_weight(name: &str) -> f64 {
    if SUSTAINABLE_MATERIALS.contains(&name) {
        1.0
    } else if UNSUSTAINABLE_MATERIALS.contains(&name) {
        0.0
    } else {
        NEUTRAL_MATERIAL_WEIGHT
    }
}

/// Mean material weight over every fragment that has a material
pub fn sustainability_score(instances: &TemplateInstances) -> f64 {
    let mut total = 0.0;
    let mut count = 0usize;
    instances.walk(&mut |_, fragment| {
        if let Some(material) = &fragment.material {
            total += material_weight(&material.name);
            count += 1;
        }
    });
    if count == 0 {
        return 100.0;
    }
    100.0 * total / count as f64
}

fn swap_unsustainable(instances: &mut TemplateInstances, replacement: &str) -> usize {
    let mut swapped = 0;
    for (_, instance) in instances.iter_mut() {
        instance.walk_mut(&mut |fragment| {
            let unsustainable = fragment
                .material
                .as_ref()
                .is_some_and(|m| UNSUSTAINABLE_MATERIALS.contains(&m.name.as_str()));
            if !unsustainable {
                return;
            }
            replace_material(fragment, replacement);
            swapped += 1;
        });
    }
    swapped
}
