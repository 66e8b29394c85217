//! Cultural framework construction and fusion validation.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adapters::{CulturalKnowledgeBase, CulturalProfile};
use crate::domain::{
    AuthenticityGuidelines, ColorHarmony, CulturalFoundation, CulturalFramework,
    CulturalSensitivity, Culture, FusionAssessment, FusionCompatibility, MaterialCoherence,
    SpatialPrinciples,
};

use super::error::ValidationError;

const CHALLENGING_PENALTY: f64 = 0.85;
const CHALLENGING_PENALTY_HIGH: f64 = 0.75;
const NO_BRIDGE_PENALTY: f64 = 0.9;

/// One entry of the compatibility table, as written in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityOverride {
    pub cultures: (Culture, Culture),
    pub level: FusionCompatibility,
}

/// Compatibility per unordered culture pair
#[derive(Debug, Clone, PartialEq)]
pub struct CompatibilityTable {
    pairs: BTreeMap<(Culture, Culture), FusionCompatibility>,
}

fn pair_key(a: Culture, b: Culture) -> (Culture, Culture) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl Default for CompatibilityTable {
    fn default() -> Self {
        use Culture::*;
        use FusionCompatibility::*;

        let mut table = Self::empty();
        for (a, b, level) in [
            (Japanese, Scandinavian, Compatible),
            (Japanese, Modern, Compatible),
            (Scandinavian, Modern, Compatible),
            (Italian, French, Compatible),
            (French, Modern, Compatible),
            (Italian, Traditional, Compatible),
            (French, Traditional, Compatible),
            (Japanese, Italian, Challenging),
            (Japanese, French, Challenging),
            (Japanese, Traditional, Challenging),
            (Scandinavian, Italian, Challenging),
            (Traditional, Modern, Challenging),
        ] {
            table.set(a, b, level);
        }
        table
    }
}

impl CompatibilityTable {
    /// Table where every pair is compatible
    pub fn empty() -> Self {
        Self {
            pairs: BTreeMap::new(),
        }
    }

    /// Built-in table with overrides applied on top
    pub fn with_overrides(overrides: &[CompatibilityOverride]) -> Self {
        let mut table = Self::default();
        for o in overrides {
            table.set(o.cultures.0, o.cultures.1, o.level);
        }
        table
    }

    pub fn set(&mut self, a: Culture, b: Culture, level: FusionCompatibility) {
        if a != b {
            self.pairs.insert(pair_key(a, b), level);
        }
    }

    /// Compatibility of a pair; unlisted pairs and a culture with itself are compatible
    pub fn get(&self, a: Culture, b: Culture) -> FusionCompatibility {
        if a == b {
            return FusionCompatibility::Compatible;
        }
        self.pairs
            .get(&pair_key(a, b))
            .copied()
            .unwrap_or(FusionCompatibility::Compatible)
    }

    pub fn entries(&self) -> impl Iterator<Item = (Culture, Culture, FusionCompatibility)> + '_ {
        self.pairs.iter().map(|((a, b), level)| (*a, *b, *level))
    }
}

/// Derives the run's cultural framework
pub struct CulturalFrameworkBuilder {
    knowledge: Arc<dyn CulturalKnowledgeBase>,
    compatibility: Arc<CompatibilityTable>,
}

impl CulturalFrameworkBuilder {
    pub fn new(
        knowledge: Arc<dyn CulturalKnowledgeBase>,
        compatibility: Arc<CompatibilityTable>,
    ) -> Self {
        Self {
            knowledge,
            compatibility,
        }
    }

    /// Build the framework, rejecting forbidden fusions
    pub fn build(&self, culture: &CulturalFoundation) -> Result<CulturalFramework, ValidationError> {
        let secondary = dedupe_secondary(culture.primary, &culture.secondary);
        let primary = self.knowledge.profile(culture.primary);
        let others: Vec<CulturalProfile> =
            secondary.iter().map(|c| self.knowledge.profile(*c)).collect();

        let fusion = self.assess_fusion(&primary, &others, culture.sensitivity)?;
        debug!(
            primary = %culture.primary,
            secondary = secondary.len(),
            compatibility = %fusion.compatibility,
            multiplier = fusion.multiplier,
            "Fusion assessed"
        );

        let material_coherence = merge_materials(&primary, &others);
        let color_harmony = merge_colors(&primary, &others, culture.sensitivity);

        let mut ceremony_protocols = primary.traditions.ceremonies.clone();
        let mut must_have = primary.traditions.must_have.clone();
        let mut forbidden = primary.traditions.forbidden.clone();
        for other in &others {
            ceremony_protocols.extend(other.traditions.ceremonies.iter().cloned());
            // one signature element per secondary culture
            if let Some(element) = other.traditions.must_have.first() {
                if !must_have.iter().any(|e| e.name == element.name) {
                    must_have.push(element.clone());
                }
            }
            for item in &other.traditions.forbidden {
                if !forbidden.contains(item) {
                    forbidden.push(item.clone());
                }
            }
        }

        let spatial_principles = SpatialPrinciples {
            spacing_factor: primary.proportions.spacing_factor,
            circulation_modifier: primary.proportions.circulation_modifier,
            symmetry: primary.aesthetics.symmetry,
            floor_seating: primary.ergonomics.floor_seating_tradition
                && culture.sensitivity == CulturalSensitivity::High,
            guests_per_table: primary.proportions.guests_per_table,
            table_width_factor: primary.proportions.table_width_factor,
        };

        Ok(CulturalFramework {
            primary: culture.primary,
            secondary,
            sensitivity: culture.sensitivity,
            color_harmony,
            material_coherence,
            spatial_principles,
            ceremony_protocols,
            authenticity: AuthenticityGuidelines {
                must_have,
                forbidden,
            },
            fusion,
            floral_style: primary.aesthetics.floral_style.clone(),
        })
    }

    fn assess_fusion(
        &self,
        primary: &CulturalProfile,
        others: &[CulturalProfile],
        sensitivity: CulturalSensitivity,
    ) -> Result<FusionAssessment, ValidationError> {
        if others.is_empty() {
            return Ok(FusionAssessment::unfused());
        }

        let mut assessment = FusionAssessment::unfused();
        let mut bridging = BTreeSet::new();
        let penalty = match sensitivity {
            CulturalSensitivity::High => CHALLENGING_PENALTY_HIGH,
            _ => CHALLENGING_PENALTY,
        };

        let profiles: Vec<&CulturalProfile> =
            std::iter::once(primary).chain(others.iter()).collect();
        for (i, a) in profiles.iter().enumerate() {
            for b in &profiles[i + 1..] {
                let level = self.compatibility.get(a.culture, b.culture);
                match level {
                    FusionCompatibility::Forbidden => {
                        return Err(ValidationError::ForbiddenFusion {
                            primary: a.culture,
                            secondary: b.culture,
                        });
                    }
                    FusionCompatibility::Challenging => {
                        assessment.multiplier *= penalty;
                        assessment.issues.push(format!(
                            "{} and {} traditions pull in different directions; keep each in its own zone",
                            a.culture, b.culture
                        ));
                    }
                    FusionCompatibility::Compatible => {}
                }
                assessment.compatibility = assessment.compatibility.max(level);

                let shared: Vec<&String> = a
                    .materials
                    .preferred
                    .iter()
                    .filter(|m| b.materials.preferred.contains(m))
                    .collect();
                if shared.is_empty() {
                    assessment.multiplier *= NO_BRIDGE_PENALTY;
                    assessment.issues.push(format!(
                        "no shared material bridges {} and {}",
                        a.culture, b.culture
                    ));
                } else {
                    bridging.extend(shared.into_iter().cloned());
                }
            }
        }

        assessment.bridging_elements = bridging.into_iter().collect();
        Ok(assessment)
    }
}

fn dedupe_secondary(primary: Culture, secondary: &[Culture]) -> Vec<Culture> {
    let mut seen = Vec::new();
    for culture in secondary {
        if *culture != primary && !seen.contains(culture) {
            seen.push(*culture);
        }
    }
    seen
}

fn merge_materials(primary: &CulturalProfile, others: &[CulturalProfile]) -> MaterialCoherence {
    let mut avoided: Vec<String> = Vec::new();
    for profile in std::iter::once(primary).chain(others.iter()) {
        for material in &profile.materials.avoided {
            if !primary.materials.preferred.contains(material) && !avoided.contains(material) {
                avoided.push(material.clone());
            }
        }
    }

    let mut preferred = primary.materials.preferred.clone();
    for other in others {
        for material in &other.materials.preferred {
            if !preferred.contains(material) && !avoided.contains(material) {
                preferred.push(material.clone());
            }
        }
    }

    let mut substitutions = BTreeMap::new();
    // primary substitutions win
    for profile in others.iter().rev().chain(std::iter::once(primary)) {
        for (from, to) in &profile.materials.substitutions {
            substitutions.insert(from.clone(), to.clone());
        }
    }
    substitutions.retain(|from, to| avoided.contains(from) && !avoided.contains(to));

    MaterialCoherence {
        preferred,
        avoided,
        substitutions,
    }
}

fn merge_colors(
    primary: &CulturalProfile,
    others: &[CulturalProfile],
    sensitivity: CulturalSensitivity,
) -> ColorHarmony {
    let mut palette = primary.aesthetics.palette.clone();
    let mut accents = primary.aesthetics.accents.clone();
    for other in others {
        if let Some(color) = other.aesthetics.palette.first() {
            if !palette.contains(color) {
                palette.push(*color);
            }
        }
        for color in &other.aesthetics.accents {
            if !accents.contains(color) {
                accents.push(*color);
            }
        }
    }

    let tint_strength = match sensitivity {
        CulturalSensitivity::Relaxed => 0.3,
        CulturalSensitivity::Standard => 0.5,
        CulturalSensitivity::High => 0.7,
    };

    ColorHarmony {
        palette,
        accents,
        tint_strength,
        color_temperature_k: primary.aesthetics.color_temperature_k,
    }
}
