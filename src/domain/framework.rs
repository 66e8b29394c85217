//! The run-scoped cultural ruleset.
//!
//! A `CulturalFramework` is built once per run and shared read-only with every
//! downstream phase. It is the single source of truth for color, material,
//! spatial and ceremony decisions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::fragment::Rgb;
use super::params::{Culture, CulturalSensitivity};
use super::template::TemplateId;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CulturalFramework {
    pub primary: Culture,
    pub secondary: Vec<Culture>,
    pub sensitivity: CulturalSensitivity,
    pub color_harmony: ColorHarmony,
    pub material_coherence: MaterialCoherence,
    pub spatial_principles: SpatialPrinciples,
    pub ceremony_protocols: Vec<CeremonyProtocol>,
    pub authenticity: AuthenticityGuidelines,
    pub fusion: FusionAssessment,
    /// Floral design vocabulary of the primary culture
    pub floral_style: String,
}

impl CulturalFramework {
    /// Cultural weight of a template in this framework, 0–1.
    ///
    /// Templates anchoring ceremony protocols or carrying must-have elements
    /// matter more.
    pub fn significance(&self, template: TemplateId) -> f64 {
        let protocols = self
            .ceremony_protocols
            .iter()
            .filter(|p| p.anchor == template)
            .count() as f64;
        let elements = self
            .authenticity
            .must_have
            .iter()
            .filter(|e| e.carrier == template)
            .count() as f64;
        (protocols * 0.3 + elements * 0.2).min(1.0)
    }

    /// Must-have elements carried by a template
    pub fn elements_for(&self, template: TemplateId) -> Vec<&CulturalElement> {
        self.authenticity
            .must_have
            .iter()
            .filter(|e| e.carrier == template)
            .collect()
    }

    /// All cultures in play, primary first
    pub fn cultures(&self) -> Vec<Culture> {
        let mut cultures = vec![self.primary];
        cultures.extend(self.secondary.iter().copied());
        cultures
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorHarmony {
    pub palette: Vec<Rgb>,
    pub accents: Vec<Rgb>,
    /// How far material colors are pulled toward the palette, 0–1
    pub tint_strength: f64,
    pub color_temperature_k: f64,
}

impl ColorHarmony {
    /// Palette followed by accents
    pub fn full_palette(&self) -> Vec<Rgb> {
        self.palette
            .iter()
            .chain(self.accents.iter())
            .copied()
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialCoherence {
    pub preferred: Vec<String>,
    pub avoided: Vec<String>,
    /// avoided material → replacement
    pub substitutions: BTreeMap<String, String>,
}

impl MaterialCoherence {
    pub fn is_avoided(&self, material: &str) -> bool {
        self.avoided.iter().any(|m| m == material)
    }

    /// Replacement for an avoided material
    pub fn substitute(&self, material: &str) -> Option<&str> {
        if !self.is_avoided(material) {
            return None;
        }
        self.substitutions
            .get(material)
            .map(String::as_str)
            .or_else(|| self.preferred.first().map(String::as_str))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpatialPrinciples {
    /// Multiplier on personal spacing and clearances
    pub spacing_factor: f64,
    /// Multiplier on the primary circulation spine width
    pub circulation_modifier: f64,
    pub symmetry: Symmetry,
    pub floor_seating: bool,
    pub guests_per_table: u32,
    /// Multiplier on the nominal table width
    pub table_width_factor: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Symmetry {
    Symmetric,
    Asymmetric,
}

/// A ceremony custom the scene must make room for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CeremonyProtocol {
    pub name: String,
    pub description: String,
    pub culture: Culture,
    /// Template whose content hosts the ceremony
    pub anchor: TemplateId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticityGuidelines {
    pub must_have: Vec<CulturalElement>,
    pub forbidden: Vec<String>,
}

/// A named design element and the template expected to carry it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CulturalElement {
    pub name: String,
    pub carrier: TemplateId,
}

impl CulturalElement {
    pub fn new(name: impl Into<String>, carrier: TemplateId) -> Self {
        Self {
            name: name.into(),
            carrier,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FusionCompatibility {
    Compatible,
    Challenging,
    Forbidden,
}

impl fmt::Display for FusionCompatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FusionCompatibility::Compatible => "compatible",
            FusionCompatibility::Challenging => "challenging",
            FusionCompatibility::Forbidden => "forbidden",
        };
        f.write_str(name)
    }
}

/// Outcome of validating a cultural fusion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionAssessment {
    /// Worst compatibility across all primary/secondary pairs
    pub compatibility: FusionCompatibility,
    /// Fusion quality multiplier, 0–1
    pub multiplier: f64,
    pub issues: Vec<String>,
    /// Materials shared by the fused cultures
    pub bridging_elements: Vec<String>,
}

impl FusionAssessment {
    /// Assessment of a single-culture event
    pub fn unfused() -> Self {
        Self {
            compatibility: FusionCompatibility::Compatible,
            multiplier: 1.0,
            issues: Vec::new(),
            bridging_elements: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coherence() -> MaterialCoherence {
        MaterialCoherence {
            preferred: vec!["hinoki".to_string(), "washi".to_string()],
            avoided: vec!["plastic".to_string(), "chrome".to_string()],
            substitutions: [("plastic".to_string(), "bamboo".to_string())]
                .into_iter()
                .collect(),
        }
    }

    #[test]
    fn test_substitution_prefers_explicit_mapping() {
        let coherence = coherence();
        assert_eq!(coherence.substitute("plastic"), Some("bamboo"));
        assert_eq!(coherence.substitute("chrome"), Some("hinoki"));
        assert_eq!(coherence.substitute("hinoki"), None);
    }

    #[test]
    fn test_full_palette_order() {
        let harmony = ColorHarmony {
            palette: vec![Rgb::new(1, 1, 1)],
            accents: vec![Rgb::new(2, 2, 2)],
            tint_strength: 0.5,
            color_temperature_k: 2700.0,
        };
        assert_eq!(
            harmony.full_palette(),
            vec![Rgb::new(1, 1, 1), Rgb::new(2, 2, 2)]
        );
    }
}
