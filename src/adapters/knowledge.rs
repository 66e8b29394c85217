//! Cultural knowledge base.
//!
//! Supplies the per-culture profile the framework builder draws on. The
//! static base covers the six supported cultures with a compact reference
//! profile each; richer sources plug in through [`CulturalKnowledgeBase`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{
    CeremonyProtocol, CulturalElement, Culture, Rgb, Symmetry, TemplateId,
};

/// Source of cultural profiles
pub trait CulturalKnowledgeBase: Send + Sync {
    fn profile(&self, culture: Culture) -> CulturalProfile;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CulturalProfile {
    pub culture: Culture,
    pub proportions: Proportions,
    pub materials: MaterialProfile,
    pub aesthetics: Aesthetics,
    pub ergonomics: Ergonomics,
    pub traditions: Traditions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proportions {
    pub guests_per_table: u32,
    /// Multiplier on the nominal table width
    pub table_width_factor: f64,
    /// Multiplier on distances between furniture groups
    pub spacing_factor: f64,
    /// Multiplier on circulation path widths
    pub circulation_modifier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialProfile {
    pub preferred: Vec<String>,
    pub avoided: Vec<String>,
    pub substitutions: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aesthetics {
    pub palette: Vec<Rgb>,
    pub accents: Vec<Rgb>,
    pub symmetry: Symmetry,
    pub floral_style: String,
    pub color_temperature_k: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ergonomics {
    /// Comfortable distance between seated guests, metres
    pub personal_space_m: f64,
    pub floor_seating_tradition: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Traditions {
    pub ceremonies: Vec<CeremonyProtocol>,
    pub must_have: Vec<CulturalElement>,
    pub forbidden: Vec<String>,
}

/// Built-in reference profiles
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticKnowledgeBase;

impl StaticKnowledgeBase {
    pub fn new() -> Self {
        Self
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn substitutions(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect()
}

fn ceremony(culture: Culture, name: &str, description: &str, anchor: TemplateId) -> CeremonyProtocol {
    CeremonyProtocol {
        name: name.to_string(),
        description: description.to_string(),
        culture,
        anchor,
    }
}

impl CulturalKnowledgeBase for StaticKnowledgeBase {
    fn profile(&self, culture: Culture) -> CulturalProfile {
        match culture {
            Culture::Japanese => CulturalProfile {
                culture,
                proportions: Proportions {
                    guests_per_table: 6,
                    table_width_factor: 0.8,
                    spacing_factor: 1.2,
                    circulation_modifier: 1.15,
                },
                materials: MaterialProfile {
                    preferred: strings(&["natural wood", "bamboo", "washi paper", "stone"]),
                    avoided: strings(&["plastic", "chrome"]),
                    substitutions: substitutions(&[("plastic", "bamboo"), ("chrome", "stone")]),
                },
                aesthetics: Aesthetics {
                    palette: vec![
                        Rgb::new(0xf5, 0xf0, 0xe6),
                        Rgb::new(0x8b, 0x5a, 0x2b),
                        Rgb::new(0x2f, 0x4f, 0x4f),
                    ],
                    accents: vec![Rgb::new(0xc0, 0x39, 0x2b)],
                    symmetry: Symmetry::Asymmetric,
                    floral_style: "ikebana".to_string(),
                    color_temperature_k: 2700.0,
                },
                ergonomics: Ergonomics {
                    personal_space_m: 0.9,
                    floor_seating_tradition: true,
                },
                traditions: Traditions {
                    ceremonies: vec![ceremony(
                        culture,
                        "san-san-kudo",
                        "three sips of sake shared from three cups at the head table",
                        TemplateId::Table,
                    )],
                    must_have: vec![
                        CulturalElement::new("ikebana arrangement", TemplateId::Floral),
                        CulturalElement::new("washi lanterns", TemplateId::Lighting),
                        CulturalElement::new("hinoki table", TemplateId::Table),
                    ],
                    forbidden: strings(&["white chrysanthemums", "groupings of four"]),
                },
            },
            Culture::Scandinavian => CulturalProfile {
                culture,
                proportions: Proportions {
                    guests_per_table: 8,
                    table_width_factor: 1.0,
                    spacing_factor: 1.1,
                    circulation_modifier: 1.1,
                },
                materials: MaterialProfile {
                    preferred: strings(&["natural wood", "wool", "linen", "birch"]),
                    avoided: strings(&["plastic", "velvet"]),
                    substitutions: substitutions(&[("plastic", "birch"), ("velvet", "wool")]),
                },
                aesthetics: Aesthetics {
                    palette: vec![
                        Rgb::new(0xff, 0xff, 0xff),
                        Rgb::new(0xd8, 0xcf, 0xc4),
                        Rgb::new(0xa3, 0xb1, 0x8a),
                    ],
                    accents: vec![Rgb::new(0x5b, 0x7c, 0x99)],
                    symmetry: Symmetry::Asymmetric,
                    floral_style: "meadow".to_string(),
                    color_temperature_k: 2700.0,
                },
                ergonomics: Ergonomics {
                    personal_space_m: 0.8,
                    floor_seating_tradition: false,
                },
                traditions: Traditions {
                    ceremonies: vec![ceremony(
                        culture,
                        "candlelit skål",
                        "shared toast by candlelight before the meal",
                        TemplateId::Lighting,
                    )],
                    must_have: vec![
                        CulturalElement::new("candle clusters", TemplateId::Lighting),
                        CulturalElement::new("wildflower bouquets", TemplateId::Floral),
                        CulturalElement::new("sheepskin throws", TemplateId::Chair),
                    ],
                    forbidden: Vec::new(),
                },
            },
            Culture::Italian => CulturalProfile {
                culture,
                proportions: Proportions {
                    guests_per_table: 10,
                    table_width_factor: 1.0,
                    spacing_factor: 1.0,
                    circulation_modifier: 0.95,
                },
                materials: MaterialProfile {
                    preferred: strings(&["marble", "terracotta", "wrought iron", "velvet"]),
                    avoided: strings(&["plastic"]),
                    substitutions: substitutions(&[("plastic", "terracotta")]),
                },
                aesthetics: Aesthetics {
                    palette: vec![
                        Rgb::new(0xf4, 0xe4, 0xc1),
                        Rgb::new(0xb8, 0x5c, 0x38),
                        Rgb::new(0x55, 0x6b, 0x2f),
                    ],
                    accents: vec![Rgb::new(0x8e, 0x1b, 0x1b)],
                    symmetry: Symmetry::Symmetric,
                    floral_style: "garland".to_string(),
                    color_temperature_k: 3000.0,
                },
                ergonomics: Ergonomics {
                    personal_space_m: 0.6,
                    floor_seating_tradition: false,
                },
                traditions: Traditions {
                    ceremonies: vec![ceremony(
                        culture,
                        "tarantella",
                        "circle dance in front of the stage after the meal",
                        TemplateId::Stage,
                    )],
                    must_have: vec![
                        CulturalElement::new("olive branch garlands", TemplateId::Floral),
                        CulturalElement::new("long banquet tables", TemplateId::Table),
                        CulturalElement::new("string lights", TemplateId::Lighting),
                    ],
                    forbidden: Vec::new(),
                },
            },
            Culture::French => CulturalProfile {
                culture,
                proportions: Proportions {
                    guests_per_table: 8,
                    table_width_factor: 1.0,
                    spacing_factor: 1.05,
                    circulation_modifier: 1.0,
                },
                materials: MaterialProfile {
                    preferred: strings(&["silk", "gilded brass", "crystal", "velvet"]),
                    avoided: strings(&["plastic", "raw concrete"]),
                    substitutions: substitutions(&[
                        ("plastic", "crystal"),
                        ("raw concrete", "marble"),
                    ]),
                },
                aesthetics: Aesthetics {
                    palette: vec![
                        Rgb::new(0xfd, 0xf6, 0xec),
                        Rgb::new(0xc9, 0xb1, 0x8a),
                        Rgb::new(0x7a, 0x8b, 0x99),
                    ],
                    accents: vec![Rgb::new(0xb7, 0x6e, 0x79)],
                    symmetry: Symmetry::Symmetric,
                    floral_style: "garden roses".to_string(),
                    color_temperature_k: 3000.0,
                },
                ergonomics: Ergonomics {
                    personal_space_m: 0.7,
                    floor_seating_tradition: false,
                },
                traditions: Traditions {
                    ceremonies: vec![ceremony(
                        culture,
                        "croquembouche",
                        "presentation of the choux tower at the head table",
                        TemplateId::Table,
                    )],
                    must_have: vec![
                        CulturalElement::new("crystal candelabra", TemplateId::Lighting),
                        CulturalElement::new("garden roses", TemplateId::Floral),
                        CulturalElement::new("toile linens", TemplateId::Table),
                    ],
                    forbidden: strings(&["yellow chrysanthemums"]),
                },
            },
            Culture::Modern => CulturalProfile {
                culture,
                proportions: Proportions {
                    guests_per_table: 8,
                    table_width_factor: 1.0,
                    spacing_factor: 1.0,
                    circulation_modifier: 1.0,
                },
                materials: MaterialProfile {
                    preferred: strings(&["glass", "brushed steel", "natural wood", "concrete"]),
                    avoided: strings(&["brocade"]),
                    substitutions: substitutions(&[("brocade", "linen")]),
                },
                aesthetics: Aesthetics {
                    palette: vec![
                        Rgb::new(0xff, 0xff, 0xff),
                        Rgb::new(0x1c, 0x1c, 0x1c),
                        Rgb::new(0x9e, 0x9e, 0x9e),
                    ],
                    accents: vec![Rgb::new(0x00, 0xa3, 0xe0)],
                    symmetry: Symmetry::Asymmetric,
                    floral_style: "sculptural".to_string(),
                    color_temperature_k: 4000.0,
                },
                ergonomics: Ergonomics {
                    personal_space_m: 0.75,
                    floor_seating_tradition: false,
                },
                traditions: Traditions {
                    ceremonies: Vec::new(),
                    must_have: vec![CulturalElement::new(
                        "architectural lighting",
                        TemplateId::Lighting,
                    )],
                    forbidden: Vec::new(),
                },
            },
            Culture::Traditional => CulturalProfile {
                culture,
                proportions: Proportions {
                    guests_per_table: 10,
                    table_width_factor: 1.0,
                    spacing_factor: 1.0,
                    circulation_modifier: 1.05,
                },
                materials: MaterialProfile {
                    preferred: strings(&["mahogany", "brocade", "brass", "linen"]),
                    avoided: strings(&["plastic", "brushed steel"]),
                    substitutions: substitutions(&[
                        ("plastic", "mahogany"),
                        ("brushed steel", "brass"),
                    ]),
                },
                aesthetics: Aesthetics {
                    palette: vec![
                        Rgb::new(0xff, 0xf8, 0xe7),
                        Rgb::new(0x8b, 0x00, 0x00),
                        Rgb::new(0xd4, 0xaf, 0x37),
                    ],
                    accents: vec![Rgb::new(0x2e, 0x5e, 0x4e)],
                    symmetry: Symmetry::Symmetric,
                    floral_style: "classic".to_string(),
                    color_temperature_k: 2700.0,
                },
                ergonomics: Ergonomics {
                    personal_space_m: 0.65,
                    floor_seating_tradition: false,
                },
                traditions: Traditions {
                    ceremonies: vec![ceremony(
                        culture,
                        "processional",
                        "formal entrance along the aisle to the stage",
                        TemplateId::Stage,
                    )],
                    must_have: vec![
                        CulturalElement::new("garland arches", TemplateId::Floral),
                        CulturalElement::new("candelabra", TemplateId::Lighting),
                    ],
                    forbidden: Vec::new(),
                },
            },
        }
    }
}
