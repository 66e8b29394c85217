//! Parameter records handed to generators.
//!
//! One `TemplateParams` is synthesized per selected template. The common
//! envelope carries budget and cultural styling; `spec` carries the
//! template-specific numbers.

use serde::{Deserialize, Serialize};

use super::fragment::Rgb;
use super::params::Culture;
use super::plan::Bounds;
use super::template::TemplateId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateParams {
    pub template: TemplateId,
    pub culture: Culture,
    pub budget: f64,
    pub palette: Vec<Rgb>,
    pub material: String,
    /// Cultural elements this template is expected to carry
    pub cultural_elements: Vec<String>,
    /// 0–1
    pub cultural_significance: f64,
    /// Zone the content should be placed in
    pub placement: Bounds,
    /// Areas to keep free (circulation)
    pub keep_clear: Vec<Bounds>,
    pub spec: TemplateSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TemplateSpec {
    Chair(ChairSpec),
    Table(TableSpec),
    Lighting(LightingSpec),
    Floral(FloralSpec),
    Stage(StageSpec),
    Audiovisual(AudiovisualSpec),
    Climate(ClimateSpec),
    Security(SecuritySpec),
    Landscape(LandscapeSpec),
    Structure(StructureSpec),
    Interactive(InteractiveSpec),
    Celebratory(CelebratorySpec),
}

impl TemplateSpec {
    /// Template the record is meant for
    pub fn template(&self) -> TemplateId {
        match self {
            TemplateSpec::Chair(_) => TemplateId::Chair,
            TemplateSpec::Table(_) => TemplateId::Table,
            TemplateSpec::Lighting(_) => TemplateId::Lighting,
            TemplateSpec::Floral(_) => TemplateId::Floral,
            TemplateSpec::Stage(_) => TemplateId::Stage,
            TemplateSpec::Audiovisual(_) => TemplateId::Audiovisual,
            TemplateSpec::Climate(_) => TemplateId::Climate,
            TemplateSpec::Security(_) => TemplateId::Security,
            TemplateSpec::Landscape(_) => TemplateId::Landscape,
            TemplateSpec::Structure(_) => TemplateId::Structure,
            TemplateSpec::Interactive(_) => TemplateId::Interactive,
            TemplateSpec::Celebratory(_) => TemplateId::Celebratory,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChairSpec {
    pub count: u32,
    pub seat_height_m: f64,
    /// Seats around each table
    pub seats_per_group: u32,
    /// Number of tables the seats are grouped around
    pub groups: u32,
    /// Chairs fitted with armrests
    pub accessible_count: u32,
    pub floor_seating: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TableShape {
    Round,
    Rectangular,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSpec {
    pub count: u32,
    pub guests_per_table: u32,
    pub height_m: f64,
    pub width_m: f64,
    pub length_m: f64,
    pub shape: TableShape,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightingSpec {
    pub power_budget_w: f64,
    pub fixture_watts: f64,
    pub color_temperature_k: f64,
    /// 0–1
    pub intensity: f64,
    pub smart: bool,
    pub candles_allowed: bool,
    pub mount_height_m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloralSpec {
    pub centerpieces: u32,
    pub ceremonial_pieces: u32,
    /// 0–1
    pub decorative_intensity: f64,
    pub style: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageSpec {
    pub width_m: f64,
    pub depth_m: f64,
    pub height_m: f64,
    pub backdrop: bool,
    pub rigging_allowed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudiovisualSpec {
    pub speakers: u32,
    pub screens: u32,
    pub streaming: bool,
    pub amplified: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClimateSpec {
    pub units: u32,
    pub heating_kw: f64,
    pub cooling_kw: f64,
    pub target_c: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySpec {
    pub staff: u32,
    pub checkpoints: u32,
    pub vip_zone: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandscapeSpec {
    pub planters: u32,
    pub pathway_lights: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StructureKind {
    Tent,
    Pavilion,
    Canopy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureSpec {
    pub kind: StructureKind,
    pub width_m: f64,
    pub depth_m: f64,
    pub height_m: f64,
    pub anchored: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractiveSpec {
    pub stations: u32,
    pub themes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CelebratorySpec {
    pub elements: u32,
    /// 0–1
    pub intensity: f64,
    pub sparklers_allowed: bool,
}
