//! The run-scoped spatial, technical and budget plan.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::fragment::Vec3;
use super::template::BudgetCategory;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterPlan {
    pub usable_area_m2: f64,
    pub allocated_area_m2: f64,
    pub zones: Vec<SpatialZone>,
    pub circulation: Vec<CirculationPath>,
    pub sightlines: Vec<Sightline>,
    pub acoustics: AcousticProfile,
    pub accessibility: AccessibilityPlan,
    pub power: PowerPlan,
    pub network: NetworkPlan,
    pub climate: ClimatePlan,
    pub security: SecurityPlan,
    pub sustainability: SustainabilityPlan,
    pub budget: CategoryBudget,
    /// Non-fatal planning concerns, e.g. capacity shortfalls
    pub advisories: Vec<String>,
}

impl MasterPlan {
    pub fn zone(&self, purpose: ZonePurpose) -> Option<&SpatialZone> {
        self.zones.iter().find(|z| z.purpose == purpose)
    }

    /// First zone present among `purposes`, in the order given
    pub fn first_zone(&self, purposes: &[ZonePurpose]) -> Option<&SpatialZone> {
        purposes.iter().find_map(|p| self.zone(*p))
    }

    pub fn primary_spine(&self) -> Option<&CirculationPath> {
        self.circulation
            .iter()
            .find(|p| p.kind == PathKind::PrimarySpine)
    }

    /// Where guests enter the venue
    pub fn entrance(&self) -> Vec3 {
        self.primary_spine().map(|p| p.from).unwrap_or(Vec3::ZERO)
    }

    /// Seated/standing capacity across all zones
    pub fn total_capacity(&self) -> u32 {
        self.zones.iter().map(|z| z.capacity).sum()
    }
}

/// Axis-aligned rectangle on the floor plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_x: f64,
    pub min_z: f64,
    pub max_x: f64,
    pub max_z: f64,
}

impl Bounds {
    pub fn new(min_x: f64, min_z: f64, max_x: f64, max_z: f64) -> Self {
        Self {
            min_x,
            min_z,
            max_x,
            max_z,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn depth(&self) -> f64 {
        self.max_z - self.min_z
    }

    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.depth().max(0.0)
    }

    pub fn center(&self) -> Vec3 {
        Vec3::new(
            (self.min_x + self.max_x) / 2.0,
            0.0,
            (self.min_z + self.max_z) / 2.0,
        )
    }

    pub fn contains(&self, point: &Vec3) -> bool {
        point.x >= self.min_x && point.x <= self.max_x && point.z >= self.min_z && point.z <= self.max_z
    }

    /// Grown by `margin` on every side
    pub fn expanded(&self, margin: f64) -> Self {
        Self::new(
            self.min_x - margin,
            self.min_z - margin,
            self.max_x + margin,
            self.max_z + margin,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ZonePurpose {
    Ceremony,
    Presentation,
    Stage,
    Dining,
    Mingling,
    Networking,
    Dancing,
    Exhibition,
    Service,
}

impl ZonePurpose {
    /// Zones where the focal moments of the event happen
    pub fn is_ceremonial(self) -> bool {
        matches!(
            self,
            ZonePurpose::Ceremony | ZonePurpose::Stage | ZonePurpose::Presentation
        )
    }

    /// Zones where guests gather among themselves
    pub fn is_social(self) -> bool {
        matches!(
            self,
            ZonePurpose::Dining | ZonePurpose::Mingling | ZonePurpose::Networking | ZonePurpose::Dancing
        )
    }
}

impl fmt::Display for ZonePurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ZonePurpose::Ceremony => "ceremony",
            ZonePurpose::Presentation => "presentation",
            ZonePurpose::Stage => "stage",
            ZonePurpose::Dining => "dining",
            ZonePurpose::Mingling => "mingling",
            ZonePurpose::Networking => "networking",
            ZonePurpose::Dancing => "dancing",
            ZonePurpose::Exhibition => "exhibition",
            ZonePurpose::Service => "service",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Privacy {
    Public,
    SemiPrivate,
    Private,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpatialZone {
    pub purpose: ZonePurpose,
    pub area_m2: f64,
    pub capacity: u32,
    pub bounds: Bounds,
    pub privacy: Privacy,
    /// 0–1
    pub cultural_significance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PathKind {
    PrimarySpine,
    Secondary,
}

/// A straight walkway segment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CirculationPath {
    pub name: String,
    pub kind: PathKind,
    pub from: Vec3,
    pub to: Vec3,
    pub width_m: f64,
    pub accessible: bool,
}

impl CirculationPath {
    pub fn length(&self) -> f64 {
        self.from.planar_distance(&self.to)
    }

    /// Floor area the path occupies, as an axis-aligned rectangle.
    ///
    /// Exact for paths running along an axis, conservative otherwise.
    pub fn corridor(&self) -> Bounds {
        let half = self.width_m / 2.0;
        Bounds::new(
            self.from.x.min(self.to.x) - half,
            self.from.z.min(self.to.z),
            self.from.x.max(self.to.x) + half,
            self.from.z.max(self.to.z),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sightline {
    pub from: ZonePurpose,
    pub to: ZonePurpose,
    pub distance_m: f64,
    pub critical: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcousticProfile {
    pub volume_m3: f64,
    pub rt60_seconds: f64,
    pub target_rt60_seconds: f64,
    pub open_air: bool,
    pub needs_treatment: bool,
    pub amplification_required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilityPlan {
    pub wheelchair_positions: u32,
    pub accessible_paths: u32,
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerPlan {
    pub lighting_load_w: f64,
    pub av_load_w: f64,
    pub available_w: f64,
    pub circuits: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPlan {
    pub bandwidth_mbps: f64,
    pub access_points: u32,
    pub streaming: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClimatePlan {
    pub target_min_c: f64,
    pub target_max_c: f64,
    pub heating_kw: f64,
    pub cooling_kw: f64,
    pub rain_cover: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityPlan {
    pub staff: u32,
    pub checkpoints: u32,
    pub vip_zone: bool,
}

/// Materials counted as low-impact
pub const SUSTAINABLE_MATERIALS: &[&str] = &[
    "natural wood",
    "bamboo",
    "washi paper",
    "stone",
    "wool",
    "linen",
    "birch",
    "terracotta",
];

/// Materials swapped out when sustainability matters
pub const UNSUSTAINABLE_MATERIALS: &[&str] = &["plastic", "chrome", "vinyl", "polystyrene"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SustainabilityPlan {
    pub measures: Vec<String>,
    /// Fraction of waste to divert from landfill, 0–1
    pub waste_diversion_target: f64,
    pub preferred_materials: Vec<String>,
}

/// Budget per category after the contingency reserve is held back
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBudget {
    pub by_category: BTreeMap<BudgetCategory, f64>,
    pub contingency: f64,
}

impl CategoryBudget {
    pub fn get(&self, category: BudgetCategory) -> f64 {
        self.by_category.get(&category).copied().unwrap_or(0.0)
    }

    /// Share of the distributable budget held by a category, 0–1
    pub fn share(&self, category: BudgetCategory) -> f64 {
        let total: f64 = self.by_category.values().sum();
        if total <= 0.0 {
            return 0.0;
        }
        self.get(category) / total
    }
}
