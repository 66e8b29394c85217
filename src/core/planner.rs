//! Master planning: zones, circulation, technical requirements and budget.
//!
//! Zones are laid out as full-width strips from the far wall toward the
//! entrance (service, stage, ceremony, dining, dancing, social). The primary
//! spine runs from the entrance at the middle of the near wall up to the
//! front of the stage.

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::{
    AccessibilityLevel, AccessibilityPlan, AcousticProfile, Bounds, BudgetCategory,
    CategoryBudget, CirculationPath, ClimatePlan, CulturalFramework, Culture,
    EventOrchestrationParameters, EventKind, MasterPlan, NetworkPlan, PathKind, PowerPlan,
    Privacy, Season, SecurityLevel, SecurityPlan, Sightline, SpatialZone, SustainabilityLevel,
    SustainabilityPlan, TemplateId, VenueRestriction, Vec3, ZonePurpose, SUSTAINABLE_MATERIALS,
};

/// Zones never take more than this share of usable area
pub const MAX_ZONE_SHARE: f64 = 0.8;

const SPINE_WIDTH_M: f64 = 2.4;
const SECONDARY_PATH_WIDTH_M: f64 = 1.8;
const MAX_VIEWING_DISTANCE_M: f64 = 30.0;
const SABINE: f64 = 0.161;

/// Base zone shares per event type
pub fn base_zones(kind: EventKind) -> &'static [(ZonePurpose, f64)] {
    use ZonePurpose::*;
    match kind {
        EventKind::Wedding => &[
            (Ceremony, 0.30),
            (Dining, 0.35),
            (Mingling, 0.20),
            (Stage, 0.10),
            (Service, 0.05),
        ],
        EventKind::Corporate => &[
            (Presentation, 0.35),
            (Dining, 0.25),
            (Networking, 0.25),
            (Stage, 0.10),
            (Service, 0.05),
        ],
        EventKind::Conference => &[
            (Presentation, 0.45),
            (Networking, 0.20),
            (Exhibition, 0.20),
            (Stage, 0.10),
            (Service, 0.05),
        ],
        EventKind::Birthday => &[
            (Dining, 0.35),
            (Mingling, 0.30),
            (Dancing, 0.20),
            (Stage, 0.10),
            (Service, 0.05),
        ],
        EventKind::Gala => &[
            (Dining, 0.40),
            (Dancing, 0.20),
            (Mingling, 0.20),
            (Stage, 0.15),
            (Service, 0.05),
        ],
        EventKind::Cultural => &[
            (Ceremony, 0.35),
            (Exhibition, 0.20),
            (Dining, 0.25),
            (Stage, 0.15),
            (Service, 0.05),
        ],
    }
}

/// Culture-specific multiplier on a zone's base share
pub fn culture_zone_modifier(culture: Culture, purpose: ZonePurpose) -> f64 {
    use ZonePurpose::*;
    match (culture, purpose) {
        (Culture::Japanese, Ceremony) => 1.2,
        (Culture::Japanese, Mingling) => 0.9,
        (Culture::Italian, Dining) => 1.2,
        (Culture::French, Dining) => 1.15,
        (Culture::Scandinavian, Mingling) => 1.1,
        (Culture::Traditional, Ceremony) => 1.1,
        (Culture::Modern, Networking) | (Culture::Modern, Exhibition) => 1.1,
        _ => 1.0,
    }
}

/// Floor area per person, before cultural spacing
fn area_per_person(purpose: ZonePurpose) -> Option<f64> {
    match purpose {
        ZonePurpose::Ceremony | ZonePurpose::Presentation => Some(1.0),
        ZonePurpose::Dining => Some(1.4),
        ZonePurpose::Mingling | ZonePurpose::Networking => Some(0.9),
        ZonePurpose::Dancing => Some(0.7),
        ZonePurpose::Exhibition => Some(2.0),
        ZonePurpose::Stage | ZonePurpose::Service => None,
    }
}

/// Strip order from the far wall
fn layout_rank(purpose: ZonePurpose) -> u8 {
    match purpose {
        ZonePurpose::Service => 0,
        ZonePurpose::Stage => 1,
        ZonePurpose::Ceremony | ZonePurpose::Presentation => 2,
        ZonePurpose::Dining => 3,
        ZonePurpose::Dancing => 4,
        ZonePurpose::Exhibition => 5,
        ZonePurpose::Mingling | ZonePurpose::Networking => 6,
    }
}

/// Templates whose content lives in a zone
fn hosted_templates(purpose: ZonePurpose) -> &'static [TemplateId] {
    match purpose {
        ZonePurpose::Ceremony | ZonePurpose::Presentation => &[TemplateId::Floral, TemplateId::Stage],
        ZonePurpose::Stage => &[TemplateId::Stage, TemplateId::Lighting],
        ZonePurpose::Dining => &[TemplateId::Table, TemplateId::Chair],
        ZonePurpose::Mingling | ZonePurpose::Networking | ZonePurpose::Dancing => {
            &[TemplateId::Lighting, TemplateId::Celebratory]
        }
        ZonePurpose::Exhibition => &[TemplateId::Interactive],
        ZonePurpose::Service => &[],
    }
}

/// Default budget shares per event type
fn default_category_shares(kind: EventKind) -> [(BudgetCategory, f64); 6] {
    use BudgetCategory::*;
    let [f, l, d, t, i, s] = match kind {
        EventKind::Wedding => [0.25, 0.15, 0.30, 0.10, 0.15, 0.05],
        EventKind::Corporate => [0.20, 0.15, 0.10, 0.30, 0.20, 0.05],
        EventKind::Conference => [0.25, 0.10, 0.05, 0.35, 0.20, 0.05],
        EventKind::Birthday => [0.25, 0.20, 0.30, 0.10, 0.10, 0.05],
        EventKind::Gala => [0.20, 0.20, 0.25, 0.15, 0.15, 0.05],
        EventKind::Cultural => [0.20, 0.15, 0.30, 0.10, 0.20, 0.05],
    };
    [
        (Furniture, f),
        (Lighting, l),
        (Decor, d),
        (Technology, t),
        (Infrastructure, i),
        (Safety, s),
    ]
}

/// Derives the master plan of a run
#[derive(Debug, Clone)]
pub struct MasterPlanner {
    contingency_share: f64,
}

impl MasterPlanner {
    pub fn new(contingency_share: f64) -> Self {
        Self {
            contingency_share: contingency_share.clamp(0.0, 0.5),
        }
    }

    pub fn plan(
        &self,
        params: &EventOrchestrationParameters,
        framework: &CulturalFramework,
    ) -> MasterPlan {
        let mut advisories = Vec::new();
        let usable = params.usable_area();

        let zones = allocate_zones(params, framework, &mut advisories);
        let allocated: f64 = zones.iter().map(|z| z.area_m2).sum();
        let circulation = plan_circulation(params, framework, &zones);
        let sightlines = plan_sightlines(&zones, &mut advisories);
        let acoustics = plan_acoustics(params, &mut advisories);
        let accessible_paths = circulation.iter().filter(|p| p.accessible).count() as u32;
        let accessibility = plan_accessibility(params, accessible_paths);
        let power = plan_power(params, &mut advisories);

        debug!(
            zones = zones.len(),
            allocated_m2 = allocated,
            usable_m2 = usable,
            "Zones allocated"
        );

        MasterPlan {
            usable_area_m2: usable,
            allocated_area_m2: allocated,
            zones,
            circulation,
            sightlines,
            acoustics,
            accessibility,
            power,
            network: plan_network(params),
            climate: plan_climate(params),
            security: plan_security(params),
            sustainability: plan_sustainability(params, framework),
            budget: self.plan_budget(params),
            advisories,
        }
    }

    fn plan_budget(&self, params: &EventOrchestrationParameters) -> CategoryBudget {
        let total = params.budget.total.max(0.0);
        let contingency = total * self.contingency_share;
        let distributable = total - contingency;

        let mut by_category = BTreeMap::new();
        let given: f64 = params.budget.breakdown.values().filter(|v| **v > 0.0).sum();
        if given > 0.0 {
            let scale = if given > distributable {
                distributable / given
            } else {
                1.0
            };
            for (category, amount) in &params.budget.breakdown {
                if *amount > 0.0 {
                    by_category.insert(*category, amount * scale);
                }
            }
        } else {
            for (category, share) in default_category_shares(params.event.event_type) {
                by_category.insert(category, distributable * share);
            }
        }

        CategoryBudget {
            by_category,
            contingency,
        }
    }
}

fn allocate_zones(
    params: &EventOrchestrationParameters,
    framework: &CulturalFramework,
    advisories: &mut Vec<String>,
) -> Vec<SpatialZone> {
    let width = params.venue.dimensions.width.max(0.0);
    let depth = params.venue.dimensions.depth.max(0.0);
    let usable = params.usable_area();
    let spacing = framework.spatial_principles.spacing_factor.max(0.1);

    let mut shares: Vec<(ZonePurpose, f64)> = base_zones(params.event.event_type)
        .iter()
        .map(|(purpose, share)| {
            (
                *purpose,
                share * culture_zone_modifier(framework.primary, *purpose),
            )
        })
        .collect();
    let total: f64 = shares.iter().map(|(_, s)| s).sum();
    if total > MAX_ZONE_SHARE {
        let factor = MAX_ZONE_SHARE / total;
        for (_, share) in &mut shares {
            *share *= factor;
        }
    }
    shares.sort_by_key(|(purpose, _)| layout_rank(*purpose));

    let mut far_edge = depth;
    let mut zones = Vec::with_capacity(shares.len());
    for (purpose, share) in shares {
        let area = usable * share;
        let strip = if width > 0.0 { area / width } else { 0.0 };
        let bounds = Bounds::new(0.0, (far_edge - strip).max(0.0), width, far_edge);
        far_edge -= strip;

        let capacity = area_per_person(purpose)
            .map(|per| (area / (per * spacing)).floor() as u32)
            .unwrap_or(0);

        let privacy = match purpose {
            ZonePurpose::Service => Privacy::Private,
            ZonePurpose::Stage | ZonePurpose::Ceremony => Privacy::SemiPrivate,
            _ => Privacy::Public,
        };

        let cultural_significance = hosted_templates(purpose)
            .iter()
            .map(|t| framework.significance(*t))
            .fold(0.0, f64::max);

        zones.push(SpatialZone {
            purpose,
            area_m2: area,
            capacity,
            bounds,
            privacy,
            cultural_significance,
        });
    }

    let guests = params.guests.total;
    for zone in &zones {
        let seats_everyone = matches!(
            zone.purpose,
            ZonePurpose::Ceremony | ZonePurpose::Presentation | ZonePurpose::Dining
        );
        if seats_everyone && zone.capacity < guests {
            advisories.push(format!(
                "{} zone holds {} of {} guests",
                zone.purpose, zone.capacity, guests
            ));
        }
    }

    zones
}

fn plan_circulation(
    params: &EventOrchestrationParameters,
    framework: &CulturalFramework,
    zones: &[SpatialZone],
) -> Vec<CirculationPath> {
    let width = params.venue.dimensions.width.max(0.0);
    let depth = params.venue.dimensions.depth.max(0.0);
    let mid = width / 2.0;

    let spine_end = [ZonePurpose::Stage, ZonePurpose::Service]
        .iter()
        .find_map(|p| zones.iter().find(|z| z.purpose == *p))
        .map(|z| z.bounds.min_z)
        .unwrap_or(depth);

    let mut paths = vec![CirculationPath {
        name: "primary-spine".to_string(),
        kind: PathKind::PrimarySpine,
        from: Vec3::new(mid, 0.0, 0.0),
        to: Vec3::new(mid, 0.0, spine_end),
        width_m: SPINE_WIDTH_M * framework.spatial_principles.circulation_modifier,
        accessible: true,
    }];

    let secondary_accessible = params.accessibility != AccessibilityLevel::Basic;
    for (i, zone) in zones.iter().enumerate() {
        let z = zone.bounds.center().z;
        let side = if i % 2 == 0 {
            zone.bounds.min_x + 1.0
        } else {
            zone.bounds.max_x - 1.0
        };
        paths.push(CirculationPath {
            name: format!("{}-access", zone.purpose),
            kind: PathKind::Secondary,
            from: Vec3::new(mid, 0.0, z),
            to: Vec3::new(side, 0.0, z),
            width_m: SECONDARY_PATH_WIDTH_M,
            accessible: secondary_accessible,
        });
    }
    paths
}

fn plan_sightlines(zones: &[SpatialZone], advisories: &mut Vec<String>) -> Vec<Sightline> {
    let mut sightlines = Vec::new();
    for focal in zones.iter().filter(|z| z.purpose.is_ceremonial()) {
        for audience in zones.iter().filter(|z| z.purpose.is_social()) {
            let distance = focal.bounds.center().planar_distance(&audience.bounds.center());
            let critical = distance <= MAX_VIEWING_DISTANCE_M;
            if !critical {
                advisories.push(format!(
                    "{} is {:.0} m from {}; add screens or relay",
                    audience.purpose, distance, focal.purpose
                ));
            }
            sightlines.push(Sightline {
                from: focal.purpose,
                to: audience.purpose,
                distance_m: distance,
                critical,
            });
        }
    }
    sightlines
}

fn target_rt60(kind: EventKind) -> f64 {
    match kind {
        EventKind::Corporate | EventKind::Conference => 0.8,
        EventKind::Cultural => 1.0,
        EventKind::Wedding | EventKind::Birthday | EventKind::Gala => 1.2,
    }
}

fn plan_acoustics(
    params: &EventOrchestrationParameters,
    advisories: &mut Vec<String>,
) -> AcousticProfile {
    let dims = &params.venue.dimensions;
    let volume = dims.width.max(0.0) * dims.depth.max(0.0) * dims.height.max(0.0);
    let guests = params.guests.total;
    let target = target_rt60(params.event.event_type);
    let open_air = params.is_outdoor();

    let (rt60, needs_treatment) = if open_air {
        (0.0, false)
    } else {
        let surface = 2.0 * (dims.width * dims.depth + dims.width * dims.height + dims.depth * dims.height);
        // hard room surfaces plus seated guests
        let absorption = surface * 0.15 + f64::from(guests) * 0.45;
        let rt60 = if absorption > 0.0 {
            SABINE * volume / absorption
        } else {
            0.0
        };
        (rt60, rt60 > target * 1.25)
    };

    let mut amplification_required = if open_air {
        guests > 50
    } else {
        volume > 1500.0 || guests > 100
    } || params.technology.audiovisual;

    if amplification_required && params.is_restricted(VenueRestriction::NoAmplifiedSound) {
        advisories.push("venue forbids amplified sound; plan for unamplified speech".to_string());
        amplification_required = false;
    }
    if needs_treatment {
        advisories.push(format!(
            "reverberation {:.1}s exceeds target {:.1}s; add drapes or panels",
            rt60, target
        ));
    }

    AcousticProfile {
        volume_m3: volume,
        rt60_seconds: rt60,
        target_rt60_seconds: target,
        open_air,
        needs_treatment,
        amplification_required,
    }
}

/// Wheelchair positions: at least 1% of guests, every declared user, and one
pub fn wheelchair_positions(guests: u32, wheelchair_users: u32) -> u32 {
    let one_percent = (f64::from(guests) * 0.01).ceil() as u32;
    one_percent.max(wheelchair_users).max(1)
}

fn plan_accessibility(
    params: &EventOrchestrationParameters,
    accessible_paths: u32,
) -> AccessibilityPlan {
    let mut features = vec!["step-free entrance".to_string()];
    if matches!(
        params.accessibility,
        AccessibilityLevel::Enhanced | AccessibilityLevel::Universal
    ) {
        features.push("accessible restrooms".to_string());
        features.push("hearing loop".to_string());
    }
    if params.accessibility == AccessibilityLevel::Universal {
        features.push("tactile wayfinding".to_string());
        features.push("quiet room".to_string());
        features.push("sign language interpretation".to_string());
    }
    if params.guests.elderly > 0 {
        features.push("seating with armrests".to_string());
    }

    AccessibilityPlan {
        wheelchair_positions: wheelchair_positions(
            params.guests.total,
            params.guests.wheelchair_users,
        ),
        accessible_paths,
        features,
    }
}

fn plan_power(params: &EventOrchestrationParameters, advisories: &mut Vec<String>) -> PowerPlan {
    let area = params.usable_area();
    let tech = &params.technology;

    let mut lighting_per_m2 = 10.0;
    if params.timing.is_evening() {
        lighting_per_m2 *= 1.5;
    }
    if tech.smart_lighting {
        lighting_per_m2 *= 0.8;
    }
    let lighting_load = area * lighting_per_m2;

    let mut av_load = if tech.audiovisual {
        2000.0 + f64::from(params.guests.total) * 10.0
    } else {
        500.0
    };
    if tech.live_streaming {
        av_load += 1500.0;
    }
    if tech.interactive_displays {
        av_load += 1000.0;
    }

    let mut available = if params.is_outdoor() {
        area * 15.0
    } else {
        area * 50.0
    };
    if params.is_restricted(VenueRestriction::LimitedPower) {
        available *= 0.5;
    }

    let load = lighting_load + av_load;
    if load > available {
        advisories.push(format!(
            "power load {:.0} W exceeds available {:.0} W; bring a generator",
            load, available
        ));
    }

    PowerPlan {
        lighting_load_w: lighting_load,
        av_load_w: av_load,
        available_w: available,
        circuits: ((load / 3000.0).ceil() as u32).max(1),
    }
}

fn plan_network(params: &EventOrchestrationParameters) -> NetworkPlan {
    let tech = &params.technology;
    let guests = f64::from(params.guests.total);
    let mut bandwidth = 10.0 + guests * 0.25;
    if tech.live_streaming {
        bandwidth += 25.0;
    }
    if tech.interactive_displays {
        bandwidth += 20.0;
    }
    NetworkPlan {
        bandwidth_mbps: bandwidth,
        access_points: ((guests / 50.0).ceil() as u32).max(1),
        streaming: tech.live_streaming,
    }
}

fn plan_climate(params: &EventOrchestrationParameters) -> ClimatePlan {
    let (target_min, target_max) = match params.venue.climate.season {
        Season::Summer => (20.0, 24.0),
        Season::Winter => (19.0, 23.0),
        Season::Spring | Season::Autumn => (19.0, 24.0),
    };
    let dims = &params.venue.dimensions;
    // outdoor venues are conditioned under a 4 m cover
    let height = if params.is_outdoor() { 4.0 } else { dims.height.max(0.0) };
    let volume = params.usable_area() * height;
    let outside = params.venue.climate.temperature_c;
    // 2 air changes per hour, 0.33 Wh/m³K
    let per_kelvin_kw = 0.33 * 2.0 * volume / 1000.0;
    let people_kw = f64::from(params.guests.total) * 0.1;

    let heating = (target_min - outside).max(0.0) * per_kelvin_kw;
    let cooling = (outside - target_max).max(0.0) * per_kelvin_kw + people_kw;

    ClimatePlan {
        target_min_c: target_min,
        target_max_c: target_max,
        heating_kw: heating,
        cooling_kw: cooling,
        rain_cover: params.is_outdoor() && params.venue.climate.precipitation_risk >= 0.3,
    }
}

fn plan_security(params: &EventOrchestrationParameters) -> SecurityPlan {
    let guests = f64::from(params.guests.total);
    let ratio = match params.security.level {
        SecurityLevel::Minimal => 250.0,
        SecurityLevel::Standard => 100.0,
        SecurityLevel::Elevated => 50.0,
        SecurityLevel::Maximum => 25.0,
    };
    let mut staff = ((guests / ratio).ceil() as u32).max(1);
    if params.security.vip_protection {
        staff += 2;
    }
    let checkpoints = match params.security.level {
        SecurityLevel::Minimal => 1,
        _ => ((guests / 150.0).ceil() as u32).max(1),
    };
    SecurityPlan {
        staff,
        checkpoints,
        vip_zone: params.security.vip_protection || params.guests.vip > 0,
    }
}

fn plan_sustainability(
    params: &EventOrchestrationParameters,
    framework: &CulturalFramework,
) -> SustainabilityPlan {
    let mut measures = vec!["waste sorting stations".to_string()];
    let diversion = match params.sustainability {
        SustainabilityLevel::Standard => 0.3,
        SustainabilityLevel::Enhanced => 0.6,
        SustainabilityLevel::Maximum => 0.9,
    };
    if params.sustainability != SustainabilityLevel::Standard {
        measures.push("local sourcing".to_string());
        measures.push("reusable tableware".to_string());
    }
    if params.sustainability == SustainabilityLevel::Maximum {
        measures.push("zero single-use plastics".to_string());
        measures.push("composting".to_string());
        measures.push("carbon offset".to_string());
    }

    let preferred_materials = framework
        .material_coherence
        .preferred
        .iter()
        .filter(|m| SUSTAINABLE_MATERIALS.contains(&m.as_str()))
        .cloned()
        .collect();

    SustainabilityPlan {
        measures,
        waste_diversion_target: diversion,
        preferred_materials,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::StaticKnowledgeBase;
    use crate::core::culture::{CompatibilityTable, CulturalFrameworkBuilder};
    use crate::domain::VenueType;
    use std::sync::Arc;

    fn framework(params: &EventOrchestrationParameters) -> CulturalFramework {
        CulturalFrameworkBuilder::new(
            Arc::new(StaticKnowledgeBase::new()),
            Arc::new(CompatibilityTable::default()),
        )
        .build(&params.culture)
        .unwrap()
    }

    fn plan(params: &EventOrchestrationParameters) -> MasterPlan {
        MasterPlanner::new(0.1).plan(params, &framework(params))
    }

    #[test]
    fn test_zones_never_exceed_eighty_percent() {
        for kind in [
            EventKind::Wedding,
            EventKind::Corporate,
            EventKind::Conference,
            EventKind::Birthday,
            EventKind::Gala,
            EventKind::Cultural,
        ] {
            for culture in Culture::ALL {
                let params = EventOrchestrationParameters::new(kind, culture, 80, 40_000.0);
                let plan = plan(&params);
                assert!(
                    plan.allocated_area_m2 <= plan.usable_area_m2 * MAX_ZONE_SHARE + 1e-9,
                    "{kind} / {culture}"
                );
            }
        }
    }

    #[test]
    fn test_japanese_wedding_favours_ceremony() {
        let japanese = plan(&EventOrchestrationParameters::new(
            EventKind::Wedding,
            Culture::Japanese,
            80,
            40_000.0,
        ));
        let modern = plan(&EventOrchestrationParameters::new(
            EventKind::Wedding,
            Culture::Modern,
            80,
            40_000.0,
        ));
        let share = |plan: &MasterPlan| {
            plan.zone(ZonePurpose::Ceremony).unwrap().area_m2 / plan.allocated_area_m2
        };
        assert!(share(&japanese) > share(&modern));
    }

    #[test]
    fn test_zone_strips_are_disjoint_and_inside_venue() {
        let params = EventOrchestrationParameters::new(EventKind::Gala, Culture::French, 120, 60_000.0);
        let plan = plan(&params);
        let mut strips: Vec<Bounds> = plan.zones.iter().map(|z| z.bounds).collect();
        strips.sort_by(|a, b| a.min_z.total_cmp(&b.min_z));
        for pair in strips.windows(2) {
            assert!(pair[0].max_z <= pair[1].min_z + 1e-9);
        }
        assert!(strips.iter().all(|b| b.min_z >= 0.0 && b.max_z <= 20.0 + 1e-9));
    }

    #[test]
    fn test_spine_stops_at_stage() {
        let params = EventOrchestrationParameters::new(EventKind::Wedding, Culture::Japanese, 80, 40_000.0);
        let plan = plan(&params);
        let spine = plan.primary_spine().unwrap();
        let stage = plan.zone(ZonePurpose::Stage).unwrap();
        assert_eq!(spine.to.z, stage.bounds.min_z);
        assert!((spine.width_m - 2.4 * 1.15).abs() < 1e-12);
        assert!(spine.accessible);
        // one secondary path per zone
        assert_eq!(plan.circulation.len(), plan.zones.len() + 1);
    }

    #[test]
    fn test_sightlines_pair_focal_and_social_zones() {
        let params = EventOrchestrationParameters::new(EventKind::Wedding, Culture::Italian, 80, 40_000.0);
        let plan = plan(&params);
        // ceremony + stage against dining + mingling
        assert_eq!(plan.sightlines.len(), 4);
        assert!(plan.sightlines.iter().all(|s| s.critical));
    }

    #[test]
    fn test_acoustics() {
        let params = EventOrchestrationParameters::new(EventKind::Corporate, Culture::Modern, 100, 40_000.0);
        let acoustics = plan(&params).acoustics;
        let volume = 30.0 * 20.0 * 5.0;
        let absorption = 2.0 * (600.0 + 150.0 + 100.0) * 0.15 + 100.0 * 0.45;
        assert_eq!(acoustics.volume_m3, volume);
        assert!((acoustics.rt60_seconds - 0.161 * volume / absorption).abs() < 1e-9);

        let outdoor = EventOrchestrationParameters::new(EventKind::Corporate, Culture::Modern, 100, 40_000.0)
            .with_venue(VenueType::Outdoor, 40.0, 30.0, 0.0);
        let acoustics = plan(&outdoor).acoustics;
        assert!(acoustics.open_air);
        assert_eq!(acoustics.rt60_seconds, 0.0);
    }

    #[test]
    fn test_wheelchair_positions() {
        assert_eq!(wheelchair_positions(10, 0), 1);
        assert_eq!(wheelchair_positions(250, 0), 3);
        assert_eq!(wheelchair_positions(250, 5), 5);
    }

    #[test]
    fn test_budget_from_defaults_and_breakdown() {
        let mut params = EventOrchestrationParameters::new(EventKind::Wedding, Culture::Modern, 80, 10_000.0);
        let budget = plan(&params).budget;
        assert_eq!(budget.contingency, 1_000.0);
        assert!((budget.by_category.values().sum::<f64>() - 9_000.0).abs() < 1e-6);

        params.budget.breakdown = [
            (BudgetCategory::Furniture, 8_000.0),
            (BudgetCategory::Decor, 4_000.0),
        ]
        .into_iter()
        .collect();
        let budget = plan(&params).budget;
        // scaled down to the distributable 9000
        assert!((budget.get(BudgetCategory::Furniture) - 6_000.0).abs() < 1e-6);
        assert_eq!(budget.get(BudgetCategory::Lighting), 0.0);
    }

    #[test]
    fn test_capacity_shortfall_is_advised() {
        let params = EventOrchestrationParameters::new(EventKind::Wedding, Culture::Modern, 600, 80_000.0);
        let plan = plan(&params);
        assert!(plan.advisories.iter().any(|a| a.contains("dining zone holds")));
    }
}
