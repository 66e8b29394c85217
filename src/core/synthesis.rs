//! Per-template parameter synthesis.
//!
//! Each record is a pure function of the run's shared, read-only state, so
//! all selected templates are synthesized in parallel.

use indexmap::IndexMap;
use rayon::prelude::*;

use crate::domain::{
    Atmosphere, AudiovisualSpec, Bounds, CelebratorySpec, ChairSpec, ClimateSpec,
    CulturalFramework, Culture, EventKind, EventOrchestrationParameters, FloralSpec,
    InteractiveSpec, LandscapeSpec, LightingSpec, MasterPlan, SecuritySpec, StageSpec,
    StructureKind, StructureSpec, Symmetry, TableShape, TableSpec, TemplateId, TemplateParams,
    TemplateSpec, TemplateStrategy, VenueRestriction, VenueType, ZonePurpose,
};

/// Lighting power when the strategy allocates nothing to lighting
pub const DEFAULT_LIGHTING_POWER_W: f64 = 3000.0;

/// Guests plus 10% spares, rounded up
pub fn required_chairs(guests: u32) -> u32 {
    guests + (f64::from(guests) * 0.1).ceil() as u32
}

/// Seat height in metres
pub fn cultural_chair_height(culture: Culture) -> f64 {
    match culture {
        Culture::Japanese => 0.42,
        Culture::Scandinavian => 0.46,
        Culture::Italian => 0.45,
        Culture::Modern => 0.45,
        Culture::French => 0.47,
        Culture::Traditional => 0.44,
    }
}

/// Table height in metres
pub fn cultural_table_height(culture: Culture) -> f64 {
    match culture {
        Culture::Japanese => 0.70,
        Culture::Scandinavian => 0.75,
        Culture::Italian => 0.74,
        Culture::Modern => 0.75,
        Culture::French => 0.76,
        Culture::Traditional => 0.72,
    }
}

/// Nominal table width: 0.6 m of edge per guest, scaled by culture
pub fn table_width(guests_per_table: u32, width_factor: f64) -> f64 {
    f64::from(guests_per_table) * 0.6 * width_factor
}

pub fn decorative_intensity(atmosphere: Atmosphere) -> f64 {
    if atmosphere == Atmosphere::Ceremonial {
        0.8
    } else {
        0.5
    }
}

/// Zones a template's content is placed in, most preferred first
fn placement_zones(template: TemplateId) -> &'static [ZonePurpose] {
    use ZonePurpose::*;
    match template {
        TemplateId::Table | TemplateId::Chair => &[Dining, Ceremony, Presentation],
        TemplateId::Floral => &[Dining, Ceremony],
        TemplateId::Stage | TemplateId::Audiovisual => &[Stage],
        TemplateId::Interactive => &[Exhibition, Networking, Mingling],
        TemplateId::Celebratory => &[Dancing, Mingling, Dining],
        TemplateId::Lighting
        | TemplateId::Climate
        | TemplateId::Security
        | TemplateId::Landscape
        | TemplateId::Structure => &[],
    }
}

/// Which of the framework's preferred materials a template uses
fn material_slot(template: TemplateId) -> usize {
    match template {
        TemplateId::Table | TemplateId::Chair | TemplateId::Stage | TemplateId::Structure => 0,
        TemplateId::Floral | TemplateId::Landscape => 1,
        TemplateId::Lighting => 2,
        _ => 3,
    }
}

/// Builds one `TemplateParams` per selected template
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterSynthesizer;

impl ParameterSynthesizer {
    pub fn new() -> Self {
        Self
    }

    /// Records for every selected template, in declaration order
    pub fn synthesize_all(
        &self,
        params: &EventOrchestrationParameters,
        plan: &MasterPlan,
        framework: &CulturalFramework,
        strategy: &TemplateStrategy,
    ) -> IndexMap<TemplateId, TemplateParams> {
        let selected = strategy.selected();
        let records: Vec<(TemplateId, TemplateParams)> = selected
            .par_iter()
            .map(|template| {
                (
                    *template,
                    self.synthesize(*template, params, plan, framework, strategy),
                )
            })
            .collect();
        records.into_iter().collect()
    }

    pub fn synthesize(
        &self,
        template: TemplateId,
        params: &EventOrchestrationParameters,
        plan: &MasterPlan,
        framework: &CulturalFramework,
        strategy: &TemplateStrategy,
    ) -> TemplateParams {
        let venue = venue_bounds(params);
        let placement = plan
            .first_zone(placement_zones(template))
            .map(|z| z.bounds)
            .unwrap_or(venue);
        let keep_clear = plan
            .primary_spine()
            .map(|spine| vec![spine.corridor()])
            .unwrap_or_default();

        let preferred = &framework.material_coherence.preferred;
        let material = if preferred.is_empty() {
            "natural wood".to_string()
        } else {
            preferred[material_slot(template) % preferred.len()].clone()
        };

        TemplateParams {
            template,
            culture: framework.primary,
            budget: strategy.allocation_of(template).unwrap_or(0.0),
            palette: framework.color_harmony.full_palette(),
            material,
            cultural_elements: framework
                .elements_for(template)
                .into_iter()
                .map(|e| e.name.clone())
                .collect(),
            cultural_significance: framework.significance(template),
            placement,
            keep_clear,
            spec: spec_for(template, params, plan, framework, strategy),
        }
    }
}

fn venue_bounds(params: &EventOrchestrationParameters) -> Bounds {
    let dims = &params.venue.dimensions;
    Bounds::new(0.0, 0.0, dims.width.max(0.0), dims.depth.max(0.0))
}

fn table_count(params: &EventOrchestrationParameters, framework: &CulturalFramework) -> u32 {
    let per_table = framework.spatial_principles.guests_per_table.max(1);
    params.guests.total.div_ceil(per_table)
}

fn spec_for(
    template: TemplateId,
    params: &EventOrchestrationParameters,
    plan: &MasterPlan,
    framework: &CulturalFramework,
    strategy: &TemplateStrategy,
) -> TemplateSpec {
    let guests = params.guests.total;
    let spatial = &framework.spatial_principles;
    let no_flame = params.is_restricted(VenueRestriction::NoOpenFlame);

    match template {
        TemplateId::Chair => TemplateSpec::Chair(ChairSpec {
            count: required_chairs(guests),
            seat_height_m: cultural_chair_height(framework.primary),
            seats_per_group: spatial.guests_per_table.max(1),
            groups: table_count(params, framework),
            accessible_count: params.guests.elderly,
            floor_seating: spatial.floor_seating,
        }),

        TemplateId::Table => {
            let width = table_width(spatial.guests_per_table, spatial.table_width_factor);
            let shape = if spatial.floor_seating {
                TableShape::Low
            } else if spatial.symmetry == Symmetry::Symmetric {
                TableShape::Round
            } else {
                TableShape::Rectangular
            };
            // floor seating changes the shape, never the cultural height
            let length = match shape {
                TableShape::Round => width,
                TableShape::Low | TableShape::Rectangular => width * 1.5,
            };
            TemplateSpec::Table(TableSpec {
                count: table_count(params, framework),
                guests_per_table: spatial.guests_per_table.max(1),
                height_m: cultural_table_height(framework.primary),
                width_m: width,
                length_m: length,
                shape,
            })
        }

        TemplateId::Lighting => {
            let smart = params.technology.smart_lighting;
            let power = strategy
                .allocation_of(TemplateId::Lighting)
                .filter(|w| *w > 0.0)
                .unwrap_or(DEFAULT_LIGHTING_POWER_W)
                .min(plan.power.available_w);
            let mount_height = if params.venue.venue_type == VenueType::Outdoor {
                3.5
            } else {
                (params.venue.dimensions.height - 0.5).clamp(2.5, 6.0)
            };
            TemplateSpec::Lighting(LightingSpec {
                power_budget_w: power,
                fixture_watts: if smart { 40.0 } else { 60.0 },
                color_temperature_k: framework.color_harmony.color_temperature_k,
                intensity: if params.timing.is_evening() { 0.8 } else { 0.6 },
                smart,
                candles_allowed: !no_flame,
                mount_height_m: mount_height,
            })
        }

        TemplateId::Floral => {
            let ceremonial_zone = plan
                .first_zone(&[ZonePurpose::Ceremony, ZonePurpose::Presentation])
                .is_some();
            let atmosphere = params.experience.atmosphere;
            let mut ceremonial_pieces = if ceremonial_zone { 2 } else { 0 };
            if ceremonial_zone && atmosphere == Atmosphere::Ceremonial {
                ceremonial_pieces += 1;
            }
            TemplateSpec::Floral(FloralSpec {
                centerpieces: table_count(params, framework),
                ceremonial_pieces,
                decorative_intensity: decorative_intensity(atmosphere),
                style: framework.floral_style.clone(),
            })
        }

        TemplateId::Stage => {
            let zone = plan
                .zone(ZonePurpose::Stage)
                .map(|z| z.bounds)
                .unwrap_or_else(|| venue_bounds(params));
            TemplateSpec::Stage(StageSpec {
                width_m: (zone.width() * 0.6).clamp(4.0, 16.0),
                depth_m: (zone.depth() * 0.8).clamp(2.0, 8.0),
                height_m: if guests > 300 { 1.0 } else { 0.6 },
                backdrop: true,
                rigging_allowed: !params.is_restricted(VenueRestriction::NoRigging)
                    && params.venue.venue_type != VenueType::Outdoor,
            })
        }

        TemplateId::Audiovisual => {
            let amplified = plan.acoustics.amplification_required;
            let far_audience = plan.sightlines.iter().any(|s| !s.critical);
            let speech = matches!(
                params.event.event_type,
                EventKind::Corporate | EventKind::Conference
            );
            let mut screens = u32::from(speech) + if far_audience { 2 } else { 0 };
            if params.technology.live_streaming {
                screens = screens.max(1);
            }
            TemplateSpec::Audiovisual(AudiovisualSpec {
                speakers: if amplified {
                    guests.div_ceil(50).max(2)
                } else {
                    0
                },
                screens,
                streaming: params.technology.live_streaming,
                amplified,
            })
        }

        TemplateId::Climate => {
            let climate = &plan.climate;
            TemplateSpec::Climate(ClimateSpec {
                units: (((climate.heating_kw + climate.cooling_kw) / 10.0).ceil() as u32).max(1),
                heating_kw: climate.heating_kw,
                cooling_kw: climate.cooling_kw,
                target_c: (climate.target_min_c + climate.target_max_c) / 2.0,
            })
        }

        TemplateId::Security => TemplateSpec::Security(SecuritySpec {
            staff: plan.security.staff,
            checkpoints: plan.security.checkpoints,
            vip_zone: plan.security.vip_zone,
        }),

        TemplateId::Landscape => {
            let venue = venue_bounds(params);
            let perimeter = 2.0 * (venue.width() + venue.depth());
            TemplateSpec::Landscape(LandscapeSpec {
                planters: ((perimeter / 6.0).floor() as u32).max(2),
                pathway_lights: params.timing.is_evening(),
            })
        }

        TemplateId::Structure => {
            let dims = &params.venue.dimensions;
            let kind = if plan.climate.rain_cover {
                StructureKind::Tent
            } else if guests > 100 {
                StructureKind::Pavilion
            } else {
                StructureKind::Canopy
            };
            TemplateSpec::Structure(StructureSpec {
                kind,
                width_m: dims.width.max(0.0),
                depth_m: dims.depth.max(0.0),
                height_m: if dims.height > 0.0 { dims.height } else { 4.0 },
                anchored: !params.is_restricted(VenueRestriction::NoFloorAnchors),
            })
        }

        TemplateId::Interactive => {
            let mut themes: Vec<String> = framework
                .cultures()
                .iter()
                .map(|c| c.as_str().to_string())
                .collect();
            themes.extend(
                framework
                    .ceremony_protocols
                    .iter()
                    .map(|p| p.name.clone()),
            );
            TemplateSpec::Interactive(InteractiveSpec {
                stations: guests.div_ceil(40).max(1),
                themes,
            })
        }

        TemplateId::Celebratory => TemplateSpec::Celebratory(CelebratorySpec {
            elements: guests.div_ceil(25).max(1),
            intensity: match params.experience.atmosphere {
                Atmosphere::Celebratory | Atmosphere::Festive => 0.9,
                _ => 0.6,
            },
            sparklers_allowed: !no_flame,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::StaticKnowledgeBase;
    use crate::core::culture::{CompatibilityTable, CulturalFrameworkBuilder};
    use crate::core::planner::MasterPlanner;
    use crate::core::relationships::RelationshipGraph;
    use crate::core::strategy::TemplateStrategySelector;
    use crate::domain::CulturalSensitivity;
    use std::sync::Arc;

    struct Fixture {
        params: EventOrchestrationParameters,
        framework: CulturalFramework,
        plan: MasterPlan,
        strategy: TemplateStrategy,
    }

    fn fixture(params: EventOrchestrationParameters) -> Fixture {
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
        Fixture {
            params,
            framework,
            plan,
            strategy,
        }
    }

    fn synthesize(f: &Fixture) -> IndexMap<TemplateId, TemplateParams> {
        ParameterSynthesizer::new().synthesize_all(&f.params, &f.plan, &f.framework, &f.strategy)
    }

    #[test]
    fn test_required_chairs() {
        assert_eq!(required_chairs(100), 110);
        assert_eq!(required_chairs(81), 90);
        assert_eq!(required_chairs(0), 0);
    }

    #[test]
    fn test_cultural_heights() {
        assert_eq!(cultural_chair_height(Culture::Japanese), 0.42);
        assert_eq!(cultural_table_height(Culture::French), 0.76);
    }

    #[test]
    fn test_japanese_tables_are_narrower() {
        assert!((table_width(6, 0.8) - 2.88).abs() < 1e-12);
        assert!((table_width(8, 1.0) - 4.8).abs() < 1e-12);
    }

    #[test]
    fn test_one_record_per_selected_template() {
        let f = fixture(EventOrchestrationParameters::new(
            EventKind::Wedding,
            Culture::Japanese,
            80,
            40_000.0,
        ));
        let records = synthesize(&f);
        let keys: Vec<_> = records.keys().copied().collect();
        assert_eq!(keys, f.strategy.selected());
        for (template, record) in &records {
            assert_eq!(record.template, *template);
            assert_eq!(record.spec.template(), *template);
            assert_eq!(Some(record.budget), f.strategy.allocation_of(*template));
        }
    }

    #[test]
    fn test_chair_and_table_records() {
        let f = fixture(EventOrchestrationParameters::new(
            EventKind::Wedding,
            Culture::French,
            100,
            40_000.0,
        ));
        let records = synthesize(&f);
        match &records[&TemplateId::Chair].spec {
            TemplateSpec::Chair(chair) => {
                assert_eq!(chair.count, 110);
                assert_eq!(chair.seat_height_m, 0.47);
                assert_eq!(chair.seats_per_group, 8);
                assert_eq!(chair.groups, 13);
            }
            other => panic!("unexpected spec {other:?}"),
        }
        match &records[&TemplateId::Table].spec {
            TemplateSpec::Table(table) => {
                assert_eq!(table.height_m, 0.76);
                assert_eq!(table.count, 13);
                assert_eq!(table.shape, TableShape::Round);
            }
            other => panic!("unexpected spec {other:?}"),
        }
        // tables are placed in the dining zone, away from the spine
        let dining = f.plan.zone(ZonePurpose::Dining).unwrap().bounds;
        assert_eq!(records[&TemplateId::Table].placement, dining);
        assert_eq!(records[&TemplateId::Table].keep_clear.len(), 1);
    }

    #[test]
    fn test_floor_seating_keeps_cultural_heights() {
        let mut params = EventOrchestrationParameters::new(EventKind::Wedding, Culture::Japanese, 48, 40_000.0);
        params.culture.sensitivity = CulturalSensitivity::High;
        let f = fixture(params);
        assert!(f.framework.spatial_principles.floor_seating);

        let records = synthesize(&f);
        match &records[&TemplateId::Table].spec {
            TemplateSpec::Table(table) => {
                assert_eq!(table.shape, TableShape::Low);
                assert_eq!(table.height_m, 0.70);
            }
            other => panic!("unexpected spec {other:?}"),
        }
        match &records[&TemplateId::Chair].spec {
            TemplateSpec::Chair(chair) => {
                assert!(chair.floor_seating);
                assert_eq!(chair.seat_height_m, 0.42);
            }
            other => panic!("unexpected spec {other:?}"),
        }
    }

    #[test]
    fn test_lighting_power_is_capped_by_venue() {
        let mut params = EventOrchestrationParameters::new(EventKind::Wedding, Culture::Modern, 80, 400_000.0)
            .with_venue(VenueType::Indoor, 10.0, 10.0, 4.0);
        params.venue.restrictions.push(VenueRestriction::LimitedPower);
        params.venue.restrictions.push(VenueRestriction::NoOpenFlame);
        let f = fixture(params);
        let records = synthesize(&f);
        match &records[&TemplateId::Lighting].spec {
            TemplateSpec::Lighting(lighting) => {
                assert_eq!(lighting.power_budget_w, f.plan.power.available_w);
                assert!(!lighting.candles_allowed);
            }
            other => panic!("unexpected spec {other:?}"),
        }
    }

    #[test]
    fn test_floral_intensity_follows_atmosphere() {
        assert_eq!(decorative_intensity(Atmosphere::Ceremonial), 0.8);
        assert_eq!(decorative_intensity(Atmosphere::Festive), 0.5);

        let f = fixture(EventOrchestrationParameters::new(
            EventKind::Wedding,
            Culture::Japanese,
            60,
            40_000.0,
        ));
        let records = synthesize(&f);
        let floral = &records[&TemplateId::Floral];
        assert_eq!(floral.cultural_elements, vec!["ikebana arrangement".to_string()]);
        match &floral.spec {
            TemplateSpec::Floral(spec) => {
                assert_eq!(spec.decorative_intensity, 0.8);
                assert_eq!(spec.centerpieces, 10);
                assert_eq!(spec.ceremonial_pieces, 3);
            }
            other => panic!("unexpected spec {other:?}"),
        }
    }
}
