//! Reference generators.
//!
//! Deterministic layout generators for every template kind. Each lays simple
//! tagged fragments out inside its placement zone so the pipeline runs end to
//! end. They carry no real geometry.

use async_trait::async_trait;

use crate::domain::{
    tags, AudiovisualSpec, Bounds, CelebratorySpec, ChairSpec, ClimateSpec, FloralSpec,
    InteractiveSpec, LandscapeSpec, LightingSpec, MaterialSpec, Rgb, SceneFragment, SecuritySpec,
    StageSpec, StructureKind, StructureSpec, TableShape, TableSpec, TemplateId, TemplateInstance,
    TemplateParams, TemplateSpec, Vec3,
};

use super::{GenerationError, TemplateGenerator};

const NEUTRAL: Rgb = Rgb::new(0xcc, 0xcc, 0xcc);

/// Built-in generator for one template kind
#[derive(Debug, Clone, Copy)]
pub struct ReferenceGenerator {
    template: TemplateId,
}

impl ReferenceGenerator {
    pub fn new(template: TemplateId) -> Self {
        Self { template }
    }

    /// One generator per template kind
    pub fn all() -> Vec<Self> {
        TemplateId::ASSEMBLY_ORDER
            .iter()
            .map(|t| Self::new(*t))
            .collect()
    }
}

#[async_trait]
impl TemplateGenerator for ReferenceGenerator {
    fn template(&self) -> TemplateId {
        self.template
    }

    async fn generate(&self, params: &TemplateParams) -> Result<TemplateInstance, GenerationError> {
        if params.template != self.template {
            return Err(GenerationError::WrongTemplate {
                expected: self.template,
                got: params.template,
            });
        }
        if params.spec.template() != self.template {
            return Err(GenerationError::InvalidParams(format!(
                "{} record handed to the {} generator",
                params.spec.template(),
                self.template
            )));
        }
        if !params.budget.is_finite() || params.budget < 0.0 {
            return Err(GenerationError::InvalidParams(format!(
                "budget {} is not a usable amount",
                params.budget
            )));
        }

        let instance = match &params.spec {
            TemplateSpec::Chair(spec) => TemplateInstance::Many(chairs(params, spec)),
            TemplateSpec::Table(spec) => TemplateInstance::Many(tables(params, spec)),
            TemplateSpec::Lighting(spec) => TemplateInstance::Many(lighting(params, spec)),
            TemplateSpec::Floral(spec) => TemplateInstance::Many(floral(params, spec)),
            TemplateSpec::Stage(spec) => TemplateInstance::Single(stage(params, spec)),
            TemplateSpec::Audiovisual(spec) => TemplateInstance::Many(audiovisual(params, spec)),
            TemplateSpec::Climate(spec) => TemplateInstance::Many(climate(params, spec)),
            TemplateSpec::Security(spec) => TemplateInstance::Many(security(params, spec)),
            TemplateSpec::Landscape(spec) => TemplateInstance::Many(landscape(params, spec)),
            TemplateSpec::Structure(spec) => TemplateInstance::Single(structure(params, spec)),
            TemplateSpec::Interactive(spec) => TemplateInstance::Many(interactive(params, spec)),
            TemplateSpec::Celebratory(spec) => TemplateInstance::Many(celebratory(params, spec)),
        };

        Ok(finish(params, instance))
    }
}

/// Stamp cultural elements and significance on the first fragment
fn finish(params: &TemplateParams, mut instance: TemplateInstance) -> TemplateInstance {
    if let Some(first) = instance.fragments_mut().first_mut() {
        for element in &params.cultural_elements {
            first.insert_tag_member(tags::CULTURAL_ELEMENTS, element);
        }
        first.set_tag(tags::CULTURAL_SIGNIFICANCE, params.cultural_significance);
    }
    instance
}

fn color(params: &TemplateParams, index: usize) -> Rgb {
    if params.palette.is_empty() {
        return NEUTRAL;
    }
    params.palette[index % params.palette.len()]
}

fn cents(amount: f64) -> f64 {
    (amount * 100.0).floor() / 100.0
}

/// Per-item cost: the unit price, or an even share of the budget if that is lower
fn item_cost(params: &TemplateParams, items: usize, unit: f64) -> f64 {
    if items == 0 {
        return 0.0;
    }
    cents(unit.min(params.budget / items as f64))
}

fn fragment(
    params: &TemplateParams,
    name: String,
    kind: &str,
    position: Vec3,
    color_index: usize,
    cost: f64,
) -> SceneFragment {
    SceneFragment::new(name)
        .with_position(position)
        .with_material(MaterialSpec::new(
            params.material.clone(),
            color(params, color_index),
        ))
        .with_tag(tags::TYPE, kind)
        .with_tag(tags::COMPONENT, params.template.as_str())
        .with_tag(tags::DRAGGABLE, params.template.is_movable())
        .with_tag(tags::ESTIMATED_COST, cost)
}

/// Row-major grid cells inside `bounds`, skipping cells that fall in a
/// keep-clear area grown by `margin`. Overflows past the far edge rather than
/// dropping items.
fn grid(bounds: &Bounds, keep_clear: &[Bounds], count: usize, pitch: f64, margin: f64) -> Vec<Vec3> {
    let pitch = pitch.max(0.5);
    let cols = ((bounds.width() / pitch).floor() as usize).max(1);
    let give_up_after = count * 10 + cols * 4;

    let mut cells = Vec::with_capacity(count);
    let mut cell = 0usize;
    while cells.len() < count {
        let col = cell % cols;
        let row = cell / cols;
        let point = Vec3::new(
            bounds.min_x + pitch * (col as f64 + 0.5),
            0.0,
            bounds.min_z + pitch * (row as f64 + 0.5),
        );
        let blocked = keep_clear
            .iter()
            .any(|area| area.expanded(margin).contains(&point));
        if !blocked || cell >= give_up_after {
            cells.push(point);
        }
        cell += 1;
    }
    cells
}

/// Evenly spaced points along the inside of the bounds' perimeter
fn perimeter(bounds: &Bounds, count: usize, inset: f64) -> Vec<Vec3> {
    let inner = bounds.expanded(-inset.min(bounds.width() / 2.0).min(bounds.depth() / 2.0));
    let w = inner.width().max(0.0);
    let d = inner.depth().max(0.0);
    let length = 2.0 * (w + d);
    if count == 0 || length <= 0.0 {
        return vec![inner.center(); count];
    }

    (0..count)
        .map(|i| {
            let mut s = length * i as f64 / count as f64;
            if s < w {
                return Vec3::new(inner.min_x + s, 0.0, inner.min_z);
            }
            s -= w;
            if s < d {
                return Vec3::new(inner.max_x, 0.0, inner.min_z + s);
            }
            s -= d;
            if s < w {
                return Vec3::new(inner.max_x - s, 0.0, inner.max_z);
            }
            s -= w;
            Vec3::new(inner.min_x, 0.0, inner.max_z - s)
        })
        .collect()
}

fn tables(params: &TemplateParams, spec: &TableSpec) -> Vec<SceneFragment> {
    let count = spec.count as usize;
    let footprint = spec.width_m.max(spec.length_m);
    // room for a ring of chairs on every side
    let pitch = footprint + 2.0 * 0.9;
    let cost = item_cost(params, count, 110.0);
    let shape = match spec.shape {
        TableShape::Round => "round",
        TableShape::Rectangular => "rectangular",
        TableShape::Low => "low",
    };

    grid(&params.placement, &params.keep_clear, count, pitch, footprint / 2.0)
        .into_iter()
        .enumerate()
        .map(|(i, position)| {
            fragment(params, format!("table-{:02}", i + 1), "table", position, 1, cost)
                .with_tag("shape", shape)
                .with_tag("heightM", spec.height_m)
                .with_tag("widthM", spec.width_m)
                .with_tag("lengthM", spec.length_m)
                .with_tag("seats", spec.guests_per_table)
        })
        .collect()
}

fn chairs(params: &TemplateParams, spec: &ChairSpec) -> Vec<SceneFragment> {
    let count = spec.count as usize;
    let per_group = spec.seats_per_group.max(1) as usize;
    let grouped = (spec.groups as usize * per_group).min(count);
    let kind = if spec.floor_seating {
        "floor-cushion"
    } else {
        "chair"
    };
    let cost = item_cost(params, count, 35.0);

    grid(&params.placement, &params.keep_clear, count, 0.6, 0.3)
        .into_iter()
        .enumerate()
        .map(|(i, position)| {
            let mut chair = fragment(params, format!("chair-{:03}", i + 1), kind, position, 0, cost)
                .with_tag("seatHeightM", spec.seat_height_m);
            if i < grouped {
                let group = i / per_group;
                let in_group = per_group.min(grouped - group * per_group);
                chair.set_tag(tags::ANCHOR_INDEX, group);
                chair.set_tag(tags::SEAT_INDEX, i % per_group);
                chair.set_tag(tags::SEATS_IN_GROUP, in_group);
            }
            if i < spec.accessible_count as usize {
                chair.insert_tag_member(tags::ACCESSIBILITY_FEATURES, "armrests");
            }
            chair
        })
        .collect()
}

fn floral(params: &TemplateParams, spec: &FloralSpec) -> Vec<SceneFragment> {
    let total = (spec.centerpieces + spec.ceremonial_pieces) as usize;
    let cost = item_cost(params, total, 90.0);
    let ceremonial_cost = item_cost(params, total, 250.0);
    let bounds = &params.placement;

    let mut pieces: Vec<SceneFragment> =
        grid(bounds, &params.keep_clear, spec.centerpieces as usize, 1.0, 0.2)
            .into_iter()
            .enumerate()
            .map(|(i, position)| {
                fragment(params, format!("centerpiece-{:02}", i + 1), "centerpiece", position, 2, cost)
                    .with_tag(tags::ANCHOR_INDEX, i)
                    .with_tag("style", spec.style.as_str())
                    .with_tag("intensity", spec.decorative_intensity)
            })
            .collect();

    let ceremonial = spec.ceremonial_pieces as usize;
    for i in 0..ceremonial {
        let x = bounds.min_x + bounds.width() * (i as f64 + 1.0) / (ceremonial as f64 + 1.0);
        let position = Vec3::new(x, 0.0, (bounds.max_z - 0.5).max(bounds.min_z));
        pieces.push(
            fragment(params, format!("arrangement-{:02}", i + 1), "arrangement", position, 3, ceremonial_cost)
                .with_tag("style", spec.style.as_str())
                .with_tag("intensity", spec.decorative_intensity),
        );
    }
    pieces
}

fn lighting(params: &TemplateParams, spec: &LightingSpec) -> Vec<SceneFragment> {
    let fixture_watts = spec.fixture_watts.max(1.0);
    let fixtures = ((spec.power_budget_w / fixture_watts).floor() as usize).clamp(1, 48);
    let cost = item_cost(params, fixtures, 60.0 + fixture_watts * 0.05);
    let pitch = (params.placement.area() / fixtures as f64).sqrt();

    grid(&params.placement, &[], fixtures, pitch, 0.0)
        .into_iter()
        .enumerate()
        .map(|(i, mut position)| {
            position.y = spec.mount_height_m;
            let kind = if spec.candles_allowed && i % 4 == 3 {
                "candle-cluster"
            } else {
                "fixture"
            };
            let watts = if kind == "fixture" { fixture_watts } else { 0.0 };
            fragment(params, format!("light-{:02}", i + 1), kind, position, 0, cost)
                .with_tag(tags::POWER_WATTS, watts)
                .with_tag("colorTemperatureK", spec.color_temperature_k)
                .with_tag("intensity", spec.intensity)
                .with_tag("smart", spec.smart)
        })
        .collect()
}

fn stage(params: &TemplateParams, spec: &StageSpec) -> SceneFragment {
    let cost = cents((spec.width_m * spec.depth_m * 40.0).min(params.budget));
    let mut platform = fragment(
        params,
        "stage".to_string(),
        "stage",
        params.placement.center(),
        0,
        cost,
    )
    .with_tag("widthM", spec.width_m)
    .with_tag("depthM", spec.depth_m)
    .with_tag("heightM", spec.height_m)
    .with_tag("riggingAllowed", spec.rigging_allowed);

    if spec.backdrop {
        let backdrop = SceneFragment::new("backdrop")
            .with_position(Vec3::new(0.0, spec.height_m, spec.depth_m / 2.0))
            .with_material(MaterialSpec::new(params.material.clone(), color(params, 2)))
            .with_tag(tags::TYPE, "backdrop")
            .with_tag(tags::COMPONENT, params.template.as_str())
            .with_tag(tags::DRAGGABLE, false);
        platform.add_child(backdrop);
    }
    platform
}

fn audiovisual(params: &TemplateParams, spec: &AudiovisualSpec) -> Vec<SceneFragment> {
    let bounds = &params.placement;
    let items = (spec.speakers + spec.screens) as usize + usize::from(spec.streaming);
    let corners = [
        Vec3::new(bounds.min_x + 0.5, 0.0, bounds.max_z - 0.5),
        Vec3::new(bounds.max_x - 0.5, 0.0, bounds.max_z - 0.5),
        Vec3::new(bounds.min_x + 0.5, 0.0, bounds.min_z + 0.5),
        Vec3::new(bounds.max_x - 0.5, 0.0, bounds.min_z + 0.5),
    ];

    let mut gear = Vec::with_capacity(items);
    for i in 0..spec.speakers as usize {
        gear.push(
            fragment(params, format!("speaker-{:02}", i + 1), "speaker", corners[i % 4], 1, item_cost(params, items, 300.0))
                .with_tag("amplified", spec.amplified),
        );
    }
    let screens = spec.screens as usize;
    for i in 0..screens {
        let x = bounds.min_x + bounds.width() * (i as f64 + 1.0) / (screens as f64 + 1.0);
        gear.push(fragment(
            params,
            format!("screen-{:02}", i + 1),
            "screen",
            Vec3::new(x, 2.0, bounds.max_z),
            1,
            item_cost(params, items, 800.0),
        ));
    }
    if spec.streaming {
        gear.push(fragment(
            params,
            "stream-kit".to_string(),
            "stream-kit",
            corners[2],
            1,
            item_cost(params, items, 1500.0),
        ));
    }
    gear
}

fn climate(params: &TemplateParams, spec: &ClimateSpec) -> Vec<SceneFragment> {
    let units = spec.units.max(1) as usize;
    let cost = item_cost(params, units, 900.0);
    perimeter(&params.placement, units, 0.5)
        .into_iter()
        .enumerate()
        .map(|(i, position)| {
            fragment(params, format!("climate-unit-{:02}", i + 1), "climate-unit", position, 0, cost)
                .with_tag("heatingKw", spec.heating_kw / units as f64)
                .with_tag("coolingKw", spec.cooling_kw / units as f64)
                .with_tag("targetC", spec.target_c)
        })
        .collect()
}

fn security(params: &TemplateParams, spec: &SecuritySpec) -> Vec<SceneFragment> {
    let bounds = &params.placement;
    let items = (spec.checkpoints + spec.staff) as usize + usize::from(spec.vip_zone);
    let mut posts = Vec::with_capacity(items);

    let entrance = Vec3::new(bounds.center().x, 0.0, bounds.min_z + 1.0);
    for i in 0..spec.checkpoints as usize {
        let side = if i % 2 == 0 { -1.0 } else { 1.0 };
        let offset = 2.5 * (i / 2 + 1) as f64;
        posts.push(fragment(
            params,
            format!("checkpoint-{:02}", i + 1),
            "checkpoint",
            Vec3::new(entrance.x + side * offset, 0.0, entrance.z),
            0,
            item_cost(params, items, 400.0),
        ));
    }
    for (i, position) in perimeter(bounds, spec.staff as usize, 1.0).into_iter().enumerate() {
        posts.push(fragment(
            params,
            format!("staff-post-{:02}", i + 1),
            "staff-post",
            position,
            0,
            item_cost(params, items, 250.0),
        ));
    }
    if spec.vip_zone {
        posts.push(fragment(
            params,
            "vip-rope-line".to_string(),
            "rope-line",
            Vec3::new(bounds.max_x - 2.0, 0.0, bounds.max_z - 2.0),
            1,
            item_cost(params, items, 300.0),
        ));
    }
    posts
}

fn landscape(params: &TemplateParams, spec: &LandscapeSpec) -> Vec<SceneFragment> {
    let planters = spec.planters as usize;
    let cost = item_cost(params, planters, 120.0);
    perimeter(&params.placement, planters, 0.4)
        .into_iter()
        .enumerate()
        .map(|(i, position)| {
            fragment(params, format!("planter-{:02}", i + 1), "planter", position, 2, cost)
                .with_tag("pathwayLight", spec.pathway_lights)
        })
        .collect()
}

fn structure(params: &TemplateParams, spec: &StructureSpec) -> SceneFragment {
    let cost = cents((spec.width_m * spec.depth_m * 25.0).min(params.budget));
    let kind = match spec.kind {
        StructureKind::Tent => "tent",
        StructureKind::Pavilion => "pavilion",
        StructureKind::Canopy => "canopy",
    };
    fragment(params, "structure".to_string(), kind, params.placement.center(), 0, cost)
        .with_tag("widthM", spec.width_m)
        .with_tag("depthM", spec.depth_m)
        .with_tag("heightM", spec.height_m)
        .with_tag("anchored", spec.anchored)
}

fn interactive(params: &TemplateParams, spec: &InteractiveSpec) -> Vec<SceneFragment> {
    let stations = spec.stations as usize;
    let cost = item_cost(params, stations, 1500.0);
    grid(&params.placement, &params.keep_clear, stations, 3.0, 1.0)
        .into_iter()
        .enumerate()
        .map(|(i, position)| {
            let mut station =
                fragment(params, format!("station-{:02}", i + 1), "interactive-station", position, 1, cost);
            if !spec.themes.is_empty() {
                station.set_tag("theme", spec.themes[i % spec.themes.len()].as_str());
            }
            station
        })
        .collect()
}

fn celebratory(params: &TemplateParams, spec: &CelebratorySpec) -> Vec<SceneFragment> {
    let elements = spec.elements as usize;
    let cost = item_cost(params, elements, 150.0);
    grid(&params.placement, &params.keep_clear, elements, 2.0, 0.5)
        .into_iter()
        .enumerate()
        .map(|(i, position)| {
            let kind = if spec.sparklers_allowed && i % 3 == 0 {
                "sparkler-station"
            } else {
                "balloon-cluster"
            };
            fragment(params, format!("celebration-{:02}", i + 1), kind, position, 3, cost)
                .with_tag("intensity", spec.intensity)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Culture;

    fn params(template: TemplateId, spec: TemplateSpec) -> TemplateParams {
        TemplateParams {
            template,
            culture: Culture::Scandinavian,
            budget: 10_000.0,
            palette: vec![Rgb::new(0xff, 0xff, 0xff), Rgb::new(0xd8, 0xcf, 0xc4)],
            material: "natural wood".to_string(),
            cultural_elements: vec!["sheepskin throws".to_string()],
            cultural_significance: 0.2,
            placement: Bounds::new(0.0, 0.0, 20.0, 10.0),
            keep_clear: vec![Bounds::new(9.0, 0.0, 11.0, 10.0)],
            spec,
        }
    }

    fn chair_spec(count: u32) -> TemplateSpec {
        TemplateSpec::Chair(ChairSpec {
            count,
            seat_height_m: 0.46,
            seats_per_group: 8,
            groups: 2,
            accessible_count: 1,
            floor_seating: false,
        })
    }

    #[tokio::test]
    async fn test_chairs_grouped_around_anchors() {
        let generator = ReferenceGenerator::new(TemplateId::Chair);
        let instance = generator
            .generate(&params(TemplateId::Chair, chair_spec(18)))
            .await
            .unwrap();

        let chairs = instance.fragments();
        assert_eq!(chairs.len(), 18);
        assert_eq!(chairs[0].tag_u64(tags::ANCHOR_INDEX), Some(0));
        assert_eq!(chairs[8].tag_u64(tags::ANCHOR_INDEX), Some(1));
        assert_eq!(chairs[8].tag_u64(tags::SEAT_INDEX), Some(0));
        // two spares beyond 2 tables x 8 seats
        assert!(chairs[16].tag(tags::ANCHOR_INDEX).is_none());
        assert_eq!(chairs[0].tag_strings(tags::CULTURAL_ELEMENTS), vec!["sheepskin throws"]);
        assert_eq!(chairs[0].tag_strings(tags::ACCESSIBILITY_FEATURES), vec!["armrests"]);
    }

    #[tokio::test]
    async fn test_grid_avoids_keep_clear() {
        let generator = ReferenceGenerator::new(TemplateId::Chair);
        let p = params(TemplateId::Chair, chair_spec(30));
        let instance = generator.generate(&p).await.unwrap();
        for chair in instance.fragments() {
            assert!(!p.keep_clear[0].contains(&chair.position()));
        }
    }

    #[tokio::test]
    async fn test_wrong_template_rejected() {
        let generator = ReferenceGenerator::new(TemplateId::Table);
        let err = generator
            .generate(&params(TemplateId::Chair, chair_spec(4)))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            GenerationError::WrongTemplate {
                expected: TemplateId::Table,
                got: TemplateId::Chair
            }
        );
    }

    #[tokio::test]
    async fn test_costs_stay_within_budget() {
        let generator = ReferenceGenerator::new(TemplateId::Chair);
        let mut p = params(TemplateId::Chair, chair_spec(100));
        p.budget = 1000.0;
        let instance = generator.generate(&p).await.unwrap();
        let spent: f64 = instance
            .fragments()
            .iter()
            .filter_map(|f| f.tag_f64(tags::ESTIMATED_COST))
            .sum();
        assert!(spent <= 1000.0 + 1e-6);
    }

    #[tokio::test]
    async fn test_stage_has_backdrop() {
        let generator = ReferenceGenerator::new(TemplateId::Stage);
        let spec = TemplateSpec::Stage(StageSpec {
            width_m: 6.0,
            depth_m: 4.0,
            height_m: 0.6,
            backdrop: true,
            rigging_allowed: true,
        });
        let instance = generator
            .generate(&params(TemplateId::Stage, spec))
            .await
            .unwrap();
        let stage = &instance.fragments()[0];
        assert_eq!(stage.children.len(), 1);
        assert!(!stage.tag_bool(tags::DRAGGABLE));
    }

    #[test]
    fn test_perimeter_points_on_edges() {
        let bounds = Bounds::new(0.0, 0.0, 10.0, 10.0);
        let points = perimeter(&bounds, 8, 1.0);
        assert_eq!(points.len(), 8);
        for p in points {
            let on_edge = (p.x - 1.0).abs() < 1e-9
                || (p.x - 9.0).abs() < 1e-9
                || (p.z - 1.0).abs() < 1e-9
                || (p.z - 9.0).abs() < 1e-9;
            assert!(on_edge, "{p:?}");
        }
    }
}
