//! Cross-template adjustment passes.
//!
//! Five passes run in order over the generated instances: spatial, cultural,
//! technical, experience-flow and safety. Every pass derives its output from
//! inputs it does not modify (anchor positions, base colors, declared edges),
//! so running the sequence again leaves the scene unchanged.

use std::collections::BTreeSet;
use std::f64::consts::TAU;
use std::sync::Arc;

use tracing::debug;

use crate::domain::{
    tags, CulturalFramework, MasterPlan, Rgb, SceneFragment, TemplateId, TemplateInstances,
    TemplateStrategy, Vec3,
};

use super::error::IntegrationError;
use super::relationships::{RelationshipGraph, RelationshipKind, SpatialConstraint, TemplateRelationship};

/// Fragments at or above this height clear walking guests
pub const HEADROOM_M: f64 = 2.1;

/// Gap left between a pushed fragment and the spine
const EGRESS_MARGIN_M: f64 = 0.3;

/// Table half-size when the table carries no dimensions
const DEFAULT_TABLE_HALF_M: f64 = 0.75;

/// Stages of the designed emotional arc, in order, with their emphasis
pub const EXPERIENCE_ARC: [(&str, f64); 4] = [
    ("arrival", 0.4),
    ("gathering", 0.6),
    ("focal-moment", 1.0),
    ("celebration", 0.8),
];

pub fn experience_stage(template: TemplateId) -> &'static str {
    match template {
        TemplateId::Landscape | TemplateId::Structure | TemplateId::Climate | TemplateId::Security => {
            "arrival"
        }
        TemplateId::Table | TemplateId::Chair => "gathering",
        TemplateId::Stage | TemplateId::Audiovisual | TemplateId::Floral => "focal-moment",
        TemplateId::Lighting | TemplateId::Interactive | TemplateId::Celebratory => "celebration",
    }
}

/// Feature tag marking a chair kept for wheelchair users
pub const WHEELCHAIR_POSITION: &str = "wheelchair-position";

/// Feature tag marking the seat kept beside a wheelchair position
pub const COMPANION_SEAT: &str = "companion-seat";

/// Outcome of one run of the passes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntegrationReport {
    /// Adjustments skipped because a component was missing
    pub skipped: Vec<IntegrationError>,
    /// Fragments moved out of the egress spine
    pub cleared_from_egress: usize,
    /// Anchors left in the egress spine
    pub egress_conflicts: usize,
    pub wheelchair_positions: usize,
    pub notes: Vec<String>,
}

impl IntegrationReport {
    fn skip(&mut self, error: IntegrationError) {
        self.notes.push(format!("adjustment skipped: {}", error));
        self.skipped.push(error);
    }
}

/// Applies relationship-driven adjustments across templates
#[derive(Debug, Clone)]
pub struct EcosystemIntegrator {
    graph: Arc<RelationshipGraph>,
    min_edge_strength: f64,
}

impl EcosystemIntegrator {
    pub fn new(graph: Arc<RelationshipGraph>, min_edge_strength: f64) -> Self {
        Self {
            graph,
            min_edge_strength,
        }
    }

    /// Run all five passes in order
    pub fn integrate(
        &self,
        instances: &mut TemplateInstances,
        framework: &CulturalFramework,
        plan: &MasterPlan,
        strategy: &TemplateStrategy,
    ) -> IntegrationReport {
        let mut report = IntegrationReport::default();
        self.spatial_pass(instances, strategy, &mut report);
        self.cultural_pass(instances, framework);
        self.technical_pass(instances, strategy, &mut report);
        self.experience_pass(instances, framework);
        self.safety_pass(instances, plan, &mut report);

        debug!(
            skipped = report.skipped.len(),
            cleared = report.cleared_from_egress,
            conflicts = report.egress_conflicts,
            "Integration passes applied"
        );
        report
    }

    /// Edges this integrator honours
    fn active_edges(&self) -> impl Iterator<Item = &TemplateRelationship> {
        let min = self.min_edge_strength;
        self.graph.edges().iter().filter(move |e| e.strength >= min)
    }

    /// Both ends present; a selected-but-missing end is reported
    fn both_present(
        &self,
        pass: &'static str,
        edge: &TemplateRelationship,
        instances: &TemplateInstances,
        strategy: &TemplateStrategy,
        report: &mut IntegrationReport,
    ) -> bool {
        if !strategy.is_selected(edge.primary) || !strategy.is_selected(edge.secondary) {
            return false;
        }
        for missing in [edge.primary, edge.secondary] {
            if !instances.contains(missing) {
                report.skip(IntegrationError::MissingComponent {
                    pass,
                    primary: edge.primary,
                    secondary: edge.secondary,
                    missing,
                });
                return false;
            }
        }
        true
    }

    /// Surround, center-on, face-toward and keep-distance rules
    pub fn spatial_pass(
        &self,
        instances: &mut TemplateInstances,
        strategy: &TemplateStrategy,
        report: &mut IntegrationReport,
    ) {
        let edges: Vec<TemplateRelationship> = self
            .active_edges()
            .filter(|e| e.spatial.is_some())
            .cloned()
            .collect();

        for edge in edges {
            if !self.both_present("spatial", &edge, instances, strategy, report) {
                continue;
            }
            let Some(rule) = edge.spatial else { continue };

            let anchors: Vec<Anchor> = instances
                .get(edge.secondary)
                .map(|i| i.fragments().iter().map(Anchor::of).collect())
                .unwrap_or_default();
            let centroid = centroid(&anchors);
            let Some(instance) = instances.get_mut(edge.primary) else {
                continue;
            };

            for fragment in instance.fragments_mut() {
                let result = match rule {
                    SpatialConstraint::Surround { clearance_m } => {
                        surround(fragment, &anchors, clearance_m * edge.strength)
                    }
                    SpatialConstraint::CenterOn => center_on(fragment, &anchors, edge.strength),
                    SpatialConstraint::FaceToward => {
                        face_toward(fragment, centroid, edge.strength);
                        Ok(())
                    }
                    SpatialConstraint::KeepDistance { min_m } => {
                        keep_distance(fragment, centroid, min_m * edge.strength);
                        Ok(())
                    }
                };
                if let Err(anchor) = result {
                    report.skip(IntegrationError::DanglingAnchor {
                        pass: "spatial",
                        template: edge.primary,
                        anchor,
                    });
                }
            }
        }
    }

    /// Re-tint toward the palette and swap avoided materials
    pub fn cultural_pass(&self, instances: &mut TemplateInstances, framework: &CulturalFramework) {
        let base_palette = framework.color_harmony.full_palette();
        let tint = framework.color_harmony.tint_strength;
        let coherence = &framework.material_coherence;

        let shared: Vec<(TemplateId, Vec<Rgb>)> = self
            .active_edges()
            .filter(|e| e.shared_palette)
            .filter_map(|e| {
                let colors = instances.get(e.secondary)?.fragments().first()?.material.as_ref()?.base_color;
                Some((e.primary, vec![colors]))
            })
            .collect();

        let templates: Vec<TemplateId> = instances.templates().collect();
        for template in templates {
            let mut palette = base_palette.clone();
            for (primary, colors) in &shared {
                if *primary == template {
                    palette.extend(colors.iter().copied());
                }
            }
            let Some(instance) = instances.get_mut(template) else {
                continue;
            };
            instance.walk_mut(&mut |fragment| {
                let Some(material) = fragment.material.as_mut() else {
                    return;
                };
                let mut replaced = None;
                if let Some(substitute) = coherence.substitute(&material.name) {
                    replaced = Some(std::mem::replace(&mut material.name, substitute.to_string()));
                }
                material.color = match material.base_color.nearest(&palette) {
                    Some(target) => material.base_color.lerp(target, tint),
                    None => material.base_color,
                };
                if let Some(original) = replaced {
                    fragment.set_tag("originalMaterial", original);
                }
            });
        }
    }

    /// Link controllers across integrates-with edges
    pub fn technical_pass(
        &self,
        instances: &mut TemplateInstances,
        strategy: &TemplateStrategy,
        report: &mut IntegrationReport,
    ) {
        let edges: Vec<TemplateRelationship> = self
            .active_edges()
            .filter(|e| e.kind == RelationshipKind::IntegratesWith)
            .cloned()
            .collect();

        for edge in edges {
            if !self.both_present("technical", &edge, instances, strategy, report) {
                continue;
            }
            let channel = edge.control_channel.as_deref().unwrap_or("control");
            for (own, other) in [(edge.primary, edge.secondary), (edge.secondary, edge.primary)] {
                let link = format!("{}:{}", other, channel);
                if let Some(instance) = instances.get_mut(own) {
                    for fragment in instance.fragments_mut() {
                        fragment.insert_tag_member(tags::CONTROL_LINKS, &link);
                    }
                }
            }
        }
    }

    /// Tag components with their place in the experience arc
    pub fn experience_pass(&self, instances: &mut TemplateInstances, framework: &CulturalFramework) {
        let templates: Vec<TemplateId> = instances.templates().collect();
        for template in templates {
            let stage = experience_stage(template);
            let Some((sequence, (_, base))) = EXPERIENCE_ARC
                .iter()
                .enumerate()
                .find(|(_, (name, _))| *name == stage)
            else {
                continue;
            };
            let emphasis = (base + 0.2 * framework.significance(template)).min(1.0);
            if let Some(instance) = instances.get_mut(template) {
                for fragment in instance.fragments_mut() {
                    fragment.set_tag(tags::EXPERIENCE_STAGE, stage);
                    fragment.set_tag(tags::SEQUENCE, sequence + 1);
                    fragment.set_tag(tags::EMPHASIS, emphasis);
                }
            }
        }
    }

    /// Keep the egress spine clear and mark wheelchair positions
    pub fn safety_pass(
        &self,
        instances: &mut TemplateInstances,
        plan: &MasterPlan,
        report: &mut IntegrationReport,
    ) {
        if let Some(spine) = plan.primary_spine() {
            let corridor = spine.corridor();
            let center_x = (corridor.min_x + corridor.max_x) / 2.0;
            let fixed = fixed_templates(&self.graph);

            for (template, instance) in instances.iter_mut() {
                if template == TemplateId::Structure {
                    continue;
                }
                let is_anchor = fixed.contains(&template);
                for fragment in instance.fragments_mut() {
                    let p = fragment.position();
                    let inside = p.y < HEADROOM_M
                        && p.x > corridor.min_x + 1e-9
                        && p.x < corridor.max_x - 1e-9
                        && p.z > corridor.min_z + 1e-9
                        && p.z < corridor.max_z - 1e-9;
                    if !inside {
                        continue;
                    }
                    if is_anchor {
                        fragment.set_tag(tags::EGRESS_CONFLICT, true);
                        report.egress_conflicts += 1;
                    } else {
                        let x = if p.x < center_x {
                            corridor.min_x - EGRESS_MARGIN_M
                        } else {
                            corridor.max_x + EGRESS_MARGIN_M
                        };
                        fragment.transform.position = Vec3::new(x, p.y, p.z);
                        report.cleared_from_egress += 1;
                    }
                }
            }
            if report.egress_conflicts > 0 {
                report.notes.push(format!(
                    "{} fixed element(s) intrude on the egress spine",
                    report.egress_conflicts
                ));
            }
        }

        report.wheelchair_positions =
            mark_wheelchair_positions(instances, plan.entrance(), plan.accessibility.wheelchair_positions);
        if report.wheelchair_positions < plan.accessibility.wheelchair_positions as usize {
            report.notes.push(format!(
                "only {} of {} wheelchair positions could be marked",
                report.wheelchair_positions, plan.accessibility.wheelchair_positions
            ));
        }
    }
}

/// Mark the `wanted` chairs nearest the entrance. Returns how many chairs
/// carry the mark afterwards.
pub fn mark_wheelchair_positions(instances: &mut TemplateInstances, entrance: Vec3, wanted: u32) -> usize {
    let Some(chairs) = instances.get_mut(TemplateId::Chair) else {
        return 0;
    };
    let fragments = chairs.fragments_mut();
    let mut by_distance: Vec<(usize, f64)> = fragments
        .iter()
        .enumerate()
        .map(|(i, f)| (i, f.position().planar_distance(&entrance)))
        .collect();
    by_distance.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

    for (index, _) in by_distance.into_iter().take(wanted as usize) {
        fragments[index].insert_tag_member(tags::ACCESSIBILITY_FEATURES, WHEELCHAIR_POSITION);
    }
    fragments
        .iter()
        .filter(|f| {
            f.tag_strings(tags::ACCESSIBILITY_FEATURES)
                .iter()
                .any(|t| t == WHEELCHAIR_POSITION)
        })
        .count()
}

/// Position and size of a fragment other fragments are placed against
#[derive(Debug, Clone, Copy)]
struct Anchor {
    position: Vec3,
    half_size: f64,
    top: f64,
}

impl Anchor {
    fn of(fragment: &SceneFragment) -> Self {
        let width = fragment.tag_f64("widthM");
        let length = fragment.tag_f64("lengthM");
        let half_size = match (width, length) {
            (Some(w), Some(l)) => w.max(l) / 2.0,
            (Some(w), None) => w / 2.0,
            _ => DEFAULT_TABLE_HALF_M,
        };
        Self {
            position: fragment.position(),
            half_size,
            top: fragment.tag_f64("heightM").unwrap_or(0.0),
        }
    }
}

fn centroid(anchors: &[Anchor]) -> Option<Vec3> {
    if anchors.is_empty() {
        return None;
    }
    let n = anchors.len() as f64;
    let (x, z) = anchors
        .iter()
        .fold((0.0, 0.0), |(x, z), a| (x + a.position.x, z + a.position.z));
    Some(Vec3::new(x / n, 0.0, z / n))
}

fn anchor_for<'a>(fragment: &SceneFragment, anchors: &'a [Anchor]) -> Result<Option<&'a Anchor>, u64> {
    match fragment.tag_u64(tags::ANCHOR_INDEX) {
        None => Ok(None),
        Some(index) => anchors.get(index as usize).map(Some).ok_or(index),
    }
}

/// Ring the anchor, evenly spaced by seat index, facing inward
fn surround(fragment: &mut SceneFragment, anchors: &[Anchor], clearance: f64) -> Result<(), u64> {
    let Some(anchor) = anchor_for(fragment, anchors)? else {
        return Ok(());
    };
    let seat = fragment.tag_u64(tags::SEAT_INDEX).unwrap_or(0) as f64;
    let seats = fragment.tag_u64(tags::SEATS_IN_GROUP).unwrap_or(1).max(1) as f64;
    let angle = TAU * seat / seats;
    let radius = anchor.half_size + clearance;

    fragment.transform.position = Vec3::new(
        anchor.position.x + radius * angle.cos(),
        0.0,
        anchor.position.z + radius * angle.sin(),
    );
    fragment.transform.rotation_y = (angle + TAU / 2.0).rem_euclid(TAU);
    Ok(())
}

/// Sit on the anchor's top; weaker edges leave the piece off-center
fn center_on(fragment: &mut SceneFragment, anchors: &[Anchor], strength: f64) -> Result<(), u64> {
    let Some(anchor) = anchor_for(fragment, anchors)? else {
        return Ok(());
    };
    let offset = (1.0 - strength.clamp(0.0, 1.0)) * anchor.half_size;
    fragment.transform.position = Vec3::new(anchor.position.x + offset, anchor.top, anchor.position.z);
    Ok(())
}

/// Yaw toward the target, scaled by strength
fn face_toward(fragment: &mut SceneFragment, target: Option<Vec3>, strength: f64) {
    let Some(target) = target else { return };
    let p = fragment.position();
    let (dx, dz) = (target.x - p.x, target.z - p.z);
    if dx.abs() < 1e-12 && dz.abs() < 1e-12 {
        return;
    }
    fragment.transform.rotation_y = dz.atan2(dx) * strength.clamp(0.0, 1.0);
}

/// Push radially out to `radius` from the center
fn keep_distance(fragment: &mut SceneFragment, center: Option<Vec3>, radius: f64) {
    let Some(center) = center else { return };
    let p = fragment.position();
    let distance = p.planar_distance(&center);
    if distance >= radius {
        return;
    }
    let (dx, dz) = if distance < 1e-9 {
        (0.0, -1.0)
    } else {
        ((p.x - center.x) / distance, (p.z - center.z) / distance)
    };
    fragment.transform.position = Vec3::new(center.x + dx * radius, p.y, center.z + dz * radius);
}

/// Templates whose fragments are never moved by the safety pass
pub fn fixed_templates(graph: &RelationshipGraph) -> BTreeSet<TemplateId> {
    let mut fixed = graph.anchor_templates();
    fixed.extend(
        TemplateId::ASSEMBLY_ORDER
            .iter()
            .copied()
            .filter(|t| !t.is_movable()),
    );
    fixed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::{fixture, generate, japanese_wedding};
    use crate::domain::{MaterialSpec, TemplateInstance};

    fn integrator() -> EcosystemIntegrator {
        EcosystemIntegrator::new(Arc::new(RelationshipGraph::default()), 0.2)
    }

    #[tokio::test]
    async fn test_chairs_ring_their_table() {
        let f = fixture(japanese_wedding());
        let mut instances = generate(&f).await;
        let mut report = IntegrationReport::default();
        integrator().spatial_pass(&mut instances, &f.strategy, &mut report);
        assert!(report.skipped.is_empty());

        let tables = instances.get(TemplateId::Table).unwrap().fragments().to_vec();
        for chair in instances.get(TemplateId::Chair).unwrap().fragments() {
            let Some(anchor) = chair.tag_u64(tags::ANCHOR_INDEX) else {
                continue;
            };
            let table = &tables[anchor as usize];
            let half = table.tag_f64("widthM").unwrap().max(table.tag_f64("lengthM").unwrap()) / 2.0;
            let distance = chair.position().planar_distance(&table.position());
            assert!((distance - (half + 0.45)).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn test_centerpieces_sit_on_tables() {
        let f = fixture(japanese_wedding());
        let mut instances = generate(&f).await;
        integrator().spatial_pass(&mut instances, &f.strategy, &mut IntegrationReport::default());

        let tables = instances.get(TemplateId::Table).unwrap().fragments().to_vec();
        let floral = instances.get(TemplateId::Floral).unwrap();
        let centerpiece = floral
            .fragments()
            .iter()
            .find(|f| f.tag_str(tags::TYPE) == Some("centerpiece"))
            .unwrap();
        let table = &tables[centerpiece.tag_u64(tags::ANCHOR_INDEX).unwrap() as usize];
        assert_eq!(centerpiece.position().y, table.tag_f64("heightM").unwrap());
    }

    #[tokio::test]
    async fn test_passes_are_idempotent() {
        let f = fixture(japanese_wedding());
        let mut instances = generate(&f).await;
        let integrator = integrator();

        integrator.integrate(&mut instances, &f.framework, &f.plan, &f.strategy);
        let once = instances.clone();
        integrator.integrate(&mut instances, &f.framework, &f.plan, &f.strategy);

        let snapshot = |instances: &TemplateInstances| {
            let mut out = Vec::new();
            instances.walk(&mut |t, f| {
                out.push((
                    t,
                    f.name.clone(),
                    f.transform.position.x.to_bits(),
                    f.transform.position.y.to_bits(),
                    f.transform.position.z.to_bits(),
                    f.transform.rotation_y.to_bits(),
                    f.material.clone(),
                ))
            });
            out
        };
        assert_eq!(snapshot(&once), snapshot(&instances));
        assert_eq!(once, instances);
    }

    #[tokio::test]
    async fn test_missing_component_is_skipped() {
        let f = fixture(japanese_wedding());
        let mut instances = generate(&f).await;
        instances.remove(TemplateId::Table);

        let report = integrator().integrate(&mut instances, &f.framework, &f.plan, &f.strategy);
        assert!(report.skipped.contains(&IntegrationError::MissingComponent {
            pass: "spatial",
            primary: TemplateId::Chair,
            secondary: TemplateId::Table,
            missing: TemplateId::Table,
        }));
        assert!(report.notes.iter().any(|n| n.starts_with("adjustment skipped")));
    }

    #[test]
    fn test_cultural_pass_tints_and_substitutes() {
        let f = fixture(japanese_wedding());
        let mut instances = TemplateInstances::new();
        instances.insert(
            TemplateId::Chair,
            TemplateInstance::Many(vec![SceneFragment::new("chair")
                .with_material(MaterialSpec::new("plastic", Rgb::new(255, 0, 0)))]),
        );
        integrator().cultural_pass(&mut instances, &f.framework);

        let chair = &instances.get(TemplateId::Chair).unwrap().fragments()[0];
        let material = chair.material.as_ref().unwrap();
        assert_ne!(material.name, "plastic");
        assert_eq!(chair.tag_str("originalMaterial"), Some("plastic"));
        assert_eq!(material.base_color, Rgb::new(255, 0, 0));
        let palette = f.framework.color_harmony.full_palette();
        let target = material.base_color.nearest(&palette).unwrap();
        assert_eq!(
            material.color,
            material.base_color.lerp(target, f.framework.color_harmony.tint_strength)
        );
    }

    #[tokio::test]
    async fn test_technical_links_both_sides() {
        let mut params = japanese_wedding();
        params.technology.audiovisual = true;
        let f = fixture(params);
        let mut instances = generate(&f).await;
        integrator().technical_pass(&mut instances, &f.strategy, &mut IntegrationReport::default());

        for light in instances.get(TemplateId::Lighting).unwrap().fragments() {
            assert!(light
                .tag_strings(tags::CONTROL_LINKS)
                .contains(&"audiovisual:dmx".to_string()));
        }
        for gear in instances.get(TemplateId::Audiovisual).unwrap().fragments() {
            assert!(gear
                .tag_strings(tags::CONTROL_LINKS)
                .contains(&"lighting:dmx".to_string()));
        }
    }

    #[tokio::test]
    async fn test_safety_pass_clears_spine_and_marks_wheelchairs() {
        let f = fixture(japanese_wedding());
        let mut instances = generate(&f).await;

        // drop a stray chair in the middle of the spine
        let spine = f.plan.primary_spine().unwrap().corridor();
        if let Some(TemplateInstance::Many(chairs)) = instances.get_mut(TemplateId::Chair) {
            chairs.push(
                SceneFragment::new("stray")
                    .with_position(Vec3::new((spine.min_x + spine.max_x) / 2.0, 0.0, 1.0))
                    .with_tag(tags::TYPE, "chair"),
            );
        }

        let report = integrator().integrate(&mut instances, &f.framework, &f.plan, &f.strategy);
        assert!(report.cleared_from_egress >= 1);

        let mut marked = 0;
        instances.walk(&mut |template, fragment| {
            let p = fragment.position();
            if template != TemplateId::Structure
                && !fixed_templates(&RelationshipGraph::default()).contains(&template)
                && p.y < HEADROOM_M
            {
                assert!(
                    !(p.x > spine.min_x + 1e-9
                        && p.x < spine.max_x - 1e-9
                        && p.z > spine.min_z + 1e-9
                        && p.z < spine.max_z - 1e-9),
                    "{} left in the spine",
                    fragment.name
                );
            }
            if fragment
                .tag_strings(tags::ACCESSIBILITY_FEATURES)
                .contains(&WHEELCHAIR_POSITION.to_string())
            {
                marked += 1;
            }
        });
        assert_eq!(marked, f.plan.accessibility.wheelchair_positions as usize);
        assert_eq!(report.wheelchair_positions, marked);
    }

    #[test]
    fn test_keep_distance_pushes_to_radius() {
        let mut station = SceneFragment::new("station").with_position(Vec3::new(1.0, 0.0, 0.0));
        keep_distance(&mut station, Some(Vec3::ZERO), 4.2);
        assert!((station.position().planar_distance(&Vec3::ZERO) - 4.2).abs() < 1e-12);

        let before = station.clone();
        keep_distance(&mut station, Some(Vec3::ZERO), 4.2);
        assert_eq!(before, station);
    }
}
