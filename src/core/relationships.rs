//! Declared constraints between templates.
//!
//! The graph is static for the lifetime of an orchestrator. Only `depends-on`
//! edges affect instantiation order; every kind may carry adjustments applied
//! by the integration passes.

use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::TemplateId;

use super::registry::TemplateRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationshipKind {
    DependsOn,
    Complements,
    ConflictsWith,
    Enhances,
    IntegratesWith,
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelationshipKind::DependsOn => "depends-on",
            RelationshipKind::Complements => "complements",
            RelationshipKind::ConflictsWith => "conflicts-with",
            RelationshipKind::Enhances => "enhances",
            RelationshipKind::IntegratesWith => "integrates-with",
        };
        f.write_str(name)
    }
}

/// Placement rule of the primary's fragments relative to the secondary's
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "rule")]
pub enum SpatialConstraint {
    /// Ring around the anchor fragment named by `anchorIndex`
    Surround { clearance_m: f64 },
    /// Sit on top of the anchor fragment named by `anchorIndex`
    CenterOn,
    /// Rotate to face the secondary's centroid
    FaceToward,
    /// Stay at least this far from the secondary's centroid
    KeepDistance { min_m: f64 },
}

/// One declared edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRelationship {
    pub primary: TemplateId,
    pub secondary: TemplateId,
    pub kind: RelationshipKind,
    /// 0–1; scales the magnitude of the edge's adjustments
    pub strength: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spatial: Option<SpatialConstraint>,
    /// Controller channel linking the two templates' cues
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_channel: Option<String>,
    /// Both templates draw from the shared palette
    #[serde(default)]
    pub shared_palette: bool,
}

impl TemplateRelationship {
    pub fn new(
        primary: TemplateId,
        kind: RelationshipKind,
        secondary: TemplateId,
        strength: f64,
    ) -> Self {
        Self {
            primary,
            secondary,
            kind,
            strength: strength.clamp(0.0, 1.0),
            spatial: None,
            control_channel: None,
            shared_palette: false,
        }
    }

    pub fn with_spatial(mut self, constraint: SpatialConstraint) -> Self {
        self.spatial = Some(constraint);
        self
    }

    pub fn with_control(mut self, channel: impl Into<String>) -> Self {
        self.control_channel = Some(channel.into());
        self
    }

    pub fn with_shared_palette(mut self) -> Self {
        self.shared_palette = true;
        self
    }

    pub fn involves(&self, template: TemplateId) -> bool {
        self.primary == template || self.secondary == template
    }
}

impl fmt::Display for TemplateRelationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} ({:.2})",
            self.primary, self.kind, self.secondary, self.strength
        )
    }
}

/// Errors found when checking a graph against a registry
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RelationshipError {
    #[error("edge '{edge}' references unregistered template {template}")]
    Unregistered { edge: String, template: TemplateId },

    #[error("template {0} depends on itself")]
    SelfDependency(TemplateId),

    #[error("depends-on cycle through {0:?}")]
    Cycle(Vec<TemplateId>),
}

/// Static set of declared template relationships
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipGraph {
    edges: Vec<TemplateRelationship>,
}

impl Default for RelationshipGraph {
    fn default() -> Self {
        use RelationshipKind::*;
        use SpatialConstraint::*;
        use TemplateId::*;

        Self::new(vec![
            TemplateRelationship::new(Chair, DependsOn, Table, 1.0)
                .with_spatial(Surround { clearance_m: 0.45 }),
            TemplateRelationship::new(Floral, Complements, Table, 0.8).with_spatial(CenterOn),
            TemplateRelationship::new(Lighting, DependsOn, Stage, 0.7).with_spatial(FaceToward),
            TemplateRelationship::new(Audiovisual, DependsOn, Stage, 0.9),
            TemplateRelationship::new(Lighting, IntegratesWith, Audiovisual, 0.8)
                .with_control("dmx"),
            TemplateRelationship::new(Lighting, IntegratesWith, Climate, 0.5).with_control("bms"),
            TemplateRelationship::new(Interactive, IntegratesWith, Audiovisual, 0.6)
                .with_control("av-over-ip"),
            TemplateRelationship::new(Climate, DependsOn, Structure, 0.9),
            TemplateRelationship::new(Stage, DependsOn, Structure, 0.8),
            TemplateRelationship::new(Table, DependsOn, Structure, 0.6),
            TemplateRelationship::new(Interactive, ConflictsWith, Stage, 0.7)
                .with_spatial(KeepDistance { min_m: 6.0 }),
            TemplateRelationship::new(Floral, Enhances, Stage, 0.5).with_shared_palette(),
            TemplateRelationship::new(Celebratory, Enhances, Lighting, 0.4).with_shared_palette(),
            TemplateRelationship::new(Landscape, Enhances, Structure, 0.3),
        ])
    }
}

impl RelationshipGraph {
    pub fn new(edges: Vec<TemplateRelationship>) -> Self {
        Self { edges }
    }

    /// Graph without any edges
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn edges(&self) -> &[TemplateRelationship] {
        &self.edges
    }

    pub fn add(&mut self, edge: TemplateRelationship) {
        self.edges.push(edge);
    }

    /// Edges of one kind at or above `min_strength`
    pub fn edges_of(
        &self,
        kind: RelationshipKind,
        min_strength: f64,
    ) -> impl Iterator<Item = &TemplateRelationship> {
        self.edges
            .iter()
            .filter(move |e| e.kind == kind && e.strength >= min_strength)
    }

    /// Edges carrying a spatial constraint at or above `min_strength`
    pub fn spatial_edges(&self, min_strength: f64) -> impl Iterator<Item = &TemplateRelationship> {
        self.edges
            .iter()
            .filter(move |e| e.spatial.is_some() && e.strength >= min_strength)
    }

    /// Templates targeted by surround/center-on rules: their fragments are
    /// anchors other fragments are positioned against
    pub fn anchor_templates(&self) -> BTreeSet<TemplateId> {
        self.edges
            .iter()
            .filter(|e| {
                matches!(
                    e.spatial,
                    Some(SpatialConstraint::Surround { .. }) | Some(SpatialConstraint::CenterOn)
                )
            })
            .map(|e| e.secondary)
            .collect()
    }

    /// `depends-on` edges restricted to `selected`, keyed by dependent,
    /// in the order `selected` lists them
    pub fn dependencies_among(&self, selected: &[TemplateId]) -> IndexMap<TemplateId, Vec<TemplateId>> {
        let mut deps: IndexMap<TemplateId, Vec<TemplateId>> = IndexMap::new();
        for template in selected {
            let on: Vec<TemplateId> = self
                .edges
                .iter()
                .filter(|e| {
                    e.kind == RelationshipKind::DependsOn
                        && e.primary == *template
                        && selected.contains(&e.secondary)
                })
                .map(|e| e.secondary)
                .collect();
            if !on.is_empty() {
                deps.insert(*template, on);
            }
        }
        deps
    }

    /// Check edges reference registered templates and dependencies are acyclic
    pub fn validate_against(&self, registry: &TemplateRegistry) -> Result<(), RelationshipError> {
        for edge in &self.edges {
            for template in [edge.primary, edge.secondary] {
                if !registry.contains(template) {
                    return Err(RelationshipError::Unregistered {
                        edge: edge.to_string(),
                        template,
                    });
                }
            }
            if edge.kind == RelationshipKind::DependsOn && edge.primary == edge.secondary {
                return Err(RelationshipError::SelfDependency(edge.primary));
            }
        }

        let all: Vec<TemplateId> = TemplateId::ASSEMBLY_ORDER.to_vec();
        if let Some(cycle) = find_cycle(&self.dependencies_among(&all)) {
            return Err(RelationshipError::Cycle(cycle));
        }
        Ok(())
    }
}

/// Depth-first search for a dependency cycle
fn find_cycle(deps: &IndexMap<TemplateId, Vec<TemplateId>>) -> Option<Vec<TemplateId>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    fn visit(
        node: TemplateId,
        deps: &IndexMap<TemplateId, Vec<TemplateId>>,
        marks: &mut IndexMap<TemplateId, Mark>,
        path: &mut Vec<TemplateId>,
    ) -> Option<Vec<TemplateId>> {
        match marks.get(&node) {
            Some(Mark::Done) => return None,
            Some(Mark::Visiting) => {
                let start = path.iter().position(|t| *t == node).unwrap_or(0);
                return Some(path[start..].to_vec());
            }
            None => {}
        }
        marks.insert(node, Mark::Visiting);
        path.push(node);
        for next in deps.get(&node).map(Vec::as_slice).unwrap_or(&[]) {
            if let Some(cycle) = visit(*next, deps, marks, path) {
                return Some(cycle);
            }
        }
        path.pop();
        marks.insert(node, Mark::Done);
        None
    }

    let mut marks = IndexMap::new();
    for node in deps.keys() {
        let mut path = Vec::new();
        if let Some(cycle) = visit(*node, deps, &mut marks, &mut path) {
            return Some(cycle);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_graph_is_valid() {
        let graph = RelationshipGraph::default();
        let registry = TemplateRegistry::with_reference_generators();
        assert!(graph.validate_against(&registry).is_ok());
        assert!(graph.anchor_templates().contains(&TemplateId::Table));
    }

    #[test]
    fn test_unregistered_template_rejected() {
        let graph = RelationshipGraph::default();
        let err = graph.validate_against(&TemplateRegistry::new()).unwrap_err();
        assert!(matches!(err, RelationshipError::Unregistered { .. }));
    }

    #[test]
    fn test_cycle_rejected() {
        let graph = RelationshipGraph::new(vec![
            TemplateRelationship::new(
                TemplateId::Chair,
                RelationshipKind::DependsOn,
                TemplateId::Table,
                1.0,
            ),
            TemplateRelationship::new(
                TemplateId::Table,
                RelationshipKind::DependsOn,
                TemplateId::Chair,
                1.0,
            ),
        ]);
        let registry = TemplateRegistry::with_reference_generators();
        assert!(matches!(
            graph.validate_against(&registry),
            Err(RelationshipError::Cycle(_))
        ));
    }

    #[test]
    fn test_dependencies_restricted_to_selection() {
        let graph = RelationshipGraph::default();
        let deps = graph.dependencies_among(&[
            TemplateId::Chair,
            TemplateId::Table,
            TemplateId::Lighting,
        ]);
        assert_eq!(deps.get(&TemplateId::Chair), Some(&vec![TemplateId::Table]));
        // stage not selected
        assert!(!deps.contains_key(&TemplateId::Lighting));
        // structure not selected
        assert!(!deps.contains_key(&TemplateId::Table));
    }

    #[test]
    fn test_strength_filter() {
        let graph = RelationshipGraph::default();
        let strong: Vec<_> = graph.edges_of(RelationshipKind::Enhances, 0.45).collect();
        assert!(strong.iter().all(|e| e.strength >= 0.45));
        assert!(strong.iter().any(|e| e.primary == TemplateId::Floral));
        assert!(!strong.iter().any(|e| e.primary == TemplateId::Landscape));
    }
}
