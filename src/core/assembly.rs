//! Scene assembly.
//!
//! Every present template becomes one named sub-fragment of the root, always
//! in [`TemplateId::ASSEMBLY_ORDER`] so that background layers draw first no
//! matter which generator finished first.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::{tags, EventOrchestrationParameters, SceneFragment, TemplateId, TemplateInstances};

use super::validation::ValidationScores;

/// Version stamped on every assembled scene
pub const ORCHESTRATION_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const ROOT_NAME: &str = "event-scene";

#[derive(Debug, Clone, Default)]
pub struct SceneAssembler;

impl SceneAssembler {
    pub fn new() -> Self {
        Self
    }

    pub fn assemble(
        &self,
        mut instances: TemplateInstances,
        params: &EventOrchestrationParameters,
        scores: &ValidationScores,
        generated_at: DateTime<Utc>,
    ) -> SceneFragment {
        let mut root = SceneFragment::new(ROOT_NAME)
            .with_tag(tags::TYPE, "scene")
            .with_tag("eventType", params.event.event_type.to_string())
            .with_tag("culture", params.culture.primary.as_str())
            .with_tag("scale", params.scale().to_string())
            .with_tag("guestCount", params.guests.total)
            .with_tag("culturalAuthenticity", scores.cultural_authenticity)
            .with_tag("accessibilityScore", scores.accessibility)
            .with_tag("sustainabilityScore", scores.sustainability)
            .with_tag("generatedAt", generated_at.to_rfc3339())
            .with_tag("orchestrationVersion", ORCHESTRATION_VERSION);

        for template in TemplateId::ASSEMBLY_ORDER {
            let Some(instance) = instances.remove(template) else {
                continue;
            };
            let mut component = SceneFragment::new(template.as_str())
                .with_tag(tags::TYPE, "component")
                .with_tag(tags::COMPONENT, template.as_str())
                .with_tag("itemCount", instance.len());
            for fragment in instance.into_fragments() {
                component.add_child(fragment);
            }
            root.add_child(component);
        }

        debug!(
            components = root.children.len(),
            nodes = root.node_count(),
            "Scene assembled"
        );
        root
    }
}

/// Template a component sub-fragment stands for
pub fn component_template(component: &SceneFragment) -> Option<TemplateId> {
    component.tag_str(tags::COMPONENT)?.parse().ok()
}
