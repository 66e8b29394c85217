//! Integration Pass Tests
//!
//! Checks what the integration and validation phases leave behind in a
//! finished scene: a clear egress spine, marked wheelchair positions and
//! lighting wired to the AV desk.

use eventscape::core::integration::{HEADROOM_M, WHEELCHAIR_POSITION};
use eventscape::core::{CompatibilityTable, Orchestrator, OrchestratorSettings, PlanPreview};
use eventscape::domain::{
    tags, Culture, EventKind, EventOrchestrationParameters, OrchestrationResult, TemplateId,
};

fn orchestrator() -> Orchestrator {
    Orchestrator::with_reference_generators(OrchestratorSettings::default(), CompatibilityTable::default())
        .unwrap()
}

fn corporate_launch() -> EventOrchestrationParameters {
    let mut params = EventOrchestrationParameters::new(EventKind::Corporate, Culture::Scandinavian, 90, 48_000.0);
    params.technology.audiovisual = true;
    params
}

async fn run(params: &EventOrchestrationParameters) -> (OrchestrationResult, PlanPreview) {
    let orchestrator = orchestrator();
    let preview = orchestrator.preview(params).unwrap();
    let result = orchestrator.run(params).await.unwrap();
    (result, preview)
}

#[tokio::test]
async fn test_egress_spine_is_clear_or_flagged() {
    let params = corporate_launch();
    let (result, preview) = run(&params).await;
    let corridor = preview.plan.primary_spine().unwrap().corridor();

    for (template, component) in &result.components {
        if *template == TemplateId::Structure {
            continue;
        }
        for fragment in &component.children {
            let p = fragment.position();
            let inside = p.y < HEADROOM_M
                && p.x > corridor.min_x + 1e-6
                && p.x < corridor.max_x - 1e-6
                && p.z > corridor.min_z + 1e-6
                && p.z < corridor.max_z - 1e-6;
            if inside {
                assert!(
                    fragment.tag_bool(tags::EGRESS_CONFLICT),
                    "{} {} blocks the spine",
                    template,
                    fragment.name
                );
            }
        }
    }
}

#[tokio::test]
async fn test_wheelchair_positions_marked_nearest_entrance() {
    let params = corporate_launch();
    let (result, preview) = run(&params).await;
    let chairs = &result.components[&TemplateId::Chair].children;
    let wanted = preview.plan.accessibility.wheelchair_positions as usize;

    let marked: Vec<_> = chairs
        .iter()
        .filter(|c| {
            c.tag_strings(tags::ACCESSIBILITY_FEATURES)
                .iter()
                .any(|f| f == WHEELCHAIR_POSITION)
        })
        .collect();
    assert_eq!(marked.len(), wanted.min(chairs.len()));

    let entrance = preview.plan.entrance();
    let farthest_marked = marked
        .iter()
        .map(|c| c.position().planar_distance(&entrance))
        .fold(0.0f64, f64::max);
    let unmarked_closer = chairs
        .iter()
        .filter(|c| !marked.iter().any(|m| std::ptr::eq(*m, *c)))
        .filter(|c| c.position().planar_distance(&entrance) < farthest_marked - 1e-9)
        .count();
    assert_eq!(unmarked_closer, 0);
}

#[tokio::test]
async fn test_lighting_and_audiovisual_share_control_links() {
    let (result, _) = run(&corporate_launch()).await;

    let lighting = &result.components[&TemplateId::Lighting];
    assert!(!lighting.children.is_empty());
    for light in &lighting.children {
        assert!(light
            .tag_strings(tags::CONTROL_LINKS)
            .iter()
            .any(|l| l.starts_with("audiovisual:")));
    }
    for gear in &result.components[&TemplateId::Audiovisual].children {
        assert!(gear
            .tag_strings(tags::CONTROL_LINKS)
            .iter()
            .any(|l| l.starts_with("lighting:")));
    }
    assert!(result.metadata.scores.technical_integration > 0.0);
}

#[tokio::test]
async fn test_chairs_stay_with_their_tables() {
    let (result, _) = run(&corporate_launch()).await;
    let tables = &result.components[&TemplateId::Table].children;

    for chair in &result.components[&TemplateId::Chair].children {
        let Some(anchor) = chair.tag_u64(tags::ANCHOR_INDEX) else {
            continue;
        };
        let table = &tables[anchor as usize];
        // a ring seat may have been nudged out of the spine, but never far
        assert!(chair.position().planar_distance(&table.position()) < 6.0, "{}", chair.name);
    }
}
