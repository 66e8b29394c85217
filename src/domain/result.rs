//! Final output of an orchestration run.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::Event;
use super::fragment::SceneFragment;
use super::template::TemplateId;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationResult {
    pub run_id: Uuid,
    /// Root of the assembled scene
    pub scene: SceneFragment,
    /// Component sub-fragments, in assembly order
    pub components: IndexMap<TemplateId, SceneFragment>,
    pub metadata: ResultMetadata,
    /// Highest priority first
    pub recommendations: Vec<Recommendation>,
    pub cultural_notes: Vec<String>,
    /// Recovered degradations (skipped templates, skipped adjustments)
    pub notes: Vec<String>,
    /// Run journal
    pub events: Vec<Event>,
    /// Hash of the input parameters
    pub input_fingerprint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    pub template_count: usize,
    pub scores: QualityScores,
    /// spent / allocated
    pub budget_utilization: f64,
    pub generation_time_ms: u64,
}

/// The six 0–100 quality scores
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityScores {
    pub cultural_authenticity: f64,
    pub accessibility: f64,
    pub sustainability: f64,
    pub experience: f64,
    pub spatial_efficiency: f64,
    pub technical_integration: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecommendationPriority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecommendationKind {
    Cultural,
    Accessibility,
    Sustainability,
    Enhancement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Effort {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub priority: RecommendationPriority,
    pub kind: RecommendationKind,
    pub title: String,
    pub benefit: String,
    pub effort: Effort,
    pub estimated_cost: f64,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:?}/{:?}] {} ({}; effort {:?}, ~{:.0})",
            self.priority, self.kind, self.title, self.benefit, self.effort, self.estimated_cost
        )
    }
}
