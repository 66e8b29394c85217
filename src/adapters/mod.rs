//! Adapter interfaces for the generative subsystems.
//!
//! Generators turn a synthesized parameter record into scene content. They
//! know nothing about each other; the orchestrator owns every cross-template
//! decision. The cultural knowledge base supplies per-culture profiles.

pub mod generators;
pub mod knowledge;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{TemplateId, TemplateInstance, TemplateParams};

pub use generators::ReferenceGenerator;
pub use knowledge::{
    Aesthetics, CulturalKnowledgeBase, CulturalProfile, Ergonomics, MaterialProfile, Proportions,
    StaticKnowledgeBase, Traditions,
};

/// Errors a generator may report
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerationError {
    #[error("parameters for {got} handed to the {expected} generator")]
    WrongTemplate { expected: TemplateId, got: TemplateId },

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("timed out after {limit_ms}ms")]
    TimedOut { limit_ms: u64 },

    #[error("generator task aborted: {0}")]
    Aborted(String),

    #[error("{0}")]
    Failed(String),
}

impl GenerationError {
    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, GenerationError::TimedOut { .. } | GenerationError::Failed(_))
    }
}

/// Trait for template generators
#[async_trait]
pub trait TemplateGenerator: Send + Sync {
    /// Template this generator produces
    fn template(&self) -> TemplateId;

    /// Human-readable generator name
    fn name(&self) -> &str {
        self.template().as_str()
    }

    /// Produce scene content for one template
    async fn generate(&self, params: &TemplateParams) -> Result<TemplateInstance, GenerationError>;
}
