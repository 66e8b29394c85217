//! Which templates a run uses, in what priority, with what budget.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::template::TemplateId;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateStrategy {
    /// In declaration order
    pub required: Vec<TemplateId>,
    /// In declaration order; never repeats a required template
    pub optional: Vec<TemplateId>,
    pub priority: IndexMap<TemplateId, u32>,
    /// template → templates it depends on (selected ones only)
    pub dependencies: IndexMap<TemplateId, Vec<TemplateId>>,
    pub budget_allocation: IndexMap<TemplateId, f64>,
    /// Held back from allocation
    pub contingency: f64,
}

impl TemplateStrategy {
    /// Required then optional templates, in declaration order
    pub fn selected(&self) -> Vec<TemplateId> {
        self.required
            .iter()
            .chain(self.optional.iter())
            .copied()
            .collect()
    }

    pub fn is_selected(&self, template: TemplateId) -> bool {
        self.is_required(template) || self.optional.contains(&template)
    }

    pub fn is_required(&self, template: TemplateId) -> bool {
        self.required.contains(&template)
    }

    pub fn priority_of(&self, template: TemplateId) -> u32 {
        self.priority.get(&template).copied().unwrap_or(0)
    }

    pub fn allocation_of(&self, template: TemplateId) -> Option<f64> {
        self.budget_allocation.get(&template).copied()
    }

    pub fn dependencies_of(&self, template: TemplateId) -> &[TemplateId] {
        self.dependencies
            .get(&template)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn total_allocated(&self) -> f64 {
        self.budget_allocation.values().sum()
    }

    /// Position in declaration order, used to break priority ties
    pub fn declaration_index(&self, template: TemplateId) -> usize {
        self.selected()
            .iter()
            .position(|t| *t == template)
            .unwrap_or(usize::MAX)
    }
}
