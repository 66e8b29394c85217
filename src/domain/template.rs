//! Template identifiers and budget categories.
//!
//! A template is an independent generator producing one category of scene
//! content. The set is closed: every table keyed by template is an
//! exhaustive `match`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of a generative template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateId {
    Landscape,
    Structure,
    Climate,
    Security,
    Stage,
    Table,
    Chair,
    Lighting,
    Audiovisual,
    Floral,
    Interactive,
    Celebratory,
}

impl TemplateId {
    /// Every template, in assembly (draw) order.
    ///
    /// Background layers come first so that furniture and props are layered
    /// on top of them.
    pub const ASSEMBLY_ORDER: [TemplateId; 12] = [
        TemplateId::Landscape,
        TemplateId::Structure,
        TemplateId::Climate,
        TemplateId::Security,
        TemplateId::Stage,
        TemplateId::Table,
        TemplateId::Chair,
        TemplateId::Lighting,
        TemplateId::Audiovisual,
        TemplateId::Floral,
        TemplateId::Interactive,
        TemplateId::Celebratory,
    ];

    /// Stable string identifier
    pub fn as_str(self) -> &'static str {
        match self {
            TemplateId::Landscape => "landscape",
            TemplateId::Structure => "structure",
            TemplateId::Climate => "climate",
            TemplateId::Security => "security",
            TemplateId::Stage => "stage",
            TemplateId::Table => "table",
            TemplateId::Chair => "chair",
            TemplateId::Lighting => "lighting",
            TemplateId::Audiovisual => "audiovisual",
            TemplateId::Floral => "floral",
            TemplateId::Interactive => "interactive",
            TemplateId::Celebratory => "celebratory",
        }
    }

    /// Position in the fixed assembly order
    pub fn assembly_rank(self) -> usize {
        Self::ASSEMBLY_ORDER
            .iter()
            .position(|t| *t == self)
            .unwrap_or(Self::ASSEMBLY_ORDER.len())
    }

    /// Budget category this template draws from
    pub fn category(self) -> BudgetCategory {
        match self {
            TemplateId::Chair | TemplateId::Table => BudgetCategory::Furniture,
            TemplateId::Lighting => BudgetCategory::Lighting,
            TemplateId::Floral | TemplateId::Landscape | TemplateId::Celebratory => {
                BudgetCategory::Decor
            }
            TemplateId::Audiovisual | TemplateId::Interactive => BudgetCategory::Technology,
            TemplateId::Stage | TemplateId::Structure | TemplateId::Climate => {
                BudgetCategory::Infrastructure
            }
            TemplateId::Security => BudgetCategory::Safety,
        }
    }

    /// Whether the template's fragments may be freely repositioned by
    /// integration passes (background layers stay where generated).
    pub fn is_movable(self) -> bool {
        !matches!(
            self,
            TemplateId::Landscape | TemplateId::Structure | TemplateId::Stage
        )
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ASSEMBLY_ORDER
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown template '{}'", s))
    }
}

/// Budget categories used by the caller's breakdown and the master plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BudgetCategory {
    Furniture,
    Lighting,
    Decor,
    Technology,
    Infrastructure,
    Safety,
}

impl BudgetCategory {
    pub const ALL: [BudgetCategory; 6] = [
        BudgetCategory::Furniture,
        BudgetCategory::Lighting,
        BudgetCategory::Decor,
        BudgetCategory::Technology,
        BudgetCategory::Infrastructure,
        BudgetCategory::Safety,
    ];
}

impl fmt::Display for BudgetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BudgetCategory::Furniture => "furniture",
            BudgetCategory::Lighting => "lighting",
            BudgetCategory::Decor => "decor",
            BudgetCategory::Technology => "technology",
            BudgetCategory::Infrastructure => "infrastructure",
            BudgetCategory::Safety => "safety",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assembly_order_is_complete_and_unique() {
        let mut seen = std::collections::HashSet::new();
        for t in TemplateId::ASSEMBLY_ORDER {
            assert!(seen.insert(t));
        }
        assert_eq!(seen.len(), 12);
        assert_eq!(TemplateId::Landscape.assembly_rank(), 0);
        assert_eq!(TemplateId::Interactive.assembly_rank(), 10);
    }

    #[test]
    fn test_template_id_round_trip_through_str() {
        for t in TemplateId::ASSEMBLY_ORDER {
            assert_eq!(t.as_str().parse::<TemplateId>().unwrap(), t);
        }
        assert!("piano".parse::<TemplateId>().is_err());
    }

    #[test]
    fn test_serde_uses_kebab_case() {
        let json = serde_json::to_string(&TemplateId::Audiovisual).unwrap();
        assert_eq!(json, "\"audiovisual\"");
    }
}
