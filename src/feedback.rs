use std::fmt::{Display, Formatter};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Kind of feedback as tagged by the submitter or an upstream triage step.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Bug,
    Feature,
    Other,
}

/// Category of a theme. Themes are either bug clusters or feature clusters.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ThemeCategory {
    Bug,
    Feature,
}

impl Display for ThemeCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ThemeCategory::Bug => write!(f, "bug"),
            ThemeCategory::Feature => write!(f, "feature"),
        }
    }
}

/// Plan of the customer who left the feedback.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CustomerTier {
    Enterprise,
    Pro,
    #[serde(alias = "free")]
    Starter,
}

/// A single piece of customer feedback. Owned by the caller and never mutated.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackItem {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_tier: Option<CustomerTier>,
    #[serde(default)]
    pub source: String,
}

impl FeedbackItem {
    pub fn is_bug(&self) -> bool {
        self.category == Some(Category::Bug)
    }

    pub fn is_enterprise(&self) -> bool {
        self.customer_tier == Some(CustomerTier::Enterprise)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ImpactTier {
    High,
    Medium,
    Low,
}

impl ImpactTier {
    /// Map a 0..=100 score onto a tier.
    pub fn from_score(score: u8) -> Self {
        match score {
            75.. => ImpactTier::High,
            40..=74 => ImpactTier::Medium,
            _ => ImpactTier::Low,
        }
    }
}

/// A validated, labeled and scored theme.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: ThemeCategory,
    pub impact_score: u8,
    pub impact_tier: ImpactTier,
    pub feedback_count: usize,
    pub enterprise_count: usize,
    pub examples: Vec<String>,
    pub feedback_ids: Vec<String>,
}

/// Ranked themes plus the ids that did not belong to any theme.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClusteringResult {
    pub clusters: Vec<Cluster>,
    pub unclustered: Vec<String>,
}
