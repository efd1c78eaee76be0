use std::fmt::{Display, Formatter};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::AppResult;
use crate::error::AppError;
use crate::feedback::{FeedbackItem, ThemeCategory};

static FALLBACK_TITLE_WORDS: usize = 3;
static FALLBACK_HIGH_IMPACT_COUNT: usize = 3;

/// # theme_label
/// A short, human-readable name for a group of related customer feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ThemeLabel {
    /// Short title for the theme, a few words long.
    pub title: String,
    /// One or two sentences describing the problem or request.
    pub description: String,
    /// Whether the theme is mostly bugs or feature requests.
    pub category: ThemeCategory,
    /// True if the theme deserves attention soon regardless of its size.
    pub is_high_impact: bool,
    /// Why the theme was judged high impact or not.
    #[serde(default)]
    pub rationale: String,
}

impl Display for ThemeLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.category, self.title)
    }
}

impl ThemeLabel {
    /// Reject labels that would leave the theme unnamed.
    pub fn validate(self) -> AppResult<Self> {
        if self.title.trim().is_empty() || self.description.trim().is_empty() {
            return Err(AppError::Labeling(
                "label is missing a title or description".to_string(),
            ));
        }
        Ok(self)
    }

    /// Deterministic label used when the labeling collaborator cannot be used.
    pub fn fallback(examples: &[String], feedback_count: usize, category: ThemeCategory) -> Self {
        let first = examples.first().map(String::as_str).unwrap_or_default();
        let mut words = first
            .split_whitespace()
            .take(FALLBACK_TITLE_WORDS)
            .collect::<Vec<_>>()
            .join(" ");
        if words.is_empty() {
            words = "feedback".to_string();
        }
        let title = match category {
            ThemeCategory::Bug => format!("{feedback_count} bug reports about {words}"),
            ThemeCategory::Feature => format!("{feedback_count} feature requests about {words}"),
        };
        let description = if first.trim().is_empty() {
            title.clone()
        } else {
            first.to_string()
        };
        ThemeLabel {
            title,
            description,
            category,
            is_high_impact: feedback_count >= FALLBACK_HIGH_IMPACT_COUNT,
            rationale: "Labeled locally from the first example.".to_string(),
        }
    }
}

/// `Bug` when strictly more than half of the members are bugs, `Feature` otherwise.
pub fn majority_category(members: &[&FeedbackItem]) -> ThemeCategory {
    let bugs = members.iter().filter(|item| item.is_bug()).count();
    if bugs * 2 > members.len() {
        ThemeCategory::Bug
    } else {
        ThemeCategory::Feature
    }
}
