use futures::future::BoxFuture;

use crate::AppResult;
use crate::classify::theme::ThemeLabel;
use crate::feedback::ThemeCategory;

/// Trait for converting text into vector embeddings.
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts.
    /// Returns one embedding per input text, in input order. Any failure fails the whole batch.
    fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, AppResult<Vec<Vec<f32>>>>;
}

/// Trait for naming a group of related feedback.
pub trait Labeler: Send + Sync {
    /// Produce a theme label from representative examples and the group's majority category.
    fn label<'a>(
        &'a self,
        examples: &'a [String],
        category: ThemeCategory,
    ) -> BoxFuture<'a, AppResult<ThemeLabel>>;
}
