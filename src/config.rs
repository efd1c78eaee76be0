use serde::{Deserialize, Serialize};

use crate::classify::knn::CentroidUpdate;

/// Tunables of the clustering engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Fewest groups the partitioner is asked for.
    pub min_k: usize,
    /// Most groups the partitioner is asked for.
    pub max_k: usize,
    /// Corpus size is divided by this to pick the group count.
    pub items_per_cluster: usize,
    /// Groups smaller than this go to the unclustered bucket.
    pub min_cluster_size: usize,
    pub max_iterations: usize,
    /// Examples sent to the labeler per theme.
    pub max_label_examples: usize,
    /// Examples kept on each emitted cluster.
    pub max_cluster_examples: usize,
    /// Labeling calls allowed in flight at once.
    pub label_concurrency: usize,
    pub centroid_update: CentroidUpdate,
    /// Seed for centroid sampling; OS entropy when unset.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_k: 3,
            max_k: 10,
            items_per_cluster: 3,
            min_cluster_size: 2,
            max_iterations: 10,
            max_label_examples: 5,
            max_cluster_examples: 3,
            label_concurrency: 1,
            centroid_update: CentroidUpdate::Mean,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Number of groups to partition `n_items` into: `clamp(n / items_per_cluster, min_k, max_k)`,
    /// at least one and never more than `n_items`.
    pub fn cluster_count(&self, n_items: usize) -> usize {
        (n_items / self.items_per_cluster.max(1))
            .clamp(self.min_k, self.max_k.max(self.min_k))
            .max(1)
            .min(n_items)
    }
}
