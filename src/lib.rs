//! Clustering and impact ranking of customer feedback.
//!
//! Feedback is embedded, partitioned with cosine k-means, filtered into themes, labeled by a
//! language model (with a local fallback) and ranked by an impact score.

pub mod ai;
pub mod classify;
pub mod config;
pub mod error;
pub mod feedback;
pub mod io_utils;
pub mod logging;

pub use classify::{Classifier, ModelSettings, cluster_feedback};
pub use config::EngineConfig;
pub use error::{AppError, AppResult};
pub use feedback::{Cluster, ClusteringResult, FeedbackItem};
