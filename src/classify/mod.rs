pub(crate) mod convert;
pub mod knn;
pub(crate) mod linalg;
pub mod openai;
pub mod score;
pub mod theme;
pub mod traits;

use async_openai::{Client, config::Config};
use futures::StreamExt;
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand::{Rng, SeedableRng};
use tracing::{Instrument, debug, info, info_span, warn};
use tracing_indicatif::span_ext::IndicatifSpanExt;
use tracing_indicatif::style::ProgressStyle;

use crate::AppResult;
use crate::ai::label_theme::OAILabeler;
use crate::classify::knn::{Group, Knn};
use crate::classify::score::score_members;
use crate::classify::theme::{ThemeLabel, majority_category};
use crate::classify::traits::{Embedder, Labeler};
use crate::config::EngineConfig;
use crate::error::AppError;
use crate::feedback::{Cluster, ClusteringResult, FeedbackItem, ImpactTier, ThemeCategory};

/// Below this many items the corpus is not partitioned at all.
static MIN_CLUSTERABLE_ITEMS: usize = 3;
/// Themes always hold at least this many items, whatever the configuration says.
static MIN_THEME_SIZE: usize = 2;
static SINGLETON_SCORE: u8 = 50;
static SINGLETON_TITLE_CHARS: usize = 80;

/// Model names used by [`cluster_feedback`].
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub embedding_model: String,
    pub label_model: String,
    pub label_timeout: Option<std::time::Duration>,
}

/// Turns a batch of feedback into ranked, labeled themes.
pub struct Classifier<E, L> {
    embedder: E,
    labeler: L,
    config: EngineConfig,
}

impl<E: Embedder, L: Labeler> Classifier<E, L> {
    pub fn new(embedder: E, labeler: L) -> Self {
        Self {
            embedder,
            labeler,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Cluster `items`, seeding the partitioner from `config.seed` or OS entropy.
    pub async fn classify(&self, items: &[FeedbackItem]) -> AppResult<ClusteringResult> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        self.classify_with_rng(items, &mut rng).await
    }

    /// Cluster `items` with a caller-provided random source for centroid seeding.
    ///
    /// Only embedding failures are returned as errors; labeling failures fall back to a local label.
    #[tracing::instrument(
        name = "Clustering feedback",
        level = "info",
        skip_all,
        fields(items = items.len())
    )]
    pub async fn classify_with_rng<R: Rng + Send + ?Sized>(
        &self,
        items: &[FeedbackItem],
        rng: &mut R,
    ) -> AppResult<ClusteringResult> {
        if items.is_empty() {
            debug!("No feedback to cluster");
            return Ok(ClusteringResult::default());
        }

        let texts: Vec<String> = items.iter().map(|item| item.text.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;
        let arr = convert::embeddings_to_ndarray(&embeddings, items.len())?;

        if items.len() < MIN_CLUSTERABLE_ITEMS {
            info!("Only {} items, emitting one theme per item", items.len());
            return Ok(singleton_result(items));
        }

        let k = self.config.cluster_count(items.len());
        let mut knn = Knn::new(k);
        knn.set_max_iterations(self.config.max_iterations)
            .set_update(self.config.centroid_update)
            .fit(&arr, rng)?;
        let groups = knn
            .groups()
            .ok_or_else(|| AppError::Other("partitioner produced no groups".to_string()))?;

        let (themes, unclustered) = split_groups(groups, self.config.min_cluster_size.max(MIN_THEME_SIZE));
        info!(
            "Partitioned into {k} groups: {} themes, {} unclustered items",
            themes.len(),
            unclustered.len()
        );

        let labels = self.label_themes(items, &themes).await;

        let mut clusters: Vec<Cluster> = themes
            .iter()
            .zip(labels)
            .enumerate()
            .map(|(pos, (members, label))| {
                build_cluster(
                    pos + 1,
                    items,
                    members,
                    label,
                    self.config.max_cluster_examples,
                )
            })
            .collect();
        // Stable, so equal scores keep group order.
        clusters.sort_by(|a, b| b.impact_score.cmp(&a.impact_score));

        Ok(ClusteringResult {
            clusters,
            unclustered: unclustered
                .into_iter()
                .map(|idx| items[idx].id.clone())
                .collect(),
        })
    }

    async fn label_themes(&self, items: &[FeedbackItem], themes: &[Vec<usize>]) -> Vec<ThemeLabel> {
        let header_span = info_span!("Labeling feedback themes...");
        header_span.pb_set_message("Labeling...");
        header_span.pb_set_finish_message("Labeling complete");
        header_span.pb_set_length(themes.len() as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        {
            header_span.pb_set_style(&style);
        }

        let span = header_span.clone();
        futures::stream::iter(themes.iter().map(|members| {
            let span = span.clone();
            async move {
                let label = self.label_theme(items, members).await;
                span.pb_inc(1);
                label
            }
        }))
        .buffered(self.config.label_concurrency.max(1))
        .collect::<Vec<_>>()
        .instrument(header_span)
        .await
    }

    async fn label_theme(&self, items: &[FeedbackItem], members: &[usize]) -> ThemeLabel {
        let member_items: Vec<&FeedbackItem> = members.iter().map(|&idx| &items[idx]).collect();
        let category = majority_category(&member_items);
        let examples: Vec<String> = member_items
            .iter()
            .take(self.config.max_label_examples)
            .map(|item| item.text.clone())
            .collect();

        match self
            .labeler
            .label(&examples, category)
            .await
            .and_then(ThemeLabel::validate)
        {
            Ok(label) => {
                debug!("Labeled theme: {label}");
                label
            }
            Err(e) => {
                warn!(
                    "Labeling a theme of {} items failed, using a local label: {e}",
                    members.len()
                );
                ThemeLabel::fallback(&examples, members.len(), category)
            }
        }
    }
}

/// Keep groups with at least `min_size` members; the rest go to the unclustered indices.
fn split_groups(groups: Vec<Group>, min_size: usize) -> (Vec<Vec<usize>>, Vec<usize>) {
    let mut themes = Vec::new();
    let mut unclustered = Vec::new();
    for group in groups {
        if group.members.len() >= min_size {
            themes.push(group.members);
        } else {
            unclustered.extend(group.members);
        }
    }
    unclustered.sort_unstable();
    (themes, unclustered)
}

fn build_cluster(
    position: usize,
    items: &[FeedbackItem],
    members: &[usize],
    label: ThemeLabel,
    max_examples: usize,
) -> Cluster {
    let member_items: Vec<&FeedbackItem> = members.iter().map(|&idx| &items[idx]).collect();
    let impact = score_members(&member_items, label.is_high_impact);
    Cluster {
        id: format!("cluster-{position}"),
        title: label.title,
        description: label.description,
        category: label.category,
        impact_score: impact.score,
        impact_tier: impact.tier,
        feedback_count: member_items.len(),
        enterprise_count: impact.enterprise_count,
        examples: member_items
            .iter()
            .take(max_examples)
            .map(|item| item.text.clone())
            .collect(),
        feedback_ids: member_items.iter().map(|item| item.id.clone()).collect(),
    }
}

fn truncate_title(text: &str) -> String {
    let mut chars = text.trim().chars();
    let head: String = chars.by_ref().take(SINGLETON_TITLE_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

/// Too few items to cluster: every item is its own theme and nothing is unclustered.
fn singleton_result(items: &[FeedbackItem]) -> ClusteringResult {
    let clusters = items
        .iter()
        .enumerate()
        .map(|(pos, item)| {
            let (category, impact_tier) = if item.is_bug() {
                (ThemeCategory::Bug, ImpactTier::High)
            } else {
                (ThemeCategory::Feature, ImpactTier::Medium)
            };
            Cluster {
                id: format!("cluster-{}", pos + 1),
                title: truncate_title(&item.text),
                description: item.text.clone(),
                category,
                impact_score: SINGLETON_SCORE,
                impact_tier,
                feedback_count: 1,
                enterprise_count: usize::from(item.is_enterprise()),
                examples: vec![item.text.clone()],
                feedback_ids: vec![item.id.clone()],
            }
        })
        .collect();
    ClusteringResult {
        clusters,
        unclustered: Vec::new(),
    }
}

/// Entry point: embed feedback, cluster it, and label the themes with an OpenAI-compatible server.
#[tracing::instrument(
    name = "Finding feedback themes",
    level = "info",
    skip(client, items, config)
)]
pub async fn cluster_feedback<C: Config>(
    client: &Client<C>,
    models: &ModelSettings,
    config: EngineConfig,
    items: &[FeedbackItem],
) -> AppResult<ClusteringResult> {
    let embedder = openai::OAIEmbedder::new(client, models.embedding_model.clone());
    let labeler = OAILabeler::new(client, models.label_model.clone())
        .with_timeout(models.label_timeout);
    let classifier = Classifier::new(embedder, labeler).with_config(config);
    classifier.classify(items).await
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::FutureExt;
    use futures::future::BoxFuture;

    use super::*;
    use crate::feedback::{Category, CustomerTier};

    struct MapEmbedder {
        vectors: HashMap<String, Vec<f32>>,
        calls: AtomicUsize,
    }

    impl MapEmbedder {
        fn new(pairs: &[(&FeedbackItem, Vec<f32>)]) -> Self {
            Self {
                vectors: pairs
                    .iter()
                    .map(|(item, v)| (item.text.clone(), v.clone()))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Embedder for MapEmbedder {
        fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, AppResult<Vec<Vec<f32>>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let out = texts
                .iter()
                .map(|t| {
                    self.vectors
                        .get(t)
                        .cloned()
                        .ok_or_else(|| AppError::Other(format!("no vector for {t}")))
                })
                .collect::<AppResult<Vec<_>>>();
            futures::future::ready(out).boxed()
        }
    }

    struct DownEmbedder;

    impl Embedder for DownEmbedder {
        fn embed<'a>(&'a self, _texts: &'a [String]) -> BoxFuture<'a, AppResult<Vec<Vec<f32>>>> {
            futures::future::ready(Err(AppError::Other("provider down".to_string()))).boxed()
        }
    }

    /// Names a theme after its first example; fails when that example contains `fail_on`.
    #[derive(Default)]
    struct EchoLabeler {
        calls: AtomicUsize,
        widest: AtomicUsize,
        fail_on: Option<&'static str>,
        high_impact: bool,
    }

    impl Labeler for EchoLabeler {
        fn label<'a>(
            &'a self,
            examples: &'a [String],
            category: ThemeCategory,
        ) -> BoxFuture<'a, AppResult<ThemeLabel>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.widest.fetch_max(examples.len(), Ordering::SeqCst);
            let out = match self.fail_on {
                Some(marker) if examples[0].contains(marker) => {
                    Err(AppError::Labeling("upstream timeout".to_string()))
                }
                _ => Ok(ThemeLabel {
                    title: format!("Theme: {}", examples[0]),
                    description: examples.join(" | "),
                    category,
                    is_high_impact: self.high_impact,
                    rationale: String::new(),
                }),
            };
            futures::future::ready(out).boxed()
        }
    }

    fn item(
        id: &str,
        text: &str,
        category: Option<Category>,
        tier: Option<CustomerTier>,
    ) -> FeedbackItem {
        FeedbackItem {
            id: id.to_string(),
            text: text.to_string(),
            category,
            customer_tier: tier,
            source: "test".to_string(),
        }
    }

    /// `n` items spread over three directions, with mixed categories and tiers.
    fn corpus(n: usize) -> (Vec<FeedbackItem>, MapEmbedder) {
        let items: Vec<FeedbackItem> = (0..n)
            .map(|i| {
                let category = match i % 4 {
                    0 => Some(Category::Bug),
                    1 => Some(Category::Feature),
                    2 => Some(Category::Other),
                    _ => None,
                };
                let tier = match i % 3 {
                    0 => Some(CustomerTier::Enterprise),
                    1 => Some(CustomerTier::Pro),
                    _ => None,
                };
                item(&format!("fb-{i}"), &format!("feedback {i}"), category, tier)
            })
            .collect();
        let pairs: Vec<(&FeedbackItem, Vec<f32>)> = items
            .iter()
            .enumerate()
            .map(|(i, it)| {
                let mut v = vec![0.0_f32; 4];
                v[i % 3] = 1.0;
                v[3] = i as f32 * 0.01;
                (it, v)
            })
            .collect();
        let embedder = MapEmbedder::new(&pairs);
        (items, embedder)
    }

    /// Items sharing one vector always land in the first group, whatever the seeding.
    fn same_direction(texts: &[&str]) -> (Vec<FeedbackItem>, MapEmbedder) {
        let items: Vec<FeedbackItem> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| item(&format!("s-{i}"), t, Some(Category::Feature), None))
            .collect();
        let pairs: Vec<(&FeedbackItem, Vec<f32>)> =
            items.iter().map(|it| (it, vec![0.3, 0.4, 0.5])).collect();
        let embedder = MapEmbedder::new(&pairs);
        (items, embedder)
    }

    fn assert_result_invariants(items: &[FeedbackItem], result: &ClusteringResult) {
        let mut seen: Vec<&str> = result
            .clusters
            .iter()
            .flat_map(|c| c.feedback_ids.iter().map(String::as_str))
            .chain(result.unclustered.iter().map(String::as_str))
            .collect();
        seen.sort_unstable();
        let mut expected: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        expected.sort_unstable();
        assert_eq!(seen, expected, "every id must appear exactly once");

        for cluster in &result.clusters {
            assert_eq!(cluster.feedback_count, cluster.feedback_ids.len());
            assert!(cluster.feedback_count >= 2);
            assert!(cluster.impact_score <= 100);
            assert_eq!(cluster.impact_tier, ImpactTier::from_score(cluster.impact_score));
            assert!(cluster.examples.len() <= 3);
            assert!(!cluster.title.is_empty());
        }
        assert!(
            result
                .clusters
                .windows(2)
                .all(|w| w[0].impact_score >= w[1].impact_score)
        );
    }

    #[tokio::test]
    async fn empty_input_skips_collaborators() {
        let (_, embedder) = corpus(0);
        let classifier = Classifier::new(embedder, EchoLabeler::default());

        let result = classifier.classify(&[]).await.unwrap();

        assert_eq!(result, ClusteringResult::default());
        assert_eq!(classifier.embedder.calls.load(Ordering::SeqCst), 0);
        assert_eq!(classifier.labeler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn embedding_failure_is_returned() {
        let (items, _) = corpus(9);
        let classifier = Classifier::new(DownEmbedder, EchoLabeler::default());

        let err = classifier.classify(&items).await.unwrap_err();

        assert!(matches!(err, AppError::Other(ref msg) if msg == "provider down"));
        assert_eq!(classifier.labeler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn short_embedding_batch_is_an_error() {
        let (items, mut embedder) = corpus(4);
        embedder.vectors.insert(items[3].text.clone(), vec![1.0]);
        let classifier = Classifier::new(embedder, EchoLabeler::default());

        let err = classifier.classify(&items).await.unwrap_err();
        assert!(matches!(err, AppError::EmbeddingShape(_)));
    }

    #[tokio::test]
    async fn one_or_two_items_become_singletons() {
        let bug = item(
            "a",
            "Crash on save",
            Some(Category::Bug),
            Some(CustomerTier::Enterprise),
        );
        let idea = item("b", "Please add dark mode", None, None);
        let embedder = MapEmbedder::new(&[(&bug, vec![1.0, 0.0]), (&idea, vec![0.0, 1.0])]);
        let classifier = Classifier::new(embedder, EchoLabeler::default());

        let result = classifier.classify(&[bug.clone()]).await.unwrap();
        assert_eq!(result.clusters.len(), 1);
        assert!(result.unclustered.is_empty());

        let result = classifier.classify(&[bug, idea]).await.unwrap();
        assert_eq!(result.clusters.len(), 2);
        assert!(result.unclustered.is_empty());

        let first = &result.clusters[0];
        assert_eq!(first.feedback_ids, vec!["a"]);
        assert_eq!(first.impact_score, 50);
        assert_eq!(first.impact_tier, ImpactTier::High);
        assert_eq!(first.category, ThemeCategory::Bug);
        assert_eq!(first.enterprise_count, 1);
        assert_eq!(first.title, "Crash on save");

        let second = &result.clusters[1];
        assert_eq!(second.impact_tier, ImpactTier::Medium);
        assert_eq!(second.category, ThemeCategory::Feature);
        assert_eq!(second.examples, vec!["Please add dark mode"]);

        assert_eq!(classifier.labeler.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn long_singleton_titles_are_truncated() {
        let text = "é".repeat(120);
        let title = truncate_title(&text);
        assert_eq!(title.chars().count(), 81);
        assert!(title.ends_with('…'));
        assert_eq!(truncate_title("short"), "short");
    }

    #[tokio::test]
    async fn results_partition_the_input_for_any_seed() {
        for n in [3, 5, 8, 20, 41] {
            let (items, embedder) = corpus(n);
            let classifier = Classifier::new(embedder, EchoLabeler::default());
            for seed in 0..6 {
                let mut rng = StdRng::seed_from_u64(seed);
                let result = classifier.classify_with_rng(&items, &mut rng).await.unwrap();
                assert_result_invariants(&items, &result);
            }
        }
    }

    #[tokio::test]
    async fn same_seed_same_result() {
        let (items, embedder) = corpus(20);
        let config = EngineConfig {
            seed: Some(11),
            ..Default::default()
        };
        let classifier = Classifier::new(embedder, EchoLabeler::default()).with_config(config);

        let first = classifier.classify(&items).await.unwrap();
        let second = classifier.classify(&items).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn zero_cluster_bounds_still_produce_a_result() {
        let (items, embedder) = corpus(6);
        let config = EngineConfig {
            min_k: 0,
            max_k: 0,
            seed: Some(3),
            ..Default::default()
        };
        let classifier = Classifier::new(embedder, EchoLabeler::default()).with_config(config);

        let result = classifier.classify(&items).await.unwrap();
        assert_result_invariants(&items, &result);
        assert_eq!(result.clusters.len(), 1);
        assert_eq!(result.clusters[0].feedback_count, 6);
    }

    #[tokio::test]
    async fn failing_labeler_falls_back_per_theme() {
        let (items, embedder) = same_direction(&[
            "Export to CSV times out",
            "CSV export is slow",
            "Exports never finish",
            "Export button spins forever",
        ]);
        let labeler = EchoLabeler {
            fail_on: Some(""),
            ..Default::default()
        };
        let classifier = Classifier::new(embedder, labeler);

        let result = classifier.classify(&items).await.unwrap();

        assert_result_invariants(&items, &result);
        assert_eq!(result.clusters.len(), 1);
        let cluster = &result.clusters[0];
        assert_eq!(cluster.title, "4 feature requests about Export to CSV");
        assert_eq!(cluster.description, "Export to CSV times out");
        // 4 * (15 + 5) + 15 = 95
        assert_eq!(cluster.impact_score, 95);
        assert_eq!(classifier.labeler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn labeler_sees_five_examples_and_cluster_keeps_three() {
        let texts: Vec<String> = (0..9).map(|i| format!("Search misses result {i}")).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let (items, embedder) = same_direction(&refs);
        let classifier = Classifier::new(embedder, EchoLabeler::default());

        let result = classifier.classify(&items).await.unwrap();

        assert_eq!(classifier.labeler.widest.load(Ordering::SeqCst), 5);
        let cluster = &result.clusters[0];
        assert_eq!(cluster.feedback_count, 9);
        assert_eq!(
            cluster.examples,
            vec![
                "Search misses result 0",
                "Search misses result 1",
                "Search misses result 2"
            ]
        );
        assert_eq!(cluster.title, "Theme: Search misses result 0");
    }

    #[test]
    fn labeler_high_impact_promotes_score() {
        let items = vec![
            item("a", "Need audit logs", Some(Category::Feature), None),
            item("b", "Audit log export", None, Some(CustomerTier::Starter)),
        ];
        let label = ThemeLabel {
            title: "Audit logs".to_string(),
            description: "Admins want an audit trail".to_string(),
            category: ThemeCategory::Feature,
            is_high_impact: true,
            rationale: "Compliance blocker".to_string(),
        };

        let cluster = build_cluster(2, &items, &[0, 1], label.clone(), 3);
        // 2 * (15 + 5) + 5 = 45, lifted to the high impact floor.
        assert_eq!(cluster.impact_score, 75);
        assert_eq!(cluster.impact_tier, ImpactTier::High);
        assert_eq!(cluster.id, "cluster-2");

        let plain = ThemeLabel {
            is_high_impact: false,
            ..label
        };
        let cluster = build_cluster(1, &items, &[0, 1], plain, 3);
        assert_eq!(cluster.impact_score, 45);
        assert_eq!(cluster.impact_tier, ImpactTier::Medium);
        assert_eq!(cluster.feedback_ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn enterprise_bug_scenario() {
        let items = vec![
            item(
                "b1",
                "App crashes on login",
                Some(Category::Bug),
                Some(CustomerTier::Enterprise),
            ),
            item(
                "b2",
                "Crash when opening settings",
                Some(Category::Bug),
                Some(CustomerTier::Enterprise),
            ),
            item(
                "p1",
                "Add SSO support",
                Some(Category::Feature),
                Some(CustomerTier::Pro),
            ),
            item("f1", "Dark mode please", Some(Category::Feature), None),
            item("f2", "Dark theme for the editor", Some(Category::Feature), None),
            item("f3", "Night mode", Some(Category::Feature), None),
            item("f4", "Darker sidebar colors", Some(Category::Feature), None),
            item("f5", "A dark UI option", Some(Category::Feature), None),
        ];
        let vectors = [
            vec![1.0, 0.0, 0.0],
            vec![0.95, 0.05, 0.0],
            vec![0.0, 1.0, 0.1],
            vec![0.0, 0.1, 1.0],
            vec![0.02, 0.12, 0.98],
            vec![0.01, 0.08, 1.0],
            vec![0.0, 0.15, 0.97],
            vec![0.03, 0.1, 0.99],
        ];
        let pairs: Vec<(&FeedbackItem, Vec<f32>)> =
            items.iter().zip(vectors.iter().cloned()).collect();
        let classifier = Classifier::new(MapEmbedder::new(&pairs), EchoLabeler::default());
        assert_eq!(classifier.config().cluster_count(items.len()), 3);

        let mut found = false;
        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let result = classifier.classify_with_rng(&items, &mut rng).await.unwrap();
            assert_result_invariants(&items, &result);

            if let Some(cluster) = result
                .clusters
                .iter()
                .find(|c| c.feedback_ids == vec!["b1", "b2"])
            {
                found = true;
                assert_eq!(cluster.impact_score, 100);
                assert_eq!(cluster.impact_tier, ImpactTier::High);
                assert_eq!(cluster.enterprise_count, 2);
                assert_eq!(cluster.category, ThemeCategory::Bug);
                assert_eq!(result.clusters[0].impact_score, 100);
            }
        }
        assert!(found, "no seed grouped the two enterprise bugs together");
    }

    #[tokio::test]
    async fn concurrent_labeling_keeps_order_and_isolates_failures() {
        let (items, embedder) = corpus(30);
        let labeler = EchoLabeler {
            fail_on: Some("feedback 1"),
            ..Default::default()
        };
        let config = EngineConfig {
            label_concurrency: 4,
            ..Default::default()
        };
        let classifier = Classifier::new(embedder, labeler).with_config(config);

        let mut rng = StdRng::seed_from_u64(3);
        let result = classifier.classify_with_rng(&items, &mut rng).await.unwrap();

        assert_result_invariants(&items, &result);
        let by_id: HashMap<&str, &FeedbackItem> =
            items.iter().map(|i| (i.id.as_str(), i)).collect();
        for cluster in &result.clusters {
            let first = &by_id[cluster.feedback_ids[0].as_str()].text;
            if first.contains("feedback 1") {
                assert!(cluster.title.contains("about feedback 1"));
            } else {
                assert_eq!(cluster.title, format!("Theme: {first}"));
            }
        }
    }

    #[test]
    fn small_groups_go_to_unclustered_in_input_order() {
        let groups = vec![
            Group {
                centroid: ndarray::arr1(&[1.0]),
                members: vec![4],
            },
            Group {
                centroid: ndarray::arr1(&[1.0]),
                members: vec![0, 2, 3],
            },
            Group {
                centroid: ndarray::arr1(&[1.0]),
                members: vec![],
            },
            Group {
                centroid: ndarray::arr1(&[1.0]),
                members: vec![1],
            },
        ];
        let (themes, unclustered) = split_groups(groups, 2);
        assert_eq!(themes, vec![vec![0, 2, 3]]);
        assert_eq!(unclustered, vec![1, 4]);
    }
}
