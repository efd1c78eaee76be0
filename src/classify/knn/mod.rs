mod lloyd;

use std::collections::HashSet;

use clap::ValueEnum;
use ndarray::prelude::*;
use ndarray_rand::rand::Rng;
use ndarray_rand::rand::seq::index;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::AppResult;
use crate::error::AppError;

static DEFAULT_MAX_ITER: usize = 10;

/// How a centroid is rebuilt from its members after each assignment pass.
#[derive(Serialize, Deserialize, ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CentroidUpdate {
    /// Coordinate-wise mean of the member vectors.
    #[default]
    Mean,
    /// Mean re-normalized to unit length (spherical k-means).
    Spherical,
}

/// A centroid plus the indices of the samples assigned to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub centroid: Array1<f64>,
    pub members: Vec<usize>,
}

/// K-Means over cosine similarity with random distinct-sample seeding.
pub struct Knn {
    pub k: usize,
    pub max_iterations: usize,
    pub update: CentroidUpdate,
    cluster_centers: Option<Array2<f64>>,
    labels: Option<Array1<usize>>,
    n_iter: Option<usize>,
    converged: bool,
}

impl Knn {
    pub fn new(k: usize) -> Self {
        Knn {
            k,
            max_iterations: DEFAULT_MAX_ITER,
            update: CentroidUpdate::default(),
            cluster_centers: None,
            labels: None,
            n_iter: None,
            converged: false,
        }
    }

    pub fn set_max_iterations(&mut self, max_iterations: usize) -> &mut Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn set_update(&mut self, update: CentroidUpdate) -> &mut Self {
        self.update = update;
        self
    }

    /// Pick `k` distinct rows of `x` as the starting centers.
    fn init_centroids<R: Rng + ?Sized>(&self, x: &Array2<f64>, rng: &mut R) -> Array2<f64> {
        let seeds = index::sample(rng, x.nrows(), self.k).into_vec();
        x.select(Axis(0), &seeds)
    }

    pub fn fit<R: Rng + ?Sized>(&mut self, x: &Array2<f64>, rng: &mut R) -> AppResult<&mut Self> {
        let n_samples = x.nrows();
        if self.k == 0 || self.k > n_samples {
            return Err(AppError::Other(format!(
                "cannot partition {n_samples} samples into {} groups",
                self.k
            )));
        }

        let centers_init = self.init_centroids(x, rng); // (k, n_features)
        let outcome =
            lloyd::kmeans_single_lloyd(x.view(), &centers_init, self.max_iterations, self.update);
        debug!(
            "K-Means finished after {} iterations (converged: {})",
            outcome.n_iter, outcome.converged
        );

        let distinct_clusters = outcome.labels.iter().collect::<HashSet<_>>().len();
        if distinct_clusters < self.k {
            warn!(
                "Number of distinct clusters ({}) found smaller than n_clusters ({}). Possibly due to duplicate points in X.",
                distinct_clusters, self.k
            );
        }

        self.cluster_centers = Some(outcome.centers);
        self.labels = Some(outcome.labels);
        self.n_iter = Some(outcome.n_iter);
        self.converged = outcome.converged;
        Ok(self)
    }

    pub fn labels(&self) -> Option<&Array1<usize>> {
        self.labels.as_ref()
    }

    pub fn n_iter(&self) -> Option<usize> {
        self.n_iter
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Fitted groups in center order; members are listed in ascending sample order.
    pub fn groups(&self) -> Option<Vec<Group>> {
        let centers = self.cluster_centers.as_ref()?;
        let labels = self.labels.as_ref()?;

        let mut groups: Vec<Group> = centers
            .axis_iter(Axis(0))
            .map(|centroid| Group {
                centroid: centroid.to_owned(),
                members: Vec::new(),
            })
            .collect();
        for (idx, &label) in labels.iter().enumerate() {
            groups.get_mut(label)?.members.push(idx);
        }
        Some(groups)
    }
}
