use ndarray::prelude::*;

use super::CentroidUpdate;
use crate::classify::linalg::{argmax_first, cosine_similarities, normalize_rows};

static CHUNK_SIZE: usize = 256;

/// Final state of a single Lloyd run.
#[derive(Debug, Clone)]
pub struct LloydOutcome {
    pub labels: Array1<usize>, // (n_samples,)
    pub centers: Array2<f64>,  // (n_clusters, n_features)
    pub n_iter: usize,
    pub converged: bool,
}

fn update_chunk_dense(
    x_chunk: ArrayView2<f64>,  // x_chunk = (chunk_size, n_features)
    centers_old: &Array2<f64>, // centers_old = (n_clusters, n_features)
) -> (Array1<usize>, Array2<f64>, Array1<usize>) {
    let n_samples = x_chunk.nrows();
    let n_features = x_chunk.ncols();
    let n_clusters = centers_old.nrows();

    // sims = (chunk_size, n_clusters)
    let sims = cosine_similarities(x_chunk, centers_old.view());

    let mut labels_chunk = Array1::<usize>::zeros(n_samples);
    let mut sums_chunk = Array2::<f64>::zeros((n_clusters, n_features));
    let mut counts_chunk = Array1::<usize>::zeros(n_clusters);

    for (i, sims_row) in sims.axis_iter(Axis(0)).enumerate() {
        let label = argmax_first(sims_row);
        labels_chunk[i] = label;
        counts_chunk[label] += 1;
        // accumulates the member sum for the cluster
        let mut sum_row = sums_chunk.row_mut(label);
        sum_row += &x_chunk.row(i);
    }

    (labels_chunk, sums_chunk, counts_chunk)
}

/// Assign every sample and recompute the centers, chunked to limit temporary allocations.
/// Returns (centers_new, counts, labels).
fn lloyd_iter_chunked_dense(
    x: ArrayView2<f64>,        // x = (n_samples, n_features)
    centers_old: &Array2<f64>, // centers_old = (n_clusters, n_features)
    update: CentroidUpdate,
) -> (Array2<f64>, Array1<usize>, Array1<usize>) {
    let n_samples = x.nrows();
    let n_features = x.ncols();
    let n_clusters = centers_old.nrows();

    let mut centers_new = Array2::<f64>::zeros((n_clusters, n_features));
    let mut counts = Array1::<usize>::zeros(n_clusters);
    let mut labels = Array1::<usize>::zeros(n_samples);

    let mut start = 0;
    while start < n_samples {
        let end = (start + CHUNK_SIZE).min(n_samples);
        let (labels_chunk, sums_chunk, counts_chunk) =
            update_chunk_dense(x.slice(s![start..end, ..]), centers_old);

        labels.slice_mut(s![start..end]).assign(&labels_chunk);
        centers_new += &sums_chunk;
        counts += &counts_chunk;
        start = end;
    }

    for cluster in 0..n_clusters {
        let count = counts[cluster];
        if count > 0 {
            centers_new
                .row_mut(cluster)
                .mapv_inplace(|v| v / count as f64);
        } else {
            // keep previous center if cluster is empty
            centers_new
                .row_mut(cluster)
                .assign(&centers_old.row(cluster));
        }
    }

    if update == CentroidUpdate::Spherical {
        normalize_rows(&mut centers_new);
    }

    (centers_new, counts, labels)
}

/// Run a single cosine K-Means with Lloyd iterations.
///
/// Each iteration assigns every sample to its most similar center, recomputes the centers and
/// stops as soon as an assignment pass changes nothing.
pub fn kmeans_single_lloyd(
    x: ArrayView2<f64>,         // x = (n_samples, n_features)
    centers_init: &Array2<f64>, // centers_init = (n_clusters, n_features)
    max_iter: usize,
    update: CentroidUpdate,
) -> LloydOutcome {
    let n_samples = x.nrows();

    let mut centers = centers_init.clone();
    let mut labels = Array1::<usize>::zeros(n_samples);
    let mut labels_old = Array1::<usize>::from_elem(n_samples, usize::MAX);
    let mut converged = false;
    let mut n_iter = 0;

    for i in 0..max_iter {
        let (centers_new, _counts, new_labels) = lloyd_iter_chunked_dense(x, &centers, update);
        n_iter = i + 1;
        centers = centers_new;

        if new_labels == labels_old {
            labels = new_labels;
            converged = true;
            break;
        }

        labels = new_labels.clone();
        labels_old = new_labels;
    }

    LloydOutcome {
        labels,
        centers,
        n_iter,
        converged,
    }
}
