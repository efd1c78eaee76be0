use ndarray::prelude::*;

/// Euclidean norm of every row. x = (n_samples, n_features) -> (n_samples,)
pub fn row_norms(x: ArrayView2<f64>, squared: bool) -> Array1<f64> {
    let sum: Array1<f64> = x.map_axis(Axis(1), |row| row.dot(&row));
    if !squared { sum.sqrt() } else { sum }
}

/// Cosine similarity of every sample against every center.
/// x = (n_samples, n_features), centers = (n_clusters, n_features) -> (n_samples, n_clusters)
///
/// A pair where either vector has zero norm has similarity 0.
pub fn cosine_similarities(x: ArrayView2<f64>, centers: ArrayView2<f64>) -> Array2<f64> {
    let x_norms = row_norms(x, false); // (n_samples,)
    let c_norms = row_norms(centers, false); // (n_clusters,)
    let mut sims = x.dot(&centers.t()); // (n_samples, n_clusters)
    for ((i, j), sim) in sims.indexed_iter_mut() {
        let denom = x_norms[i] * c_norms[j];
        *sim = if denom > 0.0 { *sim / denom } else { 0.0 };
    }
    sims
}

/// Index of the largest value; the first one wins on ties and NaN never wins.
pub fn argmax_first(row: ArrayView1<f64>) -> usize {
    let mut best = 0;
    let mut best_val = f64::NEG_INFINITY;
    for (idx, &val) in row.iter().enumerate() {
        if val > best_val {
            best = idx;
            best_val = val;
        }
    }
    best
}

/// Scale each non-zero row to unit length in place.
pub fn normalize_rows(x: &mut Array2<f64>) {
    for mut row in x.axis_iter_mut(Axis(0)) {
        let norm = row.dot(&row).sqrt();
        if norm > 0.0 {
            row.mapv_inplace(|v| v / norm);
        }
    }
}
