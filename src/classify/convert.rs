use ndarray::prelude::*;
use tracing::trace;

use crate::AppResult;
use crate::error::AppError;

/// Copy a provider batch into an (n_samples, n_features) matrix.
///
/// The batch must hold exactly `expected` rows of one shared, non-zero width.
#[tracing::instrument(name = "Converting embeddings", level = "debug", skip(embs))]
pub fn embeddings_to_ndarray(embs: &[Vec<f32>], expected: usize) -> AppResult<Array2<f64>> {
    if embs.len() != expected {
        return Err(AppError::EmbeddingShape(format!(
            "expected {expected} vectors, got {}",
            embs.len()
        )));
    }
    let cols = embs.first().map(Vec::len).unwrap_or_default();
    if cols == 0 {
        return Err(AppError::EmbeddingShape(
            "embedding vectors are empty".to_string(),
        ));
    }
    if let Some((idx, row)) = embs.iter().enumerate().find(|(_, row)| row.len() != cols) {
        return Err(AppError::EmbeddingShape(format!(
            "vector {idx} has {} dimensions, expected {cols}",
            row.len()
        )));
    }

    let mut arr: Array2<f64> = Array2::<f64>::zeros((embs.len(), cols));
    trace!("Initialized ndarray with shape: {:?}", arr.dim());
    for (mut row, emb) in arr.axis_iter_mut(Axis(0)).zip(embs) {
        for (val, &src) in row.iter_mut().zip(emb) {
            *val = src as f64;
        }
    }
    Ok(arr)
}
