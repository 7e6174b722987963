//! Per-question rank metrics with a single binary-relevance judgment: the
//! gold chunk is relevant, everything else is not. All ranks are 1-based.

/// `1 / rank` for a hit, `0` for a miss.
pub fn reciprocal_rank(rank: Option<usize>) -> f64 {
    match rank {
        Some(r) if r >= 1 => 1.0 / r as f64,
        _ => 0.0,
    }
}

/// NDCG with one relevant document: the ideal DCG is 1, so the normalized
/// gain collapses to `1 / log2(rank + 1)`. Always in `[0, 1]`.
pub fn ndcg_binary(rank: Option<usize>) -> f64 {
    match rank {
        Some(r) if r >= 1 => 1.0 / ((r + 1) as f64).log2(),
        _ => 0.0,
    }
}

/// Mean of a per-question metric; an empty gold set averages to zero
/// instead of dividing by it.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
