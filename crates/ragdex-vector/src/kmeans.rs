//! Deterministic Lloyd k-means used to train the clustered backend.
//!
//! Initial centroids are evenly spaced samples of the training set, so the
//! same batch always trains to the same clustering. Assignment is by
//! maximum inner product, which on normalized vectors is cosine order.

const MAX_ITERS: usize = 10;

pub struct Clustering {
    /// `nlist * dim`, row-major.
    pub centroids: Vec<f32>,
    pub nlist: usize,
}

/// Trains `nlist` centroids over `n` row-major vectors. `nlist` is clamped
/// to `n`; an empty training set yields zero centroids.
pub fn train(data: &[f32], dim: usize, nlist: usize) -> Clustering {
    let n = if dim == 0 { 0 } else { data.len() / dim };
    let nlist = nlist.clamp(1, n.max(1));
    if n == 0 {
        return Clustering { centroids: Vec::new(), nlist: 0 };
    }

    let mut centroids = vec![0f32; nlist * dim];
    for c in 0..nlist {
        let sample = c * n / nlist;
        centroids[c * dim..(c + 1) * dim].copy_from_slice(&data[sample * dim..(sample + 1) * dim]);
    }

    let mut assignment = vec![usize::MAX; n];
    for _ in 0..MAX_ITERS {
        let mut changed = false;
        for i in 0..n {
            let row = &data[i * dim..(i + 1) * dim];
            let best = nearest_centroid(row, &centroids, dim, nlist);
            if assignment[i] != best {
                assignment[i] = best;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        let mut sums = vec![0f64; nlist * dim];
        let mut counts = vec![0usize; nlist];
        for i in 0..n {
            let c = assignment[i];
            counts[c] += 1;
            for d in 0..dim {
                sums[c * dim + d] += f64::from(data[i * dim + d]);
            }
        }
        for c in 0..nlist {
            // Empty clusters keep their previous centroid.
            if counts[c] == 0 {
                continue;
            }
            for d in 0..dim {
                centroids[c * dim + d] = (sums[c * dim + d] / counts[c] as f64) as f32;
            }
        }
    }

    Clustering { centroids, nlist }
}

pub fn nearest_centroid(row: &[f32], centroids: &[f32], dim: usize, nlist: usize) -> usize {
    let mut best = 0usize;
    let mut best_score = f32::NEG_INFINITY;
    for c in 0..nlist {
        let score = crate::flat::dot(row, &centroids[c * dim..(c + 1) * dim]);
        if score > best_score {
            best_score = score;
            best = c;
        }
    }
    best
}

/// Centroid indices ordered by descending inner product with `query`.
pub fn rank_centroids(query: &[f32], centroids: &[f32], dim: usize, nlist: usize) -> Vec<usize> {
    let mut ranked: Vec<(usize, f32)> = (0..nlist)
        .map(|c| (c, crate::flat::dot(query, &centroids[c * dim..(c + 1) * dim])))
        .collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0))
    });
    ranked.into_iter().map(|(c, _)| c).collect()
}
