use ragdex_core::error::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::flat::dot;
use crate::kmeans;

/// Clustered approximate index (inverted-file layout).
///
/// State machine: Untrained -> train(batch) -> Trained -> add*. Calling
/// `add` while untrained trains on that batch first, so the first add's
/// data shapes cluster quality. That mirrors how operators actually feed
/// this index (one bulk add per build) and is documented as an accepted
/// limitation rather than fixed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IvfIndex {
    dim: usize,
    nlist: usize,
    trained: bool,
    /// `nlist * dim` once trained, empty before.
    centroids: Vec<f32>,
    /// One posting list of vector positions per centroid.
    lists: Vec<Vec<u32>>,
    /// All added vectors in insertion order, row-major.
    data: Vec<f32>,
}

impl IvfIndex {
    pub fn new(dim: usize, nlist: usize) -> Self {
        Self {
            dim,
            nlist: nlist.max(1),
            trained: false,
            centroids: Vec::new(),
            lists: Vec::new(),
            data: Vec::new(),
        }
    }

    pub(crate) fn from_parts(
        dim: usize,
        nlist: usize,
        trained: bool,
        centroids: Vec<f32>,
        lists: Vec<Vec<u32>>,
        data: Vec<f32>,
    ) -> Self {
        Self { dim, nlist, trained, centroids, lists, data }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.data.len() / self.dim
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_trained(&self) -> bool {
        self.trained
    }

    pub(crate) fn parts(&self) -> (&[f32], &[Vec<u32>], &[f32], usize, bool) {
        (&self.centroids, &self.lists, &self.data, self.nlist, self.trained)
    }

    /// One-time clustering pass. The effective list count is clamped to the
    /// training batch size for tiny corpora.
    pub fn train(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        if self.trained {
            return Err(Error::Operation("index is already trained".into()));
        }
        if vectors.is_empty() {
            return Err(Error::Operation("cannot train on an empty batch".into()));
        }
        let flat = self.flatten(vectors)?;
        tracing::debug!(n = vectors.len(), nlist = self.nlist, "training ivf clustering");
        let clustering = kmeans::train(&flat, self.dim, self.nlist);
        self.nlist = clustering.nlist;
        self.centroids = clustering.centroids;
        self.lists = vec![Vec::new(); self.nlist];
        self.trained = true;
        Ok(())
    }

    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        if !self.trained {
            self.train(vectors)?;
        }
        let flat = self.flatten(vectors)?;
        let base = self.len();
        for (i, row) in flat.chunks_exact(self.dim).enumerate() {
            let c = kmeans::nearest_centroid(row, &self.centroids, self.dim, self.nlist);
            self.lists[c].push((base + i) as u32);
        }
        self.data.extend_from_slice(&flat);
        Ok(())
    }

    /// Scans the `nprobe` nearest inverted lists. Fewer than `k` results
    /// simply means the probed lists were exhausted; no sentinel positions
    /// are ever returned.
    pub fn search(&self, query: &[f32], k: usize, nprobe: usize) -> Result<Vec<(usize, f32)>> {
        if !self.trained || self.is_empty() {
            return Err(Error::Operation("ivf index searched before any vectors were added".into()));
        }
        let nprobe = nprobe.clamp(1, self.nlist);
        let ranked = kmeans::rank_centroids(query, &self.centroids, self.dim, self.nlist);
        let mut scored: Vec<(usize, f32)> = Vec::new();
        for &c in ranked.iter().take(nprobe) {
            for &pos in &self.lists[c] {
                let pos = pos as usize;
                let row = &self.data[pos * self.dim..(pos + 1) * self.dim];
                scored.push((pos, dot(query, row)));
            }
        }
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0))
        });
        scored.truncate(k);
        Ok(scored)
    }

    fn flatten(&self, vectors: &[Vec<f32>]) -> Result<Vec<f32>> {
        let mut flat = Vec::with_capacity(vectors.len() * self.dim);
        for v in vectors {
            if v.len() != self.dim {
                return Err(Error::Operation(format!(
                    "vector has dim {}, index expects {}",
                    v.len(),
                    self.dim
                )));
            }
            flat.extend_from_slice(v);
        }
        Ok(flat)
    }
}
