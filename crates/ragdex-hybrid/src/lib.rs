//! Rank fusion over one loaded index version.
//!
//! Vector and lexical rankings are combined with reciprocal rank fusion:
//! only positions matter, so the incomparable score scales of the two
//! engines never mix. Fused hits therefore carry no score at all.

use std::collections::HashMap;
use std::sync::Arc;

use ragdex_core::error::{Error, Result};
use ragdex_core::traits::Embedder;
use ragdex_core::types::{SearchHit, SourceKind};
use ragdex_store::LoadedIndex;
use ragdex_text::Bm25Index;

/// RRF smoothing constant; the conventional value keeps deep-ranked
/// agreement from outweighing a single top rank.
pub const K_RRF: f32 = 60.0;

/// Both engines fetch at least this many candidates regardless of `k`, so
/// fusion has something to reorder when the caller asks for very few hits.
const MIN_FETCH: usize = 10;

/// Fuses two ranked `(position, score)` lists into one position ranking of
/// at most `k` entries. Each appearance contributes `1 / (K_RRF + rank + 1)`
/// with zero-based ranks; positions on both lists accumulate both
/// contributions. Ties keep first-seen order, dense list first.
pub fn rrf_fuse(dense: &[(usize, f32)], lexical: &[(usize, f32)], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = Vec::new();
    let mut scores: HashMap<usize, f32> = HashMap::new();
    for list in [dense, lexical] {
        for (rank, &(pos, _)) in list.iter().enumerate() {
            let entry = scores.entry(pos).or_insert_with(|| {
                order.push(pos);
                0.0
            });
            *entry += 1.0 / (K_RRF + rank as f32 + 1.0);
        }
    }
    let mut fused: Vec<usize> = order;
    fused.sort_by(|a, b| {
        scores[b].partial_cmp(&scores[a]).unwrap_or(std::cmp::Ordering::Equal)
    });
    fused.truncate(k);
    fused
}

/// Search facade over one loaded index version. The lexical side is fitted
/// from the version's own corpus snapshot at construction, so both engines
/// always rank exactly the same chunk set.
pub struct HybridSearcher {
    loaded: LoadedIndex,
    bm25: Bm25Index,
    embedder: Arc<dyn Embedder>,
}

impl HybridSearcher {
    pub fn new(loaded: LoadedIndex, embedder: Arc<dyn Embedder>) -> HybridSearcher {
        let bm25 = Bm25Index::fit(&loaded.corpus());
        HybridSearcher { loaded, bm25, embedder }
    }

    pub fn loaded(&self) -> &LoadedIndex {
        &self.loaded
    }

    /// Fused search: both engines fetch `max(k, 10)` candidates, RRF
    /// reorders them, and the top `k` come back scoreless.
    pub fn query(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let fetch = k.max(MIN_FETCH);
        let dense = self.vector_positions(query, fetch)?;
        let lexical = self.bm25.search(query, fetch);
        tracing::debug!(
            dense = dense.len(),
            lexical = lexical.len(),
            "fusing candidate lists"
        );
        let hits = rrf_fuse(&dense, &lexical, k)
            .into_iter()
            .map(|pos| SearchHit {
                id: self.loaded.ids[pos].clone(),
                score: None,
                source: SourceKind::Fused,
            })
            .collect();
        Ok(hits)
    }

    /// Vector-only search; hits carry the inner-product score.
    pub fn vector_only(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let hits = self
            .vector_positions(query, k)?
            .into_iter()
            .map(|(pos, score)| SearchHit {
                id: self.loaded.ids[pos].clone(),
                score: Some(score),
                source: SourceKind::Vector,
            })
            .collect();
        Ok(hits)
    }

    /// Lexical-only search; hits carry the BM25 score.
    pub fn lexical_only(&self, query: &str, k: usize) -> Vec<SearchHit> {
        self.bm25
            .search(query, k)
            .into_iter()
            .map(|(pos, score)| SearchHit {
                id: self.loaded.ids[pos].clone(),
                score: Some(score),
                source: SourceKind::Lexical,
            })
            .collect()
    }

    pub fn text_of(&self, id: &str) -> Option<&str> {
        self.loaded.docs.get(id).map(String::as_str)
    }

    fn vector_positions(&self, query: &str, k: usize) -> Result<Vec<(usize, f32)>> {
        if self.loaded.index.is_empty() {
            return Ok(Vec::new());
        }
        let embedded = self
            .embedder
            .embed_batch(&[query.to_string()])
            .map_err(|e| Error::Operation(format!("embed query: {e}")))?;
        let q = embedded
            .into_iter()
            .next()
            .ok_or_else(|| Error::Operation("embedder returned no query vector".into()))?;
        self.loaded.index.search(&q, k, self.loaded.manifest.params.nprobe)
    }
}
