//! Embedding collaborators.
//!
//! The real embedding model is external to this workspace; what lives here
//! is the deterministic hash embedder used by the binaries and every test,
//! plus the explicit per-model cache that the pipeline and the evaluation
//! engine share. Determinism per model id is part of the `Embedder`
//! contract: the same text must embed to the same vector across builds and
//! searches, or persisted indexes stop being queryable.

use anyhow::Result;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use ragdex_core::traits::Embedder;
use twox_hash::XxHash64;

/// Token-bucket embedding: each whitespace token hashes to one dimension,
/// with a hash-derived weight. Not semantically meaningful, but stable,
/// offline and fast, which is all the tests and demo binaries need.
pub struct HashEmbedder {
    model_id: String,
    dim: usize,
    normalize: bool,
}

impl HashEmbedder {
    pub fn new(model_id: impl Into<String>, dim: usize, normalize: bool) -> Self {
        Self { model_id: model_id.into(), dim: dim.max(1), normalize }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.to_lowercase().split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            self.model_id.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        if self.normalize {
            let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

impl Embedder for HashEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

/// Explicit model-name -> embedder cache, owned by whoever drives builds
/// and evaluations and injected where needed. Loading is represented by
/// the `load` closure so callers decide what a model id means.
pub struct EmbedderCache {
    loaded: Mutex<HashMap<String, Arc<dyn Embedder>>>,
    load: Box<dyn Fn(&str, bool) -> Result<Arc<dyn Embedder>> + Send + Sync>,
}

impl EmbedderCache {
    pub fn new(
        load: impl Fn(&str, bool) -> Result<Arc<dyn Embedder>> + Send + Sync + 'static,
    ) -> Self {
        Self { loaded: Mutex::new(HashMap::new()), load: Box::new(load) }
    }

    /// Cache backed by `HashEmbedder`s of a fixed dimension.
    pub fn hashing(dim: usize) -> Self {
        Self::new(move |model_id, normalize| {
            Ok(Arc::new(HashEmbedder::new(model_id, dim, normalize)) as Arc<dyn Embedder>)
        })
    }

    pub fn get(&self, model_id: &str, normalize: bool) -> Result<Arc<dyn Embedder>> {
        let mut loaded = self
            .loaded
            .lock()
            .map_err(|_| anyhow::anyhow!("embedder cache lock poisoned"))?;
        if let Some(e) = loaded.get(model_id) {
            return Ok(Arc::clone(e));
        }
        tracing::debug!(model = model_id, "loading embedder");
        let embedder = (self.load)(model_id, normalize)?;
        loaded.insert(model_id.to_string(), Arc::clone(&embedder));
        Ok(embedder)
    }
}
