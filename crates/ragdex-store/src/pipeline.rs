//! The build pipeline: rows -> chunks -> embeddings -> vector index ->
//! manifest -> version commit.
//!
//! Each build runs as one task; stages are sequential because each consumes
//! the previous stage's full output. Builds for different index names may
//! run concurrently. Builds for the same name are serialized by a
//! per-index-name lease: an overlapping attempt fails fast instead of
//! racing the first build's "latest" writes.

use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use ragdex_core::chunker::{split_rows, ChunkMode};
use ragdex_core::error::{Error, Result};
use ragdex_core::traits::{JobStore, ProgressSink};
use ragdex_core::types::{BuildConfig, Manifest, SourceRecord, SourceRows, VersionSummary};
use ragdex_embed::EmbedderCache;
use ragdex_vector::VectorIndex;

use crate::store::IndexStore;

pub struct BuildCoordinator {
    store: IndexStore,
    embedders: Arc<EmbedderCache>,
    progress: Arc<dyn ProgressSink>,
    jobs: Arc<dyn JobStore>,
    in_flight: Mutex<HashSet<String>>,
}

struct Lease<'a> {
    names: &'a Mutex<HashSet<String>>,
    name: String,
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        if let Ok(mut names) = self.names.lock() {
            names.remove(&self.name);
        }
    }
}

impl BuildCoordinator {
    pub fn new(
        store: IndexStore,
        embedders: Arc<EmbedderCache>,
        progress: Arc<dyn ProgressSink>,
        jobs: Arc<dyn JobStore>,
    ) -> Self {
        Self { store, embedders, progress, jobs, in_flight: Mutex::new(HashSet::new()) }
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Spawns the build as an independent task; the caller keeps only the
    /// build id and watches the progress channel.
    pub fn spawn(
        self: &Arc<Self>,
        build_id: String,
        config: BuildConfig,
        source: SourceRows,
    ) -> tokio::task::JoinHandle<()> {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            let _ = coordinator.run_build(&build_id, &config, &source).await;
        })
    }

    /// Runs one build to its terminal state: job status and the progress
    /// channel always end in done/DONE or error/"ERROR: ...". No version
    /// directory is created past a failure point; "latest" may have been
    /// partially updated by then, which is the documented asymmetry.
    pub async fn run_build(
        &self,
        build_id: &str,
        config: &BuildConfig,
        source: &SourceRows,
    ) -> Result<VersionSummary> {
        let _lease = match self.acquire(&config.index_name) {
            Ok(lease) => lease,
            Err(e) => {
                // Overlapping same-name build: fail this request fast with a
                // terminal event so a subscriber never hangs.
                self.jobs.set_error(build_id, &e.to_string());
                self.progress.publish(build_id, &format!("ERROR: {e}"));
                return Err(e);
            }
        };
        self.jobs.set_running(build_id);
        match self.build_inner(build_id, config, source) {
            Ok(summary) => {
                self.jobs.set_done(build_id, &config.index_name);
                self.progress.publish(build_id, "DONE");
                Ok(summary)
            }
            Err(e) => {
                tracing::error!(build = build_id, error = %e, "build failed");
                self.jobs.set_error(build_id, &e.to_string());
                self.progress.publish(build_id, &format!("ERROR: {e}"));
                Err(e)
            }
        }
    }

    fn acquire(&self, index_name: &str) -> Result<Lease<'_>> {
        let mut names = self
            .in_flight
            .lock()
            .map_err(|_| Error::Operation("build lease lock poisoned".into()))?;
        if !names.insert(index_name.to_string()) {
            return Err(Error::Operation(format!(
                "a build for index {index_name} is already in flight"
            )));
        }
        Ok(Lease { names: &self.in_flight, name: index_name.to_string() })
    }

    fn build_inner(
        &self,
        build_id: &str,
        config: &BuildConfig,
        source: &SourceRows,
    ) -> Result<VersionSummary> {
        config.validate()?;
        self.progress.publish(build_id, "Reading file");

        self.progress.publish(build_id, "Chunking");
        let chunking = config.chunking.clamped();
        let mode = ChunkMode::parse(&chunking.mode);
        let chunks = split_rows(&source.rows, mode, chunking.size, chunking.overlap);

        self.progress
            .publish(build_id, &format!("Embedding {} with {}", chunks.len(), config.model));
        let embedder = self
            .embedders
            .get(&config.model, config.normalize)
            .map_err(|e| Error::Operation(format!("load embedder {}: {e}", config.model)))?;
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = embedder
            .embed_batch(&texts)
            .map_err(|e| Error::Operation(format!("embed with {}: {e}", config.model)))?;
        let dim = embeddings.first().map_or(embedder.dim(), Vec::len);

        self.progress.publish(build_id, &format!("Building index [{}]", config.backend));
        let mut index = VectorIndex::create(config.backend, dim, &config.params);
        if !embeddings.is_empty() {
            index.add(&embeddings)?;
        }

        let mut sources = BTreeMap::new();
        sources.insert(
            source.name.clone(),
            SourceRecord {
                rows: source.rows.len(),
                sha256: source.sha256.clone(),
                added_at: Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
                stored_name: source.stored_name.clone(),
            },
        );
        let manifest = Manifest {
            dim,
            count: chunks.len(),
            model: config.model.clone(),
            normalize: config.normalize,
            backend: config.backend,
            params: config.params.clone(),
            chunking,
            metric: "ip".to_string(),
            created_at: Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
            sources,
        };

        self.store.write_latest(&config.index_name, &index, &chunks, &manifest)?;
        self.store.commit_version(
            &config.index_name,
            build_id,
            &manifest,
            &format!("Built from {}", source.stored_name),
        )
    }
}
