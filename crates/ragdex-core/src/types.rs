//! Domain types shared by the chunker, index backends and the version store.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

pub type ChunkId = String;

/// A contiguous slice of one source row, the unit of retrieval.
///
/// `id` is `"{row_id}#{ordinal}"` and is unique within one index version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
}

/// Indicates which engine produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Vector,
    Lexical,
    Fused,
}

/// The minimal surface returned by all engines.
///
/// `score` is engine-specific but higher is always better. Fused results
/// carry `None`: vector and lexical scales are not comparable, so only the
/// rank order is meaningful.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: ChunkId,
    pub score: Option<f32>,
    pub source: SourceKind,
}

/// Closed set of vector index backends. Adding one means adding a variant
/// here and an arm in `ragdex-vector`, not another string comparison.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Flat,
    Ivf,
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "flat" => Ok(BackendKind::Flat),
            "ivf" => Ok(BackendKind::Ivf),
            other => Err(Error::InvalidConfig(format!("unknown backend: {other}"))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Flat => write!(f, "flat"),
            BackendKind::Ivf => write!(f, "ivf"),
        }
    }
}

/// Backend tuning knobs. All fields are recorded in the manifest even when a
/// backend ignores them, so two builds stay comparable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendParams {
    pub nlist: usize,
    pub nprobe: usize,
    #[serde(rename = "M")]
    pub m: usize,
    #[serde(rename = "efConstruction")]
    pub ef_construction: usize,
    #[serde(rename = "efSearch")]
    pub ef_search: usize,
}

impl Default for BackendParams {
    fn default() -> Self {
        Self { nlist: 1024, nprobe: 10, m: 16, ef_construction: 200, ef_search: 64 }
    }
}

/// How the corpus was split. `mode` stays a free string in the manifest;
/// unknown values fall back to fixed-char chunking on read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkingSpec {
    pub mode: String,
    pub size: usize,
    pub overlap: usize,
}

impl ChunkingSpec {
    /// Chunking assumes validated positive sizes; clamp before use.
    pub fn clamped(&self) -> ChunkingSpec {
        ChunkingSpec { mode: self.mode.clone(), size: self.size.max(1), overlap: self.overlap }
    }
}

/// Provenance for one uploaded source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    pub rows: usize,
    pub sha256: Option<String>,
    pub added_at: String,
    pub stored_name: String,
}

/// Authoritative description of how one index build was produced.
/// Written once per build, immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub dim: usize,
    pub count: usize,
    pub model: String,
    pub normalize: bool,
    pub backend: BackendKind,
    pub params: BackendParams,
    pub chunking: ChunkingSpec,
    pub metric: String,
    pub created_at: String,
    pub sources: BTreeMap<String, SourceRecord>,
}

/// Placeholder quality metrics in a version summary; populated by the
/// evaluation engine only in reports, never mutated on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityMetrics {
    #[serde(rename = "recall@k")]
    pub recall_at_k: Option<f64>,
    pub mrr: Option<f64>,
    pub ndcg: Option<f64>,
}

/// Small per-version record used for fast listing without opening the
/// full manifest or the vector blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionSummary {
    pub version: String,
    pub created_at: String,
    pub embed_model: String,
    pub chunking: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub index_backend: BackendKind,
    pub doc_count: Option<usize>,
    pub vector_count: usize,
    pub build_id: String,
    pub notes: String,
    pub metrics: QualityMetrics,
}

/// Everything the build pipeline needs to know about a requested build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    pub index_name: String,
    pub model: String,
    pub normalize: bool,
    pub backend: BackendKind,
    pub chunking: ChunkingSpec,
    pub params: BackendParams,
}

impl BuildConfig {
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.index_name.trim().is_empty() {
            return Err(Error::InvalidConfig("index name must not be empty".into()));
        }
        if self.chunking.size == 0 {
            return Err(Error::InvalidConfig("chunk size must be >= 1".into()));
        }
        Ok(())
    }
}

/// Normalized source rows handed to the pipeline by an external reader.
/// The core only ever sees `(row_id, text)` pairs plus provenance.
#[derive(Debug, Clone)]
pub struct SourceRows {
    pub name: String,
    pub stored_name: String,
    pub sha256: Option<String>,
    pub rows: Vec<(String, String)>,
}
