//! The closed backend enum and its on-disk blob.
//!
//! Persistence is a single serde JSON artifact per index; the manifest is
//! the authority on dimension and backend kind, and a blob that disagrees
//! with it is corruption, not a different index.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use ragdex_core::error::{Error, Result};
use ragdex_core::types::{BackendKind, BackendParams, Manifest};

use crate::flat::FlatIndex;
use crate::ivf::IvfIndex;

#[derive(Debug)]
pub enum VectorIndex {
    Flat(FlatIndex),
    Ivf(IvfIndex),
}

#[derive(Serialize, Deserialize)]
struct IndexBlob {
    kind: BackendKind,
    dim: usize,
    nlist: usize,
    trained: bool,
    centroids: Vec<f32>,
    lists: Vec<Vec<u32>>,
    vectors: Vec<f32>,
}

impl VectorIndex {
    pub fn create(kind: BackendKind, dim: usize, params: &BackendParams) -> VectorIndex {
        match kind {
            BackendKind::Flat => VectorIndex::Flat(FlatIndex::new(dim)),
            BackendKind::Ivf => VectorIndex::Ivf(IvfIndex::new(dim, params.nlist)),
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            VectorIndex::Flat(_) => BackendKind::Flat,
            VectorIndex::Ivf(_) => BackendKind::Ivf,
        }
    }

    pub fn dim(&self) -> usize {
        match self {
            VectorIndex::Flat(f) => f.dim(),
            VectorIndex::Ivf(i) => i.dim(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            VectorIndex::Flat(f) => f.len(),
            VectorIndex::Ivf(i) => i.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        match self {
            VectorIndex::Flat(f) => f.add(vectors),
            VectorIndex::Ivf(i) => i.add(vectors),
        }
    }

    /// `nprobe` is a runtime breadth knob for the clustered backend and is
    /// ignored by the exact one.
    pub fn search(&self, query: &[f32], k: usize, nprobe: usize) -> Result<Vec<(usize, f32)>> {
        match self {
            VectorIndex::Flat(f) => Ok(f.search(query, k)),
            VectorIndex::Ivf(i) => i.search(query, k, nprobe),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let blob = match self {
            VectorIndex::Flat(f) => IndexBlob {
                kind: BackendKind::Flat,
                dim: f.dim(),
                nlist: 0,
                trained: false,
                centroids: Vec::new(),
                lists: Vec::new(),
                vectors: f.data().to_vec(),
            },
            VectorIndex::Ivf(i) => {
                let (centroids, lists, data, nlist, trained) = i.parts();
                IndexBlob {
                    kind: BackendKind::Ivf,
                    dim: i.dim(),
                    nlist,
                    trained,
                    centroids: centroids.to_vec(),
                    lists: lists.to_vec(),
                    vectors: data.to_vec(),
                }
            }
        };
        let json = serde_json::to_string(&blob)
            .map_err(|e| Error::Operation(format!("serialize index blob: {e}")))?;
        fs::write(path, json)
            .map_err(|e| Error::Operation(format!("write {}: {e}", path.display())))?;
        Ok(())
    }

    pub fn load(path: &Path, manifest: &Manifest) -> Result<VectorIndex> {
        let raw = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(format!("index blob {}", path.display()))
            } else {
                Error::Operation(format!("read {}: {e}", path.display()))
            }
        })?;
        let blob: IndexBlob = serde_json::from_str(&raw)
            .map_err(|e| Error::Corrupted(format!("unreadable index blob {}: {e}", path.display())))?;
        if blob.dim != manifest.dim {
            return Err(Error::Corrupted(format!(
                "index blob dim {} does not match manifest dim {}",
                blob.dim, manifest.dim
            )));
        }
        if blob.kind != manifest.backend {
            return Err(Error::Corrupted(format!(
                "index blob backend {} does not match manifest backend {}",
                blob.kind, manifest.backend
            )));
        }
        validate_blob(&blob, path)?;
        Ok(match blob.kind {
            BackendKind::Flat => VectorIndex::Flat(FlatIndex::from_parts(blob.dim, blob.vectors)),
            BackendKind::Ivf => VectorIndex::Ivf(IvfIndex::from_parts(
                blob.dim,
                blob.nlist,
                blob.trained,
                blob.centroids,
                blob.lists,
                blob.vectors,
            )),
        })
    }
}

/// A blob that parses but is internally inconsistent is corruption, the
/// same as one that disagrees with the manifest; it must never load into
/// an index that panics on first search.
fn validate_blob(blob: &IndexBlob, path: &Path) -> Result<()> {
    let corrupted =
        |detail: &str| Error::Corrupted(format!("index blob {}: {detail}", path.display()));
    if blob.dim == 0 && !blob.vectors.is_empty() {
        return Err(corrupted("stored vectors with dim 0"));
    }
    if blob.dim > 0 && blob.vectors.len() % blob.dim != 0 {
        return Err(corrupted(&format!(
            "vector data length {} is not a multiple of dim {}",
            blob.vectors.len(),
            blob.dim
        )));
    }
    if blob.kind == BackendKind::Flat {
        return Ok(());
    }
    let count = if blob.dim == 0 { 0 } else { blob.vectors.len() / blob.dim };
    if !blob.trained {
        if !blob.vectors.is_empty() || !blob.centroids.is_empty() || !blob.lists.is_empty() {
            return Err(corrupted("untrained ivf blob carries data"));
        }
        return Ok(());
    }
    if blob.centroids.len() != blob.nlist * blob.dim {
        return Err(corrupted(&format!(
            "{} centroid values for nlist {} and dim {}",
            blob.centroids.len(),
            blob.nlist,
            blob.dim
        )));
    }
    if blob.lists.len() != blob.nlist {
        return Err(corrupted(&format!(
            "{} posting lists for nlist {}",
            blob.lists.len(),
            blob.nlist
        )));
    }
    let assigned: usize = blob.lists.iter().map(Vec::len).sum();
    if assigned != count {
        return Err(corrupted(&format!(
            "{assigned} posting entries for {count} stored vectors"
        )));
    }
    for list in &blob.lists {
        if list.iter().any(|&pos| pos as usize >= count) {
            return Err(corrupted("posting entry points past the stored vectors"));
        }
    }
    Ok(())
}
