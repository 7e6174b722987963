//! The versioned index store.
//!
//! Commit protocol per build: write every "latest" artifact first, then
//! copy the full set verbatim into a fresh version directory and write the
//! version summaries. A version directory therefore only ever exists in a
//! complete state. Integrity is re-checked on every load: the manifest's
//! declared count, the id-list length and the stored vector count must
//! agree or the version is reported as corrupted, never silently used.

use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use ragdex_core::error::{Error, Result};
use ragdex_core::types::{Chunk, Manifest, VersionSummary};
use ragdex_vector::VectorIndex;

use crate::layout::{
    latest_artifact, version_artifact, version_dir, versions_root, DOCS_SUFFIX, IDS_SUFFIX,
    INDEX_SUFFIX, MANIFEST_SUFFIX,
};

pub struct IndexStore {
    indexes_dir: PathBuf,
}

/// One fully loaded, internally consistent index snapshot.
#[derive(Debug)]
pub struct LoadedIndex {
    pub index: VectorIndex,
    pub ids: Vec<String>,
    pub docs: HashMap<String, String>,
    pub manifest: Manifest,
}

impl LoadedIndex {
    /// Chunk texts in id-list order, the corpus snapshot the lexical index
    /// is fitted from. Ids with no stored text contribute empty documents.
    pub fn corpus(&self) -> Vec<String> {
        self.ids.iter().map(|id| self.docs.get(id).cloned().unwrap_or_default()).collect()
    }
}

impl IndexStore {
    pub fn new(indexes_dir: impl Into<PathBuf>) -> Result<Self> {
        let indexes_dir = indexes_dir.into();
        fs::create_dir_all(&indexes_dir)
            .map_err(|e| Error::Operation(format!("create {}: {e}", indexes_dir.display())))?;
        Ok(Self { indexes_dir })
    }

    pub fn indexes_dir(&self) -> &Path {
        &self.indexes_dir
    }

    /// Steps 1-3 of the commit protocol: overwrite the latest file set.
    pub fn write_latest(
        &self,
        name: &str,
        index: &VectorIndex,
        chunks: &[Chunk],
        manifest: &Manifest,
    ) -> Result<()> {
        let docs: BTreeMap<&str, &str> =
            chunks.iter().map(|c| (c.id.as_str(), c.text.as_str())).collect();
        write_json(&latest_artifact(&self.indexes_dir, name, DOCS_SUFFIX), &docs)?;
        write_json(&latest_artifact(&self.indexes_dir, name, MANIFEST_SUFFIX), manifest)?;
        index.save(&latest_artifact(&self.indexes_dir, name, INDEX_SUFFIX))?;
        let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        write_json(&latest_artifact(&self.indexes_dir, name, IDS_SUFFIX), &ids)?;
        Ok(())
    }

    /// Steps 4-6: allocate a version id, copy the latest artifacts into the
    /// version directory and write both summary records. Same-second builds
    /// get a `-N` counter suffix instead of overwriting each other.
    pub fn commit_version(
        &self,
        name: &str,
        build_id: &str,
        manifest: &Manifest,
        notes: &str,
    ) -> Result<VersionSummary> {
        let version = self.allocate_version_id(name)?;
        let dir = version_dir(&self.indexes_dir, name, &version);
        fs::create_dir_all(&dir)
            .map_err(|e| Error::Operation(format!("create {}: {e}", dir.display())))?;

        for suffix in [INDEX_SUFFIX, DOCS_SUFFIX, IDS_SUFFIX, MANIFEST_SUFFIX] {
            let from = latest_artifact(&self.indexes_dir, name, suffix);
            let to = version_artifact(&dir, name, suffix);
            fs::copy(&from, &to).map_err(|e| {
                Error::Operation(format!("copy {} -> {}: {e}", from.display(), to.display()))
            })?;
        }
        // The bare manifest.json duplicate keeps version dirs self-describing
        // without knowing the index name.
        write_json(&dir.join("manifest.json"), manifest)?;

        let doc_count = manifest.sources.values().map(|s| s.rows).sum::<usize>();
        let summary = VersionSummary {
            version: version.clone(),
            created_at: manifest.created_at.clone(),
            embed_model: manifest.model.clone(),
            chunking: manifest.chunking.mode.clone(),
            chunk_size: manifest.chunking.size,
            chunk_overlap: manifest.chunking.overlap,
            index_backend: manifest.backend,
            doc_count: Some(doc_count),
            vector_count: manifest.count,
            build_id: build_id.to_string(),
            notes: notes.to_string(),
            metrics: Default::default(),
        };
        write_json(&dir.join("meta.json"), &summary)?;
        write_json(
            &versions_root(&self.indexes_dir, name).join(format!("{version}.json")),
            &summary,
        )?;
        tracing::info!(index = name, version = %version, count = manifest.count, "version committed");
        Ok(summary)
    }

    fn allocate_version_id(&self, name: &str) -> Result<String> {
        let base = Utc::now().format("%Y%m%d-%H%M%S").to_string();
        if !version_dir(&self.indexes_dir, name, &base).exists() {
            return Ok(base);
        }
        for n in 2..1000 {
            let candidate = format!("{base}-{n}");
            if !version_dir(&self.indexes_dir, name, &candidate).exists() {
                return Ok(candidate);
            }
        }
        Err(Error::Operation(format!("could not allocate a version id under {base}")))
    }

    pub fn load_latest(&self, name: &str) -> Result<LoadedIndex> {
        self.load_from(&self.indexes_dir.to_path_buf(), name)
    }

    pub fn load_version(&self, name: &str, version: &str) -> Result<LoadedIndex> {
        let dir = version_dir(&self.indexes_dir, name, version);
        if !dir.is_dir() {
            return Err(Error::NotFound(format!("version {version} of index {name}")));
        }
        self.load_from(&dir, name)
    }

    fn load_from(&self, dir: &PathBuf, name: &str) -> Result<LoadedIndex> {
        let manifest: Manifest = read_json(&version_artifact(dir, name, MANIFEST_SUFFIX))?;
        let ids: Vec<String> = read_json(&version_artifact(dir, name, IDS_SUFFIX))?;
        let docs: HashMap<String, String> = read_json(&version_artifact(dir, name, DOCS_SUFFIX))?;
        let index = VectorIndex::load(&version_artifact(dir, name, INDEX_SUFFIX), &manifest)?;

        if manifest.count != ids.len() || manifest.count != index.len() {
            return Err(Error::Corrupted(format!(
                "index {name}: manifest count {} vs {} ids vs {} stored vectors",
                manifest.count,
                ids.len(),
                index.len()
            )));
        }
        Ok(LoadedIndex { index, ids, docs, manifest })
    }

    /// All version summaries for one index, newest first. Both the
    /// directory form (`<vid>/meta.json`) and the flat form (`<vid>.json`)
    /// are recognized; duplicates collapse to the directory record.
    pub fn list_versions(&self, name: &str) -> Result<Vec<VersionSummary>> {
        let root = versions_root(&self.indexes_dir, name);
        let mut versions: Vec<VersionSummary> = Vec::new();
        if !root.is_dir() {
            return Ok(versions);
        }
        let mut seen: BTreeSet<String> = BTreeSet::new();
        for entry in WalkDir::new(&root).min_depth(1).max_depth(1).into_iter().filter_map(|e| e.ok())
        {
            if entry.file_type().is_dir() {
                let meta = entry.path().join("meta.json");
                if let Ok(summary) = read_json::<VersionSummary>(&meta) {
                    seen.insert(summary.version.clone());
                    versions.push(summary);
                }
            }
        }
        for entry in WalkDir::new(&root).min_depth(1).max_depth(1).into_iter().filter_map(|e| e.ok())
        {
            if entry.file_type().is_file()
                && entry.path().extension().and_then(|s| s.to_str()) == Some("json")
            {
                if let Ok(summary) = read_json::<VersionSummary>(entry.path()) {
                    if seen.insert(summary.version.clone()) {
                        versions.push(summary);
                    }
                }
            }
        }
        versions.sort_by(|a, b| {
            (b.created_at.as_str(), b.version.as_str()).cmp(&(a.created_at.as_str(), a.version.as_str()))
        });
        Ok(versions)
    }

    pub fn version_summary(&self, name: &str, version: &str) -> Result<VersionSummary> {
        let dir_meta = version_dir(&self.indexes_dir, name, version).join("meta.json");
        if dir_meta.exists() {
            return read_json(&dir_meta);
        }
        let flat = versions_root(&self.indexes_dir, name).join(format!("{version}.json"));
        if flat.exists() {
            return read_json(&flat);
        }
        Err(Error::NotFound(format!("version {version} of index {name}")))
    }

    /// Index names are discovered from either a latest manifest or a
    /// `versions/` subtree; one of the two is enough.
    pub fn list_indexes(&self) -> Result<Vec<String>> {
        let mut names: BTreeSet<String> = BTreeSet::new();
        for entry in WalkDir::new(&self.indexes_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let file_name = entry.file_name().to_string_lossy().to_string();
            if entry.file_type().is_file() {
                if let Some(stem) = file_name.strip_suffix(&format!(".{MANIFEST_SUFFIX}")) {
                    names.insert(stem.to_string());
                }
            } else if entry.file_type().is_dir() && entry.path().join("versions").is_dir() {
                names.insert(file_name);
            }
        }
        Ok(names.into_iter().collect())
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| Error::Operation(format!("serialize {}: {e}", path.display())))?;
    fs::write(path, json).map_err(|e| Error::Operation(format!("write {}: {e}", path.display())))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(path.display().to_string())
        } else {
            Error::Operation(format!("read {}: {e}", path.display()))
        }
    })?;
    serde_json::from_str(&raw)
        .map_err(|e| Error::Corrupted(format!("unreadable JSON {}: {e}", path.display())))
}
