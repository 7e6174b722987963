//! On-disk layout per index name.
//!
//! ```text
//! <indexes_dir>/<name>.docs.json          latest chunk-id -> text map
//! <indexes_dir>/<name>.manifest.json      latest manifest
//! <indexes_dir>/<name>.index.json         latest vector blob
//! <indexes_dir>/<name>.ids.json           latest ordered chunk-id list
//! <indexes_dir>/<name>/versions/<vid>/    one immutable snapshot
//! <indexes_dir>/<name>/versions/<vid>.json  flat summary for listing
//! ```

use std::path::{Path, PathBuf};

pub const DOCS_SUFFIX: &str = "docs.json";
pub const MANIFEST_SUFFIX: &str = "manifest.json";
pub const INDEX_SUFFIX: &str = "index.json";
pub const IDS_SUFFIX: &str = "ids.json";

pub fn latest_artifact(indexes_dir: &Path, name: &str, suffix: &str) -> PathBuf {
    indexes_dir.join(format!("{name}.{suffix}"))
}

pub fn versions_root(indexes_dir: &Path, name: &str) -> PathBuf {
    indexes_dir.join(name).join("versions")
}

pub fn version_dir(indexes_dir: &Path, name: &str, version: &str) -> PathBuf {
    versions_root(indexes_dir, name).join(version)
}

pub fn version_artifact(dir: &Path, name: &str, suffix: &str) -> PathBuf {
    dir.join(format!("{name}.{suffix}"))
}
