//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `RAGDEX_*`
//! env vars. Provides helpers to expand `~` and `${VAR}` and to resolve
//! relative paths against a known base directory.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::env;
use std::path::{Path, PathBuf};

use crate::types::{BackendKind, ChunkingSpec};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("RAGDEX_"));

        Ok(Self { figment })
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Root directory holding per-index latest artifacts and `versions/`
    /// subtrees. Defaults to `data/indexes` next to the working directory.
    pub fn indexes_dir(&self) -> PathBuf {
        let raw: String = self
            .get("data.indexes_dir")
            .unwrap_or_else(|_| "data/indexes".to_string());
        expand_path(raw)
    }

    pub fn embed_model(&self) -> String {
        self.get("embed.model").unwrap_or_else(|_| "hash-v1".to_string())
    }

    pub fn embed_dim(&self) -> usize {
        self.get("embed.dim").unwrap_or(384)
    }

    pub fn embed_normalize(&self) -> bool {
        self.get("embed.normalize").unwrap_or(true)
    }

    /// A missing key means `flat`; a present-but-unknown backend name is a
    /// configuration error, not a silent fallback.
    pub fn default_backend(&self) -> anyhow::Result<BackendKind> {
        match self.get::<String>("index.default_backend") {
            Ok(name) => Ok(name.parse()?),
            Err(_) => Ok(BackendKind::Flat),
        }
    }

    pub fn chunking(&self) -> ChunkingSpec {
        ChunkingSpec {
            mode: self.get("chunk.mode").unwrap_or_else(|_| "fixed_chars".to_string()),
            size: self.get("chunk.size").unwrap_or(1000),
            overlap: self.get("chunk.overlap").unwrap_or(150),
        }
    }

    pub fn top_k(&self) -> usize {
        self.get("search.top_k").unwrap_or(5)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after
/// expansion. Absolute paths are returned as-is.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() {
        p
    } else {
        base.join(p)
    }
}
