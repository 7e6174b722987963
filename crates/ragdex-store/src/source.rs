//! Minimal built-in source reader: one row per non-empty line of a plain
//! text file, row ids from line order. Richer tabular readers (CSV, Excel)
//! are external collaborators that produce the same `SourceRows` shape.

use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use ragdex_core::error::{Error, Result};
use ragdex_core::types::SourceRows;

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

pub fn read_lines_source(path: &Path) -> Result<SourceRows> {
    let bytes = fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(format!("source file {}", path.display()))
        } else {
            Error::Operation(format!("read {}: {e}", path.display()))
        }
    })?;
    let text = String::from_utf8_lossy(&bytes);
    let rows: Vec<(String, String)> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .enumerate()
        .map(|(i, l)| (i.to_string(), l.to_string()))
        .collect();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    Ok(SourceRows {
        stored_name: name.clone(),
        name: pretty_source_name(&name),
        sha256: Some(sha256_hex(&bytes)),
        rows,
    })
}

/// Uploads are stored as `<uuid>_<original-name>`; listing shows the
/// original name when that prefix is present.
pub fn pretty_source_name(stored: &str) -> String {
    let chars: Vec<char> = stored.chars().collect();
    if chars.len() > 37
        && chars[..36].iter().all(|c| c.is_ascii_hexdigit() || *c == '-')
        && (chars[36] == '_' || chars[36] == '-')
    {
        return chars[37..].iter().collect();
    }
    stored.to_string()
}
