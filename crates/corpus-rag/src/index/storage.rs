//! On-disk layout of a persisted index
//!
//! ```text
//! <path>/
//!   manifest.json   format version, embedding model id, dimensions, count, checksum
//!   index.bin       bincode-encoded VectorIndex
//! ```
//!
//! Both files are written into a staging directory next to `<path>` which is
//! renamed into place once complete, so a reader never sees a half-written index.
//! A previous index is renamed aside first and deleted after the swap.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use super::vectors::VectorIndex;
use crate::error::{Error, Result};

/// Bumped whenever the payload layout changes
pub const FORMAT_VERSION: u32 = 1;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const PAYLOAD_FILE: &str = "index.bin";

/// Self-description of a persisted index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format_version: u32,
    /// Embedding space the vectors were produced in
    pub model_id: String,
    pub dimensions: usize,
    /// Number of chunks
    pub count: usize,
    /// SHA-256 of `index.bin`, hex encoded
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}

/// Write `index` to `path`, replacing any previous index there
pub fn write_index(path: &Path, model_id: &str, index: &VectorIndex) -> Result<IndexManifest> {
    let payload = bincode::serde::encode_to_vec(index, bincode::config::standard())
        .map_err(|e| persist_error(path, e))?;

    let manifest = IndexManifest {
        format_version: FORMAT_VERSION,
        model_id: model_id.to_string(),
        dimensions: index.dimensions(),
        count: index.len(),
        checksum: checksum(&payload),
        created_at: Utc::now(),
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| persist_error(path, e))?;

    let staging = tempfile::Builder::new()
        .prefix(".index-staging-")
        .tempdir_in(parent)
        .map_err(|e| persist_error(path, e))?;

    fs::write(staging.path().join(PAYLOAD_FILE), &payload).map_err(|e| persist_error(path, e))?;
    // Manifest last: its presence marks a complete payload
    let manifest_json = serde_json::to_vec_pretty(&manifest)?;
    fs::write(staging.path().join(MANIFEST_FILE), manifest_json).map_err(|e| persist_error(path, e))?;

    // Move the previous index aside so `path` is never half-deleted
    let retired = if path.exists() {
        let retired = parent.join(format!(
            ".index-old-{}-{}",
            std::process::id(),
            manifest.created_at.timestamp_nanos_opt().unwrap_or_default()
        ));
        fs::rename(path, &retired).map_err(|e| persist_error(path, e))?;
        Some(retired)
    } else {
        None
    };

    if let Err(e) = fs::rename(staging.path(), path) {
        if let Some(retired) = &retired {
            if let Err(restore) = fs::rename(retired, path) {
                tracing::error!("Failed to restore previous index from {}: {}", retired.display(), restore);
            }
        }
        return Err(persist_error(path, e));
    }

    if let Some(retired) = retired {
        if let Err(e) = fs::remove_dir_all(&retired) {
            tracing::warn!("Failed to remove previous index {}: {}", retired.display(), e);
        }
    }

    tracing::info!(
        "Persisted index with {} chunks to {} ({} bytes)",
        manifest.count,
        path.display(),
        payload.len()
    );
    Ok(manifest)
}

/// Read and validate the index at `path`
pub fn read_index(path: &Path) -> Result<(IndexManifest, VectorIndex)> {
    let load_err = |msg: String| Error::index_load(format!("{}: {}", path.display(), msg));

    if !path.is_dir() {
        return Err(load_err("not an index directory".to_string()));
    }

    let manifest_bytes = fs::read(path.join(MANIFEST_FILE))
        .map_err(|e| load_err(format!("cannot read {}: {}", MANIFEST_FILE, e)))?;
    let manifest: IndexManifest = serde_json::from_slice(&manifest_bytes)
        .map_err(|e| load_err(format!("invalid {}: {}", MANIFEST_FILE, e)))?;

    if manifest.format_version != FORMAT_VERSION {
        return Err(load_err(format!(
            "unsupported format version {} (expected {})",
            manifest.format_version, FORMAT_VERSION
        )));
    }

    let payload = fs::read(path.join(PAYLOAD_FILE))
        .map_err(|e| load_err(format!("cannot read {}: {}", PAYLOAD_FILE, e)))?;

    if checksum(&payload) != manifest.checksum {
        return Err(load_err("checksum mismatch, payload is corrupt".to_string()));
    }

    let (index, _): (VectorIndex, usize) =
        bincode::serde::decode_from_slice(&payload, bincode::config::standard())
            .map_err(|e| load_err(format!("cannot decode {}: {}", PAYLOAD_FILE, e)))?;

    if index.dimensions() != manifest.dimensions || index.len() != manifest.count {
        return Err(load_err(format!(
            "payload holds {} chunks of dimension {}, manifest declares {} of dimension {}",
            index.len(),
            index.dimensions(),
            manifest.count,
            manifest.dimensions
        )));
    }
    if !index.is_consistent() {
        return Err(load_err("payload vectors do not match their chunks".to_string()));
    }

    Ok((manifest, index))
}

fn persist_error(path: &Path, e: impl std::fmt::Display) -> Error {
    Error::IndexPersist(format!("{}: {}", path.display(), e))
}

fn checksum(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chunk, DocumentMetadata};

    fn sample_index() -> VectorIndex {
        let mut index = VectorIndex::new(3);
        index
            .insert(Chunk::new("alpha", DocumentMetadata::new("a.txt"), 0), vec![1.0, 0.0, 0.0])
            .unwrap();
        index
            .insert(Chunk::new("beta", DocumentMetadata::new("b.txt"), 0), vec![0.0, 1.0, 0.0])
            .unwrap();
        index
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vector_index");

        let written = write_index(&path, "test-model", &sample_index()).unwrap();
        let (manifest, index) = read_index(&path).unwrap();

        assert_eq!(manifest, written);
        assert_eq!(index, sample_index());
    }

    #[test]
    fn test_overwrite_leaves_no_staging_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vector_index");

        write_index(&path, "test-model", &VectorIndex::new(3)).unwrap();
        write_index(&path, "test-model", &sample_index()).unwrap();

        let (manifest, _) = read_index(&path).unwrap();
        assert_eq!(manifest.count, 2);
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_overwrite_swaps_in_new_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vector_index");

        write_index(&path, "test-model", &sample_index()).unwrap();
        write_index(&path, "other-model", &VectorIndex::new(3)).unwrap();

        let (manifest, index) = read_index(&path).unwrap();
        assert_eq!(manifest.model_id, "other-model");
        assert!(index.is_empty());

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["vector_index"]);
    }

    #[test]
    fn test_corrupt_payload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vector_index");
        write_index(&path, "test-model", &sample_index()).unwrap();

        fs::write(path.join(PAYLOAD_FILE), b"garbage").unwrap();
        assert!(matches!(read_index(&path), Err(Error::IndexLoad(_))));
    }

    #[test]
    fn test_missing_files_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(read_index(&dir.path().join("absent")), Err(Error::IndexLoad(_))));

        let path = dir.path().join("vector_index");
        write_index(&path, "test-model", &sample_index()).unwrap();
        fs::remove_file(path.join(MANIFEST_FILE)).unwrap();
        assert!(matches!(read_index(&path), Err(Error::IndexLoad(_))));
    }

    #[test]
    fn test_unknown_format_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vector_index");
        let mut manifest = write_index(&path, "test-model", &sample_index()).unwrap();

        manifest.format_version = FORMAT_VERSION + 1;
        fs::write(path.join(MANIFEST_FILE), serde_json::to_vec(&manifest).unwrap()).unwrap();
        assert!(matches!(read_index(&path), Err(Error::IndexLoad(_))));
    }
}
