//! On-disk vector index.
//!
//! An index is a directory holding two JSON files:
//!
//! - `manifest.json`: schema version, embedding model, dimensions, distance
//!   metric and the chunking parameters used at build time.
//! - `chunks.json`: every chunk with its text, source file, position and
//!   embedding, in build order.
//!
//! Builds are full rebuilds. The new index is written to a staging sibling
//! and moved into place once complete, so a failed build leaves the previous
//! index untouched.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::chunk_text::Chunk;
use crate::error::{IndexError, RagError, Result};

pub const SCHEMA_VERSION: u32 = 1;
pub const DISTANCE_COSINE: &str = "cosine";

const MANIFEST_FILE: &str = "manifest.json";
const CHUNKS_FILE: &str = "chunks.json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub schema_version: u32,
    pub embed_model: String,
    pub dimensions: usize,
    pub distance: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub documents: usize,
    pub chunks: usize,
    pub built_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredChunk {
    #[serde(flatten)]
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// A loaded, validated index. Read-only.
#[derive(Debug)]
pub struct IndexStore {
    pub manifest: Manifest,
    pub records: Vec<StoredChunk>,
}

impl IndexStore {
    pub fn open(dir: &Path) -> std::result::Result<Self, IndexError> {
        if !dir.join(MANIFEST_FILE).is_file() {
            return Err(IndexError::Missing(dir.to_path_buf()));
        }
        let manifest: Manifest = read_json(&dir.join(MANIFEST_FILE))?;
        if manifest.schema_version != SCHEMA_VERSION {
            return Err(IndexError::SchemaMismatch {
                found: manifest.schema_version,
                expected: SCHEMA_VERSION,
            });
        }
        let records: Vec<StoredChunk> = read_json(&dir.join(CHUNKS_FILE))?;
        if records.len() != manifest.chunks {
            return Err(IndexError::CountMismatch {
                records: records.len(),
                declared: manifest.chunks,
            });
        }
        let wrong_size = records.iter().position(|r| r.embedding.len() != manifest.dimensions);
        if let Some(position) = wrong_size {
            return Err(IndexError::DimensionMismatch {
                position,
                found: records[position].embedding.len(),
                expected: manifest.dimensions,
            });
        }
        debug!(dir = %dir.display(), chunks = records.len(), "index opened");
        Ok(Self { manifest, records })
    }

    /// Refuse an index built with a different embedding model.
    pub fn ensure_model(&self, model_id: &str) -> std::result::Result<(), IndexError> {
        if self.manifest.embed_model != model_id {
            return Err(IndexError::ModelMismatch {
                indexed: self.manifest.embed_model.clone(),
                configured: model_id.to_string(),
            });
        }
        Ok(())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> std::result::Result<T, IndexError> {
    let raw = fs::read_to_string(path).map_err(|source| IndexError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| IndexError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// Replace whatever index lives at `dir` with `records`.
pub fn write_index(dir: &Path, manifest: &Manifest, records: &[StoredChunk]) -> Result<()> {
    let staging = sibling(dir, "staging")?;
    let mut previous = sibling(dir, "previous")?;

    if staging.exists() {
        fs::remove_dir_all(&staging).map_err(persist_err(&staging))?;
    }
    if let Some(parent) = staging.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(persist_err(parent))?;
    }
    fs::create_dir(&staging).map_err(persist_err(&staging))?;

    let manifest_json = serde_json::to_vec_pretty(manifest)?;
    let chunks_json = serde_json::to_vec(records)?;
    fs::write(staging.join(MANIFEST_FILE), manifest_json).map_err(persist_err(&staging))?;
    fs::write(staging.join(CHUNKS_FILE), chunks_json).map_err(persist_err(&staging))?;

    restore_interrupted_swap(dir, &previous)?;
    if let Err(err) = clear_stale(&previous) {
        warn!(previous = %previous.display(), error = %err, "stale previous index left in place");
        previous = sibling(dir, &format!("previous.{}", Utc::now().timestamp_millis()))?;
    }
    swap_into_place(&staging, dir, &previous)?;
    discard_previous(&previous);

    info!(dir = %dir.display(), chunks = records.len(), "index written");
    Ok(())
}

/// Move `staging` to `dir`, parking the current index at `previous`. If the
/// final rename fails the parked index is moved back.
fn swap_into_place(staging: &Path, dir: &Path, previous: &Path) -> Result<()> {
    let parked = dir.exists();
    if parked {
        fs::rename(dir, previous).map_err(persist_err(dir))?;
    }
    if let Err(source) = fs::rename(staging, dir) {
        if parked {
            if let Err(err) = fs::rename(previous, dir) {
                error!(
                    previous = %previous.display(),
                    error = %err,
                    "failed to restore previous index"
                );
            }
        }
        return Err(RagError::Persist { path: dir.to_path_buf(), source });
    }
    Ok(())
}

/// A crash between the two renames leaves only `previous`. Put it back
/// before anything else touches it.
fn restore_interrupted_swap(dir: &Path, previous: &Path) -> Result<()> {
    if !dir.exists() && previous.is_dir() {
        warn!(previous = %previous.display(), "restoring index left by an interrupted build");
        fs::rename(previous, dir).map_err(persist_err(previous))?;
    }
    Ok(())
}

fn clear_stale(path: &Path) -> Result<()> {
    let removed = if path.is_dir() {
        fs::remove_dir_all(path)
    } else if path.exists() {
        fs::remove_file(path)
    } else {
        return Ok(());
    };
    removed.map_err(persist_err(path))
}

/// The new index is already live here, so a failed removal is only logged.
fn discard_previous(previous: &Path) -> bool {
    if !previous.exists() {
        return true;
    }
    match fs::remove_dir_all(previous) {
        Ok(()) => true,
        Err(err) => {
            warn!(previous = %previous.display(), error = %err, "could not remove previous index");
            false
        }
    }
}

fn persist_err(path: &Path) -> impl FnOnce(io::Error) -> RagError {
    let path = path.to_path_buf();
    move |source| RagError::Persist { path, source }
}

fn sibling(dir: &Path, suffix: &str) -> Result<PathBuf> {
    let name = dir.file_name().ok_or_else(|| RagError::Persist {
        path: dir.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidInput, "index path has no directory name"),
    })?;
    let mut name = name.to_os_string();
    name.push(format!(".{suffix}"));
    Ok(dir.with_file_name(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(chunks: usize) -> Manifest {
        Manifest {
            schema_version: SCHEMA_VERSION,
            embed_model: "test-model".to_string(),
            dimensions: 2,
            distance: DISTANCE_COSINE.to_string(),
            chunk_size: 100,
            chunk_overlap: 10,
            documents: 1,
            chunks,
            built_at: Utc::now(),
        }
    }

    fn record(index: usize, embedding: Vec<f32>) -> StoredChunk {
        StoredChunk {
            chunk: Chunk { source: "a.txt".to_string(), index, text: format!("chunk {index}") },
            embedding,
        }
    }

    #[test]
    fn write_then_open() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("vector_db");
        let records = vec![record(0, vec![1.0, 0.0]), record(1, vec![0.0, 1.0])];
        write_index(&dir, &manifest(2), &records).unwrap();

        let store = IndexStore::open(&dir).unwrap();
        assert_eq!(store.records, records);
        assert_eq!(store.manifest.distance, "cosine");
        assert!(!tmp.path().join("vector_db.staging").exists());
    }

    #[test]
    fn rebuild_replaces_previous_contents() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("vector_db");
        let first = [record(0, vec![1.0, 0.0]), record(1, vec![0.0, 1.0])];
        write_index(&dir, &manifest(2), &first).unwrap();
        write_index(&dir, &manifest(1), &[record(0, vec![0.5, 0.5])]).unwrap();

        let store = IndexStore::open(&dir).unwrap();
        assert_eq!(store.records.len(), 1);
        assert!(!tmp.path().join("vector_db.previous").exists());
    }

    #[test]
    fn missing_directory_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let err = IndexStore::open(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, IndexError::Missing(_)));
    }

    #[test]
    fn corrupt_chunks_file_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("vector_db");
        write_index(&dir, &manifest(1), &[record(0, vec![1.0, 0.0])]).unwrap();
        fs::write(dir.join(CHUNKS_FILE), "{not json").unwrap();
        assert!(matches!(IndexStore::open(&dir), Err(IndexError::Corrupt { .. })));
    }

    #[test]
    fn schema_version_is_checked() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("vector_db");
        let mut m = manifest(1);
        m.schema_version = SCHEMA_VERSION + 1;
        write_index(&dir, &m, &[record(0, vec![1.0, 0.0])]).unwrap();
        assert!(matches!(IndexStore::open(&dir), Err(IndexError::SchemaMismatch { .. })));
    }

    #[test]
    fn model_identity_is_pinned() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("vector_db");
        write_index(&dir, &manifest(1), &[record(0, vec![1.0, 0.0])]).unwrap();
        let store = IndexStore::open(&dir).unwrap();
        assert!(store.ensure_model("test-model").is_ok());
        assert!(matches!(store.ensure_model("other"), Err(IndexError::ModelMismatch { .. })));
    }

    #[test]
    fn failed_swap_puts_the_old_index_back() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("vector_db");
        let previous = tmp.path().join("vector_db.previous");
        write_index(&dir, &manifest(1), &[record(0, vec![1.0, 0.0])]).unwrap();

        let staging = tmp.path().join("vector_db.staging");
        let err = swap_into_place(&staging, &dir, &previous).unwrap_err();
        assert!(matches!(err, RagError::Persist { .. }));

        let store = IndexStore::open(&dir).unwrap();
        assert_eq!(store.records.len(), 1);
        assert!(!previous.exists());
    }

    #[test]
    fn interrupted_swap_is_restored_before_rebuilding() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("vector_db");
        let previous = tmp.path().join("vector_db.previous");
        write_index(&dir, &manifest(1), &[record(0, vec![1.0, 0.0])]).unwrap();
        fs::rename(&dir, &previous).unwrap();

        restore_interrupted_swap(&dir, &previous).unwrap();
        assert_eq!(IndexStore::open(&dir).unwrap().records.len(), 1);
        assert!(!previous.exists());
    }

    #[test]
    fn cleanup_failure_after_commit_is_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("vector_db.previous");
        fs::write(&blocker, "not a directory").unwrap();
        assert!(!discard_previous(&blocker));
        assert!(discard_previous(&tmp.path().join("absent")));
    }

    #[test]
    fn stale_previous_file_does_not_block_a_build() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("vector_db");
        write_index(&dir, &manifest(1), &[record(0, vec![1.0, 0.0])]).unwrap();
        fs::write(tmp.path().join("vector_db.previous"), "leftover").unwrap();

        write_index(&dir, &manifest(1), &[record(0, vec![0.0, 1.0])]).unwrap();
        let store = IndexStore::open(&dir).unwrap();
        assert_eq!(store.records[0].embedding, vec![0.0, 1.0]);
        assert!(!tmp.path().join("vector_db.previous").exists());
    }
}
