use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{RagError, Result};

/// The full text of one corpus file.
#[derive(Clone, Debug)]
pub struct Document {
    /// File name relative to the corpus directory.
    pub source: String,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct LoadedCorpus {
    pub documents: Vec<Document>,
    pub skipped: Vec<SkippedFile>,
}

/// Load every plain-text file sitting directly in `base`, in file-name order.
///
/// Files with another extension are ignored without a trace. Files that
/// cannot be read are recorded in `skipped` and logged; they never abort
/// the scan. Only an unreadable `base` itself is an error.
pub fn scan_files(cfg: &Config, base: &Path) -> Result<LoadedCorpus> {
    let mut corpus = LoadedCorpus::default();
    info!(dir = %base.display(), "loading documents");

    if let Err(source) = fs::read_dir(base) {
        return Err(RagError::Corpus { path: base.to_path_buf(), source });
    }
    let walker = WalkDir::new(base)
        .follow_links(true)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| base.to_path_buf());
                warn!(file = %path.display(), error = %err, "skipping unreadable entry");
                corpus.skipped.push(SkippedFile { path, reason: err.to_string() });
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !is_text_file(path, &cfg.include_exts) {
            continue;
        }
        let source = entry.file_name().to_string_lossy().to_string();

        if let Ok(meta) = entry.metadata() {
            if meta.len() > cfg.max_file_bytes {
                let reason =
                    format!("file is {} bytes, limit is {}", meta.len(), cfg.max_file_bytes);
                warn!(file = %source, %reason, "skipping oversized file");
                corpus.skipped.push(SkippedFile { path: path.to_path_buf(), reason });
                continue;
            }
        }

        match fs::read_to_string(path) {
            Ok(text) if text.trim().is_empty() => {
                debug!(file = %source, "skipping empty file");
            }
            Ok(text) => {
                info!(file = %source, chars = text.chars().count(), "loaded");
                corpus.documents.push(Document { source, text });
            }
            Err(err) => {
                warn!(file = %source, error = %err, "failed to load file");
                corpus.skipped.push(SkippedFile {
                    path: path.to_path_buf(),
                    reason: err.to_string(),
                });
            }
        }
    }

    Ok(corpus)
}

fn is_text_file(path: &Path, exts: &[String]) -> bool {
    let lower = path.to_string_lossy().to_lowercase();
    exts.iter().any(|ext| lower.ends_with(ext.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_extension_case_insensitively() {
        let exts = vec![".txt".to_string()];
        assert!(is_text_file(Path::new("corpus/Notes.TXT"), &exts));
        assert!(!is_text_file(Path::new("corpus/notes.md"), &exts));
        assert!(!is_text_file(Path::new("corpus/txt"), &exts));
    }
}
