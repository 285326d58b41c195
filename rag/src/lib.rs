mod build_prompt;
mod chunk_text;
mod config;
mod embed_chunks;
mod embed_query;
mod error;
mod generate;
mod http;
mod retrieve_chunks;
mod scan_files;
mod service;
mod store_index;

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info};

pub use build_prompt::{build_prompt_with_context, Message};
pub use chunk_text::{chunk_text, Chunk};
pub use config::{load_dotenv, Config, DEFAULT_BIND_ADDR, DEFAULT_SYSTEM_PROMPT};
pub use embed_chunks::{Embedder, OpenAiEmbedder};
pub use error::{IndexError, ProviderError, ProviderErrorKind, QueryError, RagError, Result};
pub use generate::{Generator, OpenAiGenerator};
pub use retrieve_chunks::Hit;
pub use scan_files::SkippedFile;
pub use service::{
    RagService, MSG_AUTH_FAILED, MSG_INDEX_UNAVAILABLE, MSG_RATE_LIMITED, MSG_UNKNOWN_ERROR,
};
pub use store_index::{IndexStore, Manifest, DISTANCE_COSINE, SCHEMA_VERSION};

use chunk_text::chunk_document;
use embed_chunks::embed_texts;
use embed_query::embed_query;
use retrieve_chunks::retrieve_top;
use scan_files::scan_files;
use store_index::{write_index, StoredChunk};

/// Outcome of a successful index build.
#[derive(Clone, Debug)]
pub struct IndexReport {
    pub index_dir: PathBuf,
    pub documents: usize,
    pub chunks: usize,
    pub dimensions: usize,
    pub skipped: Vec<SkippedFile>,
}

/// The generated text together with the chunks it was conditioned on.
#[derive(Clone, Debug)]
pub struct Answer {
    pub text: String,
    pub context: String,
    pub hits: Vec<Hit>,
}

/// Rebuild the index at `cfg.index_dir` from the text files in `source`
/// (or `cfg.corpus_dir`).
///
/// Unreadable files are skipped. If nothing is left to index the existing
/// index is not touched and [`RagError::NoUsableInput`] is returned. An
/// embedding failure aborts the build before anything is written.
pub fn index_corpus(
    cfg: &Config,
    embedder: &dyn Embedder,
    source: Option<&Path>,
) -> Result<IndexReport> {
    let base = source.unwrap_or(cfg.corpus_dir.as_path());
    let corpus = scan_files(cfg, base)?;

    let chunks: Vec<Chunk> = corpus
        .documents
        .iter()
        .flat_map(|doc| chunk_document(doc, cfg))
        .collect();
    if chunks.is_empty() {
        return Err(RagError::NoUsableInput(base.to_path_buf()));
    }
    info!(
        documents = corpus.documents.len(),
        chunks = chunks.len(),
        "documents split into chunks"
    );

    info!(model = embedder.model_id(), "generating embeddings");
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embed_texts(embedder, &texts, cfg.embed_batch_size)?;
    let dimensions = vectors.first().map(Vec::len).unwrap_or_default();

    let records: Vec<StoredChunk> = chunks
        .into_iter()
        .zip(vectors)
        .map(|(chunk, embedding)| StoredChunk { chunk, embedding })
        .collect();
    let manifest = Manifest {
        schema_version: SCHEMA_VERSION,
        embed_model: embedder.model_id().to_string(),
        dimensions,
        distance: DISTANCE_COSINE.to_string(),
        chunk_size: cfg.chunk_size,
        chunk_overlap: cfg.chunk_overlap,
        documents: corpus.documents.len(),
        chunks: records.len(),
        built_at: Utc::now(),
    };
    write_index(&cfg.index_dir, &manifest, &records)?;

    Ok(IndexReport {
        index_dir: cfg.index_dir.clone(),
        documents: manifest.documents,
        chunks: manifest.chunks,
        dimensions,
        skipped: corpus.skipped,
    })
}

/// Answer `question` from the index at `cfg.index_dir`.
pub fn answer_query(
    cfg: &Config,
    embedder: &dyn Embedder,
    generator: &dyn Generator,
    question: &str,
) -> std::result::Result<Answer, QueryError> {
    let store = IndexStore::open(&cfg.index_dir)?;
    store.ensure_model(embedder.model_id())?;
    debug!(chunks = store.records.len(), "knowledge base loaded");

    let query_vec = embed_query(embedder, question)?;
    if query_vec.len() != store.manifest.dimensions {
        return Err(IndexError::QueryDimensionMismatch {
            found: query_vec.len(),
            expected: store.manifest.dimensions,
        }
        .into());
    }

    let hits = retrieve_top(&store, &query_vec, cfg.top_k);
    let (messages, context) = build_prompt_with_context(cfg, question, &hits);
    let text = generator.generate(&messages)?;
    Ok(Answer { text, context, hits })
}
