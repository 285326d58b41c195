use std::env;
use std::path::PathBuf;

use crate::error::{RagError, Result};

pub const DEFAULT_SYSTEM_PROMPT: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.";

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";

/// Load `.env` into the process environment. Variables already set win.
///
/// Call before installing the log subscriber so `RUST_LOG` from `.env`
/// takes effect.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

#[derive(Clone, Debug)]
pub struct Config {
    pub api_key: String,
    pub api_base_url: String,
    pub embed_model: String,
    pub chat_model: String,
    pub temperature: f32,
    pub corpus_dir: PathBuf,
    pub index_dir: PathBuf,
    pub include_exts: Vec<String>,
    pub max_file_bytes: u64,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embed_batch_size: usize,
    pub top_k: usize,
    pub system_prompt: String,
    pub http_timeout_secs: u64,
    pub bind_addr: String,
}

impl Config {
    /// Read configuration from the environment, loading `.env` first.
    ///
    /// Fails when `OPENAI_API_KEY` is absent or the chunking parameters are
    /// inconsistent; both entry points call this before doing any work.
    pub fn from_env() -> Result<Self> {
        load_dotenv();
        let api_key = env::var("OPENAI_API_KEY")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| RagError::Config("OPENAI_API_KEY is not set".to_string()))?;
        let include_exts = env::var("RAG_INCLUDE_EXTS").unwrap_or_else(|_| ".txt".to_string());

        let cfg = Self {
            api_key,
            api_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string())
                .trim_end_matches('/')
                .to_string(),
            embed_model: env::var("OPENAI_EMBED_MODEL")
                .unwrap_or_else(|_| "text-embedding-ada-002".to_string()),
            chat_model: env::var("OPENAI_CHAT_MODEL")
                .unwrap_or_else(|_| "gpt-3.5-turbo".to_string()),
            temperature: parsed("RAG_TEMPERATURE", 0.5),
            corpus_dir: env::var("RAG_CORPUS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("corpus")),
            index_dir: env::var("RAG_INDEX_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("vector_db")),
            include_exts: include_exts
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            max_file_bytes: parsed("RAG_MAX_FILE_BYTES", 5_000_000),
            chunk_size: parsed("RAG_CHUNK_SIZE", 1000),
            chunk_overlap: parsed("RAG_CHUNK_OVERLAP", 200),
            embed_batch_size: parsed("RAG_EMBED_BATCH", 64),
            top_k: parsed("RAG_TOP_K", 3),
            system_prompt: env::var("RAG_SYSTEM_PROMPT")
                .unwrap_or_else(|_| DEFAULT_SYSTEM_PROMPT.to_string()),
            http_timeout_secs: parsed("RAG_HTTP_TIMEOUT_SECS", 120),
            bind_addr: env::var("RAG_BIND_ADDR")
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// A configuration with default settings and the given credential.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base_url: "https://api.openai.com/v1".to_string(),
            embed_model: "text-embedding-ada-002".to_string(),
            chat_model: "gpt-3.5-turbo".to_string(),
            temperature: 0.5,
            corpus_dir: PathBuf::from("corpus"),
            index_dir: PathBuf::from("vector_db"),
            include_exts: vec![".txt".to_string()],
            max_file_bytes: 5_000_000,
            chunk_size: 1000,
            chunk_overlap: 200,
            embed_batch_size: 64,
            top_k: 3,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            http_timeout_secs: 120,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(RagError::Config("OPENAI_API_KEY is not set".to_string()));
        }
        if self.chunk_size == 0 {
            return Err(RagError::Config("RAG_CHUNK_SIZE must be greater than zero".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Config(format!(
                "RAG_CHUNK_OVERLAP ({}) must be smaller than RAG_CHUNK_SIZE ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::Config("RAG_TOP_K must be greater than zero".to_string()));
        }
        if self.include_exts.is_empty() {
            return Err(RagError::Config("RAG_INCLUDE_EXTS is empty".to_string()));
        }
        if self.bind_addr.is_empty() {
            return Err(RagError::Config("RAG_BIND_ADDR is empty".to_string()));
        }
        Ok(())
    }
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::with_api_key("sk-test");
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.bind_addr, "127.0.0.1:5000");
    }

    #[test]
    fn rejects_blank_bind_address() {
        let mut cfg = Config::with_api_key("sk-test");
        cfg.bind_addr = String::new();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("RAG_BIND_ADDR"));
    }

    #[test]
    fn rejects_blank_credential() {
        let cfg = Config::with_api_key("  ");
        assert!(matches!(cfg.validate(), Err(RagError::Config(_))));
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        let mut cfg = Config::with_api_key("sk-test");
        cfg.chunk_size = 100;
        cfg.chunk_overlap = 100;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("RAG_CHUNK_OVERLAP"));
    }
}
