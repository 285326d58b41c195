use std::path::Path;

use tracing::{error, info, warn};

use crate::config::Config;
use crate::embed_chunks::{Embedder, OpenAiEmbedder};
use crate::error::{ProviderErrorKind, QueryError, Result};
use crate::generate::{Generator, OpenAiGenerator};
use crate::{answer_query, index_corpus, Answer, IndexReport};

pub const MSG_INDEX_UNAVAILABLE: &str = "Sorry, I could not load the knowledge base.";
pub const MSG_RATE_LIMITED: &str =
    "Sorry, the language model service is receiving too many requests right now. Please try again later.";
pub const MSG_AUTH_FAILED: &str =
    "Sorry, the language model service rejected our credentials. Please check the API key configuration.";
pub const MSG_UNKNOWN_ERROR: &str = "Sorry, an error occurred while generating the answer.";

/// Process-wide handle to the answering pipeline.
///
/// Built once at startup and shared by reference with every request. Holds
/// no per-request state.
pub struct RagService {
    cfg: Config,
    embedder: Box<dyn Embedder>,
    generator: Box<dyn Generator>,
}

impl RagService {
    /// Validate `cfg` and wire the OpenAI-compatible providers.
    pub fn init(cfg: Config) -> Result<Self> {
        cfg.validate()?;
        let embedder = OpenAiEmbedder::from_config(&cfg);
        let generator = OpenAiGenerator::from_config(&cfg);
        info!(
            embed_model = %cfg.embed_model,
            chat_model = %cfg.chat_model,
            temperature = cfg.temperature,
            index = %cfg.index_dir.display(),
            "rag service initialized"
        );
        Ok(Self::with_providers(cfg, Box::new(embedder), Box::new(generator)))
    }

    pub fn with_providers(
        cfg: Config,
        embedder: Box<dyn Embedder>,
        generator: Box<dyn Generator>,
    ) -> Self {
        Self { cfg, embedder, generator }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Rebuild the index; see [`index_corpus`].
    pub fn build_index(&self, source: Option<&Path>) -> Result<IndexReport> {
        index_corpus(&self.cfg, self.embedder.as_ref(), source)
    }

    pub fn answer_detailed(&self, question: &str) -> std::result::Result<Answer, QueryError> {
        answer_query(&self.cfg, self.embedder.as_ref(), self.generator.as_ref(), question)
    }

    /// The generated answer, or a fixed apology if it could not be produced.
    ///
    /// Provider detail is logged, never returned.
    pub fn answer(&self, question: &str) -> String {
        info!(question, "answering question");
        match self.answer_detailed(question) {
            Ok(answer) => answer.text,
            Err(err) => apology_for(&err).to_string(),
        }
    }
}

fn apology_for(err: &QueryError) -> &'static str {
    match err {
        QueryError::IndexUnavailable(cause) => {
            error!(error = %cause, "knowledge base unavailable");
            MSG_INDEX_UNAVAILABLE
        }
        QueryError::Provider(cause) => {
            match cause.kind {
                ProviderErrorKind::Unknown => {
                    error!(kind = %cause.kind, error = %cause.message, "provider call failed")
                }
                _ => warn!(kind = %cause.kind, error = %cause.message, "provider call failed"),
            }
            match cause.kind {
                ProviderErrorKind::RateLimited => MSG_RATE_LIMITED,
                ProviderErrorKind::AuthFailed => MSG_AUTH_FAILED,
                ProviderErrorKind::Unknown => MSG_UNKNOWN_ERROR,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{IndexError, ProviderError};

    #[test]
    fn every_failure_class_has_its_own_message() {
        let messages = [
            apology_for(&QueryError::IndexUnavailable(IndexError::Missing("x".into()))),
            apology_for(&ProviderError::new(ProviderErrorKind::RateLimited, "429").into()),
            apology_for(&ProviderError::new(ProviderErrorKind::AuthFailed, "401").into()),
            apology_for(&ProviderError::unknown("boom").into()),
        ];
        for (i, a) in messages.iter().enumerate() {
            for b in &messages[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn init_rejects_missing_credential() {
        assert!(RagService::init(Config::with_api_key("")).is_err());
    }
}
