use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::error::ProviderError;
use crate::http::post_json;

/// Turns text into vectors.
///
/// `model_id` is recorded in the index manifest; querying an index built
/// with a different model is refused.
pub trait Embedder: Send + Sync {
    fn model_id(&self) -> &str;

    /// One vector per input, in input order.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;
}

/// Embedder backed by an OpenAI-compatible `/embeddings` endpoint.
#[derive(Clone, Debug)]
pub struct OpenAiEmbedder {
    url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl OpenAiEmbedder {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            url: format!("{}/embeddings", cfg.api_base_url),
            api_key: cfg.api_key.clone(),
            model: cfg.embed_model.clone(),
            timeout: Duration::from_secs(cfg.http_timeout_secs),
        }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

impl Embedder for OpenAiEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        debug!(model = %self.model, batch = texts.len(), "requesting embeddings");
        let req = EmbedRequest { model: &self.model, input: texts };
        let res = post_json::<EmbedResponse, _>(&self.url, &self.api_key, self.timeout, &req)?;
        Ok(order_by_index(res.data))
    }
}

// The API documents `index` per item; order by it when present.
fn order_by_index(mut data: Vec<EmbedData>) -> Vec<Vec<f32>> {
    if data.iter().all(|d| d.index.is_some()) {
        data.sort_by_key(|d| d.index);
    }
    data.into_iter().map(|d| d.embedding).collect()
}

/// Embed `texts` in batches of at most `batch_size`, checking that the
/// provider returned one vector per input and a single dimensionality.
pub fn embed_texts(
    embedder: &dyn Embedder,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>, ProviderError> {
    let mut out = Vec::with_capacity(texts.len());
    for batch in texts.chunks(batch_size.max(1)) {
        let vectors = embedder.embed(batch)?;
        if vectors.len() != batch.len() {
            return Err(ProviderError::unknown(format!(
                "embedding provider returned {} vectors for {} inputs",
                vectors.len(),
                batch.len()
            )));
        }
        out.extend(vectors);
    }

    if let Some(first) = out.first() {
        let dims = first.len();
        if dims == 0 {
            return Err(ProviderError::unknown("embedding provider returned empty vectors"));
        }
        if let Some(pos) = out.iter().position(|v| v.len() != dims) {
            return Err(ProviderError::unknown(format!(
                "embedding {pos} has {} dimensions, expected {dims}",
                out[pos].len()
            )));
        }
    }
    Ok(out)
}
