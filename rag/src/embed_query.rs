use crate::embed_chunks::Embedder;
use crate::error::ProviderError;

pub fn embed_query(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>, ProviderError> {
    let vecs = embedder.embed(&[text.to_string()])?;
    vecs.into_iter()
        .next()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            ProviderError::unknown("embedding provider returned no vector for the question")
        })
}
