use crate::chunk_text::Chunk;
use crate::store_index::IndexStore;

#[derive(Clone, Debug, PartialEq)]
pub struct Hit {
    pub chunk: Chunk,
    pub score: f32,
}

/// The `top_k` records most similar to `vector` by cosine similarity,
/// best first. Equal scores keep build order.
pub fn retrieve_top(store: &IndexStore, vector: &[f32], top_k: usize) -> Vec<Hit> {
    if vector.is_empty() || top_k == 0 {
        return vec![];
    }
    let mut scored: Vec<Hit> = store
        .records
        .iter()
        .map(|r| Hit { chunk: r.chunk.clone(), score: cosine_similarity(&r.embedding, vector) })
        .collect();
    // stable sort: ties stay in storage order
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(top_k);
    scored
}

/// Accumulates in f64 so large components do not overflow. Returns 0.0 when
/// either vector has zero magnitude or the result is not finite.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let norm_a = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let score = (dot / (norm_a * norm_b)) as f32;
    if score.is_finite() { score } else { 0.0 }
}
