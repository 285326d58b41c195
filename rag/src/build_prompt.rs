use serde::Serialize;

use crate::config::Config;
use crate::retrieve_chunks::Hit;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// System instruction plus one user message carrying the retrieved context
/// (in rank order) and the question. Also returns the context block alone.
pub fn build_prompt_with_context(
    cfg: &Config,
    question: &str,
    hits: &[Hit],
) -> (Vec<Message>, String) {
    let context = format_context_from_hits(hits);
    let user_content = format!("{context}\n\nQuestion: {question}\nHelpful Answer:");
    let messages = vec![Message::system(cfg.system_prompt.clone()), Message::user(user_content)];
    (messages, context)
}

pub fn format_context_from_hits(hits: &[Hit]) -> String {
    hits.iter()
        .map(|hit| hit.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
