use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::build_prompt::Message;
use crate::config::Config;
use crate::error::ProviderError;
use crate::http::post_json;

/// Produces an answer from a prompt.
pub trait Generator: Send + Sync {
    fn generate(&self, messages: &[Message]) -> Result<String, ProviderError>;
}

/// Generator backed by an OpenAI-compatible `/chat/completions` endpoint.
/// Model and temperature are fixed per deployment.
#[derive(Clone, Debug)]
pub struct OpenAiGenerator {
    url: String,
    api_key: String,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl OpenAiGenerator {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            url: format!("{}/chat/completions", cfg.api_base_url),
            api_key: cfg.api_key.clone(),
            model: cfg.chat_model.clone(),
            temperature: cfg.temperature,
            timeout: Duration::from_secs(cfg.http_timeout_secs),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl Generator for OpenAiGenerator {
    fn generate(&self, messages: &[Message]) -> Result<String, ProviderError> {
        debug!(model = %self.model, temperature = self.temperature, "requesting completion");
        let req = ChatRequest { model: &self.model, messages, temperature: self.temperature };
        let res = post_json::<ChatResponse, _>(&self.url, &self.api_key, self.timeout, &req)?;
        first_content(res)
    }
}

fn first_content(res: ChatResponse) -> Result<String, ProviderError> {
    res.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ProviderError::unknown("completion response had no message content"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_first_choice_verbatim() {
        let raw = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"  Keep your word.\n"}}]}"#;
        let res: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(first_content(res).unwrap(), "  Keep your word.\n");
    }

    #[test]
    fn missing_content_is_an_error() {
        let res: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(first_content(res).is_err());
    }
}
