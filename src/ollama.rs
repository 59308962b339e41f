use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::models::Message;

/// The external language-model engine: ordered history in, generated text out.
///
/// Earlier entries are treated as conversation context and the last entry as
/// the active turn.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    async fn chat(&self, messages: &[Message]) -> Result<String>;
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl InferenceEngine for OllamaClient {
    async fn chat(&self, messages: &[Message]) -> Result<String> {
        #[derive(Serialize)]
        struct ChatReq<'a> {
            model: &'a str,
            messages: Vec<ChatMsg<'a>>,
            stream: bool,
        }

        #[derive(Serialize)]
        struct ChatMsg<'a> {
            role: &'static str,
            content: &'a str,
        }

        #[derive(Deserialize)]
        struct ChatResp {
            message: ChatRespMsg,
        }

        #[derive(Deserialize)]
        struct ChatRespMsg {
            content: String,
        }

        let url = format!("{}/api/chat", self.base_url);
        let request = ChatReq {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| ChatMsg {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            stream: false,
        };

        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("failed to call ollama chat endpoint at {}", self.base_url))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "model '{}' not found ({}); pull it with `ollama pull {}`",
                self.model,
                normalize_err_body(&body),
                self.model
            );
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "ollama /api/chat returned {status}: {}",
                normalize_err_body(&body)
            );
        }

        let response = response
            .json::<ChatResp>()
            .await
            .context("failed to decode ollama /api/chat response")?;

        Ok(response.message.content)
    }
}

fn normalize_err_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    if let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(err) = json.get("error").and_then(|v| v.as_str()) {
            return err.to_string();
        }
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_prefers_json_error_field() {
        let body = r#"{"error":"model \"llama2\" not found, try pulling it first"}"#;
        assert_eq!(
            normalize_err_body(body),
            "model \"llama2\" not found, try pulling it first"
        );
    }

    #[test]
    fn error_body_falls_back_to_raw_text() {
        assert_eq!(normalize_err_body("  bad gateway \n"), "bad gateway");
        assert_eq!(normalize_err_body(""), "<empty body>");
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let client = OllamaClient::new("http://127.0.0.1:11434/", "llama2");
        assert_eq!(client.base_url, "http://127.0.0.1:11434");
        assert_eq!(client.model(), "llama2");
    }

    #[tokio::test]
    async fn unreachable_engine_is_an_error() {
        // Port 9 (discard) is not an Ollama server; connection fails fast.
        let client = OllamaClient::new("http://127.0.0.1:9", "llama2");
        let err = client.chat(&[Message::user("hi")]).await.unwrap_err();
        assert!(format!("{err:#}").contains("failed to call ollama chat endpoint"));
    }
}
