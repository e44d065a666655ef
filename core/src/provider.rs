//! Gemini provider client behind the [`ChatBackend`] seam.
//!
//! Calls are retry-free by design: a credential probe failure is surfaced for
//! the user to resubmit, and a chat failure is converted by the session layer
//! into a single apology turn. The only bound on a call is the HTTP client's
//! overall timeout.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::HearthError;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "models/gemini-pro";

/// One turn of conversation as sent to the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

/// Seam between the conversation manager and the hosted provider, so the
/// turn-handling logic stays testable without network access.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// One live round-trip used solely to confirm the credential works.
    async fn probe(&self, credential: &str) -> Result<(), HearthError>;

    /// Execute a chat completion over the full turn history.
    async fn chat(
        &self,
        credential: &str,
        messages: &[ChatMessage],
    ) -> Result<String, HearthError>;
}

pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(45))
            .user_agent("Hearth-Core/0.1 (+https://github.com/hearth)")
            .build()
            .context("failed to construct HTTP client")?;
        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn generate(&self, credential: &str, prompt: &str) -> Result<String, HearthError> {
        let endpoint = format!(
            "{}/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            self.model,
            credential
        );

        let payload = serde_json::json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [{"text": prompt}]
                }
            ],
            "generationConfig": {
                "temperature": 0.2
            }
        });

        let response = self
            .client
            .post(endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|err| HearthError::GenerationFailed(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let reason = response.text().await.unwrap_or_default();
            let detail = extract_error_message(&reason)
                .unwrap_or_else(|| format!("provider returned HTTP {status}"));
            return Err(HearthError::GenerationFailed(detail));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| HearthError::GenerationFailed(err.to_string()))?;
        Ok(extract_text(&body))
    }
}

#[async_trait]
impl ChatBackend for GeminiClient {
    async fn probe(&self, credential: &str) -> Result<(), HearthError> {
        match self.generate(credential, "Hello").await {
            Ok(_) => Ok(()),
            Err(HearthError::GenerationFailed(reason)) => {
                Err(HearthError::CredentialRejected(reason))
            }
            Err(other) => Err(other),
        }
    }

    async fn chat(
        &self,
        credential: &str,
        messages: &[ChatMessage],
    ) -> Result<String, HearthError> {
        let prompt = build_conversation_prompt(messages);
        self.generate(credential, &prompt).await
    }
}

/// Flatten the turn history into a single ROLE-prefixed text prompt, the form
/// the generateContent endpoint accepts for non-streaming chat.
pub fn build_conversation_prompt(messages: &[ChatMessage]) -> String {
    let mut sections = Vec::new();
    for msg in messages {
        sections.push(format!(
            "{}: {}",
            msg.role.to_uppercase(),
            msg.content.trim()
        ));
    }
    sections.join("\n\n")
}

/// Pull the reply text out of a generateContent response body.
pub fn extract_text(body: &Value) -> String {
    body.get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|cand| cand.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(|parts| parts.get(0))
        .and_then(|part| part.get("text"))
        .and_then(|text| text.as_str())
        .unwrap_or_default()
        .to_string()
}

fn extract_error_message(raw: &str) -> Option<String> {
    let body: Value = serde_json::from_str(raw).ok()?;
    body.get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_prompt_uppercases_roles() {
        let messages = vec![
            ChatMessage::new("system", "You are Sage."),
            ChatMessage::new("user", "  hi there  "),
            ChatMessage::new("assistant", "Hello!"),
        ];
        let prompt = build_conversation_prompt(&messages);
        assert_eq!(
            prompt,
            "SYSTEM: You are Sage.\n\nUSER: hi there\n\nASSISTANT: Hello!"
        );
    }

    #[test]
    fn extract_text_reads_first_candidate() {
        let body = serde_json::json!({
            "candidates": [
                {"content": {"parts": [{"text": "Namaste!"}]}}
            ]
        });
        assert_eq!(extract_text(&body), "Namaste!");
        assert_eq!(extract_text(&serde_json::json!({})), "");
    }

    #[test]
    fn error_message_is_pulled_from_json_body() {
        let raw = r#"{"error": {"code": 400, "message": "API key not valid"}}"#;
        assert_eq!(
            extract_error_message(raw).as_deref(),
            Some("API key not valid")
        );
        assert_eq!(extract_error_message("not json"), None);
    }
}
