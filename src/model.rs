//! Language-model backend.
//!
//! The backend is an OpenAI-compatible chat completion endpoint. The
//! persona supplies the system message, the conversation transcript the
//! context, and the session's reply token budget the response cap.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::persona::Persona;
use crate::session::Exchange;

/// A request/response seam to the language model.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Sends one conversation turn and returns the model's reply.
    ///
    /// # Errors
    /// [`ApiError`] on transport failures, non-success statuses, or an
    /// empty reply. The caller treats all of these as soft: the turn ends
    /// without touching the transcript.
    async fn complete(
        &self,
        transcript: &[Exchange],
        utterance: &str,
        token_budget: u16,
        persona: &Persona,
    ) -> Result<String, ApiError>;
}

/// Chat message structure for the completion API.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u16,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Backend speaking the OpenAI-compatible `/v1/chat/completions` protocol.
pub struct OpenAiChatBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiChatBackend {
    pub fn new(api_base: &str, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/v1/chat/completions", api_base.trim_end_matches('/')),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl ModelBackend for OpenAiChatBackend {
    async fn complete(
        &self,
        transcript: &[Exchange],
        utterance: &str,
        token_budget: u16,
        persona: &Persona,
    ) -> Result<String, ApiError> {
        let request = ChatRequest {
            model: &self.model,
            messages: build_messages(transcript, utterance, persona),
            max_tokens: token_budget,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let reply = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();
        let reply = reply.trim().to_string();
        if reply.is_empty() {
            return Err(ApiError::EmptyReply);
        }
        Ok(reply)
    }
}

/// Assembles the message list: persona as the system turn, the transcript
/// as context, and the fresh utterance last. A trailing newline terminates
/// the human turn so the model does not hallucinate its continuation.
fn build_messages(transcript: &[Exchange], utterance: &str, persona: &Persona) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(transcript.len() * 2 + 2);
    messages.push(ChatMessage {
        role: "system".to_string(),
        content: format!(
            "You are {}. {}",
            persona.name(),
            persona.effective_self_concept()
        ),
    });
    for exchange in transcript {
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: exchange.human.clone(),
        });
        messages.push(ChatMessage {
            role: "assistant".to_string(),
            content: exchange.agent.clone(),
        });
    }
    messages.push(ChatMessage {
        role: "user".to_string(),
        content: format!("{utterance}\n"),
    });
    messages
}
