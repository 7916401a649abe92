use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::AssistantError;
use crate::store::types::{ConversationTurn, Role};

/// The chat Q&A collaborator. Given the bounded recent history (ending with
/// the user's latest turn), produce a reply.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, history: &[ConversationTurn]) -> Result<String, AssistantError>;
}

const SYSTEM_PROMPT: &str =
    "You are Vesper, a personal voice assistant. Respond briefly, helpfully, and precisely; \
     your replies are spoken aloud.";

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

/// OpenAI-compatible chat-completions client.
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    pub fn new(base_url: String, api_key: String, model: String, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            base_url,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl ChatBackend for ChatClient {
    async fn complete(&self, history: &[ConversationTurn]) -> Result<String, AssistantError> {
        let mut messages = vec![ChatMessage {
            role: "system",
            content: SYSTEM_PROMPT,
        }];
        for turn in history {
            messages.push(ChatMessage {
                role: match turn.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                content: &turn.text,
            });
        }

        let request = CompletionRequest {
            model: &self.model,
            messages,
            max_tokens: 256,
            temperature: 0.7,
        };

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&request);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AssistantError::Api(e.to_string()))?;
        if !response.status().is_success() {
            return Err(AssistantError::Api(format!(
                "chat backend returned {}",
                response.status()
            )));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::Api(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| AssistantError::Api("empty completion".to_string()))
    }
}
