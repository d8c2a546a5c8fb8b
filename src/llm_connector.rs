//! LLM Connector - chat with a local Ollama server
//!
//! `ChatClient` is the black-box `chat(history) -> text` capability.
//! `Conversation` keeps the rolling history and weaves action contexts into
//! it. A failed turn keeps the user's message so the next turn still sees it.

use crate::config::AssistantConfig;
use crate::error::ChatError;
use crate::types::ActionContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Prepended to every action context so the model reports instead of asking
pub const BEHAVIOR_INSTRUCTIONS: &str = "You are a proactive desktop assistant with control of \
the user's browser and computer. The action described below has ALREADY been carried out. \
Do not ask for permission or confirmation and do not offer to do it. Describe the result \
using the information provided, be direct and concise, and answer in the user's language.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send the whole history, get the assistant's reply
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, ChatError>;

    /// Cheap reachability check for status display
    async fn probe(&self) -> bool;

    fn model_info(&self) -> String;
}

/// Ollama `/api/chat` client
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    probe_timeout: Duration,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

impl OllamaClient {
    pub fn new(config: &AssistantConfig) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .timeout(config.chat_timeout())
            .build()
            .map_err(|e| ChatError::Other(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.ollama_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            probe_timeout: config.probe_timeout(),
        })
    }
}

#[async_trait]
impl ChatClient for OllamaClient {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, ChatError> {
        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            stream: false,
            messages,
        };

        let started = Instant::now();
        let response: ChatResponse = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        log::debug!(
            "chat round-trip with {} took {:?}",
            self.model,
            started.elapsed()
        );

        Ok(response.message.content)
    }

    async fn probe(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self
            .client
            .get(url)
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                log::debug!("ollama probe failed: {}", e);
                false
            }
        }
    }

    fn model_info(&self) -> String {
        format!("{} @ {}", self.model, self.base_url)
    }
}

/// Rolling in-memory chat history
pub struct Conversation {
    history: Vec<ChatMessage>,
    limit: usize,
}

impl Conversation {
    pub fn new(limit: usize) -> Self {
        Self {
            history: Vec::new(),
            limit: limit.max(2),
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }

    fn push(&mut self, message: ChatMessage) {
        self.history.push(message);
        if self.history.len() > self.limit {
            let excess = self.history.len() - self.limit;
            self.history.drain(..excess);
        }
    }

    /// Add the user's message (after the action context, if any), ask the
    /// model, and record its reply.
    pub async fn send(
        &mut self,
        client: &dyn ChatClient,
        message: &str,
        context: Option<&ActionContext>,
    ) -> Result<String, ChatError> {
        if let Some(context) = context {
            self.push(ChatMessage::new(
                Role::System,
                format!("{}\n\n{}", BEHAVIOR_INSTRUCTIONS, context),
            ));
        }
        self.push(ChatMessage::new(Role::User, message));

        let reply = client.chat(&self.history).await.map_err(|e| {
            log::warn!("chat request failed: {}", e);
            e
        })?;

        self.push(ChatMessage::new(Role::Assistant, reply.clone()));
        Ok(reply)
    }
}
