//! Chat relay: turns one inbound chat message into one reply string.
//!
//! Order of checks for every message:
//! 1. Allowed-chat gate (no state is touched for strangers)
//! 2. Admin phrase interception (mode toggle, no API call)
//! 3. Completion round trip with the mode's system prompt and the chat transcript
//! 4. Keyword normalization (keyword mode only)
//!
//! A failed round trip leaves the transcript exactly as it was.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use profbs_core::config::RelayConfig;
use profbs_core::types::{ChatId, ChatMode};

use crate::command::AdminCommand;
use crate::normalize::format_keywords;
use crate::prompt::system_prompt;
use crate::provider::{ChatRequest, LlmProvider, Message, ProviderError};
use crate::store::ChatStore;

/// Reply for chats other than the configured one.
pub const ACCESS_DENIED: &str = "⛔ У вас нет доступа к этому боту.";

/// Interface the channel adapter drives: one text in, one text out.
#[async_trait]
pub trait InboundHandler: Send + Sync {
    async fn handle_inbound(&self, chat_id: ChatId, text: &str) -> String;
}

pub struct ChatRelay {
    provider: Box<dyn LlmProvider>,
    store: Arc<ChatStore>,
    allowed_chat_id: ChatId,
    model: String,
    max_tokens: u32,
}

impl ChatRelay {
    pub fn new(
        provider: Box<dyn LlmProvider>,
        store: Arc<ChatStore>,
        allowed_chat_id: ChatId,
        model: String,
        max_tokens: u32,
    ) -> Self {
        Self {
            provider,
            store,
            allowed_chat_id,
            model,
            max_tokens,
        }
    }

    /// Wire a relay from loaded config. The store is built by the caller so it
    /// can be shared or inspected.
    pub fn from_config(
        provider: Box<dyn LlmProvider>,
        store: Arc<ChatStore>,
        config: &RelayConfig,
    ) -> Self {
        Self::new(
            provider,
            store,
            ChatId(config.telegram.allowed_chat_id),
            config.openai.model.clone(),
            config.openai.max_tokens,
        )
    }

    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    /// Process one inbound message and produce the reply.
    pub async fn handle_inbound(&self, chat_id: ChatId, text: &str) -> String {
        if chat_id != self.allowed_chat_id {
            warn!(chat_id = %chat_id, "relay: rejected message from unauthorized chat");
            return ACCESS_DENIED.to_string();
        }

        let text = text.trim();

        if let Some(cmd) = AdminCommand::parse(text) {
            let mode = cmd.target_mode();
            self.store.set_mode(chat_id, mode).await;
            info!(chat_id = %chat_id, mode = %mode, "relay: mode switched");
            return cmd.confirmation().to_string();
        }

        // Held until the turn is recorded: same-chat messages run one at a time.
        let chat = self.store.chat(chat_id);
        let mut state = chat.lock().await;
        let mode = state.mode();

        let user_turn = Message::user(text);
        let mut messages: Vec<Message> = state.transcript().cloned().collect();
        messages.push(user_turn.clone());

        let request = ChatRequest {
            model: self.model.clone(),
            system: system_prompt(mode).to_string(),
            messages,
            max_tokens: self.max_tokens,
        };

        match self.provider.send(&request).await {
            Ok(resp) => {
                info!(
                    chat_id = %chat_id,
                    mode = %mode,
                    tokens_in = resp.tokens_in,
                    tokens_out = resp.tokens_out,
                    model = %resp.model,
                    stop_reason = %resp.stop_reason,
                    "relay: completion received"
                );
                let reply = match mode {
                    ChatMode::Keyword => format_keywords(&resp.content),
                    ChatMode::Free => resp.content,
                };
                state.record_exchange(user_turn, Message::assistant(reply.clone()));
                reply
            }
            Err(e) => {
                warn!(
                    chat_id = %chat_id,
                    provider = %self.provider.name(),
                    error = %e,
                    "relay: completion failed"
                );
                failure_reply(&e)
            }
        }
    }
}

#[async_trait]
impl InboundHandler for ChatRelay {
    async fn handle_inbound(&self, chat_id: ChatId, text: &str) -> String {
        ChatRelay::handle_inbound(self, chat_id, text).await
    }
}

/// User-facing text for a failed completion.
///
/// Responses that arrived but lack the expected shape quote the body;
/// everything else (transport, timeout, bad JSON) quotes the error.
pub fn failure_reply(err: &ProviderError) -> String {
    match err {
        ProviderError::MissingChoice { body } => format!("Ошибка API: {body}"),
        ProviderError::Api { message, .. } => format!("Ошибка API: {message}"),
        other => format!("Ошибка: {other}"),
    }
}
