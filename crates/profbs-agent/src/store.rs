//! In-memory per-chat state: mode flag and a bounded transcript.
//!
//! Each chat gets its own `tokio::sync::Mutex`. The relay holds it for a whole
//! turn (including the completion call), so messages from one chat are
//! processed strictly in order while other chats proceed independently.
//! Nothing survives a restart.

use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use profbs_core::types::{ChatId, ChatMode};

use crate::provider::Message;

/// Mode and recent history for one chat.
#[derive(Debug)]
pub struct ChatState {
    mode: ChatMode,
    transcript: VecDeque<Message>,
    max_turns: usize,
}

impl ChatState {
    fn new(max_turns: usize) -> Self {
        Self {
            mode: ChatMode::default(),
            transcript: VecDeque::new(),
            max_turns,
        }
    }

    pub fn mode(&self) -> ChatMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ChatMode) {
        self.mode = mode;
    }

    /// Oldest turn first.
    pub fn transcript(&self) -> impl Iterator<Item = &Message> {
        self.transcript.iter()
    }

    pub fn transcript_len(&self) -> usize {
        self.transcript.len()
    }

    /// Append a completed user/assistant exchange and evict from the front
    /// until at most `max_turns` remain.
    pub fn record_exchange(&mut self, user: Message, assistant: Message) {
        self.transcript.push_back(user);
        self.transcript.push_back(assistant);

        let mut evicted = 0usize;
        while self.transcript.len() > self.max_turns {
            self.transcript.pop_front();
            evicted += 1;
        }
        if evicted > 0 {
            debug!(evicted, kept = self.transcript.len(), "transcript window trimmed");
        }
    }
}

/// Registry of chat states, shared by every in-flight message.
pub struct ChatStore {
    chats: DashMap<ChatId, Arc<Mutex<ChatState>>>,
    max_turns: usize,
}

impl ChatStore {
    pub fn new(max_turns: usize) -> Self {
        Self {
            chats: DashMap::new(),
            max_turns,
        }
    }

    /// Return the state handle for `id`, creating a default one on first contact.
    ///
    /// The map shard lock is released before returning; only the per-chat
    /// mutex is ever held across an `.await`.
    pub fn chat(&self, id: ChatId) -> Arc<Mutex<ChatState>> {
        let entry = self
            .chats
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(ChatState::new(self.max_turns))));
        Arc::clone(entry.value())
    }

    fn existing(&self, id: ChatId) -> Option<Arc<Mutex<ChatState>>> {
        self.chats.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, id: ChatId) -> bool {
        self.chats.contains_key(&id)
    }

    /// Number of chats seen since startup.
    pub fn len(&self) -> usize {
        self.chats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }

    /// Current mode; chats never seen report the default.
    pub async fn mode(&self, id: ChatId) -> ChatMode {
        match self.existing(id) {
            Some(chat) => {
                let state = chat.lock().await;
                state.mode()
            }
            None => ChatMode::default(),
        }
    }

    pub async fn set_mode(&self, id: ChatId, mode: ChatMode) {
        self.chat(id).lock().await.set_mode(mode);
    }

    pub async fn transcript_len(&self, id: ChatId) -> usize {
        match self.existing(id) {
            Some(chat) => {
                let state = chat.lock().await;
                state.transcript_len()
            }
            None => 0,
        }
    }

    /// Copy of the transcript, oldest first.
    pub async fn transcript(&self, id: ChatId) -> Vec<Message> {
        match self.existing(id) {
            Some(chat) => {
                let state = chat.lock().await;
                let turns: Vec<Message> = state.transcript().cloned().collect();
                turns
            }
            None => Vec::new(),
        }
    }
}
