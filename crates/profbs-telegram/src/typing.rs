//! "typing…" indicator shown while a completion is in flight.

use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::ChatAction;

/// Telegram clears the status after ~5s.
const TYPING_REFRESH: Duration = Duration::from_secs(4);

/// Background typing loop for one chat. Aborted when dropped.
pub struct TypingHandle(tokio::task::JoinHandle<()>);

impl TypingHandle {
    pub fn start(bot: Bot, chat_id: ChatId) -> Self {
        let handle = tokio::spawn(async move {
            loop {
                let _ = bot.send_chat_action(chat_id, ChatAction::Typing).await;
                tokio::time::sleep(TYPING_REFRESH).await;
            }
        });
        TypingHandle(handle)
    }
}

impl Drop for TypingHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}
