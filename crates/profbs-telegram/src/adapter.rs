//! Telegram channel adapter.
//!
//! Wraps a teloxide `Bot` + `Dispatcher` and drives the long-polling event loop
//! until the process exits or receives Ctrl-C.

use std::sync::Arc;

use teloxide::prelude::*;
use tracing::info;

use profbs_agent::InboundHandler;
use profbs_core::config::TelegramConfig;

use crate::error::TelegramError;
use crate::handler::handle_message;

/// Telegram channel adapter.
///
/// Long polling, no public URL required. The dispatcher processes updates of
/// one chat sequentially and different chats concurrently, so a slow
/// completion for one chat never delays another.
pub struct TelegramAdapter<H: InboundHandler + 'static> {
    handler: Arc<H>,
    config: TelegramConfig,
}

impl<H: InboundHandler + 'static> TelegramAdapter<H> {
    pub fn new(config: &TelegramConfig, handler: Arc<H>) -> Self {
        Self {
            handler,
            config: config.clone(),
        }
    }

    /// Verify the bot token, then drive the long-polling loop.
    ///
    /// Returns `Err` only when the startup check fails (bad token, no network);
    /// once polling starts it runs until shutdown.
    pub async fn run(self) -> Result<(), TelegramError> {
        if self.config.bot_token.trim().is_empty() {
            return Err(TelegramError::NoToken);
        }

        let bot = Bot::new(&self.config.bot_token);

        let me = bot.get_me().await?;
        info!(
            bot = %me.user.username.as_deref().unwrap_or("unknown"),
            allowed_chat_id = self.config.allowed_chat_id,
            "Telegram: starting long-polling dispatcher"
        );

        let handler = Update::filter_message().endpoint(handle_message::<H>);

        Dispatcher::builder(bot, handler)
            .dependencies(dptree::deps![self.handler])
            .default_handler(|_upd| async {})
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        info!("Telegram: dispatcher stopped");
        Ok(())
    }
}
