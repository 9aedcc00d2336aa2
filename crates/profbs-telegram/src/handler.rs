//! Telegram message handler registered in the teloxide Dispatcher.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{MessageEntity, MessageEntityKind};
use tracing::debug;

use profbs_agent::InboundHandler;

use crate::send;
use crate::typing::TypingHandle;

/// Main message handler registered in the teloxide Dispatcher.
///
/// Runs for every incoming `Message`. Performs:
/// 1. Bot-message filter
/// 2. Text-only filter (stickers, photos, service messages are ignored)
/// 3. Bot-command filter (`/start` and friends are not relayed; a keyword
///    line that merely starts with `/` is)
/// 4. Relay call with a typing indicator
/// 5. Chunked reply
pub async fn handle_message<H: InboundHandler + 'static>(
    bot: Bot,
    msg: Message,
    handler: Arc<H>,
) -> ResponseResult<()> {
    // 1. Ignore messages from other bots.
    if msg.from.as_ref().map(|u| u.is_bot).unwrap_or(false) {
        return Ok(());
    }

    // 2. Only plain text is relayed.
    let Some(text) = msg.text() else {
        return Ok(());
    };

    // 3. Commands are not part of the conversation.
    if starts_with_bot_command(msg.entities()) {
        debug!(chat_id = msg.chat.id.0, "Telegram: ignoring bot command");
        return Ok(());
    }

    let chat_id = msg.chat.id;

    // 4. Relay, with a typing indicator while the completion is in flight.
    let typing = TypingHandle::start(bot.clone(), chat_id);
    let reply = handler
        .handle_inbound(profbs_core::types::ChatId(chat_id.0), text)
        .await;
    drop(typing);

    // 5. Deliver.
    send::send_response(&bot, chat_id, &reply).await;

    Ok(())
}

/// `true` when Telegram tagged the start of the text as a bot command.
///
/// Telegram only emits that entity for `/[A-Za-z0-9_]+`, so slash-joined
/// keyword lines such as `/наушники/для/спорта` are still relayed.
fn starts_with_bot_command(entities: Option<&[MessageEntity]>) -> bool {
    entities
        .unwrap_or_default()
        .iter()
        .any(|e| matches!(e.kind, MessageEntityKind::BotCommand) && e.offset == 0)
}
