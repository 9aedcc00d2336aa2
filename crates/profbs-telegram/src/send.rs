//! Message sending helpers for the Telegram adapter.
//!
//! Telegram's message limit is 4096 UTF-16 code units. We measure in those
//! units and use 4090 for safety; every split happens on a char boundary, so
//! Cyrillic and emoji are never cut in half.

use std::time::Duration;

use teloxide::prelude::*;
use tracing::warn;

/// Maximum UTF-16 code units per Telegram message.
const CHUNK_MAX: usize = 4090;

/// Length as Telegram counts it.
fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Split `text` into chunks of at most `CHUNK_MAX` UTF-16 units.
///
/// Prefers line boundaries. A single line longer than the limit is broken at
/// the last space or `/` inside the window, or hard-cut if there is none.
pub fn split_chunks(text: &str) -> Vec<String> {
    if utf16_len(text) <= CHUNK_MAX {
        return vec![text.to_string()];
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for line in text.split('\n') {
        let line_len = utf16_len(line);
        let cost = if current.is_empty() {
            line_len
        } else {
            1 + line_len
        };

        if !current.is_empty() && current_len + cost > CHUNK_MAX {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks.into_iter().flat_map(force_split).collect()
}

/// Break an over-long chunk into pieces that fit.
fn force_split(chunk: String) -> Vec<String> {
    if utf16_len(&chunk) <= CHUNK_MAX {
        return vec![chunk];
    }

    let chars: Vec<char> = chunk.chars().collect();
    let mut out = Vec::new();
    let mut start = 0usize;
    loop {
        // Widest window starting at `start` that fits.
        let mut end = start;
        let mut units = 0usize;
        while end < chars.len() && units + chars[end].len_utf16() <= CHUNK_MAX {
            units += chars[end].len_utf16();
            end += 1;
        }
        if end == chars.len() {
            break;
        }

        let window = &chars[start..end];
        let cut = window
            .iter()
            .rposition(|c| c.is_whitespace() || *c == '/')
            .filter(|&i| i > 0)
            .map(|i| i + 1)
            .unwrap_or(window.len());

        let piece: String = window[..cut].iter().collect();
        out.push(piece.trim_end().to_string());

        start += cut;
        while start < chars.len() && chars[start].is_whitespace() {
            start += 1;
        }
    }
    if start < chars.len() {
        out.push(chars[start..].iter().collect());
    }
    out
}

/// Send `text` to `chat_id` as plain text, chunked.
///
/// Empty replies are skipped (Telegram rejects them). A 100ms delay is
/// inserted between consecutive chunks to stay under flood limits.
pub async fn send_response(bot: &Bot, chat_id: ChatId, text: &str) {
    if text.trim().is_empty() {
        warn!(chat_id = chat_id.0, "Telegram: empty reply, nothing sent");
        return;
    }

    let chunks = split_chunks(text);
    for (i, chunk) in chunks.iter().enumerate() {
        if let Err(e) = bot.send_message(chat_id, chunk).await {
            warn!(error = %e, chat_id = chat_id.0, chunk_index = i, "Telegram: send failed");
        }

        if i + 1 < chunks.len() {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
