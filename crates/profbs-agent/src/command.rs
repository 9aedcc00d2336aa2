//! Admin control phrases, intercepted before the completion API.
//!
//! The whole message must equal a phrase (case-insensitive, surrounding
//! whitespace ignored). Anything else goes to the model.

use profbs_core::types::ChatMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCommand {
    /// Switch the chat to free conversation.
    FreeChat,
    /// Switch the chat back to keyword extraction.
    KeywordMode,
}

/// Recognized phrases, already lower-cased.
const PHRASES: &[(&str, AdminCommand)] = &[
    ("profbs admin", AdminCommand::FreeChat),
    ("profbs admin start", AdminCommand::KeywordMode),
];

impl AdminCommand {
    /// Returns `Some(cmd)` if `text` is exactly one of the control phrases.
    pub fn parse(text: &str) -> Option<Self> {
        let normalized = text.trim().to_lowercase();
        PHRASES
            .iter()
            .find(|(phrase, _)| *phrase == normalized)
            .map(|(_, cmd)| *cmd)
    }

    pub fn phrase(self) -> &'static str {
        PHRASES
            .iter()
            .find(|(_, cmd)| *cmd == self)
            .map(|(phrase, _)| *phrase)
            .unwrap_or_default()
    }

    /// Mode the chat ends up in after this command.
    pub fn target_mode(self) -> ChatMode {
        match self {
            AdminCommand::FreeChat => ChatMode::Free,
            AdminCommand::KeywordMode => ChatMode::Keyword,
        }
    }

    /// Reply sent back to the chat.
    pub fn confirmation(self) -> &'static str {
        match self {
            AdminCommand::FreeChat => "🔓 Бот переведен в обычный режим GPT.",
            AdminCommand::KeywordMode => "🎯 Бот снова в режиме подбора ключевых слов.",
        }
    }
}
