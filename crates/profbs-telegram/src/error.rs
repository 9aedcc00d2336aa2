/// Errors that stop the Telegram adapter before polling starts.
#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    /// `getMe` or another startup request failed (bad token, no network).
    #[error("Telegram API request failed: {0}")]
    Request(#[from] teloxide::RequestError),

    #[error("telegram.bot_token is empty")]
    NoToken,
}
