use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use profbs_agent::openai::OpenAiProvider;
use profbs_agent::{ChatRelay, ChatStore};
use profbs_core::config::RelayConfig;
use profbs_telegram::TelegramAdapter;

/// Telegram keyword relay bot.
#[derive(Debug, Parser)]
#[command(name = "profbs-bot", version, about)]
struct Cli {
    /// Config file (falls back to $PROFBS_CONFIG, then ~/.profbs/profbs.toml).
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "profbs_bot=info,profbs_agent=info,profbs_telegram=info".into()
            }),
        )
        .init();

    let cli = Cli::parse();

    // load config: --config > PROFBS_CONFIG env > ~/.profbs/profbs.toml.
    // Credentials and the allowed chat id are required, so there is no
    // fallback to defaults here.
    let config_path = cli.config.or_else(|| std::env::var("PROFBS_CONFIG").ok());
    let config = RelayConfig::load(config_path.as_deref())
        .context("failed to load configuration")?;

    info!(
        model = %config.openai.model,
        max_tokens = config.openai.max_tokens,
        timeout_secs = config.openai.timeout_secs,
        allowed_chat_id = config.telegram.allowed_chat_id,
        history_turns = config.history.max_turns,
        "configuration loaded"
    );

    let provider = OpenAiProvider::new(
        config.openai.api_key.clone(),
        Some(config.openai.base_url.clone()),
        Duration::from_secs(config.openai.timeout_secs),
    )
    .context("failed to build OpenAI client")?;
    info!("LLM provider: OpenAI ({})", config.openai.base_url);

    let store = Arc::new(ChatStore::new(config.history.max_turns));
    let relay = Arc::new(ChatRelay::from_config(Box::new(provider), store, &config));

    TelegramAdapter::new(&config.telegram, relay)
        .run()
        .await
        .context("Telegram adapter failed")?;

    info!("profbs-bot shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_accepts_config_flag() {
        let cli = Cli::try_parse_from(["profbs-bot", "--config", "/etc/profbs.toml"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some("/etc/profbs.toml"));

        let cli = Cli::try_parse_from(["profbs-bot"]).unwrap();
        assert!(cli.config.is_none());
    }
}
