use std::env;

use anyhow::Context;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{layer::SubscriberExt, Layer, Registry};

use crate::config::{LoggingSettings, Settings, DEFAULT_CONFIG_PATH};
use crate::discord::bot::DiscordBot;

mod config;
mod discord;
mod error;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config_path = env::var("MODOCO_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let settings = Settings::load(&config_path).with_context(|| format!("Failed to load {config_path}"))?;

    let (_file_guard, _stdout_guard) = init_logging(&settings.logging, settings.logging.level_filter()?);
    tracing::info!("Loaded settings from {}", config_path);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let mut discord_bot = DiscordBot::new(settings).await?;
        discord_bot.run_bot().await
    })?;

    Ok(())
}

fn init_logging(settings: &LoggingSettings, level: LevelFilter) -> (tracing_appender::non_blocking::WorkerGuard, tracing_appender::non_blocking::WorkerGuard) {
    let file_appender = tracing_appender::rolling::hourly(&settings.directory, "rolling.log");
    let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::Layer::new()
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(non_blocking)
        .with_filter(level);

    let (non_blocking, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let stdout_layer = tracing_subscriber::fmt::Layer::new()
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false)
        .with_writer(non_blocking)
        .with_filter(level);

    Registry::default().with(file_layer).with(stdout_layer).init();

    (file_guard, stdout_guard)
}
