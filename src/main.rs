use anyhow::{Context, Result};
use std::fs::OpenOptions;
use trainer_directory::app_log;
use trainer_directory::{start_web_server, AppContext, ConfigManager};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE_ENV: &str = "TRAINER_LOG_FILE";
const DEFAULT_LOG_FILE: &str = "/tmp/trainer-directory.log";

#[tokio::main]
async fn main() -> Result<()> {
    let log_path = std::env::var(LOG_FILE_ENV).unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path))?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .json()
                .with_writer(file)
                .with_current_span(false)
                .with_span_list(false),
        )
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("trainer_directory=info,rocket::server=off")),
        )
        .init();

    let config = ConfigManager::load()?;
    config.ensure_directories().await?;

    app_log!(info, "Environment: {}", config.environment);
    app_log!(info, "Site: {} ({})", config.settings.site.name, config.settings.site.url);

    let ctx = AppContext::build(config).await?;
    start_web_server(ctx).await
}
