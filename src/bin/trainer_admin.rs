use anyhow::Result;
use clap::Parser;
use trainer_directory::admin_cli::{handle_admin_command, AdminCli};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("trainer_directory=info")),
        )
        .init();

    handle_admin_command(AdminCli::parse()).await
}
