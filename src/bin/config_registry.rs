// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration registry server binary

use clap::Parser;
use config_registry::server::{self, Cli, ServerSettings};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let settings = ServerSettings::load(&cli)?;

    tracing::info!(
        backend = %settings.backend,
        listen = %settings.listen_addr,
        "Starting config-registry"
    );

    if let Err(e) = server::serve(settings).await {
        tracing::error!(error = %e, "Server terminated with an error");
        return Err(e.into());
    }
    Ok(())
}
