//! DAI Listener binary.
//!
//! Watches DAI runs of one group and imports finished directed runs into XRAY.

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dai_listener::{Listener, ListenerConfig};

/// Initialize tracing/logging. `DAI_LISTENER_LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let json = std::env::var("DAI_LISTENER_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,dai_listener=debug".into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    tracing::info!("Starting DAI Listener");

    // Load configuration
    let config = ListenerConfig::from_env()?;
    tracing::info!(
        dai_url = %config.dai_url,
        group = %config.dai_group,
        xray_url = %config.xray_url,
        mapping = %config.mapping_path.display(),
        "Listener configuration loaded"
    );

    // Create listener
    let listener = match Listener::new(config).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(kind = e.kind(), error = %e, "Listener startup failed");
            return Err(e.into());
        }
    };

    // Handle shutdown signals
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install CTRL+C handler");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    };

    tokio::select! {
        _ = listener.run() => {}
        _ = shutdown => {
            tracing::info!("Shutting down listener");
        }
    }

    let interrupted = listener.shutdown();
    tracing::info!(interrupted = interrupted.len(), "Listener stopped");
    Ok(())
}
