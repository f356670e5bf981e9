//! prism-guard daemon: runs the interception engine until Ctrl-C.

use tracing_subscriber::EnvFilter;

use prism_guard::application::Engine;
use prism_guard::config::{EngineConfig, LoggingConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = EngineConfig::load_validated()?;
    init_tracing(&config.logging)?;

    let engine = Engine::new(config)?;
    engine.start()?;
    tracing::info!("prism-guard running, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    engine.shutdown().await;
    Ok(())
}

/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => logging.env_filter()?,
    };
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}
