//! Bridge relay entry point
//!
//! Run with:
//! ```bash
//! BRIDGE_ADDR=127.0.0.1:26644 cargo run -p bridge-relay
//! ```
//!
//! Configuration is loaded from environment variables.

use bridge_common::{try_init_tracing_with_config, AppConfig, AppError};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Configuration first: it decides the log format
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(AppError::from(e).exit_code());
        }
    };

    if let Err(e) = try_init_tracing_with_config(config.tracing_config()) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        app = %config.app.name,
        env = ?config.app.env,
        addr = %config.bridge.addr,
        "Configuration loaded"
    );

    if let Err(e) = bridge_relay::run(config).await {
        error!(error = %e, code = e.error_code(), "Relay failed");
        std::process::exit(e.exit_code());
    }
}
