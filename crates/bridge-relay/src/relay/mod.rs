//! Relay setup
//!
//! Wires the bridge client, command table, event router and chat sink
//! together and runs them until shutdown.

mod state;

pub use state::Relay;

use crate::commands::CommandRegistry;
use crate::sink::{ChatSink, TracingSink};
use bridge_client::{BridgeClient, BridgeError};
use bridge_common::{AppConfig, AppError, AppResult};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

/// Build the relay from configuration
pub fn create_relay(config: &AppConfig, sink: Arc<dyn ChatSink>) -> Relay {
    let client = BridgeClient::new(config.bridge.addr.clone(), config.bridge.options.clone());
    Relay::new(
        Arc::new(client),
        CommandRegistry::with_builtins(),
        sink,
        config.relay.clone(),
    )
}

/// Read operator lines from `input` until EOF, writing replies to `output`.
///
/// Command failures are reported and the loop continues; it stops early only
/// once the bridge client is closed.
pub async fn operator_loop<R, W>(relay: &Relay, input: R, mut output: W) -> AppResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await.map_err(AppError::internal)? {
        let reply = match relay.handle_input(&line).await {
            Ok(Some(text)) => text,
            Ok(None) => continue,
            Err(AppError::Bridge(BridgeError::Closed)) => {
                tracing::info!("Bridge closed, stopping operator input");
                break;
            }
            Err(e) => {
                tracing::debug!(error = %e, code = e.error_code(), "Operator command failed");
                format!("error [{}]: {e}", e.error_code())
            }
        };

        output
            .write_all(format!("{}\n", reply.trim_end()).as_bytes())
            .await
            .map_err(AppError::internal)?;
        output.flush().await.map_err(AppError::internal)?;
    }

    Ok(())
}

/// Run the relay with configuration until Ctrl-C or end of input
pub async fn run(config: AppConfig) -> AppResult<()> {
    let relay = create_relay(&config, Arc::new(TracingSink));
    let shutdown = CancellationToken::new();

    tracing::info!(addr = %config.bridge.addr, "Starting bridge client");
    relay.client().start(shutdown.child_token());

    let router = tokio::spawn(
        relay
            .event_router()
            .run(relay.client().subscribe(0), shutdown.clone()),
    );

    let stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = operator_loop(&relay, stdin, tokio::io::stdout()) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Operator input failed");
            }
            tracing::info!("Operator input closed");
        }
        () = shutdown_signal() => {
            tracing::info!("Shutdown signal received");
        }
    }

    relay.client().close().await?;
    shutdown.cancel();
    if let Err(e) = router.await {
        tracing::warn!(error = %e, "Event router task failed");
    }

    tracing::info!("Relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
