use crate::auth::{CredentialError, ExpectedCredentials};
use crate::config::{load_config, Config, ConfigError, SinkType};
use crate::server::{start_server, IngestState};
use crate::sink::{DeliveryStream, FirehoseClient, MemoryDeliveryStream, SinkError};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("credential error: {0}")]
    Credentials(#[from] CredentialError),

    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("invalid listen address '{0}'")]
    ListenAddress(String),

    #[error("web server error: {0}")]
    WebServer(#[from] std::io::Error),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub async fn run(config_path: &Path) -> Result<(), RunError> {
    info!(config_path = %config_path.display(), "Loading configuration");
    let config = load_config(config_path)?;

    let state = Arc::new(build_state(&config)?);
    let listen_addr: SocketAddr = config
        .server
        .listen
        .parse()
        .map_err(|_| RunError::ListenAddress(config.server.listen.clone()))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut server_handle = tokio::spawn(start_server(listen_addr, state, shutdown_rx));

    info!("Ingestion service started, press Ctrl+C to shutdown");

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
        result = &mut server_handle => {
            // Server exited on its own, usually a bind failure
            return match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => {
                    error!(error = %e, "HTTP server error");
                    Err(e.into())
                }
                Err(e) => Err(e.into()),
            };
        }
    }

    server_handle.await??;
    info!("Shutdown complete");
    Ok(())
}

/// Resolve credentials and the sink once, before the listener is bound.
pub fn build_state(config: &Config) -> Result<IngestState, RunError> {
    let credentials = config.auth.credential_source().load()?;
    let credentials = ExpectedCredentials::from(credentials);
    info!(username = %credentials.username(), "Loaded push credentials");

    let sink: Arc<dyn DeliveryStream> = match config.sink.sink_type {
        SinkType::Firehose => {
            let endpoint = config.sink.endpoint.as_deref().unwrap_or_default();
            info!(
                endpoint = %endpoint,
                stream = %config.sink.stream_name,
                "Using Firehose delivery stream"
            );
            Arc::new(FirehoseClient::new(endpoint, config.sink.timeout)?)
        }
        SinkType::Memory => {
            warn!("Using in-memory sink, records will not leave this process");
            Arc::new(MemoryDeliveryStream::new())
        }
    };

    Ok(IngestState {
        sink,
        stream_name: config.sink.stream_name.clone(),
        credentials,
        limits: config.batch,
        max_body_bytes: config.server.max_body_bytes,
        max_decompressed_bytes: config.server.max_decompressed_bytes,
    })
}
