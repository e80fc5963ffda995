use anyhow::Result;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use log::info;
use std::time::Duration;
use tonic::transport::ClientTlsConfig;
use yellowstone_grpc_client::GeyserGrpcClient;

use crate::config::StreamShyftConfig;
use crate::errors::MonitorError;
use crate::streams::{GeyserTransport, TransportChannel};

/// Shyft Yellowstone gRPC 传输层，每次 `open` 都建立一条新连接
pub struct ShyftTransport {
    config: StreamShyftConfig,
}

impl ShyftTransport {
    pub fn new(config: StreamShyftConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl GeyserTransport for ShyftTransport {
    async fn open(&self) -> Result<TransportChannel, MonitorError> {
        let mut client = connect_client(&self.config)
            .await
            .map_err(|e| MonitorError::SessionSetup(format!("Failed to connect to {}: {}", self.config.endpoint, e)))?;
        info!("Connected to Shyft gRPC");

        let (subscribe_tx, stream) = client
            .subscribe()
            .await
            .map_err(|e| MonitorError::SessionSetup(format!("Failed to open subscription: {}", e)))?;

        Ok(TransportChannel {
            sink: Box::pin(subscribe_tx.sink_map_err(|e| MonitorError::Transport(e.to_string()))),
            updates: stream
                .map(|message| message.map_err(|status| MonitorError::Transport(status.to_string())))
                .boxed(),
        })
    }
}

/// Create a gRPC client connection from config
async fn connect_client(config: &StreamShyftConfig) -> Result<GeyserGrpcClient<impl yellowstone_grpc_client::Interceptor>> {
    GeyserGrpcClient::build_from_shared(config.endpoint.clone())?
        .x_token(Some(config.x_token.clone()))?
        .connect_timeout(Duration::from_secs(config.timeout_seconds))
        .timeout(Duration::from_secs(config.timeout_seconds))
        .tls_config(ClientTlsConfig::new().with_native_roots())?
        .max_decoding_message_size(1024 * 1024 * 1024)  // 1GB max
        .connect()
        .await
        .map_err(Into::into)
}
