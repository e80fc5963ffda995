use async_trait::async_trait;
use futures::sink::Sink;
use futures::stream::BoxStream;
use std::pin::Pin;
use yellowstone_grpc_proto::geyser::{SubscribeRequest, SubscribeUpdate};

use crate::errors::MonitorError;

pub type RequestSink = Pin<Box<dyn Sink<SubscribeRequest, Error = MonitorError> + Send>>;
pub type UpdateStream = BoxStream<'static, Result<SubscribeUpdate, MonitorError>>;

/// 一条双向订阅连接：请求写入端 + 更新推送流
pub struct TransportChannel {
    pub sink: RequestSink,
    pub updates: UpdateStream,
}

#[async_trait]
pub trait GeyserTransport: Send + Sync + 'static {
    /// Opens a fresh bidirectional subscription; nothing is sent yet.
    async fn open(&self) -> Result<TransportChannel, MonitorError>;
}
