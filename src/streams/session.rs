use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use yellowstone_grpc_proto::geyser::{SubscribeRequest, SubscribeRequestPing};
use yellowstone_grpc_proto::prelude::subscribe_update::UpdateOneof;

use crate::errors::MonitorError;
use crate::processors::{drive_events, EventHandler, EventStream, RawEvent};
use crate::streams::{GeyserTransport, RequestSink, SubscriptionFilter, TransportChannel, UpdateStream};

/// 会话结束的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// 服务端正常结束了推送流
    Ended,
    /// 被新的订阅替换或被主动关闭
    Superseded,
    /// 传输层错误
    Failed(String),
    /// 关闭超时，任务被强制中止
    Aborted,
}

struct LiveSession {
    id: u64,
    shutdown: Option<oneshot::Sender<()>>,
    pump: JoinHandle<SessionOutcome>,
}

/// Completion side of a session. Resolves only after the transport has been closed.
pub struct SessionHandle {
    id: u64,
    completion: watch::Receiver<Option<SessionOutcome>>,
}

impl SessionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub async fn await_completion(&mut self) -> SessionOutcome {
        let outcome = match self.completion.wait_for(Option::is_some).await {
            Ok(outcome) => (*outcome).clone(),
            Err(_) => None,
        };
        outcome.unwrap_or(SessionOutcome::Aborted)
    }
}

/// 订阅会话管理器
///
/// Owns at most one live subscription. A new session is only opened after the
/// previous one has been shut down and its pump task has returned, so two
/// subscriptions never deliver events at the same time.
pub struct SessionManager {
    transport: Arc<dyn GeyserTransport>,
    handler: Arc<dyn EventHandler>,
    teardown_timeout: Duration,
    current: Option<LiveSession>,
    next_id: u64,
}

impl SessionManager {
    pub fn new(
        transport: Arc<dyn GeyserTransport>,
        handler: Arc<dyn EventHandler>,
        teardown_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            handler,
            teardown_timeout,
            current: None,
            next_id: 1,
        }
    }

    pub fn has_live_session(&self) -> bool {
        self.current
            .as_ref()
            .map_or(false, |session| !session.pump.is_finished())
    }

    /// Replaces the current subscription with one using `filter`.
    ///
    /// Identical filters are not short-circuited: the old session is always
    /// closed and a new one opened.
    pub async fn reconfigure(&mut self, filter: &SubscriptionFilter) -> Result<SessionHandle, MonitorError> {
        self.terminate_current().await?;

        let TransportChannel { mut sink, updates } = self
            .transport
            .open()
            .await
            .map_err(|e| match e {
                MonitorError::SessionSetup(_) => e,
                other => MonitorError::SessionSetup(other.to_string()),
            })?;

        if let Err(e) = sink.send(filter.to_request()).await {
            error!("Failed to send subscribe request: {}", e);
            if let Err(close_err) = sink.close().await {
                debug!("Closing rejected subscription: {}", close_err);
            }
            return Err(MonitorError::SessionSetup(format!("Failed to send subscribe request: {}", e)));
        }

        let id = self.next_id;
        self.next_id += 1;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (completion_tx, completion_rx) = watch::channel(None);
        let (events_tx, events) = EventStream::channel();

        let pump = tokio::spawn(pump_updates(id, sink, updates, events_tx, shutdown_rx, completion_tx));
        tokio::spawn(drive_events(events, Arc::clone(&self.handler)));

        info!("✅ Stream #{} opened with {} transaction filter(s)", id, filter.transactions().len());
        self.current = Some(LiveSession {
            id,
            shutdown: Some(shutdown_tx),
            pump,
        });

        Ok(SessionHandle {
            id,
            completion: completion_rx,
        })
    }

    /// Closes the live session, if any, and waits for the transport to close.
    pub async fn shutdown(&mut self) -> Result<(), MonitorError> {
        self.terminate_current().await.map(|_| ())
    }

    async fn terminate_current(&mut self) -> Result<Option<SessionOutcome>, MonitorError> {
        let Some(mut session) = self.current.take() else {
            return Ok(None);
        };

        if !session.pump.is_finished() {
            info!("Stopping existing stream #{}...", session.id);
        }
        if let Some(shutdown) = session.shutdown.take() {
            // 接收端已关闭说明会话已经自行结束
            let _ = shutdown.send(());
        }

        match tokio::time::timeout(self.teardown_timeout, &mut session.pump).await {
            Ok(Ok(outcome)) => {
                debug!("Stream #{} terminated: {:?}", session.id, outcome);
                Ok(Some(outcome))
            }
            Ok(Err(e)) => Err(MonitorError::SessionTeardown(format!(
                "stream #{} task failed: {}",
                session.id, e
            ))),
            Err(_) => {
                warn!(
                    "Stream #{} did not close within {}ms, aborting",
                    session.id,
                    self.teardown_timeout.as_millis()
                );
                session.pump.abort();
                // 等待中止完成，确保传输已被释放
                let _ = session.pump.await;
                Err(MonitorError::SessionTeardown(format!(
                    "stream #{} did not close within {}ms",
                    session.id,
                    self.teardown_timeout.as_millis()
                )))
            }
        }
    }
}

async fn pump_updates(
    id: u64,
    mut sink: RequestSink,
    mut updates: UpdateStream,
    events: mpsc::UnboundedSender<RawEvent>,
    mut shutdown: oneshot::Receiver<()>,
    completion: watch::Sender<Option<SessionOutcome>>,
) -> SessionOutcome {
    let mut transactions_processed = 0u64;

    let outcome = loop {
        tokio::select! {
            _ = &mut shutdown => break SessionOutcome::Superseded,
            message = updates.next() => match message {
                Some(Ok(msg)) => match msg.update_oneof {
                    Some(UpdateOneof::Transaction(update)) => {
                        let Some(event) = RawEvent::from_update(&update) else {
                            debug!("Transaction update without payload at slot {}", update.slot);
                            continue;
                        };

                        transactions_processed += 1;
                        if transactions_processed % 500 == 0 {
                            info!("📊 Stream #{}: {} transactions processed", id, transactions_processed);
                        }

                        if events.send(event).is_err() {
                            warn!("Stream #{}: event consumer is gone, dropping update", id);
                        }
                    }
                    Some(UpdateOneof::Ping(_)) => {
                        if let Err(e) = sink
                            .send(SubscribeRequest {
                                ping: Some(SubscribeRequestPing { id: 1 }),
                                ..Default::default()
                            })
                            .await
                        {
                            error!("Failed to send pong: {}", e);
                        }
                    }
                    Some(UpdateOneof::Pong(_)) => {
                        debug!("Received pong from server");
                    }
                    None => {
                        error!("Update not found in the message");
                        break SessionOutcome::Failed("update not found in the message".to_string());
                    }
                    _ => {
                        debug!("Received other update type");
                    }
                },
                Some(Err(e)) => {
                    error!("Stream error: {}", e);
                    break SessionOutcome::Failed(e.to_string());
                }
                None => {
                    info!("Stream ended.");
                    break SessionOutcome::Ended;
                }
            },
        }
    };

    if let Err(e) = sink.close().await {
        debug!("Stream #{} close: {}", id, e);
    }
    drop(updates);
    info!("Stream #{} closed.", id);

    completion.send_replace(Some(outcome.clone()));
    outcome
}
