use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use log::{debug, error, warn};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::errors::MonitorError;
use crate::processors::RawEvent;

/// 单个事件的处理器，每个事件相互独立
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle(&self, event: RawEvent) -> Result<(), MonitorError>;
}

/// Lazy sequence of events produced by one session. Ends when the session ends;
/// cannot be restarted.
pub struct EventStream {
    inner: UnboundedReceiverStream<RawEvent>,
}

impl EventStream {
    pub fn channel() -> (mpsc::UnboundedSender<RawEvent>, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (sender, Self { inner: UnboundedReceiverStream::new(receiver) })
    }
}

impl Stream for EventStream {
    type Item = RawEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// 驱动事件流：每个事件在独立任务中处理，处理失败只记录日志
///
/// Returns the number of events dispatched once the stream has ended and every
/// in-flight event has finished.
pub async fn drive_events<S>(mut events: S, handler: Arc<dyn EventHandler>) -> usize
where
    S: Stream<Item = RawEvent> + Unpin,
{
    let mut in_flight = JoinSet::new();
    let mut dispatched = 0usize;

    loop {
        tokio::select! {
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    error!("Event task aborted: {}", e);
                }
            }
            next = events.next() => match next {
                Some(event) => {
                    dispatched += 1;
                    let handler = Arc::clone(&handler);
                    in_flight.spawn(async move {
                        let signature = event.signature.clone();
                        if let Err(e) = handler.handle(event).await {
                            warn!("Error processing stream data ({}): {}", signature, e);
                        }
                    });
                }
                None => break,
            },
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            error!("Event task aborted: {}", e);
        }
    }

    debug!("Event stream drained after {} events", dispatched);
    dispatched
}
