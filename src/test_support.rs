//! Scripted doubles shared by the session and refresh loop tests.

use async_trait::async_trait;
use futures::channel::mpsc as remote_mpsc;
use futures::sink::SinkExt;
use futures::stream::StreamExt;
use futures::sink::Sink;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use yellowstone_grpc_proto::geyser::{
    SubscribeRequest, SubscribeUpdate, SubscribeUpdatePing, SubscribeUpdateTransaction,
    SubscribeUpdateTransactionInfo,
};
use yellowstone_grpc_proto::prelude::subscribe_update::UpdateOneof;
use yellowstone_grpc_proto::prelude::{TokenBalance, TransactionStatusMeta, UiTokenAmount};

use crate::errors::MonitorError;
use crate::processors::{EventHandler, RawEvent};
use crate::source::{AddressSet, AddressSource};
use crate::streams::{GeyserTransport, RequestSink, TransportChannel};

/// Server side of one opened mock subscription.
pub struct MockRemote {
    pub requests: remote_mpsc::UnboundedReceiver<SubscribeRequest>,
    pub updates: remote_mpsc::UnboundedSender<Result<SubscribeUpdate, MonitorError>>,
}

struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct MockTransport {
    remotes: Mutex<VecDeque<MockRemote>>,
    opened: AtomicUsize,
    live: Arc<AtomicUsize>,
    max_live: AtomicUsize,
    fail_open: AtomicBool,
    reject_requests: AtomicBool,
    stall_close: AtomicBool,
}

impl MockTransport {
    pub fn fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    pub fn reject_requests(&self, reject: bool) {
        self.reject_requests.store(reject, Ordering::SeqCst);
    }

    /// Sinks opened from now on accept requests but never finish closing.
    pub fn stall_close(&self, stall: bool) {
        self.stall_close.store(stall, Ordering::SeqCst);
    }

    pub fn next_remote(&self) -> Option<MockRemote> {
        self.remotes.lock().unwrap().pop_front()
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GeyserTransport for MockTransport {
    async fn open(&self) -> Result<TransportChannel, MonitorError> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(MonitorError::SessionSetup("connection refused".to_string()));
        }

        let (request_tx, request_rx) = remote_mpsc::unbounded::<SubscribeRequest>();
        let (update_tx, update_rx) = remote_mpsc::unbounded();
        if self.reject_requests.load(Ordering::SeqCst) {
            drop(request_rx);
        } else {
            self.remotes.lock().unwrap().push_back(MockRemote {
                requests: request_rx,
                updates: update_tx.clone(),
            });
        }
        drop(update_tx);

        self.opened.fetch_add(1, Ordering::SeqCst);
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(live, Ordering::SeqCst);
        let guard = LiveGuard(Arc::clone(&self.live));

        let sink: RequestSink = if self.stall_close.load(Ordering::SeqCst) {
            Box::pin(StallingSink { requests: request_tx })
        } else {
            Box::pin(request_tx.sink_map_err(|e| MonitorError::Transport(e.to_string())))
        };

        Ok(TransportChannel {
            sink,
            updates: update_rx
                .map(move |update| {
                    let _live = &guard;
                    update
                })
                .boxed(),
        })
    }
}

/// Accepts every request, but `poll_close` never completes.
struct StallingSink {
    requests: remote_mpsc::UnboundedSender<SubscribeRequest>,
}

impl Sink<SubscribeRequest> for StallingSink {
    type Error = MonitorError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, request: SubscribeRequest) -> Result<(), Self::Error> {
        self.requests
            .unbounded_send(request)
            .map_err(|e| MonitorError::Transport(e.to_string()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Pending
    }
}

/// Forwards every handled event to a channel.
pub struct RecordingHandler {
    events: mpsc::UnboundedSender<RawEvent>,
}

impl RecordingHandler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RawEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (Self { events }, receiver)
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn handle(&self, event: RawEvent) -> Result<(), MonitorError> {
        let _ = self.events.send(event);
        Ok(())
    }
}

/// Address source replaying a fixed script, then returning empty sets.
#[derive(Default)]
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<AddressSet, MonitorError>>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<AddressSet, MonitorError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AddressSource for ScriptedSource {
    async fn query_active_addresses(&self) -> Result<AddressSet, MonitorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(AddressSet::new()))
    }
}

pub fn addresses(values: &[&str]) -> AddressSet {
    values.iter().copied().collect()
}

pub fn token_balance(mint: &str, owner: &str, ui_amount: f64) -> TokenBalance {
    TokenBalance {
        account_index: 1,
        mint: mint.to_string(),
        ui_token_amount: Some(UiTokenAmount {
            ui_amount,
            decimals: 6,
            amount: ((ui_amount * 1_000_000.0) as u64).to_string(),
            ui_amount_string: ui_amount.to_string(),
        }),
        owner: owner.to_string(),
        program_id: "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA".to_string(),
    }
}

pub fn transaction_update(slot: u64, balances: &[TokenBalance]) -> SubscribeUpdate {
    SubscribeUpdate {
        update_oneof: Some(UpdateOneof::Transaction(SubscribeUpdateTransaction {
            transaction: Some(SubscribeUpdateTransactionInfo {
                signature: slot.to_le_bytes().to_vec(),
                meta: Some(TransactionStatusMeta {
                    post_token_balances: balances.to_vec(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            slot,
        })),
        ..Default::default()
    }
}

pub fn ping_update() -> SubscribeUpdate {
    SubscribeUpdate {
        update_oneof: Some(UpdateOneof::Ping(SubscribeUpdatePing {})),
        ..Default::default()
    }
}
