use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::config::AppConfig;
use crate::errors::MonitorError;
use crate::source::AddressSource;
use crate::streams::{Commitment, SessionManager, SessionOutcome, SubscriptionFilter};

/// 刷新循环参数
#[derive(Debug, Clone)]
pub struct RefreshSettings {
    pub interval: Duration,
    /// `None` waits until the transport ends the session.
    pub session_window: Option<Duration>,
    pub filter_name: String,
    pub commitment: Commitment,
}

impl RefreshSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, MonitorError> {
        Ok(Self {
            interval: config.refresh_interval(),
            session_window: config.session_window(),
            filter_name: config.refresh.filter_name.clone(),
            commitment: config.commitment()?,
        })
    }
}

/// 单次刷新的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// 没有活跃地址，保留上一次的会话
    Skipped,
    Completed(SessionOutcome),
    /// 会话仍在运行，下一次刷新会替换它
    WindowElapsed,
    Failed(String),
}

pub struct RefreshLoop {
    source: Arc<dyn AddressSource>,
    sessions: SessionManager,
    settings: RefreshSettings,
}

impl RefreshLoop {
    pub fn new(source: Arc<dyn AddressSource>, sessions: SessionManager, settings: RefreshSettings) -> Self {
        Self {
            source,
            sessions,
            settings,
        }
    }

    pub fn has_live_session(&self) -> bool {
        self.sessions.has_live_session()
    }

    /// One refresh: fetch addresses, resubscribe, wait for the session.
    pub async fn tick(&mut self) -> TickOutcome {
        info!("Fetching new token addresses...");
        let addresses = self.source.fetch_active_addresses().await;

        if addresses.is_empty() {
            info!("No active token addresses found.");
            return TickOutcome::Skipped;
        }

        info!("🔄 Subscribing to {} active token addresses", addresses.len());
        let filter = SubscriptionFilter::for_addresses(&self.settings.filter_name, &addresses, self.settings.commitment);

        let mut handle = match self.sessions.reconfigure(&filter).await {
            Ok(handle) => handle,
            Err(e) => {
                error!("❌ Failed to resubscribe: {}", e);
                error!("Stream error, restarting in next interval...");
                return TickOutcome::Failed(e.to_string());
            }
        };

        let outcome = match self.settings.session_window {
            Some(window) => match tokio::time::timeout(window, handle.await_completion()).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    debug!("Stream #{} still live after {}s", handle.id(), window.as_secs_f64());
                    return TickOutcome::WindowElapsed;
                }
            },
            None => handle.await_completion().await,
        };

        match &outcome {
            SessionOutcome::Failed(reason) => {
                error!("Stream #{} failed: {}", handle.id(), reason);
                error!("Stream error, restarting in next interval...");
            }
            SessionOutcome::Aborted => warn!("Stream #{} was aborted", handle.id()),
            _ => debug!("Stream #{} finished: {:?}", handle.id(), outcome),
        }
        TickOutcome::Completed(outcome)
    }

    /// Closes the live session, if any.
    pub async fn shutdown(&mut self) -> Result<(), MonitorError> {
        self.sessions.shutdown().await
    }

    /// Runs `ticks` refreshes with the configured interval in between.
    pub async fn run_ticks(&mut self, ticks: usize) -> Vec<TickOutcome> {
        let mut outcomes = Vec::with_capacity(ticks);
        for n in 0..ticks {
            if n > 0 {
                tokio::time::sleep(self.settings.interval).await;
            }
            outcomes.push(self.tick().await);
        }
        outcomes
    }

    /// Ticks until `shutdown` flips to `true` (or its sender is dropped), then
    /// closes the live session.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), MonitorError> {
        info!("🚀 Refresh loop started (interval {}ms)", self.settings.interval.as_millis());

        loop {
            tokio::select! {
                outcome = self.tick() => debug!("Tick finished: {:?}", outcome),
                _ = shutdown_requested(&mut shutdown) => break,
            }

            tokio::select! {
                _ = tokio::time::sleep(self.settings.interval) => {}
                _ = shutdown_requested(&mut shutdown) => break,
            }
        }

        info!("🛑 Shutdown requested, closing stream...");
        self.shutdown().await
    }
}

async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
