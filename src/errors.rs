use thiserror::Error;

/// 监控错误类型
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Address source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Session setup failed: {0}")]
    SessionSetup(String),

    #[error("Session teardown failed: {0}")]
    SessionTeardown(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Enrichment failed: {0}")]
    Enrichment(String),

    #[error("RPC error: {method} - {reason}")]
    Rpc {
        method: String,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Timeout occurred: operation took longer than {timeout_ms}ms")]
    Timeout {
        timeout_ms: u64,
    },
}

impl From<reqwest::Error> for MonitorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            MonitorError::Rpc {
                method: "http".to_string(),
                reason: format!("Connection error: {}", err),
            }
        } else {
            MonitorError::Rpc {
                method: "http".to_string(),
                reason: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        MonitorError::Rpc {
            method: "decode".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<tokio_postgres::Error> for MonitorError {
    fn from(err: tokio_postgres::Error) -> Self {
        MonitorError::SourceUnavailable(err.to_string())
    }
}

impl From<deadpool_postgres::PoolError> for MonitorError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        MonitorError::SourceUnavailable(format!("Pool error: {}", err))
    }
}

impl MonitorError {
    /// 传输层或网络层的临时错误，可以在下一次尝试中恢复
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MonitorError::Rpc { .. } | MonitorError::Timeout { .. } | MonitorError::Transport(_)
        )
    }

    pub fn rpc(method: &str, reason: impl Into<String>) -> Self {
        MonitorError::Rpc {
            method: method.to_string(),
            reason: reason.into(),
        }
    }
}
