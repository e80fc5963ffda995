use serde::{Serialize, Deserialize};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::time::Duration;

use crate::constant::{accounts::PUMPFUN, stream, valuation};
use crate::errors::MonitorError;
use crate::streams::Commitment;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamShyftConfig {
    pub endpoint: String,
    pub x_token: String,
    pub timeout_seconds: u64,
}

impl StreamShyftConfig {
    pub fn new(endpoint: String, token: String) -> Self {
        Self {
            endpoint,
            x_token: token,
            timeout_seconds: 10,
        }
    }

    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub shyft: ShyftConfig,
    pub database: DatabaseConfig,
    pub refresh: RefreshConfig,
    pub valuation: ValuationConfig,
    pub rpc: RpcConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShyftConfig {
    pub grpc_endpoint: String,
    pub rpc_endpoint: String,
    pub commitment: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub active_tokens_query: String,
    pub query_timeout_ms: u64,
    pub max_pool_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// 两次刷新之间的固定间隔
    pub interval_ms: u64,
    /// 单个会话的最长等待时间，0 表示一直等到传输结束
    pub session_window_secs: u64,
    pub teardown_timeout_ms: u64,
    pub filter_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationConfig {
    pub program_id: String,
    pub sol_price_usd: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    pub request_timeout_ms: u64,
    pub max_retry_elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl AppConfig {
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, MonitorError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MonitorError::Configuration(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| MonitorError::Configuration(format!("Failed to parse config file: {}", e)))
    }

    pub fn load_with_env_override<P: AsRef<std::path::Path>>(config_path: P) -> Result<Self, MonitorError> {
        let mut config = Self::from_file(config_path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), MonitorError> {
        // 只处理非敏感配置的环境变量覆盖
        if let Ok(endpoint) = std::env::var("SHYFT_GRPC_ENDPOINT") {
            self.shyft.grpc_endpoint = endpoint;
        }

        if let Ok(endpoint) = std::env::var("SHYFT_RPC_ENDPOINT") {
            self.shyft.rpc_endpoint = endpoint;
        }

        if let Ok(host) = std::env::var("DATABASE_HOST") {
            self.database.host = host;
        }

        if let Ok(interval) = std::env::var("REFRESH_INTERVAL_MS") {
            self.refresh.interval_ms = interval.parse()
                .map_err(|e| MonitorError::Configuration(format!("Invalid REFRESH_INTERVAL_MS: {}", e)))?;
        }

        if let Ok(price) = std::env::var("SOL_PRICE_USD") {
            self.valuation.sol_price_usd = price.parse()
                .map_err(|e| MonitorError::Configuration(format!("Invalid SOL_PRICE_USD: {}", e)))?;
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.refresh.interval_ms == 0 {
            return Err(MonitorError::Configuration(
                "Refresh interval must be greater than 0".to_string()
            ));
        }

        if self.refresh.teardown_timeout_ms < 100 {
            return Err(MonitorError::Configuration(
                "Teardown timeout must be at least 100ms".to_string()
            ));
        }

        if self.refresh.filter_name.trim().is_empty() {
            return Err(MonitorError::Configuration(
                "Transaction filter name cannot be empty".to_string()
            ));
        }

        if self.database.active_tokens_query.trim().is_empty() {
            return Err(MonitorError::Configuration(
                "Active tokens query cannot be empty".to_string()
            ));
        }

        if self.database.max_pool_size == 0 {
            return Err(MonitorError::Configuration(
                "Database pool size must be greater than 0".to_string()
            ));
        }

        if !self.valuation.sol_price_usd.is_finite() || self.valuation.sol_price_usd <= 0.0 {
            return Err(MonitorError::Configuration(
                "SOL price must be a positive number".to_string()
            ));
        }

        self.program_id()?;
        self.commitment()?;

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {},
            _ => return Err(MonitorError::Configuration(
                "Invalid log level. Must be one of: trace, debug, info, warn, error".to_string()
            )),
        }

        log::info!("✅ Configuration validation passed");
        Ok(())
    }

    pub fn program_id(&self) -> Result<Pubkey, MonitorError> {
        Pubkey::from_str(&self.valuation.program_id)
            .map_err(|e| MonitorError::Configuration(format!("Invalid program id '{}': {}", self.valuation.program_id, e)))
    }

    pub fn commitment(&self) -> Result<Commitment, MonitorError> {
        Commitment::from_str(&self.shyft.commitment)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh.interval_ms)
    }

    pub fn session_window(&self) -> Option<Duration> {
        match self.refresh.session_window_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn teardown_timeout(&self) -> Duration {
        Duration::from_millis(self.refresh.teardown_timeout_ms)
    }

    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), MonitorError> {
        let toml_content = toml::to_string_pretty(self)
            .map_err(|e| MonitorError::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_content)
            .map_err(|e| MonitorError::Configuration(format!("Failed to write config file: {}", e)))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            shyft: ShyftConfig {
                grpc_endpoint: "https://grpc.ny.shyft.to".to_string(),
                rpc_endpoint: "https://rpc.ny.shyft.to".to_string(),
                commitment: "confirmed".to_string(),
                timeout_seconds: 30,
            },
            database: DatabaseConfig {
                host: "localhost".to_string(),
                port: 5432,
                dbname: "tokens".to_string(),
                user: "postgres".to_string(),
                active_tokens_query: stream::DEFAULT_ACTIVE_TOKENS_QUERY.to_string(),
                query_timeout_ms: 5000,
                max_pool_size: 4,
            },
            refresh: RefreshConfig {
                interval_ms: 5000,
                session_window_secs: 30,
                teardown_timeout_ms: 5000,
                filter_name: stream::DEFAULT_FILTER_NAME.to_string(),
            },
            valuation: ValuationConfig {
                program_id: PUMPFUN.to_string(),
                sol_price_usd: valuation::DEFAULT_SOL_PRICE_USD,
            },
            rpc: RpcConfig {
                request_timeout_ms: 10000,
                max_retry_elapsed_ms: 3000,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}
