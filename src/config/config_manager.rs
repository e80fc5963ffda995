use std::path::Path;
use crate::{
    config::{AppConfig, StreamShyftConfig},
    errors::MonitorError,
};

/// 配置管理器 - 统一配置加载入口
///
/// 职责分工：
/// - AppConfig: 处理TOML文件、数据结构、验证、非敏感环境变量
/// - ConfigManager: 处理敏感信息(API keys, 数据库密码)、完整配置组装
///
/// 使用方式：
/// ```rust,ignore
/// let config_manager = ConfigManager::load_from_file("config.toml")?;
/// let stream_config = config_manager.stream_config()?;
/// ```
pub struct ConfigManager {
    pub app_config: AppConfig,
    pub shyft_api_key: Option<String>,
    pub shyft_rpc_api_key: Option<String>,
    pub database_password: Option<String>,
}

impl ConfigManager {
    /// 从配置文件和环境变量加载完整配置
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, MonitorError> {
        let app_config = AppConfig::load_with_env_override(config_path)?;

        let manager = Self {
            app_config,
            shyft_api_key: non_empty_env("SHYFT_API_KEY"),
            shyft_rpc_api_key: non_empty_env("SHYFT_RPC_API_KEY"),
            database_password: non_empty_env("DATABASE_PASSWORD"),
        };

        manager.validate_required_config()?;

        log::info!("✅ Configuration loaded successfully");
        Ok(manager)
    }

    fn validate_required_config(&self) -> Result<(), MonitorError> {
        if self.shyft_api_key.is_none() {
            return Err(MonitorError::Configuration(
                "SHYFT_API_KEY environment variable is required".to_string()
            ));
        }

        if self.database_password.is_none() {
            log::warn!("DATABASE_PASSWORD is not set, connecting to PostgreSQL without a password");
        }

        log::info!("✅ Required configuration validation passed");
        Ok(())
    }

    /// 获取Shyft API key (for gRPC)
    pub fn get_shyft_api_key(&self) -> Result<&str, MonitorError> {
        self.shyft_api_key.as_deref()
            .ok_or_else(|| MonitorError::Configuration("Shyft API key not available".to_string()))
    }

    /// 获取Shyft RPC API key，没有单独配置时回退到 gRPC key
    pub fn get_shyft_rpc_api_key(&self) -> Result<&str, MonitorError> {
        self.shyft_rpc_api_key.as_deref()
            .or(self.shyft_api_key.as_deref())
            .ok_or_else(|| MonitorError::Configuration("Shyft RPC API key not available".to_string()))
    }

    pub fn stream_config(&self) -> Result<StreamShyftConfig, MonitorError> {
        Ok(StreamShyftConfig::new(
            self.app_config.shyft.grpc_endpoint.clone(),
            self.get_shyft_api_key()?.to_string(),
        )
        .with_timeout(self.app_config.shyft.timeout_seconds))
    }

    /// 生成默认配置文件
    pub fn generate_default_config_file<P: AsRef<Path>>(path: P) -> Result<(), MonitorError> {
        let default_config = AppConfig::default();
        default_config.save_to_file(path)?;
        log::info!("✅ Default configuration file generated");
        Ok(())
    }

    /// 获取配置摘要（不包含敏感信息）
    pub fn get_config_summary(&self) -> String {
        let config = &self.app_config;
        format!(
            "ConfigManager Summary:\n\
            - Shyft gRPC: {} (API key: {})\n\
            - Shyft RPC: {} (API key: {})\n\
            - PostgreSQL: {}@{}:{}/{} (password: {})\n\
            - Refresh interval: {}ms, session window: {}s\n\
            - Program: {}\n\
            - SOL price: ${}\n\
            - Log level: {}",
            config.shyft.grpc_endpoint,
            if self.shyft_api_key.is_some() { "set" } else { "missing" },
            config.shyft.rpc_endpoint,
            if self.shyft_rpc_api_key.is_some() || self.shyft_api_key.is_some() { "set" } else { "missing" },
            config.database.user,
            config.database.host,
            config.database.port,
            config.database.dbname,
            if self.database_password.is_some() { "set" } else { "missing" },
            config.refresh.interval_ms,
            config.refresh.session_window_secs,
            config.valuation.program_id,
            config.valuation.sol_price_usd,
            config.logging.level,
        )
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}
