pub mod app_config;
pub mod config_manager;

pub use app_config::{
    AppConfig, ShyftConfig, StreamShyftConfig, DatabaseConfig, RefreshConfig,
    ValuationConfig, RpcConfig, LoggingConfig,
};
pub use config_manager::ConfigManager;
