use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::{error, info};
use std::sync::Arc;
use tokio::sync::watch;

use bonding_curve_monitor::{
    config::{AppConfig, ConfigManager},
    processors::{AccountInfoLookup, TokenLookup},
    EnrichmentPipeline, GeyserTransport, PostgresAddressSource, RefreshLoop, RefreshSettings,
    SessionManager, ShyftRpcClient, ShyftTransport, TickOutcome,
};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 配置文件路径
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// 显示配置摘要
    #[arg(long)]
    show_config: bool,

    /// 生成默认配置文件
    #[arg(long)]
    generate_config: bool,

    /// 验证配置文件
    #[arg(long)]
    validate_config: bool,

    /// Run this many refresh ticks and exit instead of running until Ctrl+C
    #[arg(long)]
    ticks: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 加载 .env 文件
    if dotenvy::dotenv().is_err() {
        eprintln!("Warning: Could not load .env file");
    }

    let args = Args::parse();

    // RUST_LOG 优先，其次使用配置文件中的日志级别
    let default_level = AppConfig::load_with_env_override(&args.config)
        .map(|config| config.logging.level)
        .unwrap_or_else(|_| "info".to_string());
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    // 处理特殊命令
    if args.generate_config {
        ConfigManager::generate_default_config_file(&args.config)?;
        info!("默认配置文件已生成: {}", args.config);
        return Ok(());
    }

    if args.validate_config {
        match ConfigManager::load_from_file(&args.config) {
            Ok(config_manager) => {
                info!("配置文件验证通过");
                info!("{}", config_manager.get_config_summary());
            }
            Err(e) => {
                error!("配置文件验证失败: {}", e);
                return Err(e.into());
            }
        }
        return Ok(());
    }

    // 加载配置
    let config_manager = match ConfigManager::load_from_file(&args.config) {
        Ok(manager) => manager,
        Err(e) => {
            error!("配置加载失败: {}", e);
            return Err(e.into());
        }
    };

    if args.show_config {
        println!("{}", config_manager.get_config_summary());
        return Ok(());
    }

    let app_config = &config_manager.app_config;

    let source = Arc::new(PostgresAddressSource::new(
        &app_config.database,
        config_manager.database_password.as_deref(),
    )?);

    let rpc_client = Arc::new(ShyftRpcClient::new(
        app_config.shyft.rpc_endpoint.clone(),
        config_manager.get_shyft_rpc_api_key()?.to_string(),
        &app_config.rpc,
    )?);
    let accounts: Arc<dyn AccountInfoLookup> = rpc_client.clone();
    let tokens: Arc<dyn TokenLookup> = rpc_client;
    let pipeline = EnrichmentPipeline::new(
        accounts,
        tokens,
        app_config.program_id()?,
        app_config.valuation.sol_price_usd,
    );

    let transport: Arc<dyn GeyserTransport> = Arc::new(ShyftTransport::new(config_manager.stream_config()?));
    let sessions = SessionManager::new(transport, Arc::new(pipeline), app_config.teardown_timeout());
    let settings = RefreshSettings::from_config(app_config)?;
    let mut refresh = RefreshLoop::new(source, sessions, settings);

    info!("🚀 Starting bonding curve monitor");
    info!("{}", config_manager.get_config_summary());

    if let Some(ticks) = args.ticks {
        let outcomes = refresh.run_ticks(ticks).await;
        let failed = outcomes
            .iter()
            .filter(|outcome| matches!(outcome, TickOutcome::Failed(_)))
            .count();
        info!("Finished {} tick(s), {} failed", outcomes.len(), failed);
        refresh.shutdown().await?;
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("🛑 Received Ctrl+C"),
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
        let _ = shutdown_tx.send(true);
    });

    refresh.run(shutdown_rx).await?;
    info!("👋 Monitor stopped");
    Ok(())
}
