use async_trait::async_trait;
use deadpool_postgres::{Config as PoolConfig, ManagerConfig, Pool, PoolConfig as PoolSizeConfig, RecyclingMethod, Runtime};
use log::{debug, info};
use std::time::Duration;
use tokio_postgres::NoTls;

use crate::config::DatabaseConfig;
use crate::errors::MonitorError;
use crate::source::{AddressSet, AddressSource};

/// 从 PostgreSQL 读取活跃代币地址
///
/// 连接池是惰性的：创建时不会连接数据库，第一次查询时才建立连接，
/// 连接断开后由连接池自动重建。
pub struct PostgresAddressSource {
    pool: Pool,
    query: String,
    query_timeout: Duration,
}

impl PostgresAddressSource {
    pub fn new(config: &DatabaseConfig, password: Option<&str>) -> Result<Self, MonitorError> {
        let mut pool_config = PoolConfig::new();
        pool_config.host = Some(config.host.clone());
        pool_config.port = Some(config.port);
        pool_config.dbname = Some(config.dbname.clone());
        pool_config.user = Some(config.user.clone());
        pool_config.password = password.map(str::to_string);
        pool_config.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        pool_config.pool = Some(PoolSizeConfig::new(config.max_pool_size));

        let pool = pool_config
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| MonitorError::Configuration(format!("Failed to create PostgreSQL pool: {}", e)))?;

        info!("PostgreSQL pool ready: {}@{}:{}/{}", config.user, config.host, config.port, config.dbname);

        Ok(Self {
            pool,
            query: config.active_tokens_query.clone(),
            query_timeout: Duration::from_millis(config.query_timeout_ms),
        })
    }

    async fn run_query(&self) -> Result<AddressSet, MonitorError> {
        let client = self.pool.get().await?;
        let rows = client.query(self.query.as_str(), &[]).await?;
        debug!("Active tokens query returned {} rows", rows.len());

        let addresses = rows
            .iter()
            .map(|row| row.try_get::<_, Option<String>>(0))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(collect_addresses(addresses))
    }
}

/// NULL addresses are skipped; the remaining rows still form the set.
fn collect_addresses(values: Vec<Option<String>>) -> AddressSet {
    let nulls = values.iter().filter(|value| value.is_none()).count();
    if nulls > 0 {
        debug!("Skipped {} NULL token addresses", nulls);
    }
    values.into_iter().flatten().collect()
}

#[async_trait]
impl AddressSource for PostgresAddressSource {
    async fn query_active_addresses(&self) -> Result<AddressSet, MonitorError> {
        tokio::time::timeout(self.query_timeout, self.run_query())
            .await
            .map_err(|_| MonitorError::Timeout {
                timeout_ms: self.query_timeout.as_millis() as u64,
            })?
    }
}
