use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;

use crate::errors::MonitorError;

/// 链上账户快照：所属程序和 lamports 余额
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub owner: Pubkey,
    pub lamports: u64,
}

#[async_trait]
pub trait AccountInfoLookup: Send + Sync {
    /// `Ok(None)` when the account does not exist.
    async fn account_info(&self, address: &Pubkey) -> Result<Option<AccountSnapshot>, MonitorError>;
}

#[async_trait]
pub trait TokenLookup: Send + Sync {
    /// 当前流通量（UI 单位，已按 decimals 换算）
    async fn token_supply(&self, mint: &Pubkey) -> Result<f64, MonitorError>;

    /// `owner` 持有的 `mint` 代币余额（UI 单位），没有代币账户时为 0
    async fn token_balance(&self, owner: &Pubkey, mint: &Pubkey) -> Result<f64, MonitorError>;
}
