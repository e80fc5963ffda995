use serde::{Deserialize, Serialize};
use yellowstone_grpc_proto::geyser::SubscribeUpdateTransaction;
use yellowstone_grpc_proto::prelude::TokenBalance;

/// 交易后的代币余额条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBalanceEntry {
    pub mint: String,
    pub owner: String,
}

impl From<&TokenBalance> for TokenBalanceEntry {
    fn from(balance: &TokenBalance) -> Self {
        Self {
            mint: balance.mint.clone(),
            owner: balance.owner.clone(),
        }
    }
}

/// 订阅推送的一笔交易
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub signature: String,
    pub slot: u64,
    pub post_token_balances: Vec<TokenBalanceEntry>,
}

impl RawEvent {
    /// Returns `None` when the update carries no transaction payload.
    pub fn from_update(update: &SubscribeUpdateTransaction) -> Option<Self> {
        let txn_info = update.transaction.as_ref()?;

        let signature = if !txn_info.signature.is_empty() {
            bs58::encode(&txn_info.signature).into_string()
        } else {
            "unknown".to_string()
        };

        let post_token_balances = txn_info
            .meta
            .as_ref()
            .map(|meta| meta.post_token_balances.iter().map(TokenBalanceEntry::from).collect())
            .unwrap_or_default();

        Some(Self {
            signature,
            slot: update.slot,
            post_token_balances,
        })
    }

    pub fn first_mint(&self) -> Option<&str> {
        self.post_token_balances.first().map(|entry| entry.mint.as_str())
    }
}
