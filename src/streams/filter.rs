use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use yellowstone_grpc_proto::geyser::{SubscribeRequest, SubscribeRequestFilterTransactions};
use yellowstone_grpc_proto::prelude::CommitmentLevel;

use crate::errors::MonitorError;
use crate::source::AddressSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

impl FromStr for Commitment {
    type Err = MonitorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "processed" => Ok(Commitment::Processed),
            "confirmed" => Ok(Commitment::Confirmed),
            "finalized" => Ok(Commitment::Finalized),
            other => Err(MonitorError::Configuration(format!(
                "Invalid commitment '{}'. Must be one of: processed, confirmed, finalized",
                other
            ))),
        }
    }
}

impl From<Commitment> for CommitmentLevel {
    fn from(commitment: Commitment) -> Self {
        match commitment {
            Commitment::Processed => CommitmentLevel::Processed,
            Commitment::Confirmed => CommitmentLevel::Confirmed,
            Commitment::Finalized => CommitmentLevel::Finalized,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionFilter {
    pub vote: bool,
    pub failed: bool,
    pub account_include: Vec<String>,
    pub account_exclude: Vec<String>,
    pub account_required: Vec<String>,
}

/// 订阅过滤器：提交后不可修改，每次刷新整体替换
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionFilter {
    transactions: BTreeMap<String, TransactionFilter>,
    commitment: Commitment,
}

impl SubscriptionFilter {
    /// Single named transaction filter: no votes, no failed transactions,
    /// any transaction touching one of `addresses`.
    pub fn for_addresses(name: &str, addresses: &AddressSet, commitment: Commitment) -> Self {
        let mut transactions = BTreeMap::new();
        transactions.insert(
            name.to_owned(),
            TransactionFilter {
                vote: false,
                failed: false,
                account_include: addresses.as_slice().to_vec(),
                account_exclude: vec![],
                account_required: vec![],
            },
        );

        Self { transactions, commitment }
    }

    pub fn commitment(&self) -> Commitment {
        self.commitment
    }

    pub fn transactions(&self) -> &BTreeMap<String, TransactionFilter> {
        &self.transactions
    }

    pub fn to_request(&self) -> SubscribeRequest {
        let transactions: HashMap<String, SubscribeRequestFilterTransactions> = self
            .transactions
            .iter()
            .map(|(name, filter)| {
                (
                    name.clone(),
                    SubscribeRequestFilterTransactions {
                        vote: Some(filter.vote),
                        failed: Some(filter.failed),
                        signature: None,
                        account_include: filter.account_include.clone(),
                        account_exclude: filter.account_exclude.clone(),
                        account_required: filter.account_required.clone(),
                    },
                )
            })
            .collect();

        SubscribeRequest {
            accounts: HashMap::default(),
            slots: HashMap::default(),
            transactions,
            transactions_status: HashMap::default(),
            blocks: HashMap::default(),
            blocks_meta: HashMap::default(),
            entry: HashMap::default(),
            commitment: Some(CommitmentLevel::from(self.commitment) as i32),
            accounts_data_slice: Vec::default(),
            ping: None,
            from_slot: None,
        }
    }
}
