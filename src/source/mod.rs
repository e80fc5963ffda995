pub mod postgres;

use async_trait::async_trait;
use log::{debug, error};
use std::collections::HashSet;

use crate::errors::MonitorError;

pub use postgres::PostgresAddressSource;

/// 当前活跃的代币地址（有序、去重）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressSet(Vec<String>);

impl AddressSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }
}

impl<S: Into<String>> FromIterator<S> for AddressSet {
    /// Trims each address, drops blanks and keeps the first occurrence of duplicates.
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut seen = HashSet::new();
        let mut addresses: Vec<String> = Vec::new();
        for address in iter {
            let address = address.into().trim().to_string();
            if address.is_empty() || !seen.insert(address.clone()) {
                continue;
            }
            addresses.push(address);
        }
        Self(addresses)
    }
}

impl From<AddressSet> for Vec<String> {
    fn from(set: AddressSet) -> Self {
        set.0
    }
}

#[async_trait]
pub trait AddressSource: Send + Sync {
    /// 查询外部存储中的活跃地址
    async fn query_active_addresses(&self) -> Result<AddressSet, MonitorError>;

    /// Never fails: lookup errors are logged and an empty set is returned.
    async fn fetch_active_addresses(&self) -> AddressSet {
        match self.query_active_addresses().await {
            Ok(addresses) => {
                debug!("Fetched {} active token addresses", addresses.len());
                addresses
            }
            Err(e) => {
                error!("Error fetching token addresses from the database: {}", e);
                AddressSet::new()
            }
        }
    }
}
