pub mod constant;
pub mod errors;
pub mod config;
pub mod source;
pub mod streams;
pub mod processors;
pub mod utils;
pub mod monitor;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::{AppConfig, ConfigManager, StreamShyftConfig};
pub use errors::MonitorError;
pub use source::{AddressSet, AddressSource, PostgresAddressSource};
pub use streams::{Commitment, GeyserTransport, SessionManager, SessionOutcome, ShyftTransport, SubscriptionFilter};
pub use processors::{
    drive_events, Enrichment, EnrichmentPipeline, EventHandler, RawEvent, SkipReason, Valuation, ValuationReport,
};
pub use utils::ShyftRpcClient;
pub use monitor::{RefreshLoop, RefreshSettings, TickOutcome};
