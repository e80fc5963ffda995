pub mod event;
pub mod traits;
pub mod valuation;
pub mod dispatch;
pub mod enrichment;

pub use event::{RawEvent, TokenBalanceEntry};
pub use traits::{AccountInfoLookup, AccountSnapshot, TokenLookup};
pub use valuation::Valuation;
pub use dispatch::{drive_events, EventHandler, EventStream};
pub use enrichment::{BondingCurveInfo, Enrichment, EnrichmentPipeline, SkipReason, ValuationReport};
