pub mod filter;
pub mod transport;
pub mod session;
pub mod shyft;

pub use filter::{Commitment, SubscriptionFilter, TransactionFilter};
pub use transport::{GeyserTransport, RequestSink, TransportChannel, UpdateStream};
pub use session::{SessionHandle, SessionManager, SessionOutcome};
pub use shyft::ShyftTransport;
