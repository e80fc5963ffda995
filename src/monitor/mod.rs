pub mod refresh_loop;

pub use refresh_loop::{RefreshLoop, RefreshSettings, TickOutcome};
