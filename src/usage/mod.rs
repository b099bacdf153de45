//! Daily call-minute metering against the subscription plan
//!
//! Kept in memory for the lifetime of the process; minutes roll over at UTC
//! midnight and only the most recent sessions are retained.

mod tracker;

pub use tracker::{Plan, SessionRecord, UsageSummary, UsageTracker, HISTORY_LIMIT};
