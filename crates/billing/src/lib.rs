//! Usage governance for billable third-party API calls.
//!
//! Provides the monthly usage ledger, its durable storage backends, and the
//! budget alert evaluator.

pub mod alerts;
pub mod clock;
pub mod ledger;
pub mod store;

pub use alerts::{AlertEvaluator, AlertThresholds};
pub use clock::{Clock, FixedClock, SystemClock};
pub use ledger::{LedgerState, MonthSnapshot, UnitType, UsageLedger, UsageStats};
pub use store::{FileLedgerStore, InMemoryLedgerStore, LedgerStore, LedgerStoreError};
