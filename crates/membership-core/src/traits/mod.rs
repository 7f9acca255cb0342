//! Core traits defined in `membership-core` and implemented by other crates.

pub mod audit;
pub mod clock;
pub mod store;

pub use audit::{AuditSink, TracingAuditSink};
pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{SqlExecutor, Store, UnitOfWork};
