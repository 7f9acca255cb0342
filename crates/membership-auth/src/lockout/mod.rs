//! Failed-login tracking and account locking.

pub mod tracker;

pub use tracker::{AccountLock, LockoutState, LockoutTracker};
