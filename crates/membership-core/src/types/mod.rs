//! Shared value types.

pub mod sql;

pub use sql::{SqlRow, SqlValue};
