//! # membership-database
//!
//! `sqlx`-backed implementation of the [`membership_core::traits::Store`]
//! interface for PostgreSQL and SQLite, schema migrations, seeding of the
//! default password rules and roles, and typed repositories for every
//! membership entity.

pub mod audit_sink;
pub mod connection;
pub mod dialect;
pub mod migration;
pub mod repositories;
pub mod seed;

pub use audit_sink::DatabaseAuditSink;
pub use connection::SqlStore;
pub use dialect::Dialect;
