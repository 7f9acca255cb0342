//! # membership-entity
//!
//! Domain entity models for the membership engine. Every struct in this
//! crate represents a store row or a domain value object. All entities
//! derive `Debug`, `Clone`, `Serialize`, `Deserialize`, and row-backed
//! entities provide a `from_row` constructor over
//! [`membership_core::types::SqlRow`].

pub mod account;
pub mod audit;
pub mod credential;
pub mod policy;
pub mod role;
pub mod session;
