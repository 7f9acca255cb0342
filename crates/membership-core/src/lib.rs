//! # membership-core
//!
//! Core crate for the membership engine. Contains the store, audit and
//! clock traits consumed by the credential and access control components,
//! configuration schemas, SQL value/row types, and the unified error system.
//!
//! This crate has **no** internal dependencies on other membership crates.

pub mod audit;
pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
