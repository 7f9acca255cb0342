//! Credential domain entities.

pub mod model;

pub use model::Credential;
