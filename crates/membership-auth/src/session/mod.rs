//! Signing key management and session issuance.

pub mod keys;

pub use keys::SessionKeyManager;
