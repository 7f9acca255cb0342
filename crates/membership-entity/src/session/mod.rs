//! Session and signing key entities.

pub mod key;
pub mod model;

pub use key::SigningKey;
pub use model::Session;
