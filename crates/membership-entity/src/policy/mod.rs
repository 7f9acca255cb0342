//! Policy parameter entities.

pub mod keys;
pub mod model;

pub use model::PolicyParameter;
