//! Parameter groups and password rules.

pub mod rules;
pub mod store;

pub use rules::PasswordRules;
pub use store::PolicyStore;
