//! Password hashing and quality rules.

pub mod hasher;
pub mod validator;

pub use hasher::PasswordHasher;
pub use validator::{PasswordValidator, PolicyViolation};
