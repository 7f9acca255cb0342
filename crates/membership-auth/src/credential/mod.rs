//! Password storage and login verification.

pub mod outcome;
pub mod validator;

pub use outcome::{LoginFailure, LoginOutcome, PasswordOutcome};
pub use validator::CredentialValidator;
