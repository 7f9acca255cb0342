//! # membership-auth
//!
//! The credential and access control engine.
//!
//! ## Modules
//!
//! - `policy`: cached loading of parameter groups and the typed password rules
//! - `password`: Argon2id salted hashing and password quality rules
//! - `credential`: password storage with reuse prevention, and login verification
//! - `lockout`: sliding-window failure counting and account locking
//! - `rbac`: roles and temporal role membership
//! - `jwt`: session token claims, signing, and verification
//! - `session`: signing key rotation and session issuance

pub mod credential;
pub mod jwt;
pub mod lockout;
pub mod password;
pub mod policy;
pub mod rbac;
pub mod session;

pub use credential::{CredentialValidator, LoginFailure, LoginOutcome, PasswordOutcome};
pub use jwt::{SessionClaims, TokenSigner, TokenVerifier};
pub use lockout::{LockoutState, LockoutTracker};
pub use password::{PasswordHasher, PasswordValidator, PolicyViolation};
pub use policy::{PasswordRules, PolicyStore};
pub use rbac::RoleRegistry;
pub use session::SessionKeyManager;
