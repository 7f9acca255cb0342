//! Session token claims, signing, and verification.

pub mod claims;
pub mod signer;
pub mod verifier;

pub use claims::SessionClaims;
pub use signer::TokenSigner;
pub use verifier::TokenVerifier;
