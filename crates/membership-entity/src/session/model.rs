//! Client-held session model.

use serde::{Deserialize, Serialize};

/// The session a client carries between requests.
///
/// Nothing about it is stored server-side; its integrity comes from the
/// signed token it travels in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Whether the holder is logged in.
    pub logged_in: bool,
    /// Opaque session identifier.
    pub session_id: String,
    /// Account identifier.
    pub account_id: i64,
    /// Login name.
    pub username: String,
    /// Given name.
    pub name: String,
    /// Family name.
    pub surname: String,
    /// Whether the holder logged in with a temporary password.
    pub temporary_password: bool,
}
