//! Claims carried by a session token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use membership_entity::session::Session;

/// JWT claims payload of a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the username.
    pub sub: String,
    /// Account id.
    pub uid: i64,
    /// Opaque session id.
    pub sid: String,
    /// Given name.
    pub name: String,
    /// Family name.
    pub surname: String,
    /// Logged in with a temporary password.
    pub tmp: bool,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
}

impl SessionClaims {
    /// Claims for `session`, valid from `issued_at` until `expires_at`.
    pub fn new(session: &Session, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            sub: session.username.clone(),
            uid: session.account_id,
            sid: session.session_id.clone(),
            name: session.name.clone(),
            surname: session.surname.clone(),
            tmp: session.temporary_password,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Checks whether this token has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    /// Rebuild the logged-in session these claims describe.
    pub fn into_session(self) -> Session {
        Session {
            logged_in: true,
            session_id: self.sid,
            account_id: self.uid,
            username: self.sub,
            name: self.name,
            surname: self.surname,
            temporary_password: self.tmp,
        }
    }
}
