//! Request context carrying the client address and session token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Context for one inbound request.
///
/// Built by the transport layer and handed to every operation so that it
/// knows where the request came from and which session it presents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// IP address of the request origin.
    pub ip_address: String,
    /// User-Agent header value.
    pub user_agent: Option<String>,
    /// Signed session token presented by the client, if any.
    pub session_token: Option<String>,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a context for an anonymous request.
    pub fn new(ip_address: impl Into<String>, request_time: DateTime<Utc>) -> Self {
        Self {
            ip_address: ip_address.into(),
            user_agent: None,
            session_token: None,
            request_time,
        }
    }

    /// Attach the session token the client presented.
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Attach the client's User-Agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}
