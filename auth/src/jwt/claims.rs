use std::fmt;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// Audience value used for tokens the service issues to itself (no app involved).
pub const SELF_AUDIENCE: &str = "self";

/// Kind of a signed token, carried in the `type` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived credential presented on each protected request.
    Access,
    /// Longer-lived credential exchanged for a new access/refresh pair.
    Refresh,
    /// App secret minted when an app is registered.
    App,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
            TokenKind::App => "app",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Party a token is intended for.
///
/// Serialized into the `aud` claim as either the literal `"self"` or the
/// public app id the token was issued for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Audience {
    /// Token issued directly to the user (password grant without an app).
    SelfIssued,
    /// Token issued on behalf of a registered app.
    App(String),
}

impl Audience {
    pub fn as_str(&self) -> &str {
        match self {
            Audience::SelfIssued => SELF_AUDIENCE,
            Audience::App(app_id) => app_id,
        }
    }

    /// App id for app-issued tokens, `None` for self-issued ones.
    pub fn app_id(&self) -> Option<&str> {
        match self {
            Audience::SelfIssued => None,
            Audience::App(app_id) => Some(app_id),
        }
    }
}

impl From<String> for Audience {
    fn from(value: String) -> Self {
        if value == SELF_AUDIENCE {
            Audience::SelfIssued
        } else {
            Audience::App(value)
        }
    }
}

impl From<Audience> for String {
    fn from(value: Audience) -> Self {
        match value {
            Audience::SelfIssued => SELF_AUDIENCE.to_string(),
            Audience::App(app_id) => app_id,
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims carried by every token the service signs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject (user id, or app id for app secrets)
    pub sub: String,

    /// Issuer
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Audience
    pub aud: Audience,

    /// Unique token identifier, keeps tokens minted in the same second distinct
    pub jti: String,

    /// Token kind
    #[serde(rename = "type")]
    pub kind: TokenKind,
}

impl Claims {
    /// Build claims for a token of `kind` issued at `issued_at`.
    ///
    /// # Arguments
    /// * `kind` - Access, refresh or app token
    /// * `subject` - Identifier of the token owner
    /// * `audience` - Party the token is intended for
    /// * `issuer` - Configured issuer name
    /// * `issued_at` - Issue instant
    /// * `expires_at` - Expiry instant
    pub fn new(
        kind: TokenKind,
        subject: impl ToString,
        audience: Audience,
        issuer: impl ToString,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sub: subject.to_string(),
            iss: issuer.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            aud: audience,
            jti: Uuid::new_v4().simple().to_string(),
            kind,
        }
    }

    /// Check if token is expired. A token is live while `exp > now`.
    pub fn is_expired(&self, current_timestamp: i64) -> bool {
        self.exp <= current_timestamp
    }

    /// Seconds left until expiry, clamped at zero.
    pub fn expires_in(&self, current_timestamp: i64) -> i64 {
        (self.exp - current_timestamp).max(0)
    }
}
