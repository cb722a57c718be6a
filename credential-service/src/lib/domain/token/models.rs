use std::fmt;

use auth::Audience;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::app::models::AppId;
use crate::user::models::User;
use crate::user::models::UserId;

/// Opaque single-use authorization code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Code(String);

impl Code {
    /// Mint a fresh unguessable code (UUID v4, 122 random bits, simple hex form).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Persisted authorization code binding a user to an app.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationCode {
    pub code: Code,
    /// `None` for legacy codes whose user was never recorded.
    pub user_id: Option<UserId>,
    pub app_id: AppId,
    pub created_at: DateTime<Utc>,
}

impl AuthorizationCode {
    pub fn new(user_id: UserId, app_id: AppId) -> Self {
        Self {
            code: Code::generate(),
            user_id: Some(user_id),
            app_id,
            created_at: Utc::now(),
        }
    }

    /// A code is usable while `now - created_at < ttl`.
    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now - self.created_at >= ttl
    }
}

/// Store-side record of an issued access token.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessTokenRecord {
    pub id: Uuid,
    pub token: String,
    pub user_id: UserId,
    /// `None` for self-issued tokens.
    pub app_id: Option<AppId>,
    pub created_at: DateTime<Utc>,
}

/// Store-side record of an issued refresh token, linked 1:1 to its access token.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub token: String,
    pub user_id: UserId,
    pub app_id: Option<AppId>,
    pub access_token_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Access and refresh records written together in one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedPair {
    pub access: AccessTokenRecord,
    pub refresh: RefreshTokenRecord,
}

impl IssuedPair {
    pub fn new(
        user_id: UserId,
        app_id: Option<AppId>,
        access_token: String,
        refresh_token: String,
    ) -> Self {
        let created_at = Utc::now();
        let access = AccessTokenRecord {
            id: Uuid::new_v4(),
            token: access_token,
            user_id,
            app_id: app_id.clone(),
            created_at,
        };
        let refresh = RefreshTokenRecord {
            id: Uuid::new_v4(),
            token: refresh_token,
            user_id,
            app_id,
            access_token_id: access.id,
            created_at,
        };

        Self { access, refresh }
    }
}

/// Token pair handed back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub token_type: String,
}

impl TokenPair {
    pub const TOKEN_TYPE: &'static str = "Bearer";

    pub fn new(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_in,
            token_type: Self::TOKEN_TYPE.to_string(),
        }
    }
}

/// Ways a caller can prove entitlement to a token pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
    AuthorizationCode { code: Code },
    /// Self-scoped unless client credentials name an app.
    Password { username: String, password: String },
    RefreshToken { refresh_token: String },
}

impl Grant {
    pub fn name(&self) -> &'static str {
        match self {
            Grant::AuthorizationCode { .. } => "authorization_code",
            Grant::Password { .. } => "password",
            Grant::RefreshToken { .. } => "refresh_token",
        }
    }
}

/// `client_id` / `client_secret` sent along with a grant. Both are required
/// whenever the grant yields app-scoped tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub app_id: AppId,
    pub secret: Option<String>,
}

/// Single entry point request of the token exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeCommand {
    pub grant: Grant,
    pub client: Option<ClientCredentials>,
}

impl ExchangeCommand {
    pub fn new(grant: Grant) -> Self {
        Self {
            grant,
            client: None,
        }
    }

    pub fn with_client(mut self, client: ClientCredentials) -> Self {
        self.client = Some(client);
        self
    }
}

/// Identity resolved from a valid, unrevoked access token.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedIdentity {
    pub user: User,
    pub audience: Audience,
    pub token_id: Uuid,
}
