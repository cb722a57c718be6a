use chrono::Duration;

use crate::jwt::TokenKind;

/// Immutable signing configuration injected into the [`Authenticator`](crate::Authenticator).
#[derive(Debug, Clone)]
pub struct TokenSettings {
    secret: Vec<u8>,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    app_ttl: Duration,
}

impl TokenSettings {
    /// # Arguments
    /// * `secret` - Symmetric signing secret
    /// * `issuer` - Value written to and required in the `iss` claim
    /// * `access_ttl` - Lifetime of access tokens
    /// * `refresh_ttl` - Lifetime of refresh tokens
    /// * `app_ttl` - Lifetime of app secrets
    pub fn new(
        secret: impl Into<Vec<u8>>,
        issuer: impl Into<String>,
        access_ttl: Duration,
        refresh_ttl: Duration,
        app_ttl: Duration,
    ) -> Self {
        Self {
            secret: secret.into(),
            issuer: issuer.into(),
            access_ttl,
            refresh_ttl,
            app_ttl,
        }
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Lifetime of a token of the given kind.
    pub fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
            TokenKind::App => self.app_ttl,
        }
    }
}
