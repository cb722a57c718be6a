use chrono::Utc;

use crate::jwt::Audience;
use crate::jwt::Claims;
use crate::jwt::JwtError;
use crate::jwt::JwtHandler;
use crate::jwt::TokenKind;
use crate::password::PasswordError;
use crate::password::PasswordHasher;
use crate::settings::TokenSettings;

/// Authentication coordinator combining password verification and token signing.
///
/// Provides high-level authentication operations by coordinating
/// password hashing and JWT token handling under one immutable configuration.
pub struct Authenticator {
    password_hasher: PasswordHasher,
    jwt_handler: JwtHandler,
    settings: TokenSettings,
}

/// A freshly signed token together with the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

/// Authentication operation errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password error: {0}")]
    PasswordError(#[from] PasswordError),
}

impl Authenticator {
    /// Create a new authenticator.
    ///
    /// # Arguments
    /// * `settings` - Signing secret, issuer and token lifetimes
    ///
    /// # Returns
    /// Configured Authenticator instance
    pub fn new(settings: TokenSettings) -> Self {
        Self {
            password_hasher: PasswordHasher::new(),
            jwt_handler: JwtHandler::new(settings.secret()).with_issuer(settings.issuer()),
            settings,
        }
    }

    pub fn settings(&self) -> &TokenSettings {
        &self.settings
    }

    /// Hash a password for storage.
    ///
    /// # Errors
    /// * `PasswordError` - Hashing operation failed
    pub fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        self.password_hasher.hash(password)
    }

    /// Check a password against the stored hash of an account that may not exist.
    ///
    /// A missing account and a wrong password both yield `InvalidCredentials`
    /// after the same amount of hashing work.
    ///
    /// # Arguments
    /// * `password` - Plaintext password to verify
    /// * `stored_hash` - Stored password hash, `None` when the account is unknown
    ///
    /// # Errors
    /// * `InvalidCredentials` - Password does not match or account is unknown
    /// * `PasswordError` - Stored hash is unreadable
    pub fn authenticate(
        &self,
        password: &str,
        stored_hash: Option<&str>,
    ) -> Result<(), AuthenticationError> {
        let is_valid = self
            .password_hasher
            .verify_or_decoy(password, stored_hash)?;

        if !is_valid {
            return Err(AuthenticationError::InvalidCredentials);
        }

        Ok(())
    }

    /// Sign a new token of `kind` for `subject`, intended for `audience`.
    ///
    /// Expiry is `now + ttl(kind)` taken from the injected settings.
    ///
    /// # Errors
    /// * `EncodingFailed` - Token signing failed
    pub fn issue(
        &self,
        kind: TokenKind,
        subject: impl ToString,
        audience: Audience,
    ) -> Result<IssuedToken, JwtError> {
        let now = Utc::now();
        let claims = Claims::new(
            kind,
            subject,
            audience,
            self.settings.issuer(),
            now,
            now + self.settings.ttl(kind),
        );
        let token = self.jwt_handler.encode(&claims)?;

        Ok(IssuedToken { token, claims })
    }

    /// Verify signature, algorithm, issuer and expiry of a token.
    ///
    /// A token is live strictly before its `exp` second.
    ///
    /// # Errors
    /// * `TokenExpired` - Token is at or past its expiry
    /// * `InvalidToken` - Token is malformed or forged
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let claims: Claims = self.jwt_handler.decode(token)?;

        // jsonwebtoken only rejects `exp < now`.
        if claims.is_expired(Utc::now().timestamp()) {
            return Err(JwtError::TokenExpired);
        }

        Ok(claims)
    }

    /// Verify a token and require it to be of `kind`.
    ///
    /// # Errors
    /// * `TokenExpired` - Token is past its expiry
    /// * `InvalidToken` - Token is malformed or forged
    /// * `UnexpectedKind` - Token is valid but of another kind
    pub fn verify_kind(&self, token: &str, kind: TokenKind) -> Result<Claims, JwtError> {
        let claims = self.verify(token)?;

        if claims.kind != kind {
            return Err(JwtError::UnexpectedKind {
                expected: kind,
                actual: claims.kind,
            });
        }

        Ok(claims)
    }
}
