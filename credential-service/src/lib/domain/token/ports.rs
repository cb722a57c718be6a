use async_trait::async_trait;

use crate::app::models::AppId;
use crate::token::errors::TokenError;
use crate::token::models::AccessTokenRecord;
use crate::token::models::AuthenticatedIdentity;
use crate::token::models::AuthorizationCode;
use crate::token::models::Code;
use crate::token::models::ExchangeCommand;
use crate::token::models::IssuedPair;
use crate::token::models::RefreshTokenRecord;
use crate::token::models::TokenPair;
use crate::user::models::UserId;

/// Port for the authorization code issuer and token exchange engine.
#[async_trait]
pub trait TokenServicePort: Send + Sync + 'static {
    /// Mint and persist a single-use code binding `user_id` to `app_id`.
    ///
    /// # Errors
    /// * `AppInvalid` - App does not exist
    /// * `DatabaseError` - Database operation failed
    async fn issue_code(&self, user_id: &UserId, app_id: &AppId)
        -> Result<AuthorizationCode, TokenError>;

    /// Authenticate a user by password and issue a code for `app_id`.
    ///
    /// # Errors
    /// * `AppInvalid` - App does not exist
    /// * `InvalidCredentials` - Unknown user or wrong password
    async fn login_with_app(
        &self,
        app_id: &AppId,
        username: &str,
        password: &str,
    ) -> Result<AuthorizationCode, TokenError>;

    /// Convert a grant into a fresh, persisted access/refresh pair.
    ///
    /// # Errors
    /// * `CodeNotFound` / `AuthCodeExpired` - Authorization code grant failures
    /// * `InvalidCredentials` - Password grant failure
    /// * `TokenInvalid` / `TokenExpired` - Refresh grant failures, including reuse
    /// * `AppInvalid` - Unknown app or client credential mismatch
    async fn exchange(&self, command: ExchangeCommand) -> Result<TokenPair, TokenError>;

    /// Resolve a bearer access token to the identity it was issued for.
    ///
    /// # Errors
    /// * `TokenExpired` - Token signature is valid but it expired
    /// * `TokenInvalid` - Token is malformed, forged, of another kind or revoked
    async fn validate(&self, token: &str) -> Result<AuthenticatedIdentity, TokenError>;

    /// Active access token records of a user.
    async fn list_tokens(&self, user_id: &UserId) -> Result<Vec<AccessTokenRecord>, TokenError>;

    /// Sign a user out everywhere: every token pair and pending code of the user is deleted.
    ///
    /// # Returns
    /// Number of deleted records
    async fn revoke_tokens(&self, user_id: &UserId) -> Result<u64, TokenError>;
}

/// Persistence operations for codes and token pairs.
#[async_trait]
pub trait TokenRepository: Send + Sync + 'static {
    async fn insert_code(&self, code: AuthorizationCode) -> Result<(), TokenError>;

    async fn find_code(&self, code: &Code) -> Result<Option<AuthorizationCode>, TokenError>;

    /// Delete `code` and insert `pair` in one transaction.
    ///
    /// # Errors
    /// * `CodeNotFound` - Code was already consumed
    async fn redeem_code(&self, code: &Code, pair: IssuedPair) -> Result<(), TokenError>;

    async fn insert_pair(&self, pair: IssuedPair) -> Result<(), TokenError>;

    async fn find_access_token(&self, token: &str)
        -> Result<Option<AccessTokenRecord>, TokenError>;

    async fn find_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, TokenError>;

    /// Replace the pair owning `refresh_token` with `pair` in one transaction.
    ///
    /// Of several concurrent rotations of the same refresh token at most one
    /// succeeds.
    ///
    /// # Errors
    /// * `TokenInvalid` - Refresh record is already gone
    async fn rotate(&self, refresh_token: &str, pair: IssuedPair) -> Result<(), TokenError>;

    async fn list_access_tokens(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<AccessTokenRecord>, TokenError>;

    /// Delete every code and token record of a user.
    ///
    /// # Returns
    /// Number of deleted records
    async fn revoke_for_user(&self, user_id: &UserId) -> Result<u64, TokenError>;
}
