use std::sync::Arc;

use async_trait::async_trait;
use auth::Audience;
use auth::AuthenticationError;
use auth::Authenticator;
use auth::TokenKind;
use chrono::Duration;
use chrono::Utc;
use subtle::ConstantTimeEq;

use crate::app::models::App;
use crate::app::models::AppId;
use crate::app::ports::AppRepository;
use crate::token::errors::TokenError;
use crate::token::models::AccessTokenRecord;
use crate::token::models::AuthenticatedIdentity;
use crate::token::models::AuthorizationCode;
use crate::token::models::ClientCredentials;
use crate::token::models::Code;
use crate::token::models::ExchangeCommand;
use crate::token::models::Grant;
use crate::token::models::IssuedPair;
use crate::token::models::TokenPair;
use crate::token::ports::TokenRepository;
use crate::token::ports::TokenServicePort;
use crate::user::models::User;
use crate::user::models::UserId;
use crate::user::models::Username;
use crate::user::ports::UserRepository;

/// Authorization code issuer and token exchange engine.
///
/// Stateless apart from the injected repositories and configuration: every
/// validation re-reads the store, and every multi-record change is a single
/// repository call so that it commits or fails as a whole.
pub struct TokenService<UR, AR, TR>
where
    UR: UserRepository,
    AR: AppRepository,
    TR: TokenRepository,
{
    users: Arc<UR>,
    apps: Arc<AR>,
    tokens: Arc<TR>,
    authenticator: Arc<Authenticator>,
    auth_code_ttl: Duration,
}

impl<UR, AR, TR> TokenService<UR, AR, TR>
where
    UR: UserRepository,
    AR: AppRepository,
    TR: TokenRepository,
{
    /// # Arguments
    /// * `users` - User lookup for grants and validation
    /// * `apps` - App lookup for app-scoped grants
    /// * `tokens` - Code and token pair persistence
    /// * `authenticator` - Password verifier and token codec
    /// * `auth_code_ttl` - Lifetime of authorization codes
    pub fn new(
        users: Arc<UR>,
        apps: Arc<AR>,
        tokens: Arc<TR>,
        authenticator: Arc<Authenticator>,
        auth_code_ttl: Duration,
    ) -> Self {
        Self {
            users,
            apps,
            tokens,
            authenticator,
            auth_code_ttl,
        }
    }

    async fn find_app(&self, app_id: &AppId) -> Result<App, TokenError> {
        self.apps
            .find_by_app_id(app_id)
            .await?
            .ok_or(TokenError::AppInvalid)
    }

    /// Check a password against the named user.
    ///
    /// Unknown and malformed usernames still pay for one hash verification.
    async fn authenticate_user(&self, username: &str, password: &str) -> Result<User, TokenError> {
        let user = match Username::new(username.to_string()) {
            Ok(username) => self.users.find_by_username(&username).await?,
            Err(_) => None,
        };

        let stored_hash = user.as_ref().map(|u| u.password_hash.as_str());
        match self.authenticator.authenticate(password, stored_hash) {
            Ok(()) => user.ok_or(TokenError::InvalidCredentials),
            Err(AuthenticationError::InvalidCredentials) => {
                tracing::warn!("Password authentication rejected");
                Err(TokenError::InvalidCredentials)
            }
            Err(AuthenticationError::PasswordError(e)) => Err(TokenError::Internal(e.to_string())),
        }
    }

    /// App-scoped grants must name `app` and carry its secret.
    fn check_client(app: &App, client: Option<&ClientCredentials>) -> Result<(), TokenError> {
        let Some(client) = client else {
            tracing::warn!(app_id = %app.id, "App-scoped grant without client credentials");
            return Err(TokenError::AppInvalid);
        };

        if client.app_id != app.id {
            tracing::warn!(app_id = %app.id, "Client id does not match grant");
            return Err(TokenError::AppInvalid);
        }

        let Some(secret) = client.secret.as_deref() else {
            tracing::warn!(app_id = %app.id, "Client secret missing");
            return Err(TokenError::AppInvalid);
        };

        if !bool::from(secret.as_bytes().ct_eq(app.secret.as_bytes())) {
            tracing::warn!(app_id = %app.id, "Client secret mismatch");
            return Err(TokenError::AppInvalid);
        }

        Ok(())
    }

    /// Sign a new access/refresh pair for `user_id`, scoped to `app_id` or to the user itself.
    fn sign_pair(
        &self,
        user_id: UserId,
        app_id: Option<AppId>,
    ) -> Result<(IssuedPair, TokenPair), TokenError> {
        let audience = match &app_id {
            Some(app_id) => Audience::App(app_id.to_string()),
            None => Audience::SelfIssued,
        };

        let access = self
            .authenticator
            .issue(TokenKind::Access, user_id, audience.clone())?;
        let refresh = self
            .authenticator
            .issue(TokenKind::Refresh, user_id, audience)?;

        let response = TokenPair::new(
            access.token.clone(),
            refresh.token.clone(),
            access.claims.expires_in(access.claims.iat),
        );
        let pair = IssuedPair::new(user_id, app_id, access.token, refresh.token);

        Ok((pair, response))
    }

    async fn exchange_code(
        &self,
        code: &Code,
        client: Option<&ClientCredentials>,
    ) -> Result<TokenPair, TokenError> {
        let authorization = self
            .tokens
            .find_code(code)
            .await?
            .ok_or(TokenError::CodeNotFound)?;

        if authorization.is_expired(self.auth_code_ttl, Utc::now()) {
            tracing::warn!(app_id = %authorization.app_id, "Authorization code expired");
            return Err(TokenError::AuthCodeExpired);
        }

        let user_id = authorization.user_id.ok_or(TokenError::CodeNotFound)?;
        let user = self
            .users
            .find_by_id(&user_id)
            .await?
            .ok_or(TokenError::CodeNotFound)?;
        let app = self.find_app(&authorization.app_id).await?;
        Self::check_client(&app, client)?;

        let (pair, response) = self.sign_pair(user.id, Some(app.id.clone()))?;
        self.tokens.redeem_code(code, pair).await?;

        tracing::info!(user_id = %user.id, app_id = %app.id, "Authorization code exchanged");

        Ok(response)
    }

    async fn exchange_password(
        &self,
        username: &str,
        password: &str,
        client: Option<&ClientCredentials>,
    ) -> Result<TokenPair, TokenError> {
        let app = match client {
            Some(client) => {
                let app = self.find_app(&client.app_id).await?;
                Self::check_client(&app, Some(client))?;
                Some(app)
            }
            None => None,
        };

        let user = self.authenticate_user(username, password).await?;
        let app_id = app.map(|app| app.id);

        let (pair, response) = self.sign_pair(user.id, app_id.clone())?;
        self.tokens.insert_pair(pair).await?;

        tracing::info!(
            user_id = %user.id,
            app_id = app_id.as_ref().map(AppId::as_str).unwrap_or(auth::SELF_AUDIENCE),
            "Password grant exchanged"
        );

        Ok(response)
    }

    async fn exchange_refresh(
        &self,
        refresh_token: &str,
        client: Option<&ClientCredentials>,
    ) -> Result<TokenPair, TokenError> {
        let claims = self
            .authenticator
            .verify_kind(refresh_token, TokenKind::Refresh)?;

        let record = self
            .tokens
            .find_refresh_token(refresh_token)
            .await?
            .ok_or_else(|| {
                tracing::warn!(subject = %claims.sub, "Refresh token already rotated or revoked");
                TokenError::TokenInvalid
            })?;

        if record.user_id.to_string() != claims.sub
            || record.app_id.as_ref().map(AppId::as_str) != claims.aud.app_id()
        {
            return Err(TokenError::TokenInvalid);
        }

        match &record.app_id {
            Some(app_id) => {
                let app = self.find_app(app_id).await?;
                Self::check_client(&app, client)?;
            }
            None if client.is_some() => return Err(TokenError::AppInvalid),
            None => {}
        }

        let (pair, response) = self.sign_pair(record.user_id, record.app_id.clone())?;
        self.tokens.rotate(refresh_token, pair).await?;

        tracing::info!(user_id = %record.user_id, "Token pair rotated");

        Ok(response)
    }
}

#[async_trait]
impl<UR, AR, TR> TokenServicePort for TokenService<UR, AR, TR>
where
    UR: UserRepository,
    AR: AppRepository,
    TR: TokenRepository,
{
    async fn issue_code(
        &self,
        user_id: &UserId,
        app_id: &AppId,
    ) -> Result<AuthorizationCode, TokenError> {
        let app = self.find_app(app_id).await?;

        let code = AuthorizationCode::new(*user_id, app.id);
        self.tokens.insert_code(code.clone()).await?;

        tracing::info!(user_id = %user_id, app_id = %code.app_id, "Authorization code issued");

        Ok(code)
    }

    async fn login_with_app(
        &self,
        app_id: &AppId,
        username: &str,
        password: &str,
    ) -> Result<AuthorizationCode, TokenError> {
        let app = self.find_app(app_id).await?;
        let user = self.authenticate_user(username, password).await?;

        self.issue_code(&user.id, &app.id).await
    }

    async fn exchange(&self, command: ExchangeCommand) -> Result<TokenPair, TokenError> {
        let client = command.client.as_ref();
        tracing::debug!(
            grant_type = command.grant.name(),
            with_client = client.is_some(),
            "Token exchange requested"
        );

        match &command.grant {
            Grant::AuthorizationCode { code } => self.exchange_code(code, client).await,
            Grant::Password { username, password } => {
                self.exchange_password(username, password, client).await
            }
            Grant::RefreshToken { refresh_token } => {
                self.exchange_refresh(refresh_token, client).await
            }
        }
    }

    async fn validate(&self, token: &str) -> Result<AuthenticatedIdentity, TokenError> {
        let claims = self.authenticator.verify_kind(token, TokenKind::Access)?;

        let record = self
            .tokens
            .find_access_token(token)
            .await?
            .ok_or(TokenError::TokenInvalid)?;

        let audience_matches = match (&record.app_id, &claims.aud) {
            (None, Audience::SelfIssued) => true,
            (Some(app_id), Audience::App(audience)) => app_id.as_str() == audience,
            _ => false,
        };
        if !audience_matches || record.user_id.to_string() != claims.sub {
            tracing::warn!(token_id = %record.id, "Access token does not match its record");
            return Err(TokenError::TokenInvalid);
        }

        let user = self
            .users
            .find_by_id(&record.user_id)
            .await?
            .ok_or(TokenError::TokenInvalid)?;

        Ok(AuthenticatedIdentity {
            user,
            audience: claims.aud,
            token_id: record.id,
        })
    }

    async fn list_tokens(&self, user_id: &UserId) -> Result<Vec<AccessTokenRecord>, TokenError> {
        self.tokens.list_access_tokens(user_id).await
    }

    async fn revoke_tokens(&self, user_id: &UserId) -> Result<u64, TokenError> {
        let revoked = self.tokens.revoke_for_user(user_id).await?;

        tracing::info!(user_id = %user_id, revoked, "User credentials revoked");

        Ok(revoked)
    }
}
