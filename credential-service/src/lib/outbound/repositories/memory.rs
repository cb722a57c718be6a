use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::app::errors::AppError;
use crate::app::models::App;
use crate::app::models::AppId;
use crate::app::ports::AppRepository;
use crate::token::errors::TokenError;
use crate::token::models::AccessTokenRecord;
use crate::token::models::AuthorizationCode;
use crate::token::models::Code;
use crate::token::models::IssuedPair;
use crate::token::models::RefreshTokenRecord;
use crate::token::ports::TokenRepository;
use crate::user::errors::UserError;
use crate::user::models::User;
use crate::user::models::UserId;
use crate::user::models::Username;
use crate::user::ports::UserRepository;

/// Credential store kept in process memory.
///
/// One lock guards every table, and each port method holds it for its whole
/// duration, so multi-record changes are all-or-nothing and concurrent
/// rotations of one refresh token serialize.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    state: RwLock<StoreState>,
}

#[derive(Default)]
struct StoreState {
    users: HashMap<UserId, User>,
    apps: HashMap<AppId, App>,
    codes: HashMap<Code, AuthorizationCode>,
    access_tokens: HashMap<String, AccessTokenRecord>,
    refresh_tokens: HashMap<String, RefreshTokenRecord>,
}

impl StoreState {
    fn insert_pair(&mut self, pair: IssuedPair) {
        self.access_tokens
            .insert(pair.access.token.clone(), pair.access);
        self.refresh_tokens
            .insert(pair.refresh.token.clone(), pair.refresh);
    }

    fn revoke_where<F>(&mut self, user_matches: F, app_matches: impl Fn(&AppId) -> bool) -> u64
    where
        F: Fn(&UserId) -> bool,
    {
        let before = self.codes.len() + self.access_tokens.len() + self.refresh_tokens.len();

        self.codes.retain(|_, code| {
            !(code.user_id.as_ref().is_some_and(&user_matches) || app_matches(&code.app_id))
        });
        self.access_tokens.retain(|_, record| {
            !(user_matches(&record.user_id) || record.app_id.as_ref().is_some_and(&app_matches))
        });
        self.refresh_tokens.retain(|_, record| {
            !(user_matches(&record.user_id) || record.app_id.as_ref().is_some_and(&app_matches))
        });

        let after = self.codes.len() + self.access_tokens.len() + self.refresh_tokens.len();
        (before - after) as u64
    }

    fn revoke_user(&mut self, user_id: &UserId) -> u64 {
        self.revoke_where(|id| id == user_id, |_| false)
    }

    fn revoke_app(&mut self, app_id: &AppId) -> u64 {
        self.revoke_where(|_| false, |id| id == app_id)
    }
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryCredentialStore {
    async fn create(&self, user: User) -> Result<User, UserError> {
        let mut state = self.state.write().await;

        if state.users.values().any(|u| u.username == user.username) {
            return Err(UserError::UsernameAlreadyExists(
                user.username.as_str().to_string(),
            ));
        }

        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError> {
        Ok(self.state.read().await.users.get(id).cloned())
    }

    async fn find_by_username(&self, username: &Username) -> Result<Option<User>, UserError> {
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|u| &u.username == username)
            .cloned())
    }

    async fn update_password_and_revoke(
        &self,
        id: &UserId,
        password_hash: &str,
    ) -> Result<u64, UserError> {
        let mut state = self.state.write().await;

        let user = state
            .users
            .get_mut(id)
            .ok_or_else(|| UserError::NotFound(id.to_string()))?;
        user.password_hash = password_hash.to_string();

        Ok(state.revoke_user(id))
    }

    async fn delete(&self, id: &UserId) -> Result<(), UserError> {
        let mut state = self.state.write().await;

        if state.users.remove(id).is_none() {
            return Err(UserError::NotFound(id.to_string()));
        }

        let owned: Vec<AppId> = state
            .apps
            .values()
            .filter(|app| app.is_owned_by(id))
            .map(|app| app.id.clone())
            .collect();

        state.revoke_where(|user| user == id, |app| owned.contains(app));
        for app_id in &owned {
            state.apps.remove(app_id);
        }

        Ok(())
    }
}

#[async_trait]
impl AppRepository for InMemoryCredentialStore {
    async fn create(&self, app: App) -> Result<App, AppError> {
        self.state
            .write()
            .await
            .apps
            .insert(app.id.clone(), app.clone());
        Ok(app)
    }

    async fn find_by_app_id(&self, app_id: &AppId) -> Result<Option<App>, AppError> {
        Ok(self.state.read().await.apps.get(app_id).cloned())
    }

    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<App>, AppError> {
        let state = self.state.read().await;

        let mut apps: Vec<App> = state
            .apps
            .values()
            .filter(|app| app.is_owned_by(owner))
            .cloned()
            .collect();
        apps.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(apps)
    }

    async fn delete_owned(&self, app_id: &AppId, owner: &UserId) -> Result<u64, AppError> {
        let mut state = self.state.write().await;

        match state.apps.get(app_id) {
            Some(app) if app.is_owned_by(owner) => {}
            _ => return Err(AppError::NotFound(app_id.to_string())),
        }

        let revoked = state.revoke_app(app_id);
        state.apps.remove(app_id);

        Ok(revoked)
    }
}

#[async_trait]
impl TokenRepository for InMemoryCredentialStore {
    async fn insert_code(&self, code: AuthorizationCode) -> Result<(), TokenError> {
        self.state
            .write()
            .await
            .codes
            .insert(code.code.clone(), code);
        Ok(())
    }

    async fn find_code(&self, code: &Code) -> Result<Option<AuthorizationCode>, TokenError> {
        Ok(self.state.read().await.codes.get(code).cloned())
    }

    async fn redeem_code(&self, code: &Code, pair: IssuedPair) -> Result<(), TokenError> {
        let mut state = self.state.write().await;

        if state.codes.remove(code).is_none() {
            return Err(TokenError::CodeNotFound);
        }
        state.insert_pair(pair);

        Ok(())
    }

    async fn insert_pair(&self, pair: IssuedPair) -> Result<(), TokenError> {
        self.state.write().await.insert_pair(pair);
        Ok(())
    }

    async fn find_access_token(
        &self,
        token: &str,
    ) -> Result<Option<AccessTokenRecord>, TokenError> {
        Ok(self.state.read().await.access_tokens.get(token).cloned())
    }

    async fn find_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, TokenError> {
        Ok(self.state.read().await.refresh_tokens.get(token).cloned())
    }

    async fn rotate(&self, refresh_token: &str, pair: IssuedPair) -> Result<(), TokenError> {
        let mut state = self.state.write().await;

        let consumed = state
            .refresh_tokens
            .remove(refresh_token)
            .ok_or(TokenError::TokenInvalid)?;
        state
            .access_tokens
            .retain(|_, record| record.id != consumed.access_token_id);
        state.insert_pair(pair);

        Ok(())
    }

    async fn list_access_tokens(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<AccessTokenRecord>, TokenError> {
        let state = self.state.read().await;

        let mut tokens: Vec<AccessTokenRecord> = state
            .access_tokens
            .values()
            .filter(|record| &record.user_id == user_id)
            .cloned()
            .collect();
        tokens.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(tokens)
    }

    async fn revoke_for_user(&self, user_id: &UserId) -> Result<u64, TokenError> {
        Ok(self.state.write().await.revoke_user(user_id))
    }
}
