//! Store tests against a real PostgreSQL instance.
//!
//! Run with `cargo test -- --ignored` and `DATABASE_URL` pointing at a server
//! where the test role may create databases.

mod common;

use std::sync::Arc;

use chrono::Utc;
use common::TestDb;
use credential_service::app::errors::AppError;
use credential_service::app::models::AppName;
use credential_service::app::models::CallbackUrl;
use credential_service::app::models::CreateAppCommand;
use credential_service::app::ports::AppServicePort;
use credential_service::app::service::AppService;
use credential_service::repositories::PostgresAppRepository;
use credential_service::repositories::PostgresTokenRepository;
use credential_service::repositories::PostgresUserRepository;
use credential_service::token::errors::TokenError;
use credential_service::token::models::AuthorizationCode;
use credential_service::token::models::ClientCredentials;
use credential_service::token::models::Code;
use credential_service::token::models::ExchangeCommand;
use credential_service::token::models::Grant;
use credential_service::token::models::TokenPair;
use credential_service::token::ports::TokenRepository;
use credential_service::token::ports::TokenServicePort;
use credential_service::token::service::TokenService;
use credential_service::user::errors::UserError;
use credential_service::user::models::ChangePasswordCommand;
use credential_service::user::models::CreateUserCommand;
use credential_service::user::models::Password;
use credential_service::user::models::User;
use credential_service::user::models::Username;
use credential_service::user::ports::UserServicePort;
use credential_service::user::service::UserService;

struct PgEngine {
    _db: TestDb,
    tokens_repo: Arc<PostgresTokenRepository>,
    users: UserService<PostgresUserRepository>,
    apps: AppService<PostgresAppRepository>,
    tokens: TokenService<PostgresUserRepository, PostgresAppRepository, PostgresTokenRepository>,
}

impl PgEngine {
    async fn new() -> Self {
        let db = TestDb::new().await;
        let authenticator = common::test_authenticator();
        let users_repo = Arc::new(PostgresUserRepository::new(db.pool.clone()));
        let apps_repo = Arc::new(PostgresAppRepository::new(db.pool.clone()));
        let tokens_repo = Arc::new(PostgresTokenRepository::new(db.pool.clone()));

        Self {
            users: UserService::new(Arc::clone(&users_repo)),
            apps: AppService::new(Arc::clone(&apps_repo), Arc::clone(&authenticator)),
            tokens: TokenService::new(
                users_repo,
                apps_repo,
                Arc::clone(&tokens_repo),
                authenticator,
                common::auth_code_ttl(),
            ),
            tokens_repo,
            _db: db,
        }
    }

    async fn register(&self, username: &str, password: &str) -> User {
        self.users
            .create_user(CreateUserCommand::new(
                Username::new(username.to_string()).unwrap(),
                Password::new(password.to_string()).unwrap(),
            ))
            .await
            .unwrap()
    }

    async fn login(&self, username: &str, password: &str) -> TokenPair {
        self.tokens
            .exchange(ExchangeCommand::new(Grant::Password {
                username: username.to_string(),
                password: password.to_string(),
            }))
            .await
            .unwrap()
    }
}

fn refresh_grant(pair: &TokenPair) -> ExchangeCommand {
    ExchangeCommand::new(Grant::RefreshToken {
        refresh_token: pair.refresh_token.clone(),
    })
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_duplicate_username_is_rejected() {
    let engine = PgEngine::new().await;
    engine.register("alice", "pw1").await;

    let result = engine
        .users
        .create_user(CreateUserCommand::new(
            Username::new("alice".to_string()).unwrap(),
            Password::new("pw2".to_string()).unwrap(),
        ))
        .await;

    assert!(matches!(result, Err(UserError::UsernameAlreadyExists(_))));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_refresh_rotation_is_single_use() {
    let engine = PgEngine::new().await;
    engine.register("alice", "pw1").await;
    let pair = engine.login("alice", "pw1").await;

    let rotated = engine.tokens.exchange(refresh_grant(&pair)).await.unwrap();
    assert!(engine.tokens.validate(&rotated.access_token).await.is_ok());

    let result = engine.tokens.exchange(refresh_grant(&pair)).await;
    assert!(matches!(result, Err(TokenError::TokenInvalid)));
    let result = engine.tokens.validate(&pair.access_token).await;
    assert!(matches!(result, Err(TokenError::TokenInvalid)));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_change_password_revokes_in_one_transaction() {
    let engine = PgEngine::new().await;
    let alice = engine.register("alice", "pw1").await;
    let pair = engine.login("alice", "pw1").await;

    engine
        .users
        .change_password(
            &alice.id,
            ChangePasswordCommand {
                old_password: "pw1".to_string(),
                new_password: Password::new("pw2".to_string()).unwrap(),
            },
        )
        .await
        .unwrap();

    let result = engine.tokens.validate(&pair.access_token).await;
    assert!(matches!(result, Err(TokenError::TokenInvalid)));
    assert!(engine
        .tokens_repo
        .list_access_tokens(&alice.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_code_round_trip_and_redemption() {
    let engine = PgEngine::new().await;
    let alice = engine.register("alice", "pw1").await;
    let demo = engine
        .apps
        .create_app(CreateAppCommand::new(
            AppName::new("Demo".to_string()).unwrap(),
            CallbackUrl::new("https://demo.example.com/cb".to_string()).unwrap(),
            alice.id,
        ))
        .await
        .unwrap();

    let code = AuthorizationCode {
        code: Code::generate(),
        user_id: Some(alice.id),
        app_id: demo.id.clone(),
        created_at: Utc::now(),
    };
    engine.tokens_repo.insert_code(code.clone()).await.unwrap();

    let stored = engine.tokens_repo.find_code(&code.code).await.unwrap();
    assert_eq!(stored.map(|c| c.app_id), Some(demo.id.clone()));

    let grant = ExchangeCommand::new(Grant::AuthorizationCode {
        code: code.code.clone(),
    })
    .with_client(ClientCredentials {
        app_id: demo.id.clone(),
        secret: Some(demo.secret.clone()),
    });
    assert!(engine.tokens.exchange(grant.clone()).await.is_ok());
    let result = engine.tokens.exchange(grant).await;
    assert!(matches!(result, Err(TokenError::CodeNotFound)));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_remove_app_checks_owner_and_revokes() {
    let engine = PgEngine::new().await;
    let alice = engine.register("alice", "pw1").await;
    let bob = engine.register("bob", "pw2").await;
    let demo = engine
        .apps
        .create_app(CreateAppCommand::new(
            AppName::new("Demo".to_string()).unwrap(),
            CallbackUrl::new("https://demo.example.com/cb".to_string()).unwrap(),
            alice.id,
        ))
        .await
        .unwrap();

    let code = engine.tokens.issue_code(&alice.id, &demo.id).await.unwrap();
    let pair = engine
        .tokens
        .exchange(
            ExchangeCommand::new(Grant::AuthorizationCode { code: code.code }).with_client(
                ClientCredentials {
                    app_id: demo.id.clone(),
                    secret: Some(demo.secret.clone()),
                },
            ),
        )
        .await
        .unwrap();

    let result = engine.apps.remove_app(&demo.id, &bob.id).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    engine.apps.remove_app(&demo.id, &alice.id).await.unwrap();

    let result = engine.tokens.validate(&pair.access_token).await;
    assert!(matches!(result, Err(TokenError::TokenInvalid)));
}
