mod common;

use std::sync::Arc;

use auth::Audience;
use auth::Authenticator;
use auth::TokenSettings;
use chrono::Duration;
use chrono::Utc;
use common::TestEngine;
use credential_service::app::errors::AppError;
use credential_service::app::models::App;
use credential_service::app::models::AppId;
use credential_service::app::models::AppName;
use credential_service::app::models::CallbackUrl;
use credential_service::app::models::CreateAppCommand;
use credential_service::app::ports::AppRepository;
use credential_service::app::ports::AppServicePort;
use credential_service::token::errors::TokenError;
use credential_service::token::models::AuthorizationCode;
use credential_service::token::models::ClientCredentials;
use credential_service::token::models::Code;
use credential_service::token::models::ExchangeCommand;
use credential_service::token::models::Grant;
use credential_service::token::models::TokenPair;
use credential_service::token::ports::TokenRepository;
use credential_service::token::ports::TokenServicePort;
use credential_service::user::errors::UserError;
use credential_service::user::models::ChangePasswordCommand;
use credential_service::user::models::CreateUserCommand;
use credential_service::user::models::Password;
use credential_service::user::models::User;
use credential_service::user::models::Username;
use credential_service::user::ports::UserServicePort;

async fn register(engine: &TestEngine, username: &str, password: &str) -> User {
    engine
        .users
        .create_user(CreateUserCommand::new(
            Username::new(username.to_string()).unwrap(),
            Password::new(password.to_string()).unwrap(),
        ))
        .await
        .unwrap()
}

async fn register_app(engine: &TestEngine, owner: &User, name: &str) -> App {
    engine
        .apps
        .create_app(CreateAppCommand::new(
            AppName::new(name.to_string()).unwrap(),
            CallbackUrl::new("https://demo.example.com/cb".to_string()).unwrap(),
            owner.id,
        ))
        .await
        .unwrap()
}

fn password_grant(username: &str, password: &str) -> ExchangeCommand {
    ExchangeCommand::new(Grant::Password {
        username: username.to_string(),
        password: password.to_string(),
    })
}

fn code_grant(code: &Code) -> ExchangeCommand {
    ExchangeCommand::new(Grant::AuthorizationCode { code: code.clone() })
}

fn refresh_grant(pair: &TokenPair) -> ExchangeCommand {
    ExchangeCommand::new(Grant::RefreshToken {
        refresh_token: pair.refresh_token.clone(),
    })
}

fn client_of(app: &App) -> ClientCredentials {
    ClientCredentials {
        app_id: app.id.clone(),
        secret: Some(app.secret.clone()),
    }
}

#[tokio::test]
async fn test_password_grant_issues_self_scoped_pair() {
    let engine = TestEngine::new();
    let alice = register(&engine, "alice", "pw1").await;

    let pair = engine
        .tokens
        .exchange(password_grant("alice", "pw1"))
        .await
        .unwrap();

    assert_eq!(pair.token_type, "Bearer");
    assert_eq!(pair.expires_in, 15 * 60);
    assert_ne!(pair.access_token, pair.refresh_token);

    let identity = engine.tokens.validate(&pair.access_token).await.unwrap();
    assert_eq!(identity.user.id, alice.id);
    assert_eq!(identity.audience, Audience::SelfIssued);
}

#[tokio::test]
async fn test_password_grant_rejects_mutated_passwords() {
    let engine = TestEngine::new();
    register(&engine, "alice", "pw1").await;

    for wrong in ["pw2", "Pw1", "pw", "pw11"] {
        let result = engine.tokens.exchange(password_grant("alice", wrong)).await;
        assert!(
            matches!(result, Err(TokenError::InvalidCredentials)),
            "password {wrong:?} must be rejected"
        );
    }
}

#[tokio::test]
async fn test_password_grant_unknown_user_matches_wrong_password() {
    let engine = TestEngine::new();
    register(&engine, "alice", "pw1").await;

    let unknown = engine
        .tokens
        .exchange(password_grant("mallory", "pw1"))
        .await
        .unwrap_err();
    let wrong = engine
        .tokens
        .exchange(password_grant("alice", "nope"))
        .await
        .unwrap_err();

    assert_eq!(unknown.code(), wrong.code());
    assert_eq!(unknown.to_string(), wrong.to_string());
}

#[tokio::test]
async fn test_change_password_revokes_outstanding_tokens() {
    let engine = TestEngine::new();
    let alice = register(&engine, "alice", "pw1").await;

    let pair = engine
        .tokens
        .exchange(password_grant("alice", "pw1"))
        .await
        .unwrap();
    assert!(engine.tokens.validate(&pair.access_token).await.is_ok());

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

    let result = engine.tokens.exchange(refresh_grant(&pair)).await;
    assert!(matches!(result, Err(TokenError::TokenInvalid)));

    let result = engine.tokens.exchange(password_grant("alice", "pw1")).await;
    assert!(matches!(result, Err(TokenError::InvalidCredentials)));

    let fresh = engine
        .tokens
        .exchange(password_grant("alice", "pw2"))
        .await
        .unwrap();
    assert!(engine.tokens.validate(&fresh.access_token).await.is_ok());
}

#[tokio::test]
async fn test_change_password_with_wrong_old_password_keeps_tokens() {
    let engine = TestEngine::new();
    let alice = register(&engine, "alice", "pw1").await;
    let pair = engine
        .tokens
        .exchange(password_grant("alice", "pw1"))
        .await
        .unwrap();

    let result = engine
        .users
        .change_password(
            &alice.id,
            ChangePasswordCommand {
                old_password: "wrong".to_string(),
                new_password: Password::new("pw2".to_string()).unwrap(),
            },
        )
        .await;

    assert!(matches!(result, Err(UserError::InvalidCredentials)));
    assert!(engine.tokens.validate(&pair.access_token).await.is_ok());
}

#[tokio::test]
async fn test_access_token_expires_at_its_exp_second() {
    let authenticator = Arc::new(Authenticator::new(TokenSettings::new(
        common::TEST_SECRET,
        common::TEST_ISSUER,
        Duration::zero(),
        Duration::days(30),
        Duration::days(365),
    )));
    let engine = TestEngine::with_authenticator(authenticator);
    register(&engine, "alice", "pw1").await;

    let pair = engine
        .tokens
        .exchange(password_grant("alice", "pw1"))
        .await
        .unwrap();
    assert_eq!(pair.expires_in, 0);

    let result = engine.tokens.validate(&pair.access_token).await;
    assert!(matches!(result, Err(TokenError::TokenExpired)));

    // The refresh token outlives its access token.
    assert!(engine.tokens.exchange(refresh_grant(&pair)).await.is_ok());
}

#[tokio::test]
async fn test_code_flow_with_refresh_rotation() {
    let engine = TestEngine::new();
    let alice = register(&engine, "alice", "pw1").await;
    let demo = register_app(&engine, &alice, "Demo").await;

    let code = engine
        .tokens
        .login_with_app(&demo.id, "alice", "pw1")
        .await
        .unwrap();
    let first = engine
        .tokens
        .exchange(code_grant(&code.code).with_client(client_of(&demo)))
        .await
        .unwrap();

    let identity = engine.tokens.validate(&first.access_token).await.unwrap();
    assert_eq!(identity.user.id, alice.id);
    assert_eq!(identity.audience, Audience::App(demo.id.to_string()));

    let second = engine
        .tokens
        .exchange(refresh_grant(&first).with_client(client_of(&demo)))
        .await
        .unwrap();
    let identity = engine.tokens.validate(&second.access_token).await.unwrap();
    assert_eq!(identity.audience, Audience::App(demo.id.to_string()));

    // The rotated pair is gone, access token included.
    let result = engine
        .tokens
        .exchange(refresh_grant(&first).with_client(client_of(&demo)))
        .await;
    assert!(matches!(result, Err(TokenError::TokenInvalid)));
    let result = engine.tokens.validate(&first.access_token).await;
    assert!(matches!(result, Err(TokenError::TokenInvalid)));
}

#[tokio::test]
async fn test_code_is_single_use() {
    let engine = TestEngine::new();
    let alice = register(&engine, "alice", "pw1").await;
    let demo = register_app(&engine, &alice, "Demo").await;

    let code = engine.tokens.issue_code(&alice.id, &demo.id).await.unwrap();
    let grant = code_grant(&code.code).with_client(client_of(&demo));
    engine.tokens.exchange(grant.clone()).await.unwrap();

    let result = engine.tokens.exchange(grant).await;
    assert!(matches!(result, Err(TokenError::CodeNotFound)));
}

#[tokio::test]
async fn test_unknown_code_is_rejected() {
    let engine = TestEngine::new();

    let result = engine
        .tokens
        .exchange(code_grant(&Code::new("does-not-exist")))
        .await;

    assert!(matches!(result, Err(TokenError::CodeNotFound)));
}

#[tokio::test]
async fn test_code_expiry_boundary() {
    let engine = TestEngine::new();
    let alice = register(&engine, "alice", "pw1").await;
    let demo = register_app(&engine, &alice, "Demo").await;
    let ttl = common::auth_code_ttl();

    let fresh_enough = AuthorizationCode {
        code: Code::generate(),
        user_id: Some(alice.id),
        app_id: demo.id.clone(),
        created_at: Utc::now() - (ttl - Duration::seconds(1)),
    };
    let too_old = AuthorizationCode {
        code: Code::generate(),
        user_id: Some(alice.id),
        app_id: demo.id.clone(),
        created_at: Utc::now() - (ttl + Duration::seconds(1)),
    };
    engine.store.insert_code(fresh_enough.clone()).await.unwrap();
    engine.store.insert_code(too_old.clone()).await.unwrap();

    let result = engine
        .tokens
        .exchange(code_grant(&fresh_enough.code).with_client(client_of(&demo)))
        .await;
    assert!(result.is_ok());

    let result = engine
        .tokens
        .exchange(code_grant(&too_old.code).with_client(client_of(&demo)))
        .await;
    assert!(matches!(result, Err(TokenError::AuthCodeExpired)));
}

#[tokio::test]
async fn test_legacy_code_without_user_is_rejected() {
    let engine = TestEngine::new();
    let alice = register(&engine, "alice", "pw1").await;
    let demo = register_app(&engine, &alice, "Demo").await;

    let legacy = AuthorizationCode {
        code: Code::generate(),
        user_id: None,
        app_id: demo.id.clone(),
        created_at: Utc::now(),
    };
    engine.store.insert_code(legacy.clone()).await.unwrap();

    let result = engine.tokens.exchange(code_grant(&legacy.code)).await;
    assert!(matches!(result, Err(TokenError::CodeNotFound)));
}

#[tokio::test]
async fn test_code_for_unknown_app_is_rejected() {
    let engine = TestEngine::new();
    let alice = register(&engine, "alice", "pw1").await;

    let result = engine
        .tokens
        .issue_code(&alice.id, &AppId::new("missing"))
        .await;
    assert!(matches!(result, Err(TokenError::AppInvalid)));

    let result = engine
        .tokens
        .login_with_app(&AppId::new("missing"), "alice", "pw1")
        .await;
    assert!(matches!(result, Err(TokenError::AppInvalid)));
}

#[tokio::test]
async fn test_client_credentials_must_match_the_grant() {
    let engine = TestEngine::new();
    let alice = register(&engine, "alice", "pw1").await;
    let demo = register_app(&engine, &alice, "Demo").await;
    let other = register_app(&engine, &alice, "Other").await;

    let code = engine.tokens.issue_code(&alice.id, &demo.id).await.unwrap();
    let result = engine
        .tokens
        .exchange(code_grant(&code.code).with_client(ClientCredentials {
            app_id: demo.id.clone(),
            secret: Some(other.secret.clone()),
        }))
        .await;
    assert!(matches!(result, Err(TokenError::AppInvalid)));

    let result = engine
        .tokens
        .exchange(code_grant(&code.code).with_client(ClientCredentials {
            app_id: other.id.clone(),
            secret: Some(other.secret.clone()),
        }))
        .await;
    assert!(matches!(result, Err(TokenError::AppInvalid)));

    let pair = engine
        .tokens
        .exchange(code_grant(&code.code).with_client(ClientCredentials {
            app_id: demo.id.clone(),
            secret: Some(demo.secret.clone()),
        }))
        .await
        .unwrap();
    let identity = engine.tokens.validate(&pair.access_token).await.unwrap();
    assert_eq!(identity.audience, Audience::App(demo.id.to_string()));
}

#[tokio::test]
async fn test_code_exchange_requires_the_app_secret() {
    let engine = TestEngine::new();
    let alice = register(&engine, "alice", "pw1").await;
    let demo = register_app(&engine, &alice, "Demo").await;
    let code = engine.tokens.issue_code(&alice.id, &demo.id).await.unwrap();

    let result = engine.tokens.exchange(code_grant(&code.code)).await;
    assert!(matches!(result, Err(TokenError::AppInvalid)));

    let result = engine
        .tokens
        .exchange(code_grant(&code.code).with_client(ClientCredentials {
            app_id: demo.id.clone(),
            secret: None,
        }))
        .await;
    assert!(matches!(result, Err(TokenError::AppInvalid)));

    // Rejected attempts leave the code redeemable by the real client.
    let result = engine
        .tokens
        .exchange(code_grant(&code.code).with_client(client_of(&demo)))
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_app_scoped_refresh_requires_the_app_secret() {
    let engine = TestEngine::new();
    let alice = register(&engine, "alice", "pw1").await;
    let demo = register_app(&engine, &alice, "Demo").await;
    let code = engine.tokens.issue_code(&alice.id, &demo.id).await.unwrap();
    let pair = engine
        .tokens
        .exchange(code_grant(&code.code).with_client(client_of(&demo)))
        .await
        .unwrap();

    let result = engine.tokens.exchange(refresh_grant(&pair)).await;
    assert!(matches!(result, Err(TokenError::AppInvalid)));

    let result = engine
        .tokens
        .exchange(refresh_grant(&pair).with_client(ClientCredentials {
            app_id: demo.id.clone(),
            secret: None,
        }))
        .await;
    assert!(matches!(result, Err(TokenError::AppInvalid)));

    // The self-scoped refresh grant stays secret-free.
    let self_pair = engine
        .tokens
        .exchange(password_grant("alice", "pw1"))
        .await
        .unwrap();
    assert!(engine.tokens.exchange(refresh_grant(&self_pair)).await.is_ok());

    assert!(engine
        .tokens
        .exchange(refresh_grant(&pair).with_client(client_of(&demo)))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_password_grant_with_client_requires_the_app_secret() {
    let engine = TestEngine::new();
    let alice = register(&engine, "alice", "pw1").await;
    let demo = register_app(&engine, &alice, "Demo").await;

    let result = engine
        .tokens
        .exchange(
            password_grant("alice", "pw1").with_client(ClientCredentials {
                app_id: demo.id.clone(),
                secret: None,
            }),
        )
        .await;
    assert!(matches!(result, Err(TokenError::AppInvalid)));
}

#[tokio::test]
async fn test_password_grant_with_client_is_app_scoped() {
    let engine = TestEngine::new();
    let alice = register(&engine, "alice", "pw1").await;
    let demo = register_app(&engine, &alice, "Demo").await;

    let pair = engine
        .tokens
        .exchange(
            password_grant("alice", "pw1").with_client(ClientCredentials {
                app_id: demo.id.clone(),
                secret: Some(demo.secret.clone()),
            }),
        )
        .await
        .unwrap();

    let identity = engine.tokens.validate(&pair.access_token).await.unwrap();
    assert_eq!(identity.audience, Audience::App(demo.id.to_string()));
}

#[tokio::test]
async fn test_access_token_is_not_a_refresh_token() {
    let engine = TestEngine::new();
    register(&engine, "alice", "pw1").await;
    let pair = engine
        .tokens
        .exchange(password_grant("alice", "pw1"))
        .await
        .unwrap();

    let result = engine
        .tokens
        .exchange(ExchangeCommand::new(Grant::RefreshToken {
            refresh_token: pair.access_token.clone(),
        }))
        .await;
    assert!(matches!(result, Err(TokenError::TokenInvalid)));

    let result = engine.tokens.validate(&pair.refresh_token).await;
    assert!(matches!(result, Err(TokenError::TokenInvalid)));
}

#[tokio::test]
async fn test_app_secret_is_not_an_access_token() {
    let engine = TestEngine::new();
    let alice = register(&engine, "alice", "pw1").await;
    let demo = register_app(&engine, &alice, "Demo").await;

    let result = engine.tokens.validate(&demo.secret).await;
    assert!(matches!(result, Err(TokenError::TokenInvalid)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_refresh_rotates_once() {
    let engine = TestEngine::new();
    register(&engine, "alice", "pw1").await;
    let pair = engine
        .tokens
        .exchange(password_grant("alice", "pw1"))
        .await
        .unwrap();

    let tokens = Arc::new(engine.tokens);
    let first = tokio::spawn({
        let tokens = Arc::clone(&tokens);
        let command = refresh_grant(&pair);
        async move { tokens.exchange(command).await }
    });
    let second = tokio::spawn({
        let tokens = Arc::clone(&tokens);
        let command = refresh_grant(&pair);
        async move { tokens.exchange(command).await }
    });

    let (first, second) = futures::future::join(first, second).await;
    let results = [first.unwrap(), second.unwrap()];

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 1, "exactly one rotation must win: {results:?}");
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(TokenError::TokenInvalid))));
}

#[tokio::test]
async fn test_remove_app_revokes_its_tokens() {
    let engine = TestEngine::new();
    let alice = register(&engine, "alice", "pw1").await;
    let demo = register_app(&engine, &alice, "Demo").await;

    let code = engine.tokens.issue_code(&alice.id, &demo.id).await.unwrap();
    let app_pair = engine
        .tokens
        .exchange(code_grant(&code.code).with_client(client_of(&demo)))
        .await
        .unwrap();
    let self_pair = engine
        .tokens
        .exchange(password_grant("alice", "pw1"))
        .await
        .unwrap();

    engine.apps.remove_app(&demo.id, &alice.id).await.unwrap();

    let result = engine.tokens.validate(&app_pair.access_token).await;
    assert!(matches!(result, Err(TokenError::TokenInvalid)));
    let result = engine
        .tokens
        .exchange(refresh_grant(&app_pair).with_client(client_of(&demo)))
        .await;
    assert!(matches!(result, Err(TokenError::TokenInvalid)));

    assert!(engine.tokens.validate(&self_pair.access_token).await.is_ok());
}

#[tokio::test]
async fn test_remove_app_requires_ownership() {
    let engine = TestEngine::new();
    let alice = register(&engine, "alice", "pw1").await;
    let bob = register(&engine, "bob", "pw2").await;
    let demo = register_app(&engine, &alice, "Demo").await;

    let result = engine.apps.remove_app(&demo.id, &bob.id).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    assert!(engine.apps.get_app(&demo.id).await.is_ok());
}

#[tokio::test]
async fn test_ownerless_app_is_usable_but_unmanaged() {
    let engine = TestEngine::new();
    let alice = register(&engine, "alice", "pw1").await;

    let legacy = engine
        .store
        .create(App {
            id: AppId::generate(),
            name: AppName::new("Legacy".to_string()).unwrap(),
            callback: CallbackUrl::new("https://legacy.example.com/cb".to_string()).unwrap(),
            secret: "legacy-secret".to_string(),
            owner: None,
            created_at: Utc::now(),
        })
        .await
        .unwrap();

    assert!(engine.apps.list_apps(&alice.id).await.unwrap().is_empty());
    let result = engine.apps.remove_app(&legacy.id, &alice.id).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    let code = engine
        .tokens
        .login_with_app(&legacy.id, "alice", "pw1")
        .await
        .unwrap();
    assert!(engine
        .tokens
        .exchange(code_grant(&code.code).with_client(client_of(&legacy)))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_delete_user_revokes_everything() {
    let engine = TestEngine::new();
    let alice = register(&engine, "alice", "pw1").await;
    let demo = register_app(&engine, &alice, "Demo").await;
    let pair = engine
        .tokens
        .exchange(password_grant("alice", "pw1"))
        .await
        .unwrap();

    engine.users.delete_user(&alice.id).await.unwrap();

    let result = engine.tokens.validate(&pair.access_token).await;
    assert!(matches!(result, Err(TokenError::TokenInvalid)));
    let result = engine.apps.get_app(&demo.id).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    let result = engine.tokens.exchange(password_grant("alice", "pw1")).await;
    assert!(matches!(result, Err(TokenError::InvalidCredentials)));
}

#[tokio::test]
async fn test_list_tokens_shows_active_tokens_only() {
    let engine = TestEngine::new();
    let alice = register(&engine, "alice", "pw1").await;
    let demo = register_app(&engine, &alice, "Demo").await;

    let self_pair = engine
        .tokens
        .exchange(password_grant("alice", "pw1"))
        .await
        .unwrap();
    let code = engine.tokens.issue_code(&alice.id, &demo.id).await.unwrap();
    engine
        .tokens
        .exchange(code_grant(&code.code).with_client(client_of(&demo)))
        .await
        .unwrap();

    let listed = engine.tokens.list_tokens(&alice.id).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().any(|t| t.app_id.as_ref() == Some(&demo.id)));

    engine.tokens.exchange(refresh_grant(&self_pair)).await.unwrap();
    engine.apps.remove_app(&demo.id, &alice.id).await.unwrap();

    let listed = engine.tokens.list_tokens(&alice.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].app_id.is_none());
    assert_ne!(listed[0].token, self_pair.access_token);
}
