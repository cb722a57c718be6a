use std::sync::Arc;

use auth::Authenticator;
use axum::Router;
use credential_service::app::ports::AppRepository;
use credential_service::app::service::AppService;
use credential_service::config::Config;
use credential_service::inbound::http::router::create_router;
use credential_service::inbound::http::router::ServiceInfo;
use credential_service::repositories::InMemoryCredentialStore;
use credential_service::repositories::PostgresAppRepository;
use credential_service::repositories::PostgresTokenRepository;
use credential_service::repositories::PostgresUserRepository;
use credential_service::token::ports::TokenRepository;
use credential_service::token::service::TokenService;
use credential_service::user::ports::UserRepository;
use credential_service::user::service::UserService;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "credential_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "credential-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        service_name = %config.service.name,
        http_port = config.server.http_port,
        issuer = %config.token.issuer,
        access_token_expires_in = config.token.access_token_expires_in,
        refresh_token_expires_in = config.token.refresh_token_expires_in,
        auth_code_expires_in = config.token.auth_code_expires_in,
        "Configuration loaded"
    );

    let authenticator = Arc::new(Authenticator::new(config.token_settings()));

    let http_application = if config.database.is_memory() {
        tracing::warn!(database = "memory", "Using in-memory credential store");
        let store = Arc::new(InMemoryCredentialStore::new());
        build_application(
            &config,
            Arc::clone(&store),
            Arc::clone(&store),
            store,
            authenticator,
        )
    } else {
        let pg_pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect(&config.database.url)
            .await?;
        tracing::info!(
            max_connections = config.database.max_connections,
            database = "postgresql",
            "Database connection pool created"
        );

        sqlx::migrate!("./migrations").run(&pg_pool).await?;
        tracing::info!(database = "postgresql", "Database migrations completed");

        build_application(
            &config,
            Arc::new(PostgresUserRepository::new(pg_pool.clone())),
            Arc::new(PostgresAppRepository::new(pg_pool.clone())),
            Arc::new(PostgresTokenRepository::new(pg_pool)),
            authenticator,
        )
    };

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    axum::serve(http_listener, http_application)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server exited successfully");

    Ok(())
}

fn build_application<UR, AR, TR>(
    config: &Config,
    users: Arc<UR>,
    apps: Arc<AR>,
    tokens: Arc<TR>,
    authenticator: Arc<Authenticator>,
) -> Router
where
    UR: UserRepository,
    AR: AppRepository,
    TR: TokenRepository,
{
    let user_service = Arc::new(UserService::new(Arc::clone(&users)));
    let app_service = Arc::new(AppService::new(
        Arc::clone(&apps),
        Arc::clone(&authenticator),
    ));
    let token_service = Arc::new(TokenService::new(
        users,
        apps,
        tokens,
        authenticator,
        config.token.auth_code_ttl(),
    ));

    create_router(
        user_service,
        app_service,
        token_service,
        ServiceInfo {
            name: config.service.name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            url: config.token.url.clone(),
            issuer: config.token.issuer.clone(),
        },
    )
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
