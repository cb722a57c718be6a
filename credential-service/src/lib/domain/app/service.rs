use std::sync::Arc;

use async_trait::async_trait;
use auth::Audience;
use auth::Authenticator;
use auth::TokenKind;
use chrono::Utc;

use crate::app::errors::AppError;
use crate::app::models::App;
use crate::app::models::AppId;
use crate::app::models::CreateAppCommand;
use crate::app::ports::AppRepository;
use crate::app::ports::AppServicePort;
use crate::user::models::UserId;

/// Domain service implementation for app registration.
pub struct AppService<AR>
where
    AR: AppRepository,
{
    repository: Arc<AR>,
    authenticator: Arc<Authenticator>,
}

impl<AR> AppService<AR>
where
    AR: AppRepository,
{
    /// # Arguments
    /// * `repository` - App persistence implementation
    /// * `authenticator` - Signs app secrets
    pub fn new(repository: Arc<AR>, authenticator: Arc<Authenticator>) -> Self {
        Self {
            repository,
            authenticator,
        }
    }
}

#[async_trait]
impl<AR> AppServicePort for AppService<AR>
where
    AR: AppRepository,
{
    async fn create_app(&self, command: CreateAppCommand) -> Result<App, AppError> {
        let id = AppId::generate();
        let secret = self.authenticator.issue(
            TokenKind::App,
            id.as_str(),
            Audience::App(id.to_string()),
        )?;

        let app = App {
            id,
            name: command.name,
            callback: command.callback,
            secret: secret.token,
            owner: Some(command.owner),
            created_at: Utc::now(),
        };

        let created = self.repository.create(app).await?;
        tracing::info!(app_id = %created.id, owner = %command.owner, "App registered");

        Ok(created)
    }

    async fn get_app(&self, app_id: &AppId) -> Result<App, AppError> {
        self.repository
            .find_by_app_id(app_id)
            .await?
            .ok_or_else(|| AppError::NotFound(app_id.to_string()))
    }

    async fn list_apps(&self, owner: &UserId) -> Result<Vec<App>, AppError> {
        self.repository.list_by_owner(owner).await
    }

    async fn remove_app(&self, app_id: &AppId, owner: &UserId) -> Result<(), AppError> {
        let revoked = self.repository.delete_owned(app_id, owner).await?;
        tracing::info!(
            app_id = %app_id,
            owner = %owner,
            revoked_credentials = revoked,
            "App removed, credentials revoked"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use auth::TokenSettings;
    use chrono::Duration;
    use mockall::mock;

    use super::*;
    use crate::app::models::AppName;
    use crate::app::models::CallbackUrl;

    mock! {
        pub TestAppRepository {}

        #[async_trait]
        impl AppRepository for TestAppRepository {
            async fn create(&self, app: App) -> Result<App, AppError>;
            async fn find_by_app_id(&self, app_id: &AppId) -> Result<Option<App>, AppError>;
            async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<App>, AppError>;
            async fn delete_owned(&self, app_id: &AppId, owner: &UserId) -> Result<u64, AppError>;
        }
    }

    fn authenticator() -> Arc<Authenticator> {
        Arc::new(Authenticator::new(TokenSettings::new(
            "test-secret-key-for-app-signing-32-bytes",
            "credential-service-test",
            Duration::minutes(15),
            Duration::days(30),
            Duration::days(365),
        )))
    }

    fn create_command(owner: UserId) -> CreateAppCommand {
        CreateAppCommand::new(
            AppName::new("demo".to_string()).unwrap(),
            CallbackUrl::new("https://demo.example.com/cb".to_string()).unwrap(),
            owner,
        )
    }

    #[tokio::test]
    async fn test_create_app_signs_secret_for_its_own_id() {
        let mut repository = MockTestAppRepository::new();
        repository
            .expect_create()
            .times(1)
            .returning(|app| Ok(app));

        let authenticator = authenticator();
        let service = AppService::new(Arc::new(repository), Arc::clone(&authenticator));
        let owner = UserId::new();

        let app = service.create_app(create_command(owner)).await.unwrap();
        assert!(app.is_owned_by(&owner));

        let claims = authenticator
            .verify_kind(&app.secret, TokenKind::App)
            .expect("app secret verifies as an app token");
        assert_eq!(claims.sub, app.id.as_str());
        assert_eq!(claims.aud, Audience::App(app.id.to_string()));
    }

    #[tokio::test]
    async fn test_get_app_not_found() {
        let mut repository = MockTestAppRepository::new();
        repository
            .expect_find_by_app_id()
            .times(1)
            .returning(|_| Ok(None));

        let service = AppService::new(Arc::new(repository), authenticator());

        let result = service.get_app(&AppId::new("missing")).await;
        assert!(matches!(result.unwrap_err(), AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_remove_app_by_non_owner_is_not_found() {
        let mut repository = MockTestAppRepository::new();
        repository
            .expect_delete_owned()
            .times(1)
            .returning(|app_id, _| Err(AppError::NotFound(app_id.to_string())));

        let service = AppService::new(Arc::new(repository), authenticator());

        let result = service
            .remove_app(&AppId::new("someone-elses"), &UserId::new())
            .await;
        assert!(matches!(result.unwrap_err(), AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_remove_app_success() {
        let mut repository = MockTestAppRepository::new();
        let owner = UserId::new();
        repository
            .expect_delete_owned()
            .withf(move |app_id, user| app_id.as_str() == "demo-app" && *user == owner)
            .times(1)
            .returning(|_, _| Ok(4));

        let service = AppService::new(Arc::new(repository), authenticator());

        assert!(service
            .remove_app(&AppId::new("demo-app"), &owner)
            .await
            .is_ok());
    }
}
