use async_trait::async_trait;

use crate::app::errors::AppError;
use crate::app::models::App;
use crate::app::models::AppId;
use crate::app::models::CreateAppCommand;
use crate::user::models::UserId;

/// Port for app registration operations.
#[async_trait]
pub trait AppServicePort: Send + Sync + 'static {
    /// Register a new app owned by the command's user.
    ///
    /// Mints a public app id and signs the app secret.
    ///
    /// # Errors
    /// * `Signing` - App secret could not be signed
    /// * `DatabaseError` - Database operation failed
    async fn create_app(&self, command: CreateAppCommand) -> Result<App, AppError>;

    /// Retrieve an app by its public id.
    ///
    /// # Errors
    /// * `NotFound` - No app with this id
    /// * `DatabaseError` - Database operation failed
    async fn get_app(&self, app_id: &AppId) -> Result<App, AppError>;

    /// Apps owned by `owner`, newest first. Ownerless apps are never listed.
    async fn list_apps(&self, owner: &UserId) -> Result<Vec<App>, AppError>;

    /// Remove an app owned by `owner` and revoke every credential issued for it.
    ///
    /// # Errors
    /// * `NotFound` - App does not exist or belongs to someone else
    /// * `DatabaseError` - Database operation failed
    async fn remove_app(&self, app_id: &AppId, owner: &UserId) -> Result<(), AppError>;
}

/// Persistence operations for app aggregate.
#[async_trait]
pub trait AppRepository: Send + Sync + 'static {
    async fn create(&self, app: App) -> Result<App, AppError>;

    /// # Returns
    /// Optional app entity (None if not found)
    async fn find_by_app_id(&self, app_id: &AppId) -> Result<Option<App>, AppError>;

    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<App>, AppError>;

    /// Delete the app together with every code and token pair issued for it,
    /// in one transaction.
    ///
    /// # Returns
    /// Number of revoked credential records
    ///
    /// # Errors
    /// * `NotFound` - App does not exist or is not owned by `owner`
    /// * `DatabaseError` - Database operation failed
    async fn delete_owned(&self, app_id: &AppId, owner: &UserId) -> Result<u64, AppError>;
}
