use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::token::revoke_app_credentials;
use crate::app::errors::AppError;
use crate::app::models::App;
use crate::app::models::AppId;
use crate::app::models::AppName;
use crate::app::models::CallbackUrl;
use crate::app::ports::AppRepository;
use crate::user::models::UserId;

pub struct PostgresAppRepository {
    pool: PgPool,
}

impl PostgresAppRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AppRow {
    app_id: String,
    name: String,
    callback: String,
    secret: String,
    owner_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AppRow> for App {
    type Error = AppError;

    fn try_from(row: AppRow) -> Result<Self, Self::Error> {
        Ok(App {
            id: AppId::new(row.app_id),
            name: AppName::new(row.name)?,
            callback: CallbackUrl::new(row.callback)?,
            secret: row.secret,
            owner: row.owner_id.map(UserId),
            created_at: row.created_at,
        })
    }
}

fn database_error(e: sqlx::Error) -> AppError {
    AppError::DatabaseError(e.to_string())
}

#[async_trait]
impl AppRepository for PostgresAppRepository {
    async fn create(&self, app: App) -> Result<App, AppError> {
        sqlx::query(
            r#"
            INSERT INTO apps (app_id, name, callback, secret, owner_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(app.id.as_str())
        .bind(app.name.as_str())
        .bind(app.callback.as_str())
        .bind(&app.secret)
        .bind(app.owner.map(|owner| owner.0))
        .bind(app.created_at)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(app)
    }

    async fn find_by_app_id(&self, app_id: &AppId) -> Result<Option<App>, AppError> {
        sqlx::query_as::<_, AppRow>(
            r#"
            SELECT app_id, name, callback, secret, owner_id, created_at
            FROM apps
            WHERE app_id = $1
            "#,
        )
        .bind(app_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?
        .map(App::try_from)
        .transpose()
    }

    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<App>, AppError> {
        sqlx::query_as::<_, AppRow>(
            r#"
            SELECT app_id, name, callback, secret, owner_id, created_at
            FROM apps
            WHERE owner_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner.0)
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?
        .into_iter()
        .map(App::try_from)
        .collect()
    }

    async fn delete_owned(&self, app_id: &AppId, owner: &UserId) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        let owned: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT app_id
            FROM apps
            WHERE app_id = $1 AND owner_id = $2
            FOR UPDATE
            "#,
        )
        .bind(app_id.as_str())
        .bind(owner.0)
        .fetch_optional(&mut *tx)
        .await
        .map_err(database_error)?;

        if owned.is_none() {
            return Err(AppError::NotFound(app_id.to_string()));
        }

        let revoked = revoke_app_credentials(&mut tx, app_id.as_str())
            .await
            .map_err(database_error)?;

        sqlx::query("DELETE FROM apps WHERE app_id = $1")
            .bind(app_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(database_error)?;

        tx.commit().await.map_err(database_error)?;

        Ok(revoked)
    }
}
