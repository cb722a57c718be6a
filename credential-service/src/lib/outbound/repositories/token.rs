use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgConnection;
use sqlx::PgPool;
use uuid::Uuid;

use crate::app::models::AppId;
use crate::token::errors::TokenError;
use crate::token::models::AccessTokenRecord;
use crate::token::models::AuthorizationCode;
use crate::token::models::Code;
use crate::token::models::IssuedPair;
use crate::token::models::RefreshTokenRecord;
use crate::token::ports::TokenRepository;
use crate::user::models::UserId;

pub struct PostgresTokenRepository {
    pool: PgPool,
}

impl PostgresTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CodeRow {
    code: String,
    user_id: Option<Uuid>,
    app_id: String,
    created_at: DateTime<Utc>,
}

impl From<CodeRow> for AuthorizationCode {
    fn from(row: CodeRow) -> Self {
        AuthorizationCode {
            code: Code::new(row.code),
            user_id: row.user_id.map(UserId),
            app_id: AppId::new(row.app_id),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AccessTokenRow {
    id: Uuid,
    token: String,
    user_id: Uuid,
    app_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<AccessTokenRow> for AccessTokenRecord {
    fn from(row: AccessTokenRow) -> Self {
        AccessTokenRecord {
            id: row.id,
            token: row.token,
            user_id: UserId(row.user_id),
            app_id: row.app_id.map(AppId::new),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RefreshTokenRow {
    id: Uuid,
    token: String,
    user_id: Uuid,
    app_id: Option<String>,
    access_token_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<RefreshTokenRow> for RefreshTokenRecord {
    fn from(row: RefreshTokenRow) -> Self {
        RefreshTokenRecord {
            id: row.id,
            token: row.token,
            user_id: UserId(row.user_id),
            app_id: row.app_id.map(AppId::new),
            access_token_id: row.access_token_id,
            created_at: row.created_at,
        }
    }
}

fn database_error(e: sqlx::Error) -> TokenError {
    TokenError::DatabaseError(e.to_string())
}

async fn insert_pair(conn: &mut PgConnection, pair: &IssuedPair) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO access_tokens (id, token, user_id, app_id, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(pair.access.id)
    .bind(&pair.access.token)
    .bind(pair.access.user_id.0)
    .bind(pair.access.app_id.as_ref().map(AppId::as_str))
    .bind(pair.access.created_at)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (id, token, user_id, app_id, access_token_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(pair.refresh.id)
    .bind(&pair.refresh.token)
    .bind(pair.refresh.user_id.0)
    .bind(pair.refresh.app_id.as_ref().map(AppId::as_str))
    .bind(pair.refresh.access_token_id)
    .bind(pair.refresh.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Delete every code, refresh token and access token of a user.
pub(super) async fn revoke_user_credentials(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let mut revoked = 0;
    for statement in [
        "DELETE FROM authorization_codes WHERE user_id = $1",
        "DELETE FROM refresh_tokens WHERE user_id = $1",
        "DELETE FROM access_tokens WHERE user_id = $1",
    ] {
        revoked += sqlx::query(statement)
            .bind(user_id)
            .execute(&mut *conn)
            .await?
            .rows_affected();
    }

    Ok(revoked)
}

/// Delete every code, refresh token and access token issued for an app.
pub(super) async fn revoke_app_credentials(
    conn: &mut PgConnection,
    app_id: &str,
) -> Result<u64, sqlx::Error> {
    let mut revoked = 0;
    for statement in [
        "DELETE FROM authorization_codes WHERE app_id = $1",
        "DELETE FROM refresh_tokens WHERE app_id = $1",
        "DELETE FROM access_tokens WHERE app_id = $1",
    ] {
        revoked += sqlx::query(statement)
            .bind(app_id)
            .execute(&mut *conn)
            .await?
            .rows_affected();
    }

    Ok(revoked)
}

/// Delete every credential issued for any app owned by a user.
pub(super) async fn revoke_app_credentials_of_owner(
    conn: &mut PgConnection,
    owner_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let mut revoked = 0;
    for statement in [
        "DELETE FROM authorization_codes WHERE app_id IN (SELECT app_id FROM apps WHERE owner_id = $1)",
        "DELETE FROM refresh_tokens WHERE app_id IN (SELECT app_id FROM apps WHERE owner_id = $1)",
        "DELETE FROM access_tokens WHERE app_id IN (SELECT app_id FROM apps WHERE owner_id = $1)",
    ] {
        revoked += sqlx::query(statement)
            .bind(owner_id)
            .execute(&mut *conn)
            .await?
            .rows_affected();
    }

    Ok(revoked)
}

#[async_trait]
impl TokenRepository for PostgresTokenRepository {
    async fn insert_code(&self, code: AuthorizationCode) -> Result<(), TokenError> {
        sqlx::query(
            r#"
            INSERT INTO authorization_codes (code, user_id, app_id, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(code.code.as_str())
        .bind(code.user_id.map(|id| id.0))
        .bind(code.app_id.as_str())
        .bind(code.created_at)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(())
    }

    async fn find_code(&self, code: &Code) -> Result<Option<AuthorizationCode>, TokenError> {
        let row = sqlx::query_as::<_, CodeRow>(
            r#"
            SELECT code, user_id, app_id, created_at
            FROM authorization_codes
            WHERE code = $1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(row.map(AuthorizationCode::from))
    }

    async fn redeem_code(&self, code: &Code, pair: IssuedPair) -> Result<(), TokenError> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        let result = sqlx::query("DELETE FROM authorization_codes WHERE code = $1")
            .bind(code.as_str())
            .execute(&mut *tx)
            .await
            .map_err(database_error)?;

        if result.rows_affected() == 0 {
            return Err(TokenError::CodeNotFound);
        }

        insert_pair(&mut tx, &pair).await.map_err(database_error)?;
        tx.commit().await.map_err(database_error)?;

        Ok(())
    }

    async fn insert_pair(&self, pair: IssuedPair) -> Result<(), TokenError> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;
        insert_pair(&mut tx, &pair).await.map_err(database_error)?;
        tx.commit().await.map_err(database_error)?;

        Ok(())
    }

    async fn find_access_token(
        &self,
        token: &str,
    ) -> Result<Option<AccessTokenRecord>, TokenError> {
        let row = sqlx::query_as::<_, AccessTokenRow>(
            r#"
            SELECT id, token, user_id, app_id, created_at
            FROM access_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(row.map(AccessTokenRecord::from))
    }

    async fn find_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, TokenError> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            SELECT id, token, user_id, app_id, access_token_id, created_at
            FROM refresh_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(row.map(RefreshTokenRecord::from))
    }

    async fn rotate(&self, refresh_token: &str, pair: IssuedPair) -> Result<(), TokenError> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        // A concurrent rotation holding the row lock makes this delete return nothing.
        let consumed: Option<(Uuid,)> = sqlx::query_as(
            r#"
            DELETE FROM refresh_tokens
            WHERE token = $1
            RETURNING access_token_id
            "#,
        )
        .bind(refresh_token)
        .fetch_optional(&mut *tx)
        .await
        .map_err(database_error)?;

        let Some((access_token_id,)) = consumed else {
            return Err(TokenError::TokenInvalid);
        };

        sqlx::query("DELETE FROM access_tokens WHERE id = $1")
            .bind(access_token_id)
            .execute(&mut *tx)
            .await
            .map_err(database_error)?;

        insert_pair(&mut tx, &pair).await.map_err(database_error)?;
        tx.commit().await.map_err(database_error)?;

        Ok(())
    }

    async fn list_access_tokens(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<AccessTokenRecord>, TokenError> {
        let rows = sqlx::query_as::<_, AccessTokenRow>(
            r#"
            SELECT id, token, user_id, app_id, created_at
            FROM access_tokens
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(rows.into_iter().map(AccessTokenRecord::from).collect())
    }

    async fn revoke_for_user(&self, user_id: &UserId) -> Result<u64, TokenError> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;
        let revoked = revoke_user_credentials(&mut tx, user_id.0)
            .await
            .map_err(database_error)?;
        tx.commit().await.map_err(database_error)?;

        Ok(revoked)
    }
}
