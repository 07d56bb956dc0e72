//! Refresh token storage for tracking and revocation.
//!
//! Only refresh tokens are stored. Access tokens are stateless and
//! short-lived; revoking a refresh token ends the session as soon as the
//! current access token runs out.

use sqlx::sqlite::SqlitePool;

/// A stored refresh token record.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub id: i64,
    pub jti: String,
    pub user_id: i64,
    /// Unix seconds
    pub issued_at: i64,
    /// Unix seconds
    pub expires_at: i64,
    pub created_at: String,
}

#[derive(sqlx::FromRow)]
struct RefreshTokenRow {
    id: i64,
    jti: String,
    user_id: i64,
    issued_at: i64,
    expires_at: i64,
    created_at: String,
}

impl From<RefreshTokenRow> for RefreshTokenRecord {
    fn from(row: RefreshTokenRow) -> Self {
        Self {
            id: row.id,
            jti: row.jti,
            user_id: row.user_id,
            issued_at: row.issued_at,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

/// Store for the per-user refresh token list.
pub struct TokenStore {
    pool: SqlitePool,
}

const TOKEN_COLUMNS: &str = "id, jti, user_id, issued_at, expires_at, created_at";

impl TokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a newly issued refresh token.
    pub async fn create(
        &self,
        jti: &str,
        user_id: i64,
        issued_at: u64,
        expires_at: u64,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO refresh_tokens (jti, user_id, issued_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(jti)
        .bind(user_id)
        .bind(issued_at as i64)
        .bind(expires_at as i64)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Get a stored token by its JWT ID. A missing row means the token has
    /// been revoked (or never existed).
    pub async fn get_by_jti(&self, jti: &str) -> Result<Option<RefreshTokenRecord>, sqlx::Error> {
        let row: Option<RefreshTokenRow> = sqlx::query_as(&format!(
            "SELECT {} FROM refresh_tokens WHERE jti = ?",
            TOKEN_COLUMNS
        ))
        .bind(jti)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(RefreshTokenRecord::from))
    }

    /// Delete a token by its JWT ID (revoke). Idempotent: removing an
    /// absent token returns false rather than an error.
    pub async fn delete_by_jti(&self, jti: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE jti = ?")
            .bind(jti)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete all tokens past their expiry.
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM refresh_tokens WHERE expires_at < CAST(strftime('%s', 'now') AS INTEGER)",
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// List all live refresh tokens for a user, newest first.
    pub async fn list_by_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<RefreshTokenRecord>, sqlx::Error> {
        let rows: Vec<RefreshTokenRow> = sqlx::query_as(&format!(
            "SELECT {} FROM refresh_tokens
             WHERE user_id = ? AND expires_at >= CAST(strftime('%s', 'now') AS INTEGER)
             ORDER BY issued_at DESC, id DESC",
            TOKEN_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(RefreshTokenRecord::from).collect())
    }

    /// Delete all tokens for a user (logout everywhere).
    pub async fn delete_all_by_user(&self, user_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
