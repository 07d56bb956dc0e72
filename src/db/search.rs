//! Per-user search history storage.

use sqlx::sqlite::SqlitePool;

/// Most recent queries kept per user; older entries are trimmed at insert.
pub const HISTORY_LIMIT: i64 = 20;

/// A recorded search query.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchEntry {
    pub id: i64,
    pub query: String,
    pub created_at: String,
}

pub struct SearchHistoryStore {
    pool: SqlitePool,
}

impl SearchHistoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a query for a user. Repeating a query moves it to the top
    /// instead of duplicating it; the history is trimmed to `HISTORY_LIMIT`.
    pub async fn record(&self, user_id: i64, query: &str) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM search_history WHERE user_id = ? AND query = ?")
            .bind(user_id)
            .bind(query)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO search_history (user_id, query) VALUES (?, ?)")
            .bind(user_id)
            .bind(query)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "DELETE FROM search_history WHERE user_id = ? AND id NOT IN (
                 SELECT id FROM search_history WHERE user_id = ? ORDER BY id DESC LIMIT ?
             )",
        )
        .bind(user_id)
        .bind(user_id)
        .bind(HISTORY_LIMIT)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// List a user's recorded queries, newest first.
    pub async fn list(&self, user_id: i64) -> Result<Vec<SearchEntry>, sqlx::Error> {
        let rows: Vec<(i64, String, String)> = sqlx::query_as(
            "SELECT id, query, created_at FROM search_history WHERE user_id = ? ORDER BY id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, query, created_at)| SearchEntry {
                id,
                query,
                created_at,
            })
            .collect())
    }

    /// Delete one history entry. Scoped to the user so an entry ID from a
    /// different account cannot be removed.
    pub async fn delete(&self, user_id: i64, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM search_history WHERE user_id = ? AND id = ?")
            .bind(user_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Clear a user's entire history.
    pub async fn clear(&self, user_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM search_history WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn create_user(db: &Database, username: &str) -> i64 {
        db.users()
            .create(
                &format!("uuid-{}", username),
                username,
                &format!("{}@example.com", username),
                "h",
                username,
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_record_and_list() {
        let db = Database::open(":memory:").await.unwrap();
        let user_id = create_user(&db, "alice").await;

        db.search_history().record(user_id, "rust").await.unwrap();
        db.search_history().record(user_id, "sql").await.unwrap();

        let entries = db.search_history().list(user_id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].query, "sql");
        assert_eq!(entries[1].query, "rust");
    }

    #[tokio::test]
    async fn test_repeated_query_moves_to_top() {
        let db = Database::open(":memory:").await.unwrap();
        let user_id = create_user(&db, "alice").await;

        db.search_history().record(user_id, "rust").await.unwrap();
        db.search_history().record(user_id, "sql").await.unwrap();
        db.search_history().record(user_id, "rust").await.unwrap();

        let entries = db.search_history().list(user_id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].query, "rust");
    }

    #[tokio::test]
    async fn test_history_is_capped() {
        let db = Database::open(":memory:").await.unwrap();
        let user_id = create_user(&db, "alice").await;

        for i in 0..(HISTORY_LIMIT + 5) {
            db.search_history()
                .record(user_id, &format!("query-{}", i))
                .await
                .unwrap();
        }

        let entries = db.search_history().list(user_id).await.unwrap();
        assert_eq!(entries.len() as i64, HISTORY_LIMIT);
        // Newest survives, oldest trimmed
        assert_eq!(entries[0].query, format!("query-{}", HISTORY_LIMIT + 4));
        assert!(entries.iter().all(|e| e.query != "query-0"));
    }

    #[tokio::test]
    async fn test_delete_scoped_to_user() {
        let db = Database::open(":memory:").await.unwrap();
        let alice = create_user(&db, "alice").await;
        let bob = create_user(&db, "bob").await;

        db.search_history().record(alice, "rust").await.unwrap();
        let entry_id = db.search_history().list(alice).await.unwrap()[0].id;

        // Bob cannot delete Alice's entry
        assert!(!db.search_history().delete(bob, entry_id).await.unwrap());
        assert!(db.search_history().delete(alice, entry_id).await.unwrap());
        assert!(db.search_history().list(alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear() {
        let db = Database::open(":memory:").await.unwrap();
        let user_id = create_user(&db, "alice").await;

        db.search_history().record(user_id, "a").await.unwrap();
        db.search_history().record(user_id, "b").await.unwrap();

        assert_eq!(db.search_history().clear(user_id).await.unwrap(), 2);
        assert!(db.search_history().list(user_id).await.unwrap().is_empty());
    }
}
