//! Follow relationship storage.

use sqlx::sqlite::SqlitePool;

use super::user::MemberSummary;

pub struct FollowStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct MemberSummaryRow {
    uuid: String,
    username: String,
    display_name: String,
    headline: Option<String>,
}

impl FollowStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Add a follow edge. Idempotent: following twice returns false.
    pub async fn follow(&self, follower_id: i64, followee_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO follows (follower_id, followee_id) VALUES (?, ?)",
        )
        .bind(follower_id)
        .bind(followee_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a follow edge. Idempotent: unfollowing a non-followed user
    /// returns false.
    pub async fn unfollow(&self, follower_id: i64, followee_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND followee_id = ?")
            .bind(follower_id)
            .bind(followee_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn is_following(
        &self,
        follower_id: i64,
        followee_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let count: (i32,) = sqlx::query_as(
            "SELECT COUNT(*) FROM follows WHERE follower_id = ? AND followee_id = ?",
        )
        .bind(follower_id)
        .bind(followee_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0 > 0)
    }

    pub async fn count_followers(&self, user_id: i64) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM follows f
             JOIN users u ON u.id = f.follower_id
             WHERE f.followee_id = ? AND u.active = 1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0)
    }

    pub async fn count_following(&self, user_id: i64) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM follows f
             JOIN users u ON u.id = f.followee_id
             WHERE f.follower_id = ? AND u.active = 1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0)
    }

    /// List active members following the given user, newest follow first.
    pub async fn list_followers(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MemberSummary>, sqlx::Error> {
        let rows: Vec<MemberSummaryRow> = sqlx::query_as(
            "SELECT u.uuid, u.username, u.display_name, p.headline
             FROM follows f
             JOIN users u ON u.id = f.follower_id
             LEFT JOIN profiles p ON p.user_id = u.id
             WHERE f.followee_id = ? AND u.active = 1
             ORDER BY f.created_at DESC, u.username
             LIMIT ? OFFSET ?",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(to_summary).collect())
    }

    /// List active members the given user follows, newest follow first.
    pub async fn list_following(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MemberSummary>, sqlx::Error> {
        let rows: Vec<MemberSummaryRow> = sqlx::query_as(
            "SELECT u.uuid, u.username, u.display_name, p.headline
             FROM follows f
             JOIN users u ON u.id = f.followee_id
             LEFT JOIN profiles p ON p.user_id = u.id
             WHERE f.follower_id = ? AND u.active = 1
             ORDER BY f.created_at DESC, u.username
             LIMIT ? OFFSET ?",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(to_summary).collect())
    }
}

fn to_summary(row: MemberSummaryRow) -> MemberSummary {
    MemberSummary {
        uuid: row.uuid,
        username: row.username,
        display_name: row.display_name,
        headline: row.headline,
    }
}
