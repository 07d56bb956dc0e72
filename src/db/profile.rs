//! Profile storage: headline/about fields plus the ordered skill and
//! experience lists.
//!
//! Skill and experience updates are snapshot reconciliations: the client
//! submits the full desired list and the store diffs it against what is
//! saved, inserting, updating, and deleting inside one transaction.

use std::collections::{HashMap, HashSet};

use sqlx::sqlite::SqlitePool;

/// Profile fields, one row per user.
#[derive(Debug, Clone)]
pub struct Profile {
    pub user_id: i64,
    pub headline: String,
    pub about: String,
    pub location: String,
    pub updated_at: String,
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    user_id: i64,
    headline: String,
    about: String,
    location: String,
    updated_at: String,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            user_id: row.user_id,
            headline: row.headline,
            about: row.about,
            location: row.location,
            updated_at: row.updated_at,
        }
    }
}

/// A skill entry in a user's ordered list.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Skill {
    pub name: String,
    pub position: i64,
}

/// A stored work experience entry.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Experience {
    pub uuid: String,
    pub title: String,
    pub company: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub summary: String,
    pub position: i64,
}

#[derive(sqlx::FromRow)]
struct ExperienceRow {
    uuid: String,
    title: String,
    company: String,
    start_date: String,
    end_date: Option<String>,
    summary: String,
    position: i64,
}

impl From<ExperienceRow> for Experience {
    fn from(row: ExperienceRow) -> Self {
        Self {
            uuid: row.uuid,
            title: row.title,
            company: row.company,
            start_date: row.start_date,
            end_date: row.end_date,
            summary: row.summary,
            position: row.position,
        }
    }
}

/// A submitted experience entry. `uuid` is present for entries that should
/// update a stored row and absent for new ones.
#[derive(Debug, Clone)]
pub struct ExperienceInput {
    pub uuid: Option<String>,
    pub title: String,
    pub company: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub summary: String,
}

pub struct ProfileStore {
    pool: SqlitePool,
}

impl ProfileStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the empty profile row at signup.
    pub async fn create_empty(&self, user_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO profiles (user_id) VALUES (?)")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Get a user's profile.
    pub async fn get(&self, user_id: i64) -> Result<Option<Profile>, sqlx::Error> {
        let row: Option<ProfileRow> = sqlx::query_as(
            "SELECT user_id, headline, about, location, updated_at FROM profiles WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Profile::from))
    }

    /// Update the scalar profile fields.
    pub async fn update(
        &self,
        user_id: i64,
        headline: &str,
        about: &str,
        location: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE profiles SET headline = ?, about = ?, location = ?, updated_at = datetime('now')
             WHERE user_id = ?",
        )
        .bind(headline)
        .bind(about)
        .bind(location)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List a user's skills in display order.
    pub async fn list_skills(&self, user_id: i64) -> Result<Vec<Skill>, sqlx::Error> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT name, position FROM skills WHERE user_id = ? ORDER BY position, name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(name, position)| Skill { name, position })
            .collect())
    }

    /// Reconcile the stored skill list against a submitted snapshot:
    /// names missing from the snapshot are deleted, new names inserted,
    /// and every kept name repositioned to the snapshot order.
    pub async fn replace_skills(
        &self,
        user_id: i64,
        names: &[String],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let existing: Vec<(i64, String)> =
            sqlx::query_as("SELECT id, name FROM skills WHERE user_id = ?")
                .bind(user_id)
                .fetch_all(&mut *tx)
                .await?;

        let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
        let stored: HashMap<String, i64> =
            existing.into_iter().map(|(id, name)| (name, id)).collect();

        for (name, id) in &stored {
            if !wanted.contains(name.as_str()) {
                sqlx::query("DELETE FROM skills WHERE id = ?")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        for (position, name) in names.iter().enumerate() {
            if let Some(id) = stored.get(name) {
                sqlx::query("UPDATE skills SET position = ? WHERE id = ?")
                    .bind(position as i64)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            } else {
                sqlx::query("INSERT INTO skills (user_id, name, position) VALUES (?, ?, ?)")
                    .bind(user_id)
                    .bind(name)
                    .bind(position as i64)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    /// List a user's experiences in display order.
    pub async fn list_experiences(&self, user_id: i64) -> Result<Vec<Experience>, sqlx::Error> {
        let rows: Vec<ExperienceRow> = sqlx::query_as(
            "SELECT uuid, title, company, start_date, end_date, summary, position
             FROM experiences WHERE user_id = ? ORDER BY position, id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Experience::from).collect())
    }

    /// Reconcile stored experiences against a submitted snapshot.
    ///
    /// Entries carrying the uuid of a stored row update that row in place;
    /// entries without one (or with an unrecognized uuid) are inserted
    /// fresh; stored rows absent from the snapshot are deleted. Positions
    /// follow the snapshot order.
    pub async fn replace_experiences(
        &self,
        user_id: i64,
        items: &[ExperienceInput],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let existing: Vec<(i64, String)> =
            sqlx::query_as("SELECT id, uuid FROM experiences WHERE user_id = ?")
                .bind(user_id)
                .fetch_all(&mut *tx)
                .await?;

        let stored: HashMap<String, i64> =
            existing.into_iter().map(|(id, uuid)| (uuid, id)).collect();
        let submitted: HashSet<&str> = items
            .iter()
            .filter_map(|item| item.uuid.as_deref())
            .collect();

        for (uuid, id) in &stored {
            if !submitted.contains(uuid.as_str()) {
                sqlx::query("DELETE FROM experiences WHERE id = ?")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        for (position, item) in items.iter().enumerate() {
            let known_id = item.uuid.as_ref().and_then(|u| stored.get(u));
            match known_id {
                Some(id) => {
                    sqlx::query(
                        "UPDATE experiences
                         SET title = ?, company = ?, start_date = ?, end_date = ?, summary = ?, position = ?
                         WHERE id = ?",
                    )
                    .bind(&item.title)
                    .bind(&item.company)
                    .bind(&item.start_date)
                    .bind(&item.end_date)
                    .bind(&item.summary)
                    .bind(position as i64)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                }
                None => {
                    let uuid = uuid::Uuid::new_v4().to_string();
                    sqlx::query(
                        "INSERT INTO experiences (uuid, user_id, title, company, start_date, end_date, summary, position)
                         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                    )
                    .bind(&uuid)
                    .bind(user_id)
                    .bind(&item.title)
                    .bind(&item.company)
                    .bind(&item.start_date)
                    .bind(&item.end_date)
                    .bind(&item.summary)
                    .bind(position as i64)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
