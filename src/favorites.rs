use chrono::Utc;

use crate::{
    auth::new_id,
    error::Result,
    models::FavoriteRow,
    state::Backend,
};

/// Favorite-provider associations. The (user, provider) pair is UNIQUE at the
/// backend and the toggle runs in a transaction, so rapid repeated toggles
/// can reorder but can never produce a duplicate row or a drifted count.
pub struct FavoriteService {
    backend: Backend,
}

impl FavoriteService {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    /// Flip the association and return whether it now exists.
    pub async fn toggle(&self, user_id: &str, provider_id: &str) -> Result<bool> {
        let mut tx = self.backend.db.begin().await?;

        let deleted = sqlx::query("DELETE FROM favorites WHERE user_id = ? AND provider_id = ?")
            .bind(user_id)
            .bind(provider_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let now_favorite = if deleted == 0 {
            sqlx::query(
                r#"INSERT INTO favorites (id, user_id, provider_id, category, created_at)
                   VALUES (?, ?, ?, NULL, ?)
                   ON CONFLICT(user_id, provider_id) DO NOTHING"#,
            )
            .bind(new_id())
            .bind(user_id)
            .bind(provider_id)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;
            true
        } else {
            false
        };

        tx.commit().await?;
        Ok(now_favorite)
    }

    /// Idempotent add; a second call is a no-op.
    pub async fn add(&self, user_id: &str, provider_id: &str, category: Option<&str>) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO favorites (id, user_id, provider_id, category, created_at)
               VALUES (?, ?, ?, ?, ?)
               ON CONFLICT(user_id, provider_id) DO NOTHING"#,
        )
        .bind(new_id())
        .bind(user_id)
        .bind(provider_id)
        .bind(category)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.backend.db)
        .await?;
        Ok(())
    }

    /// Idempotent remove.
    pub async fn remove(&self, user_id: &str, provider_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM favorites WHERE user_id = ? AND provider_id = ?")
            .bind(user_id)
            .bind(provider_id)
            .execute(&self.backend.db)
            .await?;
        Ok(())
    }

    pub async fn is_favorite(&self, user_id: &str, provider_id: &str) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM favorites WHERE user_id = ? AND provider_id = ?",
        )
        .bind(user_id)
        .bind(provider_id)
        .fetch_one(&self.backend.db)
        .await?;
        Ok(count > 0)
    }

    pub async fn favorites_of(&self, user_id: &str) -> Result<Vec<FavoriteRow>> {
        let rows = sqlx::query_as::<_, FavoriteRow>(
            r#"SELECT id, user_id, provider_id, category, created_at
               FROM favorites WHERE user_id = ? ORDER BY created_at DESC, id"#,
        )
        .bind(user_id)
        .fetch_all(&self.backend.db)
        .await?;
        Ok(rows)
    }

    pub async fn count_for_provider(&self, provider_id: &str) -> Result<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM favorites WHERE provider_id = ?")
                .bind(provider_id)
                .fetch_one(&self.backend.db)
                .await?;
        Ok(count)
    }
}
