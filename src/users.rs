use std::path::Path;

use chrono::Utc;
use sqlx::QueryBuilder;

use crate::{
    db::{fetch_user, USER_COLUMNS},
    error::{Error, Result},
    models::UserRow,
    state::Backend,
};

/// Explicit partial update for a profile row. Only set members are written;
/// columns not represented here (id, email, role and verification flags)
/// cannot be touched through this path.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub neighborhood: Option<String>,
    pub activity_zone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub bio: Option<String>,
    pub skills: Option<Vec<String>>,
    pub instagram: Option<String>,
    pub tiktok: Option<String>,
    pub years_experience: Option<i64>,
    pub accepts_emergency: Option<bool>,
    pub is_premium: Option<bool>,
    pub subscription_tier: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone.is_none()
            && self.city.is_none()
            && self.neighborhood.is_none()
            && self.activity_zone.is_none()
            && self.latitude.is_none()
            && self.longitude.is_none()
            && self.bio.is_none()
            && self.skills.is_none()
            && self.instagram.is_none()
            && self.tiktok.is_none()
            && self.years_experience.is_none()
            && self.accepts_emergency.is_none()
            && self.is_premium.is_none()
            && self.subscription_tier.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProviderFilters {
    /// Exact match on the provider's city.
    pub city: Option<String>,
    /// Case-insensitive substring match on the activity zone.
    pub activity_zone: Option<String>,
    /// Keep providers whose skill set intersects this list.
    pub skills: Option<Vec<String>>,
    pub is_premium: Option<bool>,
    pub accepts_emergency: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub struct UserService {
    backend: Backend,
}

impl UserService {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    pub async fn user_by_id(&self, id: &str) -> Result<UserRow> {
        fetch_user(&self.backend.db, id)
            .await?
            .ok_or(Error::NotFound("User"))
    }

    pub async fn update_profile(&self, id: &str, update: ProfileUpdate) -> Result<UserRow> {
        if update.is_empty() {
            return self.user_by_id(id).await;
        }

        let skills_json = match &update.skills {
            Some(skills) => Some(serde_json::to_string(skills)?),
            None => None,
        };

        let mut qb = QueryBuilder::new("UPDATE users SET ");
        let mut fields = qb.separated(", ");
        if let Some(value) = update.first_name {
            fields.push("first_name = ").push_bind_unseparated(value);
        }
        if let Some(value) = update.last_name {
            fields.push("last_name = ").push_bind_unseparated(value);
        }
        if let Some(value) = update.phone {
            fields.push("phone = ").push_bind_unseparated(value);
        }
        if let Some(value) = update.city {
            fields.push("city = ").push_bind_unseparated(value);
        }
        if let Some(value) = update.neighborhood {
            fields.push("neighborhood = ").push_bind_unseparated(value);
        }
        if let Some(value) = update.activity_zone {
            fields.push("activity_zone = ").push_bind_unseparated(value);
        }
        if let Some(value) = update.latitude {
            fields.push("latitude = ").push_bind_unseparated(value);
        }
        if let Some(value) = update.longitude {
            fields.push("longitude = ").push_bind_unseparated(value);
        }
        if let Some(value) = update.bio {
            fields.push("bio = ").push_bind_unseparated(value);
        }
        if let Some(value) = skills_json {
            fields.push("skills = ").push_bind_unseparated(value);
        }
        if let Some(value) = update.instagram {
            fields.push("instagram = ").push_bind_unseparated(value);
        }
        if let Some(value) = update.tiktok {
            fields.push("tiktok = ").push_bind_unseparated(value);
        }
        if let Some(value) = update.years_experience {
            fields
                .push("years_experience = ")
                .push_bind_unseparated(value);
        }
        if let Some(value) = update.accepts_emergency {
            fields
                .push("accepts_emergency = ")
                .push_bind_unseparated(value);
        }
        if let Some(value) = update.is_premium {
            fields.push("is_premium = ").push_bind_unseparated(value);
        }
        if let Some(value) = update.subscription_tier {
            fields
                .push("subscription_tier = ")
                .push_bind_unseparated(value);
        }
        fields
            .push("updated_at = ")
            .push_bind_unseparated(Utc::now().to_rfc3339());

        qb.push(" WHERE id = ").push_bind(id.to_string());

        let result = qb.build().execute(&self.backend.db).await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("User"));
        }

        self.user_by_id(id).await
    }

    /// Store the avatar blob, then persist its public URL on the profile row.
    /// The row update only happens after a successful store; a store that
    /// succeeds ahead of a failing row update leaves an orphaned object
    /// behind, which the backend tolerates.
    pub async fn upload_avatar(&self, id: &str, bytes: &[u8], extension: &str) -> Result<String> {
        let url = self.backend.storage.store(id, bytes, extension)?;
        self.persist_avatar_url(id, &url).await?;
        Ok(url)
    }

    pub async fn upload_avatar_from_path(&self, id: &str, path: &Path) -> Result<String> {
        let url = self.backend.storage.store_from_path(id, path)?;
        self.persist_avatar_url(id, &url).await?;
        Ok(url)
    }

    async fn persist_avatar_url(&self, id: &str, url: &str) -> Result<()> {
        let result = sqlx::query("UPDATE users SET avatar_url = ?, updated_at = ? WHERE id = ?")
            .bind(url)
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.backend.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("User"));
        }
        Ok(())
    }

    /// Filtered provider search. Results are ordered newest-first so
    /// pagination is stable across calls.
    pub async fn providers(&self, filters: ProviderFilters) -> Result<Vec<UserRow>> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {USER_COLUMNS} FROM users WHERE is_provider = 1"
        ));

        if let Some(city) = filters.city {
            qb.push(" AND city = ").push_bind(city);
        }
        if let Some(zone) = filters.activity_zone {
            // SQLite LIKE is case-insensitive for ASCII.
            qb.push(" AND activity_zone LIKE ")
                .push_bind(format!("%{zone}%"));
        }
        if let Some(skills) = filters.skills.filter(|s| !s.is_empty()) {
            qb.push(" AND skills IS NOT NULL AND EXISTS (SELECT 1 FROM json_each(users.skills) WHERE json_each.value IN (");
            let mut wanted = qb.separated(", ");
            for skill in skills {
                wanted.push_bind(skill);
            }
            qb.push("))");
        }
        if let Some(premium) = filters.is_premium {
            qb.push(" AND is_premium = ").push_bind(premium);
        }
        if let Some(emergency) = filters.accepts_emergency {
            qb.push(" AND accepts_emergency = ").push_bind(emergency);
        }

        qb.push(" ORDER BY created_at DESC, id");

        if filters.limit.is_some() || filters.offset.is_some() {
            qb.push(" LIMIT ").push_bind(filters.limit.unwrap_or(-1));
            if let Some(offset) = filters.offset {
                qb.push(" OFFSET ").push_bind(offset);
            }
        }

        let rows = qb
            .build_query_as::<UserRow>()
            .fetch_all(&self.backend.db)
            .await?;
        Ok(rows)
    }
}
