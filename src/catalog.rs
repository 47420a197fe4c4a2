use chrono::Utc;

use crate::{
    auth::new_id,
    error::{Error, Result},
    models::{CategoryRow, ServiceRow},
    state::Backend,
};

#[derive(Debug, Clone)]
pub struct NewService {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration_minutes: i64,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

/// Service offerings: the seeded default catalog (no provider) plus the
/// offerings each provider manages.
pub struct CatalogService {
    backend: Backend,
}

impl CatalogService {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    pub async fn categories(&self) -> Result<Vec<CategoryRow>> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, icon FROM service_categories ORDER BY name",
        )
        .fetch_all(&self.backend.db)
        .await?;
        Ok(rows)
    }

    /// A provider's offerings, or the default catalog when no provider is
    /// given.
    pub async fn services(&self, provider_id: Option<&str>) -> Result<Vec<ServiceRow>> {
        let rows = match provider_id {
            Some(provider_id) => {
                sqlx::query_as::<_, ServiceRow>(
                    r#"SELECT id, provider_id, name, description, price, duration_minutes, category, image_url, created_at
                       FROM services WHERE provider_id = ? ORDER BY name"#,
                )
                .bind(provider_id)
                .fetch_all(&self.backend.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, ServiceRow>(
                    r#"SELECT id, provider_id, name, description, price, duration_minutes, category, image_url, created_at
                       FROM services WHERE provider_id IS NULL ORDER BY name"#,
                )
                .fetch_all(&self.backend.db)
                .await?
            }
        };
        Ok(rows)
    }

    pub async fn create_service(
        &self,
        provider_id: &str,
        service: NewService,
    ) -> Result<ServiceRow> {
        if service.name.trim().is_empty() {
            return Err(Error::validation("Service name is required"));
        }
        if service.price < 0.0 {
            return Err(Error::validation("Price cannot be negative"));
        }
        if service.duration_minutes <= 0 {
            return Err(Error::validation("Duration must be positive"));
        }

        let id = new_id();
        sqlx::query(
            r#"INSERT INTO services (id, provider_id, name, description, price, duration_minutes, category, image_url, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&id)
        .bind(provider_id)
        .bind(service.name.trim())
        .bind(&service.description)
        .bind(service.price)
        .bind(service.duration_minutes)
        .bind(&service.category)
        .bind(&service.image_url)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.backend.db)
        .await?;

        sqlx::query_as::<_, ServiceRow>(
            r#"SELECT id, provider_id, name, description, price, duration_minutes, category, image_url, created_at
               FROM services WHERE id = ? LIMIT 1"#,
        )
        .bind(&id)
        .fetch_optional(&self.backend.db)
        .await?
        .ok_or(Error::NotFound("Service"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, db, testutil};

    #[tokio::test]
    async fn seeded_catalog_is_visible() {
        let (backend, _guard) = testutil::memory_backend().await;
        let config = Config {
            database_url: "sqlite::memory:".into(),
            storage_dir: "unused".into(),
            public_base_url: "http://localhost".into(),
            seed_demo: false,
        };
        db::seed_defaults(&backend.db, &config).await.unwrap();

        let catalog = CatalogService::new(backend);
        let categories = catalog.categories().await.unwrap();
        assert!(categories.iter().any(|c| c.name == "Hair"));

        let defaults = catalog.services(None).await.unwrap();
        assert!(!defaults.is_empty());
        assert!(defaults.iter().all(|s| s.provider_id.is_none()));
    }

    #[tokio::test]
    async fn providers_manage_their_own_offerings() {
        let (backend, _guard) = testutil::memory_backend().await;
        let provider = testutil::create_user(&backend, "pro@example.com", true).await;
        let catalog = CatalogService::new(backend);

        let created = catalog
            .create_service(
                &provider.id,
                NewService {
                    name: "  Balayage Signature ".to_string(),
                    description: Some("Hand-painted highlights".to_string()),
                    price: 120.0,
                    duration_minutes: 120,
                    category: Some("Hair".to_string()),
                    image_url: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(created.name, "Balayage Signature");

        let mine = catalog.services(Some(&provider.id)).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, created.id);

        assert!(catalog.services(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_offerings_are_rejected() {
        let (backend, _guard) = testutil::memory_backend().await;
        let provider = testutil::create_user(&backend, "pro2@example.com", true).await;
        let catalog = CatalogService::new(backend);

        let blank = catalog
            .create_service(
                &provider.id,
                NewService {
                    name: "   ".to_string(),
                    description: None,
                    price: 10.0,
                    duration_minutes: 30,
                    category: None,
                    image_url: None,
                },
            )
            .await;
        assert!(blank.is_err());

        let negative = catalog
            .create_service(
                &provider.id,
                NewService {
                    name: "Cut".to_string(),
                    description: None,
                    price: -5.0,
                    duration_minutes: 30,
                    category: None,
                    image_url: None,
                },
            )
            .await;
        assert!(negative.is_err());
    }
}
