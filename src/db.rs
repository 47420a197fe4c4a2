use std::{env, fs, path::Path, str::FromStr};

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::{
    auth::{hash_password, new_id},
    config::Config,
    error::Result,
    models::{UserRow, TIER_FREE, TIER_PREMIUM},
};

pub(crate) const USER_COLUMNS: &str = "id, email, first_name, last_name, phone, city, neighborhood, activity_zone, \
     latitude, longitude, avatar_url, is_provider, is_verified, is_premium, \
     subscription_tier, bio, skills, instagram, tiktok, years_experience, \
     accepts_emergency, created_at, updated_at";

pub async fn connect(config: &Config) -> Result<SqlitePool> {
    ensure_sqlite_dir(&config.database_url)?;
    let options = SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub fn ensure_sqlite_dir(db_url: &str) -> std::io::Result<()> {
    let path = db_url
        .strip_prefix("sqlite://")
        .or_else(|| db_url.strip_prefix("sqlite:"));

    let Some(path) = path else {
        return Ok(());
    };

    let path = path.split('?').next().unwrap_or(path);
    if path == ":memory:" || path.is_empty() {
        return Ok(());
    }

    let path = path.strip_prefix("file:").unwrap_or(path);
    if let Some(parent) = Path::new(path).parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Single-row profile lookup shared by the auth and users services.
pub async fn fetch_user(pool: &SqlitePool, id: &str) -> Result<Option<UserRow>> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = ? LIMIT 1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Idempotent seeding: the category/offering catalog always, demo accounts
/// only when `SEED_DEMO=true`.
pub async fn seed_defaults(pool: &SqlitePool, config: &Config) -> Result<()> {
    seed_categories(pool).await?;
    seed_catalog_services(pool).await?;
    if config.seed_demo {
        seed_demo_accounts(pool).await?;
    }
    Ok(())
}

async fn seed_categories(pool: &SqlitePool) -> Result<()> {
    let categories = [
        ("Hair", "scissors"),
        ("Makeup", "brush"),
        ("Nails", "sparkles"),
        ("Skincare", "droplet"),
        ("Barber", "razor"),
    ];

    for (name, icon) in categories {
        sqlx::query(
            r#"INSERT INTO service_categories (id, name, icon)
               VALUES (?, ?, ?)
               ON CONFLICT(name) DO NOTHING"#,
        )
        .bind(new_id())
        .bind(name)
        .bind(icon)
        .execute(pool)
        .await?;
    }

    Ok(())
}

async fn seed_catalog_services(pool: &SqlitePool) -> Result<()> {
    let services = [
        ("Signature Cut & Style", "Hair", 45.0_f64, 45_i64),
        ("Balayage & Gloss", "Hair", 120.0, 120),
        ("Glam Makeup", "Makeup", 60.0, 60),
        ("Gel Manicure", "Nails", 35.0, 45),
        ("Hydrating Facial", "Skincare", 55.0, 50),
    ];

    for (name, category, price, duration) in services {
        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM services WHERE name = ? AND provider_id IS NULL",
        )
        .bind(name)
        .fetch_one(pool)
        .await?;
        if exists > 0 {
            continue;
        }
        sqlx::query(
            r#"INSERT INTO services (id, provider_id, name, description, price, duration_minutes, category, image_url, created_at)
               VALUES (?, NULL, ?, NULL, ?, ?, ?, NULL, ?)"#,
        )
        .bind(new_id())
        .bind(name)
        .bind(price)
        .bind(duration)
        .bind(category)
        .bind(Utc::now().to_rfc3339())
        .execute(pool)
        .await?;
    }

    Ok(())
}

async fn seed_demo_accounts(pool: &SqlitePool) -> Result<()> {
    let provider_email =
        env::var("DEMO_PROVIDER_EMAIL").unwrap_or_else(|_| "provider@glow2go.dev".to_string());
    let client_email =
        env::var("DEMO_CLIENT_EMAIL").unwrap_or_else(|_| "client@glow2go.dev".to_string());
    let password = env::var("DEMO_PASSWORD").unwrap_or_else(|_| "change-me".to_string());

    if password == "change-me" {
        log::warn!("DEMO_PASSWORD not set. Using default password 'change-me'. Set DEMO_PASSWORD before sharing this environment.");
    }

    seed_account(
        pool,
        &provider_email,
        &password,
        "Sofia",
        "Laurent",
        true,
        TIER_PREMIUM,
    )
    .await?;
    seed_account(
        pool,
        &client_email,
        &password,
        "Camille",
        "Martin",
        false,
        TIER_FREE,
    )
    .await?;

    Ok(())
}

async fn seed_account(
    pool: &SqlitePool,
    email: &str,
    password: &str,
    first_name: &str,
    last_name: &str,
    is_provider: bool,
    tier: &str,
) -> Result<()> {
    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM accounts WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await?;
    if exists > 0 {
        return Ok(());
    }

    let id = new_id();
    let now = Utc::now().to_rfc3339();
    let password_hash = hash_password(password)?;

    let mut tx = pool.begin().await?;
    sqlx::query(
        r#"INSERT INTO accounts (id, email, password_hash, email_confirmed, created_at)
           VALUES (?, ?, ?, 1, ?)"#,
    )
    .bind(&id)
    .bind(email)
    .bind(&password_hash)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"INSERT INTO users
           (id, email, first_name, last_name, city, activity_zone, is_provider, is_premium,
            subscription_tier, skills, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(email)
    .bind(first_name)
    .bind(last_name)
    .bind(if is_provider { Some("Lyon") } else { None })
    .bind(if is_provider {
        Some("Lyon 3e / Part-Dieu")
    } else {
        None
    })
    .bind(is_provider)
    .bind(is_provider)
    .bind(tier)
    .bind(if is_provider {
        Some(r#"["Coloration","Balayage"]"#)
    } else {
        None
    })
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    log::info!("Seeded demo account {email} (provider: {is_provider})");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[test]
    fn sqlite_dir_handling_skips_memory_and_foreign_urls() {
        assert!(ensure_sqlite_dir("sqlite::memory:").is_ok());
        assert!(ensure_sqlite_dir("postgres://elsewhere/db").is_ok());
    }

    #[test]
    fn sqlite_dir_is_created_for_file_urls() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("deep/data/app.db");
        let url = format!("sqlite://{}", nested.display());
        ensure_sqlite_dir(&url).unwrap();
        assert!(nested.parent().unwrap().is_dir());
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let (backend, _guard) = testutil::memory_backend().await;
        let config = Config {
            database_url: "sqlite::memory:".into(),
            storage_dir: "unused".into(),
            public_base_url: "http://localhost".into(),
            seed_demo: true,
        };

        seed_defaults(&backend.db, &config).await.unwrap();
        seed_defaults(&backend.db, &config).await.unwrap();

        let categories = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM service_categories")
            .fetch_one(&backend.db)
            .await
            .unwrap();
        assert_eq!(categories, 5);

        let demo_accounts = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM accounts")
            .fetch_one(&backend.db)
            .await
            .unwrap();
        assert_eq!(demo_accounts, 2);

        let catalog = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM services WHERE provider_id IS NULL",
        )
        .fetch_one(&backend.db)
        .await
        .unwrap();
        assert_eq!(catalog, 5);
    }
}
