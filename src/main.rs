use glow2go::{config::Config, db, state::Backend, storage::AvatarStorage};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Startup error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();

    let pool = db::connect(&config).await?;
    db::run_migrations(&pool).await?;
    db::seed_defaults(&pool, &config).await?;

    let backend = Backend {
        db: pool,
        storage: AvatarStorage::new(&config.storage_dir, &config.public_base_url),
    };
    std::fs::create_dir_all(backend.storage.root())?;

    let users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(&backend.db)
        .await?;
    let categories = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM service_categories")
        .fetch_one(&backend.db)
        .await?;

    log::info!(
        "Glow2Go backend ready: {} user(s), {} categories, storage at {}",
        users,
        categories,
        backend.storage.root().display()
    );

    Ok(())
}
