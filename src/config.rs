use std::env;

/// Process configuration, read once from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub storage_dir: String,
    pub public_base_url: String,
    pub seed_demo: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://./data/glow2go.db".to_string()),
            storage_dir: env::var("STORAGE_DIR").unwrap_or_else(|_| "./data/storage".to_string()),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080/static".to_string()),
            seed_demo: env::var("SEED_DEMO").unwrap_or_default() == "true",
        }
    }
}
