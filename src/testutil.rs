use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;

use crate::{
    auth::{AuthService, SignUpData},
    models::UserRow,
    state::Backend,
    storage::AvatarStorage,
};

/// Fresh, migrated in-memory backend. The returned TempDir keeps the avatar
/// storage root alive for the duration of the test.
pub(crate) async fn memory_backend() -> (Backend, TempDir) {
    // One connection: every handle must see the same in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let backend = Backend {
        db: pool,
        storage: AvatarStorage::new(dir.path(), "http://localhost/static"),
    };
    (backend, dir)
}

pub(crate) async fn create_user(backend: &Backend, email: &str, is_provider: bool) -> UserRow {
    AuthService::new(backend.clone())
        .sign_up(SignUpData {
            email: email.to_string(),
            password: "secret1".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            is_provider,
        })
        .await
        .unwrap()
}
