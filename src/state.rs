use sqlx::SqlitePool;

use crate::storage::AvatarStorage;

/// The configured backend handle: one database pool plus the avatar object
/// store. Built once at process start and passed into every service;
/// cloning is cheap and shares the underlying pool.
#[derive(Clone)]
pub struct Backend {
    pub db: SqlitePool,
    pub storage: AvatarStorage,
}
