use std::sync::{Mutex, MutexGuard};

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use rand_core::OsRng;
use uuid::Uuid;

use crate::{
    db::fetch_user,
    error::{is_unique_violation, Error, Result},
    models::{AccountRow, SessionRow, UserRow},
    state::Backend,
    validation,
};

const SESSION_TTL_DAYS: i64 = 30;

#[derive(Debug, Clone)]
pub struct SignUpData {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub is_provider: bool,
}

#[derive(Debug, Clone)]
pub struct SignInData {
    pub email: String,
    pub password: String,
}

/// Session-aware authentication service. Holds the one device session the
/// application cares about: signed out until `sign_up`/`sign_in` succeeds,
/// signed out again after `sign_out`. A failed attempt leaves the slot
/// untouched.
pub struct AuthService {
    backend: Backend,
    session: Mutex<Option<SessionRow>>,
}

impl AuthService {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            session: Mutex::new(None),
        }
    }

    /// Create the authentication identity and its profile row together, then
    /// open a session for the new user.
    pub async fn sign_up(&self, data: SignUpData) -> Result<UserRow> {
        validation::validate_email(&data.email)?;
        validation::validate_password(&data.password)?;
        validation::validate_name("First name", &data.first_name)?;
        validation::validate_name("Last name", &data.last_name)?;

        let email = data.email.trim().to_lowercase();
        let password_hash = hash_password(&data.password)?;
        let id = new_id();
        let now = Utc::now().to_rfc3339();

        let mut tx = self.backend.db.begin().await?;
        let inserted = sqlx::query(
            r#"INSERT INTO accounts (id, email, password_hash, email_confirmed, created_at)
               VALUES (?, ?, ?, 1, ?)"#,
        )
        .bind(&id)
        .bind(&email)
        .bind(&password_hash)
        .bind(&now)
        .execute(&mut *tx)
        .await;

        if let Err(err) = inserted {
            if is_unique_violation(&err) {
                return Err(Error::EmailTaken);
            }
            return Err(err.into());
        }

        sqlx::query(
            r#"INSERT INTO users (id, email, first_name, last_name, is_provider, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&id)
        .bind(&email)
        .bind(data.first_name.trim())
        .bind(data.last_name.trim())
        .bind(data.is_provider)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        let user = fetch_user(&self.backend.db, &id)
            .await?
            .ok_or(Error::NotFound("User"))?;
        let session = self.open_session(&id).await?;
        *self.slot() = Some(session);

        log::info!("New account registered: {email}");
        Ok(user)
    }

    pub async fn sign_in(&self, data: SignInData) -> Result<(SessionRow, UserRow)> {
        validation::validate_email(&data.email)?;

        let email = data.email.trim().to_lowercase();
        let account = sqlx::query_as::<_, AccountRow>(
            r#"SELECT id, email, password_hash, email_confirmed, created_at
               FROM accounts WHERE email = ? LIMIT 1"#,
        )
        .bind(&email)
        .fetch_optional(&self.backend.db)
        .await?;

        let Some(account) = account else {
            return Err(Error::InvalidCredentials);
        };
        if !verify_password(&data.password, &account.password_hash) {
            return Err(Error::InvalidCredentials);
        }
        if !account.email_confirmed {
            return Err(Error::EmailNotConfirmed);
        }

        let user = fetch_user(&self.backend.db, &account.id)
            .await?
            .ok_or(Error::NotFound("User"))?;
        let session = self.open_session(&account.id).await?;
        *self.slot() = Some(session.clone());

        Ok((session, user))
    }

    /// Close the active session. Calling this while already signed out is a
    /// no-op, not an error.
    pub async fn sign_out(&self) -> Result<()> {
        let taken = self.slot().take();
        if let Some(session) = taken {
            sqlx::query("DELETE FROM sessions WHERE id = ?")
                .bind(&session.id)
                .execute(&self.backend.db)
                .await?;
        }
        Ok(())
    }

    /// The profile behind the active session, or `None` when signed out or
    /// when the session has expired. Absence is a value here, never an error.
    pub async fn current_user(&self) -> Result<Option<UserRow>> {
        let current = self.slot().clone();
        let Some(session) = current else {
            return Ok(None);
        };

        let live = sqlx::query_as::<_, SessionRow>(
            "SELECT id, user_id, created_at, expires_at FROM sessions WHERE id = ? AND expires_at > ? LIMIT 1",
        )
        .bind(&session.id)
        .bind(Utc::now().to_rfc3339())
        .fetch_optional(&self.backend.db)
        .await?;

        let Some(live) = live else {
            // Session revoked or expired out from under us.
            *self.slot() = None;
            return Ok(None);
        };

        fetch_user(&self.backend.db, &live.user_id).await
    }

    pub async fn is_authenticated(&self) -> Result<bool> {
        Ok(self.current_user().await?.is_some())
    }

    /// Record a reset token for out-of-band delivery. Deliberately does not
    /// reveal whether the address is registered.
    pub async fn reset_password(&self, email: &str) -> Result<()> {
        validation::validate_email(email)?;
        let email = email.trim().to_lowercase();

        let known = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM accounts WHERE email = ?")
            .bind(&email)
            .fetch_one(&self.backend.db)
            .await?;
        if known == 0 {
            log::info!("Password reset requested for unknown address");
            return Ok(());
        }

        sqlx::query(
            r#"INSERT INTO password_resets (id, email, token, created_at)
               VALUES (?, ?, ?, ?)"#,
        )
        .bind(new_id())
        .bind(&email)
        .bind(new_id())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.backend.db)
        .await?;

        log::info!("Password reset email queued for {email}");
        Ok(())
    }

    async fn open_session(&self, user_id: &str) -> Result<SessionRow> {
        let now = Utc::now();
        let session = SessionRow {
            id: new_id(),
            user_id: user_id.to_string(),
            created_at: now.to_rfc3339(),
            expires_at: (now + Duration::days(SESSION_TTL_DAYS)).to_rfc3339(),
        };

        sqlx::query(
            r#"INSERT INTO sessions (id, user_id, created_at, expires_at)
               VALUES (?, ?, ?, ?)"#,
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(&session.created_at)
        .bind(&session.expires_at)
        .execute(&self.backend.db)
        .await?;

        Ok(session)
    }

    fn slot(&self) -> MutexGuard<'_, Option<SessionRow>> {
        self.session.lock().unwrap_or_else(|err| err.into_inner())
    }
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| Error::internal(format!("password hash failed: {err}")))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(_) => false,
    }
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    fn sign_up_data(email: &str, is_provider: bool) -> SignUpData {
        SignUpData {
            email: email.to_string(),
            password: "secret1".to_string(),
            first_name: "Sofia".to_string(),
            last_name: "Laurent".to_string(),
            is_provider,
        }
    }

    #[tokio::test]
    async fn sign_up_then_sign_in_round_trips_the_role_flag() {
        let (backend, _guard) = testutil::memory_backend().await;
        let auth = AuthService::new(backend.clone());

        let created = auth
            .sign_up(sign_up_data("sofia@example.com", true))
            .await
            .unwrap();
        assert!(created.is_provider);

        auth.sign_out().await.unwrap();

        let (session, user) = auth
            .sign_in(SignInData {
                email: "sofia@example.com".to_string(),
                password: "secret1".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(user.id, created.id);
        assert_eq!(session.user_id, created.id);
        assert!(user.is_provider);
    }

    #[tokio::test]
    async fn malformed_email_fails_before_any_backend_write() {
        let (backend, _guard) = testutil::memory_backend().await;
        let auth = AuthService::new(backend.clone());

        let err = auth.sign_up(sign_up_data("not-an-email", false)).await;
        assert!(matches!(err, Err(Error::Validation(_))));

        let accounts = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM accounts")
            .fetch_one(&backend.db)
            .await
            .unwrap();
        assert_eq!(accounts, 0);
    }

    #[tokio::test]
    async fn weak_password_and_blank_names_are_rejected() {
        let (backend, _guard) = testutil::memory_backend().await;
        let auth = AuthService::new(backend);

        let mut data = sign_up_data("ok@example.com", false);
        data.password = "12345".to_string();
        assert!(matches!(
            auth.sign_up(data).await,
            Err(Error::WeakPassword)
        ));

        let mut data = sign_up_data("ok@example.com", false);
        data.first_name = "  ".to_string();
        assert!(matches!(
            auth.sign_up(data).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_email_is_normalized() {
        let (backend, _guard) = testutil::memory_backend().await;
        let auth = AuthService::new(backend);

        auth.sign_up(sign_up_data("dup@example.com", false))
            .await
            .unwrap();
        let err = auth.sign_up(sign_up_data("dup@example.com", true)).await;
        assert!(matches!(err, Err(Error::EmailTaken)));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_identical() {
        let (backend, _guard) = testutil::memory_backend().await;
        let auth = AuthService::new(backend);

        auth.sign_up(sign_up_data("mina@example.com", false))
            .await
            .unwrap();
        auth.sign_out().await.unwrap();

        let wrong = auth
            .sign_in(SignInData {
                email: "mina@example.com".to_string(),
                password: "wrong-password".to_string(),
            })
            .await;
        assert!(matches!(wrong, Err(Error::InvalidCredentials)));

        let unknown = auth
            .sign_in(SignInData {
                email: "ghost@example.com".to_string(),
                password: "whatever".to_string(),
            })
            .await;
        assert!(matches!(unknown, Err(Error::InvalidCredentials)));
    }

    #[tokio::test]
    async fn unconfirmed_email_is_surfaced_distinctly() {
        let (backend, _guard) = testutil::memory_backend().await;
        let auth = AuthService::new(backend.clone());

        auth.sign_up(sign_up_data("pending@example.com", false))
            .await
            .unwrap();
        auth.sign_out().await.unwrap();

        sqlx::query("UPDATE accounts SET email_confirmed = 0 WHERE email = ?")
            .bind("pending@example.com")
            .execute(&backend.db)
            .await
            .unwrap();

        let err = auth
            .sign_in(SignInData {
                email: "pending@example.com".to_string(),
                password: "secret1".to_string(),
            })
            .await;
        assert!(matches!(err, Err(Error::EmailNotConfirmed)));
    }

    #[tokio::test]
    async fn sign_out_twice_is_idempotent() {
        let (backend, _guard) = testutil::memory_backend().await;
        let auth = AuthService::new(backend);

        auth.sign_up(sign_up_data("out@example.com", false))
            .await
            .unwrap();
        auth.sign_out().await.unwrap();
        auth.sign_out().await.unwrap();
        assert!(!auth.is_authenticated().await.unwrap());
    }

    #[tokio::test]
    async fn current_user_tracks_the_session_lifecycle() {
        let (backend, _guard) = testutil::memory_backend().await;
        let auth = AuthService::new(backend.clone());

        assert!(auth.current_user().await.unwrap().is_none());

        let created = auth
            .sign_up(sign_up_data("session@example.com", false))
            .await
            .unwrap();
        let current = auth.current_user().await.unwrap().unwrap();
        assert_eq!(current.id, created.id);
        assert!(auth.is_authenticated().await.unwrap());

        // Revoked server-side: the local slot clears on the next lookup.
        sqlx::query("DELETE FROM sessions")
            .execute(&backend.db)
            .await
            .unwrap();
        assert!(auth.current_user().await.unwrap().is_none());

        auth.sign_out().await.unwrap();
        assert!(auth.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_sign_in_leaves_the_device_signed_out() {
        let (backend, _guard) = testutil::memory_backend().await;
        let auth = AuthService::new(backend);

        let _ = auth
            .sign_in(SignInData {
                email: "nobody@example.com".to_string(),
                password: "secret1".to_string(),
            })
            .await;
        assert!(!auth.is_authenticated().await.unwrap());
    }

    #[tokio::test]
    async fn reset_password_is_fire_and_forget() {
        let (backend, _guard) = testutil::memory_backend().await;
        let auth = AuthService::new(backend.clone());

        auth.sign_up(sign_up_data("reset@example.com", false))
            .await
            .unwrap();

        auth.reset_password("reset@example.com").await.unwrap();
        auth.reset_password("unknown@example.com").await.unwrap();

        let tokens = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM password_resets")
            .fetch_one(&backend.db)
            .await
            .unwrap();
        assert_eq!(tokens, 1);
    }
}
