use chrono::Utc;

use crate::{
    auth::new_id,
    error::{Error, Result},
    models::{BookingRow, BookingStatus, BookingWithClient},
    state::Backend,
    validation,
};

const BOOKING_COLUMNS: &str = "id, client_id, provider_id, service_id, date, time, duration_minutes, price, \
     status, notes, cancellation_reason, created_at";

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub client_id: String,
    pub provider_id: String,
    pub service_id: Option<String>,
    pub date: String,
    pub time: String,
    pub duration_minutes: i64,
    pub price: f64,
    pub notes: Option<String>,
}

/// Whether status writes are checked against the booking lifecycle.
/// `Enforced` rejects illegal transitions with a typed error; `Unrestricted`
/// writes whatever it is given, for deployments that want providers to be
/// able to correct a mistaken transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    #[default]
    Enforced,
    Unrestricted,
}

pub struct BookingService {
    backend: Backend,
    policy: TransitionPolicy,
}

impl BookingService {
    pub fn new(backend: Backend) -> Self {
        Self::with_policy(backend, TransitionPolicy::default())
    }

    pub fn with_policy(backend: Backend, policy: TransitionPolicy) -> Self {
        Self { backend, policy }
    }

    pub async fn create_booking(&self, booking: NewBooking) -> Result<BookingRow> {
        validation::validate_date(&booking.date)?;
        validation::validate_time(&booking.time)?;
        if booking.duration_minutes <= 0 {
            return Err(Error::validation("Duration must be positive"));
        }

        let id = new_id();
        sqlx::query(
            r#"INSERT INTO bookings
               (id, client_id, provider_id, service_id, date, time, duration_minutes, price, status, notes, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&id)
        .bind(&booking.client_id)
        .bind(&booking.provider_id)
        .bind(&booking.service_id)
        .bind(&booking.date)
        .bind(&booking.time)
        .bind(booking.duration_minutes)
        .bind(booking.price)
        .bind(BookingStatus::Pending)
        .bind(&booking.notes)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.backend.db)
        .await?;

        self.booking_by_id(&id).await
    }

    pub async fn booking_by_id(&self, id: &str) -> Result<BookingRow> {
        sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ? LIMIT 1"
        ))
        .bind(id)
        .fetch_optional(&self.backend.db)
        .await?
        .ok_or(Error::NotFound("Booking"))
    }

    /// All bookings for a provider, joined with the client fields the
    /// dashboard displays, newest first.
    pub async fn provider_bookings(&self, provider_id: &str) -> Result<Vec<BookingWithClient>> {
        let rows = sqlx::query_as::<_, BookingWithClient>(
            r#"SELECT b.id, b.client_id, b.provider_id, b.service_id, b.date, b.time,
                      b.duration_minutes, b.price, b.status, b.notes, b.cancellation_reason,
                      b.created_at,
                      u.first_name AS client_first_name, u.last_name AS client_last_name,
                      u.phone AS client_phone, u.avatar_url AS client_avatar_url
               FROM bookings b
               LEFT JOIN users u ON b.client_id = u.id
               WHERE b.provider_id = ?
               ORDER BY b.date DESC, b.time DESC"#,
        )
        .bind(provider_id)
        .fetch_all(&self.backend.db)
        .await?;
        Ok(rows)
    }

    pub async fn client_bookings(&self, client_id: &str) -> Result<Vec<BookingRow>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE client_id = ? ORDER BY date DESC, time DESC"
        ))
        .bind(client_id)
        .fetch_all(&self.backend.db)
        .await?;
        Ok(rows)
    }

    /// Move a booking to a new status. The cancellation reason is only kept
    /// for Cancelled/NoShow targets.
    pub async fn update_status(
        &self,
        id: &str,
        status: BookingStatus,
        reason: Option<&str>,
    ) -> Result<BookingRow> {
        let current = self.booking_by_id(id).await?;

        if self.policy == TransitionPolicy::Enforced
            && !current.status.can_transition_to(status)
        {
            return Err(Error::InvalidTransition {
                from: current.status,
                to: status,
            });
        }

        let reason = match status {
            BookingStatus::Cancelled | BookingStatus::NoShow => reason,
            _ => None,
        };

        sqlx::query("UPDATE bookings SET status = ?, cancellation_reason = ? WHERE id = ?")
            .bind(status)
            .bind(reason)
            .bind(id)
            .execute(&self.backend.db)
            .await?;

        log::info!("Booking {id} moved from {} to {status}", current.status);
        self.booking_by_id(id).await
    }

    /// Reschedule: both fields are written in one statement, so the caller
    /// never observes a half-updated row.
    pub async fn update_date_time(&self, id: &str, date: &str, time: &str) -> Result<BookingRow> {
        validation::validate_date(date)?;
        validation::validate_time(time)?;

        let result = sqlx::query("UPDATE bookings SET date = ?, time = ? WHERE id = ?")
            .bind(date)
            .bind(time)
            .bind(id)
            .execute(&self.backend.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Booking"));
        }

        self.booking_by_id(id).await
    }
}
