use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

pub const TIER_FREE: &str = "free";
pub const TIER_PREMIUM: &str = "premium";

/// Authentication identity, distinct from the profile row and linked to it by
/// a shared id.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountRow {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub email_confirmed: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub neighborhood: Option<String>,
    pub activity_zone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub avatar_url: Option<String>,
    pub is_provider: bool,
    pub is_verified: bool,
    pub is_premium: bool,
    pub subscription_tier: Option<String>,
    pub bio: Option<String>,
    pub skills: Option<String>,
    pub instagram: Option<String>,
    pub tiktok: Option<String>,
    pub years_experience: Option<i64>,
    pub accepts_emergency: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl UserRow {
    /// The skill set, decoded from its JSON column. Malformed or absent
    /// content reads as empty rather than failing a profile fetch.
    pub fn skill_list(&self) -> Vec<String> {
        self.skills
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRow {
    pub id: String,
    pub user_id: String,
    pub created_at: String,
    pub expires_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::NoShow => "no_show",
        }
    }

    /// The booking lifecycle: pending bookings get confirmed or cancelled,
    /// confirmed bookings complete, get cancelled, or end as a no-show.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Completed)
                | (Confirmed, Cancelled)
                | (Confirmed, NoShow)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "no_show" => Ok(BookingStatus::NoShow),
            other => Err(Error::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BookingRow {
    pub id: String,
    pub client_id: String,
    pub provider_id: String,
    pub service_id: Option<String>,
    pub date: String,
    pub time: String,
    pub duration_minutes: i64,
    pub price: f64,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: String,
}

/// Provider-facing booking projection, joined with the client profile fields
/// the dashboard displays.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BookingWithClient {
    pub id: String,
    pub client_id: String,
    pub provider_id: String,
    pub service_id: Option<String>,
    pub date: String,
    pub time: String,
    pub duration_minutes: i64,
    pub price: f64,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: String,
    pub client_first_name: Option<String>,
    pub client_last_name: Option<String>,
    pub client_phone: Option<String>,
    pub client_avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ServiceRow {
    pub id: String,
    pub provider_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration_minutes: i64,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategoryRow {
    pub id: String,
    pub name: String,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FavoriteRow {
    pub id: String,
    pub user_id: String,
    pub provider_id: String,
    pub category: Option<String>,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Completed,
            BookingStatus::Cancelled,
            BookingStatus::NoShow,
        ] {
            assert_eq!(status.as_str().parse::<BookingStatus>().unwrap(), status);
        }
        assert!("unknown".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn lifecycle_table_matches_expectations() {
        use BookingStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Completed));
        assert!(Confirmed.can_transition_to(NoShow));
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Confirmed));
        assert!(!Pending.can_transition_to(Completed));
    }

    #[test]
    fn skill_list_tolerates_bad_json() {
        let mut user = sample_user();
        user.skills = Some("[\"Coloration\",\"Balayage\"]".to_string());
        assert_eq!(user.skill_list(), vec!["Coloration", "Balayage"]);

        user.skills = Some("not json".to_string());
        assert!(user.skill_list().is_empty());

        user.skills = None;
        assert!(user.skill_list().is_empty());
    }

    fn sample_user() -> UserRow {
        UserRow {
            id: "u1".into(),
            email: "u1@example.com".into(),
            first_name: "Test".into(),
            last_name: "User".into(),
            phone: None,
            city: None,
            neighborhood: None,
            activity_zone: None,
            latitude: None,
            longitude: None,
            avatar_url: None,
            is_provider: false,
            is_verified: false,
            is_premium: false,
            subscription_tier: None,
            bio: None,
            skills: None,
            instagram: None,
            tiktok: None,
            years_experience: None,
            accepts_emergency: false,
            created_at: "2024-01-01T00:00:00+00:00".into(),
            updated_at: "2024-01-01T00:00:00+00:00".into(),
        }
    }
}
