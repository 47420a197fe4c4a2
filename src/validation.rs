//! Client-side checks that run before any backend round-trip. A failure here
//! means no query was issued.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap())
}

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap())
}

fn time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{2}:\d{2}$").unwrap())
}

pub fn validate_email(email: &str) -> Result<()> {
    if email_re().is_match(email.trim()) {
        Ok(())
    } else {
        Err(Error::validation("Please enter a valid email address"))
    }
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.len() >= 6 {
        Ok(())
    } else {
        Err(Error::WeakPassword)
    }
}

pub fn validate_name(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(Error::Validation(format!("{field} is required")))
    } else {
        Ok(())
    }
}

/// Structural `YYYY-MM-DD` check; calendar validity is the backend's concern.
pub fn validate_date(date: &str) -> Result<()> {
    if date_re().is_match(date) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "Date must be in YYYY-MM-DD format, got {date:?}"
        )))
    }
}

/// Structural `HH:MM` check.
pub fn validate_time(time: &str) -> Result<()> {
    if time_re().is_match(time) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "Time must be in HH:MM format, got {time:?}"
        )))
    }
}
