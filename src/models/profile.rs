// src/models/profile.rs

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use url::Url;
use validator::{Validate, ValidationError};

use super::blog::BlogSummary;

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?1?[0-9]{9,15}$").expect("valid regex"));

/// Latest accepted birth year.
const MAX_BIRTH_YEAR: i32 = 2020;

/// Represents the 'profiles' table. Created alongside every user.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Profile {
    #[serde(skip)]
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub phone_number: String,
    pub website: Option<String>,
    pub location: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

/// Represents the 'user_settings' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserSettings {
    #[serde(skip)]
    pub user_id: i64,
    pub email_notifications: bool,
    pub dark_mode: bool,
}

/// Public profile page payload.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: i64,
    pub username: String,
    pub profile: Profile,
    pub blogs: Vec<BlogSummary>,
    pub followers: i64,
    pub following: i64,
    /// Whether the caller follows this user. Always false for anonymous callers.
    pub is_following: bool,
}

/// DTO for updating the caller's profile. Absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: Option<String>,
    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
    #[validate(length(max = 2000))]
    pub bio: Option<String>,
    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub profile_picture: Option<String>,
    #[validate(
        length(max = 15, message = "Phone number must be at most 15 characters."),
        custom(function = validate_phone)
    )]
    pub phone_number: Option<String>,
    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub website: Option<String>,
    #[validate(length(max = 100))]
    pub location: Option<String>,
    #[validate(custom(function = validate_birth_date))]
    pub birth_date: Option<NaiveDate>,
}

impl UpdateProfileRequest {
    /// Trims the free-text identity fields. Call before `validate`.
    pub fn normalize(&mut self) {
        for field in [
            &mut self.username,
            &mut self.first_name,
            &mut self.last_name,
            &mut self.phone_number,
        ] {
            if let Some(v) = field {
                *v = v.trim().to_string();
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.bio.is_none()
            && self.profile_picture.is_none()
            && self.phone_number.is_none()
            && self.website.is_none()
            && self.location.is_none()
            && self.birth_date.is_none()
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub email_notifications: Option<bool>,
    pub dark_mode: Option<bool>,
}

pub fn validate_url_string(url: &str) -> Result<(), ValidationError> {
    if Url::parse(url).is_err() {
        return Err(ValidationError::new("invalid_url"));
    }
    Ok(())
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if !PHONE_RE.is_match(phone) {
        let mut err = ValidationError::new("invalid_phone");
        err.message = Some("Enter a valid phone number. Example: +1234567890".into());
        return Err(err);
    }
    Ok(())
}

fn validate_birth_date(date: &NaiveDate) -> Result<(), ValidationError> {
    if date.year() > MAX_BIRTH_YEAR {
        let mut err = ValidationError::new("invalid_birth_date");
        err.message = Some("Please enter a valid birth date.".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> UpdateProfileRequest {
        UpdateProfileRequest {
            username: None,
            first_name: None,
            last_name: None,
            bio: None,
            profile_picture: None,
            phone_number: None,
            website: None,
            location: None,
            birth_date: None,
        }
    }

    #[test]
    fn phone_numbers() {
        assert!(validate_phone("+1234567890").is_ok());
        assert!(validate_phone("123456789012345").is_ok());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("+12-345-6789").is_err());
        // Arabic-Indic digits are not ASCII digits.
        assert!(validate_phone("+1\u{663}\u{664}\u{665}\u{666}\u{667}\u{668}\u{669}\u{660}\u{661}").is_err());
    }

    #[test]
    fn phone_longer_than_column_rejected() {
        let mut req = empty();
        req.phone_number = Some("+1123456789012345".into());
        assert!(req.validate().is_err());
        req.phone_number = Some("1123456789012345".into());
        assert!(req.validate().is_err());
        req.phone_number = Some("+11234567890123".into());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn padded_short_username_rejected_after_trim() {
        let mut req = empty();
        req.username = Some("  ab  ".into());
        req.normalize();
        assert!(req.validate().is_err());
        req.username = Some("  abc ".into());
        req.normalize();
        assert_eq!(req.username.as_deref(), Some("abc"));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn birth_year_after_2020_rejected() {
        let mut req = empty();
        req.birth_date = NaiveDate::from_ymd_opt(2021, 1, 1);
        assert!(req.validate().is_err());
        req.birth_date = NaiveDate::from_ymd_opt(1990, 6, 15);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn website_must_be_url() {
        let mut req = empty();
        req.website = Some("not a url".into());
        assert!(req.validate().is_err());
        req.website = Some("https://example.com/me".into());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn empty_update_is_detected() {
        assert!(empty().is_empty());
    }
}
