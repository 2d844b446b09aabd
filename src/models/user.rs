// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::profile::{Profile, UserSettings};

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    pub username: String,

    pub email: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    /// User role: 'user' or 'admin'.
    pub role: String,

    pub is_active: bool,

    /// Set once the user proves ownership of `email` (OTP or link).
    pub email_verified: bool,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// Aggregated account data for the current user.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: User,
    pub profile: Profile,
    pub settings: UserSettings,
    pub blogs_count: i64,
    pub unread_notifications: i64,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username length must be between 3 and 50 characters."
    ))]
    pub username: String,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(max = 128, message = "Password is too long."))]
    pub password: String,
    pub password_confirm: String,
}

/// DTO for user login. `username` may also be an e-mail address.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 254, message = "Username or Email is required."))]
    pub username: String,
    #[validate(length(min = 1, max = 128, message = "Password is required."))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(max = 128))]
    pub new_password: String,
    pub new_password_confirm: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(equal = 6, message = "The code must be 6 digits."))]
    pub code: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResendOtpRequest {
    #[validate(email)]
    pub email: String,
}

/// Starts a password reset for the account owning `email`.
#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

/// Completes a password reset with the token from the reset mail.
#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "The reset token is required."))]
    pub token: String,
    #[validate(length(max = 128))]
    pub new_password: String,
    pub new_password_confirm: String,
}

impl RegisterRequest {
    /// Trims the username and normalizes the e-mail. Call before `validate`.
    pub fn normalize(&mut self) {
        self.username = self.username.trim().to_string();
        self.email = normalize_email(&self.email);
    }
}

impl VerifyOtpRequest {
    pub fn normalize(&mut self) {
        self.email = normalize_email(&self.email);
        self.code = self.code.trim().to_string();
    }
}

impl ResendOtpRequest {
    pub fn normalize(&mut self) {
        self.email = normalize_email(&self.email);
    }
}

impl ForgotPasswordRequest {
    pub fn normalize(&mut self) {
        self.email = normalize_email(&self.email);
    }
}

/// Row shape for the admin user listing.
#[derive(Debug, Serialize, FromRow)]
pub struct UserListEntry {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
    pub is_active: bool,
    pub email_verified: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_login_time: Option<chrono::DateTime<chrono::Utc>>,
}

/// Normalizes an e-mail address for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
