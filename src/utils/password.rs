use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::AppError;

const MIN_PASSWORD_LENGTH: usize = 8;

/// Passwords rejected outright regardless of length.
const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "password123", "12345678", "123456789", "qwertyuiop",
    "iloveyou", "sunshine", "football", "baseball", "welcome1", "letmein1",
    "abc12345", "trustno1", "passw0rd", "superman", "1q2w3e4r", "qwerty123",
];

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::InternalServerError(e.to_string()))
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Checks a new password against the account password policy.
///
/// Returns the first violated rule as a `BadRequest`.
pub fn check_password_policy(
    password: &str,
    confirm: &str,
    username: &str,
) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::BadRequest(format!(
            "The password must be at least {} characters long.",
            MIN_PASSWORD_LENGTH
        )));
    }

    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::BadRequest(
            "The password cannot be entirely numeric. Please add letters.".to_string(),
        ));
    }

    let lowered = password.to_lowercase();
    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        return Err(AppError::BadRequest(
            "This password is too common. Please choose a stronger password.".to_string(),
        ));
    }

    let username = username.trim().to_lowercase();
    if !username.is_empty() && lowered.contains(&username) {
        return Err(AppError::BadRequest(
            "This password is too similar to your username.".to_string(),
        ));
    }

    if password != confirm {
        return Err(AppError::BadRequest(
            "The passwords you entered do not match.".to_string(),
        ));
    }

    Ok(())
}
