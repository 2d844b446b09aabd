// src/services/otp.rs

use chrono::{DateTime, Utc};
use rand::Rng;
use sqlx::PgConnection;

use crate::{config::OTP_LENGTH, error::AppError, models::otp::Otp};

/// Why a submitted passcode was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpRejection {
    Missing,
    Mismatch,
    Expired,
}

impl From<OtpRejection> for AppError {
    fn from(r: OtpRejection) -> Self {
        let msg = match r {
            OtpRejection::Missing => "No pending verification code. Request a new one.",
            OtpRejection::Mismatch => "Invalid verification code.",
            OtpRejection::Expired => "The verification code has expired. Request a new one.",
        };
        AppError::BadRequest(msg.to_string())
    }
}

/// Random numeric passcode of `OTP_LENGTH` digits. Leading zeros are allowed.
pub fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..OTP_LENGTH)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

/// Checks a submitted code against the user's pending passcode.
pub fn check(
    pending: Option<&Otp>,
    submitted: &str,
    now: DateTime<Utc>,
    ttl_secs: i64,
) -> Result<(), OtpRejection> {
    let otp = pending.ok_or(OtpRejection::Missing)?;

    if otp.is_expired(now, ttl_secs) {
        return Err(OtpRejection::Expired);
    }
    if otp.code.trim() != submitted.trim() {
        return Err(OtpRejection::Mismatch);
    }
    Ok(())
}

/// Drops the user's unverified passcodes and stores a fresh one.
pub async fn issue(conn: &mut PgConnection, user_id: i64) -> Result<Otp, AppError> {
    sqlx::query("DELETE FROM otps WHERE user_id = $1 AND is_verified = FALSE")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    let otp = sqlx::query_as::<_, Otp>(
        r#"
        INSERT INTO otps (user_id, code)
        VALUES ($1, $2)
        RETURNING id, user_id, code, created_at, is_verified
        "#,
    )
    .bind(user_id)
    .bind(generate_code())
    .fetch_one(&mut *conn)
    .await?;

    Ok(otp)
}

/// Most recent unverified passcode for the user.
pub async fn latest_pending(conn: &mut PgConnection, user_id: i64) -> Result<Option<Otp>, AppError> {
    let otp = sqlx::query_as::<_, Otp>(
        r#"
        SELECT id, user_id, code, created_at, is_verified
        FROM otps
        WHERE user_id = $1 AND is_verified = FALSE
        ORDER BY created_at DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(otp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn otp(code: &str, age_secs: i64) -> Otp {
        Otp {
            id: 1,
            user_id: 1,
            code: code.to_string(),
            created_at: Utc::now() - Duration::seconds(age_secs),
            is_verified: false,
        }
    }

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn fresh_matching_code_passes() {
        assert_eq!(check(Some(&otp("123456", 10)), "123456", Utc::now(), 300), Ok(()));
    }

    #[test]
    fn rejections() {
        let now = Utc::now();
        assert_eq!(check(None, "123456", now, 300), Err(OtpRejection::Missing));
        assert_eq!(
            check(Some(&otp("123456", 10)), "654321", now, 300),
            Err(OtpRejection::Mismatch)
        );
        assert_eq!(
            check(Some(&otp("123456", 301)), "123456", now, 300),
            Err(OtpRejection::Expired)
        );
    }
}
