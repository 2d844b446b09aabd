use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Represents the 'otps' table. One row per issued passcode.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Otp {
    pub id: i64,
    pub user_id: i64,
    #[serde(skip)]
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub is_verified: bool,
}

impl Otp {
    pub fn expires_at(&self, ttl_secs: i64) -> DateTime<Utc> {
        self.created_at + Duration::seconds(ttl_secs)
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl_secs: i64) -> bool {
        now > self.expires_at(ttl_secs)
    }
}
