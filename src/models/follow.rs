use serde::Serialize;
use sqlx::FromRow;

/// A user appearing in someone's follower or following list.
#[derive(Debug, Serialize, FromRow)]
pub struct FollowEntry {
    pub user_id: i64,
    pub username: String,
    pub followed_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct FollowToggleResponse {
    pub following: bool,
    pub followers: i64,
}
