use serde::Serialize;
use sqlx::FromRow;

/// A row of 'user_blog_interactions' joined with the blog it refers to.
#[derive(Debug, Serialize, FromRow)]
pub struct InteractionResponse {
    pub blog_id: i64,
    pub slug: String,
    pub title: String,
    pub is_favorite: bool,
    pub liked: bool,
    pub commented: bool,
    pub last_interaction: chrono::DateTime<chrono::Utc>,
}
