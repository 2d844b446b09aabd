// src/models/blog.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::{
    profile::validate_url_string,
    reaction::ReactionSummary,
    taxonomy::{Category, Tag},
};

/// Publication state, stored as SMALLINT (0 = draft, 1 = published).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
#[serde(rename_all = "lowercase")]
pub enum BlogStatus {
    Draft = 0,
    Published = 1,
}

impl BlogStatus {
    pub fn from_publish_flag(publish: bool) -> Self {
        if publish {
            BlogStatus::Published
        } else {
            BlogStatus::Draft
        }
    }
}

/// Represents the 'blogs' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Blog {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub blog_image: Option<String>,
    pub status: BlogStatus,
    pub featured: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub modified_at: chrono::DateTime<chrono::Utc>,
}

/// List row: blog joined with its author and counters.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BlogSummary {
    pub id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub blog_image: Option<String>,
    pub status: BlogStatus,
    pub featured: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub modified_at: chrono::DateTime<chrono::Utc>,
    pub comments_count: i64,
    pub reactions_count: i64,
}

/// Full blog page payload.
#[derive(Debug, Serialize)]
pub struct BlogDetail {
    #[serde(flatten)]
    pub blog: BlogSummary,
    pub tags: Vec<Tag>,
    pub categories: Vec<Category>,
    pub reactions: ReactionSummary,
    pub likes_count: i64,
}

/// DTO for creating a new blog.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBlogRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title length must be between 1 and 200 chars"
    ))]
    pub title: String,

    #[validate(length(min = 1, max = 100000, message = "Content must not be empty"))]
    pub content: String,

    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub blog_image: Option<String>,

    /// `true` publishes immediately, `false` saves a draft.
    #[serde(default)]
    pub publish: bool,

    #[serde(default)]
    #[validate(length(max = 5, message = "You can select up to 5 tags only."))]
    pub tags: Vec<i64>,

    #[serde(default)]
    #[validate(length(max = 3, message = "You can select up to 3 categories only."))]
    pub categories: Vec<i64>,
}

impl CreateBlogRequest {
    /// Trims the title. Call before `validate`.
    pub fn normalize(&mut self) {
        self.title = self.title.trim().to_string();
    }
}

/// DTO for updating a blog. Absent fields are left unchanged.
/// The slug is fixed at creation and never follows title edits.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBlogRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 100000))]
    pub content: Option<String>,
    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub blog_image: Option<String>,
    pub publish: Option<bool>,
    #[validate(length(max = 5, message = "You can select up to 5 tags only."))]
    pub tags: Option<Vec<i64>>,
    #[validate(length(max = 3, message = "You can select up to 3 categories only."))]
    pub categories: Option<Vec<i64>>,
}

impl UpdateBlogRequest {
    pub fn normalize(&mut self) {
        if let Some(title) = &mut self.title {
            *title = title.trim().to_string();
        }
    }
}

/// Query parameters for listing published blogs.
#[derive(Debug, Deserialize)]
pub struct BlogListParams {
    /// Cursor for pagination: the created_at timestamp of the last blog in the previous page.
    pub cursor: Option<chrono::DateTime<chrono::Utc>>,

    /// Id of that last blog. Breaks ties between blogs sharing a timestamp.
    pub cursor_id: Option<i64>,

    /// Number of items to return (default: 20, max: 100).
    pub limit: Option<i64>,

    /// Tag name filter.
    pub tag: Option<String>,

    /// Category name filter.
    pub category: Option<String>,

    pub featured: Option<bool>,

    /// Author username filter.
    pub author: Option<String>,

    /// Search keyword for title match.
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetFeaturedRequest {
    pub featured: bool,
}

/// Removes duplicate ids while keeping their first-seen order.
pub fn dedup_ids(ids: &[i64]) -> Vec<i64> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(*id);
        }
    }
    out
}
