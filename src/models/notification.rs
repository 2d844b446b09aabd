// src/models/notification.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Why a notification was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Reaction,
    Comment,
    Follow,
    Like,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Reaction => "reaction",
            NotificationKind::Comment => "comment",
            NotificationKind::Follow => "follow",
            NotificationKind::Like => "like",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reaction" => Ok(NotificationKind::Reaction),
            "comment" => Ok(NotificationKind::Comment),
            "follow" => Ok(NotificationKind::Follow),
            "like" => Ok(NotificationKind::Like),
            other => Err(format!("Unknown notification type '{}'", other)),
        }
    }
}

/// Notification row joined with sender and blog display fields.
#[derive(Debug, Serialize, FromRow)]
pub struct NotificationResponse {
    pub id: i64,
    pub sender_id: i64,
    pub sender_username: String,
    pub notification_type: String,
    pub blog_id: Option<i64>,
    pub blog_slug: Option<String>,
    pub blog_title: Option<String>,
    pub comment_id: Option<i64>,
    pub is_read: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl NotificationResponse {
    /// Human-readable one-liner, e.g. "alice commented on My First Post".
    pub fn describe(&self) -> String {
        let target = self.blog_title.as_deref().unwrap_or("your blog");
        match self.notification_type.parse::<NotificationKind>() {
            Ok(NotificationKind::Follow) => format!("{} started following you", self.sender_username),
            Ok(NotificationKind::Comment) => format!("{} commented on {}", self.sender_username, target),
            Ok(NotificationKind::Reaction) => format!("{} reacted to {}", self.sender_username, target),
            Ok(NotificationKind::Like) => format!("{} liked {}", self.sender_username, target),
            Err(_) => format!("New activity from {}", self.sender_username),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NotificationItem {
    #[serde(flatten)]
    pub notification: NotificationResponse,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct NotificationListResponse {
    pub unread_count: i64,
    pub notifications: Vec<NotificationItem>,
}

#[derive(Debug, Deserialize)]
pub struct NotificationListParams {
    pub limit: Option<i64>,
    #[serde(default)]
    pub unread_only: bool,
}
