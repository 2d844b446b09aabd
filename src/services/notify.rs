// src/services/notify.rs

//! Notification fan-out.
//!
//! Social writes (follow, comment, reaction, like) call `dispatch` with the
//! same connection they wrote through, so an event and its notification
//! commit or roll back together.

use sqlx::PgConnection;

use crate::{error::AppError, models::notification::NotificationKind};

/// A social event that may notify someone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Followed {
        follower_id: i64,
        followee_id: i64,
    },
    Commented {
        commenter_id: i64,
        blog_author_id: i64,
        blog_id: i64,
        comment_id: i64,
    },
    Reacted {
        user_id: i64,
        blog_author_id: i64,
        blog_id: i64,
    },
    Liked {
        user_id: i64,
        blog_author_id: i64,
        blog_id: i64,
    },
}

/// A notification row ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub recipient_id: i64,
    pub sender_id: i64,
    pub kind: NotificationKind,
    pub blog_id: Option<i64>,
    pub comment_id: Option<i64>,
}

/// Decides who, if anyone, hears about `event`.
/// Nobody is notified about their own actions.
pub fn plan(event: Event) -> Option<NewNotification> {
    let planned = match event {
        Event::Followed {
            follower_id,
            followee_id,
        } => NewNotification {
            recipient_id: followee_id,
            sender_id: follower_id,
            kind: NotificationKind::Follow,
            blog_id: None,
            comment_id: None,
        },
        Event::Commented {
            commenter_id,
            blog_author_id,
            blog_id,
            comment_id,
        } => NewNotification {
            recipient_id: blog_author_id,
            sender_id: commenter_id,
            kind: NotificationKind::Comment,
            blog_id: Some(blog_id),
            comment_id: Some(comment_id),
        },
        Event::Reacted {
            user_id,
            blog_author_id,
            blog_id,
        } => NewNotification {
            recipient_id: blog_author_id,
            sender_id: user_id,
            kind: NotificationKind::Reaction,
            blog_id: Some(blog_id),
            comment_id: None,
        },
        Event::Liked {
            user_id,
            blog_author_id,
            blog_id,
        } => NewNotification {
            recipient_id: blog_author_id,
            sender_id: user_id,
            kind: NotificationKind::Like,
            blog_id: Some(blog_id),
            comment_id: None,
        },
    };

    (planned.recipient_id != planned.sender_id).then_some(planned)
}

/// Persists the notification planned for `event`, if any.
/// Returns the new notification id.
pub async fn dispatch(conn: &mut PgConnection, event: Event) -> Result<Option<i64>, AppError> {
    let Some(n) = plan(event) else {
        return Ok(None);
    };

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO notifications (recipient_id, sender_id, notification_type, blog_id, comment_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(n.recipient_id)
    .bind(n.sender_id)
    .bind(n.kind.as_str())
    .bind(n.blog_id)
    .bind(n.comment_id)
    .fetch_one(&mut *conn)
    .await?;

    tracing::debug!(
        notification_id = id,
        recipient = n.recipient_id,
        kind = %n.kind,
        "notification created"
    );

    Ok(Some(id))
}

/// Removes the follow notifications `follower_id` sent `followee_id`,
/// called when the follow is undone.
pub async fn retract_follow(
    conn: &mut PgConnection,
    follower_id: i64,
    followee_id: i64,
) -> Result<u64, AppError> {
    let result = sqlx::query(
        r#"
        DELETE FROM notifications
        WHERE recipient_id = $1 AND sender_id = $2 AND notification_type = $3
        "#,
    )
    .bind(followee_id)
    .bind(follower_id)
    .bind(NotificationKind::Follow.as_str())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}
