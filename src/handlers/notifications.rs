// src/handlers/notifications.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;

use crate::{
    config::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE},
    error::AppError,
    models::notification::{
        NotificationItem, NotificationListParams, NotificationListResponse, NotificationResponse,
    },
    utils::jwt::Claims,
};

pub(crate) async fn count_unread(pool: &PgPool, user_id: i64) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND is_read = FALSE",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// List the caller's notifications, newest first, with the unread count.
pub async fn list_notifications(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<NotificationListParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let rows = sqlx::query_as::<_, NotificationResponse>(
        r#"
        SELECT
            n.id, n.sender_id, s.username AS sender_username, n.notification_type,
            n.blog_id, b.slug AS blog_slug, b.title AS blog_title,
            n.comment_id, n.is_read, n.created_at
        FROM notifications n
        JOIN users s ON s.id = n.sender_id
        LEFT JOIN blogs b ON b.id = n.blog_id
        WHERE n.recipient_id = $1
          AND ($2::BOOLEAN = FALSE OR n.is_read = FALSE)
        ORDER BY n.created_at DESC, n.id DESC
        LIMIT $3
        "#,
    )
    .bind(user_id)
    .bind(params.unread_only)
    .bind(limit)
    .fetch_all(&pool)
    .await?;

    let notifications = rows
        .into_iter()
        .map(|n| NotificationItem {
            message: n.describe(),
            notification: n,
        })
        .collect();

    Ok(Json(NotificationListResponse {
        unread_count: count_unread(&pool, user_id).await?,
        notifications,
    }))
}

pub async fn unread_count(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let count = count_unread(&pool, user_id).await?;
    Ok(Json(json!({ "unread_count": count })))
}

/// Mark one notification as read. Only its recipient may do so.
pub async fn mark_as_read(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let result = sqlx::query(
        "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND recipient_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Notification not found".to_string()));
    }

    Ok(Json(json!({ "id": id, "is_read": true })))
}

pub async fn mark_all_as_read(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let result = sqlx::query(
        "UPDATE notifications SET is_read = TRUE WHERE recipient_id = $1 AND is_read = FALSE",
    )
    .bind(user_id)
    .execute(&pool)
    .await?;

    Ok(Json(json!({ "updated": result.rows_affected() })))
}
