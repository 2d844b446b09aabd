// src/handlers/follows.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::{PgConnection, PgPool};

use crate::{
    error::AppError,
    models::follow::{FollowEntry, FollowToggleResponse},
    services::notify::{self, Event},
    utils::jwt::Claims,
};

async fn ensure_user_exists(conn: &mut PgConnection, user_id: i64) -> Result<(), AppError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
    if !exists {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    Ok(())
}

/// Follow or unfollow a user.
///
/// Following notifies the followee; unfollowing withdraws that notification.
pub async fn toggle_follow(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(followee_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let follower_id = claims.user_id()?;

    if follower_id == followee_id {
        return Err(AppError::BadRequest("You cannot follow yourself".to_string()));
    }

    let mut tx = pool.begin().await?;
    ensure_user_exists(&mut tx, followee_id).await?;

    let removed = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followee_id = $2")
        .bind(follower_id)
        .bind(followee_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let following = if removed > 0 {
        notify::retract_follow(&mut tx, follower_id, followee_id).await?;
        false
    } else {
        let inserted = sqlx::query(
            r#"
            INSERT INTO follows (follower_id, followee_id)
            VALUES ($1, $2)
            ON CONFLICT (follower_id, followee_id) DO NOTHING
            "#,
        )
        .bind(follower_id)
        .bind(followee_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        // Zero rows: a concurrent request inserted the follow and notified.
        if inserted == 1 {
            notify::dispatch(
                &mut tx,
                Event::Followed {
                    follower_id,
                    followee_id,
                },
            )
            .await?;
        }
        true
    };

    let followers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE followee_id = $1")
        .bind(followee_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::debug!(follower_id, followee_id, following, "follow toggled");

    Ok(Json(FollowToggleResponse {
        following,
        followers,
    }))
}

/// Users following `user_id`, newest first.
pub async fn list_followers(
    State(pool): State<PgPool>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = pool.acquire().await?;
    ensure_user_exists(&mut conn, user_id).await?;

    let rows = sqlx::query_as::<_, FollowEntry>(
        r#"
        SELECT u.id AS user_id, u.username, f.created_at AS followed_at
        FROM follows f
        JOIN users u ON u.id = f.follower_id
        WHERE f.followee_id = $1
        ORDER BY f.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Json(rows))
}

/// Users that `user_id` follows, newest first.
pub async fn list_following(
    State(pool): State<PgPool>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = pool.acquire().await?;
    ensure_user_exists(&mut conn, user_id).await?;

    let rows = sqlx::query_as::<_, FollowEntry>(
        r#"
        SELECT u.id AS user_id, u.username, f.created_at AS followed_at
        FROM follows f
        JOIN users u ON u.id = f.followee_id
        WHERE f.follower_id = $1
        ORDER BY f.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Json(rows))
}
