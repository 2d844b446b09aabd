// src/handlers/profile.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::{AppError, is_unique_violation},
    handlers::{
        auth::load_user,
        blogs::SUMMARY_SELECT,
        notifications::count_unread,
    },
    models::{
        blog::{BlogStatus, BlogSummary},
        profile::{
            Profile, ProfileResponse, UpdateProfileRequest, UpdateSettingsRequest, UserSettings,
        },
        user::MeResponse,
    },
    utils::jwt::{Claims, Viewer},
};

async fn load_profile(conn: &mut PgConnection, user_id: i64) -> Result<Profile, AppError> {
    sqlx::query_as::<_, Profile>(
        r#"
        SELECT user_id, first_name, last_name, bio, profile_picture, phone_number,
               website, location, birth_date
        FROM profiles
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(AppError::NotFound("Profile not found".to_string()))
}

async fn load_settings(conn: &mut PgConnection, user_id: i64) -> Result<UserSettings, AppError> {
    sqlx::query_as::<_, UserSettings>(
        "SELECT user_id, email_notifications, dark_mode FROM user_settings WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(AppError::NotFound("Settings not found".to_string()))
}

/// Public profile page: published blogs, follow counts and whether the
/// caller follows this user.
pub async fn get_profile(
    State(pool): State<PgPool>,
    Extension(viewer): Extension<Viewer>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = pool.acquire().await?;
    let user = load_user(&mut conn, user_id).await?;
    let profile = load_profile(&mut conn, user_id).await?;

    let blogs = sqlx::query_as::<_, BlogSummary>(&format!(
        "{} WHERE b.author_id = $1 AND b.status = $2 ORDER BY b.created_at DESC",
        SUMMARY_SELECT
    ))
    .bind(user_id)
    .bind(BlogStatus::Published)
    .fetch_all(&mut *conn)
    .await?;

    let (followers, following) = sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM follows WHERE followee_id = $1),
            (SELECT COUNT(*) FROM follows WHERE follower_id = $1)
        "#,
    )
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;

    let is_following = match viewer.user_id() {
        Some(viewer_id) => sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = $1 AND followee_id = $2)",
        )
        .bind(viewer_id)
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?,
        None => false,
    };

    Ok(Json(ProfileResponse {
        id: user.id,
        username: user.username,
        profile,
        blogs,
        followers,
        following,
        is_following,
    }))
}

/// Get current user's account, profile and settings.
pub async fn get_me(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let mut conn = pool.acquire().await?;
    let user = load_user(&mut conn, user_id).await?;
    let profile = load_profile(&mut conn, user_id).await?;
    let settings = load_settings(&mut conn, user_id).await?;

    let blogs_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blogs WHERE author_id = $1")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
    drop(conn);

    Ok(Json(MeResponse {
        user,
        profile,
        settings,
        blogs_count,
        unread_notifications: count_unread(&pool, user_id).await?,
    }))
}

/// Update the caller's username and profile fields.
pub async fn update_profile(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(mut payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.normalize();
    payload.validate()?;
    let user_id = claims.user_id()?;

    let mut tx = pool.begin().await?;

    if let Some(username) = &payload.username {
        sqlx::query("UPDATE users SET username = $1 WHERE id = $2")
            .bind(username)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict(
                        "This username is already taken. Please choose a different one."
                            .to_string(),
                    )
                } else {
                    AppError::from(e)
                }
            })?;
    }

    if !payload.is_empty() {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE profiles SET user_id = user_id");

        if let Some(v) = &payload.first_name {
            builder.push(", first_name = ").push_bind(v.clone());
        }
        if let Some(v) = &payload.last_name {
            builder.push(", last_name = ").push_bind(v.clone());
        }
        if let Some(v) = &payload.bio {
            builder.push(", bio = ").push_bind(v.clone());
        }
        if let Some(v) = &payload.profile_picture {
            builder.push(", profile_picture = ").push_bind(v.clone());
        }
        if let Some(v) = &payload.phone_number {
            builder.push(", phone_number = ").push_bind(v.clone());
        }
        if let Some(v) = &payload.website {
            builder.push(", website = ").push_bind(v.clone());
        }
        if let Some(v) = &payload.location {
            builder.push(", location = ").push_bind(v.clone());
        }
        if let Some(v) = payload.birth_date {
            builder.push(", birth_date = ").push_bind(v);
        }

        builder.push(" WHERE user_id = ").push_bind(user_id);
        builder.build().execute(&mut *tx).await?;
    }

    let profile = load_profile(&mut tx, user_id).await?;
    tx.commit().await?;

    Ok(Json(profile))
}

pub async fn get_settings(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let mut conn = pool.acquire().await?;
    Ok(Json(load_settings(&mut conn, user_id).await?))
}

pub async fn update_settings(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateSettingsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let settings = sqlx::query_as::<_, UserSettings>(
        r#"
        UPDATE user_settings
        SET email_notifications = COALESCE($1, email_notifications),
            dark_mode = COALESCE($2, dark_mode)
        WHERE user_id = $3
        RETURNING user_id, email_notifications, dark_mode
        "#,
    )
    .bind(payload.email_notifications)
    .bind(payload.dark_mode)
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Settings not found".to_string()))?;

    Ok(Json(settings))
}
