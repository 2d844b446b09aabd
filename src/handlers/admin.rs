// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        blog::SetFeaturedRequest,
        user::{UserListEntry, normalize_email},
    },
    utils::jwt::Claims,
};

/// Lists all users in the system.
/// Admin only.
pub async fn list_users(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, UserListEntry>(
        r#"
        SELECT
            u.id, u.username, u.email, u.role, u.is_active, u.email_verified, u.created_at,
            a.last_login_time
        FROM users u
        LEFT JOIN user_activity a ON a.user_id = u.id
        ORDER BY u.id DESC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list users: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(users))
}

#[derive(Debug, Deserialize)]
pub struct DeleteUserParams {
    pub email: String,
}

/// Deletes a user by e-mail. Profile, blogs and every other owned row go
/// with it (ON DELETE CASCADE).
/// Admin only. Prevents deleting self.
pub async fn delete_user_by_email(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<DeleteUserParams>,
) -> Result<impl IntoResponse, AppError> {
    let email = normalize_email(&params.email);
    let current_user_id = claims.user_id()?;

    let target: Option<(i64, String)> =
        sqlx::query_as("SELECT id, username FROM users WHERE email = $1")
            .bind(&email)
            .fetch_optional(&pool)
            .await?;

    let (id, username) = target.ok_or(AppError::NotFound(format!(
        "No user found with email '{}'.",
        email
    )))?;

    if id == current_user_id {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete user: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    tracing::info!("User '{}' with email '{}' deleted", username, email);

    Ok(StatusCode::NO_CONTENT)
}

/// Marks or unmarks a blog as featured.
/// Admin only.
pub async fn set_featured(
    State(pool): State<PgPool>,
    Path(slug): Path<String>,
    Json(payload): Json<SetFeaturedRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("UPDATE blogs SET featured = $1 WHERE slug = $2")
        .bind(payload.featured)
        .bind(&slug)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Blog not found".to_string()));
    }

    Ok(Json(serde_json::json!({ "slug": slug, "featured": payload.featured })))
}
