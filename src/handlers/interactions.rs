use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    error::AppError,
    handlers::blogs::find_published,
    models::interaction::InteractionResponse,
    services::notify::{self, Event},
    utils::jwt::Claims,
};

/// Toggle Like on a blog. Liking (not unliking) notifies the author.
pub async fn toggle_like(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let mut tx = pool.begin().await?;
    let blog = find_published(&mut tx, &slug).await?;

    let liked: bool = sqlx::query_scalar(
        r#"
        INSERT INTO user_blog_interactions (user_id, blog_id, liked, last_interaction)
        VALUES ($1, $2, TRUE, NOW())
        ON CONFLICT (user_id, blog_id)
        DO UPDATE SET liked = NOT user_blog_interactions.liked, last_interaction = NOW()
        RETURNING liked
        "#,
    )
    .bind(user_id)
    .bind(blog.id)
    .fetch_one(&mut *tx)
    .await?;

    if liked {
        notify::dispatch(
            &mut tx,
            Event::Liked {
                user_id,
                blog_author_id: blog.author_id,
                blog_id: blog.id,
            },
        )
        .await?;
    }

    let likes: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_blog_interactions WHERE blog_id = $1 AND liked",
    )
    .bind(blog.id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Json(serde_json::json!({ "liked": liked, "likes_count": likes })))
}

/// Toggle Favorite on a blog.
pub async fn toggle_favorite(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let mut tx = pool.begin().await?;
    let blog = find_published(&mut tx, &slug).await?;

    let favorited: bool = sqlx::query_scalar(
        r#"
        INSERT INTO user_blog_interactions (user_id, blog_id, is_favorite, last_interaction)
        VALUES ($1, $2, TRUE, NOW())
        ON CONFLICT (user_id, blog_id)
        DO UPDATE SET is_favorite = NOT user_blog_interactions.is_favorite, last_interaction = NOW()
        RETURNING is_favorite
        "#,
    )
    .bind(user_id)
    .bind(blog.id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Json(serde_json::json!({ "favorited": favorited })))
}

/// List the caller's blog interactions, most recent first.
pub async fn list_my_interactions(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let rows = sqlx::query_as::<_, InteractionResponse>(
        r#"
        SELECT i.blog_id, b.slug, b.title, i.is_favorite, i.liked, i.commented, i.last_interaction
        FROM user_blog_interactions i
        JOIN blogs b ON b.id = i.blog_id
        WHERE i.user_id = $1
        ORDER BY i.last_interaction DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(rows))
}
