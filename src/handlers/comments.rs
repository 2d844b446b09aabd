use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::blogs::find_published,
    models::comment::{CommentResponse, CreateCommentRequest},
    services::notify::{self, Event},
    utils::{jwt::Claims, text::strip_html},
};

/// Create a new comment on a published blog and notify its author.
pub async fn add_comment(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id()?;

    let content = strip_html(payload.content.trim());
    if content.is_empty() {
        return Err(AppError::BadRequest("Comment must not be empty".to_string()));
    }

    let mut tx = pool.begin().await?;
    let blog = find_published(&mut tx, &slug).await?;

    let comment = sqlx::query_as::<_, CommentResponse>(
        r#"
        WITH inserted AS (
            INSERT INTO comments (blog_id, author_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, blog_id, author_id, content, created_at
        )
        SELECT i.id, i.blog_id, i.author_id, u.username, i.content, i.created_at
        FROM inserted i
        JOIN users u ON u.id = i.author_id
        "#,
    )
    .bind(blog.id)
    .bind(user_id)
    .bind(&content)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO user_blog_interactions (user_id, blog_id, commented, last_interaction)
        VALUES ($1, $2, TRUE, NOW())
        ON CONFLICT (user_id, blog_id)
        DO UPDATE SET commented = TRUE, last_interaction = NOW()
        "#,
    )
    .bind(user_id)
    .bind(blog.id)
    .execute(&mut *tx)
    .await?;

    notify::dispatch(
        &mut tx,
        Event::Commented {
            commenter_id: user_id,
            blog_author_id: blog.author_id,
            blog_id: blog.id,
            comment_id: comment.id,
        },
    )
    .await?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// List all comments for a published blog, oldest first.
pub async fn list_comments(
    State(pool): State<PgPool>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = pool.acquire().await?;
    let blog = find_published(&mut conn, &slug).await?;

    let comments = sqlx::query_as::<_, CommentResponse>(
        r#"
        SELECT c.id, c.blog_id, c.author_id, u.username, c.content, c.created_at
        FROM comments c
        JOIN users u ON c.author_id = u.id
        WHERE c.blog_id = $1
        ORDER BY c.created_at ASC, c.id ASC
        "#,
    )
    .bind(blog.id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Json(comments))
}
