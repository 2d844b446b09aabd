// src/handlers/reactions.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;

use crate::{
    error::AppError,
    handlers::blogs::{find_published, reaction_summary},
    models::reaction::{ReactionKind, ReactionOutcome, SaveReactionRequest},
    services::notify::{self, Event},
    utils::jwt::{Claims, Viewer},
};

/// Set, change or clear the caller's reaction to a blog.
///
/// Reacting with the same kind twice clears it. Only a brand-new reaction
/// notifies the author; switching kinds does not.
pub async fn save_reaction(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
    Json(payload): Json<SaveReactionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let requested: ReactionKind = payload.reaction.parse().map_err(AppError::BadRequest)?;

    let mut tx = pool.begin().await?;
    let blog = find_published(&mut tx, &slug).await?;

    // Locks the caller's row until commit.
    let existing = sqlx::query_scalar::<_, String>(
        "SELECT reaction_type FROM reactions WHERE blog_id = $1 AND user_id = $2 FOR UPDATE",
    )
    .bind(blog.id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?
    .and_then(|kind| kind.parse::<ReactionKind>().ok());

    let outcome = ReactionOutcome::decide(existing, requested);

    match outcome {
        ReactionOutcome::Created => {
            let inserted = sqlx::query(
                r#"
                INSERT INTO reactions (blog_id, user_id, reaction_type)
                VALUES ($1, $2, $3)
                ON CONFLICT (blog_id, user_id) DO NOTHING
                "#,
            )
            .bind(blog.id)
            .bind(user_id)
            .bind(requested.as_str())
            .execute(&mut *tx)
            .await?;

            if inserted.rows_affected() == 0 {
                return Err(AppError::Conflict("Reaction already recorded".to_string()));
            }

            notify::dispatch(
                &mut tx,
                Event::Reacted {
                    user_id,
                    blog_author_id: blog.author_id,
                    blog_id: blog.id,
                },
            )
            .await?;
        }
        ReactionOutcome::Updated => {
            sqlx::query(
                "UPDATE reactions SET reaction_type = $1 WHERE blog_id = $2 AND user_id = $3",
            )
            .bind(requested.as_str())
            .bind(blog.id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }
        ReactionOutcome::Removed => {
            sqlx::query("DELETE FROM reactions WHERE blog_id = $1 AND user_id = $2")
                .bind(blog.id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }
    }

    let summary = reaction_summary(&mut tx, blog.id, Some(user_id)).await?;
    tx.commit().await?;

    Ok(Json(json!({
        "outcome": outcome,
        "reactions": summary,
    })))
}

/// Reaction counts for a published blog, zero-filled for every kind.
pub async fn get_reactions(
    State(pool): State<PgPool>,
    Extension(viewer): Extension<Viewer>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = pool.acquire().await?;
    let blog = find_published(&mut conn, &slug).await?;
    let summary = reaction_summary(&mut conn, blog.id, viewer.user_id()).await?;

    Ok(Json(summary))
}
