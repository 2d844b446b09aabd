// src/handlers/blogs.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    config::{DEFAULT_PAGE_SIZE, MAX_CATEGORIES_PER_BLOG, MAX_PAGE_SIZE, MAX_TAGS_PER_BLOG},
    error::{AppError, is_unique_violation},
    models::{
        blog::{
            Blog, BlogDetail, BlogListParams, BlogStatus, BlogSummary, CreateBlogRequest,
            UpdateBlogRequest, dedup_ids,
        },
        reaction::{ReactionKind, ReactionSummary},
        taxonomy::{Category, Tag},
    },
    utils::{
        jwt::{Claims, Viewer},
        text::{clean_html, escape_like, numbered_slug, slugify},
    },
};

/// Blog joined with author and counters. Callers append WHERE/ORDER clauses.
pub(crate) const SUMMARY_SELECT: &str = r#"
    SELECT
        b.id, b.author_id, u.username AS author_username, b.title, b.slug, b.content,
        b.blog_image, b.status, b.featured, b.created_at, b.modified_at,
        (SELECT COUNT(*) FROM comments c WHERE c.blog_id = b.id) AS comments_count,
        (SELECT COUNT(*) FROM reactions r WHERE r.blog_id = b.id) AS reactions_count
    FROM blogs b
    JOIN users u ON u.id = b.author_id
"#;

/// Fetches a blog by slug regardless of status.
pub(crate) async fn find_by_slug(conn: &mut PgConnection, slug: &str) -> Result<Blog, AppError> {
    sqlx::query_as::<_, Blog>(
        r#"
        SELECT id, author_id, title, slug, content, blog_image, status, featured,
               created_at, modified_at
        FROM blogs
        WHERE slug = $1
        "#,
    )
    .bind(slug)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(AppError::NotFound("Blog not found".to_string()))
}

/// Fetches a published blog by slug. Drafts are reported as missing.
pub(crate) async fn find_published(conn: &mut PgConnection, slug: &str) -> Result<Blog, AppError> {
    let blog = find_by_slug(conn, slug).await?;
    if blog.status != BlogStatus::Published {
        return Err(AppError::NotFound("Blog not found".to_string()));
    }
    Ok(blog)
}

/// Sanitizes blog HTML and rejects bodies that sanitize to nothing.
fn sanitized_content(raw: &str) -> Result<String, AppError> {
    let content = clean_html(raw);
    if content.trim().is_empty() {
        return Err(AppError::BadRequest("Content must not be empty".to_string()));
    }
    Ok(content)
}

/// Derives a slug from `title` that no existing blog uses.
async fn unique_slug(conn: &mut PgConnection, title: &str) -> Result<String, AppError> {
    let base = slugify(title);
    let mut candidate = base.clone();
    let mut n = 2;

    loop {
        let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM blogs WHERE slug = $1)")
            .bind(&candidate)
            .fetch_one(&mut *conn)
            .await?;
        if !taken {
            return Ok(candidate);
        }
        candidate = numbered_slug(&base, n);
        n += 1;
    }
}

/// Replaces the blog's tag set. Unknown tag ids are rejected.
async fn set_tags(conn: &mut PgConnection, blog_id: i64, tag_ids: &[i64]) -> Result<(), AppError> {
    let ids = dedup_ids(tag_ids);
    if ids.len() > MAX_TAGS_PER_BLOG {
        return Err(AppError::BadRequest(format!(
            "You can select up to {} tags only.",
            MAX_TAGS_PER_BLOG
        )));
    }

    let known: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags WHERE id = ANY($1)")
        .bind(&ids)
        .fetch_one(&mut *conn)
        .await?;
    if known as usize != ids.len() {
        return Err(AppError::BadRequest("Unknown tag selected.".to_string()));
    }

    sqlx::query("DELETE FROM blog_tags WHERE blog_id = $1")
        .bind(blog_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("INSERT INTO blog_tags (blog_id, tag_id) SELECT $1, UNNEST($2::BIGINT[])")
        .bind(blog_id)
        .bind(&ids)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Replaces the blog's category set. Unknown category ids are rejected.
async fn set_categories(
    conn: &mut PgConnection,
    blog_id: i64,
    category_ids: &[i64],
) -> Result<(), AppError> {
    let ids = dedup_ids(category_ids);
    if ids.len() > MAX_CATEGORIES_PER_BLOG {
        return Err(AppError::BadRequest(format!(
            "You can select up to {} categories only.",
            MAX_CATEGORIES_PER_BLOG
        )));
    }

    let known: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE id = ANY($1)")
        .bind(&ids)
        .fetch_one(&mut *conn)
        .await?;
    if known as usize != ids.len() {
        return Err(AppError::BadRequest("Unknown category selected.".to_string()));
    }

    sqlx::query("DELETE FROM blog_categories WHERE blog_id = $1")
        .bind(blog_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query(
        "INSERT INTO blog_categories (blog_id, category_id) SELECT $1, UNNEST($2::BIGINT[])",
    )
    .bind(blog_id)
    .bind(&ids)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Grouped reaction counts for a blog, plus the viewer's own reaction.
pub(crate) async fn reaction_summary(
    conn: &mut PgConnection,
    blog_id: i64,
    viewer_id: Option<i64>,
) -> Result<ReactionSummary, AppError> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        r#"
        SELECT reaction_type, COUNT(*)
        FROM reactions
        WHERE blog_id = $1
        GROUP BY reaction_type
        "#,
    )
    .bind(blog_id)
    .fetch_all(&mut *conn)
    .await?;

    let mine = match viewer_id {
        Some(user_id) => sqlx::query_scalar::<_, String>(
            "SELECT reaction_type FROM reactions WHERE blog_id = $1 AND user_id = $2",
        )
        .bind(blog_id)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?
        .and_then(|kind| kind.parse::<ReactionKind>().ok()),
        None => None,
    };

    Ok(ReactionSummary::from_counts(&rows, mine))
}

async fn load_detail(
    conn: &mut PgConnection,
    blog_id: i64,
    viewer_id: Option<i64>,
) -> Result<BlogDetail, AppError> {
    let blog = sqlx::query_as::<_, BlogSummary>(&format!("{} WHERE b.id = $1", SUMMARY_SELECT))
        .bind(blog_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::NotFound("Blog not found".to_string()))?;

    let tags = sqlx::query_as::<_, Tag>(
        r#"
        SELECT t.id, t.name
        FROM tags t
        JOIN blog_tags bt ON bt.tag_id = t.id
        WHERE bt.blog_id = $1
        ORDER BY t.name
        "#,
    )
    .bind(blog_id)
    .fetch_all(&mut *conn)
    .await?;

    let categories = sqlx::query_as::<_, Category>(
        r#"
        SELECT c.id, c.name, c.description
        FROM categories c
        JOIN blog_categories bc ON bc.category_id = c.id
        WHERE bc.blog_id = $1
        ORDER BY c.name
        "#,
    )
    .bind(blog_id)
    .fetch_all(&mut *conn)
    .await?;

    let reactions = reaction_summary(conn, blog_id, viewer_id).await?;

    let likes_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_blog_interactions WHERE blog_id = $1 AND liked",
    )
    .bind(blog_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(BlogDetail {
        blog,
        tags,
        categories,
        reactions,
        likes_count,
    })
}

/// Create a new blog.
///
/// `publish: true` publishes immediately, otherwise the blog is saved as a
/// draft. The slug is derived from the title and made unique.
pub async fn create_blog(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(mut payload): Json<CreateBlogRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.normalize();
    payload.validate()?;
    let user_id = claims.user_id()?;

    let status = BlogStatus::from_publish_flag(payload.publish);
    let content = sanitized_content(&payload.content)?;

    let mut tx = pool.begin().await?;

    let slug = unique_slug(&mut tx, &payload.title).await?;

    let blog_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO blogs (author_id, title, slug, content, blog_image, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(&payload.title)
    .bind(&slug)
    .bind(&content)
    .bind(&payload.blog_image)
    .bind(status)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("A blog with this slug was just created. Try again.".to_string())
        } else {
            tracing::error!("Failed to create blog: {:?}", e);
            AppError::from(e)
        }
    })?;

    set_tags(&mut tx, blog_id, &payload.tags).await?;
    set_categories(&mut tx, blog_id, &payload.categories).await?;

    let detail = load_detail(&mut tx, blog_id, Some(user_id)).await?;

    tx.commit().await?;

    tracing::info!(blog_id, slug = %slug, ?status, "blog created");

    Ok((StatusCode::CREATED, Json(detail)))
}

/// List published blogs (Recent first).
/// Supports cursor-based pagination and tag/category/author/featured filters.
/// The next page starts after `(cursor, cursor_id)` of the last row returned.
pub async fn list_blogs(
    State(pool): State<PgPool>,
    Query(params): Query<BlogListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(SUMMARY_SELECT);
    builder.push(" WHERE b.status = ").push_bind(BlogStatus::Published);

    match (params.cursor, params.cursor_id) {
        (Some(cursor), Some(cursor_id)) => {
            builder
                .push(" AND (b.created_at, b.id) < (")
                .push_bind(cursor)
                .push(", ")
                .push_bind(cursor_id)
                .push(")");
        }
        (Some(cursor), None) => {
            builder.push(" AND b.created_at < ").push_bind(cursor);
        }
        _ => {}
    }

    if let Some(tag) = params.tag {
        builder
            .push(
                " AND EXISTS (SELECT 1 FROM blog_tags bt JOIN tags t ON t.id = bt.tag_id \
                 WHERE bt.blog_id = b.id AND t.name = ",
            )
            .push_bind(tag)
            .push(")");
    }

    if let Some(category) = params.category {
        builder
            .push(
                " AND EXISTS (SELECT 1 FROM blog_categories bc JOIN categories c ON c.id = bc.category_id \
                 WHERE bc.blog_id = b.id AND c.name = ",
            )
            .push_bind(category)
            .push(")");
    }

    if let Some(featured) = params.featured {
        builder.push(" AND b.featured = ").push_bind(featured);
    }

    if let Some(author) = params.author {
        builder.push(" AND u.username = ").push_bind(author);
    }

    if let Some(q) = params.q.filter(|q| !q.trim().is_empty()) {
        builder
            .push(" AND b.title ILIKE ")
            .push_bind(format!("%{}%", escape_like(q.trim())));
    }

    builder
        .push(" ORDER BY b.created_at DESC, b.id DESC LIMIT ")
        .push_bind(limit);

    let blogs: Vec<BlogSummary> = builder
        .build_query_as()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list blogs: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(blogs))
}

/// Get a single blog by slug.
/// Drafts are only visible to their author.
pub async fn get_blog(
    State(pool): State<PgPool>,
    Extension(viewer): Extension<Viewer>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = pool.acquire().await?;
    let blog = find_by_slug(&mut conn, &slug).await?;
    let viewer_id = viewer.user_id();

    if blog.status != BlogStatus::Published && viewer_id != Some(blog.author_id) {
        return Err(AppError::NotFound("Blog not found".to_string()));
    }

    let detail = load_detail(&mut conn, blog.id, viewer_id).await?;
    Ok(Json(detail))
}

/// Update a blog. Author only. The slug never changes.
pub async fn update_blog(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
    Json(mut payload): Json<UpdateBlogRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.normalize();
    payload.validate()?;
    let user_id = claims.user_id()?;

    let content = payload.content.as_deref().map(sanitized_content).transpose()?;

    let mut tx = pool.begin().await?;
    let blog = find_by_slug(&mut tx, &slug).await?;

    if blog.author_id != user_id {
        return Err(AppError::Forbidden(
            "You are not authorized to edit this blog".to_string(),
        ));
    }

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("UPDATE blogs SET modified_at = NOW()");

    if let Some(title) = &payload.title {
        builder.push(", title = ").push_bind(title.clone());
    }
    if let Some(content) = content {
        builder.push(", content = ").push_bind(content);
    }
    if let Some(image) = &payload.blog_image {
        builder.push(", blog_image = ").push_bind(image.clone());
    }
    if let Some(publish) = payload.publish {
        builder
            .push(", status = ")
            .push_bind(BlogStatus::from_publish_flag(publish));
    }

    builder.push(" WHERE id = ").push_bind(blog.id);
    builder.build().execute(&mut *tx).await?;

    if let Some(tags) = &payload.tags {
        set_tags(&mut tx, blog.id, tags).await?;
    }
    if let Some(categories) = &payload.categories {
        set_categories(&mut tx, blog.id, categories).await?;
    }

    let detail = load_detail(&mut tx, blog.id, Some(user_id)).await?;
    tx.commit().await?;

    Ok(Json(detail))
}

/// Delete a blog.
/// Requires: Login + (Author OR Admin).
pub async fn delete_blog(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let mut conn = pool.acquire().await?;
    let blog = find_by_slug(&mut conn, &slug).await?;

    if blog.author_id != user_id && !claims.is_admin() {
        return Err(AppError::Forbidden(
            "You are not authorized to delete this blog".to_string(),
        ));
    }

    sqlx::query("DELETE FROM blogs WHERE id = $1")
        .bind(blog.id)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete blog: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    tracing::info!(blog_id = blog.id, by = user_id, "blog deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// List the caller's drafts, most recently edited first.
pub async fn list_my_drafts(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let drafts = sqlx::query_as::<_, BlogSummary>(&format!(
        "{} WHERE b.author_id = $1 AND b.status = $2 ORDER BY b.modified_at DESC",
        SUMMARY_SELECT
    ))
    .bind(user_id)
    .bind(BlogStatus::Draft)
    .fetch_all(&pool)
    .await?;

    Ok(Json(drafts))
}
