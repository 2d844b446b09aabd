// src/seed.rs

//! Idempotent startup data: the admin account and the default taxonomy.

use sqlx::PgPool;

use crate::{
    config::Config,
    error::AppError,
    handlers::auth::create_account_rows,
    models::user::normalize_email,
    utils::password::hash_password,
};

pub const DEFAULT_TAGS: &[&str] = &[
    "Remote Work",
    "Artificial Intelligence",
    "Sustainable Fashion",
    "Personal Finance",
    "Healthcare Innovation",
    "Technology Trends",
    "Marketing Strategy",
    "Data Science",
    "AI in Healthcare",
    "Future of Work",
];

pub const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("Technology", "Blogs related to the latest in technology, innovations, and tools."),
    ("Healthcare", "Exploring advancements in healthcare, including AI, medical technology, and treatments."),
    ("Finance", "Personal finance, investment, and financial management tips."),
    ("Fashion", "Sustainable fashion trends and the intersection of technology and fashion."),
    ("Marketing", "Strategies and insights on effective marketing and branding."),
    ("Remote Work", "Insights and tools to enhance productivity and efficiency in remote work settings."),
    ("AI & Machine Learning", "The role of AI and machine learning across industries, particularly in healthcare, finance, and more."),
    ("Entrepreneurship", "Tips and guidance on building and managing a business, especially in the tech space."),
    ("Career Development", "Career tips, growth strategies, and the evolution of the modern workplace."),
    ("Innovation", "Exploring the impact of emerging technologies and innovations in various industries."),
];

/// Creates the admin account from config when all three admin settings are
/// present and no user with that username exists yet.
pub async fn seed_admin_user(pool: &PgPool, config: &Config) -> Result<(), AppError> {
    let (Some(username), Some(password), Some(email)) = (
        &config.admin_username,
        &config.admin_password,
        &config.admin_email,
    ) else {
        return Ok(());
    };

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
        .bind(username)
        .fetch_one(pool)
        .await?;

    if exists {
        tracing::info!("Admin user already exists");
        return Ok(());
    }

    tracing::info!("Seeding admin user: {}", username);
    let hashed_password = hash_password(password)?;

    let mut tx = pool.begin().await?;
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO users (username, email, password, role, email_verified)
        VALUES ($1, $2, $3, 'admin', TRUE)
        RETURNING id
        "#,
    )
    .bind(username)
    .bind(normalize_email(email))
    .bind(hashed_password)
    .fetch_one(&mut *tx)
    .await?;
    create_account_rows(&mut tx, id).await?;
    tx.commit().await?;

    tracing::info!("Admin user created successfully.");
    Ok(())
}

/// Inserts the default tags and categories, leaving existing ones untouched.
pub async fn seed_taxonomy(pool: &PgPool) -> Result<(), AppError> {
    let mut inserted = 0u64;

    for name in DEFAULT_TAGS {
        inserted += sqlx::query("INSERT INTO tags (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(*name)
            .execute(pool)
            .await?
            .rows_affected();
    }

    for (name, description) in DEFAULT_CATEGORIES {
        inserted += sqlx::query(
            "INSERT INTO categories (name, description) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING",
        )
        .bind(*name)
        .bind(*description)
        .execute(pool)
        .await?
        .rows_affected();
    }

    if inserted > 0 {
        tracing::info!("Seeded {} tags/categories", inserted);
    }
    Ok(())
}
