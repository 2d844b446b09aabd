// src/handlers/auth.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::{PgConnection, PgPool};
use validator::Validate;

use crate::{
    config::Config,
    error::{AppError, is_unique_violation},
    models::user::{
        ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, RegisterRequest,
        ResendOtpRequest, ResetPasswordRequest, User, VerifyOtpRequest, normalize_email,
    },
    services::{
        mail::{Mail, Mailer, otp_mail, password_reset_mail, verification_mail},
        otp,
    },
    utils::{
        jwt::{
            Claims, sign_jwt, sign_password_reset_token, sign_verification_token,
            verify_password_reset_token, verify_verification_token,
        },
        password::{check_password_policy, hash_password, verify_password},
    },
};

const USER_COLUMNS: &str =
    "id, username, email, password, role, is_active, email_verified, created_at";

pub(crate) async fn load_user(conn: &mut PgConnection, id: i64) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))
}

async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE email = $1",
        USER_COLUMNS
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Creates the rows every account owns: profile, settings and activity.
pub(crate) async fn create_account_rows(conn: &mut PgConnection, user_id: i64) -> Result<(), AppError> {
    sqlx::query("INSERT INTO profiles (user_id) VALUES ($1) ON CONFLICT DO NOTHING")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("INSERT INTO user_settings (user_id) VALUES ($1) ON CONFLICT DO NOTHING")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("INSERT INTO user_activity (user_id) VALUES ($1) ON CONFLICT DO NOTHING")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

fn verification_link(config: &Config, token: &str) -> String {
    format!(
        "{}/api/auth/verify-email/{}",
        config.public_url.trim_end_matches('/'),
        token
    )
}

/// Client page that collects the new password and posts it with the token
/// to `/api/auth/reset-password`.
fn reset_link(config: &Config, token: &str) -> String {
    format!(
        "{}/reset-password/{}",
        config.public_url.trim_end_matches('/'),
        token
    )
}

/// Mail failures are logged, not surfaced: the account exists either way and
/// the user can ask for a new code.
async fn deliver(mailer: &Arc<dyn Mailer>, mail: Mail) {
    let to = mail.to.clone();
    if let Err(e) = mailer.send(mail).await {
        tracing::error!("Failed to send mail to {}: {}", to, e);
    }
}

/// Registers a new user.
///
/// Creates the account with its profile, settings and a pending OTP in one
/// transaction, then mails the passcode and a verification link.
/// Returns 201 Created and the user object (excluding password).
pub async fn register(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    State(mailer): State<Arc<dyn Mailer>>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.normalize();
    payload.validate()?;

    let username = payload.username.clone();
    let email = payload.email.clone();
    check_password_policy(&payload.password, &payload.password_confirm, &username)?;

    let taken = sqlx::query_as::<_, (bool, bool)>(
        r#"
        SELECT
            EXISTS(SELECT 1 FROM users WHERE username = $1),
            EXISTS(SELECT 1 FROM users WHERE email = $2)
        "#,
    )
    .bind(&username)
    .bind(&email)
    .fetch_one(&pool)
    .await?;

    if taken.0 {
        return Err(AppError::Conflict(
            "This username is already taken. Please choose another one.".to_string(),
        ));
    }
    if taken.1 {
        return Err(AppError::Conflict(
            "This email address is already associated with another account.".to_string(),
        ));
    }

    let hashed_password = hash_password(&payload.password)?;

    let mut tx = pool.begin().await?;

    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (username, email, password) VALUES ($1, $2, $3) RETURNING {}",
        USER_COLUMNS
    ))
    .bind(&username)
    .bind(&email)
    .bind(&hashed_password)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Username or email already exists".to_string())
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    create_account_rows(&mut tx, user.id).await?;
    let code = otp::issue(&mut tx, user.id).await?;

    tx.commit().await?;

    tracing::info!(user_id = user.id, "registered user {}", user.username);

    let token = sign_verification_token(
        &user.email,
        &config.jwt_secret,
        config.verification_token_ttl_secs,
    )?;
    deliver(
        &mailer,
        otp_mail(&user.email, &config.app_name, &code.code, config.otp_ttl_secs),
    )
    .await;
    deliver(
        &mailer,
        verification_mail(
            &user.email,
            &user.username,
            &config.app_name,
            &verification_link(&config, &token),
        ),
    )
    .await;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticates a user and returns a JWT token.
///
/// `username` is treated as an e-mail address when it contains '@'.
/// Unverified accounts cannot log in, admins excepted.
pub async fn login(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let identifier = payload.username.trim();
    let (column, value) = if identifier.contains('@') {
        ("email", normalize_email(identifier))
    } else {
        ("username", identifier.to_string())
    };

    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE {} = $1",
        USER_COLUMNS, column
    ))
    .bind(&value)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let user = user.ok_or(AppError::AuthError(
        "Invalid username/email or password.".to_string(),
    ))?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(AppError::AuthError(
            "Invalid username/email or password.".to_string(),
        ));
    }

    if !user.is_active {
        return Err(AppError::Forbidden("This account is inactive.".to_string()));
    }

    if !user.email_verified && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Please verify your email address before logging in.".to_string(),
        ));
    }

    sqlx::query(
        r#"
        INSERT INTO user_activity (user_id, last_login_time, last_activity_time)
        VALUES ($1, NOW(), NOW())
        ON CONFLICT (user_id)
        DO UPDATE SET last_login_time = NOW(), last_activity_time = NOW()
        "#,
    )
    .bind(user.id)
    .execute(&pool)
    .await?;

    let token = sign_jwt(user.id, &user.role, &config.jwt_secret, config.jwt_expiration)?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "user": user,
    })))
}

/// Confirms an e-mail address with the most recent one-time passcode.
pub async fn verify_otp(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(mut payload): Json<VerifyOtpRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.normalize();
    payload.validate()?;

    let user = find_user_by_email(&pool, &payload.email)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    if user.email_verified {
        return Err(AppError::BadRequest("Email is already verified.".to_string()));
    }

    let mut tx = pool.begin().await?;

    let pending = otp::latest_pending(&mut tx, user.id).await?;
    otp::check(pending.as_ref(), &payload.code, chrono::Utc::now(), config.otp_ttl_secs)?;

    if let Some(code) = pending {
        sqlx::query("UPDATE otps SET is_verified = TRUE WHERE id = $1")
            .bind(code.id)
            .execute(&mut *tx)
            .await?;
    }
    sqlx::query("UPDATE users SET email_verified = TRUE WHERE id = $1")
        .bind(user.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(user_id = user.id, "email verified by OTP");

    Ok(Json(json!({ "verified": true })))
}

/// Issues and mails a fresh passcode, invalidating earlier ones.
pub async fn resend_otp(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    State(mailer): State<Arc<dyn Mailer>>,
    Json(mut payload): Json<ResendOtpRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.normalize();
    payload.validate()?;

    let user = find_user_by_email(&pool, &payload.email)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    if user.email_verified {
        return Err(AppError::BadRequest("Email is already verified.".to_string()));
    }

    let mut tx = pool.begin().await?;
    let code = otp::issue(&mut tx, user.id).await?;
    tx.commit().await?;

    deliver(
        &mailer,
        otp_mail(&user.email, &config.app_name, &code.code, config.otp_ttl_secs),
    )
    .await;

    Ok(Json(json!({ "sent": true })))
}

/// Confirms an e-mail address from a signed verification link.
pub async fn verify_email(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let email = verify_verification_token(&token, &config.jwt_secret)?;

    let mut tx = pool.begin().await?;

    let user_id: i64 = sqlx::query_scalar(
        "UPDATE users SET email_verified = TRUE WHERE email = $1 RETURNING id",
    )
    .bind(&email)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    sqlx::query("DELETE FROM otps WHERE user_id = $1 AND is_verified = FALSE")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(user_id, "email verified by link");

    Ok(Json(json!({ "verified": true })))
}

/// Sets a new password for the logged-in user.
pub async fn change_password(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id()?;

    let mut conn = pool.acquire().await?;
    let user = load_user(&mut conn, user_id).await?;

    check_password_policy(
        &payload.new_password,
        &payload.new_password_confirm,
        &user.username,
    )?;
    let hashed = hash_password(&payload.new_password)?;

    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(hashed)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Mails a password reset link.
///
/// Answers 200 whether or not the address has an account.
pub async fn forgot_password(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    State(mailer): State<Arc<dyn Mailer>>,
    Json(mut payload): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.normalize();
    payload.validate()?;

    match find_user_by_email(&pool, &payload.email).await? {
        Some(user) if user.is_active => {
            let token = sign_password_reset_token(
                &user.email,
                &config.jwt_secret,
                config.password_reset_ttl_secs,
            )?;
            deliver(
                &mailer,
                password_reset_mail(
                    &user.email,
                    &user.username,
                    &config.app_name,
                    &reset_link(&config, &token),
                    config.password_reset_ttl_secs,
                ),
            )
            .await;
            tracing::info!(user_id = user.id, "password reset requested");
        }
        _ => tracing::debug!("password reset requested for unknown or inactive account"),
    }

    Ok(Json(json!({ "sent": true })))
}

/// Sets a new password using the token from a reset mail.
pub async fn reset_password(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let email = verify_password_reset_token(payload.token.trim(), &config.jwt_secret)?;

    let user = find_user_by_email(&pool, &email)
        .await?
        .filter(|u| u.is_active)
        .ok_or(AppError::BadRequest("Invalid reset link".to_string()))?;

    check_password_policy(
        &payload.new_password,
        &payload.new_password_confirm,
        &user.username,
    )?;
    let hashed = hash_password(&payload.new_password)?;

    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(hashed)
        .bind(user.id)
        .execute(&pool)
        .await?;

    tracing::info!(user_id = user.id, "password reset completed");

    Ok(StatusCode::NO_CONTENT)
}
