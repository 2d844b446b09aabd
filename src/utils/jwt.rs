// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError};

const PURPOSE_SESSION: &str = "session";
const PURPOSE_EMAIL_VERIFY: &str = "email_verify";
const PURPOSE_PASSWORD_RESET: &str = "password_reset";

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the User ID (as string).
    pub sub: String,
    /// User's role (e.g., 'user', 'admin').
    pub role: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
    /// What the token may be used for. Session tokens cannot verify e-mails
    /// and verification tokens cannot authenticate requests.
    #[serde(default)]
    pub purpose: String,
}

impl Claims {
    /// Parses the numeric user id out of `sub`.
    pub fn user_id(&self) -> Result<i64, AppError> {
        self.sub
            .parse::<i64>()
            .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))
    }

    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// The caller of a public route. Populated by `viewer_middleware` on every
/// request; `None` for anonymous callers.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<Claims>);

impl Viewer {
    pub fn user_id(&self) -> Option<i64> {
        self.0.as_ref().and_then(|c| c.user_id().ok())
    }
}

fn expiry_from_now(seconds: u64) -> Result<usize, AppError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs();
    Ok((now + seconds) as usize)
}

fn sign(claims: &Claims, secret: &str) -> Result<String, AppError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Signs a new session JWT for the user.
pub fn sign_jwt(
    id: i64,
    role: &str,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let claims = Claims {
        sub: id.to_string(),
        role: role.to_owned(),
        exp: expiry_from_now(expiration_seconds)?,
        purpose: PURPOSE_SESSION.to_string(),
    };
    sign(&claims, secret)
}

/// Verifies and decodes a session JWT.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    if token_data.claims.purpose != PURPOSE_SESSION {
        return Err(AppError::AuthError("Invalid token".to_string()));
    }

    Ok(token_data.claims)
}

fn sign_for_email(
    email: &str,
    purpose: &str,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let claims = Claims {
        sub: email.to_owned(),
        role: String::new(),
        exp: expiry_from_now(expiration_seconds)?,
        purpose: purpose.to_string(),
    };
    sign(&claims, secret)
}

/// Decodes an e-mail-bound link token. Every failure is a 400 naming `what`.
fn verify_for_email(
    token: &str,
    purpose: &str,
    secret: &str,
    what: &str,
) -> Result<String, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                tracing::warn!("{} token has expired", purpose);
                AppError::BadRequest(format!("{} has expired", what))
            }
            _ => {
                tracing::warn!("Invalid {} token: {}", purpose, e);
                AppError::BadRequest(format!("Invalid {}", what.to_lowercase()))
            }
        }
    })?;

    if token_data.claims.purpose != purpose {
        return Err(AppError::BadRequest(format!("Invalid {}", what.to_lowercase())));
    }

    Ok(token_data.claims.sub)
}

/// Signs a time-limited token carrying an e-mail address, embedded in
/// verification links.
pub fn sign_verification_token(
    email: &str,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    sign_for_email(email, PURPOSE_EMAIL_VERIFY, secret, expiration_seconds)
}

/// Returns the e-mail address a verification token was issued for.
pub fn verify_verification_token(token: &str, secret: &str) -> Result<String, AppError> {
    verify_for_email(token, PURPOSE_EMAIL_VERIFY, secret, "Verification link")
}

/// Signs a password reset token for `email`.
pub fn sign_password_reset_token(
    email: &str,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    sign_for_email(email, PURPOSE_PASSWORD_RESET, secret, expiration_seconds)
}

/// Returns the e-mail address a password reset token was issued for.
pub fn verify_password_reset_token(token: &str, secret: &str) -> Result<String, AppError> {
    verify_for_email(token, PURPOSE_PASSWORD_RESET, secret, "Reset link")
}

fn bearer_token(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
}

/// Axum Middleware: Authentication.
///
/// Validates the 'Authorization: Bearer <token>' header and injects `Claims`
/// into the request extensions. Returns 401 when the token is missing or bad.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = bearer_token(&req).ok_or(StatusCode::UNAUTHORIZED)?;

    match verify_jwt(token, &config.jwt_secret) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            Ok(next.run(req).await)
        }
        Err(_) => Err(StatusCode::UNAUTHORIZED),
    }
}

/// Axum Middleware: identifies the caller without requiring a login.
/// Always inserts a `Viewer`.
pub async fn viewer_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let claims = bearer_token(&req).and_then(|t| verify_jwt(t, &config.jwt_secret).ok());
    req.extensions_mut().insert(Viewer(claims));
    next.run(req).await
}

/// Axum Middleware: Admin Authorization.
///
/// Must be used AFTER `auth_middleware`.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !claims.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn session_token_round_trips_user_and_role() {
        let token = sign_jwt(42, "admin", SECRET, 60).unwrap();
        let claims = verify_jwt(&token, SECRET).unwrap();
        assert_eq!(claims.user_id().unwrap(), 42);
        assert!(claims.is_admin());
    }

    #[test]
    fn session_token_rejected_with_wrong_secret() {
        let token = sign_jwt(1, "user", SECRET, 60).unwrap();
        assert!(verify_jwt(&token, "other").is_err());
    }

    #[test]
    fn verification_token_cannot_be_used_as_session() {
        let token = sign_verification_token("a@b.io", SECRET, 60).unwrap();
        assert!(verify_jwt(&token, SECRET).is_err());
        assert_eq!(verify_verification_token(&token, SECRET).unwrap(), "a@b.io");
    }

    #[test]
    fn session_token_cannot_verify_email() {
        let token = sign_jwt(7, "user", SECRET, 60).unwrap();
        assert!(verify_verification_token(&token, SECRET).is_err());
    }

    #[test]
    fn reset_token_is_bound_to_its_purpose() {
        let token = sign_password_reset_token("a@b.io", SECRET, 60).unwrap();
        assert_eq!(verify_password_reset_token(&token, SECRET).unwrap(), "a@b.io");
        assert!(verify_jwt(&token, SECRET).is_err());
        assert!(verify_verification_token(&token, SECRET).is_err());

        let link = sign_verification_token("a@b.io", SECRET, 60).unwrap();
        assert!(verify_password_reset_token(&link, SECRET).is_err());
    }

    #[test]
    fn viewer_without_claims_has_no_user() {
        assert_eq!(Viewer::default().user_id(), None);
    }
}
