// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Maximum number of tags a single blog may carry.
pub const MAX_TAGS_PER_BLOG: usize = 5;

/// Maximum number of categories a single blog may carry.
pub const MAX_CATEGORIES_PER_BLOG: usize = 3;

/// Number of digits in a one-time passcode.
pub const OTP_LENGTH: usize = 6;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Bearer token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub port: u16,

    /// Product name used in outgoing mail.
    pub app_name: String,
    /// Externally reachable base URL, used to build verification links.
    pub public_url: String,

    pub otp_ttl_secs: i64,
    pub verification_token_ttl_secs: u64,
    pub password_reset_ttl_secs: u64,

    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub admin_email: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = parse_or("JWT_EXPIRATION", 86_400);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            port: parse_or("PORT", 3000),
            app_name: env::var("APP_NAME").unwrap_or_else(|_| "Bloggy".to_string()),
            public_url: env::var("PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            otp_ttl_secs: parse_or("OTP_TTL_SECS", 300),
            verification_token_ttl_secs: parse_or("VERIFICATION_TOKEN_TTL_SECS", 86_400),
            password_reset_ttl_secs: parse_or("PASSWORD_RESET_TTL_SECS", 3_600),
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            admin_email: env::var("ADMIN_EMAIL").ok(),
        }
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
