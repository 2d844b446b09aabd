// tests/common/mod.rs
//
// Spawns the real app against DATABASE_URL. Tests return early when it is
// unset so the suite still runs on machines without Postgres.

#![allow(dead_code)]

use std::sync::Arc;

use bloggy::{config::Config, routes, services::mail::LogMailer, state::AppState};
use sqlx::{PgPool, postgres::PgPoolOptions};

pub const PASSWORD: &str = "blue-otter-42";

pub struct TestApp {
    pub address: String,
    pub pool: PgPool,
    pub client: reqwest::Client,
}

/// A registered, e-mail-verified user with a session token.
pub struct TestUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub token: String,
}

impl TestUser {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

pub async fn spawn_app() -> Option<TestApp> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping database test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        port: 0,
        app_name: "Bloggy".to_string(),
        public_url: "http://localhost:3000".to_string(),
        otp_ttl_secs: 300,
        verification_token_ttl_secs: 86_400,
        password_reset_ttl_secs: 3_600,
        admin_username: None,
        admin_password: None,
        admin_email: None,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
        mailer: Arc::new(LogMailer),
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Some(TestApp {
        address: format!("http://127.0.0.1:{}", port),
        pool,
        client: reqwest::Client::new(),
    })
}

pub fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..10])
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn register(&self, username: &str, email: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/auth/register"))
            .json(&serde_json::json!({
                "username": username,
                "email": email,
                "password": PASSWORD,
                "password_confirm": PASSWORD
            }))
            .send()
            .await
            .expect("Register failed")
    }

    pub async fn login(&self, username: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/auth/login"))
            .json(&serde_json::json!({ "username": username, "password": PASSWORD }))
            .send()
            .await
            .expect("Login failed")
    }

    /// Reads the pending passcode straight from the database.
    pub async fn pending_otp(&self, email: &str) -> String {
        sqlx::query_scalar(
            r#"
            SELECT o.code FROM otps o JOIN users u ON u.id = o.user_id
            WHERE u.email = $1 AND o.is_verified = FALSE
            ORDER BY o.created_at DESC LIMIT 1
            "#,
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .expect("No pending OTP")
    }

    /// Register, verify by OTP and log in.
    pub async fn verified_user(&self, prefix: &str) -> TestUser {
        let username = unique_name(prefix);
        let email = format!("{}@example.com", username);

        let resp = self.register(&username, &email).await;
        assert_eq!(resp.status().as_u16(), 201);
        let created: serde_json::Value = resp.json().await.unwrap();

        let code = self.pending_otp(&email).await;
        let resp = self
            .client
            .post(self.url("/api/auth/verify-otp"))
            .json(&serde_json::json!({ "email": email, "code": code }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);

        let login: serde_json::Value = self.login(&username).await.json().await.unwrap();

        TestUser {
            id: created["id"].as_i64().unwrap(),
            username,
            email,
            token: login["token"].as_str().expect("Token not found").to_string(),
        }
    }

    /// A verified user promoted to admin, logged in after the promotion.
    pub async fn admin_user(&self) -> TestUser {
        let mut user = self.verified_user("admin").await;
        sqlx::query("UPDATE users SET role = 'admin' WHERE id = $1")
            .bind(user.id)
            .execute(&self.pool)
            .await
            .unwrap();
        let login: serde_json::Value = self.login(&user.username).await.json().await.unwrap();
        user.token = login["token"].as_str().unwrap().to_string();
        user
    }

    pub async fn get_json(&self, path: &str, query: &[(&str, String)]) -> serde_json::Value {
        let resp = self
            .client
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200, "GET {}", path);
        resp.json().await.unwrap()
    }

    pub async fn create_blog(&self, author: &TestUser, title: &str, publish: bool) -> serde_json::Value {
        let resp = self
            .client
            .post(self.url("/api/blogs"))
            .header("Authorization", author.bearer())
            .json(&serde_json::json!({ "title": title, "content": "<p>Body</p>", "publish": publish }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 201);
        resp.json().await.unwrap()
    }

    pub async fn notifications(&self, user: &TestUser) -> serde_json::Value {
        self.client
            .get(self.url("/api/notifications"))
            .header("Authorization", user.bearer())
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }
}
