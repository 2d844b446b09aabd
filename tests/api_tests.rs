// tests/api_tests.rs
//
// Account and blog flows against a live server. Needs DATABASE_URL.

mod common;

use bloggy::utils::jwt::{sign_password_reset_token, sign_verification_token};
use common::{PASSWORD, TestApp, TestUser, spawn_app, unique_name};

// Matches the secret `spawn_app` configures.
const SECRET: &str = "test_secret_for_integration_tests";

#[tokio::test]
async fn login_is_blocked_until_email_is_verified() {
    let Some(app) = spawn_app().await else { return };

    let username = unique_name("pending");
    let email = format!("{}@example.com", username);

    let resp = app.register(&username, &email).await;
    assert_eq!(resp.status().as_u16(), 201);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["email_verified"], false);
    assert!(body.get("password").is_none());

    let resp = app.login(&username).await;
    assert_eq!(resp.status().as_u16(), 403);

    // Wrong code is rejected and the account stays unverified.
    let code = app.pending_otp(&email).await;
    let wrong = if code == "000000" { "111111" } else { "000000" };
    let resp = app
        .client
        .post(app.url("/api/auth/verify-otp"))
        .json(&serde_json::json!({ "email": email, "code": wrong }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = app
        .client
        .post(app.url("/api/auth/verify-otp"))
        .json(&serde_json::json!({ "email": email, "code": code }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    // Login by e-mail works once verified.
    let resp = app.login(&email).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["type"], "Bearer");
    assert_eq!(body["user"]["username"], username.as_str());
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let Some(app) = spawn_app().await else { return };

    let username = unique_name("dup");
    let email = format!("{}@example.com", username);
    assert_eq!(app.register(&username, &email).await.status().as_u16(), 201);

    let other_email = format!("other_{}", email);
    let resp = app.register(&username, &other_email).await;
    assert_eq!(resp.status().as_u16(), 409);

    let resp = app.register(&unique_name("dup"), &email.to_uppercase()).await;
    assert_eq!(resp.status().as_u16(), 409);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let Some(app) = spawn_app().await else { return };
    let user = app.verified_user("wrongpw").await;

    let resp = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&serde_json::json!({ "username": user.username, "password": "not-the-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn change_password_then_login_with_new_one() {
    let Some(app) = spawn_app().await else { return };
    let user = app.verified_user("chpw").await;

    let resp = app
        .client
        .post(app.url("/api/auth/change-password"))
        .header("Authorization", user.bearer())
        .json(&serde_json::json!({
            "new_password": "green-heron-77",
            "new_password_confirm": "green-heron-77"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);

    assert_eq!(app.login(&user.username).await.status().as_u16(), 401);

    let resp = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&serde_json::json!({ "username": user.username, "password": "green-heron-77" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn colliding_titles_get_numbered_slugs() {
    let Some(app) = spawn_app().await else { return };
    let author = app.verified_user("author").await;

    let title = format!("Hello {}", unique_name("world"));
    let first = app.create_blog(&author, &title, true).await;
    let second = app.create_blog(&author, &title, true).await;

    let base = first["slug"].as_str().unwrap().to_string();
    assert_eq!(second["slug"], format!("{}-2", base));
    assert_eq!(first["status"], "published");
    assert_eq!(first["author_username"], author.username.as_str());
}

#[tokio::test]
async fn drafts_are_private_to_their_author() {
    let Some(app) = spawn_app().await else { return };
    let author = app.verified_user("drafter").await;
    let reader = app.verified_user("reader").await;

    let draft = app
        .create_blog(&author, &format!("Draft {}", unique_name("d")), false)
        .await;
    assert_eq!(draft["status"], "draft");
    let slug = draft["slug"].as_str().unwrap();

    let resp = app
        .client
        .get(app.url(&format!("/api/blogs/{}", slug)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let resp = app
        .client
        .get(app.url(&format!("/api/blogs/{}", slug)))
        .header("Authorization", reader.bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let resp = app
        .client
        .get(app.url(&format!("/api/blogs/{}", slug)))
        .header("Authorization", author.bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let drafts: Vec<serde_json::Value> = app
        .client
        .get(app.url("/api/me/drafts"))
        .header("Authorization", author.bearer())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(drafts.iter().any(|b| b["slug"] == slug));
}

#[tokio::test]
async fn only_the_author_may_edit() {
    let Some(app) = spawn_app().await else { return };
    let author = app.verified_user("owner").await;
    let intruder = app.verified_user("intruder").await;

    let blog = app
        .create_blog(&author, &format!("Mine {}", unique_name("m")), true)
        .await;
    let slug = blog["slug"].as_str().unwrap();

    let resp = app
        .client
        .put(app.url(&format!("/api/blogs/{}", slug)))
        .header("Authorization", intruder.bearer())
        .json(&serde_json::json!({ "title": "Hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .client
        .put(app.url(&format!("/api/blogs/{}", slug)))
        .header("Authorization", author.bearer())
        .json(&serde_json::json!({ "title": "Renamed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["title"], "Renamed");
    assert_eq!(body["slug"], slug);

    let resp = app
        .client
        .delete(app.url(&format!("/api/blogs/{}", slug)))
        .header("Authorization", intruder.bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn blog_content_is_sanitized() {
    let Some(app) = spawn_app().await else { return };
    let author = app.verified_user("xss").await;

    let resp = app
        .client
        .post(app.url("/api/blogs"))
        .header("Authorization", author.bearer())
        .json(&serde_json::json!({
            "title": format!("Unsafe {}", unique_name("u")),
            "content": "<p>ok</p><script>alert(1)</script>",
            "publish": true
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["content"], "<p>ok</p>");
}

#[tokio::test]
async fn registration_trims_username_and_normalizes_email() {
    let Some(app) = spawn_app().await else { return };

    let username = unique_name("padded");
    let email = format!("{}@Example.COM", username.to_uppercase());

    let resp = app
        .register(&format!("  {}  ", username), &format!(" {} ", email))
        .await;
    assert_eq!(resp.status().as_u16(), 201);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["username"], username.as_str());
    assert_eq!(body["email"], email.to_lowercase());
}

#[tokio::test]
async fn resend_otp_replaces_the_code_until_verified() {
    let Some(app) = spawn_app().await else { return };

    let username = unique_name("resend");
    let email = format!("{}@example.com", username);
    assert_eq!(app.register(&username, &email).await.status().as_u16(), 201);
    let first = app.pending_otp(&email).await;

    let resp = app
        .client
        .post(app.url("/api/auth/resend-otp"))
        .json(&serde_json::json!({ "email": format!(" {} ", email.to_uppercase()) }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let pending: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM otps o JOIN users u ON u.id = o.user_id \
         WHERE u.email = $1 AND o.is_verified = FALSE",
    )
    .bind(&email)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(pending, 1);

    let second = app.pending_otp(&email).await;
    let resp = app
        .client
        .post(app.url("/api/auth/verify-otp"))
        .json(&serde_json::json!({ "email": email, "code": second }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200, "first code was {}", first);

    let resp = app
        .client
        .post(app.url("/api/auth/resend-otp"))
        .json(&serde_json::json!({ "email": email }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = app
        .client
        .post(app.url("/api/auth/resend-otp"))
        .json(&serde_json::json!({ "email": format!("nobody_{}", email) }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn verification_link_verifies_the_account() {
    let Some(app) = spawn_app().await else { return };

    let username = unique_name("linked");
    let email = format!("{}@example.com", username);
    assert_eq!(app.register(&username, &email).await.status().as_u16(), 201);
    assert_eq!(app.login(&username).await.status().as_u16(), 403);

    let token = sign_verification_token(&email, SECRET, 600).unwrap();
    let resp = app
        .client
        .get(app.url(&format!("/api/auth/verify-email/{}", token)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    assert_eq!(app.login(&username).await.status().as_u16(), 200);
}

#[tokio::test]
async fn password_reset_flow() {
    let Some(app) = spawn_app().await else { return };
    let user = app.verified_user("forgetful").await;

    for email in [format!(" {} ", user.email.to_uppercase()), "nobody@example.com".to_string()] {
        let resp = app
            .client
            .post(app.url("/api/auth/forgot-password"))
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["sent"], true);
    }

    let token = sign_password_reset_token(&user.email, SECRET, 600).unwrap();

    let resp = app
        .client
        .post(app.url("/api/auth/reset-password"))
        .json(&serde_json::json!({
            "token": token,
            "new_password": "green-heron-77",
            "new_password_confirm": "green-heron-78"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = app
        .client
        .post(app.url("/api/auth/reset-password"))
        .json(&serde_json::json!({
            "token": token,
            "new_password": "green-heron-77",
            "new_password_confirm": "green-heron-77"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);

    assert_eq!(app.login(&user.username).await.status().as_u16(), 401);
    let resp = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&serde_json::json!({ "username": user.username, "password": "green-heron-77" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}

async fn publish(app: &TestApp, author: &TestUser, body: serde_json::Value) -> serde_json::Value {
    let resp = app
        .client
        .post(app.url("/api/blogs"))
        .header("Authorization", author.bearer())
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    resp.json().await.unwrap()
}

fn by_author(author: &TestUser, extra: &[(&'static str, String)]) -> Vec<(&'static str, String)> {
    let mut query = vec![("author", author.username.clone())];
    query.extend(extra.iter().cloned());
    query
}

fn slugs(page: &serde_json::Value) -> Vec<String> {
    page.as_array()
        .unwrap()
        .iter()
        .map(|b| b["slug"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn list_blogs_filters_and_limits() {
    let Some(app) = spawn_app().await else { return };
    let admin = app.admin_user().await;
    let author = app.verified_user("lister").await;

    let tag: serde_json::Value = app
        .client
        .post(app.url("/api/admin/tags"))
        .header("Authorization", admin.bearer())
        .json(&serde_json::json!({ "name": unique_name("tag") }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let category: serde_json::Value = app
        .client
        .post(app.url("/api/admin/categories"))
        .header("Authorization", admin.bearer())
        .json(&serde_json::json!({ "name": unique_name("cat"), "description": "Test" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let marker = unique_name("needle");
    let tagged = publish(
        &app,
        &author,
        serde_json::json!({
            "title": format!("Tagged {}", marker),
            "content": "<p>one</p>",
            "publish": true,
            "tags": [tag["id"]],
            "categories": [category["id"]]
        }),
    )
    .await;
    let plain = app.create_blog(&author, &format!("Plain {}", unique_name("p")), true).await;
    app.create_blog(&author, &format!("Other {}", unique_name("o")), true).await;
    app.create_blog(&author, &format!("Draft {}", unique_name("d")), false).await;

    let all = app.get_json("/api/blogs", &by_author(&author, &[])).await;
    assert_eq!(slugs(&all).len(), 3);

    let one = app.get_json("/api/blogs", &by_author(&author, &[("limit", "0".into())])).await;
    assert_eq!(slugs(&one).len(), 1);
    let many = app.get_json("/api/blogs", &by_author(&author, &[("limit", "100000".into())])).await;
    assert_eq!(slugs(&many).len(), 3);

    let page = app.get_json("/api/blogs", &by_author(&author, &[("tag", tag["name"].as_str().unwrap().into())])).await;
    assert_eq!(slugs(&page), vec![tagged["slug"].as_str().unwrap().to_string()]);

    let page = app
        .get_json("/api/blogs", &by_author(&author, &[("category", category["name"].as_str().unwrap().into())]))
        .await;
    assert_eq!(slugs(&page), vec![tagged["slug"].as_str().unwrap().to_string()]);

    let page = app.get_json("/api/blogs", &by_author(&author, &[("q", marker.to_uppercase())])).await;
    assert_eq!(slugs(&page).len(), 1);

    // Wildcards in the search term match literally.
    let page = app.get_json("/api/blogs", &by_author(&author, &[("q", "%".into())])).await;
    assert!(slugs(&page).is_empty());
    let page = app.get_json("/api/blogs", &by_author(&author, &[("q", "needle%".into())])).await;
    assert!(slugs(&page).is_empty());

    let resp = app
        .client
        .put(app.url(&format!("/api/admin/blogs/{}/featured", plain["slug"].as_str().unwrap())))
        .header("Authorization", admin.bearer())
        .json(&serde_json::json!({ "featured": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let page = app.get_json("/api/blogs", &by_author(&author, &[("featured", "true".into())])).await;
    assert_eq!(slugs(&page), vec![plain["slug"].as_str().unwrap().to_string()]);

    let resp = app
        .client
        .put(app.url("/api/admin/blogs/no-such-blog-anywhere/featured"))
        .header("Authorization", admin.bearer())
        .json(&serde_json::json!({ "featured": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn cursor_pages_through_blogs_sharing_a_timestamp() {
    let Some(app) = spawn_app().await else { return };
    let author = app.verified_user("paged").await;

    for i in 0..3 {
        app.create_blog(&author, &format!("Page {} {}", i, unique_name("pg")), true).await;
    }
    sqlx::query("UPDATE blogs SET created_at = '2024-06-01T12:00:00Z' WHERE author_id = $1")
        .bind(author.id)
        .execute(&app.pool)
        .await
        .unwrap();

    let mut seen = Vec::new();
    let mut cursor: Option<(String, i64)> = None;
    loop {
        let mut query = vec![
            ("author", author.username.clone()),
            ("limit", "1".to_string()),
        ];
        if let Some((at, id)) = &cursor {
            query.push(("cursor", at.clone()));
            query.push(("cursor_id", id.to_string()));
        }
        let page = app.get_json("/api/blogs", &query).await;
        let Some(last) = page.as_array().unwrap().last().cloned() else { break };
        seen.push(last["id"].as_i64().unwrap());
        cursor = Some((
            last["created_at"].as_str().unwrap().to_string(),
            last["id"].as_i64().unwrap(),
        ));
        assert!(seen.len() <= 3, "pagination did not terminate");
    }

    let mut unique = seen.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 3);
}

#[tokio::test]
async fn admin_deletes_users_by_email() {
    let Some(app) = spawn_app().await else { return };
    let admin = app.admin_user().await;
    let victim = app.verified_user("victim").await;
    let blog = app.create_blog(&victim, &format!("Doomed {}", unique_name("x")), true).await;

    let resp = app
        .client
        .delete(app.url("/api/admin/users/by-email"))
        .query(&[("email", admin.email.clone())])
        .header("Authorization", admin.bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = app
        .client
        .delete(app.url("/api/admin/users/by-email"))
        .query(&[("email", victim.email.to_uppercase())])
        .header("Authorization", admin.bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);

    let resp = app
        .client
        .get(app.url(&format!("/api/blogs/{}", blog["slug"].as_str().unwrap())))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let profiles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles WHERE user_id = $1")
        .bind(victim.id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(profiles, 0);

    let resp = app
        .client
        .delete(app.url("/api/admin/users/by-email"))
        .query(&[("email", victim.email.clone())])
        .header("Authorization", admin.bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn profile_and_settings_updates() {
    let Some(app) = spawn_app().await else { return };
    let user = app.verified_user("editor").await;
    let other = app.verified_user("taken").await;

    let resp = app
        .client
        .put(app.url("/api/me/profile"))
        .header("Authorization", user.bearer())
        .json(&serde_json::json!({ "username": format!("  {}  ", other.username) }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);

    let resp = app
        .client
        .put(app.url("/api/me/profile"))
        .header("Authorization", user.bearer())
        .json(&serde_json::json!({
            "first_name": "  Ada ",
            "phone_number": "+11234567890123",
            "website": "https://example.com"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let profile: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(profile["first_name"], "Ada");
    assert_eq!(profile["phone_number"], "+11234567890123");

    let resp = app
        .client
        .put(app.url("/api/me/settings"))
        .header("Authorization", user.bearer())
        .json(&serde_json::json!({ "dark_mode": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let settings: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(settings["dark_mode"], true);
    assert_eq!(settings["email_notifications"], true);

    let me: serde_json::Value = app
        .client
        .get(app.url("/api/me"))
        .header("Authorization", user.bearer())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["settings"]["dark_mode"], true);
    assert_eq!(me["username"], user.username.as_str());
}
