// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{
        admin, auth, blogs, comments, follows, interactions, notifications, profile, reactions,
        taxonomy,
    },
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, viewer_middleware},
};

/// Assembles the main application router.
///
/// * Public routes see the caller through `Viewer`.
/// * Protected routes require a bearer token (`Claims`).
/// * Admin routes additionally require the admin role.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let require_auth = || middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/verify-otp", post(auth::verify_otp))
        .route("/resend-otp", post(auth::resend_otp))
        .route("/verify-email/{token}", get(auth::verify_email))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .merge(
            Router::new()
                .route("/change-password", post(auth::change_password))
                .layer(require_auth()),
        );

    let blog_routes = Router::new()
        .route(
            "/",
            get(blogs::list_blogs).merge(post(blogs::create_blog).route_layer(require_auth())),
        )
        .route(
            "/{slug}",
            get(blogs::get_blog).merge(
                put(blogs::update_blog)
                    .delete(blogs::delete_blog)
                    .route_layer(require_auth()),
            ),
        )
        .route(
            "/{slug}/comments",
            get(comments::list_comments)
                .merge(post(comments::add_comment).route_layer(require_auth())),
        )
        .route(
            "/{slug}/reactions",
            get(reactions::get_reactions)
                .merge(post(reactions::save_reaction).route_layer(require_auth())),
        )
        .route(
            "/{slug}/like",
            post(interactions::toggle_like).route_layer(require_auth()),
        )
        .route(
            "/{slug}/favorite",
            post(interactions::toggle_favorite).route_layer(require_auth()),
        );

    let user_routes = Router::new()
        .route("/{id}", get(profile::get_profile))
        .route("/{id}/followers", get(follows::list_followers))
        .route("/{id}/following", get(follows::list_following))
        .route(
            "/{id}/follow",
            post(follows::toggle_follow).route_layer(require_auth()),
        );

    let me_routes = Router::new()
        .route("/", get(profile::get_me))
        .route("/profile", put(profile::update_profile))
        .route(
            "/settings",
            get(profile::get_settings).put(profile::update_settings),
        )
        .route("/drafts", get(blogs::list_my_drafts))
        .route("/interactions", get(interactions::list_my_interactions))
        .layer(require_auth());

    let notification_routes = Router::new()
        .route("/", get(notifications::list_notifications))
        .route("/unread-count", get(notifications::unread_count))
        .route("/read-all", post(notifications::mark_all_as_read))
        .route("/{id}/read", post(notifications::mark_as_read))
        .layer(require_auth());

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/by-email", delete(admin::delete_user_by_email))
        .route("/blogs/{slug}/featured", put(admin::set_featured))
        .route("/tags", post(taxonomy::create_tag))
        .route("/categories", post(taxonomy::create_category))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(require_auth());

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/blogs", blog_routes)
        .nest("/api/users", user_routes)
        .nest("/api/me", me_routes)
        .nest("/api/notifications", notification_routes)
        .route("/api/tags", get(taxonomy::list_tags))
        .route("/api/categories", get(taxonomy::list_categories))
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(middleware::from_fn_with_state(state.clone(), viewer_middleware)),
        )
        .with_state(state)
}
